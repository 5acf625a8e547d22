//! Page key and MAC key derivation from the file salt

use zeroize::Zeroize;

use pagecrypt_core::format::{KEY_SIZE, SALT_SIZE};
use pagecrypt_core::{CipherConfig, PagecryptResult};

use crate::kdf::pbkdf2_hmac_sha1_into;

/// The 256-bit AES key for every page in a file. Zeroized on drop.
#[derive(Clone)]
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The 256-bit HMAC-SHA1 key for page authentication. Zeroized on drop.
#[derive(Clone)]
pub struct MacKey {
    bytes: [u8; KEY_SIZE],
}

impl MacKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for MacKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MacKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Both keys for one file, derived once per invocation.
#[derive(Debug, Clone)]
pub struct PageKeys {
    pub key: DerivedKey,
    pub mac_key: MacKey,
}

/// Derive the page key and MAC key for a file with the given salt.
///
/// `key = PBKDF2(password, salt, kdf_iterations)` and
/// `mac_key = PBKDF2(key, salt ^ hmac_salt_mask, mac_kdf_iterations)`.
pub fn derive_page_keys(
    password: &[u8],
    salt: &[u8; SALT_SIZE],
    cipher: &CipherConfig,
) -> PagecryptResult<PageKeys> {
    let key = DerivedKey::from_bytes(derive_key_bytes(
        password,
        salt,
        cipher.kdf_iterations,
    )?);

    let mac_salt = mac_salt(salt, cipher.hmac_salt_mask);
    let mac_key = MacKey::from_bytes(derive_key_bytes(
        key.as_bytes(),
        &mac_salt,
        cipher.mac_kdf_iterations,
    )?);

    tracing::debug!(
        kdf_iterations = cipher.kdf_iterations,
        mac_kdf_iterations = cipher.mac_kdf_iterations,
        "derived page keys"
    );

    Ok(PageKeys { key, mac_key })
}

/// The MAC key salt: every salt byte XORed with `mask`.
pub fn mac_salt(salt: &[u8; SALT_SIZE], mask: u8) -> [u8; SALT_SIZE] {
    salt.map(|b| b ^ mask)
}

fn derive_key_bytes(password: &[u8], salt: &[u8], iterations: u32) -> PagecryptResult<[u8; KEY_SIZE]> {
    let mut bytes = [0u8; KEY_SIZE];
    pbkdf2_hmac_sha1_into(password, salt, iterations, &mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::pbkdf2_hmac_sha1;

    fn fast_cipher() -> CipherConfig {
        CipherConfig {
            kdf_iterations: 4,
            ..CipherConfig::default()
        }
    }

    #[test]
    fn test_page_keys_deterministic() {
        let salt = [7u8; SALT_SIZE];
        let a = derive_page_keys(b"secret", &salt, &fast_cipher()).unwrap();
        let b = derive_page_keys(b"secret", &salt, &fast_cipher()).unwrap();

        assert_eq!(a.key.as_bytes(), b.key.as_bytes());
        assert_eq!(a.mac_key.as_bytes(), b.mac_key.as_bytes());
    }

    #[test]
    fn test_mac_key_chains_from_page_key() {
        let salt = [0x11u8; SALT_SIZE];
        let cipher = fast_cipher();
        let keys = derive_page_keys(b"secret", &salt, &cipher).unwrap();

        let expected = pbkdf2_hmac_sha1(keys.key.as_bytes(), &[0x11 ^ 0x3a; SALT_SIZE], 2, 32).unwrap();
        assert_eq!(keys.mac_key.as_bytes().as_slice(), expected.as_slice());
        assert_ne!(keys.key.as_bytes(), keys.mac_key.as_bytes());
    }

    #[test]
    fn test_page_key_uses_configured_iterations() {
        let salt = [3u8; SALT_SIZE];
        let keys = derive_page_keys(b"secret", &salt, &fast_cipher()).unwrap();

        let expected = pbkdf2_hmac_sha1(b"secret", &salt, 4, 32).unwrap();
        assert_eq!(keys.key.as_bytes().as_slice(), expected.as_slice());
    }

    #[test]
    fn test_different_salts_different_keys() {
        let a = derive_page_keys(b"secret", &[1u8; SALT_SIZE], &fast_cipher()).unwrap();
        let b = derive_page_keys(b"secret", &[2u8; SALT_SIZE], &fast_cipher()).unwrap();
        assert_ne!(a.key.as_bytes(), b.key.as_bytes());
    }

    #[test]
    fn test_mac_salt_mask() {
        let salt: [u8; SALT_SIZE] = std::array::from_fn(|i| i as u8);
        let masked = mac_salt(&salt, 0x3a);
        for (i, b) in masked.iter().enumerate() {
            assert_eq!(*b, i as u8 ^ 0x3a);
        }
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let keys = PageKeys {
            key: DerivedKey::from_bytes([0xAB; KEY_SIZE]),
            mac_key: MacKey::from_bytes([0xCD; KEY_SIZE]),
        };
        let rendered = format!("{keys:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("171"), "raw key bytes must not appear: {rendered}");
    }
}
