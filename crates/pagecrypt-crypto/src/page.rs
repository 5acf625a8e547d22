//! Single-page authentication and AES-256-CBC decryption
//!
//! Page format (binary):
//! ```text
//! [N bytes: AES-256-CBC payload][16 bytes: IV][20 bytes: HMAC-SHA1][12 bytes: reserved]
//! MAC = HMAC-SHA1(mac_key, payload || IV || page_no (4 bytes, little-endian))
//! ```
//!
//! The reserve area (IV, MAC, reserved bytes) is never encrypted and is carried
//! through decryption unchanged.

use cbc::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes256;
use hmac::Mac;

use pagecrypt_core::format::{BLOCK_SIZE, HMAC_SIZE, IV_SIZE};
use pagecrypt_core::{CipherConfig, PagecryptError, PagecryptResult};

use crate::kdf::HmacSha1;
use crate::keys::{DerivedKey, MacKey, PageKeys};

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;

/// Check page 1's MAC. This is the password check.
pub fn verify_page1(page1: &[u8], mac_key: &MacKey, cipher: &CipherConfig) -> PagecryptResult<bool> {
    verify_page(page1, 1, mac_key, cipher)
}

/// Check the MAC of the page with 1-based number `page_number`, in constant time.
pub fn verify_page(
    page: &[u8],
    page_number: u32,
    mac_key: &MacKey,
    cipher: &CipherConfig,
) -> PagecryptResult<bool> {
    split_page(page, cipher)?;
    let mac_offset = cipher.mac_offset(page.len());
    let mac = page_mac(&page[..mac_offset], page_number, mac_key)?;
    Ok(mac
        .verify_slice(&page[mac_offset..mac_offset + HMAC_SIZE])
        .is_ok())
}

/// Decrypt one page: returns `plaintext payload || reserve`, same length as `page`.
pub fn decrypt_page(page: &[u8], key: &DerivedKey, cipher: &CipherConfig) -> PagecryptResult<Vec<u8>> {
    let (payload, reserve) = split_page(page, cipher)?;

    let mut out = Vec::with_capacity(page.len());
    out.extend_from_slice(payload);

    Aes256CbcDec::new_from_slices(key.as_bytes(), &reserve[..IV_SIZE])
        .map_err(|e| PagecryptError::Crypto(format!("AES-256-CBC setup failed: {e}")))?
        .decrypt_padded_mut::<NoPadding>(&mut out)
        .map_err(|_| PagecryptError::MalformedInput("page payload is not block-aligned".into()))?;

    out.extend_from_slice(reserve);
    Ok(out)
}

/// Encrypt one plaintext page with the IV already present in its reserve area.
///
/// The MAC field is recomputed for `page_number`; the reserved bytes are kept.
/// Inverse of [`decrypt_page`] for authentic pages.
pub fn encrypt_page(
    page: &[u8],
    page_number: u32,
    keys: &PageKeys,
    cipher: &CipherConfig,
) -> PagecryptResult<Vec<u8>> {
    let (payload, reserve) = split_page(page, cipher)?;

    let mut out = Vec::with_capacity(page.len());
    out.extend_from_slice(payload);
    let payload_len = out.len();

    Aes256CbcEnc::new_from_slices(keys.key.as_bytes(), &reserve[..IV_SIZE])
        .map_err(|e| PagecryptError::Crypto(format!("AES-256-CBC setup failed: {e}")))?
        .encrypt_padded_mut::<NoPadding>(&mut out, payload_len)
        .map_err(|_| PagecryptError::MalformedInput("page payload is not block-aligned".into()))?;

    out.extend_from_slice(reserve);

    let mac_offset = cipher.mac_offset(out.len());
    let tag = page_mac(&out[..mac_offset], page_number, &keys.mac_key)?.finalize().into_bytes();
    out[mac_offset..mac_offset + HMAC_SIZE].copy_from_slice(&tag);
    Ok(out)
}

/// Split a page into (payload, reserve), rejecting pages the cipher cannot process.
fn split_page<'a>(page: &'a [u8], cipher: &CipherConfig) -> PagecryptResult<(&'a [u8], &'a [u8])> {
    cipher.validate()?;
    if page.len() <= cipher.reserve_size {
        return Err(PagecryptError::MalformedInput(format!(
            "page too short: {} bytes (reserve alone is {})",
            page.len(),
            cipher.reserve_size
        )));
    }

    let (payload, reserve) = page.split_at(page.len() - cipher.reserve_size);
    if payload.len() % BLOCK_SIZE != 0 {
        return Err(PagecryptError::MalformedInput(format!(
            "page payload of {} bytes is not a multiple of the {BLOCK_SIZE}-byte cipher block",
            payload.len()
        )));
    }
    Ok((payload, reserve))
}

fn page_mac(authenticated: &[u8], page_number: u32, mac_key: &MacKey) -> PagecryptResult<HmacSha1> {
    let mut mac = HmacSha1::new_from_slice(mac_key.as_bytes())
        .map_err(|e| PagecryptError::Crypto(format!("HMAC-SHA1 key setup failed: {e}")))?;
    mac.update(authenticated);
    mac.update(&page_number.to_le_bytes());
    Ok(mac)
}
