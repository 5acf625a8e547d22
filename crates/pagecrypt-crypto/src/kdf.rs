//! PBKDF2 with an HMAC-SHA1 pseudorandom function

use hmac::{Hmac, Mac};
use sha1::Sha1;
use zeroize::Zeroize;

use pagecrypt_core::format::DIGEST_SIZE;
use pagecrypt_core::{PagecryptError, PagecryptResult};

pub type HmacSha1 = Hmac<Sha1>;

/// Derive `output_len` bytes from `password` and `salt`.
///
/// Each 20-byte block `i` (1-based) is `U1 ^ U2 ^ ... ^ Uc` where
/// `U1 = HMAC(password, salt || BE32(i))` and `Uj = HMAC(password, U(j-1))`.
/// Blocks are concatenated and the last one truncated. `iterations == 0`
/// behaves like 1.
pub fn pbkdf2_hmac_sha1(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> PagecryptResult<Vec<u8>> {
    let mut derived = vec![0u8; output_len];
    pbkdf2_hmac_sha1_into(password, salt, iterations, &mut derived)?;
    Ok(derived)
}

/// Same as [`pbkdf2_hmac_sha1`], filling `out` in place.
pub fn pbkdf2_hmac_sha1_into(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    out: &mut [u8],
) -> PagecryptResult<()> {
    let prf = HmacSha1::new_from_slice(password)
        .map_err(|e| PagecryptError::Crypto(format!("HMAC-SHA1 key setup failed: {e}")))?;

    let mut u = [0u8; DIGEST_SIZE];
    let mut block = [0u8; DIGEST_SIZE];

    for (i, chunk) in out.chunks_mut(DIGEST_SIZE).enumerate() {
        let mut mac = prf.clone();
        mac.update(salt);
        mac.update(&(i as u32 + 1).to_be_bytes());
        u.copy_from_slice(&mac.finalize().into_bytes());
        block.copy_from_slice(&u);

        for _ in 1..iterations {
            let mut mac = prf.clone();
            mac.update(&u);
            u.copy_from_slice(&mac.finalize().into_bytes());
            block.iter_mut().zip(u.iter()).for_each(|(b, x)| *b ^= x);
        }

        chunk.copy_from_slice(&block[..chunk.len()]);
    }

    u.zeroize();
    block.zeroize();
    Ok(())
}
