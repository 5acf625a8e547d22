//! Whole-file transform: split into pages, derive keys, verify page 1, decrypt every page
//!
//! Encrypted file layout:
//! ```text
//! [16 bytes: salt][page 1: page_size - 16 bytes][page 2: page_size bytes]...
//! ```
//! The plaintext file has the same layout with the salt replaced by the 16-byte
//! `SQLite format 3\0` header.

use rayon::prelude::*;
use tracing::{debug, info};

use pagecrypt_core::format::{SALT_SIZE, SQLITE_HEADER};
use pagecrypt_core::{CipherConfig, DecryptConfig, PagecryptError, PagecryptResult, VerifyMode};

use crate::keys::{derive_page_keys, PageKeys};
use crate::page::{decrypt_page, encrypt_page, verify_page, verify_page1};

/// Decrypt a whole encrypted database image.
///
/// Fails with [`PagecryptError::WrongPassword`] before any page is decrypted when
/// page 1's MAC does not match. Later pages are only authenticated in
/// [`VerifyMode::AllPages`].
pub fn decrypt_database(
    input: &[u8],
    password: &[u8],
    cipher: &CipherConfig,
    options: &DecryptConfig,
) -> PagecryptResult<Vec<u8>> {
    let pages = split_pages(input, cipher)?;
    let keys = derive_page_keys(password, &read_salt(input), cipher)?;
    debug!(pages = pages.len(), bytes = input.len(), "decrypting database");

    decrypt_pages(&pages, input.len(), &keys, cipher, options)
}

/// Decrypt with keys that were already derived for this file's salt.
pub fn decrypt_with_keys(
    input: &[u8],
    keys: &PageKeys,
    cipher: &CipherConfig,
    options: &DecryptConfig,
) -> PagecryptResult<Vec<u8>> {
    let pages = split_pages(input, cipher)?;
    decrypt_pages(&pages, input.len(), keys, cipher, options)
}

fn decrypt_pages(
    pages: &[&[u8]],
    input_len: usize,
    keys: &PageKeys,
    cipher: &CipherConfig,
    options: &DecryptConfig,
) -> PagecryptResult<Vec<u8>> {
    if !verify_page1(pages[0], &keys.mac_key, cipher)? {
        return Err(PagecryptError::WrongPassword);
    }

    let decrypt_one = |(index, page): (usize, &&[u8])| -> PagecryptResult<Vec<u8>> {
        let page_number = index as u32 + 1;
        if options.verify == VerifyMode::AllPages
            && page_number > 1
            && !verify_page(page, page_number, &keys.mac_key, cipher)?
        {
            return Err(PagecryptError::PageAuthentication { page: page_number });
        }
        decrypt_page(page, &keys.key, cipher)
    };

    let decrypted: Vec<Vec<u8>> = if options.parallel {
        pages.par_iter().enumerate().map(decrypt_one).collect::<PagecryptResult<_>>()?
    } else {
        pages.iter().enumerate().map(decrypt_one).collect::<PagecryptResult<_>>()?
    };

    let out = assemble(&SQLITE_HEADER, decrypted, input_len);
    info!(
        pages = pages.len(),
        bytes = out.len(),
        verify = ?options.verify,
        "database decrypted"
    );
    Ok(out)
}

/// Derive keys and check page 1 without decrypting anything.
pub fn check_password(input: &[u8], password: &[u8], cipher: &CipherConfig) -> PagecryptResult<()> {
    let pages = split_pages(input, cipher)?;
    let keys = derive_page_keys(password, &read_salt(input), cipher)?;

    if verify_page1(pages[0], &keys.mac_key, cipher)? {
        Ok(())
    } else {
        Err(PagecryptError::WrongPassword)
    }
}

/// Re-encrypt a recovered plaintext image under `salt`.
///
/// Each page is encrypted with the IV found in its own reserve area and gets a
/// fresh MAC, so re-encrypting the output of [`decrypt_database`] with the
/// original salt and password reproduces the original file.
pub fn encrypt_database(
    plaintext: &[u8],
    password: &[u8],
    salt: &[u8; SALT_SIZE],
    cipher: &CipherConfig,
    parallel: bool,
) -> PagecryptResult<Vec<u8>> {
    if !plaintext.starts_with(&SQLITE_HEADER) {
        return Err(PagecryptError::MalformedInput(
            "plaintext does not start with the SQLite header".into(),
        ));
    }
    let pages = split_pages(plaintext, cipher)?;
    let keys = derive_page_keys(password, salt, cipher)?;

    let encrypt_one = |(index, page): (usize, &&[u8])| -> PagecryptResult<Vec<u8>> {
        encrypt_page(page, index as u32 + 1, &keys, cipher)
    };

    let encrypted: Vec<Vec<u8>> = if parallel {
        pages.par_iter().enumerate().map(encrypt_one).collect::<PagecryptResult<_>>()?
    } else {
        pages.iter().enumerate().map(encrypt_one).collect::<PagecryptResult<_>>()?
    };

    let out = assemble(salt, encrypted, plaintext.len());
    info!(pages = pages.len(), bytes = out.len(), "database encrypted");
    Ok(out)
}

/// Slice a file image into pages: page 1 after the 16-byte prefix, then full pages.
///
/// Always yields at least one page.
pub fn split_pages<'a>(input: &'a [u8], cipher: &CipherConfig) -> PagecryptResult<Vec<&'a [u8]>> {
    cipher.validate()?;
    if input.len() < cipher.page_size || input.len() % cipher.page_size != 0 {
        return Err(PagecryptError::MalformedInput(format!(
            "file size {} is not a non-zero multiple of the {}-byte page size",
            input.len(),
            cipher.page_size
        )));
    }

    let mut pages = Vec::with_capacity(input.len() / cipher.page_size);
    pages.push(&input[SALT_SIZE..cipher.page_size]);
    pages.extend(input[cipher.page_size..].chunks_exact(cipher.page_size));
    Ok(pages)
}

/// Callers must have checked the length with [`split_pages`].
fn read_salt(input: &[u8]) -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    salt.copy_from_slice(&input[..SALT_SIZE]);
    salt
}

fn assemble(prefix: &[u8; SALT_SIZE], pages: Vec<Vec<u8>>, capacity: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(capacity);
    out.extend_from_slice(prefix);
    for page in pages {
        out.extend_from_slice(&page);
    }
    out
}
