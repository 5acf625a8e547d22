//! pagecrypt-crypto: page-level decryption for password-encrypted database files
//!
//! Scheme: AES-256-CBC per page, HMAC-SHA1 page authentication, PBKDF2-HMAC-SHA1 keys
//!
//! Pipeline: salt → PBKDF2 key → PBKDF2 MAC key → verify page 1 → decrypt pages → header + pages
//!
//! Key hierarchy:
//! ```text
//! Password (already hashed, raw bytes)
//!   └── Page Key (PBKDF2-HMAC-SHA1, salt = file salt, 64000 rounds)
//!       ├── AES-256-CBC per page (key=page_key, iv=page reserve[0..16])
//!       └── MAC Key (PBKDF2-HMAC-SHA1, salt = file salt ^ 0x3a, 2 rounds)
//!           └── HMAC-SHA1 per page (data = payload || iv || page_no LE32)
//! ```
//!
//! Only page 1 is authenticated by default, and only as a password check. Later
//! pages decrypt without verification; a corrupted page yields garbage, not an
//! error. [`VerifyMode::AllPages`] opts into checking every page.

pub mod database;
pub mod file;
pub mod kdf;
pub mod keys;
pub mod page;

pub use database::{check_password, decrypt_database, decrypt_with_keys, encrypt_database};
pub use file::{decrypt_file, default_output_path, encrypt_file, FileReport};
pub use kdf::{pbkdf2_hmac_sha1, pbkdf2_hmac_sha1_into};
pub use keys::{derive_page_keys, DerivedKey, MacKey, PageKeys};
pub use page::{decrypt_page, encrypt_page, verify_page, verify_page1};

pub use pagecrypt_core::format;
pub use pagecrypt_core::{CipherConfig, DecryptConfig, PagecryptError, PagecryptResult, VerifyMode};
