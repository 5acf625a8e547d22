//! Constants of the page encryption format.
//!
//! ```text
//! encrypted file:  [16 salt][page 1: payload | reserve][page 2: payload | reserve]...
//! reserve:         [16 IV][20 HMAC-SHA1][12 reserved]
//! plaintext file:  [16 "SQLite format 3\0"][page 1 plaintext | reserve]...
//! ```
//!
//! Page 1 is `SALT_SIZE` bytes shorter than the rest because the salt occupies the
//! start of the first physical page.

/// Random salt stored at the start of the encrypted file
pub const SALT_SIZE: usize = 16;

/// AES-256 key size, also the MAC key size
pub const KEY_SIZE: usize = 32;

/// AES block size; payloads must be a multiple of this
pub const BLOCK_SIZE: usize = 16;

/// CBC initialization vector, first field of the reserve area
pub const IV_SIZE: usize = 16;

/// HMAC-SHA1 digest size, second field of the reserve area
pub const HMAC_SIZE: usize = 20;

/// SHA1 digest size, the PBKDF2 block size
pub const DIGEST_SIZE: usize = 20;

pub const DEFAULT_PAGE_SIZE: usize = 4096;
pub const DEFAULT_KDF_ITERATIONS: u32 = 64_000;
pub const DEFAULT_MAC_KDF_ITERATIONS: u32 = 2;
pub const DEFAULT_HMAC_SALT_MASK: u8 = 0x3a;
pub const DEFAULT_RESERVE_SIZE: usize = 48;

/// Header that replaces the salt in the recovered plaintext file
pub const SQLITE_HEADER: [u8; SALT_SIZE] = *b"SQLite format 3\0";
