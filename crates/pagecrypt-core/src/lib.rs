pub mod config;
pub mod error;
pub mod format;

pub use config::{CipherConfig, DecryptConfig, PagecryptConfig, VerifyMode};
pub use error::{PagecryptError, PagecryptResult};
