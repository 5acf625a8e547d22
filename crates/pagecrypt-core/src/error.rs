use std::path::PathBuf;

use thiserror::Error;

pub type PagecryptResult<T> = Result<T, PagecryptError>;

#[derive(Debug, Error)]
pub enum PagecryptError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Page 1 failed HMAC verification. The key material does not match this file.
    #[error("incorrect password: page 1 failed authentication")]
    WrongPassword,

    /// Only produced in verify-all-pages mode.
    #[error("page {page} failed authentication")]
    PageAuthentication { page: u32 },

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl PagecryptError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures a different password could fix.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::WrongPassword | Self::PageAuthentication { .. })
    }
}
