use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PagecryptError, PagecryptResult};
use crate::format::{
    BLOCK_SIZE, DEFAULT_HMAC_SALT_MASK, DEFAULT_KDF_ITERATIONS, DEFAULT_MAC_KDF_ITERATIONS,
    DEFAULT_PAGE_SIZE, DEFAULT_RESERVE_SIZE, HMAC_SIZE, IV_SIZE, SALT_SIZE,
};

/// Top-level configuration (loaded from pagecrypt.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PagecryptConfig {
    pub cipher: CipherConfig,
    pub decrypt: DecryptConfig,
    pub output: OutputConfig,
    pub log: LogConfig,
}

impl PagecryptConfig {
    /// Load from a TOML file, falling back to defaults when the file does not exist.
    ///
    /// Runs before logging is set up, so callers report the missing-file case.
    pub fn load(path: &Path) -> PagecryptResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| PagecryptError::io(path, e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| PagecryptError::Config(format!("parsing {}: {e}", path.display())))?;
        config.cipher.validate()?;
        Ok(config)
    }
}

/// Parameters of the page encryption scheme.
///
/// Defaults describe the one supported variant: 4096-byte pages, 64000 PBKDF2 rounds,
/// 2 rounds for the MAC key, salt mask 0x3a, 48-byte reserve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherConfig {
    /// Page size in bytes (default: 4096)
    pub page_size: usize,
    /// PBKDF2 rounds for the encryption key (default: 64000)
    pub kdf_iterations: u32,
    /// PBKDF2 rounds for the MAC key (default: 2)
    pub mac_kdf_iterations: u32,
    /// Byte XORed into every salt byte to form the MAC key salt (default: 0x3a)
    pub hmac_salt_mask: u8,
    /// Bytes at the end of each page holding IV, MAC and padding (default: 48)
    pub reserve_size: usize,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
            mac_kdf_iterations: DEFAULT_MAC_KDF_ITERATIONS,
            hmac_salt_mask: DEFAULT_HMAC_SALT_MASK,
            reserve_size: DEFAULT_RESERVE_SIZE,
        }
    }
}

impl CipherConfig {
    pub fn validate(&self) -> PagecryptResult<()> {
        if !self.page_size.is_power_of_two() || !(512..=65536).contains(&self.page_size) {
            return Err(PagecryptError::Config(format!(
                "page_size must be a power of two between 512 and 65536, got {}",
                self.page_size
            )));
        }
        if self.reserve_size < IV_SIZE + HMAC_SIZE || self.reserve_size % BLOCK_SIZE != 0 {
            return Err(PagecryptError::Config(format!(
                "reserve_size must be a multiple of {BLOCK_SIZE} and at least {}, got {}",
                IV_SIZE + HMAC_SIZE,
                self.reserve_size
            )));
        }
        if self.reserve_size + SALT_SIZE >= self.page_size {
            return Err(PagecryptError::Config(format!(
                "reserve_size {} leaves no payload in a {}-byte first page",
                self.reserve_size, self.page_size
            )));
        }
        if self.kdf_iterations == 0 || self.mac_kdf_iterations == 0 {
            return Err(PagecryptError::Config(
                "kdf_iterations and mac_kdf_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Offset of the MAC within a page of `page_len` bytes.
    pub fn mac_offset(&self, page_len: usize) -> usize {
        page_len - self.reserve_size + IV_SIZE
    }
}

/// How much of the file is authenticated during decryption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerifyMode {
    /// Check page 1 only, as a password test. Later pages are not authenticated.
    #[default]
    FirstPage,
    /// Check every page's MAC before decrypting it.
    AllPages,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecryptConfig {
    /// Authentication coverage (default: first-page)
    pub verify: VerifyMode,
    /// Decrypt pages on the rayon pool (default: true)
    pub parallel: bool,
}

impl Default for DecryptConfig {
    fn default() -> Self {
        Self {
            verify: VerifyMode::FirstPage,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Suffix appended to the input path when no output path is given
    pub suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: ".dec.db".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[cipher]
page_size = 1024
kdf_iterations = 4000
mac_kdf_iterations = 2
hmac_salt_mask = 58
reserve_size = 48

[decrypt]
verify = "all-pages"
parallel = false

[output]
suffix = ".plain.db"

[log]
level = "debug"
format = "json"
"#;
        let config: PagecryptConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.cipher.page_size, 1024);
        assert_eq!(config.cipher.kdf_iterations, 4000);
        assert_eq!(config.cipher.hmac_salt_mask, 0x3a);
        assert_eq!(config.decrypt.verify, VerifyMode::AllPages);
        assert!(!config.decrypt.parallel);
        assert_eq!(config.output.suffix, ".plain.db");
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
        config.cipher.validate().unwrap();
    }

    #[test]
    fn test_parse_defaults() {
        let config: PagecryptConfig = toml::from_str("").unwrap();

        assert_eq!(config.cipher, CipherConfig::default());
        assert_eq!(config.cipher.page_size, 4096);
        assert_eq!(config.cipher.kdf_iterations, 64_000);
        assert_eq!(config.cipher.mac_kdf_iterations, 2);
        assert_eq!(config.cipher.reserve_size, 48);
        assert_eq!(config.decrypt.verify, VerifyMode::FirstPage);
        assert!(config.decrypt.parallel);
        assert_eq!(config.output.suffix, ".dec.db");
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[cipher]
kdf_iterations = 256000
"#;
        let config: PagecryptConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.cipher.kdf_iterations, 256_000);
        // Defaults
        assert_eq!(config.cipher.page_size, 4096);
        assert_eq!(config.cipher.reserve_size, 48);
        assert_eq!(config.output.suffix, ".dec.db");
    }

    #[test]
    fn test_validate_rejects_bad_page_size() {
        for page_size in [0, 1000, 256, 131072] {
            let cipher = CipherConfig {
                page_size,
                ..CipherConfig::default()
            };
            assert!(
                matches!(cipher.validate(), Err(PagecryptError::Config(_))),
                "page_size {page_size} must be rejected"
            );
        }
    }

    #[test]
    fn test_validate_rejects_bad_reserve() {
        for reserve_size in [0, 32, 40, 512] {
            let cipher = CipherConfig {
                page_size: 512,
                reserve_size,
                ..CipherConfig::default()
            };
            assert!(
                cipher.validate().is_err(),
                "reserve_size {reserve_size} must be rejected"
            );
        }
    }

    #[test]
    fn test_validate_rejects_zero_iterations() {
        let cipher = CipherConfig {
            kdf_iterations: 0,
            ..CipherConfig::default()
        };
        assert!(cipher.validate().is_err());
    }

    #[test]
    fn test_mac_offset_default_layout() {
        let cipher = CipherConfig::default();
        // MAC sits at [len-32, len-12) for the 48-byte reserve
        assert_eq!(cipher.mac_offset(4080), 4080 - 32);
        assert_eq!(cipher.mac_offset(4096), 4096 - 32);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = PagecryptConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.cipher, CipherConfig::default());
    }

    #[test]
    fn test_load_rejects_invalid_cipher() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pagecrypt.toml");
        std::fs::write(&path, "[cipher]\npage_size = 3000\n").unwrap();

        let result = PagecryptConfig::load(&path);
        assert!(matches!(result, Err(PagecryptError::Config(_))));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = PagecryptConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: PagecryptConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.cipher, parsed.cipher);
        assert_eq!(config.decrypt.verify, parsed.decrypt.verify);
        assert_eq!(config.output.suffix, parsed.output.suffix);
    }
}
