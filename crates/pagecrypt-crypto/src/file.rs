//! File-level decrypt/encrypt: bulk read, transform, atomic write
//!
//! Output is written to a temporary file in the destination directory and renamed
//! into place, so a failed run never leaves a partial output file behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

use pagecrypt_core::format::SALT_SIZE;
use pagecrypt_core::{CipherConfig, DecryptConfig, PagecryptError, PagecryptResult};

use crate::database::{decrypt_database, encrypt_database};

/// Summary of a completed file transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub output: PathBuf,
    pub pages: usize,
    pub bytes: u64,
}

/// Output path used when none is given: the input path with `suffix` appended.
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let mut path = input.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}

/// Decrypt `input` into `output`. The input file is never modified.
pub fn decrypt_file(
    input: &Path,
    output: &Path,
    password: &[u8],
    cipher: &CipherConfig,
    options: &DecryptConfig,
) -> PagecryptResult<FileReport> {
    ensure_distinct(input, output)?;
    let encrypted = std::fs::read(input).map_err(|e| PagecryptError::io(input, e))?;

    let plaintext = decrypt_database(&encrypted, password, cipher, options)?;
    write_atomic(output, &plaintext)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        bytes = plaintext.len(),
        "decrypted file written"
    );
    Ok(report(output, &plaintext, cipher))
}

/// Encrypt a recovered plaintext `input` into `output` under `salt`.
pub fn encrypt_file(
    input: &Path,
    output: &Path,
    password: &[u8],
    salt: &[u8; SALT_SIZE],
    cipher: &CipherConfig,
    parallel: bool,
) -> PagecryptResult<FileReport> {
    ensure_distinct(input, output)?;
    let plaintext = std::fs::read(input).map_err(|e| PagecryptError::io(input, e))?;

    let encrypted = encrypt_database(&plaintext, password, salt, cipher, parallel)?;
    write_atomic(output, &encrypted)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        bytes = encrypted.len(),
        "encrypted file written"
    );
    Ok(report(output, &encrypted, cipher))
}

fn report(output: &Path, data: &[u8], cipher: &CipherConfig) -> FileReport {
    FileReport {
        output: output.to_path_buf(),
        pages: data.len() / cipher.page_size,
        bytes: data.len() as u64,
    }
}

fn ensure_distinct(input: &Path, output: &Path) -> PagecryptResult<()> {
    let same = match (input.canonicalize(), output.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => input == output,
    };
    if same {
        return Err(PagecryptError::Config(format!(
            "output path must differ from input: {}",
            input.display()
        )));
    }
    Ok(())
}

fn write_atomic(path: &Path, data: &[u8]) -> PagecryptResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PagecryptError::io(dir, e))?;
    tmp.write_all(data)
        .map_err(|e| PagecryptError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| PagecryptError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| PagecryptError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path_appends_suffix() {
        assert_eq!(
            default_output_path(Path::new("/data/msg.db"), ".dec.db"),
            PathBuf::from("/data/msg.db.dec.db")
        );
        assert_eq!(
            default_output_path(Path::new("plain"), ".out"),
            PathBuf::from("plain.out")
        );
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.db");
        std::fs::write(&path, b"old contents").unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temporary file must be renamed away");
    }

    #[test]
    fn test_same_input_and_output_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("enc.db");
        std::fs::write(&path, vec![0u8; 4096]).unwrap();

        let result = decrypt_file(
            &path,
            &dir.path().join(".").join("enc.db"),
            b"pw",
            &CipherConfig::default(),
            &DecryptConfig::default(),
        );
        assert!(matches!(result, Err(PagecryptError::Config(_))));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0u8; 4096]);
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = decrypt_file(
            &dir.path().join("absent.db"),
            &dir.path().join("absent.db.dec.db"),
            b"pw",
            &CipherConfig::default(),
            &DecryptConfig::default(),
        );
        assert!(matches!(result, Err(PagecryptError::Io { .. })));
    }
}
