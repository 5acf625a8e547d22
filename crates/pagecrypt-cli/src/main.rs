//! pagecrypt: recover page-encrypted database files
//!
//! Commands:
//!   decrypt <key-hex> <input>  - write the plaintext database next to the input
//!   verify <key-hex> <input>   - check the key against page 1 only
//!   encrypt <key-hex> <input>  - re-encrypt a recovered plaintext database
//!
//! Exit codes: 0 success, 1 I/O or other failure, 2 wrong key or failed page
//! authentication, 3 malformed input.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretSlice, SecretString};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, warn};

use pagecrypt_core::format::SALT_SIZE;
use pagecrypt_core::{PagecryptConfig, PagecryptError, VerifyMode};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "pagecrypt",
    version,
    about = "Recover page-encrypted database files",
    long_about = "pagecrypt: decrypt AES-256-CBC / HMAC-SHA1 page-encrypted database files \
                  given the hex-encoded key material"
)]
struct Cli {
    /// Path to configuration file (default: pagecrypt.toml, optional)
    #[arg(long, short = 'c', env = "PAGECRYPT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "PAGECRYPT_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decrypt an encrypted database file
    Decrypt {
        /// Hex-encoded key material (already hashed passphrase)
        key: String,
        /// Encrypted database file
        input: PathBuf,
        /// Output path (default: input path + configured suffix)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Authenticate every page, not just page 1
        #[arg(long)]
        verify_all: bool,
        /// Decrypt pages on a single thread
        #[arg(long)]
        sequential: bool,
    },

    /// Check the key against page 1 without writing anything
    Verify {
        /// Hex-encoded key material
        key: String,
        /// Encrypted database file
        input: PathBuf,
    },

    /// Encrypt a recovered plaintext database file
    Encrypt {
        /// Hex-encoded key material
        key: String,
        /// Plaintext database file (must start with the SQLite header)
        input: PathBuf,
        /// Output path (default: input path + ".enc.db")
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Hex-encoded 16-byte salt (default: random)
        #[arg(long)]
        salt: Option<String>,
        /// Encrypt pages on a single thread
        #[arg(long)]
        sequential: bool,
    },
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

const DEFAULT_CONFIG: &str = "pagecrypt.toml";

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_status(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let (config_path, explicit) = resolve_config_path(cli.config.as_deref());
    let config = PagecryptConfig::load(&config_path)
        .with_context(|| format!("loading config: {}", config_path.display()))?;

    let level = cli.log.as_deref().unwrap_or(&config.log.level);
    let format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(level, &format);

    if !config_path.exists() {
        if explicit {
            warn!("config file not found: {}  (using defaults)", config_path.display());
        } else {
            debug!("config file not found: {}  (using defaults)", config_path.display());
        }
    }

    match cli.command {
        Commands::Decrypt { key, input, output, verify_all, sequential } => {
            cmd_decrypt(&config, key, &input, output.as_deref(), verify_all, sequential)
        }
        Commands::Verify { key, input } => cmd_verify(&config, key, &input),
        Commands::Encrypt { key, input, output, salt, sequential } => {
            cmd_encrypt(&config, key, &input, output.as_deref(), salt.as_deref(), sequential)
        }
    }
}

/// The config path to load, and whether it was named by `--config` or `PAGECRYPT_CONFIG`.
fn resolve_config_path(arg: Option<&Path>) -> (PathBuf, bool) {
    match arg {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG), false),
    }
}

fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PagecryptError>() {
        Some(e) if e.is_authentication() => 2,
        Some(PagecryptError::MalformedInput(_)) => 3,
        _ => 1,
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Key handling ──────────────────────────────────────────────────────────────

/// Decode the hex key argument. The raw bytes are the PBKDF2 password.
fn decode_key(key_hex: String) -> Result<SecretSlice<u8>> {
    let key_hex = SecretString::from(key_hex);
    let bytes = hex::decode(key_hex.expose_secret().trim())
        .map_err(PagecryptError::from)
        .context("decoding key")?;
    debug!(key_len = bytes.len(), "key decoded");
    Ok(SecretSlice::from(bytes))
}

fn parse_salt(salt_hex: Option<&str>) -> Result<[u8; SALT_SIZE]> {
    let mut salt = [0u8; SALT_SIZE];
    match salt_hex {
        Some(s) => {
            let bytes = hex::decode(s.trim())
                .map_err(PagecryptError::from)
                .context("decoding salt")?;
            if bytes.len() != SALT_SIZE {
                anyhow::bail!("salt must be {SALT_SIZE} bytes, got {}", bytes.len());
            }
            salt.copy_from_slice(&bytes);
        }
        None => rand::thread_rng().fill_bytes(&mut salt),
    }
    Ok(salt)
}

// ── Progress helpers ──────────────────────────────────────────────────────────

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ── `pagecrypt decrypt` ───────────────────────────────────────────────────────

fn cmd_decrypt(
    config: &PagecryptConfig,
    key_hex: String,
    input: &Path,
    output: Option<&Path>,
    verify_all: bool,
    sequential: bool,
) -> Result<()> {
    let password = decode_key(key_hex)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| pagecrypt_crypto::default_output_path(input, &config.output.suffix));

    let mut options = config.decrypt.clone();
    if verify_all {
        options.verify = VerifyMode::AllPages;
    }
    if sequential {
        options.parallel = false;
    }

    println!("Decrypting {} → {}", input.display(), output.display());
    if options.verify == VerifyMode::FirstPage {
        println!("  note: only page 1 is authenticated; use --verify-all to check every page");
    }

    let pb = make_spinner("decrypt");
    pb.set_message("deriving keys and decrypting pages...");
    let result = pagecrypt_crypto::decrypt_file(
        input,
        &output,
        password.expose_secret(),
        &config.cipher,
        &options,
    );
    pb.finish_and_clear();

    let report = result.with_context(|| format!("decrypting {}", input.display()))?;

    println!("Decryption successful!");
    println!("  pages:   {}", report.pages);
    println!("  bytes:   {}", fmt_bytes(report.bytes));
    println!("  output:  {}", report.output.display());
    Ok(())
}

// ── `pagecrypt verify` ────────────────────────────────────────────────────────

fn cmd_verify(config: &PagecryptConfig, key_hex: String, input: &Path) -> Result<()> {
    let password = decode_key(key_hex)?;
    let encrypted = std::fs::read(input)
        .map_err(|e| PagecryptError::io(input, e))
        .with_context(|| format!("reading {}", input.display()))?;

    let pb = make_spinner("verify");
    pb.set_message("deriving keys...");
    let result = pagecrypt_crypto::check_password(&encrypted, password.expose_secret(), &config.cipher);
    pb.finish_and_clear();

    result.with_context(|| format!("verifying {}", input.display()))?;

    println!("Key OK: page 1 of {} authenticated", input.display());
    Ok(())
}

// ── `pagecrypt encrypt` ───────────────────────────────────────────────────────

fn cmd_encrypt(
    config: &PagecryptConfig,
    key_hex: String,
    input: &Path,
    output: Option<&Path>,
    salt_hex: Option<&str>,
    sequential: bool,
) -> Result<()> {
    let password = decode_key(key_hex)?;
    let salt = parse_salt(salt_hex)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| pagecrypt_crypto::default_output_path(input, ".enc.db"));
    let parallel = config.decrypt.parallel && !sequential;

    println!("Encrypting {} → {}", input.display(), output.display());

    let pb = make_spinner("encrypt");
    pb.set_message("deriving keys and encrypting pages...");
    let result = pagecrypt_crypto::encrypt_file(
        input,
        &output,
        password.expose_secret(),
        &salt,
        &config.cipher,
        parallel,
    );
    pb.finish_and_clear();

    let report = result.with_context(|| format!("encrypting {}", input.display()))?;

    println!("Encryption successful!");
    println!("  salt:    {}", hex::encode(salt));
    println!("  pages:   {}", report.pages);
    println!("  bytes:   {}", fmt_bytes(report.bytes));
    println!("  output:  {}", report.output.display());
    Ok(())
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
