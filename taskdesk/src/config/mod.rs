//! Configuration for the `taskdesk` client.
//!
//! Layered with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskdesk/config.toml`)
//! 4. Compiled defaults
//!
//! A missing default config file is not an error. An explicit `--config`
//! path that doesn't exist is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:4000";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// The API base URL is not an absolute http(s) URL.
    #[error("invalid API base URL {value:?}: {reason}")]
    InvalidBaseUrl {
        /// The configured value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A request timeout of zero would fail every call.
    #[error("request timeout must be at least one second")]
    ZeroTimeout,
}

/// What to do with the stored session when the server rejects its token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AuthFailurePolicy {
    /// Drop the session and send the user to login.
    #[default]
    ClearSession,
    /// Keep the token and only report the failure. The current view stays
    /// put; no redirect to login happens.
    KeepToken,
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiFileConfig,
    session: SessionFileConfig,
}

/// `[api]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ApiFileConfig {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// `[session]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SessionFileConfig {
    credentials_path: Option<PathBuf>,
    auth_failure_policy: Option<AuthFailurePolicy>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST API base URL.
    pub base_url: Url,
    /// Timeout applied to every request.
    pub request_timeout: Duration,
    /// File holding the persisted session.
    pub credentials_path: PathBuf,
    /// Reaction to a rejected token.
    pub auth_failure_policy: AuthFailurePolicy,
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read,
    /// any file cannot be parsed, or a resolved value is invalid.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Resolve from CLI args and a parsed file. Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let raw_url = cli
            .base_url
            .clone()
            .or_else(|| file.api.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = parse_base_url(&raw_url)?;

        let timeout_secs = cli
            .request_timeout_secs
            .or(file.api.request_timeout_secs)
            .unwrap_or(15);
        if timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let credentials_path = cli
            .credentials
            .clone()
            .or_else(|| file.session.credentials_path.clone())
            .unwrap_or_else(default_credentials_path);

        let auth_failure_policy = cli
            .auth_failure_policy
            .or(file.session.auth_failure_policy)
            .unwrap_or_default();

        Ok(Self {
            base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            credentials_path,
            auth_failure_policy,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        value: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.cannot_be_a_base() || url.host().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// `$XDG_DATA_HOME/taskdesk/session.json`, or the temp dir as a fallback.
#[must_use]
pub fn default_credentials_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("taskdesk")
        .join("session.json")
}

/// Global CLI arguments, flattened into the binary's parser.
#[derive(clap::Args, Debug, Default, Clone)]
pub struct CliArgs {
    /// Base URL of the task API.
    #[arg(long, global = true, env = "TASKDESK_API_URL")]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, env = "TASKDESK_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Session file (default: `~/.local/share/taskdesk/session.json`).
    #[arg(long, global = true, env = "TASKDESK_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// What to do with the session when the server rejects its token.
    #[arg(long, global = true, value_enum)]
    pub auth_failure_policy: Option<AuthFailurePolicy>,

    /// Path to config file (default: `~/.config/taskdesk/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info", env = "TASKDESK_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskdesk.log`).
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist. Otherwise the default
/// path is tried and a missing file is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("taskdesk").join("config.toml");
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
