//! Configuration for the stub server.
//!
//! Priority (highest first): CLI arguments, environment variables, the
//! TOML file at `~/.config/taskdesk-stub/config.toml`, compiled defaults.

use std::path::PathBuf;

/// Errors that can occur when loading stub configuration.
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
}

// ---------------------------------------------------------------------------
// TOML file structs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StubConfigFile {
    server: ServerFileConfig,
}

/// `[server]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    seed_demo: Option<bool>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the stub server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "In-memory TaskDesk API server")]
pub struct StubCliArgs {
    /// Address to bind to.
    #[arg(short, long, env = "TASKDESK_STUB_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/taskdesk-stub/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Start without the demo account and its tasks.
    #[arg(long)]
    pub empty: bool,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKDESK_STUB_LOG")]
    pub log_level: String,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved stub configuration.
#[derive(Debug, Clone)]
pub struct StubConfig {
    /// Address to bind the server to.
    pub bind_addr: String,
    /// Whether to create the demo account at startup.
    pub seed_demo: bool,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4000".to_string(),
            seed_demo: true,
            log_level: "info".to_string(),
        }
    }
}

impl StubConfig {
    /// Loads configuration by merging CLI args, env vars and a TOML file.
    ///
    /// An explicit `--config` path must exist; the default path may be
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &StubCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    fn resolve(cli: &StubCliArgs, file: &StubConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: cli
                .bind
                .clone()
                .or_else(|| file.server.bind_addr.clone())
                .unwrap_or(defaults.bind_addr),
            seed_demo: !cli.empty && file.server.seed_demo.unwrap_or(defaults.seed_demo),
            log_level: cli.log_level.clone(),
        }
    }
}

fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<StubConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(StubConfigFile::default());
    };
    let path = config_dir.join("taskdesk-stub").join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StubConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
