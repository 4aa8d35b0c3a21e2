//! Configuration file loading and resolution
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. `GCAT_CONFIG` environment variable
//! 3. `<user config dir>/gcat/config.toml`, when present
//! 4. Compiled defaults (no file)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "GCAT_CONFIG";

/// Contents of the TOML config file
///
/// Every key is optional; unset keys fall back to the compiled defaults of
/// the consuming tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    #[serde(default)]
    pub expand: ExpandSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[expand]` table: discovery and pacing knobs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpandSection {
    /// Per-attempt HTTP timeout in seconds
    pub request_timeout_secs: Option<f64>,
    /// Additional attempts after the first failure
    pub max_retries: Option<u32>,
    /// Backoff unit in milliseconds (multiplied by attempt number)
    pub retry_backoff_ms: Option<u64>,
    /// Concurrent expansions per batch
    pub concurrency: Option<usize>,
    /// Pause between batches in milliseconds
    pub batch_delay_ms: Option<u64>,
    /// Identifying client header sent with every request
    pub user_agent: Option<String>,
}

/// `[logging]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. "gcat_expand=debug")
    pub level: Option<String>,
}

/// Resolve which config file to read, if any
///
/// An explicitly named file (CLI or environment) is returned whether or not it
/// exists so that a typo surfaces as an error; the per-user default is only
/// returned when it exists.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config file
    default_config_path().filter(|path| path.exists())
}

/// `<user config dir>/gcat/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gcat").join("config.toml"))
}

/// Parse one TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Resolve and load the config file, falling back to defaults when none applies
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg, CONFIG_ENV_VAR) {
        Some(path) => {
            debug!(path = %path.display(), "Loading config file");
            load_toml_config(&path)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(TomlConfig::default())
        }
    }
}
