//! Configuration loading from disk.

use std::path::{Path, PathBuf};

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "ROUND_ROBIN_CONF_PATH";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config path not set (use --config or ROUND_ROBIN_CONF_PATH)")]
    MissingPath,

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to decode TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse config text. TOML when `is_toml`, JSON otherwise.
pub fn parse_config(content: &str, is_toml: bool) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = if is_toml {
        toml::from_str(content)?
    } else {
        serde_json::from_str(content)?
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a file.
///
/// `.toml` files are read as TOML; everything else is treated as JSON.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_toml = path.extension().and_then(|ext| ext.to_str()) == Some("toml");
    parse_config(&content, is_toml)
}

/// Resolve the config path from an explicit argument or the environment.
pub fn resolve_path(explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    explicit
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(ConfigError::MissingPath)
}
