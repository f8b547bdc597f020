//! Server configuration
//!
//! Loaded from a TOML file when one is found, then overridden from the
//! environment. Every field has a default, so an empty file is valid.

use imgconv_image::{FormatWhitelist, LOSSY_QUALITY, TargetFormat};
use imgconv_telemetry::LogFormat;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default request body ceiling: 50 MiB
pub const DEFAULT_MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

const CONFIG_CANDIDATES: [&str; 3] = ["imgconv.toml", ".imgconv.toml", ".config/imgconv.toml"];

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Server configuration schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind: SocketAddr,

    /// Largest request body accepted, in bytes
    pub max_body_bytes: usize,

    /// Accepted target format names
    pub formats: Vec<String>,

    /// Quality passed to lossy encoders
    pub quality: u8,

    /// Log level filter, overridden by `RUST_LOG`
    pub log_level: String,

    /// Log line layout
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            formats: TargetFormat::ALL.iter().map(|f| f.as_str().to_string()).collect(),
            quality: LOSSY_QUALITY,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a file path or the standard locations, then
    /// apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map(Path::to_path_buf).or_else(find_config_file);

        let mut config = match config_path {
            Some(ref p) => load_config_file(p)?,
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `IMGCONV_BIND` and `IMGCONV_MAX_BODY_BYTES` from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("IMGCONV_BIND") {
            self.bind = bind.parse().map_err(|e| ConfigError::Invalid {
                key: "IMGCONV_BIND",
                message: format!("{bind}: {e}"),
            })?;
        }

        if let Some(limit) = lookup("IMGCONV_MAX_BODY_BYTES") {
            self.max_body_bytes = limit.parse().map_err(|e| ConfigError::Invalid {
                key: "IMGCONV_MAX_BODY_BYTES",
                message: format!("{limit}: {e}"),
            })?;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "max_body_bytes",
                message: "cannot be zero".into(),
            });
        }

        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Invalid {
                key: "quality",
                message: format!("{} is outside 1..=100", self.quality),
            });
        }

        self.whitelist()?;
        Ok(())
    }

    /// Build the format whitelist from `formats`
    pub fn whitelist(&self) -> Result<FormatWhitelist, ConfigError> {
        FormatWhitelist::from_names(&self.formats).map_err(|e| ConfigError::Invalid {
            key: "formats",
            message: e.to_string(),
        })
    }
}

/// Find configuration file in standard locations
fn find_config_file() -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.max_body_bytes, 50 * 1024 * 1024);
        assert_eq!(config.quality, 80);
        assert_eq!(config.formats, vec!["png", "jpg", "jpeg", "webp", "tiff"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind = \"0.0.0.0:8080\"\nformats = [\"png\", \"webp\"]").unwrap();

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.formats, vec!["png", "webp"]);
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.whitelist().unwrap().len(), 2);
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "quality = \"high\"").unwrap();
        assert!(matches!(load_config_file(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [("IMGCONV_BIND", "127.0.0.1:9999"), ("IMGCONV_MAX_BODY_BYTES", "1024")]
            .into_iter()
            .collect();

        let mut config = ServerConfig::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.bind.port(), 9999);
        assert_eq!(config.max_body_bytes, 1024);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = ServerConfig::default();
        let result = config.apply_env(|key| (key == "IMGCONV_BIND").then(|| "not-an-address".to_string()));
        assert!(matches!(result, Err(ConfigError::Invalid { key: "IMGCONV_BIND", .. })));
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();
        config.max_body_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.quality = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.formats = vec!["png".into(), "gif".into()];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { key: "formats", .. })));

        let mut config = ServerConfig::default();
        config.formats.clear();
        assert!(config.validate().is_err());
    }
}
