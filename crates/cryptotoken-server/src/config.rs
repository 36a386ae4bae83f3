use cryptotoken_auth::config::{ConfigError, CryptoTokenConfig};
use serde::{Deserialize, Serialize};

/// Configuration of the `cryptotoken` binary.
///
/// The crypto token settings sit at the root of the file; `[logging]` is the
/// only section of its own.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(flatten)]
    pub cryptotoken: CryptoTokenConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "logging.level must not be empty".to_string(),
            ));
        }
        self.cryptotoken.validate()
    }
}

pub mod loader {
    use super::ServerConfig;
    use config::{Config, Environment, File};
    use cryptotoken_auth::config::ConfigError;
    use std::path::PathBuf;

    /// Default configuration file, relative to the working directory.
    pub const DEFAULT_CONFIG_FILE: &str = "cryptotoken.toml";

    pub fn load_config(path: Option<&str>) -> Result<ServerConfig, ConfigError> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        } else if path.is_some() {
            tracing::debug!(path = %pathbuf.display(), "Configuration file not found, using defaults");
        }
        // Environment variable overrides, e.g., CRYPTOTOKEN__TOKEN__ISSUER=https://auth.example
        builder = builder.add_source(
            Environment::with_prefix("CRYPTOTOKEN")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| ConfigError::Load(format!("config build error: {e}")))?;
        let merged: ServerConfig = cfg
            .try_deserialize()
            .map_err(|e| ConfigError::Load(format!("config deserialize error: {e}")))?;
        merged.validate()?;
        Ok(merged)
    }
}
