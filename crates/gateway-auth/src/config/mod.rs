//! Configuration management
//!
//! Supports configuration loading with precedence: env > file > defaults

mod env;
mod file;

use std::collections::HashSet;
use std::path::Path;

use crate::Result;
use crate::auth::AuthConfig;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub auth: AuthConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Reject configurations that would build a broken or ambiguous stack.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        let mut values = HashSet::new();
        for key in &self.auth.api_keys.keys {
            if key.name.is_empty() {
                return Err(crate::Error::Config("API key name must not be empty".into()));
            }
            if key.key.is_empty() {
                return Err(crate::Error::Config(format!(
                    "API key {:?} has an empty value",
                    key.name
                )));
            }
            if !names.insert(key.name.as_str()) {
                return Err(crate::Error::Config(format!(
                    "duplicate API key name {:?}",
                    key.name
                )));
            }
            if !values.insert(key.key.as_str()) {
                return Err(crate::Error::Config(format!(
                    "API key {:?} reuses the value of another key",
                    key.name
                )));
            }
        }

        if let Some(oauth) = &self.auth.oauth {
            if oauth.issuer.is_empty() {
                return Err(crate::Error::Config("OAuth issuer is required".into()));
            }
            if oauth.signing_key.is_empty() {
                return Err(crate::Error::Config("OAuth signing key is required".into()));
            }
        }

        if let Some(oidc) = &self.auth.oidc
            && oidc.issuer.is_empty()
        {
            return Err(crate::Error::Config("OIDC issuer is required".into()));
        }

        Ok(())
    }
}

/// Load configuration with precedence: env > file > defaults
pub fn load_config() -> Result<Config> {
    let mut config = Config::default();

    if let Some(path) = file::find_config_file() {
        tracing::info!("Loading configuration from {}", path.display());
        config = file::load_from_file(&path, config)?;
    }

    config = env::load_from_env(config)?;

    Ok(config)
}

/// Load configuration from a specific file path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let config = file::load_from_file(path, Config::default())?;
    env::load_from_env(config)
}
