//! TOML configuration file loading

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use url::Url;

use super::Config;
use crate::Result;
use crate::auth::{ApiKey, OAuthConfig, OidcConfig};

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./gateway-auth.toml",
    "~/.config/gateway-auth/config.toml",
    "/etc/gateway-auth/config.toml",
];

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    for path_str in CONFIG_PATHS {
        let path = if path_str.starts_with('~') {
            if let Ok(home) = std::env::var("HOME") {
                PathBuf::from(path_str.replacen('~', &home, 1))
            } else {
                continue;
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, config: Config) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    apply_file_config(config, file_config)
}

fn apply_file_config(mut config: Config, file: FileConfig) -> Result<Config> {
    if let Some(auth) = file.auth {
        if let Some(allow) = auth.allow_anonymous {
            config.auth.chain.allow_anonymous = allow;
        }

        if let Some(keys) = auth.api_keys {
            config.auth.api_keys.keys = keys;
        }

        if let Some(oauth) = auth.oauth {
            let signing_key = match oauth.signing_key {
                Some(encoded) => decode_signing_key(&encoded)?,
                None => Vec::new(),
            };
            config.auth.oauth = Some(OAuthConfig {
                issuer: oauth.issuer.unwrap_or_default(),
                signing_key,
                role_claim_path: oauth.role_claim_path.unwrap_or_default(),
                role_prefix: oauth.role_prefix.unwrap_or_default(),
            });
        }

        if let Some(oidc) = auth.oidc {
            let issuer = oidc.issuer.unwrap_or_default();
            if !issuer.is_empty() {
                parse_issuer(&issuer)?;
            }
            config.auth.oidc = Some(OidcConfig {
                issuer,
                client_id: oidc.client_id.unwrap_or_default(),
                audience: oidc.audience.unwrap_or_default(),
                role_claim_path: oidc.role_claim_path.unwrap_or_default(),
                role_prefix: oidc.role_prefix.unwrap_or_default(),
                clock_skew_secs: oidc.clock_skew_secs.unwrap_or_default(),
                max_token_age: oidc
                    .max_token_age_secs
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs),
                skip_issuer_verification: oidc.skip_issuer_verification.unwrap_or(false),
                skip_signature_verification: oidc.skip_signature_verification.unwrap_or(false),
            });
        }
    }

    if let Some(obs) = file.observability {
        if let Some(level) = obs.log_level {
            config.telemetry.log_level = level;
        }

        if let Some(json) = obs.json_logs {
            config.telemetry.json_logs = json;
        }
    }

    Ok(config)
}

/// Decode a base64 HMAC signing key
pub(super) fn decode_signing_key(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| crate::Error::Config(format!("Invalid OAuth signing key (expected base64): {e}")))
}

pub(super) fn parse_issuer(issuer: &str) -> Result<Url> {
    Url::parse(issuer).map_err(|e| crate::Error::Config(format!("Invalid OIDC issuer URL: {e}")))
}

/// Root configuration file structure
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    auth: Option<AuthFileConfig>,
    observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Deserialize)]
struct AuthFileConfig {
    allow_anonymous: Option<bool>,
    api_keys: Option<Vec<ApiKey>>,
    oauth: Option<OAuthFileConfig>,
    oidc: Option<OidcFileConfig>,
}

#[derive(Deserialize)]
struct OAuthFileConfig {
    issuer: Option<String>,
    signing_key: Option<String>,
    role_claim_path: Option<String>,
    role_prefix: Option<String>,
}

impl std::fmt::Debug for OAuthFileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthFileConfig")
            .field("issuer", &self.issuer)
            .field("has_signing_key", &self.signing_key.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct OidcFileConfig {
    issuer: Option<String>,
    client_id: Option<String>,
    audience: Option<String>,
    role_claim_path: Option<String>,
    role_prefix: Option<String>,
    clock_skew_secs: Option<u64>,
    max_token_age_secs: Option<u64>,
    skip_issuer_verification: Option<bool>,
    skip_signature_verification: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ObservabilityConfig {
    log_level: Option<String>,
    json_logs: Option<bool>,
}
