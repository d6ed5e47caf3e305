//! Environment variable loading for configuration

use std::env;

use super::Config;
use super::file::{decode_signing_key, parse_issuer};
use crate::Result;
use crate::auth::{OAuthConfig, OidcConfig};

/// Environment variable names
mod vars {
    pub const ALLOW_ANONYMOUS: &str = "GATEWAY_AUTH_ALLOW_ANONYMOUS";
    pub const OAUTH_ISSUER: &str = "GATEWAY_AUTH_OAUTH_ISSUER";
    pub const OAUTH_SIGNING_KEY: &str = "GATEWAY_AUTH_OAUTH_SIGNING_KEY";
    pub const OIDC_ISSUER: &str = "GATEWAY_AUTH_OIDC_ISSUER";
    pub const OIDC_CLIENT_ID: &str = "GATEWAY_AUTH_OIDC_CLIENT_ID";
    pub const OIDC_AUDIENCE: &str = "GATEWAY_AUTH_OIDC_AUDIENCE";
    pub const ROLE_CLAIM_PATH: &str = "GATEWAY_AUTH_ROLE_CLAIM_PATH";
    pub const ROLE_PREFIX: &str = "GATEWAY_AUTH_ROLE_PREFIX";
    pub const RUST_LOG: &str = "RUST_LOG";
    pub const JSON_LOGS: &str = "GATEWAY_AUTH_JSON_LOGS";
}

/// Load configuration from environment variables
pub fn load_from_env(mut config: Config) -> Result<Config> {
    if let Ok(val) = env::var(vars::ALLOW_ANONYMOUS) {
        config.auth.chain.allow_anonymous = parse_bool(&val);
    }

    // OAuth
    if let Ok(issuer) = env::var(vars::OAUTH_ISSUER) {
        config
            .auth
            .oauth
            .get_or_insert_with(OAuthConfig::default)
            .issuer = issuer;
    }

    if let Ok(encoded) = env::var(vars::OAUTH_SIGNING_KEY) {
        let key = decode_signing_key(&encoded).map_err(|_| {
            crate::Error::Config(format!("Invalid {} (expected base64)", vars::OAUTH_SIGNING_KEY))
        })?;
        config
            .auth
            .oauth
            .get_or_insert_with(OAuthConfig::default)
            .signing_key = key;
    }

    // OIDC
    if let Ok(issuer) = env::var(vars::OIDC_ISSUER) {
        parse_issuer(&issuer)?;
        config
            .auth
            .oidc
            .get_or_insert_with(OidcConfig::default)
            .issuer = issuer;
    }

    if let Some(oidc) = config.auth.oidc.as_mut() {
        if let Ok(client_id) = env::var(vars::OIDC_CLIENT_ID) {
            oidc.client_id = client_id;
        }
        if let Ok(audience) = env::var(vars::OIDC_AUDIENCE) {
            oidc.audience = audience;
        }
    }

    // Role mapping applies to every token-based authenticator
    if let Ok(path) = env::var(vars::ROLE_CLAIM_PATH) {
        if let Some(oauth) = config.auth.oauth.as_mut() {
            oauth.role_claim_path.clone_from(&path);
        }
        if let Some(oidc) = config.auth.oidc.as_mut() {
            oidc.role_claim_path = path;
        }
    }

    if let Ok(prefix) = env::var(vars::ROLE_PREFIX) {
        if let Some(oauth) = config.auth.oauth.as_mut() {
            oauth.role_prefix.clone_from(&prefix);
        }
        if let Some(oidc) = config.auth.oidc.as_mut() {
            oidc.role_prefix = prefix;
        }
    }

    // Telemetry
    if let Ok(level) = env::var(vars::RUST_LOG) {
        config.telemetry.log_level = level;
    }

    if let Ok(val) = env::var(vars::JSON_LOGS) {
        config.telemetry.json_logs = parse_bool(&val);
    }

    Ok(config)
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
