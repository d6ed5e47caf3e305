//! Authenticator configuration types

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::constants::DEFAULT_CLOCK_SKEW_SECS;

/// A static shared secret with the identity it grants
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ApiKey {
    /// The secret value presented by callers
    pub key: String,
    /// Display name, unique across keys
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

// Never print the key value
impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("name", &self.name)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

impl ApiKey {
    pub fn new(key: impl Into<String>, name: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            roles,
        }
    }
}

/// API key authenticator configuration
#[derive(Debug, Clone, Default)]
pub struct ApiKeyConfig {
    pub keys: Vec<ApiKey>,
}

/// Configuration for tokens issued by the platform's own token service
#[derive(Clone, Default)]
pub struct OAuthConfig {
    /// Expected `iss` claim, compared exactly
    pub issuer: String,
    /// HMAC key used to verify signatures
    pub signing_key: Vec<u8>,
    /// Path to roles within the nested `claims` object
    pub role_claim_path: String,
    pub role_prefix: String,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("issuer", &self.issuer)
            .field("role_claim_path", &self.role_claim_path)
            .field("role_prefix", &self.role_prefix)
            .finish_non_exhaustive()
    }
}

impl OAuthConfig {
    #[must_use]
    pub fn new(issuer: impl Into<String>, signing_key: impl Into<Vec<u8>>) -> Self {
        Self {
            issuer: issuer.into(),
            signing_key: signing_key.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_roles(mut self, role_claim_path: &str, role_prefix: &str) -> Self {
        self.role_claim_path = role_claim_path.to_string();
        self.role_prefix = role_prefix.to_string();
        self
    }
}

/// Configuration for tokens issued by an external OIDC provider
#[derive(Debug, Clone, Default)]
pub struct OidcConfig {
    /// Issuer URL, used for discovery and `iss` validation
    pub issuer: String,
    pub client_id: String,
    /// Expected `aud`; when empty, tokens must not carry an audience
    pub audience: String,
    pub role_claim_path: String,
    pub role_prefix: String,
    /// Tolerance for `exp`/`nbf`; 0 means the 30 second default
    pub clock_skew_secs: u64,
    /// Maximum age based on `iat`; `None` means unlimited
    pub max_token_age: Option<Duration>,
    /// Test-only: accept any issuer
    pub skip_issuer_verification: bool,
    /// Test-only: accept unsigned payloads
    pub skip_signature_verification: bool,
}

impl OidcConfig {
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    #[must_use]
    pub fn with_roles(mut self, role_claim_path: &str, role_prefix: &str) -> Self {
        self.role_claim_path = role_claim_path.to_string();
        self.role_prefix = role_prefix.to_string();
        self
    }

    #[must_use]
    pub const fn with_clock_skew_secs(mut self, secs: u64) -> Self {
        self.clock_skew_secs = secs;
        self
    }

    #[must_use]
    pub const fn with_max_token_age(mut self, age: Duration) -> Self {
        self.max_token_age = Some(age);
        self
    }

    /// Effective skew, falling back to the default when unset
    #[must_use]
    pub const fn clock_skew(&self) -> u64 {
        if self.clock_skew_secs > 0 {
            self.clock_skew_secs
        } else {
            DEFAULT_CLOCK_SKEW_SECS
        }
    }
}

/// Chained authenticator configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainConfig {
    /// Return the anonymous identity when every link declines
    pub allow_anonymous: bool,
}

/// Complete authentication configuration
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub api_keys: ApiKeyConfig,
    pub oauth: Option<OAuthConfig>,
    pub oidc: Option<OidcConfig>,
    pub chain: ChainConfig,
}

impl AuthConfig {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.api_keys.keys.is_empty() || self.oauth.is_some() || self.oidc.is_some()
    }
}
