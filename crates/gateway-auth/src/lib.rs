//! Authentication core for a request gateway
//!
//! Resolves API keys, platform-issued HMAC tokens and external OIDC tokens
//! to a normalized [`Identity`], optionally behind an axum middleware.

pub mod auth;
pub mod config;
mod constants;
mod error;
pub mod observability;

#[cfg(feature = "http")]
pub use auth::{AuthState, auth_middleware, extract_credential};
pub use auth::{
    ApiKeyAuthenticator, AuthConfig, AuthContext, AuthError, AuthMethod, AuthStack, Authenticator,
    ChainedAuthenticator, Identity, OAuthAuthenticator, OidcAuthenticator,
};
pub use config::{Config, TelemetryConfig, load_config, load_config_from_path};
pub use error::{Error, Result};
pub use observability::init_observability;
