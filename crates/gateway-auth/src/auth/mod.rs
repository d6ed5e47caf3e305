//! Authentication core
//!
//! Turns an opaque credential into a normalized [`Identity`].
//!
//! # Features
//!
//! - Static API keys with runtime add/remove/generate and constant-time matching
//! - HS256/384/512 tokens minted by the platform's own token service
//! - RS256/384/512 tokens from an external OIDC provider, verified against a
//!   discovered and cached JWKS
//! - Ordered chaining of the above with optional anonymous fallback
//!
//! Every authenticator implements the single [`Authenticator`] capability and
//! reads the credential from an [`AuthContext`].

mod apikey;
mod chain;
mod claims;
mod config;
mod context;
mod error;
mod identity;
mod jwks;
#[cfg(feature = "http")]
mod middleware;
mod oauth;
mod oidc;
mod stack;
#[cfg(test)]
pub(crate) mod test_support;

use std::fmt::Debug;

use async_trait::async_trait;

pub use apikey::{ApiKeyAuthenticator, ApiKeySummary};
pub use chain::ChainedAuthenticator;
pub use claims::{ClaimBag, ClaimsExtractor, ExtractedClaims, OneOrMany, lookup};
pub use config::{ApiKey, ApiKeyConfig, AuthConfig, ChainConfig, OAuthConfig, OidcConfig};
pub use context::AuthContext;
pub use error::{AuthError, Result};
pub use identity::{AuthMethod, Identity};
pub use jwks::{CacheState, Jwk, JwkSet, JwksCache, JwksRefreshTask};
#[cfg(feature = "http")]
pub use middleware::{AuthState, auth_middleware, extract_credential};
pub use oauth::OAuthAuthenticator;
pub use oidc::{OidcAuthenticator, is_test_issuer};
pub use stack::AuthStack;

/// A strategy that resolves the credential in `ctx` to an identity.
///
/// `Ok(None)` means "not mine / nothing presented" and lets a chain move on;
/// `Ok(Some(_))` always carries a non-empty user id.
#[async_trait]
pub trait Authenticator: Send + Sync + Debug {
    async fn authenticate(&self, ctx: &AuthContext) -> Result<Option<Identity>>;
}
