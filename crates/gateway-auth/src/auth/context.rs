//! Request-scoped token carrier
//!
//! [`AuthContext`] is the single place a raw credential and the resolved
//! [`Identity`] live for the duration of one call. Transport code writes the
//! token, authenticators read it, and authorization code reads the identity
//! back, all through the same type. With the `http` feature the middleware
//! stores the `AuthContext` in the request extensions, so any layer holding
//! the request (HTTP handler, protocol handler, admin API) reads the same
//! value.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::identity::Identity;

#[derive(Clone, Default)]
pub struct AuthContext {
    token: Option<Arc<str>>,
    identity: Option<Arc<Identity>>,
    cancellation: CancellationToken,
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("has_token", &self.token.is_some())
            .field("identity", &self.identity.as_ref().map(|i| i.user_id()))
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}

impl AuthContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context bound to the cancellation signal of the enclosing request
    #[must_use]
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self {
            token: None,
            identity: None,
            cancellation,
        }
    }

    /// Derived context carrying `token`; an empty token clears it
    #[must_use]
    pub fn with_token(&self, token: impl AsRef<str>) -> Self {
        let token = token.as_ref();
        Self {
            token: (!token.is_empty()).then(|| Arc::from(token)),
            ..self.clone()
        }
    }

    /// Raw credential, or `""` when none was attached
    pub fn token(&self) -> &str {
        self.token.as_deref().unwrap_or_default()
    }

    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Derived context carrying the result of authentication
    #[must_use]
    pub fn with_identity(&self, identity: Identity) -> Self {
        Self {
            identity: Some(Arc::new(identity)),
            ..self.clone()
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_deref()
    }

    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}
