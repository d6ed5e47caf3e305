//! Credential extraction and authentication middleware for HTTP transport
//!
//! This module requires the `http` feature for axum integration.

use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::Authenticator;
use super::context::AuthContext;
use crate::constants::{API_KEY_HEADER, BEARER_PREFIX};

/// Authentication state for middleware
#[derive(Clone)]
pub struct AuthState {
    pub authenticator: Arc<dyn Authenticator>,
    /// Reject requests that end up without a non-anonymous identity
    pub require_auth: bool,
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthState")
            .field("authenticator", &self.authenticator)
            .field("require_auth", &self.require_auth)
            .finish()
    }
}

impl AuthState {
    #[must_use]
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            require_auth: true,
        }
    }

    #[must_use]
    pub const fn with_require_auth(mut self, require_auth: bool) -> Self {
        self.require_auth = require_auth;
        self
    }
}

/// Raw credential from `Authorization: Bearer <token>`, else `X-API-Key`
pub fn extract_credential(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|k| !k.is_empty())
    })
}

/// Authenticates the request and stores the resulting [`AuthContext`] in its
/// extensions.
///
/// An `AuthContext` already present in the extensions (e.g. one carrying the
/// connection's cancellation token) is extended rather than replaced.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut ctx = request
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .unwrap_or_default();
    if let Some(credential) = extract_credential(request.headers()) {
        ctx = ctx.with_token(credential);
    }

    match state.authenticator.authenticate(&ctx).await {
        Ok(Some(identity)) => {
            tracing::debug!(
                user_id = %identity.user_id(),
                auth_method = %identity.auth_method(),
                "Request authenticated"
            );
            ctx = ctx.with_identity(identity);
        }
        Ok(None) => {}
        // Do not log token contents; the error never includes them
        Err(e) if e.is_infrastructure() => {
            tracing::warn!(error = %e, "Authentication unavailable");
        }
        Err(e) => {
            tracing::debug!(error = %e, "Authentication failed");
        }
    }

    let authenticated = ctx.identity().is_some_and(|i| !i.is_anonymous());
    if state.require_auth && !authenticated {
        return unauthorized();
    }

    request.extensions_mut().insert(ctx);
    next.run(request).await
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
    )
        .into_response()
}
