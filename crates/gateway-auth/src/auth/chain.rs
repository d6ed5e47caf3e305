//! Ordered composition of authenticators

use std::sync::Arc;

use async_trait::async_trait;

use super::Authenticator;
use super::config::ChainConfig;
use super::context::AuthContext;
use super::error::{AuthError, Result};
use super::identity::Identity;

/// Tries each link in order and returns the first identity produced.
///
/// Link errors never escape individually: when no link succeeds the chain
/// answers with the anonymous identity (if allowed), else the last error
/// seen, else [`AuthError::AuthenticationFailed`].
#[derive(Debug, Default)]
pub struct ChainedAuthenticator {
    authenticators: Vec<Arc<dyn Authenticator>>,
    allow_anonymous: bool,
}

impl ChainedAuthenticator {
    #[must_use]
    pub fn new(config: ChainConfig, authenticators: Vec<Arc<dyn Authenticator>>) -> Self {
        Self {
            authenticators,
            allow_anonymous: config.allow_anonymous,
        }
    }

    pub fn len(&self) -> usize {
        self.authenticators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authenticators.is_empty()
    }

    pub const fn allows_anonymous(&self) -> bool {
        self.allow_anonymous
    }
}

#[async_trait]
impl Authenticator for ChainedAuthenticator {
    async fn authenticate(&self, ctx: &AuthContext) -> Result<Option<Identity>> {
        let mut last_err = None;

        for (position, authn) in self.authenticators.iter().enumerate() {
            match authn.authenticate(ctx).await {
                Ok(Some(identity)) => return Ok(Some(identity)),
                Ok(None) => {}
                Err(e) => {
                    if e.is_infrastructure() {
                        tracing::warn!(position, error = %e, "Authenticator unavailable");
                    } else {
                        tracing::debug!(position, error = %e, "Authenticator rejected credential");
                    }
                    last_err = Some(e);
                }
            }
        }

        if self.allow_anonymous {
            tracing::debug!("No authenticator accepted the request, using anonymous identity");
            return Ok(Some(Identity::anonymous()));
        }

        Err(last_err.unwrap_or(AuthError::AuthenticationFailed))
    }
}
