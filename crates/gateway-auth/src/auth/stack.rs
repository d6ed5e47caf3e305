//! Assembly of the configured authenticators into one chain

use std::sync::Arc;

use async_trait::async_trait;

use super::Authenticator;
use super::apikey::ApiKeyAuthenticator;
use super::chain::ChainedAuthenticator;
use super::config::AuthConfig;
use super::context::AuthContext;
use super::error::Result;
use super::identity::Identity;
use super::oauth::OAuthAuthenticator;
use super::oidc::OidcAuthenticator;

/// The chain built from [`AuthConfig`], with handles to the links that need
/// runtime management.
///
/// Link order is OAuth, then OIDC, then API keys. The API key link is always
/// present so keys generated at runtime are accepted; with no keys it simply
/// declines.
#[derive(Debug, Clone)]
pub struct AuthStack {
    chain: Arc<ChainedAuthenticator>,
    api_keys: Arc<ApiKeyAuthenticator>,
    oidc: Option<Arc<OidcAuthenticator>>,
}

impl AuthStack {
    /// # Errors
    ///
    /// Fails if an authenticator rejects its configuration or the OIDC key
    /// set cannot be loaded.
    pub async fn build(config: &AuthConfig) -> Result<Self> {
        let mut links: Vec<Arc<dyn Authenticator>> = Vec::new();

        if let Some(oauth) = &config.oauth {
            links.push(Arc::new(OAuthAuthenticator::new(oauth)?));
        }

        let oidc = match &config.oidc {
            Some(oidc) => {
                let authn = Arc::new(OidcAuthenticator::new(oidc.clone()).await?);
                links.push(Arc::clone(&authn) as Arc<dyn Authenticator>);
                Some(authn)
            }
            None => None,
        };

        let api_keys = Arc::new(ApiKeyAuthenticator::new(&config.api_keys));
        links.push(Arc::clone(&api_keys) as Arc<dyn Authenticator>);

        tracing::info!(
            oauth = config.oauth.is_some(),
            oidc = oidc.is_some(),
            api_keys = config.api_keys.keys.len(),
            allow_anonymous = config.chain.allow_anonymous,
            "Authentication stack ready"
        );

        Ok(Self {
            chain: Arc::new(ChainedAuthenticator::new(config.chain, links)),
            api_keys,
            oidc,
        })
    }

    /// The chain as a shareable authenticator
    pub fn authenticator(&self) -> Arc<dyn Authenticator> {
        Arc::clone(&self.chain) as Arc<dyn Authenticator>
    }

    pub const fn api_keys(&self) -> &Arc<ApiKeyAuthenticator> {
        &self.api_keys
    }

    pub const fn oidc(&self) -> Option<&Arc<OidcAuthenticator>> {
        self.oidc.as_ref()
    }
}

#[async_trait]
impl Authenticator for AuthStack {
    async fn authenticate(&self, ctx: &AuthContext) -> Result<Option<Identity>> {
        self.chain.authenticate(ctx).await
    }
}
