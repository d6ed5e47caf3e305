//! Validation of tokens issued by an external OIDC provider

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::{Host, Url};

use super::Authenticator;
use super::claims::{ClaimBag, ClaimsExtractor, OneOrMany};
use super::config::OidcConfig;
use super::context::AuthContext;
use super::error::{AuthError, Result};
use super::identity::{AuthMethod, Identity};
use super::jwks::JwksCache;
use crate::constants::INITIAL_JWKS_FETCH_TIMEOUT;

const TEST_DOMAIN_SUFFIXES: &[&str] = &["localhost", "test", "example", "invalid"];
const EXAMPLE_DOMAINS: &[&str] = &["example.com", "example.org", "example.net"];

/// RS256/384/512 token authenticator backed by a [`JwksCache`].
pub struct OidcAuthenticator {
    config: OidcConfig,
    extractor: ClaimsExtractor,
    cache: Arc<JwksCache>,
}

impl fmt::Debug for OidcAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OidcAuthenticator")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .field("skip_signature_verification", &self.config.skip_signature_verification)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl OidcAuthenticator {
    /// Build the authenticator and load the issuer's key set.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration, or when the initial fetch fails or
    /// does not finish within 30 seconds.
    pub async fn new(config: OidcConfig) -> Result<Self> {
        let cache = Arc::new(JwksCache::new(config.issuer.clone())?);
        Self::with_cache(config, cache).await
    }

    /// Like [`OidcAuthenticator::new`] with a caller-supplied cache, e.g. one
    /// shared with a [`super::JwksRefreshTask`].
    ///
    /// # Errors
    ///
    /// See [`OidcAuthenticator::new`].
    pub async fn with_cache(config: OidcConfig, cache: Arc<JwksCache>) -> Result<Self> {
        check_config(&config)?;

        let authn = Self {
            extractor: ClaimsExtractor {
                group_claim_path: "groups".to_string(),
                ..ClaimsExtractor::for_roles(&config.role_claim_path, &config.role_prefix)
            },
            config,
            cache,
        };

        if !authn.config.skip_signature_verification {
            let cancel = CancellationToken::new();
            let fetched =
                tokio::time::timeout(INITIAL_JWKS_FETCH_TIMEOUT, authn.cache.fetch(&cancel)).await;
            match fetched {
                Ok(result) => {
                    result?;
                }
                Err(_) => {
                    cancel.cancel();
                    return Err(AuthError::JwksFetch("initial JWKS fetch timed out".into()));
                }
            }
        }

        Ok(authn)
    }

    /// Re-run discovery and key-set fetch under the caller's cancellation.
    ///
    /// # Errors
    ///
    /// Any infrastructure error from [`JwksCache::fetch`].
    pub async fn refresh(&self, ctx: &AuthContext) -> Result<usize> {
        self.cache.fetch(ctx.cancellation()).await
    }

    pub const fn cache(&self) -> &Arc<JwksCache> {
        &self.cache
    }

    pub const fn config(&self) -> &OidcConfig {
        &self.config
    }

    fn verify(&self, token: &str) -> Result<ClaimBag> {
        let header = decode_header(token)?;
        if !matches!(
            header.alg,
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512
        ) {
            return Err(AuthError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let kid = header
            .kid
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(AuthError::MissingKeyId)?;
        let key = self.cache.key(kid)?;

        // Signature only; claims are checked by `validate_claims`.
        let mut validation = Validation::new(header.alg);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        Ok(decode::<ClaimBag>(token, &key, &validation)?.claims)
    }

    fn validate_claims(&self, claims: &ClaimBag, now: i64) -> Result<()> {
        claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingClaim("sub"))?;

        let skew = i64::try_from(self.config.clock_skew()).unwrap_or(i64::MAX);

        let exp = numeric_claim(claims, "exp").ok_or(AuthError::MissingClaim("exp"))?;
        if now > exp.saturating_add(skew) {
            return Err(AuthError::TokenExpired);
        }

        if let Some(nbf) = numeric_claim(claims, "nbf")
            && now < nbf.saturating_sub(skew)
        {
            return Err(AuthError::TokenNotYetValid);
        }

        if let Some(max_age) = self.config.max_token_age {
            let iat = numeric_claim(claims, "iat").ok_or(AuthError::MissingClaim("iat"))?;
            let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
            if now.saturating_sub(iat) > max_age {
                return Err(AuthError::TokenTooOld);
            }
        }

        if !self.config.skip_issuer_verification
            && claims.get("iss").and_then(Value::as_str) != Some(self.config.issuer.as_str())
        {
            return Err(AuthError::InvalidIssuer);
        }

        self.check_audience(claims)
    }

    fn check_audience(&self, claims: &ClaimBag) -> Result<()> {
        let aud = match claims.get("aud") {
            None | Some(Value::Null) => None,
            Some(value) => {
                Some(OneOrMany::from_claim(Some(value)).ok_or(AuthError::InvalidAudience)?)
            }
        };

        let accepted = if self.config.audience.is_empty() {
            aud.is_none_or(|a| a.is_empty())
        } else {
            aud.is_some_and(|a| a.contains(&self.config.audience))
        };

        if accepted {
            Ok(())
        } else {
            Err(AuthError::InvalidAudience)
        }
    }
}

#[async_trait]
impl Authenticator for OidcAuthenticator {
    async fn authenticate(&self, ctx: &AuthContext) -> Result<Option<Identity>> {
        let token = ctx.token();
        if token.is_empty() {
            return Err(AuthError::NoToken);
        }

        let claims = if self.config.skip_signature_verification {
            decode_unverified(token)?
        } else {
            self.verify(token)?
        };
        self.validate_claims(&claims, unix_now())?;

        let extracted = self.extractor.extract(&claims);
        let identity = Identity::new(extracted.user_id, AuthMethod::Oidc)?
            .with_email(extracted.email)
            .with_name(extracted.name)
            .with_roles(extracted.roles)
            .with_groups(extracted.groups)
            .with_claims(claims);

        tracing::debug!(user_id = %identity.user_id(), "OIDC token accepted");
        Ok(Some(identity))
    }
}

/// Whether `issuer` points at a loopback address or a reserved test domain.
///
/// Skip-signature and skip-issuer modes are refused for any other issuer.
pub fn is_test_issuer(issuer: &str) -> bool {
    let Ok(url) = Url::parse(issuer) else {
        return false;
    };
    match url.host() {
        Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
        Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost"
                || TEST_DOMAIN_SUFFIXES
                    .iter()
                    .any(|tld| domain.ends_with(&format!(".{tld}")))
                || EXAMPLE_DOMAINS
                    .iter()
                    .any(|d| domain == *d || domain.ends_with(&format!(".{d}")))
        }
        None => false,
    }
}

fn check_config(config: &OidcConfig) -> Result<()> {
    if config.issuer.is_empty() {
        return Err(AuthError::Config("OIDC issuer is required".into()));
    }

    let skips = config.skip_signature_verification || config.skip_issuer_verification;
    if skips {
        if !is_test_issuer(&config.issuer) {
            return Err(AuthError::Config(format!(
                "skip_signature_verification/skip_issuer_verification are only allowed for test issuers, got {}",
                config.issuer
            )));
        }
        tracing::warn!(
            issuer = %config.issuer,
            skip_signature = config.skip_signature_verification,
            skip_issuer = config.skip_issuer_verification,
            "OIDC verification checks disabled; never use this outside tests"
        );
    }
    Ok(())
}

/// Payload of a compact JWS without any signature check
fn decode_unverified(token: &str) -> Result<ClaimBag> {
    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::MalformedToken("expected three segments".into()));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AuthError::MalformedToken("invalid base64 payload".into()))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| AuthError::MalformedToken("invalid JSON payload".into()))
}

fn numeric_claim(claims: &ClaimBag, name: &str) -> Option<i64> {
    let value = claims.get(name)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}
