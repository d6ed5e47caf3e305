//! Validation of tokens issued by the platform's own token service

use std::fmt;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde_json::Value;

use super::Authenticator;
use super::claims::{ClaimBag, ClaimsExtractor};
use super::config::OAuthConfig;
use super::context::AuthContext;
use super::error::{AuthError, Result};
use super::identity::{AuthMethod, Identity};

/// Claim holding the upstream IdP claims re-issued by the token service
const NESTED_CLAIMS: &str = "claims";

/// HMAC-signed token authenticator.
///
/// Only HS256/HS384/HS512 are accepted so a token re-signed with an
/// asymmetric algorithm can never be verified against the shared secret.
pub struct OAuthAuthenticator {
    issuer: String,
    key: DecodingKey,
    extractor: ClaimsExtractor,
}

impl fmt::Debug for OAuthAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthAuthenticator")
            .field("issuer", &self.issuer)
            .field("role_claim_path", &self.extractor.role_claim_path)
            .finish_non_exhaustive()
    }
}

impl OAuthAuthenticator {
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] when the issuer or signing key is empty.
    pub fn new(config: &OAuthConfig) -> Result<Self> {
        if config.issuer.is_empty() {
            return Err(AuthError::Config("oauth issuer is required".into()));
        }
        if config.signing_key.is_empty() {
            return Err(AuthError::Config("oauth signing key is required".into()));
        }

        Ok(Self {
            issuer: config.issuer.clone(),
            key: DecodingKey::from_secret(&config.signing_key),
            extractor: ClaimsExtractor::for_roles(&config.role_claim_path, &config.role_prefix),
        })
    }

    fn verify(&self, token: &str) -> Result<ClaimBag> {
        let header = decode_header(token)?;
        if !matches!(
            header.alg,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AuthError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        // exp/nbf are checked when present; iss is compared below.
        let mut validation = Validation::new(header.alg);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        validation.validate_nbf = true;
        validation.leeway = 0;

        let data = decode::<ClaimBag>(token, &self.key, &validation)?;
        let claims = data.claims;

        match claims.get("iss").and_then(Value::as_str) {
            Some(iss) if iss == self.issuer => Ok(claims),
            _ => Err(AuthError::InvalidIssuer),
        }
    }
}

#[async_trait]
impl Authenticator for OAuthAuthenticator {
    async fn authenticate(&self, ctx: &AuthContext) -> Result<Option<Identity>> {
        let token = ctx.token();
        if token.is_empty() {
            return Err(AuthError::NoToken);
        }

        let claims = self.verify(token)?;

        let user_id = claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingClaim("sub"))?;

        let nested = claims
            .get(NESTED_CLAIMS)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let mut identity = Identity::new(user_id, AuthMethod::OAuth)?;
        if !nested.is_empty() {
            let extracted = self.extractor.extract(&nested);
            identity = identity
                .with_email(extracted.email)
                .with_name(extracted.name)
                .with_roles(extracted.roles);
        }

        tracing::debug!(user_id = %identity.user_id(), "OAuth token accepted");
        Ok(Some(identity.with_claims(nested)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::auth::test_support::{PRIMARY_KEY_PEM, now, sign_hs256, sign_rs256};

    const SECRET: &[u8] = b"platform-signing-key-at-least-32-bytes";
    const ISSUER: &str = "https://gateway.platform.local";

    fn authenticator() -> OAuthAuthenticator {
        OAuthAuthenticator::new(&OAuthConfig::new(ISSUER, SECRET).with_roles("realm_access.roles", "dp_"))
            .unwrap()
    }

    fn valid_claims() -> Value {
        json!({
            "sub": "user123",
            "iss": ISSUER,
            "exp": now() + 3600,
            "claims": {
                "email": "user@example.com",
                "realm_access": {"roles": ["dp_analyst", "dp_admin", "other_role"]}
            }
        })
    }

    async fn run(authn: &OAuthAuthenticator, token: &str) -> Result<Option<Identity>> {
        authn.authenticate(&AuthContext::new().with_token(token)).await
    }

    #[test]
    fn test_new_requires_issuer_and_key() {
        assert!(matches!(
            OAuthAuthenticator::new(&OAuthConfig::new("", SECRET)),
            Err(AuthError::Config(_))
        ));
        assert!(matches!(
            OAuthAuthenticator::new(&OAuthConfig::new(ISSUER, Vec::new())),
            Err(AuthError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_no_token() {
        let result = authenticator().authenticate(&AuthContext::new()).await;
        assert!(matches!(result, Err(AuthError::NoToken)));
    }

    #[tokio::test]
    async fn test_valid_token_with_prefixed_roles() {
        let token = sign_hs256(&valid_claims(), SECRET);
        let identity = run(&authenticator(), &token).await.unwrap().unwrap();

        assert_eq!(identity.user_id(), "user123");
        assert_eq!(identity.auth_method(), AuthMethod::OAuth);
        assert_eq!(identity.email(), Some("user@example.com"));
        assert_eq!(identity.roles(), ["dp_analyst", "dp_admin"]);
        assert!(identity.claims().contains_key("realm_access"));
    }

    #[tokio::test]
    async fn test_nested_claims_kept_without_role_path() {
        let authn = OAuthAuthenticator::new(&OAuthConfig::new(ISSUER, SECRET)).unwrap();
        let token = sign_hs256(&valid_claims(), SECRET);
        let identity = run(&authn, &token).await.unwrap().unwrap();

        assert!(identity.roles().is_empty());
        assert_eq!(identity.claims()["email"], "user@example.com");
    }

    #[tokio::test]
    async fn test_top_level_roles_ignored() {
        let claims = json!({
            "sub": "user123",
            "iss": ISSUER,
            "realm_access": {"roles": ["dp_admin"]}
        });
        let token = sign_hs256(&claims, SECRET);
        let identity = run(&authenticator(), &token).await.unwrap().unwrap();

        assert!(identity.roles().is_empty());
        assert!(identity.claims().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_secret() {
        let token = sign_hs256(&valid_claims(), b"some-other-secret-of-sufficient-size");
        let result = run(&authenticator(), &token).await;
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[tokio::test]
    async fn test_wrong_issuer() {
        let mut claims = valid_claims();
        claims["iss"] = json!("https://evil.example.com");
        let token = sign_hs256(&claims, SECRET);
        let result = run(&authenticator(), &token).await;
        assert!(matches!(result, Err(AuthError::InvalidIssuer)));
    }

    #[tokio::test]
    async fn test_issuer_compared_exactly() {
        let mut claims = valid_claims();
        claims["iss"] = json!(format!("{ISSUER}/"));
        let token = sign_hs256(&claims, SECRET);
        assert!(matches!(
            run(&authenticator(), &token).await,
            Err(AuthError::InvalidIssuer)
        ));
    }

    #[tokio::test]
    async fn test_missing_issuer() {
        let token = sign_hs256(&json!({"sub": "user123"}), SECRET);
        assert!(matches!(
            run(&authenticator(), &token).await,
            Err(AuthError::InvalidIssuer)
        ));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let mut claims = valid_claims();
        claims["exp"] = json!(now() - 60);
        let token = sign_hs256(&claims, SECRET);
        let result = run(&authenticator(), &token).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_not_yet_valid() {
        let mut claims = valid_claims();
        claims["exp"] = json!(now() + 7200);
        claims["nbf"] = json!(now() + 3600);
        let token = sign_hs256(&claims, SECRET);
        let result = run(&authenticator(), &token).await;
        assert!(matches!(result, Err(AuthError::TokenNotYetValid)));
    }

    #[tokio::test]
    async fn test_past_not_before_accepted() {
        let mut claims = valid_claims();
        claims["nbf"] = json!(now() - 60);
        let token = sign_hs256(&claims, SECRET);
        assert!(run(&authenticator(), &token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_subject() {
        let mut claims = valid_claims();
        claims["sub"] = json!("");
        let token = sign_hs256(&claims, SECRET);
        let result = run(&authenticator(), &token).await;
        assert!(matches!(result, Err(AuthError::MissingClaim("sub"))));
    }

    #[tokio::test]
    async fn test_rejects_asymmetric_algorithm() {
        let token = sign_rs256(&valid_claims(), Some("key-1"), PRIMARY_KEY_PEM);
        let result = run(&authenticator(), &token).await;
        assert!(matches!(result, Err(AuthError::UnsupportedAlgorithm(_))));
    }

    #[tokio::test]
    async fn test_malformed_token() {
        let result = run(&authenticator(), "not.a.jwt").await;
        assert!(matches!(result, Err(AuthError::MalformedToken(_))));
    }

    #[test]
    fn test_debug_hides_signing_key() {
        let debug = format!("{:?}", authenticator());
        assert!(!debug.contains("platform-signing-key"));
        assert!(debug.contains(ISSUER));
    }
}
