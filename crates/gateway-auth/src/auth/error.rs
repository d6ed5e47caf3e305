//! Authentication error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no token found in context")]
    NoToken,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("unexpected signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("token missing kid header")]
    MissingKeyId,

    #[error("JWKS not loaded")]
    KeySetNotLoaded,

    #[error("JWKS cache expired")]
    KeySetExpired,

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("missing or invalid {0} claim")]
    MissingClaim(&'static str),

    #[error("token expired")]
    TokenExpired,

    #[error("token not yet valid")]
    TokenNotYetValid,

    #[error("token too old")]
    TokenTooOld,

    #[error("invalid issuer")]
    InvalidIssuer,

    #[error("invalid audience")]
    InvalidAudience,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("key with name {0:?} already exists")]
    DuplicateKeyName(String),

    #[error("generating random key: {0}")]
    KeyGeneration(String),

    #[error("OIDC discovery failed: {0}")]
    DiscoveryFailed(String),

    #[error("JWKS fetch failed: {0}")]
    JwksFetch(String),

    #[error("JWKS parse failed: {0}")]
    JwksParse(String),

    #[error("no valid RSA signing keys found in JWKS")]
    NoUsableKeys,

    #[error("JWKS fetch cancelled")]
    FetchCancelled,

    #[error("configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// The identity provider could not be reached or answered garbage.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::DiscoveryFailed(_)
                | Self::JwksFetch(_)
                | Self::JwksParse(_)
                | Self::NoUsableKeys
                | Self::FetchCancelled
        )
    }

    /// A well-formed, correctly signed token failed a claim check.
    #[must_use]
    pub const fn is_claim_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingClaim(_)
                | Self::TokenExpired
                | Self::TokenNotYetValid
                | Self::TokenTooOld
                | Self::InvalidIssuer
                | Self::InvalidAudience
        )
    }

    /// The key set cannot serve verification right now.
    #[must_use]
    pub const fn is_key_lookup(&self) -> bool {
        matches!(
            self,
            Self::KeySetNotLoaded | Self::KeySetExpired | Self::KeyNotFound(_) | Self::MissingKeyId
        )
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::ImmatureSignature => Self::TokenNotYetValid,
            ErrorKind::InvalidIssuer => Self::InvalidIssuer,
            ErrorKind::InvalidAudience => Self::InvalidAudience,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAlgorithm => Self::UnsupportedAlgorithm("algorithm mismatch".into()),
            ErrorKind::Base64(_) => Self::MalformedToken("invalid base64 segment".into()),
            ErrorKind::Json(_) => Self::MalformedToken("invalid JSON payload".into()),
            ErrorKind::Utf8(_) => Self::MalformedToken("invalid UTF-8 payload".into()),
            _ => Self::MalformedToken("unparseable token".into()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
