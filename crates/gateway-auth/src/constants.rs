//! Constants shared across authenticators

use std::time::Duration;

/// User id of the identity returned when anonymous access is allowed
pub const ANONYMOUS_USER_ID: &str = "anonymous";

/// Prefix of user ids derived from API key names
pub const API_KEY_USER_PREFIX: &str = "apikey:";

/// Domain of the synthetic email assigned to API key identities
pub const API_KEY_EMAIL_DOMAIN: &str = "apikey.local";

/// Random bytes in a generated API key (hex encoded, so twice as many chars)
pub const GENERATED_KEY_BYTES: usize = 32;

/// Default tolerance for `exp`/`nbf` comparisons
pub const DEFAULT_CLOCK_SKEW_SECS: u64 = 30;

/// Lifetime of a fetched key set
pub const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Upper bound for the fetch performed when an OIDC authenticator is built
pub const INITIAL_JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-request timeout for discovery and key-set requests
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Path appended to the issuer to locate the discovery document
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Header carrying a static API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authorization scheme prefix for bearer tokens
pub const BEARER_PREFIX: &str = "Bearer ";
