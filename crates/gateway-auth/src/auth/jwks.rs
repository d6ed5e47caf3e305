//! OIDC key-set discovery, fetching and caching

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::error::{AuthError, Result};
use crate::constants::{DISCOVERY_PATH, HTTP_TIMEOUT, JWKS_CACHE_TTL};

/// JSON Web Key, RSA fields only
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub kty: String,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub r#use: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

impl Jwk {
    /// RSA key whose declared use is unset or `sig`
    pub fn is_rsa_signing_key(&self) -> bool {
        self.kty == "RSA"
            && matches!(self.r#use.as_deref(), None | Some("" | "sig"))
            && matches!(
                self.alg.as_deref(),
                None | Some("" | "RS256" | "RS384" | "RS512")
            )
    }

    fn decoding_key(&self) -> Option<(String, DecodingKey)> {
        if !self.is_rsa_signing_key() {
            return None;
        }
        let kid = self.kid.as_deref().filter(|k| !k.is_empty())?;
        let key = DecodingKey::from_rsa_components(self.n.as_deref()?, self.e.as_deref()?).ok()?;
        Some((kid.to_string(), key))
    }
}

/// Key-set document. Entries stay raw so a single odd key cannot fail the set.
#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    #[serde(default)]
    pub keys: Vec<Value>,
}

#[derive(Deserialize)]
struct Discovery {
    #[serde(default)]
    issuer: String,
    #[serde(default)]
    jwks_uri: String,
}

/// Immutable snapshot produced by one successful fetch
#[derive(Clone)]
struct KeySet {
    keys: HashMap<String, DecodingKey>,
    raw: Value,
    expires_at: Instant,
}

/// Lifecycle of the cache as seen by verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No fetch has succeeded yet
    Empty,
    Populated,
    /// Past expiry; verification fails until the next fetch
    Expired,
}

/// Cache of RSA verification keys for one issuer.
///
/// Readers clone the current snapshot `Arc` and release the lock at once; a
/// fetch performs all network I/O first and takes the write lock only to swap
/// in the new snapshot. A snapshot is never patched in place.
pub struct JwksCache {
    issuer: String,
    client: reqwest::Client,
    ttl: Duration,
    current: RwLock<Option<Arc<KeySet>>>,
}

impl fmt::Debug for JwksCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwksCache")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl JwksCache {
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the HTTP client cannot be built.
    pub fn new(issuer: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self::with_client(issuer, client))
    }

    pub fn with_client(issuer: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            issuer: issuer.into(),
            client,
            ttl: JWKS_CACHE_TTL,
            current: RwLock::new(None),
        }
    }

    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn discovery_url(&self) -> String {
        format!("{}{DISCOVERY_PATH}", self.issuer.trim_end_matches('/'))
    }

    /// Discover the key-set URI and replace the cached keys.
    ///
    /// Returns the number of usable keys. On failure the previous snapshot
    /// is left untouched; there is no retry.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error ([`AuthError::is_infrastructure`]) if
    /// discovery or the key-set request fails, the set holds no usable RSA
    /// signing key, or `cancel` fires first.
    pub async fn fetch(&self, cancel: &CancellationToken) -> Result<usize> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(issuer = %self.issuer, "JWKS fetch cancelled");
                Err(AuthError::FetchCancelled)
            }
            result = self.fetch_snapshot() => {
                let snapshot = result?;
                let count = snapshot.keys.len();
                *self.current.write() = Some(Arc::new(snapshot));
                tracing::info!(issuer = %self.issuer, keys_count = count, "JWKS refreshed");
                Ok(count)
            }
        }
    }

    async fn fetch_snapshot(&self) -> Result<KeySet> {
        let jwks_uri = self.discover().await?;
        tracing::debug!(jwks_uri = %jwks_uri, "Fetching JWKS");

        let response = self
            .client
            .get(&jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthError::JwksFetch(format!(
                "JWKS request failed: {}",
                response.status()
            )));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| AuthError::JwksParse(e.to_string()))?;
        let set = JwkSet::deserialize(&raw).map_err(|e| AuthError::JwksParse(e.to_string()))?;

        let keys = usable_keys(&set.keys);
        if keys.is_empty() {
            return Err(AuthError::NoUsableKeys);
        }

        Ok(KeySet {
            keys,
            raw,
            expires_at: Instant::now() + self.ttl,
        })
    }

    async fn discover(&self) -> Result<String> {
        let url = self.discovery_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthError::DiscoveryFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthError::DiscoveryFailed(format!(
                "discovery request failed: {}",
                response.status()
            )));
        }

        let discovery: Discovery = response
            .json()
            .await
            .map_err(|e| AuthError::DiscoveryFailed(format!("parsing discovery document: {e}")))?;
        // A document naming another issuer must not supply our keys.
        if discovery.issuer.trim_end_matches('/') != self.issuer.trim_end_matches('/') {
            return Err(AuthError::DiscoveryFailed(format!(
                "discovery document issuer {:?} does not match {:?}",
                discovery.issuer, self.issuer
            )));
        }
        if discovery.jwks_uri.is_empty() {
            return Err(AuthError::DiscoveryFailed(
                "jwks_uri not found in discovery document".into(),
            ));
        }
        Ok(discovery.jwks_uri)
    }

    fn snapshot(&self) -> Option<Arc<KeySet>> {
        self.current.read().clone()
    }

    /// Verification key for `kid`.
    ///
    /// # Errors
    ///
    /// [`AuthError::KeySetNotLoaded`], [`AuthError::KeySetExpired`] or
    /// [`AuthError::KeyNotFound`], kept distinct for logging.
    pub fn key(&self, kid: &str) -> Result<DecodingKey> {
        let set = self.snapshot().ok_or(AuthError::KeySetNotLoaded)?;
        if Instant::now() >= set.expires_at {
            return Err(AuthError::KeySetExpired);
        }
        set.keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::KeyNotFound(kid.to_string()))
    }

    pub fn state(&self) -> CacheState {
        match self.snapshot() {
            None => CacheState::Empty,
            Some(set) if Instant::now() >= set.expires_at => CacheState::Expired,
            Some(_) => CacheState::Populated,
        }
    }

    /// Cached key ids, sorted; empty before the first fetch
    pub fn key_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self
            .snapshot()
            .map(|set| set.keys.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Key-set document as last fetched, for diagnostics
    pub fn raw_document(&self) -> Option<Value> {
        self.snapshot().map(|set| set.raw.clone())
    }

    #[cfg(test)]
    pub(crate) fn expire_now(&self) {
        let mut current = self.current.write();
        if let Some(set) = current.as_ref() {
            let mut expired = KeySet::clone(set);
            expired.expires_at = Instant::now();
            *current = Some(Arc::new(expired));
        }
    }
}

fn usable_keys(entries: &[Value]) -> HashMap<String, DecodingKey> {
    let mut keys = HashMap::new();
    for entry in entries {
        let Ok(jwk) = Jwk::deserialize(entry) else {
            tracing::debug!("Skipping unparseable JWK entry");
            continue;
        };
        match jwk.decoding_key() {
            Some((kid, key)) => {
                keys.insert(kid, key);
            }
            None => tracing::debug!(
                kid = ?jwk.kid,
                kty = %jwk.kty,
                key_use = ?jwk.r#use,
                "Skipping JWK that is not a usable RSA signing key"
            ),
        }
    }
    keys
}

/// Periodic background refresh of a [`JwksCache`]
pub struct JwksRefreshTask {
    cache: Arc<JwksCache>,
    interval: Duration,
}

impl fmt::Debug for JwksRefreshTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwksRefreshTask")
            .field("cache", &self.cache)
            .field("interval", &self.interval)
            .finish()
    }
}

impl JwksRefreshTask {
    #[must_use]
    pub const fn new(cache: Arc<JwksCache>, interval: Duration) -> Self {
        Self { cache, interval }
    }

    /// Refresh every `interval` until `shutdown` fires. The first refresh
    /// happens one interval after spawning. Failures are logged and the next
    /// tick tries again.
    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + self.interval;
            let mut ticker = tokio::time::interval_at(start, self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.cache.fetch(&shutdown).await {
                            tracing::warn!(error = %e, "Background JWKS refresh failed");
                        }
                    }
                    () = shutdown.cancelled() => {
                        tracing::debug!("JWKS refresh task shutting down");
                        break;
                    }
                }
            }
        })
    }
}
