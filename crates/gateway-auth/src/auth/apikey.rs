//! Static API key authentication with runtime key management

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::TryRngCore;
use rand::rngs::OsRng;
use serde::Serialize;
use subtle::ConstantTimeEq;

use super::config::{ApiKey, ApiKeyConfig};
use super::context::AuthContext;
use super::error::{AuthError, Result};
use super::identity::{AuthMethod, Identity};
use super::Authenticator;
use crate::constants::{API_KEY_EMAIL_DOMAIN, API_KEY_USER_PREFIX, GENERATED_KEY_BYTES};

/// Public projection of a key entry. Never carries the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiKeySummary {
    pub name: String,
    pub roles: Vec<String>,
}

#[derive(Clone)]
struct KeyEntry {
    name: String,
    roles: Vec<String>,
}

/// Authenticates requests against a live set of shared secrets.
///
/// The map is keyed by secret value and owned by this instance; two
/// authenticators never share keys.
pub struct ApiKeyAuthenticator {
    keys: RwLock<HashMap<String, KeyEntry>>,
}

impl fmt::Debug for ApiKeyAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyAuthenticator")
            .field("keys_count", &self.keys.read().len())
            .finish_non_exhaustive()
    }
}

impl ApiKeyAuthenticator {
    #[must_use]
    pub fn new(config: &ApiKeyConfig) -> Self {
        let keys = config
            .keys
            .iter()
            .map(|k| {
                (
                    k.key.clone(),
                    KeyEntry {
                        name: k.name.clone(),
                        roles: k.roles.clone(),
                    },
                )
            })
            .collect();
        Self {
            keys: RwLock::new(keys),
        }
    }

    /// Insert or replace the entry for `key.key`
    pub fn add_key(&self, key: ApiKey) {
        tracing::debug!(name = %key.name, "API key added");
        self.keys.write().insert(
            key.key,
            KeyEntry {
                name: key.name,
                roles: key.roles,
            },
        );
    }

    pub fn remove_key(&self, key: &str) {
        if let Some(entry) = self.keys.write().remove(key) {
            tracing::debug!(name = %entry.name, "API key removed");
        }
    }

    /// Remove every entry with display name `name`; true if any was removed
    pub fn remove_by_name(&self, name: &str) -> bool {
        let mut keys = self.keys.write();
        let before = keys.len();
        keys.retain(|_, entry| entry.name != name);
        let removed = keys.len() != before;
        if removed {
            tracing::debug!(name = %name, "API key removed by name");
        }
        removed
    }

    /// Summaries sorted by name
    pub fn list_keys(&self) -> Vec<ApiKeySummary> {
        let mut summaries: Vec<_> = self
            .keys
            .read()
            .values()
            .map(|entry| ApiKeySummary {
                name: entry.name.clone(),
                roles: entry.roles.clone(),
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// Mint and store a random key for `name`.
    ///
    /// The returned value is the only time the secret leaves this type.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DuplicateKeyName`] if `name` is already used,
    /// or [`AuthError::KeyGeneration`] if the OS random source fails.
    pub fn generate_key(&self, name: &str, roles: Vec<String>) -> Result<String> {
        let secret = random_secret()?;

        // Name check and insert under one write lock so concurrent
        // generators cannot both claim the same name.
        let mut keys = self.keys.write();
        if keys.values().any(|entry| entry.name == name) {
            return Err(AuthError::DuplicateKeyName(name.to_string()));
        }
        keys.insert(
            secret.clone(),
            KeyEntry {
                name: name.to_string(),
                roles,
            },
        );
        drop(keys);

        tracing::info!(name = %name, "API key generated");
        Ok(secret)
    }

    /// Constant-time scan over every stored key.
    fn find(&self, presented: &str) -> Option<KeyEntry> {
        let keys = self.keys.read();
        let mut found = None;
        for (secret, entry) in keys.iter() {
            if bool::from(secret.as_bytes().ct_eq(presented.as_bytes())) {
                found = Some(entry);
            }
        }
        found.cloned()
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, ctx: &AuthContext) -> Result<Option<Identity>> {
        let token = ctx.token();
        if token.is_empty() {
            return Ok(None);
        }

        let Some(entry) = self.find(token) else {
            tracing::debug!("API key did not match any configured key");
            return Ok(None);
        };

        let identity = Identity::new(
            format!("{API_KEY_USER_PREFIX}{}", entry.name),
            AuthMethod::ApiKey,
        )?
        .with_email(Some(format!("{}@{API_KEY_EMAIL_DOMAIN}", entry.name)))
        .with_name(Some(entry.name))
        .with_roles(entry.roles);

        Ok(Some(identity))
    }
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

fn random_secret() -> Result<String> {
    let mut bytes = [0u8; GENERATED_KEY_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::KeyGeneration(e.to_string()))?;

    Ok(bytes
        .iter()
        .flat_map(|b| [HEX_DIGITS[usize::from(b >> 4)], HEX_DIGITS[usize::from(b & 0x0f)]])
        .map(char::from)
        .collect())
}
