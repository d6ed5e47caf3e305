//! Claim bag types and path-based claims extraction

use serde::Deserialize;
use serde_json::Value;

/// Loosely-typed claim bag as carried inside a token or returned by an IdP
pub type ClaimBag = serde_json::Map<String, Value>;

/// Audience can be a single string or array of strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<Value>),
}

impl OneOrMany {
    /// Read the `aud` claim; `None` when absent or of an unexpected shape
    pub fn from_claim(value: Option<&Value>) -> Option<Self> {
        value.and_then(|v| Self::deserialize(v).ok())
    }

    /// Non-string array elements never match
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::One(s) => s == value,
            Self::Many(v) => v.iter().any(|s| s.as_str() == Some(value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(s) => s.is_empty(),
            Self::Many(v) => v.is_empty(),
        }
    }
}

/// Canonical fields pulled out of a claim bag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedClaims {
    pub user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub groups: Vec<String>,
}

/// Reads canonical identity fields from heterogeneous claim shapes.
///
/// Every path is dot-separated (`realm_access.roles`). Traversal only
/// continues through JSON objects; anything else along the way resolves to
/// "absent". An empty path is always absent.
#[derive(Debug, Clone, Default)]
pub struct ClaimsExtractor {
    pub role_claim_path: String,
    /// When non-empty, only roles starting with this prefix are kept
    pub role_prefix: String,
    pub group_claim_path: String,
    pub email_claim_path: String,
    pub name_claim_path: String,
    pub subject_claim_path: String,
}

impl ClaimsExtractor {
    /// Extractor with the common IdP claim names
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            role_claim_path: "roles".to_string(),
            role_prefix: String::new(),
            group_claim_path: "groups".to_string(),
            email_claim_path: "email".to_string(),
            name_claim_path: "name".to_string(),
            subject_claim_path: "sub".to_string(),
        }
    }

    /// Standard subject/email/name paths with a configurable role location
    #[must_use]
    pub fn for_roles(role_claim_path: &str, role_prefix: &str) -> Self {
        Self {
            role_claim_path: role_claim_path.to_string(),
            role_prefix: role_prefix.to_string(),
            group_claim_path: String::new(),
            email_claim_path: "email".to_string(),
            name_claim_path: "name".to_string(),
            subject_claim_path: "sub".to_string(),
        }
    }

    /// Pure read over `claims`; never fails, missing values come back empty.
    pub fn extract(&self, claims: &ClaimBag) -> ExtractedClaims {
        let mut roles = if self.role_claim_path.is_empty() {
            Vec::new()
        } else {
            string_list(lookup(claims, &self.role_claim_path))
        };
        if !self.role_prefix.is_empty() {
            roles.retain(|role| role.starts_with(&self.role_prefix));
        }

        let groups = if self.group_claim_path.is_empty() {
            Vec::new()
        } else {
            string_list(lookup(claims, &self.group_claim_path))
        };

        ExtractedClaims {
            user_id: string_value(claims, &self.subject_claim_path).unwrap_or_default(),
            email: string_value(claims, &self.email_claim_path),
            name: string_value(claims, &self.name_claim_path),
            roles,
            groups,
        }
    }
}

/// Resolve a dot-separated path inside a claim bag
pub fn lookup<'a>(claims: &'a ClaimBag, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    let mut segments = path.split('.');
    let mut current = claims.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn string_value(claims: &ClaimBag, path: &str) -> Option<String> {
    lookup(claims, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}
