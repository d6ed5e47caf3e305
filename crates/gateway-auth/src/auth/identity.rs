//! Canonical authenticated identity

use std::fmt;

use serde::Serialize;

use super::claims::ClaimBag;
use super::error::{AuthError, Result};
use crate::constants::ANONYMOUS_USER_ID;

/// Which authenticator produced an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    ApiKey,
    OAuth,
    Oidc,
    Anonymous,
}

impl AuthMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApiKey => "apikey",
            Self::OAuth => "oauth",
            Self::Oidc => "oidc",
            Self::Anonymous => "anonymous",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized result of a successful authentication.
///
/// An `Identity` always has a non-empty user id; the only way to build one
/// is [`Identity::new`], which rejects an empty id. Once handed out it is
/// read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    roles: Vec<String>,
    groups: Vec<String>,
    claims: ClaimBag,
    auth_method: AuthMethod,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, auth_method: AuthMethod) -> Result<Self> {
        let user_id = user_id.into();
        if user_id.is_empty() {
            return Err(AuthError::MissingClaim("sub"));
        }
        Ok(Self {
            user_id,
            email: None,
            name: None,
            roles: Vec::new(),
            groups: Vec::new(),
            claims: ClaimBag::new(),
            auth_method,
        })
    }

    /// The well-known identity returned by a chain that allows anonymous access
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            user_id: ANONYMOUS_USER_ID.to_string(),
            email: None,
            name: None,
            roles: Vec::new(),
            groups: Vec::new(),
            claims: ClaimBag::new(),
            auth_method: AuthMethod::Anonymous,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email.filter(|e| !e.is_empty());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|n| !n.is_empty());
        self
    }

    #[must_use]
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    #[must_use]
    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    #[must_use]
    pub fn with_claims(mut self, claims: ClaimBag) -> Self {
        self.claims = claims;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Raw claims for downstream extraction of domain-specific fields
    pub const fn claims(&self) -> &ClaimBag {
        &self.claims
    }

    pub const fn auth_method(&self) -> AuthMethod {
        self.auth_method
    }

    pub fn is_anonymous(&self) -> bool {
        self.auth_method == AuthMethod::Anonymous
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|role| self.has_role(role.as_ref()))
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}
