use thiserror::Error;

use crate::auth::AuthError;

/// Errors raised while bootstrapping the authentication stack
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
}

impl Error {
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Auth(AuthError::Config(_)))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
