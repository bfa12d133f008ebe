//! Error taxonomy for the credential and session flows.

use std::time::Duration;
use thiserror::Error;

/// User-facing text for classified failures.
pub const MSG_MISSING_FIELDS: &str = "Please fill in all fields.";
pub const MSG_PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters.";
pub const MSG_PASSWORD_TOO_LONG: &str = "Password must be at most 71 bytes.";
pub const MSG_USERNAME_TAKEN: &str = "Username already exists.";
pub const MSG_INVALID_CREDENTIALS: &str = "Invalid username or password.";

/// Input rejected before touching any store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("username and password are required")]
    MissingFields,
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("password must be at most {max} bytes")]
    PasswordTooLong { max: usize },
}

/// Lookup or credential mismatch during login.
///
/// The two variants stay distinct for callers and tests; the text shown to
/// users is the same for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthenticationError {
    #[error("incorrect username")]
    UnknownUsername,
    #[error("incorrect password")]
    WrongPassword,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid stored payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum HashError {
    #[error("bcrypt failure: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("username already exists")]
    Conflict,
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),
    #[error(transparent)]
    Persistence(#[from] StoreError),
    #[error(transparent)]
    Hashing(#[from] HashError),
}

impl AuthError {
    /// Message safe to show to the user, or `None` when the failure is
    /// unexpected and only a generic message may be shown.
    #[must_use]
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Validation(ValidationError::MissingFields) => Some(MSG_MISSING_FIELDS),
            Self::Validation(ValidationError::PasswordTooShort { .. }) => {
                Some(MSG_PASSWORD_TOO_SHORT)
            }
            Self::Validation(ValidationError::PasswordTooLong { .. }) => {
                Some(MSG_PASSWORD_TOO_LONG)
            }
            Self::Conflict => Some(MSG_USERNAME_TAKEN),
            Self::Authentication(_) => Some(MSG_INVALID_CREDENTIALS),
            Self::Persistence(_) | Self::Hashing(_) => None,
        }
    }

    /// Whether the failure should be logged with full detail server-side.
    #[must_use]
    pub fn is_unexpected(&self) -> bool {
        self.user_message().is_none()
    }
}
