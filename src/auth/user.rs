//! User records and the pre-save password hook.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use uuid::Uuid;

use super::{error::HashError, password::PasswordHasher};

/// A persisted user. `password_hash` is always a bcrypt hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    // Reserved for a password reset flow; nothing reads or writes them yet.
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
}

impl User {
    /// Reopen a stored user for modification. The password starts unmodified.
    #[must_use]
    pub fn into_record(self) -> UserRecord {
        UserRecord {
            id: self.id,
            username: self.username,
            password: Password::Unchanged(self.password_hash),
            reset_token: self.reset_token,
            reset_token_expiry: self.reset_token_expiry,
        }
    }
}

/// Password field of a record that has not been persisted yet.
#[derive(Debug, Clone)]
pub enum Password {
    /// Already hashed; saving must keep it as is.
    Unchanged(String),
    /// Set since the last save; hashed exactly once by [`UserRecord::seal`].
    Modified(SecretString),
}

/// A user about to be written to the credential store.
#[derive(Debug, Clone)]
pub struct UserRecord {
    id: Uuid,
    username: String,
    password: Password,
    reset_token: Option<String>,
    reset_token_expiry: Option<DateTime<Utc>>,
}

impl UserRecord {
    #[must_use]
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password: Password::Modified(password),
            reset_token: None,
            reset_token_expiry: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn set_password(&mut self, password: SecretString) {
        self.password = Password::Modified(password);
    }

    #[must_use]
    pub fn is_password_modified(&self) -> bool {
        matches!(self.password, Password::Modified(_))
    }

    /// Turn the record into its persisted form, hashing the password only if
    /// it was modified.
    ///
    /// # Errors
    /// Returns an error if hashing fails.
    pub async fn seal(self, hasher: &PasswordHasher) -> Result<User, HashError> {
        let password_hash = match self.password {
            Password::Unchanged(hash) => hash,
            Password::Modified(plaintext) => hasher.hash(&plaintext).await?,
        };

        Ok(User {
            id: self.id,
            username: self.username,
            password_hash,
            reset_token: self.reset_token,
            reset_token_expiry: self.reset_token_expiry,
        })
    }
}
