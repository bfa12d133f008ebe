//! Salted one-way password hashing (bcrypt).
//!
//! bcrypt is CPU bound, so both hashing and verification run on the blocking
//! thread pool to keep the request executor free.
//!
//! bcrypt only reads the first 72 bytes of its input, a trailing NUL
//! included. Longer passwords are refused instead of silently truncated.

use secrecy::{ExposeSecret, SecretString};

use super::error::HashError;

/// Work factor used for every stored password.
pub const DEFAULT_COST: u32 = 10;

/// Longest password, in UTF-8 bytes, that bcrypt hashes without truncation.
pub const MAX_PASSWORD_BYTES: usize = 71;

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    /// Build a hasher with a custom bcrypt cost (4..=31).
    #[must_use]
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    #[must_use]
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password with a fresh random salt.
    ///
    /// # Errors
    /// Returns an error if the password is longer than [`MAX_PASSWORD_BYTES`],
    /// bcrypt rejects the cost or the worker task fails.
    pub async fn hash(&self, plaintext: &SecretString) -> Result<String, HashError> {
        let cost = self.cost;
        let plaintext = plaintext.clone();
        let hashed = tokio::task::spawn_blocking(move || {
            bcrypt::non_truncating_hash(plaintext.expose_secret(), cost)
        })
        .await??;
        Ok(hashed)
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// A mismatch is `Ok(false)`, and so is a candidate too long to have been
    /// stored; only a malformed hash is an error.
    ///
    /// # Errors
    /// Returns an error if the stored hash cannot be parsed or the worker task fails.
    pub async fn verify(&self, plaintext: &SecretString, hashed: &str) -> Result<bool, HashError> {
        let plaintext = plaintext.clone();
        let hashed = hashed.to_string();
        let result = tokio::task::spawn_blocking(move || {
            bcrypt::non_truncating_verify(plaintext.expose_secret(), &hashed)
        })
        .await?;

        match result {
            Ok(matched) => Ok(matched),
            Err(bcrypt::BcryptError::Truncation(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
