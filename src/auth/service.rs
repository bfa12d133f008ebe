//! Registration, login, session guard and logout.

use secrecy::{ExposeSecret, SecretString};
use std::{sync::Arc, time::Duration};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument};

use super::{
    error::{AuthError, AuthenticationError, HashError, ValidationError},
    password::{PasswordHasher, MAX_PASSWORD_BYTES},
    session::{Flash, Session},
    store::{bounded, CredentialStore, InsertOutcome},
    user::{User, UserRecord},
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub const MSG_LOGIN_SUCCESS: &str = "Login successful!";
pub const MSG_REGISTER_SUCCESS: &str = "Registration successful. Please log in.";

const DEFAULT_STORE_TIMEOUT_SECONDS: u64 = 5;

// Compared against on unknown usernames so both login failures cost one bcrypt verify.
const DUMMY_PASSWORD: &str = "gatehouse-unknown-user";

pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    store_timeout: Duration,
    dummy_hash: OnceCell<String>,
}

impl AuthService {
    #[must_use]
    pub fn new(users: Arc<dyn CredentialStore>) -> Self {
        Self {
            users,
            hasher: PasswordHasher::default(),
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECONDS),
            dummy_hash: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self.dummy_hash = OnceCell::new();
        self
    }

    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    #[must_use]
    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Create a new user. The session is left untouched: registering never
    /// logs anyone in.
    ///
    /// # Errors
    /// `Validation` for missing input or a short password, `Conflict` when the
    /// username is taken, `Persistence`/`Hashing` for unexpected failures.
    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &SecretString) -> Result<User, AuthError> {
        require_fields(username, password)?;
        if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LENGTH,
            }
            .into());
        }
        if password.expose_secret().len() > MAX_PASSWORD_BYTES {
            return Err(ValidationError::PasswordTooLong {
                max: MAX_PASSWORD_BYTES,
            }
            .into());
        }

        if bounded(self.store_timeout, self.users.find_by_username(username))
            .await?
            .is_some()
        {
            debug!("Username already taken");
            return Err(AuthError::Conflict);
        }

        let user = UserRecord::new(username, password.clone())
            .seal(&self.hasher)
            .await?;

        // A concurrent registration may win between the lookup and the
        // insert; the store's unique index decides.
        match bounded(self.store_timeout, self.users.insert(&user)).await? {
            InsertOutcome::Created => {
                info!(user_id = %user.id, "User registered");
                Ok(user)
            }
            InsertOutcome::Conflict => {
                debug!("Username taken by a concurrent registration");
                Err(AuthError::Conflict)
            }
        }
    }

    /// Check credentials and, on success, attach the user to the session with
    /// a one-shot success message.
    ///
    /// # Errors
    /// `Validation` for missing input, `Authentication` for an unknown
    /// username or wrong password, `Persistence`/`Hashing` otherwise.
    #[instrument(skip(self, session, password))]
    pub async fn login(
        &self,
        session: &Session,
        username: &str,
        password: &SecretString,
    ) -> Result<User, AuthError> {
        require_fields(username, password)?;

        let Some(user) = bounded(self.store_timeout, self.users.find_by_username(username)).await?
        else {
            self.verify_against_dummy(password).await?;
            debug!("Login for unknown username");
            return Err(AuthenticationError::UnknownUsername.into());
        };

        if !self.hasher.verify(password, &user.password_hash).await? {
            debug!(user_id = %user.id, "Login with wrong password");
            return Err(AuthenticationError::WrongPassword.into());
        }

        session.authenticate(user.id).await;
        session.set_flash(Flash::success(MSG_LOGIN_SUCCESS)).await;
        info!(user_id = %user.id, "User logged in");

        Ok(user)
    }

    /// Resolve the session's identity into a user, `None` when the session is
    /// anonymous or refers to a user that no longer exists.
    ///
    /// # Errors
    /// `Persistence` if the credential store fails.
    pub async fn current_user(&self, session: &Session) -> Result<Option<User>, AuthError> {
        let Some(user_id) = session.identity().await else {
            return Ok(None);
        };
        let user = bounded(self.store_timeout, self.users.find_by_id(user_id)).await?;
        if user.is_none() {
            debug!(%user_id, "Session refers to a missing user");
        }
        Ok(user)
    }

    /// End the session. Store-side destruction happens when the session is
    /// committed and its failures are only logged.
    pub async fn logout(&self, session: &Session) {
        if let Some(user_id) = session.identity().await {
            info!(%user_id, "User logged out");
        }
        session.destroy().await;
    }

    /// Persist changes to an existing user, hashing the password only if it
    /// was modified.
    ///
    /// # Errors
    /// `Persistence`/`Hashing` on failure.
    pub async fn save_user(&self, record: UserRecord) -> Result<User, AuthError> {
        let user = record.seal(&self.hasher).await?;
        bounded(self.store_timeout, self.users.update(&user)).await?;
        Ok(user)
    }

    /// Liveness of the credential store.
    ///
    /// # Errors
    /// `Persistence` if the store cannot be reached.
    pub async fn ping(&self) -> Result<(), AuthError> {
        bounded(self.store_timeout, self.users.ping()).await?;
        Ok(())
    }
}

impl AuthService {
    async fn verify_against_dummy(&self, password: &SecretString) -> Result<(), HashError> {
        let dummy = self
            .dummy_hash
            .get_or_try_init(|| async {
                self.hasher
                    .hash(&SecretString::from(DUMMY_PASSWORD.to_string()))
                    .await
            })
            .await?;
        self.hasher.verify(password, dummy).await?;
        Ok(())
    }
}

/// Log unexpected failures with full detail; classified ones are routine.
pub fn log_failure(operation: &str, err: &AuthError) {
    if err.is_unexpected() {
        error!("{operation} failed: {err:?}");
    } else {
        debug!("{operation} rejected: {err}");
    }
}

fn require_fields(username: &str, password: &SecretString) -> Result<(), ValidationError> {
    if username.trim().is_empty() || password.expose_secret().is_empty() {
        return Err(ValidationError::MissingFields);
    }
    Ok(())
}
