//! Credential lifecycle and session authorization.
//!
//! Passwords are hashed with bcrypt (cost 10) the first time a record is
//! saved with a new password and never again unless it changes. Sessions are
//! anonymous until a successful login attaches an identity; logout destroys
//! them server-side.
//!
//! ```text
//! Anonymous --login--> Authenticated --logout | expiry--> Anonymous
//! Anonymous --register--> Anonymous
//! ```

pub mod error;
pub mod memory;
pub mod password;
pub mod postgres;
pub mod service;
pub mod session;
pub mod store;
pub mod user;
mod utils;

pub use error::{AuthError, AuthenticationError, HashError, StoreError, ValidationError};
pub use memory::{MemoryCredentialStore, MemorySessionStore};
pub use password::{PasswordHasher, MAX_PASSWORD_BYTES};
pub use postgres::{PgCredentialStore, PgSessionStore};
pub use service::{AuthService, MIN_PASSWORD_LENGTH};
pub use session::{Flash, FlashKind, Session, SessionConfig, SessionData, SessionManager};
pub use store::{CredentialStore, InsertOutcome, SessionStore};
pub use user::{User, UserRecord};
