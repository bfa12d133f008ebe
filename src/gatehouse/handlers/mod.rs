pub mod dashboard;
pub use self::dashboard::dashboard;

pub mod health;
pub use self::health::health;

pub mod login;
pub use self::login::{login, login_form};

pub mod logout;
pub use self::logout::logout;

pub mod register;
pub use self::register::{register, register_form};

// common types for the handlers
use axum::response::Redirect;
use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;
use utoipa::ToSchema;

pub(crate) const LOGIN_PATH: &str = "/login";
pub(crate) const REGISTER_PATH: &str = "/register";
pub(crate) const DASHBOARD_PATH: &str = "/dashboard";

/// Username and password as posted by the login and registration forms.
///
/// Missing fields deserialize to empty strings so they are reported as a
/// validation error instead of a form rejection.
#[derive(ToSchema, Deserialize, Default)]
pub struct Credentials {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

impl Credentials {
    fn into_parts(self) -> (String, SecretString) {
        (self.username, SecretString::from(self.password))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

// axum handler for /
pub async fn root() -> Redirect {
    Redirect::to(LOGIN_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn credentials_debug_redacts_password() {
        let credentials = Credentials {
            username: "alice".to_string(),
            password: "password123".to_string(),
        };
        let debug = format!("{credentials:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("password123"));

        let (username, password) = credentials.into_parts();
        assert_eq!(username, "alice");
        assert_eq!(password.expose_secret(), "password123");
    }

    #[test]
    fn credentials_default_missing_fields() {
        let credentials: Credentials = serde_json::from_str(r#"{"username":"bob"}"#)
            .unwrap_or_default();
        let (username, password) = credentials.into_parts();
        assert_eq!(username, "bob");
        assert_eq!(password.expose_secret(), "");
    }
}
