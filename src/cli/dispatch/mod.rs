//! Map parsed CLI arguments to an action.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{session, ARG_DSN, ARG_PORT};
use anyhow::{bail, Context, Result};
use url::Url;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or the DSN is not a Postgres URL.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let parsed = Url::parse(&dsn).context("invalid --dsn")?;
    if !matches!(parsed.scheme(), "postgres" | "postgresql") {
        bail!(
            "invalid --dsn: expected a postgres:// URL, got scheme '{}'",
            parsed.scheme()
        );
    }

    let session = session::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        session_ttl: session.ttl,
        session_cookie_secure: session.cookie_secure,
        session_reap_interval: session.reap_interval,
        store_timeout: session.store_timeout,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn dispatch(args: &[&str]) -> Result<Action> {
        let matches = crate::cli::commands::new().try_get_matches_from(args)?;
        handler(&matches)
    }

    fn with_clean_env<F: FnOnce()>(f: F) {
        temp_env::with_vars(
            [
                ("GATEHOUSE_PORT", None::<&str>),
                ("GATEHOUSE_DSN", None),
                ("GATEHOUSE_SESSION_TTL_SECONDS", None),
                ("GATEHOUSE_SESSION_COOKIE_SECURE", None),
                ("GATEHOUSE_SESSION_REAP_INTERVAL_SECONDS", None),
                ("GATEHOUSE_STORE_TIMEOUT_SECONDS", None),
            ],
            f,
        );
    }

    #[test]
    fn builds_server_action() {
        with_clean_env(|| {
            let action = dispatch(&[
                "gatehouse",
                "--port",
                "3000",
                "--dsn",
                "postgres://gatehouse@localhost:5432/gatehouse",
                "--session-cookie-secure",
                "--session-ttl-seconds",
                "60",
            ]);
            let args = match action {
                Ok(Action::Server(args)) => args,
                Err(err) => panic!("expected server action, got {err}"),
            };
            assert_eq!(args.port, 3000);
            assert_eq!(args.dsn, "postgres://gatehouse@localhost:5432/gatehouse");
            assert!(args.session_cookie_secure);
            assert_eq!(args.session_ttl, Duration::from_secs(60));
            assert_eq!(args.session_reap_interval, Duration::from_secs(600));
            assert_eq!(args.store_timeout, Duration::from_secs(5));
        });
    }

    #[test]
    fn accepts_postgresql_scheme() {
        with_clean_env(|| {
            assert!(dispatch(&["gatehouse", "--dsn", "postgresql://localhost/gatehouse"]).is_ok());
        });
    }

    #[test]
    fn rejects_non_postgres_dsn() {
        with_clean_env(|| {
            let result = dispatch(&["gatehouse", "--dsn", "mysql://localhost/gatehouse"]);
            assert!(result.is_err_and(|e| e.to_string().contains("expected a postgres:// URL")));

            let result = dispatch(&["gatehouse", "--dsn", "not a url"]);
            assert!(result.is_err_and(|e| e.to_string().contains("invalid --dsn")));
        });
    }
}
