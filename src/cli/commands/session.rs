//! Session and store tuning flags.

use anyhow::{bail, Result};
use clap::{Arg, ArgAction, Command};
use std::time::Duration;

pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SESSION_COOKIE_SECURE: &str = "session-cookie-secure";
pub const ARG_SESSION_REAP_INTERVAL_SECONDS: &str = "session-reap-interval-seconds";
pub const ARG_STORE_TIMEOUT_SECONDS: &str = "store-timeout-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session lifetime in seconds")
                .env("GATEHOUSE_SESSION_TTL_SECONDS")
                .default_value("1209600")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_SESSION_COOKIE_SECURE)
                .long(ARG_SESSION_COOKIE_SECURE)
                .help("Mark the session cookie Secure (HTTPS only)")
                .env("GATEHOUSE_SESSION_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_SESSION_REAP_INTERVAL_SECONDS)
                .long(ARG_SESSION_REAP_INTERVAL_SECONDS)
                .help("How often expired sessions are purged, in seconds")
                .env("GATEHOUSE_SESSION_REAP_INTERVAL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_STORE_TIMEOUT_SECONDS)
                .long(ARG_STORE_TIMEOUT_SECONDS)
                .help("Upper bound for a single credential or session store call, in seconds")
                .env("GATEHOUSE_STORE_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub ttl: Duration,
    pub cookie_secure: bool,
    pub reap_interval: Duration,
    pub store_timeout: Duration,
}

impl Options {
    /// Read the session options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if a duration is zero.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let seconds = |name: &str| -> Result<Duration> {
            let value = matches.get_one::<u64>(name).copied().unwrap_or(0);
            if value == 0 {
                bail!("--{name} must be greater than zero");
            }
            Ok(Duration::from_secs(value))
        };

        Ok(Self {
            ttl: seconds(ARG_SESSION_TTL_SECONDS)?,
            cookie_secure: matches.get_flag(ARG_SESSION_COOKIE_SECURE),
            reap_interval: seconds(ARG_SESSION_REAP_INTERVAL_SECONDS)?,
            store_timeout: seconds(ARG_STORE_TIMEOUT_SECONDS)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> Command {
        with_args(Command::new("gatehouse"))
    }

    #[test]
    fn defaults() -> Result<()> {
        temp_env::with_vars(
            [
                ("GATEHOUSE_SESSION_TTL_SECONDS", None::<&str>),
                ("GATEHOUSE_SESSION_COOKIE_SECURE", None),
                ("GATEHOUSE_SESSION_REAP_INTERVAL_SECONDS", None),
                ("GATEHOUSE_STORE_TIMEOUT_SECONDS", None),
            ],
            || {
                let matches = command().try_get_matches_from(["gatehouse"])?;
                let options = Options::parse(&matches)?;
                assert_eq!(options.ttl, Duration::from_secs(14 * 24 * 60 * 60));
                assert!(!options.cookie_secure);
                assert_eq!(options.reap_interval, Duration::from_secs(600));
                assert_eq!(options.store_timeout, Duration::from_secs(5));
                Ok(())
            },
        )
    }

    #[test]
    fn env_overrides() -> Result<()> {
        temp_env::with_vars(
            [
                ("GATEHOUSE_SESSION_TTL_SECONDS", Some("3600")),
                ("GATEHOUSE_SESSION_COOKIE_SECURE", Some("true")),
                ("GATEHOUSE_SESSION_REAP_INTERVAL_SECONDS", Some("30")),
                ("GATEHOUSE_STORE_TIMEOUT_SECONDS", Some("2")),
            ],
            || {
                let matches = command().try_get_matches_from(["gatehouse"])?;
                let options = Options::parse(&matches)?;
                assert_eq!(options.ttl, Duration::from_secs(3600));
                assert!(options.cookie_secure);
                assert_eq!(options.reap_interval, Duration::from_secs(30));
                assert_eq!(options.store_timeout, Duration::from_secs(2));
                Ok(())
            },
        )
    }

    #[test]
    fn zero_duration_is_rejected() -> Result<()> {
        temp_env::with_vars([("GATEHOUSE_STORE_TIMEOUT_SECONDS", None::<&str>)], || {
            let matches =
                command().try_get_matches_from(["gatehouse", "--store-timeout-seconds", "0"])?;
            let err = Options::parse(&matches).err();
            assert!(err.is_some_and(|e| e.to_string().contains("--store-timeout-seconds")));
            Ok(())
        })
    }
}
