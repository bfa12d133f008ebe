use crate::{auth::SessionConfig, gatehouse};
use anyhow::Result;
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub session_ttl: Duration,
    pub session_cookie_secure: bool,
    pub session_reap_interval: Duration,
    pub store_timeout: Duration,
}

impl Args {
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_ttl(self.session_ttl)
            .with_cookie_secure(self.session_cookie_secure)
            .with_store_timeout(self.store_timeout)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let session_config = args.session_config();
    debug!(?session_config, "starting server");

    gatehouse::new(
        args.port,
        args.dsn,
        session_config,
        args.session_reap_interval,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_reflects_args() {
        let args = Args {
            port: 8080,
            dsn: "postgres://localhost/gatehouse".to_string(),
            session_ttl: Duration::from_secs(120),
            session_cookie_secure: true,
            session_reap_interval: Duration::from_secs(60),
            store_timeout: Duration::from_secs(3),
        };
        let config = args.session_config();
        assert_eq!(config.ttl(), Duration::from_secs(120));
        assert!(config.cookie_secure());
        assert_eq!(config.store_timeout(), Duration::from_secs(3));
    }
}
