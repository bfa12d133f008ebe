//! Postgres-backed credential and session stores.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use std::time::Duration;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{
    error::StoreError,
    session::SessionData,
    store::{CredentialStore, InsertOutcome, SessionStore},
    user::User,
    utils::is_unique_violation,
};

const USER_COLUMNS: &str = r"
    id,
    username,
    password_hash,
    reset_token,
    reset_token_expiry
";

fn query_span(operation: &'static str, statement: &str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        reset_token: row.get("reset_token"),
        reset_token_expiry: row.get("reset_token_expiry"),
    }
}

#[derive(Clone, Debug)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn insert(&self, user: &User) -> Result<InsertOutcome, StoreError> {
        let query = r"
            INSERT INTO users
                (id, username, password_hash, reset_token, reset_token_expiry)
            VALUES ($1, $2, $3, $4, $5)
        ";
        let result = sqlx::query(query)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.reset_token)
            .bind(user.reset_token_expiry)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Created),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err.into()),
        }
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let query = r"
            UPDATE users
            SET username = $2,
                password_hash = $3,
                reset_token = $4,
                reset_token_expiry = $5
            WHERE id = $1
        ";
        sqlx::query(query)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.reset_token)
            .bind(user.reset_token_expiry)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, session_hash: &[u8]) -> Result<Option<SessionData>, StoreError> {
        let query = r"
            SELECT payload::text AS payload
            FROM sessions
            WHERE session_hash = $1
              AND expires_at > NOW()
        ";
        let row = sqlx::query(query)
            .bind(session_hash)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;

        match row {
            Some(row) => {
                let payload: String = row.get("payload");
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        session_hash: &[u8],
        data: &SessionData,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(data)?;
        let ttl_seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let query = r"
            INSERT INTO sessions (session_hash, payload, expires_at)
            VALUES ($1, $2::jsonb, NOW() + make_interval(secs => $3::double precision))
            ON CONFLICT (session_hash) DO UPDATE
            SET payload = EXCLUDED.payload,
                expires_at = EXCLUDED.expires_at
        ";
        sqlx::query(query)
            .bind(session_hash)
            .bind(payload)
            .bind(ttl_seconds)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await?;
        Ok(())
    }

    async fn destroy(&self, session_hash: &[u8]) -> Result<(), StoreError> {
        // Logout is idempotent; it's fine if no rows are deleted.
        let query = "DELETE FROM sessions WHERE session_hash = $1";
        sqlx::query(query)
            .bind(session_hash)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let query = "DELETE FROM sessions WHERE expires_at <= NOW()";
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await?;
        Ok(result.rows_affected())
    }
}

/// Split a schema file into individual statements, skipping psql directives.
pub(crate) fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('\\') || trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sql_statements_skips_comments_and_directives() {
        let sql = "-- header\n\\ir other.sql\nCREATE TABLE a (\n  id INT\n);\n\nCREATE INDEX b ON a (id);\n";
        let statements = split_sql_statements(sql);
        assert_eq!(
            statements,
            vec![
                "CREATE TABLE a (\n  id INT\n);".to_string(),
                "CREATE INDEX b ON a (id);".to_string(),
            ]
        );
    }

    #[test]
    fn bundled_schema_has_unique_username_index() {
        let statements = split_sql_statements(crate::gatehouse::SCHEMA_SQL);
        assert!(statements
            .iter()
            .any(|s| s.contains("CREATE UNIQUE INDEX") && s.contains("users (username)")));
        assert!(statements
            .iter()
            .any(|s| s.contains("CREATE TABLE IF NOT EXISTS sessions")));
    }
}
