#![allow(clippy::needless_for_each)]

use crate::auth::{
    postgres::split_sql_statements,
    session::{session_layer, spawn_session_reaper},
    AuthService, PgCredentialStore, PgSessionStore, SessionConfig, SessionManager,
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::get,
    Extension, Router,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub(crate) mod handlers;
pub mod views;

pub const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::register::register_form,
        handlers::register::register,
        handlers::login::login_form,
        handlers::login::login,
        handlers::dashboard::dashboard,
        handlers::logout::logout,
    ),
    components(schemas(handlers::health::Health, handlers::Credentials)),
    tags(
        (name = "gatehouse", description = "Username and password authentication")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Build the application router on top of the given auth service and
/// session manager. `/health` sits outside the session layer so health checks do
/// not create sessions.
pub fn router(auth: Arc<AuthService>, sessions: SessionManager) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route(
            "/register",
            get(handlers::register_form).post(handlers::register),
        )
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/dashboard", get(handlers::dashboard))
        .route("/logout", get(handlers::logout))
        .layer(middleware::from_fn_with_state(sessions, session_layer))
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(Extension(auth))
}

/// Start the server
/// # Errors
/// Return error if failed to connect to the database or to start the server
pub async fn new(
    port: u16,
    dsn: String,
    session_config: SessionConfig,
    reap_interval: Duration,
) -> Result<()> {
    // Connect to database
    let pool = match PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .acquire_timeout(session_config.store_timeout())
        .test_before_acquire(true)
        .connect(&dsn)
        .await
    {
        Ok(pool) => {
            info!("Connected to database");
            pool
        }
        Err(err) => {
            error!("Failed to connect to database: {err}");
            return Err(err).context("Failed to connect to database");
        }
    };

    apply_schema(&pool).await?;

    let store_timeout = session_config.store_timeout();
    let session_store = Arc::new(PgSessionStore::new(pool.clone()));
    let sessions = SessionManager::new(session_store.clone(), session_config);
    let auth = Arc::new(
        AuthService::new(Arc::new(PgCredentialStore::new(pool))).with_store_timeout(store_timeout),
    );

    // Background task removes sessions whose TTL has passed.
    spawn_session_reaper(session_store, reap_interval, store_timeout);

    let app = router(auth, sessions).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

async fn apply_schema(pool: &PgPool) -> Result<()> {
    for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
    }
    info!("Database schema is up to date");

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_every_route() {
        let doc = openapi();
        for path in ["/health", "/register", "/login", "/dashboard", "/logout"] {
            assert!(
                doc.paths.paths.contains_key(path),
                "missing {path} in OpenAPI document"
            );
        }
    }
}
