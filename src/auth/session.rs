//! Cookie-backed server-side sessions.
//!
//! The cookie only carries an opaque random token; the payload lives in a
//! [`SessionStore`] keyed by the token's SHA-256. A middleware attaches a
//! [`Session`] handle to each request and commits it once the handler is done:
//!
//! - a request without a known cookie starts a fresh anonymous session, which
//!   is persisted and gets a cookie on first contact;
//! - authenticating a session rotates its token;
//! - destroying a session deletes the record and clears the cookie.
//!
//! Store failures while committing are logged and never reach the client.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::{sync::Mutex, task::JoinHandle, time::sleep};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{
    store::{bounded, SessionStore},
    utils::{generate_session_token, hash_session_token},
};

pub const SESSION_COOKIE_NAME: &str = "gatehouse_session";

const DEFAULT_SESSION_TTL_SECONDS: u64 = 14 * 24 * 60 * 60;
const DEFAULT_STORE_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Error,
    Success,
}

/// A one-shot notification shown by the next render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }
}

/// What the session store persists for each session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Set once the session has logged in.
    pub identity: Option<Uuid>,
    pub flash: Option<Flash>,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    ttl: Duration,
    cookie_secure: bool,
    store_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECONDS),
            cookie_secure: false,
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECONDS),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }
}

#[derive(Debug)]
struct SessionState {
    /// Raw cookie value; `None` until the session has been issued one.
    token: Option<String>,
    data: SessionData,
    dirty: bool,
    rotate: bool,
    destroyed: bool,
}

/// Per-request handle to the current session.
#[derive(Clone, Debug)]
pub struct Session {
    inner: Arc<Mutex<SessionState>>,
}

impl Session {
    fn new(token: Option<String>, data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState {
                token,
                data,
                dirty: false,
                rotate: false,
                destroyed: false,
            })),
        }
    }

    /// A detached anonymous session, not backed by any store.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(None, SessionData::default())
    }

    pub async fn identity(&self) -> Option<Uuid> {
        self.inner.lock().await.data.identity
    }

    /// Attach an identity and ask for a fresh session token.
    pub async fn authenticate(&self, user_id: Uuid) {
        let mut state = self.inner.lock().await;
        state.data.identity = Some(user_id);
        state.dirty = true;
        state.rotate = true;
    }

    pub async fn set_flash(&self, flash: Flash) {
        let mut state = self.inner.lock().await;
        state.data.flash = Some(flash);
        state.dirty = true;
    }

    /// Return the pending flash and clear it in the same step.
    pub async fn take_flash(&self) -> Option<Flash> {
        let mut state = self.inner.lock().await;
        let flash = state.data.flash.take();
        if flash.is_some() {
            state.dirty = true;
        }
        flash
    }

    /// Like [`Session::take_flash`], but only for a flash of `kind`; any other
    /// flash stays pending for the page it belongs to.
    pub async fn take_flash_of(&self, kind: FlashKind) -> Option<Flash> {
        let mut state = self.inner.lock().await;
        if state.data.flash.as_ref().map(|flash| flash.kind) != Some(kind) {
            return None;
        }
        state.dirty = true;
        state.data.flash.take()
    }

    /// Drop the whole session once the response is ready.
    pub async fn destroy(&self) {
        let mut state = self.inner.lock().await;
        state.data = SessionData::default();
        state.destroyed = true;
    }

    pub async fn is_destroyed(&self) -> bool {
        self.inner.lock().await.destroyed
    }

    pub async fn data(&self) -> SessionData {
        self.inner.lock().await.data.clone()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "session layer is not installed",
        ))
    }
}

/// Loads sessions before a request and commits them after it.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Resolve the request's cookie into a session handle.
    pub async fn open(&self, headers: &HeaderMap) -> Session {
        let Some(token) = extract_session_token(headers) else {
            return Session::anonymous();
        };
        let token_hash = hash_session_token(&token);
        match bounded(self.config.store_timeout, self.store.load(&token_hash)).await {
            Ok(Some(data)) => Session::new(Some(token), data),
            Ok(None) => {
                debug!("Unknown or expired session cookie");
                Session::anonymous()
            }
            Err(err) => {
                error!("Failed to load session: {err}");
                Session::anonymous()
            }
        }
    }

    /// Persist, rotate or destroy the session and set the matching cookie.
    pub async fn commit(&self, session: &Session, headers: &mut HeaderMap) {
        let mut state = session.inner.lock().await;

        if state.destroyed {
            if let Some(token) = state.token.take() {
                self.discard(&token).await;
            }
            if let Ok(cookie) = clear_session_cookie(&self.config) {
                headers.append(SET_COOKIE, cookie);
            }
            return;
        }

        let issue = state.rotate || state.token.is_none();
        if !state.dirty && !issue {
            return;
        }

        if issue {
            if let Some(previous) = state.token.take() {
                self.discard(&previous).await;
            }
            match generate_session_token() {
                Ok(token) => state.token = Some(token),
                Err(err) => {
                    error!("Failed to issue session token: {err}");
                    return;
                }
            }
        }

        let Some(token) = state.token.clone() else {
            return;
        };
        let token_hash = hash_session_token(&token);
        let saved = bounded(
            self.config.store_timeout,
            self.store.save(&token_hash, &state.data, self.config.ttl),
        )
        .await;

        match saved {
            Ok(()) => {
                state.dirty = false;
                state.rotate = false;
                if issue {
                    match session_cookie(&self.config, &token) {
                        Ok(cookie) => {
                            headers.append(SET_COOKIE, cookie);
                        }
                        Err(err) => error!("Failed to build session cookie: {err}"),
                    }
                }
            }
            Err(err) => error!("Failed to save session: {err}"),
        }
    }

    async fn discard(&self, token: &str) {
        let token_hash = hash_session_token(token);
        if let Err(err) = bounded(self.config.store_timeout, self.store.destroy(&token_hash)).await
        {
            error!("Failed to destroy session: {err}");
        }
    }
}

/// axum middleware attaching a [`Session`] to every request.
pub async fn session_layer(
    State(manager): State<SessionManager>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = manager.open(request.headers()).await;
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;
    manager.commit(&session, response.headers_mut()).await;

    response
}

/// Periodically delete expired sessions from the store.
pub fn spawn_session_reaper(
    store: Arc<dyn SessionStore>,
    interval: Duration,
    store_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;

            match bounded(store_timeout, store.purge_expired()).await {
                Ok(0) => debug!("No expired sessions to purge"),
                Ok(count) => info!("Purged {count} expired sessions"),
                Err(err) => error!("Failed to purge expired sessions: {err}"),
            }
        }
    })
}

fn session_cookie(
    config: &SessionConfig,
    token: &str,
) -> Result<HeaderValue, axum::http::header::InvalidHeaderValue> {
    let max_age = config.ttl.as_secs();
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(
    config: &SessionConfig,
) -> Result<HeaderValue, axum::http::header::InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == SESSION_COOKIE_NAME && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}
