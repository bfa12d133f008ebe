use super::LOGIN_PATH;
use crate::auth::{AuthService, Session};
use axum::{extract::Extension, response::Redirect};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 303, description = "Session destroyed and cookie cleared; redirect to /login")
    ),
    tag = "logout"
)]
// Always redirects; failures to delete the stored session are only logged.
pub async fn logout(auth: Extension<Arc<AuthService>>, session: Session) -> Redirect {
    auth.logout(&session).await;
    Redirect::to(LOGIN_PATH)
}
