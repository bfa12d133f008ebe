use super::LOGIN_PATH;
use crate::{
    auth::{service::log_failure, AuthService, FlashKind, Session},
    gatehouse::views,
};
use axum::{
    extract::Extension,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Dashboard for the logged-in user, with the one-shot success message", content_type = "text/html"),
        (status = 303, description = "No authenticated session; redirect to /login")
    ),
    tag = "dashboard"
)]
// Anonymous visitors are sent to the login form without a message. Only a
// success flash is shown here; errors wait for their form.
pub async fn dashboard(auth: Extension<Arc<AuthService>>, session: Session) -> Response {
    match auth.current_user(&session).await {
        Ok(Some(user)) => {
            let flash = session.take_flash_of(FlashKind::Success).await;
            Html(views::dashboard(&user, flash.as_ref())).into_response()
        }
        Ok(None) => Redirect::to(LOGIN_PATH).into_response(),
        Err(err) => {
            log_failure("dashboard", &err);
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}
