use super::{Credentials, DASHBOARD_PATH, LOGIN_PATH};
use crate::{
    auth::{service::log_failure, AuthService, Flash, Session},
    gatehouse::views,
};
use axum::{
    extract::{Extension, Form},
    response::{Html, Redirect},
};
use std::sync::Arc;
use tracing::instrument;

const MSG_LOGIN_FAILED: &str = "Login failed. Please try again.";

#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Login form, with the pending flash message if any", content_type = "text/html")
    ),
    tag = "login"
)]
pub async fn login_form(session: Session) -> Html<String> {
    let flash = session.take_flash().await;
    Html(views::login(flash.as_ref()))
}

#[utoipa::path(
    post,
    path = "/login",
    request_body(content = Credentials, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to /dashboard with a fresh session cookie, otherwise back to /login with an error message in the session")
    ),
    tag = "login"
)]
// axum handler for login
#[instrument(skip_all)]
pub async fn login(
    auth: Extension<Arc<AuthService>>,
    session: Session,
    form: Option<Form<Credentials>>,
) -> Redirect {
    let (username, password) = form.map(|Form(form)| form).unwrap_or_default().into_parts();

    match auth.login(&session, &username, &password).await {
        Ok(_) => Redirect::to(DASHBOARD_PATH),
        Err(err) => {
            log_failure("login", &err);
            let message = err.user_message().unwrap_or(MSG_LOGIN_FAILED);
            session.set_flash(Flash::error(message)).await;
            Redirect::to(LOGIN_PATH)
        }
    }
}
