use super::{Credentials, LOGIN_PATH, REGISTER_PATH};
use crate::{
    auth::{
        service::{log_failure, MSG_REGISTER_SUCCESS},
        AuthService, Flash, Session,
    },
    gatehouse::views,
};
use axum::{
    extract::{Extension, Form},
    response::{Html, Redirect},
};
use std::sync::Arc;
use tracing::instrument;

const MSG_REGISTRATION_FAILED: &str = "Registration failed. Please try again.";

#[utoipa::path(
    get,
    path = "/register",
    responses(
        (status = 200, description = "Registration form, with the pending flash message if any", content_type = "text/html")
    ),
    tag = "register"
)]
pub async fn register_form(session: Session) -> Html<String> {
    let flash = session.take_flash().await;
    Html(views::register(flash.as_ref()))
}

#[utoipa::path(
    post,
    path = "/register",
    request_body(content = Credentials, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to /login once registered, otherwise back to /register with an error message in the session")
    ),
    tag = "register"
)]
// axum handler for registration
#[instrument(skip_all)]
pub async fn register(
    auth: Extension<Arc<AuthService>>,
    session: Session,
    form: Option<Form<Credentials>>,
) -> Redirect {
    let (username, password) = form.map(|Form(form)| form).unwrap_or_default().into_parts();

    match auth.register(&username, &password).await {
        Ok(_) => {
            session.set_flash(Flash::success(MSG_REGISTER_SUCCESS)).await;
            Redirect::to(LOGIN_PATH)
        }
        Err(err) => {
            log_failure("registration", &err);
            let message = err.user_message().unwrap_or(MSG_REGISTRATION_FAILED);
            session.set_flash(Flash::error(message)).await;
            Redirect::to(REGISTER_PATH)
        }
    }
}
