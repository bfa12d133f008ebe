//! Server-rendered HTML pages.

use crate::auth::{Flash, FlashKind, User};

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn flash_block(flash: Option<&Flash>) -> String {
    flash.map_or_else(String::new, |flash| {
        let class = match flash.kind {
            FlashKind::Error => "error",
            FlashKind::Success => "success",
        };
        format!(
            r#"<p class="flash {class}" role="alert">{}</p>"#,
            html_escape(&flash.message)
        )
    })
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body>
{body}
</body>
</html>
"#
    )
}

fn credentials_form(action: &str, submit: &str) -> String {
    format!(
        r#"<form method="post" action="{action}">
<label>Username <input type="text" name="username" required autocomplete="username"></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">{submit}</button>
</form>"#
    )
}

#[must_use]
pub fn register(flash: Option<&Flash>) -> String {
    let body = format!(
        r#"<h1>Register</h1>
{}
{}
<p>Already have an account? <a href="/login">Log in</a></p>"#,
        flash_block(flash),
        credentials_form("/register", "Register"),
    );
    page("Register", &body)
}

#[must_use]
pub fn login(flash: Option<&Flash>) -> String {
    let body = format!(
        r#"<h1>Log in</h1>
{}
{}
<p>No account yet? <a href="/register">Register</a></p>"#,
        flash_block(flash),
        credentials_form("/login", "Log in"),
    );
    page("Log in", &body)
}

#[must_use]
pub fn dashboard(user: &User, flash: Option<&Flash>) -> String {
    let body = format!(
        r#"<h1>Dashboard</h1>
{}
<p>Welcome, <strong>{}</strong>.</p>
<p><a href="/logout">Log out</a></p>"#,
        flash_block(flash),
        html_escape(&user.username),
    );
    page("Dashboard", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn html_escape_neutralises_markup() {
        assert_eq!(
            html_escape(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn forms_render_flash_only_when_present() {
        let page = login(None);
        assert!(page.contains(r#"action="/login""#));
        assert!(!page.contains("flash"));

        let page = register(Some(&Flash::error("Username already exists.")));
        assert!(page.contains(r#"<p class="flash error" role="alert">Username already exists.</p>"#));
    }

    #[test]
    fn dashboard_escapes_username() {
        let user = User {
            id: Uuid::new_v4(),
            username: "<b>mallory</b>".to_string(),
            password_hash: String::new(),
            reset_token: None,
            reset_token_expiry: None,
        };
        let page = dashboard(&user, Some(&Flash::success("Login successful!")));
        assert!(page.contains("&lt;b&gt;mallory&lt;/b&gt;"));
        assert!(page.contains("flash success"));
    }
}
