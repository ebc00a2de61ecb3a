/*
 * Responsibility
 * - page routes (/, /login, /register, /projects)
 * - 中身はまだ placeholder (稍後顯示…)。session の有無だけ反映する
 */
use axum::{
    Router,
    extract::Query,
    response::Html,
    routing::get,
};
use serde::Deserialize;

use crate::api::extractors::{CurrentSession, MaybeSession};
use crate::state::AppState;

const PLACEHOLDER: &str = "稍後顯示…";

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "callbackUrl")]
    callback_url: Option<String>,
    error: Option<String>,
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html lang=\"zh-Hant\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{} · Wander Wallet</title></head><body>{}</body></html>",
        escape(title),
        body
    ))
}

async fn home(MaybeSession(session): MaybeSession) -> Html<String> {
    let name = session
        .and_then(|s| s.display_name.or(s.email))
        .unwrap_or_default();
    page(
        "Home",
        &format!("<h1>Hi, {}</h1><p>{PLACEHOLDER}</p>", escape(&name)),
    )
}

async fn login(Query(query): Query<LoginQuery>) -> Html<String> {
    let callback = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("callbackUrl", query.callback_url.as_deref().unwrap_or("/"))
        .finish();
    let error = query
        .error
        .map(|code| format!("<p role=\"alert\">{}</p>", escape(&code)))
        .unwrap_or_default();

    page(
        "Login",
        &format!(
            "<h1>Login</h1>{error}<a href=\"/api/auth/signin/google?{}\">Sign in with Google</a>",
            escape(&callback)
        ),
    )
}

async fn register() -> Html<String> {
    page(
        "Register",
        &format!("<h1>Register</h1><p>{PLACEHOLDER}</p>"),
    )
}

async fn projects(CurrentSession(_session): CurrentSession) -> Html<String> {
    page("Projects", &format!("<h1>Projects</h1><p>{PLACEHOLDER}</p>"))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login))
        .route("/register", get(register))
        .route("/projects", get(projects))
}
