use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;
use url::Url;

pub const SESSION_COOKIE_NAME: &str = "wander.session-token";
pub const SECURE_SESSION_COOKIE_NAME: &str = "__Secure-wander.session-token";
const STATE_COOKIE_NAME: &str = "wander.oauth-state";
const CALLBACK_COOKIE_NAME: &str = "wander.callback-url";

fn session_cookie_name(secure: bool) -> &'static str {
    if secure {
        SECURE_SESSION_COOKIE_NAME
    } else {
        SESSION_COOKIE_NAME
    }
}

/// Raw session token from the session cookie (either name) or `Authorization: Bearer`.
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    let from_cookie = jar
        .get(SECURE_SESSION_COOKIE_NAME)
        .or_else(|| jar.get(SESSION_COOKIE_NAME))
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

pub fn session_cookie(token: String, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((session_cookie_name(secure), token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(max_age_seconds))
        .build()
}

pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((session_cookie_name(secure), ""))
        .secure(secure)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Short-lived cookies carrying the OAuth state and the post-login destination.
pub fn oauth_cookies(
    state: &str,
    callback_url: &str,
    secure: bool,
) -> (Cookie<'static>, Cookie<'static>) {
    let state = Cookie::build((STATE_COOKIE_NAME, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/api/auth")
        .max_age(Duration::minutes(5))
        .build();

    let callback = Cookie::build((CALLBACK_COOKIE_NAME, callback_url.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/api/auth")
        .max_age(Duration::minutes(5))
        .build();

    (state, callback)
}

pub fn clear_oauth_cookies() -> (Cookie<'static>, Cookie<'static>) {
    let state = Cookie::build((STATE_COOKIE_NAME, ""))
        .path("/api/auth")
        .max_age(Duration::ZERO)
        .build();

    let callback = Cookie::build((CALLBACK_COOKIE_NAME, ""))
        .path("/api/auth")
        .max_age(Duration::ZERO)
        .build();

    (state, callback)
}

pub fn oauth_state(jar: &CookieJar) -> Option<String> {
    jar.get(STATE_COOKIE_NAME).map(|c| c.value().to_string())
}

pub fn oauth_callback_url(jar: &CookieJar) -> Option<String> {
    jar.get(CALLBACK_COOKIE_NAME).map(|c| c.value().to_string())
}

const CALLBACK_BASE: &str = "http://callback.invalid";

/// Only same-origin relative paths survive; everything else collapses to `/`.
///
/// The path is resolved against a throwaway origin, so `/\host` style tricks show up as an
/// origin change, and the result is re-serialised percent-encoded (always a valid
/// `Location` value).
pub fn sanitize_callback_url(raw: Option<&str>) -> String {
    let resolved = raw
        .filter(|url| url.starts_with('/') && !url.starts_with("//"))
        .and_then(|url| {
            let base = Url::parse(CALLBACK_BASE).ok()?;
            let joined = base.join(url).ok()?;
            (joined.origin() == base.origin()).then_some(joined)
        });

    match resolved {
        Some(url) => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        None => "/".to_string(),
    }
}
