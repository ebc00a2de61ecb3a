/*
 * Responsibility
 * - /api/auth/{signin,callback,session,signout}
 * - provider とのコード交換 → SessionIssuer で token 化 → session cookie
 * - 失敗はすべて error page (/login?error=...) への redirect
 */
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::dto::auth::{CallbackQuery, SignInQuery};
use crate::error::AuthFlowError;
use crate::services::auth::cookies::{
    self, clear_oauth_cookies, clear_session_cookie, oauth_callback_url, oauth_cookies,
    oauth_state, sanitize_callback_url, session_cookie,
};
use crate::services::auth::SessionToken;
use crate::state::AppState;

fn fail(state: &AppState, err: AuthFlowError) -> Response {
    debug!(code = err.code(), "auth flow failed");
    err.redirect_to(&state.sessions.pages().error)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').next().unwrap_or(v).trim())
        .filter(|v| !v.is_empty())
}

/// Public origin used to build the provider redirect URI.
///
/// With host trust enabled the forwarded/host headers win (reverse proxy deployments);
/// otherwise only the configured public URL is used.
fn public_origin(state: &AppState, headers: &HeaderMap) -> Option<String> {
    if state.sessions.trust_host() {
        let host = header_str(headers, "x-forwarded-host")
            .or_else(|| header_str(headers, header::HOST.as_str()));
        if let Some(host) = host {
            let proto = header_str(headers, "x-forwarded-proto").unwrap_or(
                if state.secure_cookies { "https" } else { "http" },
            );
            return Some(format!("{proto}://{host}"));
        }
    }
    state.public_url.clone()
}

fn redirect_uri(state: &AppState, headers: &HeaderMap) -> Option<String> {
    public_origin(state, headers)
        .map(|origin| format!("{origin}/api/auth/callback/{}", state.provider.id()))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<SignInQuery>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    if provider != state.provider.id() {
        return fail(&state, AuthFlowError::OAuthSignin);
    }
    let Some(redirect_uri) = redirect_uri(&state, &headers) else {
        warn!("cannot determine public origin for sign-in");
        return fail(&state, AuthFlowError::Configuration);
    };

    let csrf_state = Uuid::new_v4().simple().to_string();
    let authorize_url = match state.provider.authorize_url(&redirect_uri, &csrf_state) {
        Ok(url) => url,
        Err(err) => {
            warn!(error = %err, "failed to build authorize url");
            return fail(&state, AuthFlowError::OAuthSignin);
        }
    };

    let callback_url = sanitize_callback_url(query.callback_url.as_deref());
    let (state_cookie, callback_cookie) =
        oauth_cookies(&csrf_state, &callback_url, state.secure_cookies);

    (
        jar.add(state_cookie).add(callback_cookie),
        Redirect::temporary(&authorize_url),
    )
        .into_response()
}

pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    if provider != state.provider.id() {
        return fail(&state, AuthFlowError::OAuthCallback);
    }
    if let Some(error) = query.error.as_deref() {
        info!(provider = %provider, error, "provider refused sign-in");
        return fail(&state, AuthFlowError::AccessDenied);
    }

    let code = match (query.code, query.state, oauth_state(&jar)) {
        (Some(code), Some(got), Some(expected)) if !expected.is_empty() && got == expected => {
            code
        }
        _ => {
            warn!("oauth state missing or mismatched");
            return fail(&state, AuthFlowError::OAuthCallback);
        }
    };

    let Some(redirect_uri) = redirect_uri(&state, &headers) else {
        return fail(&state, AuthFlowError::Configuration);
    };

    let (user, account) = match state.provider.exchange(&code, &redirect_uri).await {
        Ok(pair) => pair,
        Err(err) => {
            warn!(provider = %provider, error = %err, "oauth code exchange failed");
            return fail(&state, AuthFlowError::OAuthCallback);
        }
    };

    let token = state
        .sessions
        .issue_or_refresh(SessionToken::default(), Some(&user), Some(&account));
    let raw = match state.sessions.seal(&token) {
        Ok(raw) => raw,
        Err(_) => return fail(&state, AuthFlowError::Configuration),
    };

    info!(provider = %provider, subject = %user.id, "signed in");

    let callback_url = sanitize_callback_url(oauth_callback_url(&jar).as_deref());
    let (clear_state, clear_callback) = clear_oauth_cookies();
    let jar = jar
        .add(session_cookie(
            raw,
            state.sessions.max_age_seconds(),
            state.secure_cookies,
        ))
        .add(clear_state)
        .add(clear_callback);

    (jar, Redirect::temporary(&callback_url)).into_response()
}

/// Current session as JSON (`{}` when signed out). Each read rolls the expiry forward;
/// identity fields come from the token only.
pub async fn session(State(state): State<AppState>, headers: HeaderMap, jar: CookieJar) -> Response {
    let Some(token) =
        cookies::session_token_from_headers(&headers).and_then(|raw| state.sessions.open(&raw))
    else {
        return Json(json!({})).into_response();
    };

    let token = state
        .sessions
        .stamp(state.sessions.issue_or_refresh(token, None, None));
    let raw = match state.sessions.sign(&token) {
        Ok(raw) => raw,
        Err(_) => return Json(json!({})).into_response(),
    };

    let view = state.sessions.project_session(&token);
    let jar = jar.add(session_cookie(
        raw,
        state.sessions.max_age_seconds(),
        state.secure_cookies,
    ));

    (jar, Json(view)).into_response()
}

pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> Response {
    let jar = jar
        .add(clear_session_cookie(true))
        .add(clear_session_cookie(false));

    (jar, Redirect::to(&state.sessions.pages().sign_in)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use crate::api;
    use crate::config::Config;
    use crate::config::tests::{base_pairs, lookup_from, test_config};
    use crate::middleware::gatekeeper;
    use crate::services::auth::provider::{IdentityProvider, ProviderError};
    use crate::services::auth::build_session_issuer;
    use crate::services::auth::session_issuer::tests::{issuer, provider_account, provider_user};
    use crate::services::auth::SessionIssuer;
    use crate::services::auth::token::{ProviderAccount, ProviderUser};
    use crate::services::debug_log::DebugLog;
    use crate::state::AppState;

    struct StubProvider {
        fail: bool,
    }

    #[async_trait]
    impl IdentityProvider for StubProvider {
        fn id(&self) -> &'static str {
            "google"
        }

        fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String, ProviderError> {
            Ok(format!("https://idp.example/auth?redirect_uri={redirect_uri}&state={state}"))
        }

        async fn exchange(
            &self,
            code: &str,
            _redirect_uri: &str,
        ) -> Result<(ProviderUser, ProviderAccount), ProviderError> {
            if self.fail || code != "good-code" {
                return Err(ProviderError::Status {
                    operation: "token exchange",
                    status: 400,
                    detail: "invalid_grant".to_string(),
                });
            }
            Ok((provider_user(), provider_account()))
        }
    }

    fn app_for(config: &Config, issuer: Arc<SessionIssuer>, fail: bool) -> axum::Router {
        let state = AppState::new(
            config,
            issuer,
            Arc::new(StubProvider { fail }),
            DebugLog::new(8),
        );
        let router = axum::Router::new().nest("/api", api::routes(config));
        gatekeeper::apply(router, state.clone()).with_state(state)
    }

    fn app(fail: bool) -> axum::Router {
        app_for(&test_config(), Arc::new(issuer()), fail)
    }

    /// `name=value` pairs of every Set-Cookie, joined the way a browser sends them back.
    fn cookie_header(res: &axum::response::Response) -> String {
        set_cookies(res)
            .iter()
            .filter_map(|c| c.split(';').next())
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn cookie_value(res: &axum::response::Response, name: &str) -> Option<String> {
        set_cookies(res).iter().find_map(|c| {
            c.split(';')
                .next()
                .and_then(|pair| pair.strip_prefix(name))
                .and_then(|rest| rest.strip_prefix('='))
                .map(str::to_string)
        })
    }

    fn set_cookies(res: &axum::response::Response) -> Vec<String> {
        res.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn location(res: &axum::response::Response) -> &str {
        res.headers().get(header::LOCATION).unwrap().to_str().unwrap()
    }

    #[tokio::test]
    async fn sign_in_sets_state_and_redirects_to_provider() {
        let res = app(false)
            .oneshot(
                Request::builder()
                    .uri("/api/auth/signin/google?callbackUrl=%2Fprojects")
                    .header(header::HOST, "wander.example")
                    .header("x-forwarded-proto", "https")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert!(location(&res).starts_with(
            "https://idp.example/auth?redirect_uri=https://wander.example/api/auth/callback/google"
        ));
        let cookies = set_cookies(&res);
        assert!(cookies.iter().any(|c| c.starts_with("wander.oauth-state=")));
        // the jar percent-encodes cookie values
        assert!(cookies
            .iter()
            .any(|c| c.starts_with("wander.callback-url=%2Fprojects;")));
    }

    #[tokio::test]
    async fn sign_in_cookies_carry_through_to_callback() {
        let app = app(false);
        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/auth/signin/google?callbackUrl=%2Fprojects%3Ftags%3Da%2Cb")
                    .header(header::HOST, "wander.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let csrf_state = cookie_value(&res, "wander.oauth-state").expect("state cookie");
        let cookies = cookie_header(&res);

        let res = app
            .oneshot(
                Request::builder()
                    .uri(format!(
                        "/api/auth/callback/google?code=good-code&state={csrf_state}"
                    ))
                    .header(header::HOST, "wander.example")
                    .header(header::COOKIE, cookies)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&res), "/projects?tags=a,b");
        assert!(cookie_value(&res, "wander.session-token").is_some());
    }

    #[tokio::test]
    async fn forwarded_headers_win_over_host() {
        let res = app(false)
            .oneshot(
                Request::builder()
                    .uri("/api/auth/signin/google")
                    .header(header::HOST, "10.0.0.7:3000")
                    .header("x-forwarded-host", "wander.example")
                    .header("x-forwarded-proto", "https")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(location(&res).starts_with(
            "https://idp.example/auth?redirect_uri=https://wander.example/api/auth/callback/google&"
        ));
    }

    #[tokio::test]
    async fn untrusted_host_uses_public_url() {
        let mut pairs = base_pairs();
        pairs.extend([
            ("AUTH_TRUST_HOST", "false"),
            ("NEXTAUTH_URL", "https://wander.example"),
        ]);
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        let app = app_for(&config, build_session_issuer(&config).unwrap(), false);

        let res = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/signin/google")
                    .header(header::HOST, "attacker.example")
                    .header("x-forwarded-host", "attacker.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert!(location(&res).starts_with(
            "https://idp.example/auth?redirect_uri=https://wander.example/api/auth/callback/google&"
        ));
        assert!(!location(&res).contains("attacker"));
    }

    #[tokio::test]
    async fn unknown_provider_goes_to_error_page() {
        let res = app(false)
            .oneshot(
                Request::builder()
                    .uri("/api/auth/signin/github")
                    .header(header::HOST, "wander.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(location(&res), "/login?error=OAuthSignin");
    }

    #[tokio::test]
    async fn callback_issues_session_cookie_and_returns_to_callback_url() {
        let res = app(false)
            .oneshot(
                Request::builder()
                    .uri("/api/auth/callback/google?code=good-code&state=abc")
                    .header(header::HOST, "wander.example")
                    .header(
                        header::COOKIE,
                        "wander.oauth-state=abc; wander.callback-url=/projects",
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&res), "/projects");

        let cookies = set_cookies(&res);
        let session = cookies
            .iter()
            .find(|c| c.starts_with("wander.session-token="))
            .expect("session cookie");
        assert!(session.contains("HttpOnly"));
        assert!(session.contains("Max-Age=3600"));
        let raw = session
            .trim_start_matches("wander.session-token=")
            .split(';')
            .next()
            .unwrap();
        let token = issuer().open(raw).expect("valid session token");
        assert_eq!(token.subject_id.as_deref(), Some("u1"));
        assert_eq!(token.email.as_deref(), Some("a@b.com"));
    }

    #[tokio::test]
    async fn callback_rejects_mismatched_state_and_failed_exchange() {
        let res = app(false)
            .oneshot(
                Request::builder()
                    .uri("/api/auth/callback/google?code=good-code&state=abc")
                    .header(header::HOST, "wander.example")
                    .header(header::COOKIE, "wander.oauth-state=other")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(location(&res), "/login?error=OAuthCallback");

        let res = app(true)
            .oneshot(
                Request::builder()
                    .uri("/api/auth/callback/google?code=good-code&state=abc")
                    .header(header::HOST, "wander.example")
                    .header(header::COOKIE, "wander.oauth-state=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(location(&res), "/login?error=OAuthCallback");

        let res = app(false)
            .oneshot(
                Request::builder()
                    .uri("/api/auth/callback/google?error=access_denied")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(location(&res), "/login?error=AccessDenied");
    }

    #[tokio::test]
    async fn session_endpoint_projects_and_rolls_token() {
        let issuer = issuer();
        let token = issuer.issue_or_refresh(
            crate::services::auth::SessionToken::default(),
            Some(&provider_user()),
            Some(&provider_account()),
        );
        let raw = issuer.seal(&token).unwrap();

        let res = app(false)
            .oneshot(
                Request::builder()
                    .uri("/api/auth/session")
                    .header(header::COOKIE, format!("wander.session-token={raw}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert!(set_cookies(&res)
            .iter()
            .any(|c| c.starts_with("wander.session-token=")));
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["user"]["id"], "u1");
        assert_eq!(json["user"]["name"], "A");
        assert_eq!(json["user"]["image"], "http://x/y.png");
        assert!(json["expires"].is_string());
    }

    #[tokio::test]
    async fn session_endpoint_is_empty_when_signed_out() {
        let res = app(false)
            .oneshot(
                Request::builder()
                    .uri("/api/auth/session")
                    .header(header::COOKIE, "wander.session-token=garbage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"{}");
    }

    #[tokio::test]
    async fn sign_out_clears_cookie() {
        let res = app(false)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/signout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(location(&res), "/login");
        assert!(set_cookies(&res)
            .iter()
            .any(|c| c.starts_with("wander.session-token=;") && c.contains("Max-Age=0")));
    }
}
