//! Session gate: runs once in front of every page/API request.
//!
//! Responsibility:
//! - Skip static assets entirely (no token verification)
//! - Verify the session token (cookie or Bearer) and classify the path
//! - Decide Allow / RedirectLogin / RedirectHome from the table below
//!
//! | auth            | path                              | decision      |
//! |-----------------|-----------------------------------|---------------|
//! | unauthenticated | protected                         | RedirectLogin |
//! | unauthenticated | public                            | Allow         |
//! | authenticated   | protected                         | Allow         |
//! | authenticated   | exactly `/login` or `/register`   | RedirectHome  |
//! | authenticated   | public (other)                    | Allow         |
//!
//! Verification is local (signature + expiry against the shared secret). A bad token is
//! simply "unauthenticated", never an error.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{OriginalUri, State},
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use regex::Regex;
use tracing::debug;

use crate::services::auth::cookies::session_token_from_headers;
use crate::services::auth::{SessionToken, SessionVerifier};
use crate::state::AppState;

const PUBLIC_PREFIXES: [&str; 3] = ["/login", "/register", "/api/auth"];
const AUTH_PAGES: [&str; 2] = ["/login", "/register"];
const STATIC_ASSET_PATTERN: &str =
    r"^/(?:_next/static|_next/image|favicon\.ico)|\.(?:svg|png|jpg|jpeg|gif|webp)$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    Public,
    Protected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// Carries the originally requested path for `callbackUrl`.
    RedirectLogin { callback_path: String },
    RedirectHome,
}

/// Result of one pass through the gate. `session` is set only when a token verified.
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub decision: GateDecision,
    pub session: Option<SessionToken>,
}

/// Public-path table and static-asset exclusion, passed in explicitly.
#[derive(Debug, Clone)]
pub struct GatePolicy {
    public_prefixes: Vec<String>,
    auth_pages: Vec<String>,
    static_assets: Regex,
    login_path: String,
    home_path: String,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            public_prefixes: PUBLIC_PREFIXES.iter().map(|s| s.to_string()).collect(),
            auth_pages: AUTH_PAGES.iter().map(|s| s.to_string()).collect(),
            static_assets: Regex::new(STATIC_ASSET_PATTERN)
                .expect("valid static asset pattern"),
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
        }
    }
}

impl GatePolicy {
    pub fn is_static_asset(&self, path: &str) -> bool {
        self.static_assets.is_match(path)
    }

    pub fn classify(&self, path: &str) -> PathClass {
        if self
            .public_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            PathClass::Public
        } else {
            PathClass::Protected
        }
    }

    pub fn decide(&self, path: &str, authenticated: bool) -> GateDecision {
        match (authenticated, self.classify(path)) {
            (false, PathClass::Protected) => GateDecision::RedirectLogin {
                callback_path: path.to_string(),
            },
            (false, PathClass::Public) => GateDecision::Allow,
            (true, PathClass::Protected) => GateDecision::Allow,
            (true, PathClass::Public) if self.auth_pages.iter().any(|p| p == path) => {
                GateDecision::RedirectHome
            }
            (true, PathClass::Public) => GateDecision::Allow,
        }
    }

    /// `/login?callbackUrl=<form-encoded path>`
    pub fn login_location(&self, callback_path: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("callbackUrl", callback_path)
            .finish();
        format!("{}?{}", self.login_path, query)
    }

    pub fn home_path(&self) -> &str {
        &self.home_path
    }
}

pub struct Gatekeeper {
    policy: GatePolicy,
    verifier: Arc<dyn SessionVerifier>,
}

impl std::fmt::Debug for Gatekeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gatekeeper")
            .field("policy", &self.policy)
            .finish()
    }
}

impl Gatekeeper {
    pub fn new(policy: GatePolicy, verifier: Arc<dyn SessionVerifier>) -> Self {
        Self { policy, verifier }
    }

    pub fn evaluate(&self, path: &str, raw_token: Option<&str>) -> GateOutcome {
        if self.policy.is_static_asset(path) {
            return GateOutcome {
                decision: GateDecision::Allow,
                session: None,
            };
        }

        let session = raw_token.and_then(|raw| self.verifier.verify(raw));
        let decision = self.policy.decide(path, session.is_some());

        GateOutcome { decision, session }
    }

    pub fn respond(&self, decision: &GateDecision) -> Option<Response> {
        match decision {
            GateDecision::Allow => None,
            GateDecision::RedirectLogin { callback_path } => Some(
                Redirect::temporary(&self.policy.login_location(callback_path)).into_response(),
            ),
            GateDecision::RedirectHome => {
                Some(Redirect::temporary(self.policy.home_path()).into_response())
            }
        }
    }
}

/// Register the gate on the given router.
///
/// ```ignore
/// let app = pages::routes().merge(api::routes(&config));
/// let app = middleware::gatekeeper::apply(app, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, gate_middleware))
}

async fn gate_middleware(
    State(state): State<AppState>,
    OriginalUri(original_uri): OriginalUri,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // nest() 配下でも full path で判定する
    let path = original_uri.path().to_string();
    let raw_token = session_token_from_headers(req.headers());

    let outcome = state.gate.evaluate(&path, raw_token.as_deref());
    debug!(path = %path, decision = ?outcome.decision, "gate decision");

    if let Some(redirect) = state.gate.respond(&outcome.decision) {
        return redirect;
    }

    // gate → extractor への受け渡し
    if let Some(session) = outcome.session {
        req.extensions_mut().insert(session);
    }

    next.run(req).await
}
