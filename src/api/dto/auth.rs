use serde::Deserialize;

/// Query for `GET /api/auth/signin/{provider}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignInQuery {
    /// Where to land after a successful login. Relative paths only.
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

/// Query the provider appends when redirecting back to
/// `GET /api/auth/callback/{provider}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set when the user declined consent (e.g. `access_denied`).
    pub error: Option<String>,
}
