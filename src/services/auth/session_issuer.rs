//! Session issuer: turns a provider login into a signed session token and projects
//! tokens back into the session view handlers consume.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::services::auth::jwt::{SessionCodec, SessionTokenError};
use crate::services::auth::token::{
    ProviderAccount, ProviderUser, SessionToken, SessionUser, SessionView,
};

/// Upper bound for the session lifetime (one year).
pub const MAX_SESSION_AGE_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Custom page routes used by the auth flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPages {
    pub sign_in: String,
    pub error: String,
}

impl Default for AuthPages {
    fn default() -> Self {
        Self {
            sign_in: "/login".to_string(),
            error: "/login".to_string(),
        }
    }
}

/// Everything the issuer needs at startup. Built from `Config`.
#[derive(Clone)]
pub struct AuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub signing_secret: String,
    pub max_age_seconds: u64,
    pub trust_host: bool,
    pub pages: AuthPages,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthSetupError {
    #[error("missing auth setting: {0}")]
    Missing(&'static str),
    #[error("invalid auth setting: {0}")]
    Invalid(&'static str),
}

/// Verifies a raw session token. Any failure means "no identity".
pub trait SessionVerifier: Send + Sync {
    fn verify(&self, raw: &str) -> Option<SessionToken>;
}

#[derive(Debug, Clone)]
pub struct SessionIssuer {
    codec: SessionCodec,
    max_age_seconds: i64,
    trust_host: bool,
    pages: AuthPages,
}

impl SessionIssuer {
    /// Refuses to build with a blank signing secret, blank provider credentials or a
    /// session lifetime outside `1..=MAX_SESSION_AGE_SECONDS`.
    pub fn new(settings: &AuthSettings) -> Result<Self, AuthSetupError> {
        if settings.signing_secret.trim().is_empty() {
            return Err(AuthSetupError::Missing("NEXTAUTH_SECRET"));
        }
        if settings.client_id.trim().is_empty() {
            return Err(AuthSetupError::Missing("GOOGLE_CLIENT_ID"));
        }
        if settings.client_secret.trim().is_empty() {
            return Err(AuthSetupError::Missing("GOOGLE_CLIENT_SECRET"));
        }
        let max_age_seconds = Some(settings.max_age_seconds)
            .filter(|secs| (1..=MAX_SESSION_AGE_SECONDS).contains(secs))
            .and_then(|secs| i64::try_from(secs).ok())
            .ok_or(AuthSetupError::Invalid("SESSION_MAX_AGE_SECONDS"))?;

        Ok(Self {
            codec: SessionCodec::new(&settings.signing_secret),
            max_age_seconds,
            trust_host: settings.trust_host,
            pages: settings.pages.clone(),
        })
    }

    /// Copy identity from the provider on the login exchange; otherwise hand the token back
    /// untouched. Both `user` and `account` must be present for a copy to happen.
    pub fn issue_or_refresh(
        &self,
        mut token: SessionToken,
        user: Option<&ProviderUser>,
        account: Option<&ProviderAccount>,
    ) -> SessionToken {
        if let (Some(user), Some(account)) = (user, account) {
            debug!(
                provider = %account.provider,
                account = %account.provider_account_id,
                "copying provider identity into session token"
            );
            token.subject_id = Some(user.id.clone());
            token.email = user.email.clone();
            token.display_name = user.name.clone();
            token.avatar_ref = user.image.clone();
        }
        token
    }

    pub fn project_session(&self, token: &SessionToken) -> SessionView {
        SessionView {
            user: SessionUser {
                id: token.subject_id.clone().unwrap_or_default(),
                email: token.email.clone(),
                name: token.display_name.clone(),
                image: token.avatar_ref.clone(),
            },
            expires: DateTime::<Utc>::from_timestamp(token.exp, 0).unwrap_or_default(),
        }
    }

    /// Fresh `iat`/`exp`/`jti`; identity fields are left alone.
    pub fn stamp(&self, token: SessionToken) -> SessionToken {
        let now = Utc::now().timestamp();
        SessionToken {
            iat: now,
            exp: now.saturating_add(self.max_age_seconds),
            jti: Some(Uuid::new_v4().to_string()),
            ..token
        }
    }

    pub fn sign(&self, token: &SessionToken) -> Result<String, SessionTokenError> {
        self.codec.sign(token)
    }

    /// Stamp a fresh lifetime onto the token and sign it.
    pub fn seal(&self, token: &SessionToken) -> Result<String, SessionTokenError> {
        self.sign(&self.stamp(token.clone()))
    }

    pub fn open(&self, raw: &str) -> Option<SessionToken> {
        match self.codec.verify(raw) {
            Ok(token) => Some(token),
            Err(err) => {
                debug!(error = %err, "session token rejected");
                None
            }
        }
    }

    pub fn max_age_seconds(&self) -> i64 {
        self.max_age_seconds
    }

    pub fn trust_host(&self) -> bool {
        self.trust_host
    }

    pub fn pages(&self) -> &AuthPages {
        &self.pages
    }
}

impl SessionVerifier for SessionIssuer {
    fn verify(&self, raw: &str) -> Option<SessionToken> {
        self.open(raw)
    }
}
