/// Factory: build the session issuer and identity provider from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::services::auth::provider::{GoogleProvider, IdentityProvider};
use crate::services::auth::session_issuer::{AuthPages, AuthSettings, SessionIssuer};

pub fn build_session_issuer(config: &Config) -> Result<Arc<SessionIssuer>, AppError> {
    let settings = AuthSettings {
        client_id: config.google_client_id.clone(),
        client_secret: config.google_client_secret.clone(),
        signing_secret: config.auth_secret.clone(),
        max_age_seconds: config.session_max_age_seconds,
        trust_host: config.trust_host,
        pages: AuthPages::default(),
    };

    let issuer = SessionIssuer::new(&settings).map_err(|e| {
        tracing::error!(error = %e, "refusing to start session issuer");
        AppError::Internal
    })?;

    Ok(Arc::new(issuer))
}

pub fn build_identity_provider(config: &Config) -> Arc<dyn IdentityProvider> {
    Arc::new(GoogleProvider::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
    ))
}
