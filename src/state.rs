/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - ex: sessions: SessionIssuer, gate: Gatekeeper, provider, debug_log
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::config::Config;
use crate::middleware::gatekeeper::{GatePolicy, Gatekeeper};
use crate::services::auth::SessionIssuer;
use crate::services::auth::provider::IdentityProvider;
use crate::services::debug_log::DebugLog;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionIssuer>,
    pub gate: Arc<Gatekeeper>,
    pub provider: Arc<dyn IdentityProvider>,
    pub debug_log: DebugLog,
    pub public_url: Option<String>,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(
        config: &Config,
        sessions: Arc<SessionIssuer>,
        provider: Arc<dyn IdentityProvider>,
        debug_log: DebugLog,
    ) -> Self {
        let gate = Arc::new(Gatekeeper::new(GatePolicy::default(), sessions.clone()));
        Self {
            sessions,
            gate,
            provider,
            debug_log,
            public_url: config.public_url.clone(),
            secure_cookies: config.secure_cookies(),
        }
    }

    #[cfg(test)]
    pub fn for_tests(config: &Config, sessions: Arc<SessionIssuer>) -> Self {
        use crate::services::auth::provider::GoogleProvider;

        let provider = Arc::new(GoogleProvider::new(
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
        ));
        Self::new(config, sessions, provider, DebugLog::new(config.debug_log_capacity))
    }
}
