/*
 * Responsibility
 * - 環境変数や設定の読み込み (GOOGLE_*, NEXTAUTH_SECRET, CORS 許可など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::AppError;
use crate::services::auth::session_issuer::MAX_SESSION_AGE_SECONDS;
use crate::services::debug_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        tracing::error!(error = %e, "configuration rejected");
        AppError::Internal
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub google_client_id: String,
    pub google_client_secret: String,
    pub auth_secret: String,
    // Canonical public origin; only needed when host headers are not trusted
    pub public_url: Option<String>,
    pub trust_host: bool,
    pub session_max_age_seconds: u64,

    pub debug_log_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let port: u16 = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let google_client_id = required("GOOGLE_CLIENT_ID")?;
        let google_client_secret = required("GOOGLE_CLIENT_SECRET")?;
        let auth_secret = required("NEXTAUTH_SECRET")?;

        let public_url = lookup("NEXTAUTH_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());

        let trust_host = !matches!(
            lookup("AUTH_TRUST_HOST")
                .map(|v| v.trim().to_ascii_lowercase())
                .as_deref(),
            Some("false" | "0" | "no")
        );
        if !trust_host && public_url.is_none() {
            return Err(ConfigError::Invalid("NEXTAUTH_URL"));
        }

        let session_max_age_seconds: u64 = match lookup("SESSION_MAX_AGE_SECONDS") {
            Some(raw) => raw
                .trim()
                .parse()
                .ok()
                .filter(|secs| (1..=MAX_SESSION_AGE_SECONDS).contains(secs))
                .ok_or(ConfigError::Invalid("SESSION_MAX_AGE_SECONDS"))?,
            None => 2_592_000, // 30 days
        };

        let debug_log_capacity = lookup("DEBUG_LOG_CAPACITY")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(debug_log::DEFAULT_CAPACITY);

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            google_client_id,
            google_client_secret,
            auth_secret,
            public_url,
            trust_host,
            session_max_age_seconds,
            debug_log_capacity,
        })
    }

    /// Session cookies get `Secure` and the `__Secure-` prefix in production.
    pub fn secure_cookies(&self) -> bool {
        self.app_env.is_production()
    }
}
