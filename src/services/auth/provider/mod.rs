/*
 * Responsibility
 * - identity provider (OAuth) の抽象 (IdentityProvider)
 * - ログイン交換の結果は ProviderUser + ProviderAccount としてだけ issuer に渡る
 */
use async_trait::async_trait;
use thiserror::Error;

use crate::services::auth::token::{ProviderAccount, ProviderUser};

pub mod google;

pub use google::GoogleProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{operation} failed with status {status}: {detail}")]
    Status {
        operation: &'static str,
        status: u16,
        detail: String,
    },
    #[error("invalid provider url: {0}")]
    Url(#[from] url::ParseError),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Path segment under `/api/auth/{signin,callback}/`.
    fn id(&self) -> &'static str;

    fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String, ProviderError>;

    /// Exchange an authorization code for the provider's user profile and account.
    async fn exchange(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<(ProviderUser, ProviderAccount), ProviderError>;
}
