use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::SessionToken;

/// Handler で検証済みセッションを受け取るための extractor
/// gate middleware が SessionToken を request.extensions() に insert 済みである前提
/// 見つからない場合は 401 を返す（gate 未設定・public path からの呼び出し）
pub struct CurrentSession(pub SessionToken);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionToken>()
            .cloned()
            .map(CurrentSession)
            .ok_or(AppError::Unauthorized)
    }
}

/// Same as [`CurrentSession`] but never rejects; for pages that render either way.
pub struct MaybeSession(pub Option<SessionToken>);

impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(parts.extensions.get::<SessionToken>().cloned()))
    }
}
