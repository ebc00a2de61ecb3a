/*
 * Responsibility
 * - アプリ共通の AppError 定義 (JSON error body)
 * - auth フローの失敗は AuthFlowError として error page へ redirect
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("not found")]
    NotFound,

    #[error("internal server error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorResponseBody {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        };

        let body = ErrorResponseBody {
            error: ErrorBody {
                code,
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Failures inside the sign-in flow. Rendered as a redirect to the error page
/// (`/login?error=<code>`), never as JSON.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlowError {
    #[error("could not start sign-in")]
    OAuthSignin,
    #[error("sign-in callback failed")]
    OAuthCallback,
    #[error("access denied by provider")]
    AccessDenied,
    #[error("server auth configuration error")]
    Configuration,
}

impl AuthFlowError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::OAuthSignin => "OAuthSignin",
            Self::OAuthCallback => "OAuthCallback",
            Self::AccessDenied => "AccessDenied",
            Self::Configuration => "Configuration",
        }
    }

    pub fn redirect_to(&self, error_page: &str) -> Response {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("error", self.code())
            .finish();
        Redirect::temporary(&format!("{error_page}?{query}")).into_response()
    }
}
