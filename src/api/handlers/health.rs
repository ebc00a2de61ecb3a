/*
 * Responsibility
 * - GET /_health (疎通用)
 * - gate の外にマウントされるので session なしで応答する
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
