/*
 * Responsibility
 * - /api 配下の URL 構造を定義
 * - /auth 配下は public prefix (gate は素通し)、/debug 配下は開発環境のみ
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{
    auth::{callback, session, sign_in, sign_out},
    debug_log::{clear_logs, list_logs, stream_logs},
};
use crate::config::Config;
use crate::state::AppState;

pub fn routes(config: &Config) -> Router<AppState> {
    let router = Router::new()
        .route("/auth/signin/{provider}", get(sign_in))
        .route("/auth/callback/{provider}", get(callback))
        .route("/auth/session", get(session))
        .route("/auth/signout", post(sign_out));

    if config.app_env.is_production() {
        router
    } else {
        router
            .route("/debug/logs", get(list_logs).delete(clear_logs))
            .route("/debug/logs/stream", get(stream_logs))
    }
}
