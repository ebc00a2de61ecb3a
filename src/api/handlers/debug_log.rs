/*
 * Responsibility
 * - GET/DELETE /api/debug/logs, GET /api/debug/logs/stream (開発環境のみ)
 * - protected path なので gate を通った session 付きリクエストだけが届く
 */
use std::convert::Infallible;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;

use crate::api::extractors::CurrentSession;
use crate::services::debug_log::DebugEntry;
use crate::state::AppState;

pub async fn list_logs(
    State(state): State<AppState>,
    CurrentSession(_session): CurrentSession,
) -> Json<Vec<DebugEntry>> {
    Json(state.debug_log.entries())
}

pub async fn clear_logs(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> StatusCode {
    if !state.debug_log.is_empty() {
        let dropped = state.debug_log.len();
        state.debug_log.clear();
        tracing::info!(subject = ?session.subject_id, dropped, "debug log cleared");
    }
    StatusCode::NO_CONTENT
}

/// Live tail of the debug log as server-sent events (`event: log`, JSON data).
/// Only entries pushed after the subscription are sent; fetch the snapshot first.
pub async fn stream_logs(
    State(state): State<AppState>,
    CurrentSession(_session): CurrentSession,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.debug_log.subscribe();

    let events = stream::unfold(rx, |mut rx| async move {
        let event = match rx.recv().await {
            Ok(entry) => Event::default()
                .event("log")
                .json_data(&entry)
                .unwrap_or_else(|_| Event::default().comment("unserializable entry")),
            // slow reader: tell it how much it missed and keep going
            Err(RecvError::Lagged(skipped)) => {
                Event::default().comment(format!("skipped {skipped} entries"))
            }
            Err(RecvError::Closed) => return None,
        };
        Some((Ok::<_, Infallible>(event), rx))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
