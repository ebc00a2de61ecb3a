/*
 * Responsibility
 * - Config読み込み → 依存生成 (SessionIssuer / provider / DebugLog) → Router 組み立て
 * - gate は pages + /api にだけ掛ける。/_health は gate の外
 * - axum::serve() で起動
 */
use std::{panic, process};

use anyhow::Result;
use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::handlers::health::health;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware::{self, http::HttpLimits};
use crate::pages;
use crate::services::auth::{build_identity_provider, build_session_issuer};
use crate::services::debug_log::{DebugLog, DebugLogLayer};
use crate::state::AppState;

fn init_tracing(debug_log: DebugLog) {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,wander_wallet=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(DebugLogLayer::new(debug_log))
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Surface panics via tracing; stderr may be hidden depending on how we are launched.
        tracing::error!(?info, "panic");

        // Development: crash the whole process so it gets noticed.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    let config = Config::from_env()?;

    let debug_log = DebugLog::new(config.debug_log_capacity);
    init_tracing(debug_log.clone());
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        debug_log_capacity = debug_log.capacity(),
        "starting Wander Wallet in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config, debug_log)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_state(config: &Config, debug_log: DebugLog) -> Result<AppState, AppError> {
    // Fails when secrets/credentials are blank; the process must not start without them.
    let sessions = build_session_issuer(config)?;
    let provider = build_identity_provider(config);

    Ok(AppState::new(config, sessions, provider, debug_log))
}

async fn not_found() -> AppError {
    AppError::NotFound
}

fn build_router(state: AppState, config: &Config) -> Router {
    let gated = Router::new()
        .merge(pages::routes())
        .nest("/api", api::routes(config))
        .fallback(not_found);
    let gated = middleware::gatekeeper::apply(gated, state.clone());

    let router = Router::new()
        .route("/_health", get(health))
        .merge(gated)
        .with_state(state);

    let router = middleware::http::security_headers(router);
    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, HttpLimits::default())
}
