use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use werewolf_server::models::config::ServerConfig;
use werewolf_server::{create_app, spawn_deadline_scheduler, AppState};

// ログ設定
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,axum=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 環境変数をロード
    if let Err(e) = dotenv() {
        eprintln!("Warning: .env not loaded: {}", e);
    }

    init_tracing();

    let config = ServerConfig::from_env();
    let state = AppState::with_config(config.clone());

    let scheduler = spawn_deadline_scheduler(Arc::clone(&state.sessions), config.scheduler_tick());

    let cors = match config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(origin),
        Err(e) => {
            warn!("Ignoring invalid CORS origin {}: {}", config.cors_origin, e);
            CorsLayer::new()
        }
    }
    .allow_methods([Method::GET, Method::POST])
    .allow_headers([http::header::CONTENT_TYPE]);

    let app = create_app(state).layer(cors).layer(
        TraceLayer::new_for_http().make_span_with(|request: &http::Request<_>| {
            tracing::info_span!(
                "HTTP request",
                method = %request.method(),
                uri = %request.uri(),
            )
        }),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(
        "Werewolf coordinator listening on http://{} (phase duration {}s)",
        listener.local_addr()?,
        config.phase_duration_seconds
    );
    axum::serve(listener, app).await?;

    scheduler.abort();
    Ok(())
}
