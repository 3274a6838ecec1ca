use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use palaver_api::auth::{AppState, AppStateInner};
use palaver_relay::CompletionClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "palaver=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("PALAVER_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    if jwt_secret == "dev-secret-change-me" {
        warn!("PALAVER_JWT_SECRET is unset; using the dev placeholder");
    }
    let db_path = std::env::var("PALAVER_DB_PATH").unwrap_or_else(|_| "palaver.db".into());
    let host = std::env::var("PALAVER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PALAVER_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    let completion_url = std::env::var("PALAVER_COMPLETION_URL")
        .unwrap_or_else(|_| "https://api.cerebras.ai/v1".into());
    let completion_key = std::env::var("PALAVER_COMPLETION_KEY").unwrap_or_default();
    if completion_key.is_empty() {
        warn!("PALAVER_COMPLETION_KEY is unset; completion requests will be rejected upstream");
    }
    let completion_model =
        std::env::var("PALAVER_COMPLETION_MODEL").unwrap_or_else(|_| "llama3.1-8b".into());

    // Init database
    let db = palaver_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        completion: CompletionClient::new(completion_url, completion_key, completion_model)?,
    });

    let app = palaver_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Palaver server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
