use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use common::env::ensure_data_dir;
use configs::AppConfig;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes::{self, auth};
use service::requests::{RequestService, RequestStore};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    let raw = format!("{}:{}", cfg.server.host, cfg.server.port);
    raw.parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bind address {raw}: {e}")))
}

/// Assemble shared state around the request store at `data_path`.
pub async fn build_state(data_path: &str, jwt_secret: String) -> anyhow::Result<(auth::ServerState, Arc<RequestStore>)> {
    ensure_data_dir(data_path).await?;
    let store = RequestStore::open(data_path).await;
    let requests = Arc::new(RequestService::new(Arc::clone(&store)));
    let state = auth::ServerState {
        auth: auth::ServerAuthConfig { jwt_secret },
        requests,
    };
    Ok((state, store))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl+C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("received Ctrl+C, shutting down");
}

/// Public entry: build the app from an already loaded config and run the HTTP
/// server until Ctrl+C, then wait for the last write-back before returning.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    if cfg.auth.is_unset() {
        warn!("no JWT secret configured; using the development default");
    }
    let (state, store) = build_state(&cfg.storage.data_path, cfg.auth.secret_or_dev_default()).await?;

    let app: Router = routes::build_router(state, build_cors());

    let addr = bind_addr(&cfg)?;
    info!(%addr, data_path = %cfg.storage.data_path, "starting request server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| StartupError::Runtime(format!("bind {addr}: {e}")))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.flush().await;
    info!("pending write-backs flushed");
    Ok(())
}
