// =============================================================================
// TradeSense — Main Entry Point
// =============================================================================
//
// Real-time market sentiment dashboard backend: consumes the upstream
// market-strength snapshot feed, serves ranked snapshots and annotated
// history to browser clients over an authenticated HTTP/WebSocket API.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod feed;
mod indicators;
mod provider;
mod ranker;
mod runtime_config;
mod types;
mod watchlist;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::provider::ProviderClient;
use crate::runtime_config::RuntimeConfig;
use crate::watchlist::Watchlist;

/// Default path of the runtime config file.
const CONFIG_PATH: &str = "tradesense.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        TradeSense Dashboard Backend — Starting Up        ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // Env overrides for containerised deployments.
    if let Ok(addr) = std::env::var("TRADESENSE_BIND_ADDR") {
        config.bind_addr = addr;
    }
    if let Ok(url) = std::env::var("TRADESENSE_FEED_WS_URL") {
        config.feed_ws_url = url;
    }
    if let Ok(base) = std::env::var("TRADESENSE_PROVIDER_BASE") {
        config.provider_http_base = base;
    }

    info!(
        bind_addr = %config.bind_addr,
        feed = %config.feed_ws_url,
        provider = %config.provider_http_base,
        "configuration resolved"
    );

    // ── 2. Build shared state ────────────────────────────────────────────
    let provider = Arc::new(ProviderClient::new(
        &config.provider_http_base,
        config.provider_timeout_secs,
    )?);
    let watchlist = Arc::new(Watchlist::load(&config.watchlist_path));
    let state = Arc::new(AppState::new(config, provider, watchlist));

    // ── 3. Spawn the snapshot feed supervisor ────────────────────────────
    let feed_state = state.clone();
    tokio::spawn(async move {
        loop {
            let (url, delay) = {
                let cfg = feed_state.runtime_config.read();
                (cfg.feed_ws_url.clone(), cfg.feed_reconnect_secs)
            };
            if let Err(e) = feed::run_snapshot_stream(&url, &feed_state).await {
                error!(error = %e, "snapshot feed error — reconnecting");
                feed_state.push_error(format!("feed disconnected: {e}"));
            }
            tokio::time::sleep(tokio::time::Duration::from_secs(delay)).await;
        }
    });

    // ── 4. Start the API server ──────────────────────────────────────────
    let bind_addr = state.runtime_config.read().bind_addr.clone();
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    // ── 5. Serve until shutdown ──────────────────────────────────────────
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            warn!("Shutdown signal received — stopping gracefully");
        })
        .await;
    if let Err(e) = result {
        error!(error = %e, "API server failed");
    }

    if let Err(e) = state.watchlist.save() {
        error!(error = %e, "Failed to save watchlist on shutdown");
    }

    info!("TradeSense shut down complete.");
    Ok(())
}
