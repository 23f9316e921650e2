// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Public endpoints (health, login)
// require no authentication. All other endpoints require a valid session
// token checked via the `AuthBearer` extractor.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::auth::{issue_session_token, AuthBearer};
use crate::app_state::AppState;
use crate::indicators::{annotate, IndicatorOptions};
use crate::provider::LoginRequest;
use crate::types::{preset_by_label, AnnotatedBar, IntervalTag};
use crate::watchlist::WatchlistEntry;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        .route("/api/v1/login", post(login))
        // ── Authenticated ───────────────────────────────────────────
        .route("/api/v1/search", get(search))
        .route("/api/v1/history/:symbol", get(history))
        .route(
            "/api/v1/watchlist",
            get(watchlist_list)
                .post(watchlist_add)
                .delete(watchlist_remove),
        )
        .route("/api/v1/errors", get(recent_errors))
        // ── WebSocket (handled in the ws module but mounted here) ────
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        // ── Middleware & State ──────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
    feed_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_feed_message_age_ms: Option<u64>,
    uptime_secs: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
        feed_connected: *state.feed_connected.read(),
        last_feed_message_age_ms: state.feed_message_age_ms(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    };
    Json(resp)
}

// =============================================================================
// Login (public)
// =============================================================================

#[derive(Serialize)]
struct LoginResponse {
    session_token: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if let Err(e) = state.provider.login(&request).await {
        warn!(client_id = %request.client_id, error = %e, "broker login failed");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "Login failed. Check credentials." })),
        ));
    }

    let Some(session_token) = issue_session_token() else {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "Server session secret not configured" })),
        ));
    };

    info!(client_id = %request.client_id, "broker login succeeded — session issued");
    Ok(Json(LoginResponse { session_token }))
}

// =============================================================================
// Symbol search (authenticated)
// =============================================================================

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    query: String,
}

async fn search(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    match state.provider.search_symbols(&params.query).await {
        Ok(matches) => Ok(Json(matches)),
        Err(e) => {
            warn!(query = %params.query, error = %e, "symbol search failed");
            Err((
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": "Symbol search unavailable" })),
            ))
        }
    }
}

// =============================================================================
// History + indicators (authenticated)
// =============================================================================

#[derive(Deserialize)]
struct HistoryQuery {
    /// Timeframe preset label (`1D`, `5D`, `1M`, `6M`, `1Y`, `ALL`).
    /// Takes precedence over `interval`/`days` when present.
    preset: Option<String>,
    interval: Option<String>,
    days: Option<u32>,
    #[serde(default)]
    sma: bool,
    #[serde(default)]
    rsi: bool,
}

#[derive(Serialize)]
struct HistoryResponse {
    symbol: String,
    interval: IntervalTag,
    days: u32,
    bars: Vec<AnnotatedBar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn history(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, (StatusCode, Json<serde_json::Value>)> {
    // Resolve the requested timeframe: preset label, explicit pair, or the
    // chart's default view (1 month of daily bars).
    let (interval, days) = match &params.preset {
        Some(label) => match preset_by_label(label) {
            Some(preset) => (preset.interval, preset.lookback_days),
            None => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": format!("Unknown timeframe preset: '{label}'") })),
                ));
            }
        },
        None => {
            let interval = match params.interval.as_deref() {
                Some(raw) => IntervalTag::parse(raw).ok_or_else(|| {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(serde_json::json!({ "error": format!("Unknown interval: '{raw}'") })),
                    )
                })?,
                None => IntervalTag::OneDay,
            };
            (interval, params.days.unwrap_or(30))
        }
    };

    if days == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "days must be a positive integer" })),
        ));
    }

    let options = IndicatorOptions { sma: params.sma, rsi: params.rsi };

    // A provider failure degrades to an empty series with a failure
    // indicator — the indicator engine itself never sees the fault.
    match state.provider.fetch_history(&symbol, interval, days).await {
        Ok(bars) => Ok(Json(HistoryResponse {
            symbol,
            interval,
            days,
            bars: annotate(&bars, options),
            error: None,
        })),
        Err(e) => {
            warn!(symbol = %symbol, interval = %interval, days, error = %e, "history fetch failed");
            state.push_error(format!("history fetch for {symbol} failed: {e}"));
            Ok(Json(HistoryResponse {
                symbol,
                interval,
                days,
                bars: Vec::new(),
                error: Some("No historical data available for this period".to_string()),
            }))
        }
    }
}

// =============================================================================
// Recent errors (authenticated)
// =============================================================================

async fn recent_errors(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(state.recent_errors.read().clone())
}

// =============================================================================
// Watchlist (authenticated)
// =============================================================================

#[derive(Deserialize)]
struct WatchlistAddRequest {
    symbol: String,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Deserialize)]
struct WatchlistRemoveRequest {
    symbol: String,
}

#[derive(Serialize)]
struct WatchlistResponse {
    changed: bool,
    entries: Vec<WatchlistEntry>,
}

async fn watchlist_list(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(state.watchlist.entries())
}

async fn watchlist_add(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Json(request): Json<WatchlistAddRequest>,
) -> impl IntoResponse {
    let added = state.watchlist.add(WatchlistEntry {
        symbol: request.symbol.clone(),
        token: request.token,
    });

    if added {
        info!(symbol = %request.symbol, "watchlist add");
        if let Err(e) = state.watchlist.save() {
            warn!(error = %e, "failed to persist watchlist");
        }
        state.increment_version();
    }

    Json(WatchlistResponse {
        changed: added,
        entries: state.watchlist.entries(),
    })
}

async fn watchlist_remove(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Json(request): Json<WatchlistRemoveRequest>,
) -> impl IntoResponse {
    let removed = state.watchlist.remove(&request.symbol);

    if removed {
        info!(symbol = %request.symbol, "watchlist remove");
        if let Err(e) = state.watchlist.save() {
            warn!(error = %e, "failed to persist watchlist");
        }
        state.increment_version();
    }

    Json(WatchlistResponse {
        changed: removed,
        entries: state.watchlist.entries(),
    })
}
