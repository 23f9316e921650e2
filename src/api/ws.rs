// =============================================================================
// WebSocket Handler — Push-based ranked snapshot updates
// =============================================================================
//
// Clients connect to `/api/v1/ws?token=<token>` and receive:
//   1. An immediate ranked frame on connect (empty `snapshots` until the
//      first feed message arrives — the dashboard shows its "connecting"
//      placeholder).
//   2. A fresh ranked frame whenever the snapshot set version has changed
//      since the last push, checked on a fixed interval.
//   3. A fresh ranked frame immediately after the client changes its filter.
//
// Incoming text frames update the connection's filter query: either a JSON
// object `{"query": "rel"}` or a raw string. The query is uppercased here —
// the ranker expects it already normalized.
//
// The handler also responds to Ping frames with Pong frames, tracks a
// per-connection sequence number, and cleans up on disconnect.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::api::auth::validate_token;
use crate::app_state::AppState;
use crate::ranker::rank;
use crate::types::MarketSnapshot;

// =============================================================================
// Query parameters
// =============================================================================

#[derive(Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

// =============================================================================
// Outbound frame
// =============================================================================

/// One push to a dashboard client: the latest snapshot set ranked under the
/// connection's filter query.
#[derive(Debug, Serialize)]
struct RankedFrame {
    state_version: u64,
    sequence: u64,
    server_time: i64,
    feed_connected: bool,
    query: String,
    snapshots: Vec<MarketSnapshot>,
}

/// Rank the latest snapshot set for one connection. An absent set (no feed
/// frame yet) ranks as empty.
fn build_ranked_frame(state: &AppState, query: &str, sequence: u64) -> RankedFrame {
    let snapshots = state
        .latest_snapshots()
        .map(|set| rank(&set, query))
        .unwrap_or_default();

    RankedFrame {
        state_version: state.current_state_version(),
        sequence,
        server_time: chrono::Utc::now().timestamp_millis(),
        feed_connected: *state.feed_connected.read(),
        query: query.to_string(),
        snapshots,
    }
}

/// Extract the filter query from a client text frame and normalize its case.
fn parse_filter_message(text: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
        if let Some(q) = value.get("query").and_then(|v| v.as_str()) {
            return q.trim().to_uppercase();
        }
        if let Some(s) = value.as_str() {
            return s.trim().to_uppercase();
        }
    }
    text.trim().to_uppercase()
}

// =============================================================================
// WebSocket upgrade handler
// =============================================================================

/// Axum handler for the WebSocket upgrade request.
///
/// Validates the session token from the `?token=` query parameter before
/// upgrading.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    let token = query.token.unwrap_or_default();
    if !validate_token(&token) {
        warn!("WebSocket connection rejected: invalid token");
        return (
            axum::http::StatusCode::FORBIDDEN,
            "Invalid or missing token",
        )
            .into_response();
    }

    info!("WebSocket connection accepted — upgrading");
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
        .into_response()
}

// =============================================================================
// Connection handler
// =============================================================================

/// Manages a single WebSocket connection lifecycle.
///
/// Runs two concurrent tasks via `tokio::select!`:
///   1. **Push loop** — on each tick, check if the state version changed and
///      send a fresh ranked frame if so.
///   2. **Recv loop** — process incoming client messages (filter updates,
///      Ping/Pong, Close).
async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    use futures_util::{SinkExt, StreamExt};

    let mut query = String::new();
    let mut sequence: u64 = 0;

    // Send the initial ranked frame immediately.
    if let Err(e) = send_ranked(&mut sender, &state, &query, &mut sequence).await {
        warn!(error = %e, "Failed to send initial WebSocket frame");
        return;
    }
    let mut last_sent_version = state.current_state_version();

    let push_interval_ms = state.runtime_config.read().push_interval_ms;
    let mut push_interval = interval(Duration::from_millis(push_interval_ms));

    loop {
        tokio::select! {
            // ── Push loop: check for version changes on each tick ───────
            _ = push_interval.tick() => {
                let current_version = state.current_state_version();
                if current_version != last_sent_version {
                    match send_ranked(&mut sender, &state, &query, &mut sequence).await {
                        Ok(()) => {
                            last_sent_version = current_version;
                        }
                        Err(e) => {
                            debug!(error = %e, "WebSocket send failed — disconnecting");
                            break;
                        }
                    }
                }
            }

            // ── Recv loop: process incoming messages ────────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let new_query = parse_filter_message(&text);
                        if new_query != query {
                            debug!(query = %new_query, "filter query updated");
                            query = new_query;
                            // Re-rank under the new filter right away.
                            match send_ranked(&mut sender, &state, &query, &mut sequence).await {
                                Ok(()) => {
                                    last_sent_version = state.current_state_version();
                                }
                                Err(e) => {
                                    debug!(error = %e, "WebSocket send failed — disconnecting");
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        debug!("WebSocket Ping received — sending Pong");
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            debug!(error = %e, "Failed to send Pong — disconnecting");
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        debug!("WebSocket Pong received");
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("WebSocket Close frame received — disconnecting");
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!("WebSocket binary message ignored");
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket receive error — disconnecting");
                        break;
                    }
                    None => {
                        info!("WebSocket stream ended (None)");
                        break;
                    }
                }
            }
        }
    }

    info!("WebSocket connection closed");
}

// =============================================================================
// Helpers
// =============================================================================

/// Serialize and send a ranked frame over the WebSocket.
///
/// Increments the global `ws_sequence_number` on each send.
async fn send_ranked<S>(
    sender: &mut S,
    state: &Arc<AppState>,
    query: &str,
    sequence: &mut u64,
) -> Result<(), axum::Error>
where
    S: futures_util::Sink<Message, Error = axum::Error> + Unpin,
{
    use futures_util::SinkExt;

    state
        .ws_sequence_number
        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    *sequence += 1;

    let frame = build_ranked_frame(state, query, *sequence);

    match serde_json::to_string(&frame) {
        Ok(json) => {
            sender.send(Message::Text(json.into())).await?;
            debug!(
                version = frame.state_version,
                seq = *sequence,
                count = frame.snapshots.len(),
                "ranked frame sent"
            );
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Failed to serialize ranked frame");
            // Serialisation errors are not network errors; don't disconnect.
            Ok(())
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
