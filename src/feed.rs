// =============================================================================
// Market Snapshot Feed — upstream WebSocket consumer
// =============================================================================
//
// Each text frame from the upstream feed carries the FULL universe: a JSON
// array of flat records with at least `symbol` and `strengthPercent`. A
// parsed frame wholesale-replaces the previous snapshot set — there is no
// partial merge. Malformed frames are dropped and the last good set is kept.
//
// Runs until the stream disconnects or an error occurs, then returns so that
// the caller (main.rs) can handle reconnection.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use tokio_tungstenite::connect_async;
use tracing::{debug, info, warn};

use crate::app_state::AppState;
use crate::types::MarketSnapshot;

/// Parse one feed frame into a full snapshot set.
///
/// The frame must be a JSON array; records with a missing `symbol` or a
/// non-numeric `strengthPercent` fail the whole frame. Unknown fields are
/// preserved on each record.
pub fn parse_snapshot_frame(text: &str) -> Result<Vec<MarketSnapshot>> {
    let snapshots: Vec<MarketSnapshot> =
        serde_json::from_str(text).context("failed to parse snapshot frame")?;
    Ok(snapshots)
}

/// Connect to the upstream snapshot feed and pump frames into shared state.
///
/// ```ignore
/// loop {
///     if let Err(e) = feed::run_snapshot_stream(&url, &state).await {
///         error!(error = %e, "feed error");
///     }
///     tokio::time::sleep(Duration::from_secs(5)).await;
/// }
/// ```
pub async fn run_snapshot_stream(url: &str, state: &Arc<AppState>) -> Result<()> {
    info!(url = %url, "connecting to market snapshot feed");

    let (ws_stream, _response) = connect_async(url)
        .await
        .context("failed to connect to snapshot feed")?;

    info!("snapshot feed connected");
    state.set_feed_connected(true);

    let (_write, mut read) = ws_stream.split();

    let result = loop {
        match read.next().await {
            Some(Ok(msg)) => {
                if let tokio_tungstenite::tungstenite::Message::Text(text) = msg {
                    match parse_snapshot_frame(&text) {
                        Ok(snapshots) => {
                            debug!(count = snapshots.len(), "snapshot set received");
                            state.replace_snapshots(snapshots);
                        }
                        Err(e) => {
                            // Last good set stays in place.
                            warn!(error = %e, "malformed snapshot frame dropped");
                            state.push_error(format!("malformed feed frame: {e}"));
                        }
                    }
                }
                // Ping / Pong / Binary / Close frames need no handling here;
                // tungstenite answers pings automatically.
            }
            Some(Err(e)) => {
                warn!(error = %e, "snapshot feed read error");
                break Err(e.into());
            }
            None => {
                warn!("snapshot feed stream ended");
                break Ok(());
            }
        }
    };

    state.set_feed_connected(false);
    result
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_universe_frame() {
        let json = r#"[
            { "symbol": "RELIANCE", "strengthPercent": 64.2, "ltp": 2811.0 },
            { "symbol": "TCS", "strengthPercent": -12.75 }
        ]"#;
        let snapshots = parse_snapshot_frame(json).expect("should parse");
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].symbol, "RELIANCE");
        assert!((snapshots[1].strength_percent - -12.75).abs() < f64::EPSILON);
        assert_eq!(snapshots[0].extra["ltp"], serde_json::json!(2811.0));
    }

    #[test]
    fn parse_empty_universe_frame() {
        let snapshots = parse_snapshot_frame("[]").expect("empty array is a valid frame");
        assert!(snapshots.is_empty());
    }

    #[test]
    fn reject_non_array_payload() {
        assert!(parse_snapshot_frame(r#"{ "symbol": "TCS", "strengthPercent": 1.0 }"#).is_err());
        assert!(parse_snapshot_frame("not json at all").is_err());
    }

    #[test]
    fn reject_record_with_non_numeric_strength() {
        let json = r#"[ { "symbol": "TCS", "strengthPercent": "n/a" } ]"#;
        assert!(parse_snapshot_frame(json).is_err());
    }

    #[test]
    fn reject_record_missing_symbol() {
        let json = r#"[ { "strengthPercent": 5.0 } ]"#;
        assert!(parse_snapshot_frame(json).is_err());
    }
}
