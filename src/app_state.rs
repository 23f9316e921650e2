// =============================================================================
// Central Application State — TradeSense dashboard backend
// =============================================================================
//
// The single source of truth shared by the feed consumer and the API layer.
//
// Thread safety:
//   - Atomic counters for lock-free version tracking.
//   - parking_lot::RwLock for all mutable shared collections.
//   - Arc wrappers for subsystems that manage their own interior mutability.
//
// The latest snapshot set is replaced wholesale on every feed message; the
// WebSocket feed uses the version counter to detect changes and push updates.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::provider::ProviderClient;
use crate::runtime_config::RuntimeConfig;
use crate::types::MarketSnapshot;
use crate::watchlist::Watchlist;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Monotonically increasing version counter. Incremented on every
    /// meaningful state mutation.
    pub state_version: AtomicU64,

    /// WebSocket message sequence number (incremented per message sent).
    pub ws_sequence_number: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    // ── Live universe ───────────────────────────────────────────────────
    /// Latest full snapshot set. `None` until the first good frame arrives,
    /// so the dashboard can show its "connecting" placeholder.
    latest_snapshots: RwLock<Option<Vec<MarketSnapshot>>>,

    pub feed_connected: RwLock<bool>,
    pub last_feed_message_at: RwLock<Option<std::time::Instant>>,

    // ── Collaborators ───────────────────────────────────────────────────
    pub provider: Arc<ProviderClient>,
    pub watchlist: Arc<Watchlist>,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    /// Instant when the service was started. Used for uptime reporting.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState`. The returned value is typically wrapped in
    /// `Arc` immediately.
    pub fn new(
        config: RuntimeConfig,
        provider: Arc<ProviderClient>,
        watchlist: Arc<Watchlist>,
    ) -> Self {
        Self {
            state_version: AtomicU64::new(1),
            ws_sequence_number: AtomicU64::new(0),

            runtime_config: Arc::new(RwLock::new(config)),

            latest_snapshots: RwLock::new(None),
            feed_connected: RwLock::new(false),
            last_feed_message_at: RwLock::new(None),

            provider,
            watchlist,

            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    /// Atomically increment the state version. Call this after every
    /// meaningful mutation to signal WebSocket clients that fresh data is
    /// available.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Read the current state version without modifying it.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Snapshot Set ────────────────────────────────────────────────────

    /// Wholesale-replace the latest snapshot set with a freshly parsed frame.
    pub fn replace_snapshots(&self, snapshots: Vec<MarketSnapshot>) {
        *self.latest_snapshots.write() = Some(snapshots);
        *self.last_feed_message_at.write() = Some(std::time::Instant::now());
        self.increment_version();
    }

    /// Clone of the latest snapshot set, or `None` before the first frame.
    pub fn latest_snapshots(&self) -> Option<Vec<MarketSnapshot>> {
        self.latest_snapshots.read().clone()
    }

    /// Record feed connectivity for the dashboard status banner.
    pub fn set_feed_connected(&self, connected: bool) {
        *self.feed_connected.write() = connected;
        self.increment_version();
    }

    /// Milliseconds since the last good feed frame, if any arrived yet.
    pub fn feed_message_age_ms(&self) -> Option<u64> {
        self.last_feed_message_at
            .read()
            .map(|t| t.elapsed().as_millis() as u64)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message. The ring buffer is capped by the configured
    /// maximum; oldest entries are evicted when the limit is reached.
    pub fn push_error(&self, msg: String) {
        let record = ErrorRecord {
            message: msg,
            at: Utc::now().to_rfc3339(),
        };

        let cap = self.runtime_config.read().max_recent_errors;
        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > cap {
            errors.remove(0);
        }

        self.increment_version();
    }
}

// =============================================================================
// Tests
// =============================================================================
