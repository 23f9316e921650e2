// =============================================================================
// Runtime Configuration — dashboard backend settings with atomic save
// =============================================================================
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_feed_ws_url() -> String {
    "ws://localhost:9000/stream".to_string()
}

fn default_provider_http_base() -> String {
    "http://localhost:9000".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    10
}

fn default_feed_reconnect_secs() -> u64 {
    5
}

fn default_push_interval_ms() -> u64 {
    500
}

fn default_watchlist_path() -> String {
    "watchlist.json".to_string()
}

fn default_max_recent_errors() -> usize {
    50
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the dashboard backend.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Serving -------------------------------------------------------------

    /// Address the HTTP/WebSocket API binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// How often the dashboard WebSocket checks for a changed snapshot set.
    #[serde(default = "default_push_interval_ms")]
    pub push_interval_ms: u64,

    // --- Upstream ------------------------------------------------------------

    /// WebSocket URL of the market-strength snapshot feed.
    #[serde(default = "default_feed_ws_url")]
    pub feed_ws_url: String,

    /// Base URL of the history/search/login provider.
    #[serde(default = "default_provider_http_base")]
    pub provider_http_base: String,

    /// Per-request timeout for provider calls.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Delay before reconnecting a dropped feed stream.
    #[serde(default = "default_feed_reconnect_secs")]
    pub feed_reconnect_secs: u64,

    // --- Persistence & diagnostics ------------------------------------------

    /// Where the user watchlist is stored.
    #[serde(default = "default_watchlist_path")]
    pub watchlist_path: String,

    /// Cap on the recent-error ring buffer exposed to the dashboard.
    #[serde(default = "default_max_recent_errors")]
    pub max_recent_errors: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            push_interval_ms: default_push_interval_ms(),
            feed_ws_url: default_feed_ws_url(),
            provider_http_base: default_provider_http_base(),
            provider_timeout_secs: default_provider_timeout_secs(),
            feed_reconnect_secs: default_feed_reconnect_secs(),
            watchlist_path: default_watchlist_path(),
            max_recent_errors: default_max_recent_errors(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            feed = %config.feed_ws_url,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}
