// =============================================================================
// Watchlist — user symbol list with atomic JSON persistence
// =============================================================================
//
// Persistence uses the tmp + rename pattern to prevent corruption on crash.
// Saves are best-effort: a failed write is logged and the in-memory list
// stays authoritative for the lifetime of the process.
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One tracked symbol. `token` is the provider's instrument token, kept so a
/// later history request can skip the search round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Thread-safe watchlist backed by a JSON file.
pub struct Watchlist {
    entries: RwLock<Vec<WatchlistEntry>>,
    path: PathBuf,
}

impl Watchlist {
    /// Load the watchlist from `path`. A missing or unreadable file starts an
    /// empty list — losing a watchlist is never fatal.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();

        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<WatchlistEntry>>(&content) {
                Ok(entries) => {
                    info!(path = %path.display(), count = entries.len(), "watchlist loaded");
                    entries
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "watchlist file unreadable — starting empty");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        Self {
            entries: RwLock::new(entries),
            path,
        }
    }

    /// Add an entry. Returns `false` when the symbol is already tracked
    /// (the existing entry is left untouched).
    pub fn add(&self, entry: WatchlistEntry) -> bool {
        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.symbol == entry.symbol) {
            return false;
        }
        entries.push(entry);
        true
    }

    /// Remove a symbol. Returns `false` when it was not tracked.
    pub fn remove(&self, symbol: &str) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.symbol != symbol);
        entries.len() != before
    }

    /// Snapshot of the current entries.
    pub fn entries(&self) -> Vec<WatchlistEntry> {
        self.entries.read().clone()
    }

    /// Persist the current entries using an atomic write (write to `.tmp`,
    /// then rename).
    pub fn save(&self) -> Result<()> {
        let entries = self.entries.read().clone();
        let content =
            serde_json::to_string_pretty(&entries).context("failed to serialise watchlist")?;

        let tmp_path = self.path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp watchlist to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to rename tmp watchlist to {}", self.path.display()))?;

        info!(path = %self.path.display(), count = entries.len(), "watchlist saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(symbol: &str) -> WatchlistEntry {
        WatchlistEntry {
            symbol: symbol.to_string(),
            token: None,
        }
    }

    fn empty_list() -> Watchlist {
        // A path that never exists; these tests exercise the in-memory list.
        Watchlist::load("nonexistent-watchlist-for-tests.json")
    }

    #[test]
    fn missing_file_starts_empty() {
        assert!(empty_list().entries().is_empty());
    }

    #[test]
    fn add_deduplicates_by_symbol() {
        let list = empty_list();
        assert!(list.add(entry("RELIANCE")));
        assert!(!list.add(entry("RELIANCE")));
        assert!(list.add(entry("TCS")));
        assert_eq!(list.entries().len(), 2);
    }

    #[test]
    fn add_keeps_the_existing_token() {
        let list = empty_list();
        list.add(WatchlistEntry {
            symbol: "INFY".into(),
            token: Some("1594".into()),
        });
        // A duplicate add without a token must not clobber the stored one.
        list.add(entry("INFY"));
        assert_eq!(list.entries()[0].token.as_deref(), Some("1594"));
    }

    #[test]
    fn remove_reports_whether_anything_was_removed() {
        let list = empty_list();
        list.add(entry("SBIN"));
        assert!(list.remove("SBIN"));
        assert!(!list.remove("SBIN"));
        assert!(list.entries().is_empty());
    }

    #[test]
    fn entries_round_trip_through_serde() {
        let entries = vec![
            WatchlistEntry { symbol: "RELIANCE.BSE".into(), token: Some("2885".into()) },
            WatchlistEntry { symbol: "TCS.BSE".into(), token: None },
        ];
        let json = serde_json::to_string(&entries).unwrap();
        let back: Vec<WatchlistEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(entries, back);
        // Absent tokens are omitted, not serialised as null.
        assert!(!json.contains("null"));
    }
}
