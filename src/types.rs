// =============================================================================
// Shared types used across the TradeSense dashboard backend
// =============================================================================

use serde::{Deserialize, Serialize};

// =============================================================================
// Market snapshots
// =============================================================================

/// One entry of the live market-strength universe, as delivered by the
/// upstream feed. Field names follow the feed's wire format.
///
/// Anything beyond `symbol` and `strengthPercent` (last price, day change,
/// sector tags, ...) is display-only and passes through untouched via the
/// flattened `extra` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    #[serde(rename = "strengthPercent")]
    pub strength_percent: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// =============================================================================
// Historical bars
// =============================================================================

/// Bar timestamp as the provider sends it: either a date/time string or an
/// epoch number. Preserved verbatim through annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BarTime {
    Text(String),
    Epoch(i64),
}

impl std::fmt::Display for BarTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Epoch(ms) => write!(f, "{ms}"),
        }
    }
}

/// A single OHLC observation from the provider's history endpoint.
///
/// Only `date` and `close` are required; open/high/low/volume and any other
/// provider fields are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: BarTime,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A [`Bar`] plus the optional indicator values computed for it. An indicator
/// field is omitted from the JSON output entirely when it was not computed,
/// so the chart widget's `connectNulls` handling never sees explicit nulls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedBar {
    #[serde(flatten)]
    pub bar: Bar,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
}

// =============================================================================
// Timeframes
// =============================================================================

/// Candle granularity understood by the history provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalTag {
    #[serde(rename = "ONE_MINUTE")]
    OneMinute,
    #[serde(rename = "FIVE_MINUTE")]
    FiveMinute,
    #[serde(rename = "ONE_DAY")]
    OneDay,
}

impl IntervalTag {
    /// The wire name used in provider URLs and API query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "ONE_MINUTE",
            Self::FiveMinute => "FIVE_MINUTE",
            Self::OneDay => "ONE_DAY",
        }
    }

    /// Parse a wire name back into a tag. Case-sensitive, like the provider.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ONE_MINUTE" => Some(Self::OneMinute),
            "FIVE_MINUTE" => Some(Self::FiveMinute),
            "ONE_DAY" => Some(Self::OneDay),
            _ => None,
        }
    }
}

impl std::fmt::Display for IntervalTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named shortcut mapping a dashboard timeframe button to the
/// (granularity, lookback) pair sent to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeframePreset {
    pub label: &'static str,
    pub interval: IntervalTag,
    pub lookback_days: u32,
}

/// The six presets offered by the chart view.
pub const TIMEFRAME_PRESETS: [TimeframePreset; 6] = [
    TimeframePreset { label: "1D", interval: IntervalTag::OneMinute, lookback_days: 1 },
    TimeframePreset { label: "5D", interval: IntervalTag::FiveMinute, lookback_days: 5 },
    TimeframePreset { label: "1M", interval: IntervalTag::OneDay, lookback_days: 30 },
    TimeframePreset { label: "6M", interval: IntervalTag::OneDay, lookback_days: 180 },
    TimeframePreset { label: "1Y", interval: IntervalTag::OneDay, lookback_days: 365 },
    TimeframePreset { label: "ALL", interval: IntervalTag::OneDay, lookback_days: 1825 },
];

/// Look up a preset by its label, case-insensitively.
pub fn preset_by_label(label: &str) -> Option<&'static TimeframePreset> {
    TIMEFRAME_PRESETS
        .iter()
        .find(|p| p.label.eq_ignore_ascii_case(label))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_parses_and_preserves_extra_fields() {
        let json = r#"{ "symbol": "RELIANCE", "strengthPercent": 72.5, "ltp": 2810.4, "sector": "Energy" }"#;
        let snap: MarketSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.symbol, "RELIANCE");
        assert!((snap.strength_percent - 72.5).abs() < f64::EPSILON);
        assert_eq!(snap.extra["ltp"], serde_json::json!(2810.4));
        assert_eq!(snap.extra["sector"], serde_json::json!("Energy"));

        // Round-trip keeps the opaque fields on the wire.
        let back = serde_json::to_value(&snap).unwrap();
        assert_eq!(back["strengthPercent"], serde_json::json!(72.5));
        assert_eq!(back["sector"], serde_json::json!("Energy"));
    }

    #[test]
    fn snapshot_rejects_non_numeric_strength() {
        let json = r#"{ "symbol": "TCS", "strengthPercent": "strong" }"#;
        assert!(serde_json::from_str::<MarketSnapshot>(json).is_err());
    }

    #[test]
    fn bar_time_accepts_string_and_epoch() {
        let text: Bar =
            serde_json::from_str(r#"{ "date": "2024-03-01T09:15:00", "close": 101.0 }"#).unwrap();
        assert_eq!(text.date, BarTime::Text("2024-03-01T09:15:00".into()));

        let epoch: Bar = serde_json::from_str(r#"{ "date": 1709284500000, "close": 101.0 }"#).unwrap();
        assert_eq!(epoch.date, BarTime::Epoch(1_709_284_500_000));
    }

    #[test]
    fn annotated_bar_omits_absent_indicators() {
        let bar: Bar = serde_json::from_str(r#"{ "date": "2024-03-01", "close": 10.0 }"#).unwrap();
        let annotated = AnnotatedBar { bar, sma: None, rsi: Some(55.5) };
        let value = serde_json::to_value(&annotated).unwrap();
        assert!(value.get("sma").is_none());
        assert_eq!(value["rsi"], serde_json::json!(55.5));
        assert_eq!(value["close"], serde_json::json!(10.0));
    }

    #[test]
    fn interval_tag_round_trips_wire_names() {
        for tag in [IntervalTag::OneMinute, IntervalTag::FiveMinute, IntervalTag::OneDay] {
            assert_eq!(IntervalTag::parse(tag.as_str()), Some(tag));
            let json = serde_json::to_string(&tag).unwrap();
            assert_eq!(json, format!("\"{}\"", tag.as_str()));
        }
        assert_eq!(IntervalTag::parse("ONE_WEEK"), None);
    }

    #[test]
    fn presets_resolve_all_six_labels() {
        let expectations = [
            ("1D", IntervalTag::OneMinute, 1),
            ("5D", IntervalTag::FiveMinute, 5),
            ("1M", IntervalTag::OneDay, 30),
            ("6M", IntervalTag::OneDay, 180),
            ("1Y", IntervalTag::OneDay, 365),
            ("ALL", IntervalTag::OneDay, 1825),
        ];
        for (label, interval, days) in expectations {
            let preset = preset_by_label(label).expect("preset should resolve");
            assert_eq!(preset.interval, interval);
            assert_eq!(preset.lookback_days, days);
        }
        // Case-insensitive lookup, unknown label rejected.
        assert!(preset_by_label("all").is_some());
        assert!(preset_by_label("2W").is_none());
    }
}
