// =============================================================================
// Indicator Engine — merge optional overlays onto a historical series
// =============================================================================

use crate::types::{AnnotatedBar, Bar};

use super::rsi::{rsi_series, RSI_PERIOD};
use super::sma::{sma_series, SMA_WINDOW};

/// Which overlays the chart currently has toggled on. The toggles are
/// independent: computing one never requires or perturbs the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndicatorOptions {
    pub sma: bool,
    pub rsi: bool,
}

/// Annotate `series` with the enabled indicators.
///
/// The output has the same length and bar order as the input, each bar
/// carried through unchanged. Series too short for an indicator's window
/// simply come back with that field absent on every bar — never an error.
/// Pure function: calling it again with the same inputs yields identical
/// output.
pub fn annotate(series: &[Bar], options: IndicatorOptions) -> Vec<AnnotatedBar> {
    let closes: Vec<f64> = series.iter().map(|bar| bar.close).collect();

    let sma = if options.sma {
        sma_series(&closes, SMA_WINDOW)
    } else {
        vec![None; series.len()]
    };
    let rsi = if options.rsi {
        rsi_series(&closes, RSI_PERIOD)
    } else {
        vec![None; series.len()]
    };

    series
        .iter()
        .zip(sma)
        .zip(rsi)
        .map(|((bar, sma), rsi)| AnnotatedBar { bar: bar.clone(), sma, rsi })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BarTime;

    fn series(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: BarTime::Epoch(1_700_000_000_000 + i as i64 * 60_000),
                close,
                open: None,
                high: None,
                low: None,
                volume: None,
                extra: serde_json::Map::new(),
            })
            .collect()
    }

    #[test]
    fn disabled_options_pass_bars_through_unannotated() {
        let bars = series(&(1..=30).map(f64::from).collect::<Vec<_>>());
        let annotated = annotate(&bars, IndicatorOptions::default());
        assert_eq!(annotated.len(), bars.len());
        for (a, b) in annotated.iter().zip(&bars) {
            assert_eq!(&a.bar, b);
            assert!(a.sma.is_none());
            assert!(a.rsi.is_none());
        }
    }

    #[test]
    fn preserves_length_date_and_close_ordering() {
        let bars = series(&(1..=25).map(f64::from).collect::<Vec<_>>());
        let annotated = annotate(&bars, IndicatorOptions { sma: true, rsi: true });
        assert_eq!(annotated.len(), bars.len());
        for (a, b) in annotated.iter().zip(&bars) {
            assert_eq!(a.bar.date, b.date);
            assert_eq!(a.bar.close, b.close);
        }
    }

    #[test]
    fn input_series_is_never_mutated() {
        let bars = series(&(1..=25).map(f64::from).collect::<Vec<_>>());
        let before = bars.clone();
        let _ = annotate(&bars, IndicatorOptions { sma: true, rsi: true });
        assert_eq!(bars, before);
    }

    #[test]
    fn short_series_degrades_to_absent_fields() {
        let bars = series(&[10.0, 12.0, 11.0]);
        let annotated = annotate(&bars, IndicatorOptions { sma: true, rsi: true });
        assert_eq!(annotated.len(), 3);
        for bar in &annotated {
            assert!(bar.sma.is_none());
            assert!(bar.rsi.is_none());
        }
    }

    #[test]
    fn twenty_bar_sma_only_annotates_the_final_bar() {
        let bars = series(&(1..=20).map(f64::from).collect::<Vec<_>>());
        let annotated = annotate(&bars, IndicatorOptions { sma: true, rsi: false });
        assert!(annotated[..19].iter().all(|b| b.sma.is_none()));
        assert_eq!(annotated[19].sma, Some(10.5));
        // RSI left untouched by the SMA toggle.
        assert!(annotated.iter().all(|b| b.rsi.is_none()));
    }

    #[test]
    fn toggles_are_independent() {
        let closes: Vec<f64> = (1..=40).map(f64::from).collect();
        let bars = series(&closes);

        let sma_only = annotate(&bars, IndicatorOptions { sma: true, rsi: false });
        let rsi_only = annotate(&bars, IndicatorOptions { sma: false, rsi: true });
        let both = annotate(&bars, IndicatorOptions { sma: true, rsi: true });

        for i in 0..bars.len() {
            assert_eq!(sma_only[i].sma, both[i].sma);
            assert!(sma_only[i].rsi.is_none());
            assert_eq!(rsi_only[i].rsi, both[i].rsi);
            assert!(rsi_only[i].sma.is_none());
        }
    }

    #[test]
    fn annotate_is_idempotent() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + ((i * 13) % 7) as f64).collect();
        let bars = series(&closes);
        let options = IndicatorOptions { sma: true, rsi: true };
        assert_eq!(annotate(&bars, options), annotate(&bars, options));
    }

    #[test]
    fn empty_series_yields_empty_output() {
        assert!(annotate(&[], IndicatorOptions { sma: true, rsi: true }).is_empty());
    }
}
