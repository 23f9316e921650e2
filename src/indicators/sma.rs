// =============================================================================
// Simple Moving Average (SMA) — running-sum window
// =============================================================================
//
// SMA is the arithmetic mean of the most recent `window` closes. The series
// is computed with a running sum: add the incoming close, and once the window
// is full, subtract the close leaving the window on each subsequent step, so
// the whole series costs O(n) regardless of window size.
// =============================================================================

use super::round2;

/// Window size used by the dashboard's SMA overlay.
pub const SMA_WINDOW: usize = 20;

/// Compute the SMA series for `closes`, aligned one-to-one with the input.
///
/// Element `i` is `Some` starting at index `window - 1`; earlier indices are
/// `None`. A series shorter than the window produces no values at all — a
/// partial-window average is never computed. Values are rounded to 2 decimal
/// places for display stability.
///
/// # Edge cases
/// - `window == 0` => all `None` (division guard)
/// - `closes.len() < window` => all `None`
pub fn sma_series(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 || closes.len() < window {
        return vec![None; closes.len()];
    }

    let mut result = vec![None; closes.len()];
    let mut sum = 0.0;

    for (i, &close) in closes.iter().enumerate() {
        sum += close;
        if i >= window - 1 {
            result[i] = Some(round2(sum / window as f64));
            sum -= closes[i - (window - 1)];
        }
    }

    result
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_series_has_no_values() {
        let closes: Vec<f64> = (1..=19).map(f64::from).collect();
        let sma = sma_series(&closes, SMA_WINDOW);
        assert_eq!(sma.len(), 19);
        assert!(sma.iter().all(Option::is_none));
    }

    #[test]
    fn window_zero_has_no_values() {
        assert!(sma_series(&[1.0, 2.0, 3.0], 0).iter().all(Option::is_none));
    }

    #[test]
    fn exact_window_series_fills_only_the_last_slot() {
        // closes 1..=20: mean = 210 / 20 = 10.50
        let closes: Vec<f64> = (1..=20).map(f64::from).collect();
        let sma = sma_series(&closes, SMA_WINDOW);
        assert_eq!(sma.len(), 20);
        assert!(sma[..19].iter().all(Option::is_none));
        assert_eq!(sma[19], Some(10.5));
    }

    #[test]
    fn running_sum_matches_windowed_mean() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + ((i * 37) % 11) as f64).collect();
        let sma = sma_series(&closes, SMA_WINDOW);

        for i in 0..closes.len() {
            if i < SMA_WINDOW - 1 {
                assert!(sma[i].is_none());
            } else {
                let mean: f64 =
                    closes[i + 1 - SMA_WINDOW..=i].iter().sum::<f64>() / SMA_WINDOW as f64;
                let expected = (mean * 100.0).round() / 100.0;
                assert_eq!(sma[i], Some(expected), "mismatch at index {i}");
            }
        }
    }

    #[test]
    fn flat_series_is_flat() {
        let closes = vec![42.0; 30];
        let sma = sma_series(&closes, SMA_WINDOW);
        for value in &sma[SMA_WINDOW - 1..] {
            assert_eq!(*value, Some(42.0));
        }
    }

    #[test]
    fn small_window_values() {
        let closes = vec![1.0, 2.0, 3.0, 4.0];
        let sma = sma_series(&closes, 2);
        assert_eq!(sma, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
    }
}
