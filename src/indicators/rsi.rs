// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
// Step 1 — Accumulate gains / losses from the first `period` price changes.
// Step 2 — Seed the averages once, at the bar where the accumulation
//          completes: avg = sum / period.
// Step 3 — Apply Wilder's smoothing for every later bar:
//            avg_gain = (prev_avg_gain * (period - 1) + gain) / period
//            avg_loss = (prev_avg_loss * (period - 1) + loss) / period
// Step 4 — RS  = avg_gain / avg_loss   (avg_loss of 0 is replaced by 1 in
//          the ratio only; the stored running average stays 0)
//          RSI = 100 - 100 / (1 + RS)
// =============================================================================

use super::round2;

/// Look-back period used by the dashboard's RSI pane.
pub const RSI_PERIOD: usize = 14;

/// Wilder averages carried from one bar to the next. Missing carry state
/// degrades to zeroed averages rather than failing.
#[derive(Debug, Clone, Copy, Default)]
struct WilderState {
    avg_gain: f64,
    avg_loss: f64,
}

/// Compute the RSI series for `closes`, aligned one-to-one with the input.
///
/// Element `i` is `Some` starting at index `period` (the first `period`
/// changes are consumed to seed the averages); earlier indices are `None`.
/// A series of `period + 1` bars or fewer produces at most the seed value;
/// at `period` bars or fewer, no values at all. Values are rounded to 2
/// decimal places for display stability.
///
/// A zero average loss substitutes 1 into the RS denominator instead of
/// guarding the division, so a pure run of gains saturates the output toward
/// 100. Callers must treat that as intended saturation, not a fault.
///
/// # Edge cases
/// - `period == 0` => all `None`
/// - `closes.len() <= period` => all `None`
pub fn rsi_series(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || closes.len() <= period {
        return vec![None; closes.len()];
    }

    let mut result = vec![None; closes.len()];
    let period_f = period as f64;

    let mut gains = 0.0;
    let mut losses = 0.0;
    let mut carry: Option<WilderState> = None;

    for i in 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };

        if i <= period {
            gains += gain;
            losses += loss;
            if i == period {
                let state = WilderState {
                    avg_gain: gains / period_f,
                    avg_loss: losses / period_f,
                };
                result[i] = Some(rsi_value(state));
                carry = Some(state);
            }
        } else {
            let prev = carry.unwrap_or_default();
            let state = WilderState {
                avg_gain: (prev.avg_gain * (period_f - 1.0) + gain) / period_f,
                avg_loss: (prev.avg_loss * (period_f - 1.0) + loss) / period_f,
            };
            result[i] = Some(rsi_value(state));
            carry = Some(state);
        }
    }

    result
}

/// RS/RSI formula with the zero-loss substitution applied in the ratio only.
fn rsi_value(state: WilderState) -> f64 {
    let denominator = if state.avg_loss == 0.0 { 1.0 } else { state.avg_loss };
    let rs = state.avg_gain / denominator;
    round2(100.0 - 100.0 / (1.0 + rs))
}

// =============================================================================
// Tests
// =============================================================================
