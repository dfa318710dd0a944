//! RSI (Relative Strength Index).
//!
//! Uses Wilder's smoothing for average gain/loss:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! RSI = 100 - 100 / (1 + avg_gain / max(avg_loss, EPSILON)).
//! A window with no movement at all reads 50.
//!
//! Warmup: first n bars are invalid (n price changes seed the averages).

use crate::domain::indicator::{EPSILON, Reading};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_PERIOD: usize = 14;

/// RSI over a raw close sequence; `None` during warmup.
pub fn rsi_values(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |c: f64| c.max(0.0);
    let loss = |c: f64| (-c).max(0.0);

    let mut avg_gain = changes[..period].iter().map(|&c| gain(c)).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|&c| loss(c)).sum::<f64>() / period as f64;
    out[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    for (idx, &change) in changes.iter().enumerate().skip(period) {
        avg_gain = (avg_gain * (period - 1) as f64 + gain(change)) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss(change)) / period as f64;
        out[idx + 1] = Some(rsi_from_averages(avg_gain, avg_loss));
    }

    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain == 0.0 && avg_loss == 0.0 {
        return 50.0;
    }
    let rs = avg_gain / avg_loss.max(EPSILON);
    100.0 - 100.0 / (1.0 + rs)
}

/// Latest RSI; needs `period + 1` bars.
pub fn latest_rsi(bars: &[PriceBar], period: usize) -> Reading<f64> {
    let period = period.max(1);
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    match rsi_values(&closes, period).last().copied().flatten() {
        Some(v) => Reading::Ready(v),
        None => Reading::Indeterminate {
            bars: bars.len(),
            minimum: period + 1,
        },
    }
}
