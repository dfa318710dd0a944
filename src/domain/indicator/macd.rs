//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: slow - 1 + signal - 1 bars.

use crate::domain::indicator::ema::ema_values;
use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, Reading,
};
use crate::domain::ohlcv::PriceBar;
use serde::Serialize;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdReading {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

pub fn calculate_macd(
    bars: &[PriceBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if bars.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let (line, signal) = macd_lines(&closes, fast, slow, signal_period);

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let (valid, line, signal) = match (line[i], signal[i]) {
                (Some(l), Some(s)) => (true, l, s),
                (l, _) => (false, l.unwrap_or(0.0), 0.0),
            };
            IndicatorPoint {
                date: bar.date,
                valid,
                value: IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

/// MACD line and signal line over raw closes, `None` during warmup.
///
/// The line is valid once both EMAs are; the signal is an EMA seeded over
/// the first `signal_period` valid line values.
pub fn macd_lines(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let ema_fast = ema_values(closes, fast);
    let ema_slow = ema_values(closes, slow);

    let line: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let first_valid = line.iter().position(Option::is_some);
    let mut signal = vec![None; line.len()];
    if let Some(start) = first_valid {
        let valid_line: Vec<f64> = line[start..].iter().flatten().copied().collect();
        for (offset, value) in ema_values(&valid_line, signal_period).into_iter().enumerate() {
            signal[start + offset] = value;
        }
    }

    (line, signal)
}

/// Latest MACD; needs `slow + signal - 1` bars.
pub fn latest_macd(
    bars: &[PriceBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Reading<MacdReading> {
    let minimum = slow.max(fast).max(1) + signal_period.max(1) - 1;
    let series = calculate_macd(bars, fast, slow, signal_period);
    match series.last_valid().map(|p| &p.value) {
        Some(&IndicatorValue::Macd {
            line,
            signal,
            histogram,
        }) => Reading::Ready(MacdReading {
            line,
            signal,
            histogram,
        }),
        _ => Reading::Indeterminate {
            bars: bars.len(),
            minimum,
        },
    }
}
