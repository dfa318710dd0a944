//! Price levels: support/resistance and Fibonacci retracement/extension.

use crate::domain::indicator::Reading;
use crate::domain::ohlcv::PriceBar;
use serde::Serialize;

pub const PIVOT_RADIUS: usize = 5;
pub const PIVOT_WINDOW: usize = 60;
pub const FALLBACK_WINDOW: usize = 20;
pub const FIBONACCI_WINDOW: usize = 60;

pub const RETRACEMENT_RATIOS: [f64; 6] = [0.0, 0.236, 0.382, 0.5, 0.618, 1.0];
pub const EXTENSION_RATIOS: [f64; 2] = [1.272, 1.618];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SupportResistance {
    pub support: f64,
    pub resistance: f64,
    /// True when no pivot was found and trailing min/max was used.
    pub fallback: bool,
}

/// Support = lowest pivot low, resistance = highest pivot high.
///
/// A pivot is a close that is the extreme of the closes within `PIVOT_RADIUS`
/// bars on each side, searched over the trailing `PIVOT_WINDOW` closes.
/// Without pivots of either kind, that side falls back to the trailing
/// `FALLBACK_WINDOW` min/max. Needs 1 bar.
pub fn support_resistance(bars: &[PriceBar]) -> Reading<SupportResistance> {
    if bars.is_empty() {
        return Reading::Indeterminate {
            bars: 0,
            minimum: 1,
        };
    }

    let start = bars.len().saturating_sub(PIVOT_WINDOW);
    let closes: Vec<f64> = bars[start..].iter().map(|b| b.close).collect();

    let mut pivot_lows = Vec::new();
    let mut pivot_highs = Vec::new();
    if closes.len() > 2 * PIVOT_RADIUS {
        for i in PIVOT_RADIUS..closes.len() - PIVOT_RADIUS {
            let window = &closes[i - PIVOT_RADIUS..=i + PIVOT_RADIUS];
            let max = window.iter().copied().fold(f64::MIN, f64::max);
            let min = window.iter().copied().fold(f64::MAX, f64::min);
            if closes[i] >= max {
                pivot_highs.push(closes[i]);
            }
            if closes[i] <= min {
                pivot_lows.push(closes[i]);
            }
        }
    }

    let tail_start = closes.len().saturating_sub(FALLBACK_WINDOW);
    let tail = &closes[tail_start..];
    let tail_min = tail.iter().copied().fold(f64::MAX, f64::min);
    let tail_max = tail.iter().copied().fold(f64::MIN, f64::max);

    let fallback = pivot_lows.is_empty() || pivot_highs.is_empty();
    let support = pivot_lows
        .iter()
        .copied()
        .reduce(f64::min)
        .unwrap_or(tail_min);
    let resistance = pivot_highs
        .iter()
        .copied()
        .reduce(f64::max)
        .unwrap_or(tail_max);

    Reading::Ready(SupportResistance {
        support,
        resistance,
        fallback,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FibonacciLevels {
    pub high: f64,
    pub low: f64,
    /// (ratio, price) from `low` upward.
    pub retracements: Vec<(f64, f64)>,
    /// (ratio, price) above `high`, ascending.
    pub extensions: Vec<(f64, f64)>,
}

impl FibonacciLevels {
    /// The lowest extension strictly above `price`.
    pub fn nearest_extension_above(&self, price: f64) -> Option<f64> {
        self.extensions
            .iter()
            .map(|&(_, level)| level)
            .filter(|&level| level > price)
            .reduce(f64::min)
    }

    pub fn retracement(&self, ratio: f64) -> Option<f64> {
        self.retracements
            .iter()
            .find(|(r, _)| (r - ratio).abs() < 1e-9)
            .map(|&(_, price)| price)
    }
}

/// Levels over the trailing `FIBONACCI_WINDOW` closes. Needs 2 bars.
pub fn fibonacci(bars: &[PriceBar]) -> Reading<FibonacciLevels> {
    Reading::gate(bars.len(), 2, || {
        let start = bars.len().saturating_sub(FIBONACCI_WINDOW);
        let closes = bars[start..].iter().map(|b| b.close);
        let (low, high) = closes.fold((f64::MAX, f64::MIN), |(lo, hi), c| (lo.min(c), hi.max(c)));
        let range = high - low;

        FibonacciLevels {
            high,
            low,
            retracements: RETRACEMENT_RATIOS
                .iter()
                .map(|&r| (r, low + r * range))
                .collect(),
            extensions: EXTENSION_RATIOS
                .iter()
                .map(|&r| (r, high + (r - 1.0) * range))
                .collect(),
        }
    })
}
