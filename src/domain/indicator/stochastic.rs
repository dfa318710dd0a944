//! Stochastic oscillator.
//!
//! %K = 100 × (close - lowest low) / (highest high - lowest low) over k bars,
//! 50 when the range is zero. %D = SMA(d) of %K.
//! Warmup: k - 1 + d - 1 bars.

use crate::domain::indicator::sma::sma_values;
use crate::domain::indicator::{
    EPSILON, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, Reading,
};
use crate::domain::ohlcv::PriceBar;
use serde::Serialize;

pub const DEFAULT_K_PERIOD: usize = 14;
pub const DEFAULT_D_PERIOD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StochasticReading {
    pub k: f64,
    pub d: f64,
}

pub fn calculate_stochastic(bars: &[PriceBar], k_period: usize, d_period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Stochastic { k_period, d_period };
    if k_period == 0 || d_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let raw_k: Vec<Option<f64>> = (0..bars.len())
        .map(|i| {
            if i + 1 < k_period {
                return None;
            }
            let window = &bars[i + 1 - k_period..=i];
            let highest = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let lowest = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
            let range = highest - lowest;
            if range <= EPSILON {
                Some(50.0)
            } else {
                Some(100.0 * (bars[i].close - lowest) / range)
            }
        })
        .collect();

    let start = k_period - 1;
    let mut d_values = vec![None; bars.len()];
    if bars.len() > start {
        let ks: Vec<f64> = raw_k[start..].iter().flatten().copied().collect();
        for (offset, d) in sma_values(&ks, d_period).into_iter().enumerate() {
            d_values[start + offset] = d;
        }
    }

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let (valid, k, d) = match (raw_k[i], d_values[i]) {
                (Some(k), Some(d)) => (true, k, d),
                (k, _) => (false, k.unwrap_or(0.0), 0.0),
            };
            IndicatorPoint {
                date: bar.date,
                valid,
                value: IndicatorValue::Stochastic { k, d },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

/// Latest %K/%D; needs `k_period + d_period - 1` bars.
pub fn latest_stochastic(
    bars: &[PriceBar],
    k_period: usize,
    d_period: usize,
) -> Reading<StochasticReading> {
    let minimum = k_period.max(1) + d_period.max(1) - 1;
    let series = calculate_stochastic(bars, k_period, d_period);
    match series.last_valid().map(|p| &p.value) {
        Some(&IndicatorValue::Stochastic { k, d }) => Reading::Ready(StochasticReading { k, d }),
        _ => Reading::Indeterminate {
            bars: bars.len(),
            minimum,
        },
    }
}
