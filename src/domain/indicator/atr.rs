//! Average True Range.
//!
//! TR[0] = high - low, TR[i] = max(H-L, |H-C[i-1]|, |L-C[i-1]|).
//! ATR(n)[i] = mean(TR[i-n+1..=i]) over bars that have a previous close.
//! Warmup: first n bars are invalid.

use crate::domain::indicator::sma::sma_values;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, Reading};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_PERIOD: usize = 14;

/// True ranges for bars 1.., each against the prior close.
pub fn true_ranges(bars: &[PriceBar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| w[1].true_range(w[0].close))
        .collect()
}

pub fn calculate_atr(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    if let Some(first) = bars.first() {
        values.push(IndicatorPoint {
            date: first.date,
            valid: false,
            value: IndicatorValue::Simple(0.0),
        });
    }

    let atr = sma_values(&true_ranges(bars), period);
    for (i, bar) in bars.iter().enumerate().skip(1) {
        let v = atr.get(i - 1).copied().flatten();
        values.push(IndicatorPoint {
            date: bar.date,
            valid: v.is_some(),
            value: IndicatorValue::Simple(v.unwrap_or(0.0)),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}

/// Latest ATR; needs `period + 1` bars.
pub fn latest_atr(bars: &[PriceBar], period: usize) -> Reading<f64> {
    let period = period.max(1);
    let series = calculate_atr(bars, period);
    match series.last_valid().map(|p| &p.value) {
        Some(&IndicatorValue::Simple(v)) => Reading::Ready(v),
        _ => Reading::Indeterminate {
            bars: bars.len(),
            minimum: period + 1,
        },
    }
}
