//! Bollinger Bands.
//!
//! - Middle: SMA over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//! - %B: (close - lower) / (upper - lower), 0.5 when the bands collapse
//!
//! StdDev is the population standard deviation.
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are invalid.

use crate::domain::indicator::stddev::population_stddev;
use crate::domain::indicator::{
    EPSILON, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, Reading,
};
use crate::domain::ohlcv::PriceBar;
use serde::Serialize;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_STDDEV_MULT_X100: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BollingerReading {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub percent_b: f64,
}

pub fn calculate_bollinger(
    bars: &[PriceBar],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let warmup = period.saturating_sub(1);
    let mult = stddev_mult_x100 as f64 / 100.0;
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let valid = period > 0 && i >= warmup;
            let (upper, middle, lower) = if valid {
                let window = &closes[i + 1 - period..=i];
                let middle = window.iter().sum::<f64>() / period as f64;
                let stddev = population_stddev(window);
                (middle + mult * stddev, middle, middle - mult * stddev)
            } else {
                (0.0, 0.0, 0.0)
            };
            IndicatorPoint {
                date: bar.date,
                valid,
                value: IndicatorValue::Bollinger {
                    upper,
                    middle,
                    lower,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        },
        values,
    }
}

pub fn percent_b(close: f64, upper: f64, lower: f64) -> f64 {
    let width = upper - lower;
    if width.abs() <= EPSILON {
        0.5
    } else {
        (close - lower) / width
    }
}

/// Latest bands and %B; needs `period` bars.
pub fn latest_bollinger(
    bars: &[PriceBar],
    period: usize,
    stddev_mult_x100: u32,
) -> Reading<BollingerReading> {
    let minimum = period.max(1);
    let series = calculate_bollinger(bars, period, stddev_mult_x100);
    match (series.last_valid().map(|p| &p.value), bars.last()) {
        (
            Some(&IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            }),
            Some(bar),
        ) => Reading::Ready(BollingerReading {
            upper,
            middle,
            lower,
            percent_b: percent_b(bar.close, upper, lower),
        }),
        _ => Reading::Indeterminate {
            bars: bars.len(),
            minimum,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::test_bars::from_closes;

    #[test]
    fn bollinger_bands_are_symmetric() {
        let bars = from_closes(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let reading = latest_bollinger(&bars, 8, 200).get().unwrap();
        assert!((reading.middle - 5.0).abs() < 1e-12);
        assert!((reading.upper - 9.0).abs() < 1e-12);
        assert!((reading.lower - 1.0).abs() < 1e-12);
        // close 9 sits exactly on the upper band
        assert!((reading.percent_b - 1.0).abs() < 1e-12);
    }

    #[test]
    fn flat_prices_give_neutral_percent_b() {
        let reading = latest_bollinger(&from_closes(&[10.0; 20]), 20, 200)
            .get()
            .unwrap();
        assert!((reading.percent_b - 0.5).abs() < f64::EPSILON);
        assert!(reading.percent_b.is_finite());
    }

    #[test]
    fn bollinger_warmup() {
        let series = calculate_bollinger(&from_closes(&[1.0, 2.0, 3.0]), 3, 200);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
    }

    #[test]
    fn short_window_is_indeterminate() {
        assert_eq!(
            latest_bollinger(&from_closes(&[1.0; 5]), 20, 200),
            Reading::Indeterminate {
                bars: 5,
                minimum: 20
            }
        );
    }
}
