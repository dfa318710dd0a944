//! Average Directional Index.
//!
//! +DM = H[i]-H[i-1] when it exceeds L[i-1]-L[i] and is positive, else 0.
//! -DM = L[i-1]-L[i] when it exceeds H[i]-H[i-1] and is positive, else 0.
//! +DI/-DI = 100 × mean(DM) / mean(TR) over n bars.
//! DX = 100 × |+DI - -DI| / (+DI + -DI); ADX = mean(DX) over n values.
//! Needs 2n bars.

use crate::domain::indicator::atr::true_ranges;
use crate::domain::indicator::sma::sma_values;
use crate::domain::indicator::{EPSILON, Reading};
use crate::domain::ohlcv::PriceBar;
use serde::Serialize;

pub const DEFAULT_PERIOD: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendStrength {
    Weak,
    Strong,
    VeryStrong,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdxReading {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

impl AdxReading {
    /// >50 very strong, >25 strong.
    pub fn strength(&self) -> TrendStrength {
        if self.adx > 50.0 {
            TrendStrength::VeryStrong
        } else if self.adx > 25.0 {
            TrendStrength::Strong
        } else {
            TrendStrength::Weak
        }
    }
}

pub fn latest_adx(bars: &[PriceBar], period: usize) -> Reading<AdxReading> {
    let period = period.max(1);
    let minimum = 2 * period;
    if bars.len() < minimum {
        return Reading::Indeterminate {
            bars: bars.len(),
            minimum,
        };
    }

    let (plus_dm, minus_dm): (Vec<f64>, Vec<f64>) = bars
        .windows(2)
        .map(|w| {
            let up = w[1].high - w[0].high;
            let down = w[0].low - w[1].low;
            let plus = if up > down && up > 0.0 { up } else { 0.0 };
            let minus = if down > up && down > 0.0 { down } else { 0.0 };
            (plus, minus)
        })
        .unzip();

    let tr = sma_values(&true_ranges(bars), period);
    let plus = sma_values(&plus_dm, period);
    let minus = sma_values(&minus_dm, period);

    let mut dx = Vec::new();
    let mut last_di = (0.0, 0.0);
    for i in 0..tr.len() {
        if let (Some(tr), Some(p), Some(m)) = (tr[i], plus[i], minus[i]) {
            let tr = tr.max(EPSILON);
            let plus_di = 100.0 * p / tr;
            let minus_di = 100.0 * m / tr;
            let sum = plus_di + minus_di;
            dx.push(if sum <= EPSILON {
                0.0
            } else {
                100.0 * (plus_di - minus_di).abs() / sum
            });
            last_di = (plus_di, minus_di);
        }
    }

    match sma_values(&dx, period).last().copied().flatten() {
        Some(adx) => Reading::Ready(AdxReading {
            adx,
            plus_di: last_di.0,
            minus_di: last_di.1,
        }),
        None => Reading::Indeterminate {
            bars: bars.len(),
            minimum,
        },
    }
}
