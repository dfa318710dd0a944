//! Price/indicator divergence.
//!
//! Over a trailing window the price trend is `close[last] - close[last - window + 1]`
//! and the indicator trend is measured the same way. Price falling while the
//! indicator rises by more than the noise margin is bullish; the mirror case
//! is bearish.

use crate::domain::indicator::Reading;
use crate::domain::indicator::macd::macd_lines;
use crate::domain::indicator::obv::obv_values;
use crate::domain::indicator::rsi::rsi_values;
use crate::domain::ohlcv::PriceBar;
use serde::Serialize;

pub const DEFAULT_WINDOW: usize = 20;
pub const RSI_MARGIN: f64 = 3.0;
pub const MACD_MARGIN: f64 = 0.0;
pub const OBV_MARGIN: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Divergence {
    None,
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DivergenceSet {
    pub rsi: Reading<Divergence>,
    pub macd: Reading<Divergence>,
    pub obv: Reading<Divergence>,
}

impl DivergenceSet {
    fn all(&self) -> [Option<Divergence>; 3] {
        [self.rsi.get(), self.macd.get(), self.obv.get()]
    }

    pub fn bullish_count(&self) -> usize {
        self.all()
            .iter()
            .filter(|d| **d == Some(Divergence::Bullish))
            .count()
    }

    pub fn bearish_count(&self) -> usize {
        self.all()
            .iter()
            .filter(|d| **d == Some(Divergence::Bearish))
            .count()
    }
}

/// Compare the trailing trend of `prices` and `indicator`.
///
/// Indeterminate when the window is longer than the series or the indicator
/// has no value at the start of the window.
pub fn detect(
    prices: &[f64],
    indicator: &[Option<f64>],
    window: usize,
    margin: f64,
) -> Reading<Divergence> {
    let n = prices.len().min(indicator.len());
    let window = window.max(2);
    let first_valid = indicator.iter().position(Option::is_some).unwrap_or(n);
    let minimum = first_valid + window;

    if n < minimum {
        return Reading::Indeterminate { bars: n, minimum };
    }

    let start = n - window;
    let (Some(ind_start), Some(ind_end)) = (indicator[start], indicator[n - 1]) else {
        return Reading::Indeterminate { bars: n, minimum };
    };
    let price_trend = prices[n - 1] - prices[start];
    let indicator_trend = ind_end - ind_start;

    Reading::Ready(if price_trend < 0.0 && indicator_trend > margin {
        Divergence::Bullish
    } else if price_trend > 0.0 && indicator_trend < -margin {
        Divergence::Bearish
    } else {
        Divergence::None
    })
}

pub fn divergences(bars: &[PriceBar], window: usize) -> DivergenceSet {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let rsi = rsi_values(&closes, 14);
    let (macd_line, _) = macd_lines(&closes, 12, 26, 9);
    let obv: Vec<Option<f64>> = obv_values(bars).into_iter().map(Some).collect();

    DivergenceSet {
        rsi: detect(&closes, &rsi, window, RSI_MARGIN),
        macd: detect(&closes, &macd_line, window, MACD_MARGIN),
        obv: detect(&closes, &obv, window, OBV_MARGIN),
    }
}
