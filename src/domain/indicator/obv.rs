//! OBV (On-Balance Volume).

use crate::domain::indicator::Reading;
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_TREND_LOOKBACK: usize = 20;

/// Raw OBV values, one per bar.
///
/// OBV[0] = volume[0], then each bar adds its volume on an up close,
/// subtracts it on a down close and carries on an unchanged close.
pub fn obv_values(bars: &[PriceBar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    let mut obv = 0.0;
    let mut prev_close = None;
    for bar in bars {
        let volume = bar.volume as f64;
        match prev_close {
            None => obv = volume,
            Some(prev) if bar.close > prev => obv += volume,
            Some(prev) if bar.close < prev => obv -= volume,
            Some(_) => {}
        }
        prev_close = Some(bar.close);
        out.push(obv);
    }
    out
}

/// OBV(now) - OBV(lookback bars ago); needs `lookback + 1` bars.
pub fn obv_trend(bars: &[PriceBar], lookback: usize) -> Reading<f64> {
    let minimum = lookback + 1;
    let obv = obv_values(bars);
    Reading::gate(bars.len(), minimum, || {
        obv[obv.len() - 1] - obv[obv.len() - 1 - lookback]
    })
}
