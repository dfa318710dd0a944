//! Golden/death cross detection on SMA(50) against SMA(200).

use crate::domain::indicator::Reading;
use crate::domain::indicator::sma::sma_values;
use crate::domain::ohlcv::PriceBar;
use serde::Serialize;

pub const FAST_PERIOD: usize = 50;
pub const SLOW_PERIOD: usize = 200;
pub const DEFAULT_LOOKBACK: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CrossState {
    Golden,
    Death,
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossReading {
    pub state: CrossState,
    pub sma_fast: f64,
    pub sma_slow: f64,
}

/// A sign change of SMA50 - SMA200 between any of the previous `lookback`
/// bars and the last bar is a cross; otherwise the current relative position
/// is reported. Needs `SLOW_PERIOD` bars.
pub fn detect_cross(bars: &[PriceBar], lookback: usize) -> Reading<CrossReading> {
    if bars.len() < SLOW_PERIOD {
        return Reading::Indeterminate {
            bars: bars.len(),
            minimum: SLOW_PERIOD,
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let fast = sma_values(&closes, FAST_PERIOD);
    let slow = sma_values(&closes, SLOW_PERIOD);
    let diff: Vec<Option<f64>> = fast
        .iter()
        .zip(&slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let n = bars.len();
    let (Some(sma_fast), Some(sma_slow)) = (fast[n - 1], slow[n - 1]) else {
        return Reading::Indeterminate {
            bars: n,
            minimum: SLOW_PERIOD,
        };
    };
    let current = sma_fast - sma_slow;

    let crossed = (2..=lookback + 1)
        .filter_map(|back| n.checked_sub(back).and_then(|i| diff[i]))
        .find_map(|previous| {
            if previous < 0.0 && current > 0.0 {
                Some(CrossState::Golden)
            } else if previous > 0.0 && current < 0.0 {
                Some(CrossState::Death)
            } else {
                None
            }
        });

    let state = crossed.unwrap_or(if current > 0.0 {
        CrossState::Above
    } else {
        CrossState::Below
    });

    Reading::Ready(CrossReading {
        state,
        sma_fast,
        sma_slow,
    })
}
