//! Parabolic SAR as a two-state machine folded over the bars.
//!
//! Each state carries the stop (`sar`), the extreme point of the current
//! trend (`ep`) and the acceleration factor (`af`). A bar that pierces the
//! stop flips the state; the new stop is the old extreme point and the
//! acceleration resets.

use crate::domain::indicator::Reading;
use crate::domain::ohlcv::PriceBar;
use serde::Serialize;

pub const MINIMUM_BARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SarParams {
    pub af_start: f64,
    pub af_step: f64,
    pub af_max: f64,
}

impl Default for SarParams {
    fn default() -> Self {
        Self {
            af_start: 0.02,
            af_step: 0.02,
            af_max: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SarState {
    Uptrend { sar: f64, ep: f64, af: f64 },
    Downtrend { sar: f64, ep: f64, af: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SarDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SarReading {
    pub value: f64,
    pub direction: SarDirection,
}

impl SarState {
    /// Seed from the first two bars; direction follows their closes.
    pub fn seed(first: &PriceBar, second: &PriceBar, params: &SarParams) -> Self {
        if second.close >= first.close {
            SarState::Uptrend {
                sar: first.low.min(second.low),
                ep: first.high.max(second.high),
                af: params.af_start,
            }
        } else {
            SarState::Downtrend {
                sar: first.high.max(second.high),
                ep: first.low.min(second.low),
                af: params.af_start,
            }
        }
    }

    /// Advance by one bar given the two bars before it.
    pub fn step(
        self,
        before_prev: &PriceBar,
        prev: &PriceBar,
        bar: &PriceBar,
        params: &SarParams,
    ) -> Self {
        match self {
            SarState::Uptrend { sar, ep, af } => {
                let next = (sar + af * (ep - sar)).min(prev.low).min(before_prev.low);
                if bar.low < next {
                    SarState::Downtrend {
                        sar: ep,
                        ep: bar.low,
                        af: params.af_start,
                    }
                } else if bar.high > ep {
                    SarState::Uptrend {
                        sar: next,
                        ep: bar.high,
                        af: (af + params.af_step).min(params.af_max),
                    }
                } else {
                    SarState::Uptrend { sar: next, ep, af }
                }
            }
            SarState::Downtrend { sar, ep, af } => {
                let next = (sar + af * (ep - sar)).max(prev.high).max(before_prev.high);
                if bar.high > next {
                    SarState::Uptrend {
                        sar: ep,
                        ep: bar.high,
                        af: params.af_start,
                    }
                } else if bar.low < ep {
                    SarState::Downtrend {
                        sar: next,
                        ep: bar.low,
                        af: (af + params.af_step).min(params.af_max),
                    }
                } else {
                    SarState::Downtrend { sar: next, ep, af }
                }
            }
        }
    }

    pub fn reading(&self) -> SarReading {
        match *self {
            SarState::Uptrend { sar, .. } => SarReading {
                value: sar,
                direction: SarDirection::Up,
            },
            SarState::Downtrend { sar, .. } => SarReading {
                value: sar,
                direction: SarDirection::Down,
            },
        }
    }
}

/// Final state after folding over every bar, `None` below `MINIMUM_BARS`.
pub fn fold_sar(bars: &[PriceBar], params: &SarParams) -> Option<SarState> {
    if bars.len() < MINIMUM_BARS {
        return None;
    }
    let seed = SarState::seed(&bars[0], &bars[1], params);
    Some(
        bars.windows(3)
            .fold(seed, |state, w| state.step(&w[0], &w[1], &w[2], params)),
    )
}

pub fn latest_sar(bars: &[PriceBar], params: &SarParams) -> Reading<SarReading> {
    match fold_sar(bars, params) {
        Some(state) => Reading::Ready(state.reading()),
        None => Reading::Indeterminate {
            bars: bars.len(),
            minimum: MINIMUM_BARS,
        },
    }
}
