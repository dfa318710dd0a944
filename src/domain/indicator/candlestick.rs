//! Candlestick pattern recognition over the last three bars.

use crate::domain::indicator::Reading;
use crate::domain::ohlcv::PriceBar;
use serde::Serialize;
use std::fmt;

pub const MINIMUM_BARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum CandlePattern {
    Hammer,
    ShootingStar,
    Doji,
    BullishEngulfing,
    BearishEngulfing,
    MorningStar,
    EveningStar,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternBias {
    Bullish,
    Bearish,
    Neutral,
}

impl CandlePattern {
    pub fn bias(&self) -> PatternBias {
        match self {
            CandlePattern::Hammer
            | CandlePattern::BullishEngulfing
            | CandlePattern::MorningStar
            | CandlePattern::ThreeWhiteSoldiers => PatternBias::Bullish,
            CandlePattern::ShootingStar
            | CandlePattern::BearishEngulfing
            | CandlePattern::EveningStar
            | CandlePattern::ThreeBlackCrows => PatternBias::Bearish,
            CandlePattern::Doji => PatternBias::Neutral,
        }
    }
}

impl fmt::Display for CandlePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CandlePattern::Hammer => "hammer",
            CandlePattern::ShootingStar => "shooting_star",
            CandlePattern::Doji => "doji",
            CandlePattern::BullishEngulfing => "bullish_engulfing",
            CandlePattern::BearishEngulfing => "bearish_engulfing",
            CandlePattern::MorningStar => "morning_star",
            CandlePattern::EveningStar => "evening_star",
            CandlePattern::ThreeWhiteSoldiers => "three_white_soldiers",
            CandlePattern::ThreeBlackCrows => "three_black_crows",
        };
        write!(f, "{}", name)
    }
}

/// Patterns completed by the last bar, in declaration order.
pub fn detect_patterns(bars: &[PriceBar]) -> Reading<Vec<CandlePattern>> {
    if bars.len() < MINIMUM_BARS {
        return Reading::Indeterminate {
            bars: bars.len(),
            minimum: MINIMUM_BARS,
        };
    }

    let n = bars.len();
    let (b3, b2, b1) = (&bars[n - 3], &bars[n - 2], &bars[n - 1]);
    let mut found = Vec::new();

    if b1.range() > 0.0 {
        let body = b1.body();
        if b1.lower_wick() >= 2.0 * body && b1.upper_wick() < body * 0.3 {
            found.push(CandlePattern::Hammer);
        }
        if b1.upper_wick() >= 2.0 * body && b1.lower_wick() < body * 0.3 {
            found.push(CandlePattern::ShootingStar);
        }
        if body < b1.range() * 0.1 {
            found.push(CandlePattern::Doji);
        }
    }

    if b2.is_bearish() && b1.is_bullish() && b1.open < b2.close && b1.close > b2.open {
        found.push(CandlePattern::BullishEngulfing);
    }
    if b2.is_bullish() && b1.is_bearish() && b1.open > b2.close && b1.close < b2.open {
        found.push(CandlePattern::BearishEngulfing);
    }

    let first_is_long = b3.range() > 0.0 && b3.body() > b3.range() * 0.5;
    let middle_is_small = b2.body() < b2.range() * 0.3;
    let first_mid = (b3.open + b3.close) / 2.0;
    if first_is_long && middle_is_small {
        if b3.is_bearish() && b1.is_bullish() && b1.close > first_mid {
            found.push(CandlePattern::MorningStar);
        }
        if b3.is_bullish() && b1.is_bearish() && b1.close < first_mid {
            found.push(CandlePattern::EveningStar);
        }
    }

    if [b3, b2, b1].iter().all(|b| b.is_bullish())
        && b1.close > b2.close
        && b2.close > b3.close
        && b1.open > b2.open
        && b2.open > b3.open
    {
        found.push(CandlePattern::ThreeWhiteSoldiers);
    }
    if [b3, b2, b1].iter().all(|b| b.is_bearish())
        && b1.close < b2.close
        && b2.close < b3.close
        && b1.open < b2.open
        && b2.open < b3.open
    {
        found.push(CandlePattern::ThreeBlackCrows);
    }

    Reading::Ready(found)
}
