//! Technical indicator library.
//!
//! Two shapes of output live here:
//! - `IndicatorSeries`: a per-bar series with a validity flag, built by the
//!   multi-value indicators (ATR, MACD, stochastic, Bollinger) and read back
//!   through `last_valid`
//! - `Reading<T>`: the latest value of an indicator, or an explicit
//!   `Indeterminate` marker when the bar window is shorter than the
//!   indicator's minimum. Readings never carry NaN.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod candlestick;
pub mod cross;
pub mod divergence;
pub mod ema;
pub mod ichimoku;
pub mod levels;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod sar;
pub mod sma;
pub mod stddev;
pub mod stochastic;

use chrono::NaiveDate;
use serde::Serialize;

/// Substituted for a zero denominator (RSI average loss, ATR, average volume).
pub const EPSILON: f64 = 1e-10;

/// Latest value of an indicator over a bar window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Reading<T> {
    Ready(T),
    Indeterminate { bars: usize, minimum: usize },
}

impl<T> Reading<T> {
    /// `Indeterminate` when `bars < minimum`, otherwise the value built by `f`.
    pub fn gate(bars: usize, minimum: usize, f: impl FnOnce() -> T) -> Self {
        if bars < minimum {
            Reading::Indeterminate { bars, minimum }
        } else {
            Reading::Ready(f())
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Reading::Ready(_))
    }

    pub fn as_ref(&self) -> Reading<&T> {
        match self {
            Reading::Ready(v) => Reading::Ready(v),
            Reading::Indeterminate { bars, minimum } => Reading::Indeterminate {
                bars: *bars,
                minimum: *minimum,
            },
        }
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Reading::Ready(v) => Some(v),
            Reading::Indeterminate { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        match self {
            Reading::Ready(v) => Reading::Ready(f(v)),
            Reading::Indeterminate { bars, minimum } => Reading::Indeterminate { bars, minimum },
        }
    }
}

impl<T: Copy> Reading<T> {
    pub fn get(&self) -> Option<T> {
        match self {
            Reading::Ready(v) => Some(*v),
            Reading::Indeterminate { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Stochastic {
        k: f64,
        d: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Atr(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The last point, if it is valid.
    pub fn last_valid(&self) -> Option<&IndicatorPoint> {
        self.values.last().filter(|p| p.valid)
    }
}
