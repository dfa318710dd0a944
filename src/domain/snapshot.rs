//! Per-instrument indicator snapshot.
//!
//! Everything the scoring engine and the constraint enforcer read about an
//! instrument at one point in time, computed from its bar history alone.

use crate::domain::indicator::adx::{self, AdxReading};
use crate::domain::indicator::atr;
use crate::domain::indicator::bollinger::{self, BollingerReading};
use crate::domain::indicator::candlestick::{CandlePattern, detect_patterns};
use crate::domain::indicator::cross::{self, CrossReading, detect_cross};
use crate::domain::indicator::divergence::{self, DivergenceSet, divergences};
use crate::domain::indicator::ichimoku::{IchimokuReading, latest_ichimoku};
use crate::domain::indicator::levels::{
    FibonacciLevels, SupportResistance, fibonacci, support_resistance,
};
use crate::domain::indicator::macd::{self, MacdReading, latest_macd};
use crate::domain::indicator::obv::{self, obv_trend};
use crate::domain::indicator::rsi::{self, latest_rsi};
use crate::domain::indicator::sar::{SarParams, SarReading, latest_sar};
use crate::domain::indicator::sma::trailing_mean;
use crate::domain::indicator::stochastic::{self, StochasticReading, latest_stochastic};
use crate::domain::indicator::Reading;
use crate::domain::metrics::{
    KellyParams, annualized_return, annualized_volatility, daily_returns, kelly_fraction,
    max_drawdown, sharpe_ratio,
};
use crate::domain::ohlcv::{PriceBar, closes};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotParams {
    /// Annual risk-free rate as a fraction.
    pub risk_free_rate: f64,
    /// Bars spanned by `period_change_pct`.
    pub decline_lookback: usize,
    pub divergence_window: usize,
    pub cross_lookback: usize,
    pub sar: SarParams,
    pub kelly: KellyParams,
}

impl Default for SnapshotParams {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.05,
            decline_lookback: 126,
            divergence_window: divergence::DEFAULT_WINDOW,
            cross_lookback: cross::DEFAULT_LOOKBACK,
            sar: SarParams::default(),
            kelly: KellyParams::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub code: String,
    pub bars: usize,
    pub last_price: Option<f64>,
    pub change_1d_pct: Reading<f64>,
    pub period_change_pct: Reading<f64>,
    pub sma_fast: Reading<f64>,
    pub sma_slow: Reading<f64>,
    pub rsi: Reading<f64>,
    pub macd: Reading<MacdReading>,
    pub bollinger: Reading<BollingerReading>,
    pub stochastic: Reading<StochasticReading>,
    pub atr: Reading<f64>,
    pub adx: Reading<AdxReading>,
    pub obv_trend: Reading<f64>,
    pub levels: Reading<SupportResistance>,
    pub fibonacci: Reading<FibonacciLevels>,
    pub ichimoku: Reading<IchimokuReading>,
    pub sar: Reading<SarReading>,
    pub divergence: DivergenceSet,
    pub patterns: Reading<Vec<CandlePattern>>,
    pub cross: Reading<CrossReading>,
    pub sharpe: Reading<f64>,
    pub max_drawdown: Reading<f64>,
    pub annualized_return: Reading<f64>,
    pub annualized_volatility: Reading<f64>,
    pub kelly_fraction: Reading<f64>,
}

fn pct_change(closes: &[f64], back: usize) -> Reading<f64> {
    let n = closes.len();
    Reading::gate(n, back + 1, || {
        let base = closes[n - 1 - back];
        if base > 0.0 {
            (closes[n - 1] / base - 1.0) * 100.0
        } else {
            0.0
        }
    })
}

/// Compute every reading for one instrument. Bars must be in date order.
pub fn compute(code: &str, bars: &[PriceBar], params: &SnapshotParams) -> IndicatorSnapshot {
    let closes = closes(bars);
    let returns = daily_returns(&closes);

    let annualized_return_r = Reading::gate(closes.len(), 2, || annualized_return(&returns));
    let annualized_volatility_r =
        Reading::gate(closes.len(), 2, || annualized_volatility(&returns));
    let kelly = match (annualized_return_r, annualized_volatility_r) {
        (Reading::Ready(mu), Reading::Ready(sigma)) => Reading::Ready(kelly_fraction(
            mu,
            sigma,
            params.risk_free_rate,
            &params.kelly,
        )),
        _ => Reading::Indeterminate {
            bars: closes.len(),
            minimum: 2,
        },
    };

    let sma = |period: usize| match trailing_mean(&closes, period) {
        Some(v) => Reading::Ready(v),
        None => Reading::Indeterminate {
            bars: closes.len(),
            minimum: period,
        },
    };

    IndicatorSnapshot {
        code: code.to_string(),
        bars: bars.len(),
        last_price: closes.last().copied(),
        change_1d_pct: pct_change(&closes, 1),
        period_change_pct: pct_change(&closes, params.decline_lookback),
        sma_fast: sma(cross::FAST_PERIOD),
        sma_slow: sma(cross::SLOW_PERIOD),
        rsi: latest_rsi(bars, rsi::DEFAULT_PERIOD),
        macd: latest_macd(bars, macd::DEFAULT_FAST, macd::DEFAULT_SLOW, macd::DEFAULT_SIGNAL),
        bollinger: bollinger::latest_bollinger(
            bars,
            bollinger::DEFAULT_PERIOD,
            bollinger::DEFAULT_STDDEV_MULT_X100,
        ),
        stochastic: latest_stochastic(
            bars,
            stochastic::DEFAULT_K_PERIOD,
            stochastic::DEFAULT_D_PERIOD,
        ),
        atr: atr::latest_atr(bars, atr::DEFAULT_PERIOD),
        adx: adx::latest_adx(bars, adx::DEFAULT_PERIOD),
        obv_trend: obv_trend(bars, obv::DEFAULT_TREND_LOOKBACK),
        levels: support_resistance(bars),
        fibonacci: fibonacci(bars),
        ichimoku: latest_ichimoku(bars),
        sar: latest_sar(bars, &params.sar),
        divergence: divergences(bars, params.divergence_window),
        patterns: detect_patterns(bars),
        cross: detect_cross(bars, params.cross_lookback),
        sharpe: sharpe_ratio(&closes, params.risk_free_rate),
        max_drawdown: max_drawdown(&closes),
        annualized_return: annualized_return_r,
        annualized_volatility: annualized_volatility_r,
        kelly_fraction: kelly,
    }
}
