//! Per-instrument risk metrics over a close series.

use crate::domain::indicator::Reading;
use crate::domain::indicator::stddev::population_stddev;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Fewest daily returns accepted for a Sharpe ratio.
pub const SHARPE_MIN_RETURNS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KellyParams {
    /// Fraction of full Kelly applied (0.5 = half-Kelly).
    pub scale: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for KellyParams {
    fn default() -> Self {
        Self {
            scale: 0.5,
            floor: 0.02,
            ceiling: 0.25,
        }
    }
}

/// Simple returns between consecutive closes; a non-positive previous close
/// contributes 0.
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

pub fn annualized_return(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    returns.iter().sum::<f64>() / returns.len() as f64 * TRADING_DAYS_PER_YEAR
}

pub fn annualized_volatility(returns: &[f64]) -> f64 {
    population_stddev(returns) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// (annualized mean return - risk_free) / annualized std. Zero volatility
/// reads 0.
pub fn sharpe_ratio(closes: &[f64], risk_free_rate: f64) -> Reading<f64> {
    Reading::gate(closes.len(), SHARPE_MIN_RETURNS + 1, || {
        let returns = daily_returns(closes);
        let vol = annualized_volatility(&returns);
        if vol > 0.0 {
            (annualized_return(&returns) - risk_free_rate) / vol
        } else {
            0.0
        }
    })
}

/// min((price - running_max) / running_max) as a non-positive fraction.
pub fn max_drawdown(closes: &[f64]) -> Reading<f64> {
    Reading::gate(closes.len(), 1, || {
        let mut peak = f64::MIN;
        let mut worst = 0.0_f64;
        for &c in closes {
            peak = peak.max(c);
            if peak > 0.0 {
                worst = worst.min((c - peak) / peak);
            }
        }
        worst
    })
}

/// Scaled Kelly fraction (mu - r) / sigma^2, clamped to [floor, ceiling].
/// Zero volatility reads the floor.
pub fn kelly_fraction(
    expected_return: f64,
    volatility: f64,
    risk_free_rate: f64,
    params: &KellyParams,
) -> f64 {
    if volatility <= 0.0 {
        return params.floor;
    }
    let full = (expected_return - risk_free_rate) / (volatility * volatility);
    (full * params.scale).clamp(params.floor, params.ceiling)
}
