//! Named risk policies.
//!
//! A [`RiskPolicy`] is an immutable value selected once per run and passed
//! explicitly to the enforcer and the audit.

use crate::domain::error::RiskfuseError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    Conservative,
    Balanced,
    Aggressive,
}

impl RiskProfile {
    pub const ALL: [RiskProfile; 3] = [
        RiskProfile::Conservative,
        RiskProfile::Balanced,
        RiskProfile::Aggressive,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RiskProfile::Conservative => "conservative",
            RiskProfile::Balanced => "balanced",
            RiskProfile::Aggressive => "aggressive",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, RiskfuseError> {
        let wanted = name.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| RiskfuseError::UnknownProfile {
                name: name.to_string(),
            })
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Conjunctions of bearish signals that force WAIT regardless of score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VetoThresholds {
    /// Sharpe below this counts as bearish when paired with a weak technical score.
    pub sharpe_floor: f64,
    pub technical_floor: f64,
    /// Period change (percent) below this counts as a sustained decline.
    pub decline_pct: f64,
}

impl Default for VetoThresholds {
    fn default() -> Self {
        Self {
            sharpe_floor: -1.5,
            technical_floor: 65.0,
            decline_pct: -15.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskPolicy {
    pub name: String,
    pub min_score_threshold: f64,
    pub max_single_weight_pct: f64,
    pub max_sector_weight_pct: f64,
    pub max_correlated_weight_pct: f64,
    pub correlation_threshold: f64,
    pub min_cash_pct: f64,
    pub max_invested_pct: f64,
    pub min_positions: usize,
    /// BUYs with a Sharpe below this are capped at `low_sharpe_weight_cap_pct`.
    /// `None` disables the cap.
    pub min_sharpe_floor: Option<f64>,
    pub kelly_multiplier: f64,
    pub low_sharpe_weight_cap_pct: f64,
    pub target_fallback_pct: f64,
    pub stop_atr_multiple: f64,
    pub stop_fallback_pct: f64,
    pub veto: VetoThresholds,
}

impl RiskPolicy {
    pub fn preset(profile: RiskProfile) -> Self {
        let (min_score, single, cash, invested, kelly, sharpe_floor) = match profile {
            RiskProfile::Conservative => (70.0, 10.0, 20.0, 80.0, 0.4, Some(0.0)),
            RiskProfile::Balanced => (55.0, 18.0, 10.0, 90.0, 0.7, Some(-0.5)),
            RiskProfile::Aggressive => (45.0, 30.0, 5.0, 95.0, 1.0, None),
        };
        Self {
            name: profile.name().to_string(),
            min_score_threshold: min_score,
            max_single_weight_pct: single,
            max_sector_weight_pct: 30.0,
            max_correlated_weight_pct: 12.0,
            correlation_threshold: 0.85,
            min_cash_pct: cash,
            max_invested_pct: invested,
            min_positions: 5,
            min_sharpe_floor: sharpe_floor,
            kelly_multiplier: kelly,
            low_sharpe_weight_cap_pct: 5.0,
            target_fallback_pct: 8.0,
            stop_atr_multiple: 2.0,
            stop_fallback_pct: 5.0,
            veto: VetoThresholds::default(),
        }
    }

    pub fn from_name(name: &str) -> Result<Self, RiskfuseError> {
        RiskProfile::from_name(name).map(Self::preset)
    }

    /// Largest total BUY weight both the invested cap and the cash floor allow.
    pub fn invested_cap(&self) -> f64 {
        self.max_invested_pct.min(100.0 - self.min_cash_pct).max(0.0)
    }

    pub fn validate(&self) -> Result<(), RiskfuseError> {
        let pct = |key: &str, v: f64| -> Result<(), RiskfuseError> {
            if v.is_finite() && (0.0..=100.0).contains(&v) {
                Ok(())
            } else {
                Err(RiskfuseError::invalid(
                    "policy",
                    key,
                    format!("{} must be between 0 and 100", key),
                ))
            }
        };
        pct("min_score_threshold", self.min_score_threshold)?;
        pct("max_single_weight_pct", self.max_single_weight_pct)?;
        pct("max_sector_weight_pct", self.max_sector_weight_pct)?;
        pct("max_correlated_weight_pct", self.max_correlated_weight_pct)?;
        pct("min_cash_pct", self.min_cash_pct)?;
        pct("max_invested_pct", self.max_invested_pct)?;
        pct("low_sharpe_weight_cap_pct", self.low_sharpe_weight_cap_pct)?;

        if !(self.correlation_threshold > 0.0 && self.correlation_threshold <= 1.0) {
            return Err(RiskfuseError::invalid(
                "policy",
                "correlation_threshold",
                "correlation_threshold must be in (0, 1]",
            ));
        }
        if !(self.target_fallback_pct.is_finite() && self.target_fallback_pct > 0.0) {
            return Err(RiskfuseError::invalid(
                "policy",
                "target_fallback_pct",
                "target_fallback_pct must be positive",
            ));
        }
        if !(self.stop_fallback_pct > 0.0 && self.stop_fallback_pct < 100.0) {
            return Err(RiskfuseError::invalid(
                "policy",
                "stop_fallback_pct",
                "stop_fallback_pct must be in (0, 100)",
            ));
        }
        if !(self.stop_atr_multiple.is_finite() && self.stop_atr_multiple > 0.0) {
            return Err(RiskfuseError::invalid(
                "policy",
                "stop_atr_multiple",
                "stop_atr_multiple must be positive",
            ));
        }
        if !(self.kelly_multiplier.is_finite() && self.kelly_multiplier > 0.0) {
            return Err(RiskfuseError::invalid(
                "policy",
                "kelly_multiplier",
                "kelly_multiplier must be positive",
            ));
        }
        if self.min_sharpe_floor.is_some_and(|f| !f.is_finite()) {
            return Err(RiskfuseError::invalid(
                "policy",
                "min_sharpe_floor",
                "min_sharpe_floor must be a finite number or none",
            ));
        }
        if self.veto.sharpe_floor.is_nan()
            || self.veto.technical_floor.is_nan()
            || self.veto.decline_pct.is_nan()
        {
            return Err(RiskfuseError::invalid(
                "policy",
                "veto",
                "veto thresholds must be numbers",
            ));
        }
        Ok(())
    }
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self::preset(RiskProfile::Balanced)
    }
}
