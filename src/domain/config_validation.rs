//! Configuration loading and validation.
//!
//! Every value is read as a string and parsed here so a malformed number is
//! reported as `ConfigInvalid` instead of silently falling back to a default.

use crate::domain::correlation::CorrelationParams;
use crate::domain::error::RiskfuseError;
use crate::domain::policy::RiskPolicy;
use crate::domain::screening::ScreeningParams;
use crate::domain::snapshot::SnapshotParams;
use crate::ports::config_port::ConfigPort;
use std::str::FromStr;

pub const DEFAULT_PROFILE: &str = "balanced";

/// Everything a run needs from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub policy: RiskPolicy,
    pub snapshot: SnapshotParams,
    pub correlation: CorrelationParams,
    pub screening: ScreeningParams,
}

fn read<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, RiskfuseError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            RiskfuseError::invalid(section, key, format!("'{}' is not a valid number", raw.trim()))
        }),
    }
}

fn override_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    target: &mut f64,
) -> Result<(), RiskfuseError> {
    if let Some(v) = read::<f64>(config, section, key)? {
        *target = v;
    }
    Ok(())
}

/// A number, or `none` to clear the value.
fn override_optional_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    target: &mut Option<f64>,
) -> Result<(), RiskfuseError> {
    match config.get_string(section, key) {
        Some(raw) if raw.trim().eq_ignore_ascii_case("none") => *target = None,
        _ => {
            if let Some(v) = read::<f64>(config, section, key)? {
                *target = Some(v);
            }
        }
    }
    Ok(())
}

fn override_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    target: &mut usize,
) -> Result<(), RiskfuseError> {
    if let Some(v) = read::<usize>(config, section, key)? {
        *target = v;
    }
    Ok(())
}

fn require_min(section: &str, key: &str, value: usize, min: usize) -> Result<(), RiskfuseError> {
    if value < min {
        return Err(RiskfuseError::invalid(
            section,
            key,
            format!("{} must be at least {}", key, min),
        ));
    }
    Ok(())
}

/// Named preset from `profile_override` or `[policy] profile`, with per-field
/// overrides from `[policy]` applied on top.
pub fn load_policy(
    config: &dyn ConfigPort,
    profile_override: Option<&str>,
) -> Result<RiskPolicy, RiskfuseError> {
    let name = profile_override
        .map(str::to_string)
        .or_else(|| config.get_string("policy", "profile"))
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
    let mut policy = RiskPolicy::from_name(&name)?;

    let s = "policy";
    override_f64(config, s, "min_score_threshold", &mut policy.min_score_threshold)?;
    override_f64(config, s, "max_single_weight_pct", &mut policy.max_single_weight_pct)?;
    override_f64(config, s, "max_sector_weight_pct", &mut policy.max_sector_weight_pct)?;
    override_f64(
        config,
        s,
        "max_correlated_weight_pct",
        &mut policy.max_correlated_weight_pct,
    )?;
    override_f64(config, s, "correlation_threshold", &mut policy.correlation_threshold)?;
    override_f64(config, s, "min_cash_pct", &mut policy.min_cash_pct)?;
    override_f64(config, s, "max_invested_pct", &mut policy.max_invested_pct)?;
    override_usize(config, s, "min_positions", &mut policy.min_positions)?;
    override_optional_f64(config, s, "min_sharpe_floor", &mut policy.min_sharpe_floor)?;
    override_f64(config, s, "kelly_multiplier", &mut policy.kelly_multiplier)?;
    override_f64(
        config,
        s,
        "low_sharpe_weight_cap_pct",
        &mut policy.low_sharpe_weight_cap_pct,
    )?;
    override_f64(config, s, "target_fallback_pct", &mut policy.target_fallback_pct)?;
    override_f64(config, s, "stop_atr_multiple", &mut policy.stop_atr_multiple)?;
    override_f64(config, s, "stop_fallback_pct", &mut policy.stop_fallback_pct)?;
    override_f64(config, s, "veto_sharpe_floor", &mut policy.veto.sharpe_floor)?;
    override_f64(config, s, "veto_technical_floor", &mut policy.veto.technical_floor)?;
    override_f64(config, s, "veto_decline_pct", &mut policy.veto.decline_pct)?;

    policy.validate()?;

    if policy.max_invested_pct + policy.min_cash_pct > 100.0 {
        tracing::warn!(
            max_invested_pct = policy.max_invested_pct,
            min_cash_pct = policy.min_cash_pct,
            effective_cap = policy.invested_cap(),
            "invested cap and cash floor overlap; the cash floor wins"
        );
    }
    Ok(policy)
}

pub fn load_snapshot_params(config: &dyn ConfigPort) -> Result<SnapshotParams, RiskfuseError> {
    let s = "indicators";
    let mut params = SnapshotParams::default();
    override_f64(config, s, "risk_free_rate", &mut params.risk_free_rate)?;
    override_usize(config, s, "decline_lookback", &mut params.decline_lookback)?;
    override_usize(config, s, "divergence_window", &mut params.divergence_window)?;
    override_usize(config, s, "cross_lookback", &mut params.cross_lookback)?;

    if !(0.0..1.0).contains(&params.risk_free_rate) {
        return Err(RiskfuseError::invalid(
            s,
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    require_min(s, "decline_lookback", params.decline_lookback, 1)?;
    require_min(s, "divergence_window", params.divergence_window, 2)?;
    require_min(s, "cross_lookback", params.cross_lookback, 1)?;
    Ok(params)
}

pub fn load_correlation_params(
    config: &dyn ConfigPort,
) -> Result<CorrelationParams, RiskfuseError> {
    let s = "correlation";
    let mut params = CorrelationParams::default();
    override_usize(config, s, "window", &mut params.window)?;
    override_usize(config, s, "min_overlap", &mut params.min_overlap)?;

    require_min(s, "window", params.window, 2)?;
    require_min(s, "min_overlap", params.min_overlap, 2)?;
    if params.min_overlap > params.window {
        return Err(RiskfuseError::invalid(
            s,
            "min_overlap",
            "min_overlap must not exceed window",
        ));
    }
    Ok(params)
}

pub fn load_screening_params(config: &dyn ConfigPort) -> Result<ScreeningParams, RiskfuseError> {
    let s = "screening";
    let mut params = ScreeningParams::default();
    override_usize(config, s, "limit", &mut params.limit)?;
    override_f64(
        config,
        s,
        "manipulation_threshold",
        &mut params.manipulation_threshold,
    )?;
    override_f64(config, s, "bubble_threshold", &mut params.bubble_threshold)?;

    require_min(s, "limit", params.limit, 1)?;
    for (key, v) in [
        ("manipulation_threshold", params.manipulation_threshold),
        ("bubble_threshold", params.bubble_threshold),
    ] {
        if !(0.0..=100.0).contains(&v) {
            return Err(RiskfuseError::invalid(
                s,
                key,
                format!("{} must be between 0 and 100", key),
            ));
        }
    }
    Ok(params)
}

pub fn load_settings(
    config: &dyn ConfigPort,
    profile_override: Option<&str>,
) -> Result<Settings, RiskfuseError> {
    Ok(Settings {
        policy: load_policy(config, profile_override)?,
        snapshot: load_snapshot_params(config)?,
        correlation: load_correlation_params(config)?,
        screening: load_screening_params(config)?,
    })
}
