//! Invariant audit over a final allocation.
//!
//! Independent of the enforcer: it recomputes every invariant from the
//! allocation, the candidates and the policy and reports what it observed.

use crate::domain::allocation::{Action, Allocation};
use crate::domain::correlation::CorrelationResult;
use crate::domain::enforcer::Candidate;
use crate::domain::fundamentals::InstrumentClass;
use crate::domain::policy::RiskPolicy;
use serde::Serialize;
use std::collections::BTreeMap;

/// Slack allowed when comparing a summed weight against a limit.
const TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditRule {
    SingleWeight,
    SectorWeight,
    CorrelatedWeight,
    InvestedTotal,
    CashFloor,
    CashIdentity,
    ScoreThreshold,
    TargetAbovePrice,
    StopBelowPrice,
    MinimumPositions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Scope {
    Instrument(String),
    Sector(String),
    Portfolio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Breach,
    Advisory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub rule: AuditRule,
    pub scope: Scope,
    pub observed: f64,
    pub limit: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub policy: String,
    /// Number of individual checks evaluated.
    pub checks: usize,
    pub violations: Vec<Violation>,
}

impl AuditReport {
    pub fn is_compliant(&self) -> bool {
        !self
            .violations
            .iter()
            .any(|v| v.severity == Severity::Breach)
    }

    pub fn breaches(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Breach)
    }
}

struct Auditor {
    checks: usize,
    violations: Vec<Violation>,
}

impl Auditor {
    /// Record one check; `ok` false adds a violation.
    fn check(&mut self, ok: bool, rule: AuditRule, scope: Scope, observed: f64, limit: f64) {
        self.check_with(ok, rule, scope, observed, limit, Severity::Breach);
    }

    fn check_with(
        &mut self,
        ok: bool,
        rule: AuditRule,
        scope: Scope,
        observed: f64,
        limit: f64,
        severity: Severity,
    ) {
        self.checks += 1;
        if !ok {
            self.violations.push(Violation {
                rule,
                scope,
                observed,
                limit,
                severity,
            });
        }
    }
}

pub fn audit(
    allocation: &Allocation,
    candidates: &BTreeMap<String, Candidate>,
    correlation: &CorrelationResult,
    policy: &RiskPolicy,
) -> AuditReport {
    let mut a = Auditor {
        checks: 0,
        violations: Vec::new(),
    };

    for d in allocation.buys() {
        let scope = || Scope::Instrument(d.code.clone());

        a.check(
            d.weight_pct <= policy.max_single_weight_pct + TOLERANCE,
            AuditRule::SingleWeight,
            scope(),
            d.weight_pct,
            policy.max_single_weight_pct,
        );

        if correlation.has_correlated_partner(&d.code, policy.correlation_threshold) {
            a.check(
                d.weight_pct <= policy.max_correlated_weight_pct + TOLERANCE,
                AuditRule::CorrelatedWeight,
                scope(),
                d.weight_pct,
                policy.max_correlated_weight_pct,
            );
        }

        let candidate = candidates.get(&d.code);
        let total = candidate.map_or(f64::NEG_INFINITY, |c| c.score.total_score);
        a.check(
            total >= policy.min_score_threshold,
            AuditRule::ScoreThreshold,
            scope(),
            total,
            policy.min_score_threshold,
        );

        let price = candidate.and_then(Candidate::price).unwrap_or(f64::NAN);
        let target = d.target_price.unwrap_or(f64::NAN);
        a.check(
            target > price,
            AuditRule::TargetAbovePrice,
            scope(),
            target,
            price,
        );
        let stop = d.stop_price.unwrap_or(f64::NAN);
        a.check(
            stop < price && stop > 0.0,
            AuditRule::StopBelowPrice,
            scope(),
            stop,
            price,
        );
    }

    let mut sectors: BTreeMap<InstrumentClass, f64> = BTreeMap::new();
    for d in allocation.buys() {
        match candidates.get(&d.code) {
            Some(c) if c.class.is_sector() => *sectors.entry(c.class).or_default() += d.weight_pct,
            _ => {}
        }
    }
    for (class, sum) in &sectors {
        a.check(
            *sum <= policy.max_sector_weight_pct + TOLERANCE,
            AuditRule::SectorWeight,
            Scope::Sector(class.to_string()),
            *sum,
            policy.max_sector_weight_pct,
        );
    }

    let invested: f64 = allocation.buys().map(|d| d.weight_pct).sum();
    a.check(
        invested <= policy.max_invested_pct + TOLERANCE,
        AuditRule::InvestedTotal,
        Scope::Portfolio,
        invested,
        policy.max_invested_pct,
    );
    a.check(
        allocation.cash_pct + TOLERANCE >= policy.min_cash_pct,
        AuditRule::CashFloor,
        Scope::Portfolio,
        allocation.cash_pct,
        policy.min_cash_pct,
    );
    a.check(
        (allocation.cash_pct - (100.0 - invested)).abs() <= TOLERANCE,
        AuditRule::CashIdentity,
        Scope::Portfolio,
        allocation.cash_pct,
        100.0 - invested,
    );

    let positions = allocation
        .decisions
        .iter()
        .filter(|d| matches!(d.action, Action::Buy | Action::Hold))
        .count();
    a.check_with(
        positions >= policy.min_positions,
        AuditRule::MinimumPositions,
        Scope::Portfolio,
        positions as f64,
        policy.min_positions as f64,
        Severity::Advisory,
    );

    tracing::info!(
        checks = a.checks,
        violations = a.violations.len(),
        "audit complete"
    );

    AuditReport {
        policy: policy.name.clone(),
        checks: a.checks,
        violations: a.violations,
    }
}
