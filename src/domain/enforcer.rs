//! Constraint enforcer.
//!
//! Rewrites an untrusted allocation proposal into one that satisfies the
//! risk policy. Passes run in a fixed order over the whole list; each pass
//! only tightens what earlier passes produced, so feeding the output back in
//! changes nothing.
//!
//! Malformed entries never fail the run: they become WAIT with zero weight and
//! the anomaly is noted in the rationale.

use crate::domain::allocation::{Action, Allocation, AllocationProposal, FinalAllocation};
use crate::domain::correlation::CorrelationResult;
use crate::domain::fundamentals::InstrumentClass;
use crate::domain::indicator::Reading;
use crate::domain::indicator::cross::CrossState;
use crate::domain::indicator::ichimoku::CloudState;
use crate::domain::indicator::sar::SarDirection;
use crate::domain::policy::RiskPolicy;
use crate::domain::scoring::CompositeScore;
use crate::domain::snapshot::IndicatorSnapshot;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Slack allowed when comparing weights against caps.
pub const TOLERANCE: f64 = 1e-9;

pub const ENGINE_PREFIX: &str = "[engine]";

/// Everything the enforcer knows about one instrument.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub snapshot: IndicatorSnapshot,
    pub score: CompositeScore,
    pub class: InstrumentClass,
}

impl Candidate {
    pub fn new(snapshot: IndicatorSnapshot, score: CompositeScore, class: InstrumentClass) -> Self {
        Self {
            snapshot,
            score,
            class,
        }
    }

    /// Last close, when known and positive.
    pub fn price(&self) -> Option<f64> {
        self.snapshot
            .last_price
            .filter(|p| p.is_finite() && *p > 0.0)
    }
}

fn append(rationale: &mut String, note: &str) {
    if rationale.is_empty() {
        rationale.push_str(note);
    } else {
        rationale.push(' ');
        rationale.push_str(note);
    }
}

fn to_wait(d: &mut FinalAllocation, note: &str) {
    d.action = Action::Wait;
    d.weight_pct = 0.0;
    append(&mut d.rationale, note);
}

fn demote(d: &mut FinalAllocation, reason: &str) {
    debug!(code = %d.code, reason, "BUY demoted to WAIT");
    d.action = Action::Wait;
    d.weight_pct = 0.0;
    d.rationale = format!("{} WAIT: {}", ENGINE_PREFIX, reason);
}

fn valid_price(v: Option<f64>) -> Option<f64> {
    v.filter(|p| p.is_finite() && *p > 0.0)
}

/// Pass 0: turn each raw proposal into a well-formed decision.
fn normalize(
    proposals: &[AllocationProposal],
    candidates: &BTreeMap<String, Candidate>,
) -> Vec<FinalAllocation> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(proposals.len());

    for p in proposals {
        let code = p.code.trim().to_uppercase();
        let mut d = FinalAllocation {
            code: code.clone(),
            action: p.action.unwrap_or(Action::Wait),
            weight_pct: p.weight_pct.unwrap_or(0.0),
            target_price: p.target_price,
            stop_price: p.stop_price,
            rationale: p.rationale.trim().to_string(),
        };

        if p.action.is_none() {
            to_wait(&mut d, "[anomaly] missing action, defaulted to WAIT");
        }

        let raw_weight = d.weight_pct;
        if !raw_weight.is_finite() || raw_weight < 0.0 {
            d.weight_pct = 0.0;
            append(&mut d.rationale, "[anomaly] invalid weight, set to 0");
        }

        if d.target_price.is_some() && valid_price(d.target_price).is_none() {
            d.target_price = None;
            append(&mut d.rationale, "[anomaly] invalid target price dropped");
        }
        if d.stop_price.is_some() && valid_price(d.stop_price).is_none() {
            d.stop_price = None;
            append(&mut d.rationale, "[anomaly] invalid stop price dropped");
        }

        let is_new = seen.insert(code.clone());
        let candidate = candidates.get(&code);

        if d.action != Action::Wait {
            if code.is_empty() {
                to_wait(&mut d, "[anomaly] empty instrument code");
            } else if !is_new {
                to_wait(&mut d, "[anomaly] duplicate instrument, only the first entry is used");
            } else if candidate.is_none() {
                to_wait(&mut d, "[anomaly] unknown instrument");
            }
        }

        if d.action == Action::Buy {
            if d.weight_pct <= 0.0 {
                to_wait(&mut d, "[anomaly] BUY without a positive weight");
            } else if candidate.and_then(Candidate::price).is_none() {
                to_wait(&mut d, "[anomaly] BUY without a current price");
            }
        }

        if d.action != Action::Buy && d.weight_pct != 0.0 {
            d.weight_pct = 0.0;
            append(
                &mut d.rationale,
                &format!("[adjusted] weight ignored for {}", d.action),
            );
        }

        out.push(d);
    }
    out
}

/// Pass 1: BUY target must sit above price and stop below it.
fn repair_prices(
    decisions: &mut [FinalAllocation],
    candidates: &BTreeMap<String, Candidate>,
    policy: &RiskPolicy,
) {
    for d in decisions.iter_mut().filter(|d| d.action == Action::Buy) {
        let Some(c) = candidates.get(&d.code) else {
            continue;
        };
        let Some(price) = c.price() else {
            continue;
        };

        if d.target_price.is_none_or(|t| t <= price) {
            let (target, source) = match c
                .snapshot
                .fibonacci
                .as_ref()
                .ready()
                .and_then(|f| f.nearest_extension_above(price))
            {
                Some(ext) => (ext, "Fibonacci extension"),
                None => (
                    price * (1.0 + policy.target_fallback_pct / 100.0),
                    "fallback percentage",
                ),
            };
            debug!(code = %d.code, price, target, source, "target repaired");
            append(
                &mut d.rationale,
                &format!("[adjusted] target set to {:.2} ({})", target, source),
            );
            d.target_price = Some(target);
        }

        if d.stop_price.is_none_or(|s| s >= price) {
            let atr_stop = c
                .snapshot
                .atr
                .get()
                .map(|atr| price - policy.stop_atr_multiple * atr)
                .filter(|s| *s > 0.0 && *s < price);
            let (stop, source) = match atr_stop {
                Some(s) => (s, "ATR multiple"),
                None => (
                    price * (1.0 - policy.stop_fallback_pct / 100.0),
                    "fallback percentage",
                ),
            };
            debug!(code = %d.code, price, stop, source, "stop repaired");
            append(
                &mut d.rationale,
                &format!("[adjusted] stop set to {:.2} ({})", stop, source),
            );
            d.stop_price = Some(stop);
        }
    }
}

/// Pass 2.
fn score_threshold(
    decisions: &mut [FinalAllocation],
    candidates: &BTreeMap<String, Candidate>,
    policy: &RiskPolicy,
) {
    for d in decisions.iter_mut().filter(|d| d.action == Action::Buy) {
        let Some(c) = candidates.get(&d.code) else {
            continue;
        };
        if c.score.total_score < policy.min_score_threshold {
            demote(
                d,
                &format!(
                    "score {:.0} below threshold {:.0}",
                    c.score.total_score, policy.min_score_threshold
                ),
            );
        }
    }
}

/// Reason a BUY is vetoed by a conjunction of bearish signals, if any.
pub fn veto_reason(c: &Candidate, policy: &RiskPolicy) -> Option<String> {
    let snap = &c.snapshot;
    let sar_down = snap.sar.get().map(|s| s.direction) == Some(SarDirection::Down);
    let below_cloud = snap.ichimoku.get().map(|i| i.cloud) == Some(CloudState::Below);

    if sar_down && below_cloud {
        return Some("veto: SAR downtrend and price below cloud".to_string());
    }
    if let Some(sharpe) = snap.sharpe.get() {
        if sharpe < policy.veto.sharpe_floor && c.score.technical_score < policy.veto.technical_floor
        {
            return Some(format!(
                "veto: Sharpe {:.2} below {:.2} with technical score {:.0} below {:.0}",
                sharpe, policy.veto.sharpe_floor, c.score.technical_score, policy.veto.technical_floor
            ));
        }
    }
    if let Some(change) = snap.period_change_pct.get() {
        if change < policy.veto.decline_pct && sar_down {
            return Some(format!(
                "veto: sustained decline {:.1}% with SAR downtrend",
                change
            ));
        }
    }
    None
}

/// Pass 3.
fn technical_veto(
    decisions: &mut [FinalAllocation],
    candidates: &BTreeMap<String, Candidate>,
    policy: &RiskPolicy,
) {
    for d in decisions.iter_mut().filter(|d| d.action == Action::Buy) {
        if let Some(reason) = candidates.get(&d.code).and_then(|c| veto_reason(c, policy)) {
            demote(d, &reason);
        }
    }
}

fn clamp_weight(d: &mut FinalAllocation, cap: f64, label: &str) {
    if d.weight_pct > cap + TOLERANCE {
        debug!(code = %d.code, weight = d.weight_pct, cap, label, "weight clamped");
        append(
            &mut d.rationale,
            &format!(
                "[adjusted] weight {:.2}% capped at {:.2}% ({})",
                d.weight_pct, cap, label
            ),
        );
        d.weight_pct = cap;
    }
}

/// Passes 4 to 6: per-instrument caps.
fn instrument_caps(
    decisions: &mut [FinalAllocation],
    candidates: &BTreeMap<String, Candidate>,
    correlation: &CorrelationResult,
    policy: &RiskPolicy,
) {
    for d in decisions.iter_mut().filter(|d| d.action == Action::Buy) {
        clamp_weight(d, policy.max_single_weight_pct, "single instrument cap");
    }

    for d in decisions.iter_mut().filter(|d| d.action == Action::Buy) {
        let low_sharpe = candidates
            .get(&d.code)
            .and_then(|c| c.snapshot.sharpe.get())
            .zip(policy.min_sharpe_floor)
            .is_some_and(|(s, floor)| s < floor);
        if low_sharpe {
            clamp_weight(d, policy.low_sharpe_weight_cap_pct, "low Sharpe cap");
        }
    }

    for d in decisions.iter_mut().filter(|d| d.action == Action::Buy) {
        if correlation.has_correlated_partner(&d.code, policy.correlation_threshold) {
            clamp_weight(d, policy.max_correlated_weight_pct, "correlation cap");
        }
    }
}

/// Summed BUY weight per sector.
fn sector_weights(
    decisions: &[FinalAllocation],
    candidates: &BTreeMap<String, Candidate>,
) -> BTreeMap<InstrumentClass, f64> {
    let mut sums = BTreeMap::new();
    for d in decisions.iter().filter(|d| d.action == Action::Buy) {
        if let Some(c) = candidates.get(&d.code).filter(|c| c.class.is_sector()) {
            *sums.entry(c.class).or_insert(0.0) += d.weight_pct;
        }
    }
    sums
}

/// Pass 7.
fn sector_cap(
    decisions: &mut [FinalAllocation],
    candidates: &BTreeMap<String, Candidate>,
    policy: &RiskPolicy,
) {
    let cap = policy.max_sector_weight_pct;
    for (class, sum) in sector_weights(decisions, candidates) {
        if sum <= cap + TOLERANCE {
            continue;
        }
        let factor = cap / sum;
        debug!(sector = %class, sum, cap, factor, "sector scaled");
        for d in decisions.iter_mut().filter(|d| d.action == Action::Buy) {
            if candidates.get(&d.code).map(|c| c.class) == Some(class) {
                let before = d.weight_pct;
                d.weight_pct *= factor;
                append(
                    &mut d.rationale,
                    &format!(
                        "[adjusted] weight {:.2}% scaled to {:.2}% ({} sector cap {:.2}%)",
                        before, d.weight_pct, class, cap
                    ),
                );
            }
        }
    }
}

fn invested(decisions: &[FinalAllocation]) -> f64 {
    decisions
        .iter()
        .filter(|d| d.action == Action::Buy)
        .map(|d| d.weight_pct)
        .sum()
}

/// Pass 8. BUYs left with no weight by any cap become WAIT.
fn global_cap(decisions: &mut [FinalAllocation], policy: &RiskPolicy) {
    let cap = policy.invested_cap();
    let total = invested(decisions);
    if total > cap + TOLERANCE {
        let factor = cap / total;
        debug!(total, cap, factor, "invested total scaled");
        for d in decisions.iter_mut().filter(|d| d.action == Action::Buy) {
            let before = d.weight_pct;
            d.weight_pct *= factor;
            append(
                &mut d.rationale,
                &format!(
                    "[adjusted] weight {:.2}% scaled to {:.2}% (invested cap {:.2}%)",
                    before, d.weight_pct, cap
                ),
            );
        }
    }

    for d in decisions.iter_mut().filter(|d| d.action == Action::Buy) {
        if d.weight_pct <= 0.0 {
            demote(d, "no investable weight left under the policy caps");
        }
    }
}

fn cross_label(state: CrossState) -> &'static str {
    match state {
        CrossState::Golden => "golden cross",
        CrossState::Death => "death cross",
        CrossState::Above => "SMA50 above SMA200",
        CrossState::Below => "SMA50 below SMA200",
    }
}

fn cloud_label(state: CloudState) -> &'static str {
    match state {
        CloudState::Above => "above",
        CloudState::Below => "below",
        CloudState::Inside => "inside",
        CloudState::Undetermined => "undetermined",
    }
}

/// Machine-derived justification appended to surviving decisions.
pub fn enrichment(c: &Candidate) -> String {
    let snap = &c.snapshot;
    let mut parts = vec![format!(
        "score {:.0} (technical {:.0}, fundamental {:.0})",
        c.score.total_score, c.score.technical_score, c.score.fundamental_score
    )];
    if let Some(cross) = snap.cross.get() {
        parts.push(format!("trend {}", cross_label(cross.state)));
    }
    if let Some(ich) = snap.ichimoku.get() {
        parts.push(format!("cloud {}", cloud_label(ich.cloud)));
    }
    if let Some(sar) = snap.sar.get() {
        let dir = match sar.direction {
            SarDirection::Up => "up",
            SarDirection::Down => "down",
        };
        parts.push(format!("SAR {}", dir));
    }
    let bull = snap.divergence.bullish_count();
    let bear = snap.divergence.bearish_count();
    if bull + bear > 0 {
        parts.push(format!("divergence {} bullish / {} bearish", bull, bear));
    }
    if let Reading::Ready(patterns) = &snap.patterns {
        if !patterns.is_empty() {
            let names: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
            parts.push(format!("patterns {}", names.join(",")));
        }
    }
    if let Some(sharpe) = snap.sharpe.get() {
        parts.push(format!("Sharpe {:.2}", sharpe));
    }
    format!("{} {}", ENGINE_PREFIX, parts.join("; "))
}

/// Pass 9.
fn enrich(decisions: &mut [FinalAllocation], candidates: &BTreeMap<String, Candidate>) {
    for d in decisions
        .iter_mut()
        .filter(|d| matches!(d.action, Action::Buy | Action::Sell))
    {
        let Some(c) = candidates.get(&d.code) else {
            continue;
        };
        let text = enrichment(c);
        if !d.rationale.ends_with(&text) {
            append(&mut d.rationale, &text);
        }
    }
}

/// Enforce `policy` over `proposals`. Output order follows input order.
pub fn enforce(
    proposals: &[AllocationProposal],
    candidates: &BTreeMap<String, Candidate>,
    correlation: &CorrelationResult,
    policy: &RiskPolicy,
) -> Allocation {
    let mut decisions = normalize(proposals, candidates);

    repair_prices(&mut decisions, candidates, policy);
    score_threshold(&mut decisions, candidates, policy);
    technical_veto(&mut decisions, candidates, policy);
    instrument_caps(&mut decisions, candidates, correlation, policy);
    sector_cap(&mut decisions, candidates, policy);
    global_cap(&mut decisions, policy);
    enrich(&mut decisions, candidates);

    let invested_pct = invested(&decisions);
    let cash_pct = 100.0 - invested_pct;
    info!(
        profile = %policy.name,
        decisions = decisions.len(),
        buys = decisions.iter().filter(|d| d.action == Action::Buy).count(),
        invested_pct,
        cash_pct,
        "allocation enforced"
    );

    Allocation {
        decisions,
        invested_pct,
        cash_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::correlation::{CorrelationMatrix, UnavailableReason};
    use crate::domain::indicator::ichimoku::IchimokuReading;
    use crate::domain::indicator::levels::fibonacci;
    use crate::domain::indicator::sar::SarReading;
    use crate::domain::ohlcv::test_bars::from_closes;
    use crate::domain::snapshot::{SnapshotParams, compute};
    use approx::assert_relative_eq;

    fn no_corr() -> CorrelationResult {
        CorrelationResult::Unavailable(UnavailableReason::TooFewInstruments { count: 0 })
    }

    fn candidate(code: &str, total: f64, class: InstrumentClass) -> Candidate {
        let mut snapshot = compute(code, &[], &SnapshotParams::default());
        snapshot.last_price = Some(100.0);
        Candidate::new(
            snapshot,
            CompositeScore {
                technical_score: total,
                fundamental_score: total,
                total_score: total,
                explanations: vec![],
            },
            class,
        )
    }

    fn universe(list: &[(&str, f64, InstrumentClass)]) -> BTreeMap<String, Candidate> {
        list.iter()
            .map(|&(code, total, class)| (code.to_string(), candidate(code, total, class)))
            .collect()
    }

    #[test]
    fn low_score_buy_becomes_wait() {
        let cands = universe(&[("AAA", 40.0, InstrumentClass::Other)]);
        let out = enforce(
            &[AllocationProposal::buy("AAA", 20.0)],
            &cands,
            &no_corr(),
            &RiskPolicy::default(),
        );
        let d = out.decision("AAA").unwrap();
        assert_eq!(d.action, Action::Wait);
        assert_eq!(d.weight_pct, 0.0);
        assert!(d.rationale.starts_with("[engine] WAIT: score 40 below threshold 55"));
        assert_eq!(out.cash_pct, 100.0);
    }

    #[test]
    fn sector_members_scaled_to_cap() {
        let cands = universe(&[
            ("AAA", 80.0, InstrumentClass::Bank),
            ("BBB", 80.0, InstrumentClass::Bank),
        ]);
        let out = enforce(
            &[
                AllocationProposal::buy("AAA", 20.0),
                AllocationProposal::buy("BBB", 20.0),
            ],
            &cands,
            &no_corr(),
            &RiskPolicy::default(),
        );
        assert_relative_eq!(out.decision("AAA").unwrap().weight_pct, 15.0, epsilon = 1e-9);
        assert_relative_eq!(out.decision("BBB").unwrap().weight_pct, 15.0, epsilon = 1e-9);
    }

    #[test]
    fn correlated_pair_clamped() {
        let cands = universe(&[
            ("AAA", 80.0, InstrumentClass::Unclassified),
            ("BBB", 80.0, InstrumentClass::Unclassified),
        ]);
        let corr = CorrelationResult::Available(CorrelationMatrix::from_pairs(
            &["AAA", "BBB"],
            &[("AAA", "BBB", 0.90)],
        ));
        let out = enforce(
            &[
                AllocationProposal::buy("AAA", 25.0),
                AllocationProposal::buy("BBB", 25.0),
            ],
            &cands,
            &corr,
            &RiskPolicy::default(),
        );
        assert_eq!(out.decision("AAA").unwrap().weight_pct, 12.0);
        assert_eq!(out.decision("BBB").unwrap().weight_pct, 12.0);
    }

    #[test]
    fn target_below_price_uses_fibonacci_extension() {
        let closes: Vec<f64> = (0..60).map(|i| 80.0 + (i % 25) as f64).collect();
        let mut c = candidate("AAA", 80.0, InstrumentClass::Other);
        c.snapshot.last_price = Some(103.0);
        c.snapshot.fibonacci = fibonacci(&from_closes(&closes));
        let expected = c
            .snapshot
            .fibonacci
            .as_ref()
            .ready()
            .and_then(|f| f.nearest_extension_above(103.0))
            .unwrap();
        let cands: BTreeMap<_, _> = [("AAA".to_string(), c)].into_iter().collect();

        let out = enforce(
            &[AllocationProposal::buy("AAA", 10.0).with_prices(50.0, 95.0)],
            &cands,
            &no_corr(),
            &RiskPolicy::default(),
        );
        let d = out.decision("AAA").unwrap();
        assert_eq!(d.target_price, Some(expected));
        assert!(expected > 103.0);
        assert_eq!(d.stop_price, Some(95.0));
    }

    #[test]
    fn target_fallback_without_levels() {
        let cands = universe(&[("AAA", 80.0, InstrumentClass::Other)]);
        let out = enforce(
            &[AllocationProposal::buy("AAA", 10.0)],
            &cands,
            &no_corr(),
            &RiskPolicy::default(),
        );
        let d = out.decision("AAA").unwrap();
        assert_relative_eq!(d.target_price.unwrap(), 108.0, epsilon = 1e-9);
        assert_relative_eq!(d.stop_price.unwrap(), 95.0, epsilon = 1e-9);
    }

    #[test]
    fn stop_uses_atr_multiple() {
        let mut c = candidate("AAA", 80.0, InstrumentClass::Other);
        c.snapshot.atr = Reading::Ready(3.0);
        let cands: BTreeMap<_, _> = [("AAA".to_string(), c)].into_iter().collect();
        let out = enforce(
            &[AllocationProposal::buy("AAA", 10.0).with_prices(120.0, 101.0)],
            &cands,
            &no_corr(),
            &RiskPolicy::default(),
        );
        assert_eq!(out.decision("AAA").unwrap().stop_price, Some(94.0));
    }

    #[test]
    fn invested_total_scaled_to_cap() {
        let codes = ["A1", "A2", "A3", "A4", "A5", "A6"];
        let cands = universe(
            &codes
                .iter()
                .map(|&c| (c, 80.0, InstrumentClass::Unclassified))
                .collect::<Vec<_>>(),
        );
        let weights = [18.0, 18.0, 18.0, 18.0, 18.0, 5.0];
        let proposals: Vec<_> = codes
            .iter()
            .zip(weights)
            .map(|(&c, w)| AllocationProposal::buy(c, w))
            .collect();
        let out = enforce(&proposals, &cands, &no_corr(), &RiskPolicy::default());
        for (d, w) in out.decisions.iter().zip(weights) {
            assert_relative_eq!(d.weight_pct, w * 90.0 / 95.0, epsilon = 1e-9);
        }
        assert_relative_eq!(out.invested_pct, 90.0, epsilon = 1e-9);
        assert_relative_eq!(out.cash_pct, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn sar_down_below_cloud_vetoes() {
        let mut c = candidate("AAA", 90.0, InstrumentClass::Other);
        c.snapshot.sar = Reading::Ready(SarReading {
            value: 105.0,
            direction: SarDirection::Down,
        });
        c.snapshot.ichimoku = Reading::Ready(IchimokuReading {
            tenkan: 99.0,
            kijun: 101.0,
            senkou_a: Some(110.0),
            senkou_b: Some(112.0),
            cloud: CloudState::Below,
        });
        let cands: BTreeMap<_, _> = [("AAA".to_string(), c)].into_iter().collect();
        let out = enforce(
            &[AllocationProposal::buy("AAA", 10.0)],
            &cands,
            &no_corr(),
            &RiskPolicy::default(),
        );
        let d = out.decision("AAA").unwrap();
        assert_eq!(d.action, Action::Wait);
        assert!(d.rationale.contains("SAR downtrend and price below cloud"));
    }

    fn single(c: Candidate) -> BTreeMap<String, Candidate> {
        [(c.snapshot.code.clone(), c)].into_iter().collect()
    }

    fn decide(c: Candidate, policy: &RiskPolicy) -> FinalAllocation {
        let out = enforce(
            &[AllocationProposal::buy("AAA", 10.0)],
            &single(c),
            &no_corr(),
            policy,
        );
        out.decision("AAA").unwrap().clone()
    }

    #[test]
    fn weak_sharpe_with_weak_technicals_vetoes() {
        let mut c = candidate("AAA", 60.0, InstrumentClass::Other);
        c.snapshot.sharpe = Reading::Ready(-2.0);
        let d = decide(c.clone(), &RiskPolicy::default());
        assert_eq!(d.action, Action::Wait);
        assert!(d.rationale.contains("veto: Sharpe -2.00"), "{}", d.rationale);

        // Technical score at the floor is not below it.
        c.score.technical_score = 65.0;
        assert_eq!(decide(c, &RiskPolicy::default()).action, Action::Buy);
    }

    #[test]
    fn sharpe_veto_needs_both_signals() {
        let mut c = candidate("AAA", 60.0, InstrumentClass::Other);
        c.snapshot.sharpe = Reading::Ready(-1.4);
        assert_eq!(decide(c, &RiskPolicy::default()).action, Action::Buy);
    }

    #[test]
    fn sustained_decline_with_sar_down_vetoes() {
        let mut c = candidate("AAA", 90.0, InstrumentClass::Other);
        c.snapshot.sar = Reading::Ready(SarReading {
            value: 105.0,
            direction: SarDirection::Down,
        });
        c.snapshot.period_change_pct = Reading::Ready(-20.0);
        let d = decide(c.clone(), &RiskPolicy::default());
        assert_eq!(d.action, Action::Wait);
        assert!(d.rationale.contains("sustained decline -20.0%"), "{}", d.rationale);

        c.snapshot.period_change_pct = Reading::Ready(-10.0);
        assert_eq!(decide(c.clone(), &RiskPolicy::default()).action, Action::Buy);

        c.snapshot.period_change_pct = Reading::Ready(-20.0);
        c.snapshot.sar = Reading::Ready(SarReading {
            value: 95.0,
            direction: SarDirection::Up,
        });
        assert_eq!(decide(c, &RiskPolicy::default()).action, Action::Buy);
    }

    #[test]
    fn veto_thresholds_come_from_policy() {
        let mut c = candidate("AAA", 60.0, InstrumentClass::Other);
        c.snapshot.sharpe = Reading::Ready(-2.0);
        let mut policy = RiskPolicy::default();
        assert!(veto_reason(&c, &policy).is_some());
        policy.veto.sharpe_floor = -3.0;
        assert!(veto_reason(&c, &policy).is_none());
        assert_eq!(decide(c, &policy).action, Action::Buy);
    }

    #[test]
    fn low_sharpe_caps_weight() {
        let mut c = candidate("AAA", 80.0, InstrumentClass::Other);
        c.snapshot.sharpe = Reading::Ready(-0.8);
        let cands: BTreeMap<_, _> = [("AAA".to_string(), c)].into_iter().collect();
        let out = enforce(
            &[AllocationProposal::buy("AAA", 15.0)],
            &cands,
            &no_corr(),
            &RiskPolicy::default(),
        );
        assert_eq!(out.decision("AAA").unwrap().weight_pct, 5.0);
    }

    #[test]
    fn malformed_entries_default_to_wait() {
        let cands = universe(&[("AAA", 80.0, InstrumentClass::Other)]);
        let proposals = vec![
            AllocationProposal {
                code: "AAA".into(),
                action: None,
                weight_pct: Some(10.0),
                ..Default::default()
            },
            AllocationProposal::buy("AAA", 10.0),
            AllocationProposal::buy("ZZZ", 10.0),
            AllocationProposal::buy("", 10.0),
            AllocationProposal {
                code: "AAA".into(),
                action: Some(Action::Buy),
                weight_pct: Some(f64::NAN),
                ..Default::default()
            },
        ];
        let out = enforce(&proposals, &cands, &no_corr(), &RiskPolicy::default());
        assert_eq!(out.decisions.len(), 5);
        for d in &out.decisions {
            assert_eq!(d.action, Action::Wait);
            assert_eq!(d.weight_pct, 0.0);
            assert!(d.rationale.contains("[anomaly]"), "{}", d.rationale);
        }
        assert_eq!(out.cash_pct, 100.0);
    }

    #[test]
    fn sell_weight_zeroed_and_enriched() {
        let cands = universe(&[("AAA", 80.0, InstrumentClass::Other)]);
        let out = enforce(
            &[AllocationProposal {
                code: "aaa".into(),
                action: Some(Action::Sell),
                weight_pct: Some(7.0),
                rationale: "take profit".into(),
                ..Default::default()
            }],
            &cands,
            &no_corr(),
            &RiskPolicy::default(),
        );
        let d = out.decision("AAA").unwrap();
        assert_eq!(d.action, Action::Sell);
        assert_eq!(d.weight_pct, 0.0);
        assert!(d.rationale.starts_with("take profit"));
        assert!(d.rationale.ends_with(&enrichment(&cands["AAA"])));
    }

    #[test]
    fn output_is_a_fixed_point() {
        let cands = universe(&[
            ("AAA", 80.0, InstrumentClass::Bank),
            ("BBB", 80.0, InstrumentClass::Bank),
            ("CCC", 40.0, InstrumentClass::Energy),
            ("DDD", 70.0, InstrumentClass::Energy),
        ]);
        let corr = CorrelationResult::Available(CorrelationMatrix::from_pairs(
            &["AAA", "BBB", "CCC", "DDD"],
            &[("AAA", "DDD", 0.95)],
        ));
        let policy = RiskPolicy::default();
        let proposals = vec![
            AllocationProposal::buy("AAA", 30.0).with_prices(90.0, 120.0),
            AllocationProposal::buy("BBB", 25.0),
            AllocationProposal::buy("CCC", 25.0),
            AllocationProposal::buy("DDD", 40.0),
        ];
        let first = enforce(&proposals, &cands, &corr, &policy);
        let second = enforce(&first.as_proposals(), &cands, &corr, &policy);
        assert_eq!(first, second);
    }
}
