//! Allocation proposal (untrusted input) and final allocation (enforced output).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
    Wait,
}

impl Action {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Some(Action::Buy),
            "SELL" => Some(Action::Sell),
            "HOLD" => Some(Action::Hold),
            "WAIT" => Some(Action::Wait),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
            Action::Wait => "WAIT",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instrument's suggested action. Every field may be missing or
/// nonsensical; the enforcer defaults them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationProposal {
    pub code: String,
    pub action: Option<Action>,
    pub weight_pct: Option<f64>,
    pub target_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub rationale: String,
}

impl AllocationProposal {
    pub fn buy(code: &str, weight_pct: f64) -> Self {
        Self {
            code: code.to_string(),
            action: Some(Action::Buy),
            weight_pct: Some(weight_pct),
            ..Default::default()
        }
    }

    pub fn with_prices(mut self, target: f64, stop: f64) -> Self {
        self.target_price = Some(target);
        self.stop_price = Some(stop);
        self
    }

    pub fn with_rationale(mut self, rationale: &str) -> Self {
        self.rationale = rationale.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalAllocation {
    pub code: String,
    pub action: Action,
    pub weight_pct: f64,
    pub target_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub rationale: String,
}

/// Re-feeding an allocation to the enforcer starts from its own output.
impl From<&FinalAllocation> for AllocationProposal {
    fn from(f: &FinalAllocation) -> Self {
        Self {
            code: f.code.clone(),
            action: Some(f.action),
            weight_pct: Some(f.weight_pct),
            target_price: f.target_price,
            stop_price: f.stop_price,
            rationale: f.rationale.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub decisions: Vec<FinalAllocation>,
    pub invested_pct: f64,
    pub cash_pct: f64,
}

impl Allocation {
    pub fn buys(&self) -> impl Iterator<Item = &FinalAllocation> {
        self.decisions.iter().filter(|d| d.action == Action::Buy)
    }

    pub fn decision(&self, code: &str) -> Option<&FinalAllocation> {
        self.decisions.iter().find(|d| d.code == code)
    }

    pub fn as_proposals(&self) -> Vec<AllocationProposal> {
        self.decisions.iter().map(AllocationProposal::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Action::parse(" buy "), Some(Action::Buy));
        assert_eq!(Action::parse("Hold"), Some(Action::Hold));
        assert_eq!(Action::parse("STRONG BUY"), None);
        assert_eq!(Action::parse(""), None);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for a in [Action::Buy, Action::Sell, Action::Hold, Action::Wait] {
            assert_eq!(Action::parse(&a.to_string()), Some(a));
        }
    }

    #[test]
    fn final_allocation_converts_back_to_proposal() {
        let f = FinalAllocation {
            code: "AAA".into(),
            action: Action::Buy,
            weight_pct: 12.5,
            target_price: Some(110.0),
            stop_price: Some(95.0),
            rationale: "x".into(),
        };
        let p = AllocationProposal::from(&f);
        assert_eq!(p.action, Some(Action::Buy));
        assert_eq!(p.weight_pct, Some(12.5));
        assert_eq!(p.stop_price, Some(95.0));
    }
}
