//! Fundamental ratios and instrument classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fundamental-ratio snapshot for one instrument. Every field is optional;
/// a missing ratio never contributes to a score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub roe_pct: Option<f64>,
    pub roa_pct: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub revenue_growth_pct: Option<f64>,
    pub market_cap: Option<f64>,
    pub revenue: Option<f64>,
    pub float_shares: Option<f64>,
}

impl FundamentalSnapshot {
    /// market_cap / revenue when both are known and revenue is positive.
    pub fn price_to_sales(&self) -> Option<f64> {
        match (self.market_cap, self.revenue) {
            (Some(cap), Some(rev)) if rev > 0.0 => Some(cap / rev),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentClass {
    Holding,
    Defense,
    Technology,
    Reit,
    Bank,
    Energy,
    Telecom,
    Aviation,
    Industrial,
    Retail,
    Materials,
    Other,
    Unclassified,
}

/// P/E banding used by the fundamental score.
///
/// `value` is an open interval earning the largest bonus, `[value.1, fair_upper)`
/// earns the smaller bonus and `>= expensive_at` is penalised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuationProfile {
    pub skip_pe: bool,
    pub value: (f64, f64),
    pub fair_upper: f64,
    pub expensive_at: f64,
}

impl InstrumentClass {
    pub const ALL: [InstrumentClass; 13] = [
        InstrumentClass::Holding,
        InstrumentClass::Defense,
        InstrumentClass::Technology,
        InstrumentClass::Reit,
        InstrumentClass::Bank,
        InstrumentClass::Energy,
        InstrumentClass::Telecom,
        InstrumentClass::Aviation,
        InstrumentClass::Industrial,
        InstrumentClass::Retail,
        InstrumentClass::Materials,
        InstrumentClass::Other,
        InstrumentClass::Unclassified,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            InstrumentClass::Holding => "holding",
            InstrumentClass::Defense => "defense",
            InstrumentClass::Technology => "technology",
            InstrumentClass::Reit => "reit",
            InstrumentClass::Bank => "bank",
            InstrumentClass::Energy => "energy",
            InstrumentClass::Telecom => "telecom",
            InstrumentClass::Aviation => "aviation",
            InstrumentClass::Industrial => "industrial",
            InstrumentClass::Retail => "retail",
            InstrumentClass::Materials => "materials",
            InstrumentClass::Other => "other",
            InstrumentClass::Unclassified => "unclassified",
        }
    }

    /// Case-insensitive tag lookup; `tech` is accepted for technology.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_lowercase();
        if tag == "tech" {
            return Some(InstrumentClass::Technology);
        }
        Self::ALL.iter().copied().find(|c| c.tag() == tag)
    }

    /// Whether the class counts as a sector for the sector cap.
    pub fn is_sector(&self) -> bool {
        *self != InstrumentClass::Unclassified
    }

    /// Ratios of these classes are structurally different; exemptions in
    /// valuation scoring and screening key off this.
    pub fn has_structural_valuation(&self) -> bool {
        matches!(self, InstrumentClass::Holding | InstrumentClass::Defense)
    }

    pub fn valuation(&self) -> ValuationProfile {
        match self {
            InstrumentClass::Holding | InstrumentClass::Reit => ValuationProfile {
                skip_pe: true,
                value: (0.0, 0.0),
                fair_upper: 0.0,
                expensive_at: f64::INFINITY,
            },
            InstrumentClass::Defense => ValuationProfile {
                skip_pe: false,
                value: (4.0, 20.0),
                fair_upper: 60.0,
                expensive_at: 120.0,
            },
            InstrumentClass::Technology => ValuationProfile {
                skip_pe: false,
                value: (4.0, 15.0),
                fair_upper: 40.0,
                expensive_at: 80.0,
            },
            _ => ValuationProfile {
                skip_pe: false,
                value: (4.0, 12.0),
                fair_upper: 20.0,
                expensive_at: 50.0,
            },
        }
    }
}

impl fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// What the classification capability knows about one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub class: InstrumentClass,
    /// Pinned instruments always pass screening.
    pub pinned: bool,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            class: InstrumentClass::Unclassified,
            pinned: false,
        }
    }
}
