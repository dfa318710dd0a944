//! Pre-screening: a cheap pass over the whole universe that drops likely
//! manipulated or bubble-priced instruments and keeps the best-quality ones
//! for full scoring.

use crate::domain::fundamentals::{Classification, FundamentalSnapshot, InstrumentClass};
use crate::domain::indicator::rsi::{self, latest_rsi};
use crate::domain::indicator::{EPSILON, Reading};
use crate::domain::ohlcv::PriceBar;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info};

pub const MIN_BARS: usize = 20;
/// Bars back for the one-month change.
pub const MONTH_BARS: usize = 21;
/// Bars spanned by the three-month change.
pub const QUARTER_BARS: usize = 63;
pub const PINNED_QUALITY: f64 = 88.0;
/// Quality lost when the bubble score crosses its threshold.
pub const BUBBLE_QUALITY_PENALTY: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreeningParams {
    pub limit: usize,
    pub manipulation_threshold: f64,
    pub bubble_threshold: f64,
}

impl Default for ScreeningParams {
    fn default() -> Self {
        Self {
            limit: 35,
            manipulation_threshold: 65.0,
            bubble_threshold: 65.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningSummary {
    pub code: String,
    pub class: InstrumentClass,
    pub pinned: bool,
    pub last_price: f64,
    pub change_1m_pct: f64,
    pub change_3m_pct: f64,
    pub rsi: f64,
    /// Last volume over mean volume of the quarter window.
    pub volume_ratio: f64,
    pub fundamentals: FundamentalSnapshot,
}

impl ScreeningSummary {
    pub fn from_bars(
        code: &str,
        bars: &[PriceBar],
        fundamentals: FundamentalSnapshot,
        classification: Classification,
    ) -> Reading<Self> {
        Reading::gate(bars.len(), MIN_BARS, || {
            let window = &bars[bars.len().saturating_sub(QUARTER_BARS)..];
            let last = &bars[bars.len() - 1];

            let change = |base: f64| {
                if base > 0.0 {
                    (last.close / base - 1.0) * 100.0
                } else {
                    0.0
                }
            };
            let change_1m_pct = if bars.len() > MONTH_BARS {
                change(bars[bars.len() - 1 - MONTH_BARS].close)
            } else {
                0.0
            };

            let mean_volume =
                window.iter().map(|b| b.volume as f64).sum::<f64>() / window.len() as f64;

            ScreeningSummary {
                code: code.to_string(),
                class: classification.class,
                pinned: classification.pinned,
                last_price: last.close,
                change_1m_pct,
                change_3m_pct: change(window[0].close),
                rsi: latest_rsi(window, rsi::DEFAULT_PERIOD).get().unwrap_or(50.0),
                volume_ratio: last.volume as f64 / mean_volume.max(EPSILON),
                fundamentals,
            }
        })
    }
}

/// Volume anomaly, overheated RSI, one-month spike, small float.
pub fn manipulation_score(s: &ScreeningSummary) -> f64 {
    let mut score = 0.0;

    if s.volume_ratio > 10.0 {
        score += 35.0;
    } else if s.volume_ratio > 5.0 {
        score += 20.0;
    } else if s.volume_ratio > 3.0 {
        score += 10.0;
    }

    if s.rsi > 85.0 {
        score += 20.0;
    } else if s.rsi > 80.0 {
        score += 12.0;
    }

    if s.change_1m_pct > 200.0 {
        score += 25.0;
    } else if s.change_1m_pct > 100.0 {
        score += 18.0;
    } else if s.change_1m_pct > 50.0 {
        score += 8.0;
    }

    match s.fundamentals.float_shares {
        Some(f) if f > 0.0 && f < 5_000_000.0 => score += 20.0,
        Some(f) if f > 0.0 && f < 20_000_000.0 => score += 10.0,
        _ => {}
    }

    f64::min(score, 100.0)
}

/// Extreme or negative P/E, stretched P/B and price-to-sales, three-month spike.
/// Pinned instruments read 0.
pub fn bubble_score(s: &ScreeningSummary) -> f64 {
    if s.pinned {
        return 0.0;
    }
    let holding = s.class == InstrumentClass::Holding;
    let exempt = s.class.has_structural_valuation();
    let f = &s.fundamentals;
    let mut score = 0.0;

    match f.pe_ratio {
        Some(pe) if pe < 0.0 => score += 30.0,
        Some(pe) if pe > 200.0 => score += 30.0,
        Some(pe) if pe > 100.0 && !exempt => score += 20.0,
        Some(pe) if pe > 50.0 && !exempt => score += 10.0,
        Some(_) => {}
        None if !holding => score += 15.0,
        None => {}
    }

    match f.pb_ratio {
        Some(pb) if pb > 50.0 => score += 25.0,
        Some(pb) if pb > 20.0 => score += 15.0,
        Some(pb) if pb > 10.0 => score += 8.0,
        _ => {}
    }

    match f.price_to_sales() {
        Some(ps) if ps > 100.0 => score += 30.0,
        Some(ps) if ps > 50.0 => score += 20.0,
        Some(ps) if ps > 20.0 && !holding => score += 8.0,
        _ => {}
    }

    if s.change_3m_pct > 300.0 {
        score += 15.0;
    } else if s.change_3m_pct > 150.0 {
        score += 8.0;
    }

    f64::min(score, 100.0)
}

/// Sector-aware P/E band, P/B, RSI zone, three-month trend, normal volume.
/// Pinned instruments read a fixed high score.
pub fn quality_score(s: &ScreeningSummary) -> f64 {
    if s.pinned {
        return PINNED_QUALITY;
    }
    let holding = s.class == InstrumentClass::Holding;
    let mut score: f64 = 50.0;

    match (s.class, s.fundamentals.pe_ratio) {
        (InstrumentClass::Holding, Some(_)) => {}
        (InstrumentClass::Holding, None) => score += 5.0,
        (InstrumentClass::Defense, Some(pe)) => {
            if pe > 15.0 && pe < 120.0 {
                score += 15.0;
            } else if pe < 0.0 {
                score -= 15.0;
            }
        }
        (InstrumentClass::Technology, Some(pe)) => {
            if pe > 10.0 && pe < 80.0 {
                score += 15.0;
            } else if pe < 0.0 {
                score -= 15.0;
            }
        }
        (_, Some(pe)) => {
            if pe > 4.0 && pe < 15.0 {
                score += 20.0;
            } else if (15.0..25.0).contains(&pe) {
                score += 10.0;
            } else if pe >= 25.0 {
                score -= 5.0;
            }
        }
        (_, None) => {}
    }

    match s.fundamentals.pb_ratio {
        Some(pb) if pb > 0.0 && pb < 1.5 => score += 15.0,
        Some(pb) if pb > 0.0 && pb < 3.0 => score += 8.0,
        Some(pb) if pb > 8.0 && !holding => score -= 8.0,
        _ => {}
    }

    if s.rsi > 40.0 && s.rsi < 60.0 {
        score += 10.0;
    } else if s.rsi > 30.0 && s.rsi <= 40.0 {
        score += 15.0;
    } else if s.rsi > 70.0 {
        score -= 10.0;
    }

    if s.change_3m_pct > 5.0 && s.change_3m_pct < 40.0 {
        score += 10.0;
    } else if s.change_3m_pct < 0.0 {
        score -= 5.0;
    }

    if s.volume_ratio > 0.5 && s.volume_ratio < 3.0 {
        score += 5.0;
    }

    score.clamp(0.0, 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenedInstrument {
    pub summary: ScreeningSummary,
    pub manipulation: f64,
    pub bubble: f64,
    /// Quality after the manipulation and bubble penalties.
    pub quality: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Manipulation,
    Bubble,
    OverLimit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub instrument: ScreenedInstrument,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningOutcome {
    pub selected: Vec<ScreenedInstrument>,
    pub rejected: Vec<Rejection>,
}

impl ScreeningOutcome {
    pub fn selected_codes(&self) -> Vec<&str> {
        self.selected.iter().map(|s| s.summary.code.as_str()).collect()
    }
}

fn evaluate(summary: ScreeningSummary, params: &ScreeningParams) -> ScreenedInstrument {
    let manipulation = manipulation_score(&summary);
    let bubble = bubble_score(&summary);
    let mut quality = quality_score(&summary);
    if !summary.pinned {
        if manipulation >= params.manipulation_threshold {
            quality = 0.0;
        } else if bubble >= params.bubble_threshold {
            quality = (quality - BUBBLE_QUALITY_PENALTY).max(0.0);
        }
    }
    ScreenedInstrument {
        summary,
        manipulation,
        bubble,
        quality,
    }
}

fn by_quality(a: &ScreenedInstrument, b: &ScreenedInstrument) -> Ordering {
    b.quality
        .total_cmp(&a.quality)
        .then_with(|| a.summary.code.cmp(&b.summary.code))
}

/// Pinned instruments first (by code), then unsuspicious instruments by
/// quality up to `limit` in total.
pub fn screen(summaries: Vec<ScreeningSummary>, params: &ScreeningParams) -> ScreeningOutcome {
    let total = summaries.len();
    let mut pinned = Vec::new();
    let mut eligible = Vec::new();
    let mut rejected = Vec::new();

    for summary in summaries {
        let item = evaluate(summary, params);
        if item.summary.pinned {
            pinned.push(item);
        } else if item.manipulation >= params.manipulation_threshold {
            debug!(code = %item.summary.code, score = item.manipulation, "manipulation suspected");
            rejected.push(Rejection {
                instrument: item,
                reason: RejectReason::Manipulation,
            });
        } else if item.bubble >= params.bubble_threshold {
            debug!(code = %item.summary.code, score = item.bubble, "bubble suspected");
            rejected.push(Rejection {
                instrument: item,
                reason: RejectReason::Bubble,
            });
        } else {
            eligible.push(item);
        }
    }

    pinned.sort_by(|a, b| a.summary.code.cmp(&b.summary.code));
    eligible.sort_by(by_quality);

    let slots = params.limit.saturating_sub(pinned.len()).min(eligible.len());
    let over = eligible.split_off(slots);
    rejected.extend(over.into_iter().map(|instrument| Rejection {
        instrument,
        reason: RejectReason::OverLimit,
    }));
    rejected.sort_by(|a, b| a.instrument.summary.code.cmp(&b.instrument.summary.code));

    let mut selected = pinned;
    selected.extend(eligible);

    info!(
        screened = total,
        selected = selected.len(),
        rejected = rejected.len(),
        "screening complete"
    );
    ScreeningOutcome { selected, rejected }
}
