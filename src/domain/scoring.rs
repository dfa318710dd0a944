//! Rule scoring engine.
//!
//! Technical and fundamental scores each start at 50 and accumulate signed
//! integer deltas from fixed rules, then clamp to [0, 100]. Each rule that
//! fires appends one line to the explanation trail, in rule order, so the
//! same inputs always replay to the same trail.

use crate::domain::fundamentals::{FundamentalSnapshot, InstrumentClass};
use crate::domain::indicator::adx::TrendStrength;
use crate::domain::indicator::candlestick::PatternBias;
use crate::domain::indicator::cross::CrossState;
use crate::domain::indicator::divergence::Divergence;
use crate::domain::indicator::ichimoku::CloudState;
use crate::domain::indicator::sar::SarDirection;
use crate::domain::indicator::Reading;
use crate::domain::snapshot::IndicatorSnapshot;
use serde::Serialize;

pub const BASELINE: f64 = 50.0;
pub const TECHNICAL_WEIGHT: f64 = 0.6;
pub const FUNDAMENTAL_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeScore {
    pub technical_score: f64,
    pub fundamental_score: f64,
    pub total_score: f64,
    pub explanations: Vec<String>,
}

#[derive(Default)]
struct Tally {
    points: i32,
    trail: Vec<String>,
}

impl Tally {
    fn add(&mut self, delta: i32, note: impl Into<String>) {
        self.points += delta;
        self.trail.push(format!("[{:+}] {}", delta, note.into()));
    }

    fn note(&mut self, note: impl Into<String>) {
        self.trail.push(format!("[0] {}", note.into()));
    }

    fn score(&self) -> f64 {
        (BASELINE + self.points as f64).clamp(0.0, 100.0)
    }
}

fn technical(snapshot: &IndicatorSnapshot, t: &mut Tally) {
    match snapshot.cross.get().map(|c| c.state) {
        Some(CrossState::Golden) => t.add(30, "golden cross: SMA50 crossed above SMA200"),
        Some(CrossState::Above) => t.add(18, "SMA50 above SMA200"),
        Some(CrossState::Death) => t.add(-25, "death cross: SMA50 crossed below SMA200"),
        Some(CrossState::Below) => t.add(-10, "SMA50 below SMA200"),
        None => {}
    }

    if let Some(adx) = snapshot.adx.get() {
        match adx.strength() {
            TrendStrength::VeryStrong => t.add(8, format!("ADX {:.0}: very strong trend", adx.adx)),
            TrendStrength::Strong => t.add(4, format!("ADX {:.0}: strong trend", adx.adx)),
            TrendStrength::Weak => t.note(format!("ADX {:.0}: weak or no trend", adx.adx)),
        }
    }

    if let Some(ich) = snapshot.ichimoku.get() {
        match ich.cloud {
            CloudState::Above => t.add(15, "price above the Ichimoku cloud"),
            CloudState::Below => t.add(-12, "price below the Ichimoku cloud"),
            CloudState::Inside => t.note("price inside the Ichimoku cloud"),
            CloudState::Undetermined => {}
        }
        if ich.tenkan_above_kijun() {
            t.add(5, "Tenkan above Kijun");
        }
    }

    match snapshot.sar.get().map(|s| s.direction) {
        Some(SarDirection::Up) => t.add(8, "Parabolic SAR uptrend"),
        Some(SarDirection::Down) => t.add(-5, "Parabolic SAR downtrend"),
        None => {}
    }

    if let Some(rsi) = snapshot.rsi.get() {
        if rsi < 30.0 {
            t.add(12, format!("RSI {:.1}: oversold", rsi));
        } else if rsi <= 50.0 {
            t.add(10, format!("RSI {:.1}: accumulation zone", rsi));
        } else if rsi <= 65.0 {
            t.add(6, format!("RSI {:.1}: positive momentum", rsi));
        } else if rsi > 75.0 {
            t.add(-8, format!("RSI {:.1}: overbought", rsi));
        }
    }

    if let Some(macd) = snapshot.macd.get() {
        if macd.line > macd.signal {
            t.add(6, "MACD above signal line");
        } else {
            t.add(-4, "MACD at or below signal line");
        }
    }

    if let Some(stoch) = snapshot.stochastic.get() {
        if stoch.k < 20.0 {
            t.add(8, format!("stochastic %K {:.0}: oversold", stoch.k));
        } else if stoch.k > 80.0 {
            t.add(-6, format!("stochastic %K {:.0}: overbought", stoch.k));
        }
    }

    let div = &snapshot.divergence;
    for (name, reading) in [("RSI", div.rsi), ("MACD", div.macd), ("OBV", div.obv)] {
        match reading.get() {
            Some(Divergence::Bullish) => t.add(5, format!("{} bullish divergence", name)),
            Some(Divergence::Bearish) => t.add(-5, format!("{} bearish divergence", name)),
            _ => {}
        }
    }
    if div.bullish_count() >= 2 {
        t.add(5, "multiple bullish divergences agree");
    }

    if let Reading::Ready(patterns) = &snapshot.patterns {
        for pattern in patterns {
            match pattern.bias() {
                PatternBias::Bullish => t.add(6, format!("candle: {}", pattern)),
                PatternBias::Bearish => t.add(-5, format!("candle: {}", pattern)),
                PatternBias::Neutral => t.note(format!("candle: {}", pattern)),
            }
        }
    }

    if let Some(obv) = snapshot.obv_trend.get() {
        if obv > 0.0 {
            t.add(8, "OBV rising: accumulation");
        } else if obv < 0.0 {
            t.add(-5, "OBV falling: distribution");
        }
    }

    if let Some(bb) = snapshot.bollinger.get() {
        if bb.percent_b < 0.1 {
            t.add(8, format!("Bollinger %B {:.2}: near lower band", bb.percent_b));
        } else if bb.percent_b > 0.9 {
            t.add(-6, format!("Bollinger %B {:.2}: near upper band", bb.percent_b));
        }
    }
}

fn fundamental(
    snapshot: &IndicatorSnapshot,
    f: &FundamentalSnapshot,
    class: InstrumentClass,
    t: &mut Tally,
) {
    let profile = class.valuation();
    if let Some(pe) = f.pe_ratio {
        if profile.skip_pe {
            t.note(format!("P/E {:.1} not scored for {}", pe, class));
        } else if pe > profile.value.0 && pe < profile.value.1 {
            t.add(20, format!("P/E {:.1}: value", pe));
        } else if pe >= profile.value.1 && pe < profile.fair_upper {
            t.add(10, format!("P/E {:.1}: fair", pe));
        } else if pe >= profile.expensive_at {
            t.add(-15, format!("P/E {:.1}: expensive", pe));
        }
    }

    if let Some(roe) = f.roe_pct {
        if roe > 20.0 {
            t.add(15, format!("ROE {:.1}%: high profitability", roe));
        } else if roe > 10.0 {
            t.add(8, format!("ROE {:.1}%: good profitability", roe));
        } else if roe < 0.0 {
            t.add(-15, format!("ROE {:.1}%: loss-making", roe));
        }
    }

    if let Some(de) = f.debt_to_equity {
        if de < 0.5 {
            t.add(10, format!("D/E {:.2}: low leverage", de));
        } else if de > 2.0 {
            t.add(-10, format!("D/E {:.2}: high leverage", de));
        }
    }

    if let Some(fcf) = f.free_cash_flow {
        if fcf > 0.0 {
            t.add(10, "free cash flow positive");
        } else if fcf < 0.0 {
            t.add(-8, "free cash flow negative");
        }
    }

    if let Some(growth) = f.revenue_growth_pct {
        if growth > 30.0 {
            t.add(10, format!("revenue growth {:.1}%: strong", growth));
        } else if growth > 10.0 {
            t.add(5, format!("revenue growth {:.1}%", growth));
        } else if growth < 0.0 {
            t.add(-8, format!("revenue shrinking {:.1}%", growth));
        }
    }

    if let Some(sharpe) = snapshot.sharpe.get() {
        if sharpe > 1.5 {
            t.add(8, format!("Sharpe {:.2}: good risk-adjusted return", sharpe));
        } else if sharpe < 0.0 {
            t.add(-5, format!("Sharpe {:.2}: negative", sharpe));
        }
    }
}

/// Score one instrument. Indeterminate readings and missing ratios do not
/// contribute.
pub fn score(
    snapshot: &IndicatorSnapshot,
    fundamentals: &FundamentalSnapshot,
    class: InstrumentClass,
) -> CompositeScore {
    let mut tech = Tally::default();
    technical(snapshot, &mut tech);

    let mut fund = Tally::default();
    fundamental(snapshot, fundamentals, class, &mut fund);

    let technical_score = tech.score();
    let fundamental_score = fund.score();
    let total_score =
        (TECHNICAL_WEIGHT * technical_score + FUNDAMENTAL_WEIGHT * fundamental_score).round();

    let mut explanations = tech.trail;
    explanations.extend(fund.trail);

    CompositeScore {
        technical_score,
        fundamental_score,
        total_score,
        explanations,
    }
}
