#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use riskfuse::domain::enforcer::Candidate;
use riskfuse::domain::error::RiskfuseError;
use riskfuse::domain::fundamentals::{FundamentalSnapshot, InstrumentClass};
pub use riskfuse::domain::ohlcv::PriceBar;
use riskfuse::domain::scoring::CompositeScore;
use riskfuse::domain::snapshot::{SnapshotParams, compute};
use riskfuse::ports::data_port::DataPort;
use std::collections::{BTreeMap, HashMap};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub fundamentals: HashMap<String, FundamentalSnapshot>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            fundamentals: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_fundamentals(mut self, code: &str, f: FundamentalSnapshot) -> Self {
        self.fundamentals.insert(code.to_string(), f);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, code: &str) -> Result<Vec<PriceBar>, RiskfuseError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(RiskfuseError::Data {
                source_name: code.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(code).cloned().unwrap_or_default())
    }

    fn fetch_fundamentals(
        &self,
        code: &str,
    ) -> Result<Option<FundamentalSnapshot>, RiskfuseError> {
        Ok(self.fundamentals.get(code).cloned())
    }

    fn list_symbols(&self) -> Result<Vec<String>, RiskfuseError> {
        let mut codes: Vec<String> = self.data.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }
}

pub fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i as i64)
}

pub fn make_bar(code: &str, i: usize, close: f64) -> PriceBar {
    PriceBar {
        code: code.to_string(),
        date: day(i),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 10_000,
    }
}

pub fn bars_from_closes(code: &str, closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(code, i, c))
        .collect()
}

/// Linear trend with a small deterministic zig-zag so returns have variance.
pub fn trending(code: &str, n: usize, start: f64, step: f64) -> Vec<PriceBar> {
    let closes: Vec<f64> = (0..n)
        .map(|i| start + step * i as f64 + if i % 2 == 0 { 0.4 } else { -0.4 })
        .collect();
    bars_from_closes(code, &closes)
}

/// Sine wave around `base`.
pub fn wave(code: &str, n: usize, base: f64, amplitude: f64, period: f64, phase: f64) -> Vec<PriceBar> {
    let closes: Vec<f64> = (0..n)
        .map(|i| base + amplitude * ((i as f64) * std::f64::consts::TAU / period + phase).sin())
        .collect();
    bars_from_closes(code, &closes)
}

/// CSV text in the `CODE.csv` layout.
pub fn bars_to_csv(bars: &[PriceBar]) -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date.format("%Y-%m-%d"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}

/// A candidate with no history, a fixed price and the given total score.
pub fn candidate(code: &str, price: f64, total: f64, class: InstrumentClass) -> Candidate {
    let mut snapshot = compute(code, &[], &SnapshotParams::default());
    snapshot.last_price = Some(price);
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

pub fn candidates(list: &[(&str, f64, InstrumentClass)]) -> BTreeMap<String, Candidate> {
    list.iter()
        .map(|&(code, total, class)| (code.to_string(), candidate(code, 100.0, total, class)))
        .collect()
}
