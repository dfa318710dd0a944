//! Instrument universe.
//!
//! Parses code lists and loads each instrument's history, fundamentals and
//! classification, skipping instruments with unusable data.

use crate::domain::error::RiskfuseError;
use crate::domain::fundamentals::{Classification, FundamentalSnapshot};
use crate::domain::ohlcv::PriceBar;
use crate::ports::classification_port::ClassificationPort;
use crate::ports::data_port::DataPort;
use std::collections::HashSet;
use tracing::{info, warn};

pub const MIN_BARS: usize = 20;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

impl From<UniverseError> for RiskfuseError {
    fn from(err: UniverseError) -> Self {
        RiskfuseError::invalid("universe", "codes", err.to_string())
    }
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone)]
pub struct Instrument {
    pub code: String,
    pub bars: Vec<PriceBar>,
    pub fundamentals: FundamentalSnapshot,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct Universe {
    pub instruments: Vec<Instrument>,
    pub skipped: Vec<SkippedCode>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.instruments.len()
    }

    pub fn get(&self, code: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.code == code)
    }
}

/// Load every code, skipping those with no data or fewer than `min_bars`.
/// Fails only when nothing usable remains.
pub fn load_universe(
    data_port: &dyn DataPort,
    classifier: &dyn ClassificationPort,
    codes: &[String],
    min_bars: usize,
) -> Result<Universe, RiskfuseError> {
    let mut instruments = Vec::new();
    let mut skipped = Vec::new();

    for code in codes {
        let bars = match data_port.fetch_bars(code) {
            Ok(bars) => bars,
            Err(e) => {
                warn!(code = %code, error = %e, "skipping instrument");
                skipped.push(SkippedCode {
                    code: code.clone(),
                    reason: SkipReason::NoData,
                });
                continue;
            }
        };

        if bars.is_empty() {
            warn!(code = %code, "skipping instrument: no data found");
            skipped.push(SkippedCode {
                code: code.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        }

        if bars.len() < min_bars {
            warn!(
                code = %code,
                bars = bars.len(),
                minimum = min_bars,
                "skipping instrument: insufficient history"
            );
            skipped.push(SkippedCode {
                code: code.clone(),
                reason: SkipReason::InsufficientBars { bars: bars.len() },
            });
            continue;
        }

        let fundamentals = match data_port.fetch_fundamentals(code) {
            Ok(f) => f.unwrap_or_default(),
            Err(e) => {
                warn!(code = %code, error = %e, "fundamentals unavailable");
                FundamentalSnapshot::default()
            }
        };

        info!(code = %code, bars = bars.len(), "instrument loaded");
        instruments.push(Instrument {
            code: code.clone(),
            bars,
            fundamentals,
            classification: classifier.classify(code),
        });
    }

    if instruments.is_empty() {
        return Err(match codes {
            [single] => RiskfuseError::NoData {
                code: single.clone(),
            },
            _ => RiskfuseError::InsufficientData {
                code: "all".to_string(),
                bars: 0,
                minimum: min_bars,
            },
        });
    }

    if !skipped.is_empty() {
        info!(
            loaded = instruments.len(),
            requested = codes.len(),
            "continuing with a partial universe"
        );
    }

    Ok(Universe {
        instruments,
        skipped,
    })
}
