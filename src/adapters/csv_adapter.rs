//! CSV file data adapter.
//!
//! Layout under the base directory:
//! - `CODE.csv` with `date,open,high,low,close,volume`
//! - optional `fundamentals.csv` with one row per code
//!
//! Proposal files (`code,action,weight_pct,target_price,stop_price,rationale`)
//! are read leniently: a cell that does not parse becomes a missing field.

use crate::domain::allocation::{Action, AllocationProposal};
use crate::domain::error::RiskfuseError;
use crate::domain::fundamentals::FundamentalSnapshot;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const FUNDAMENTALS_FILE: &str = "fundamentals.csv";

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct FundamentalRecord {
    code: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pe_ratio: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pb_ratio: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    roe_pct: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    roa_pct: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    debt_to_equity: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    free_cash_flow: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    revenue_growth_pct: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    market_cap: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    revenue: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    float_shares: Option<f64>,
}

impl From<FundamentalRecord> for FundamentalSnapshot {
    fn from(r: FundamentalRecord) -> Self {
        FundamentalSnapshot {
            pe_ratio: r.pe_ratio,
            pb_ratio: r.pb_ratio,
            roe_pct: r.roe_pct,
            roa_pct: r.roa_pct,
            debt_to_equity: r.debt_to_equity,
            free_cash_flow: r.free_cash_flow,
            revenue_growth_pct: r.revenue_growth_pct,
            market_cap: r.market_cap,
            revenue: r.revenue,
            float_shares: r.float_shares,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProposalRecord {
    #[serde(default)]
    code: String,
    #[serde(default)]
    action: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    weight_pct: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    target_price: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    stop_price: Option<f64>,
    #[serde(default)]
    rationale: String,
}

impl From<ProposalRecord> for AllocationProposal {
    fn from(r: ProposalRecord) -> Self {
        AllocationProposal {
            code: r.code,
            action: Action::parse(&r.action),
            weight_pct: r.weight_pct,
            target_price: r.target_price,
            stop_price: r.stop_price,
            rationale: r.rationale,
        }
    }
}

fn data_error(path: &Path, reason: impl std::fmt::Display) -> RiskfuseError {
    RiskfuseError::Data {
        source_name: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn parse_field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    path: &Path,
) -> Result<T, RiskfuseError>
where
    T::Err: std::fmt::Display,
{
    record
        .get(index)
        .ok_or_else(|| data_error(path, format!("missing {} column", name)))?
        .trim()
        .parse()
        .map_err(|e| data_error(path, format!("invalid {} value: {}", name, e)))
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, code: &str) -> Result<Vec<PriceBar>, RiskfuseError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| data_error(&path, e))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_error(&path, e))?;

            let date_str: String = parse_field(&record, 0, "date", &path)?;
            let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                .map_err(|e| data_error(&path, format!("invalid date format: {}", e)))?;

            bars.push(PriceBar {
                code: code.to_string(),
                date,
                open: parse_field(&record, 1, "open", &path)?,
                high: parse_field(&record, 2, "high", &path)?,
                low: parse_field(&record, 3, "low", &path)?,
                close: parse_field(&record, 4, "close", &path)?,
                volume: parse_field(&record, 5, "volume", &path)?,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn fetch_fundamentals(
        &self,
        code: &str,
    ) -> Result<Option<FundamentalSnapshot>, RiskfuseError> {
        let path = self.base_path.join(FUNDAMENTALS_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| data_error(&path, e))?;
        for result in rdr.deserialize::<FundamentalRecord>() {
            let record = result.map_err(|e| data_error(&path, e))?;
            if record.code.trim().eq_ignore_ascii_case(code) {
                return Ok(Some(record.into()));
            }
        }
        Ok(None)
    }

    fn list_symbols(&self) -> Result<Vec<String>, RiskfuseError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| data_error(&self.base_path, e))?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_error(&self.base_path, e))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if name_str == FUNDAMENTALS_FILE {
                continue;
            }
            if let Some(code) = name_str.strip_suffix(".csv") {
                symbols.push(code.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

/// Read an allocation proposal file. Rows that are structurally broken
/// (wrong column count) fail the read; bad cells do not.
pub fn read_proposals(path: &Path) -> Result<Vec<AllocationProposal>, RiskfuseError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| data_error(path, e))?;
    let mut out = Vec::new();
    for result in rdr.deserialize::<ProposalRecord>() {
        let record = result.map_err(|e| data_error(path, e))?;
        out.push(record.into());
    }
    tracing::debug!(path = %path.display(), proposals = out.len(), "proposals read");
    Ok(out)
}
