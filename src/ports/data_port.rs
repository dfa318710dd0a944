//! Market and fundamental data port.

use crate::domain::error::RiskfuseError;
use crate::domain::fundamentals::FundamentalSnapshot;
use crate::domain::ohlcv::PriceBar;

pub trait DataPort {
    /// Bars for `code` in ascending date order.
    fn fetch_bars(&self, code: &str) -> Result<Vec<PriceBar>, RiskfuseError>;

    /// `None` when the source has no ratios for `code`.
    fn fetch_fundamentals(&self, code: &str)
    -> Result<Option<FundamentalSnapshot>, RiskfuseError>;

    fn list_symbols(&self) -> Result<Vec<String>, RiskfuseError>;
}
