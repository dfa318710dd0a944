//! Instrument classification port.

use crate::domain::fundamentals::Classification;

/// Structural lookup of classification tags. Codes the capability does not
/// know classify as `Unclassified`, unpinned.
pub trait ClassificationPort {
    fn classify(&self, code: &str) -> Classification;
}
