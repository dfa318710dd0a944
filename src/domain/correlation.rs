//! Pairwise return correlation across the candidate set.
//!
//! Series are inner-joined on their dates and only the trailing `window`
//! common points are used. When fewer than two instruments remain or the
//! overlap is below `min_overlap` the result is [`CorrelationResult::Unavailable`];
//! callers treat that as "no correlation constraint", not as an error.

use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationParams {
    pub window: usize,
    pub min_overlap: usize,
}

impl Default for CorrelationParams {
    fn default() -> Self {
        Self {
            window: 60,
            min_overlap: 20,
        }
    }
}

/// Dated simple returns; the first bar yields no return.
pub fn returns_from_bars(bars: &[PriceBar]) -> Vec<(NaiveDate, f64)> {
    bars.windows(2)
        .map(|w| {
            let r = if w[0].close > 0.0 {
                (w[1].close - w[0].close) / w[0].close
            } else {
                0.0
            };
            (w[1].date, r)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    codes: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    fn index(&self, code: &str) -> Option<usize> {
        self.codes.binary_search_by(|c| c.as_str().cmp(code)).ok()
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.values[self.index(a)?][self.index(b)?])
    }

    /// Distinct pairs (a < b) with |correlation| >= threshold.
    pub fn correlated_pairs(&self, threshold: f64) -> Vec<(String, String, f64)> {
        let mut out = Vec::new();
        for i in 0..self.codes.len() {
            for j in (i + 1)..self.codes.len() {
                let rho = self.values[i][j];
                if rho.abs() >= threshold {
                    out.push((self.codes[i].clone(), self.codes[j].clone(), rho));
                }
            }
        }
        out
    }

    pub fn has_correlated_partner(&self, code: &str, threshold: f64) -> bool {
        let Some(i) = self.index(code) else {
            return false;
        };
        (0..self.codes.len()).any(|j| j != i && self.values[i][j].abs() >= threshold)
    }

    /// Build a matrix from explicit off-diagonal entries. Unlisted pairs read 0.
    pub fn from_pairs(codes: &[&str], pairs: &[(&str, &str, f64)]) -> Self {
        let codes: Vec<String> = codes
            .iter()
            .map(|c| c.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let n = codes.len();
        let mut values = vec![vec![0.0; n]; n];
        for (i, row) in values.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        let mut matrix = Self { codes, values };
        for &(a, b, rho) in pairs {
            if let (Some(i), Some(j)) = (matrix.index(a), matrix.index(b)) {
                if i != j {
                    let rho = rho.clamp(-1.0, 1.0);
                    matrix.values[i][j] = rho;
                    matrix.values[j][i] = rho;
                }
            }
        }
        matrix
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnavailableReason {
    TooFewInstruments { count: usize },
    InsufficientOverlap { points: usize, required: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationResult {
    Available(CorrelationMatrix),
    Unavailable(UnavailableReason),
}

impl CorrelationResult {
    pub fn matrix(&self) -> Option<&CorrelationMatrix> {
        match self {
            CorrelationResult::Available(m) => Some(m),
            CorrelationResult::Unavailable(_) => None,
        }
    }

    pub fn has_correlated_partner(&self, code: &str, threshold: f64) -> bool {
        self.matrix()
            .is_some_and(|m| m.has_correlated_partner(code, threshold))
    }
}

/// Pearson correlation of two equal-length samples. Zero variance reads 0.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 || is_flat(&x[..n]) || is_flat(&y[..n]) {
        return 0.0;
    }
    let mx = x[..n].iter().sum::<f64>() / n as f64;
    let my = y[..n].iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return 0.0;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

// The mean of identical values can round away from them, leaving a
// residual variance, so flatness is checked on the raw samples.
fn is_flat(xs: &[f64]) -> bool {
    xs.iter().all(|&v| v == xs[0])
}

pub fn compute(
    returns: &BTreeMap<String, Vec<(NaiveDate, f64)>>,
    params: &CorrelationParams,
) -> CorrelationResult {
    if returns.len() < 2 {
        tracing::warn!(
            instruments = returns.len(),
            "correlation unavailable: fewer than two instruments"
        );
        return CorrelationResult::Unavailable(UnavailableReason::TooFewInstruments {
            count: returns.len(),
        });
    }

    let lookups: Vec<BTreeMap<NaiveDate, f64>> = returns
        .values()
        .map(|series| series.iter().copied().collect())
        .collect();

    let mut common: BTreeSet<NaiveDate> = lookups[0].keys().copied().collect();
    for lookup in &lookups[1..] {
        common.retain(|d| lookup.contains_key(d));
    }
    let skip = common.len().saturating_sub(params.window);
    let dates: Vec<NaiveDate> = common.into_iter().skip(skip).collect();

    let required = params.min_overlap.max(2);
    if dates.len() < required {
        tracing::warn!(
            points = dates.len(),
            required,
            "correlation unavailable: insufficient overlapping history"
        );
        return CorrelationResult::Unavailable(UnavailableReason::InsufficientOverlap {
            points: dates.len(),
            required,
        });
    }

    let aligned: Vec<Vec<f64>> = lookups
        .iter()
        .map(|lookup| dates.iter().filter_map(|d| lookup.get(d).copied()).collect())
        .collect();

    let n = aligned.len();
    let mut values = vec![vec![0.0; n]; n];
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let rho = pearson(&aligned[i], &aligned[j]);
            values[i][j] = rho;
            values[j][i] = rho;
        }
    }

    tracing::debug!(instruments = n, points = dates.len(), "correlation matrix computed");
    CorrelationResult::Available(CorrelationMatrix {
        codes: returns.keys().cloned().collect(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::test_bars::{day, from_closes};
    use approx::assert_relative_eq;

    fn series(values: &[f64]) -> Vec<(NaiveDate, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| (day(i), v))
            .collect()
    }

    fn wave(n: usize, phase: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (((i + phase) % 7) as f64 - 3.0) * 0.01)
            .collect()
    }

    #[test]
    fn pearson_of_identical_and_negated() {
        let x = wave(30, 0);
        let neg: Vec<f64> = x.iter().map(|v| -v).collect();
        assert_relative_eq!(pearson(&x, &x), 1.0, epsilon = 1e-12);
        assert_relative_eq!(pearson(&x, &neg), -1.0, epsilon = 1e-12);
        assert_eq!(pearson(&x, &[0.01; 30]), 0.0);
    }

    #[test]
    fn constant_series_read_zero_despite_rounding() {
        let x = wave(30, 0);
        for c in [0.1, 1.0 / 3.0, 0.07, -0.013, 1e-7] {
            assert_eq!(pearson(&x, &[c; 30]), 0.0, "constant {}", c);
            assert_eq!(pearson(&[c; 30], &x), 0.0, "constant {}", c);
        }
        assert_eq!(pearson(&[0.1; 7], &[0.2; 7]), 0.0);
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let mut m = BTreeMap::new();
        m.insert("AAA".to_string(), series(&wave(40, 0)));
        m.insert("BBB".to_string(), series(&wave(40, 2)));
        m.insert("CCC".to_string(), series(&wave(40, 0)));
        let result = compute(&m, &CorrelationParams::default());
        let matrix = result.matrix().unwrap();
        for a in matrix.codes() {
            assert_eq!(matrix.get(a, a), Some(1.0));
            for b in matrix.codes() {
                let rho = matrix.get(a, b).unwrap();
                assert_eq!(rho, matrix.get(b, a).unwrap());
                assert!((-1.0..=1.0).contains(&rho));
            }
        }
        assert!(matrix.has_correlated_partner("AAA", 0.85));
        assert!(!matrix.has_correlated_partner("BBB", 0.85));
        assert_eq!(matrix.correlated_pairs(0.85).len(), 1);
    }

    #[test]
    fn single_instrument_is_unavailable() {
        let mut m = BTreeMap::new();
        m.insert("AAA".to_string(), series(&wave(40, 0)));
        assert_eq!(
            compute(&m, &CorrelationParams::default()),
            CorrelationResult::Unavailable(UnavailableReason::TooFewInstruments { count: 1 })
        );
    }

    #[test]
    fn thin_overlap_is_unavailable() {
        let mut m = BTreeMap::new();
        m.insert("AAA".to_string(), series(&wave(40, 0)));
        // Only the first 10 dates overlap.
        m.insert("BBB".to_string(), series(&wave(10, 1)));
        let result = compute(&m, &CorrelationParams::default());
        assert_eq!(
            result,
            CorrelationResult::Unavailable(UnavailableReason::InsufficientOverlap {
                points: 10,
                required: 20
            })
        );
        assert!(!result.has_correlated_partner("AAA", 0.0));
    }

    #[test]
    fn window_keeps_trailing_points() {
        let mut a = wave(100, 0);
        let mut b = wave(100, 3);
        // Identical in the trailing 30 points only.
        for i in 70..100 {
            b[i] = a[i];
        }
        a[0] = 0.5;
        let mut m = BTreeMap::new();
        m.insert("A".to_string(), series(&a));
        m.insert("B".to_string(), series(&b));
        let params = CorrelationParams {
            window: 30,
            min_overlap: 20,
        };
        let rho = compute(&m, &params).matrix().unwrap().get("A", "B").unwrap();
        assert_relative_eq!(rho, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn returns_from_bars_skips_first_bar() {
        let r = returns_from_bars(&from_closes(&[100.0, 110.0, 99.0]));
        assert_eq!(r.len(), 2);
        assert_eq!(r[0].0, day(1));
        assert_relative_eq!(r[0].1, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn from_pairs_is_symmetric() {
        let m = CorrelationMatrix::from_pairs(&["B", "A"], &[("A", "B", 0.9)]);
        assert_eq!(m.codes(), &["A".to_string(), "B".to_string()]);
        assert_eq!(m.get("B", "A"), Some(0.9));
        assert_eq!(m.get("A", "C"), None);
    }
}
