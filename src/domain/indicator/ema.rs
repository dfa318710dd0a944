//! Exponential Moving Average over raw values.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) values are invalid.

/// EMA over a raw value sequence; `None` during warmup.
///
/// Returns an empty vector for `period == 0`.
pub fn ema_values(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, &v) in values.iter().enumerate() {
        if i < period - 1 {
            sum += v;
            out.push(None);
        } else if i == period - 1 {
            sum += v;
            ema = sum / period as f64;
            out.push(Some(ema));
        } else {
            ema = v * k + ema * (1.0 - k);
            out.push(Some(ema));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_warmup() {
        let out = ema_values(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert!(out[0].is_none());
        assert!(out[1].is_none());
        assert!(out[2].is_some());
        assert!(out[4].is_some());
    }

    #[test]
    fn ema_seed_is_sma() {
        let out = ema_values(&[10.0, 20.0, 30.0], 3);
        let v = out[2].expect("seed should be valid");
        assert!((v - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_recursive_calculation() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        let out = ema_values(&values, 3);

        let k = 2.0 / 4.0;
        let sma = 20.0;
        let ema_3 = 40.0 * k + sma * (1.0 - k);
        let ema_4 = 50.0 * k + ema_3 * (1.0 - k);

        assert!((out[2].unwrap() - sma).abs() < f64::EPSILON);
        assert!((out[3].unwrap() - ema_3).abs() < f64::EPSILON);
        assert!((out[4].unwrap() - ema_4).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_period_1_tracks_input() {
        let out = ema_values(&[10.0, 20.0, 30.0], 1);
        assert_eq!(out, vec![Some(10.0), Some(20.0), Some(30.0)]);
    }

    #[test]
    fn ema_empty_and_zero_period() {
        assert!(ema_values(&[], 3).is_empty());
        assert!(ema_values(&[1.0, 2.0], 0).is_empty());
    }
}
