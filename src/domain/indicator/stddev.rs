//! Standard Deviation.
//!
//! Population standard deviation, shared by Bollinger bands and the
//! volatility metrics.

/// Population standard deviation (divides by N). Empty input reads 0.
pub fn population_stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stddev_known_values() {
        // 2,4,4,4,5,5,7,9 has population stddev 2
        let sd = population_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((sd - 2.0).abs() < 1e-12);
    }

    #[test]
    fn stddev_constant_is_zero() {
        assert_eq!(population_stddev(&[5.0; 6]), 0.0);
    }

    #[test]
    fn stddev_empty_input() {
        assert_eq!(population_stddev(&[]), 0.0);
    }
}
