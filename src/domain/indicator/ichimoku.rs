//! Ichimoku cloud.
//!
//! Tenkan = midpoint(9), Kijun = midpoint(26), where midpoint(n) is the mean
//! of the highest high and lowest low over n bars. Senkou A is the mean of
//! Tenkan and Kijun, Senkou B is midpoint(52); both are plotted 26 bars
//! ahead, so the cloud under today's bar was computed 26 bars ago.

use crate::domain::indicator::Reading;
use crate::domain::ohlcv::PriceBar;
use serde::Serialize;

pub const TENKAN_PERIOD: usize = 9;
pub const KIJUN_PERIOD: usize = 26;
pub const SENKOU_B_PERIOD: usize = 52;
pub const DISPLACEMENT: usize = 26;

/// Bars needed before the cloud under the last bar is known.
pub const CLOUD_MINIMUM: usize = SENKOU_B_PERIOD + DISPLACEMENT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CloudState {
    Above,
    Below,
    Inside,
    Undetermined,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IchimokuReading {
    pub tenkan: f64,
    pub kijun: f64,
    pub senkou_a: Option<f64>,
    pub senkou_b: Option<f64>,
    pub cloud: CloudState,
}

impl IchimokuReading {
    pub fn tenkan_above_kijun(&self) -> bool {
        self.tenkan > self.kijun
    }
}

/// Midpoint of the `period` bars ending at `end` (inclusive).
fn midpoint(bars: &[PriceBar], end: usize, period: usize) -> Option<f64> {
    if end >= bars.len() || end + 1 < period {
        return None;
    }
    let window = &bars[end + 1 - period..=end];
    let high = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let low = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    Some((high + low) / 2.0)
}

/// Needs `KIJUN_PERIOD` bars; the cloud stays `Undetermined` below
/// `CLOUD_MINIMUM`.
pub fn latest_ichimoku(bars: &[PriceBar]) -> Reading<IchimokuReading> {
    let n = bars.len();
    let last = n.checked_sub(1);
    let (Some(tenkan), Some(kijun)) = (
        last.and_then(|end| midpoint(bars, end, TENKAN_PERIOD)),
        last.and_then(|end| midpoint(bars, end, KIJUN_PERIOD)),
    ) else {
        return Reading::Indeterminate {
            bars: n,
            minimum: KIJUN_PERIOD,
        };
    };

    let (senkou_a, senkou_b) = match n.checked_sub(1 + DISPLACEMENT) {
        Some(past) => {
            let a = match (
                midpoint(bars, past, TENKAN_PERIOD),
                midpoint(bars, past, KIJUN_PERIOD),
            ) {
                (Some(t), Some(k)) => Some((t + k) / 2.0),
                _ => None,
            };
            (a, midpoint(bars, past, SENKOU_B_PERIOD))
        }
        None => (None, None),
    };

    let close = bars[n - 1].close;
    let cloud = match (senkou_a, senkou_b) {
        (Some(a), Some(b)) => {
            let top = a.max(b);
            let bottom = a.min(b);
            if close > top {
                CloudState::Above
            } else if close < bottom {
                CloudState::Below
            } else {
                CloudState::Inside
            }
        }
        _ => CloudState::Undetermined,
    };

    Reading::Ready(IchimokuReading {
        tenkan,
        kijun,
        senkou_a,
        senkou_b,
        cloud,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::test_bars::banded;

    fn trend(n: usize, step: f64) -> Vec<PriceBar> {
        let closes: Vec<f64> = (0..n).map(|i| 200.0 + step * i as f64).collect();
        banded(&closes)
    }

    #[test]
    fn uptrend_is_above_cloud() {
        let reading = latest_ichimoku(&trend(100, 1.0)).get().unwrap();
        assert_eq!(reading.cloud, CloudState::Above);
        assert!(reading.tenkan_above_kijun());
    }

    #[test]
    fn downtrend_is_below_cloud() {
        let reading = latest_ichimoku(&trend(100, -1.0)).get().unwrap();
        assert_eq!(reading.cloud, CloudState::Below);
        assert!(!reading.tenkan_above_kijun());
    }

    #[test]
    fn flat_market_is_inside_cloud() {
        let reading = latest_ichimoku(&banded(&[100.0; 80])).get().unwrap();
        assert_eq!(reading.cloud, CloudState::Inside);
    }

    #[test]
    fn cloud_undetermined_below_78_bars() {
        let reading = latest_ichimoku(&trend(77, 1.0)).get().unwrap();
        assert_eq!(reading.cloud, CloudState::Undetermined);
        assert!(reading.senkou_a.is_some());
        assert!(reading.senkou_b.is_none());

        let reading = latest_ichimoku(&trend(78, 1.0)).get().unwrap();
        assert_ne!(reading.cloud, CloudState::Undetermined);
    }

    #[test]
    fn tenkan_kijun_need_26_bars() {
        assert_eq!(
            latest_ichimoku(&trend(25, 1.0)),
            Reading::Indeterminate {
                bars: 25,
                minimum: 26
            }
        );
        assert!(latest_ichimoku(&[]).get().is_none());
    }

    #[test]
    fn empty_history_is_indeterminate() {
        assert_eq!(
            latest_ichimoku(&[]),
            Reading::Indeterminate {
                bars: 0,
                minimum: 26
            }
        );
        assert_eq!(midpoint(&[], usize::MAX, TENKAN_PERIOD), None);
    }

    #[test]
    fn midpoint_uses_high_and_low() {
        let bars = banded(&[10.0, 20.0, 30.0]);
        // highest high 31, lowest low 9
        assert_eq!(midpoint(&bars, 2, 3), Some(20.0));
    }
}
