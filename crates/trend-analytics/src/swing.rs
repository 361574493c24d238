//! 스윙 포인트 탐지.
//!
//! 스윙 고점은 좌우 `window`개 값보다 모두 엄격하게 큰 값이고, 스윙 저점은
//! 모두 엄격하게 작은 값입니다. 가격과 지표 시계열에 같은 방식을
//! 사용합니다. 값이 없는 구간은 `NaN`으로 표현하며, 창 안에 `NaN`이 있으면
//! 스윙으로 판정하지 않습니다.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 스윙 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingKind {
    High,
    Low,
}

/// 국소 극값.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwingPoint {
    pub index: usize,
    pub timestamp: Option<DateTime<Utc>>,
    pub value: f64,
    pub kind: SwingKind,
    /// 판정에 사용한 좌우 창 크기
    pub window: usize,
}

/// 시계열에서 스윙 포인트를 찾습니다.
///
/// 양 끝 `window`개 인덱스는 창이 완성되지 않으므로 후보에서 제외됩니다.
pub fn find_swings(values: &[f64], window: usize, kind: SwingKind) -> Vec<SwingPoint> {
    let n = values.len();
    if window == 0 || n < 2 * window + 1 {
        return Vec::new();
    }

    let mut points = Vec::new();
    for i in window..n - window {
        let center = values[i];
        if !center.is_finite() {
            continue;
        }

        let is_extreme = (i - window..=i + window)
            .filter(|&j| j != i)
            .all(|j| match kind {
                SwingKind::High => center > values[j],
                SwingKind::Low => center < values[j],
            });

        if is_extreme {
            points.push(SwingPoint {
                index: i,
                timestamp: None,
                value: center,
                kind,
                window,
            });
        }
    }

    points
}

/// `Option` 지표 열을 `NaN` 표현 열로 변환합니다.
pub fn option_column(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}

// =============================================================================
// 테스트
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_simple_peak_and_trough() {
        let values = [1.0, 2.0, 5.0, 2.0, 1.0, 0.5, 1.0, 2.0];

        let highs = find_swings(&values, 2, SwingKind::High);
        assert_eq!(highs.len(), 1);
        assert_eq!(highs[0].index, 2);
        assert_eq!(highs[0].value, 5.0);

        let lows = find_swings(&values, 2, SwingKind::Low);
        assert_eq!(lows.len(), 1);
        assert_eq!(lows[0].index, 5);
    }

    #[test]
    fn test_plateau_is_not_swing() {
        // 같은 값이 연속되면 엄격한 극값이 아님
        let values = [1.0, 2.0, 5.0, 5.0, 2.0, 1.0];
        assert!(find_swings(&values, 2, SwingKind::High).is_empty());
    }

    #[test]
    fn test_nan_in_window_blocks_swing() {
        let values = option_column(&[Some(1.0), None, Some(5.0), Some(2.0), Some(1.0)]);
        assert!(find_swings(&values, 2, SwingKind::High).is_empty());
    }

    #[test]
    fn test_short_series() {
        assert!(find_swings(&[1.0, 3.0, 1.0], 2, SwingKind::High).is_empty());
        assert!(find_swings(&[1.0, 3.0, 1.0], 0, SwingKind::High).is_empty());
    }

    proptest! {
        #[test]
        fn prop_swing_high_is_strict_window_maximum(
            values in prop::collection::vec(0.0f64..1000.0, 0..120),
            window in 1usize..8,
        ) {
            for point in find_swings(&values, window, SwingKind::High) {
                for j in point.index - window..=point.index + window {
                    if j != point.index {
                        prop_assert!(point.value > values[j]);
                    }
                }
            }
        }

        #[test]
        fn prop_swing_low_is_strict_window_minimum(
            values in prop::collection::vec(0.0f64..1000.0, 0..120),
            window in 1usize..8,
        ) {
            for point in find_swings(&values, window, SwingKind::Low) {
                for j in point.index - window..=point.index + window {
                    if j != point.index {
                        prop_assert!(point.value < values[j]);
                    }
                }
            }
        }
    }
}
