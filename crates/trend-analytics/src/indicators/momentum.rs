//! 모멘텀 지표 (Momentum Indicators).
//!
//! - RSI (Relative Strength Index)

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// RSI 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RsiParams {
    /// RSI 기간 (기본: 14).
    pub period: usize,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self { period: 14 }
    }
}

/// 모멘텀 지표 계산기.
#[derive(Debug, Default, Clone, Copy)]
pub struct MomentumCalculator;

impl MomentumCalculator {
    pub fn new() -> Self {
        Self
    }

    /// RSI (Relative Strength Index) 계산.
    ///
    /// RSI = 100 - (100 / (1 + RS))
    /// RS = 평균 상승폭 / 평균 하락폭
    ///
    /// 평균은 Wilder 평활(alpha = 1/period)을 사용하며, 첫 평균은 처음
    /// `period`개 변화량의 단순 평균입니다.
    pub fn rsi(&self, values: &[f64], params: RsiParams) -> AnalysisResult<Vec<Option<f64>>> {
        let period = params.period;
        if period == 0 {
            return Err(AnalysisError::InvalidParameter(
                "기간은 0보다 커야 합니다".to_string(),
            ));
        }
        AnalysisError::ensure_len(values.len(), period + 1)?;

        let mut result = vec![None; period];
        let (mut avg_gain, mut avg_loss) = (0.0, 0.0);

        for i in 1..=period {
            let delta = values[i] - values[i - 1];
            if delta > 0.0 {
                avg_gain += delta;
            } else {
                avg_loss -= delta;
            }
        }
        avg_gain /= period as f64;
        avg_loss /= period as f64;
        result.push(Some(rsi_value(avg_gain, avg_loss)));

        let p = period as f64;
        for i in period + 1..values.len() {
            let delta = values[i] - values[i - 1];
            let (gain, loss) = if delta > 0.0 { (delta, 0.0) } else { (0.0, -delta) };
            avg_gain = (avg_gain * (p - 1.0) + gain) / p;
            avg_loss = (avg_loss * (p - 1.0) + loss) / p;
            result.push(Some(rsi_value(avg_gain, avg_loss)));
        }

        Ok(result)
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_bounds_and_extremes() {
        let calc = MomentumCalculator::new();

        let rising: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let rsi = calc.rsi(&rising, RsiParams::default()).unwrap();
        assert_eq!(rsi[13], None);
        assert_eq!(rsi[14], Some(100.0));

        let flat = vec![100.0; 30];
        let rsi = calc.rsi(&flat, RsiParams::default()).unwrap();
        assert_eq!(rsi[29], Some(50.0));
    }

    #[test]
    fn test_rsi_mixed_moves() {
        let calc = MomentumCalculator::new();
        let values: Vec<f64> = (0..40)
            .map(|i| 100.0 + if i % 2 == 0 { 1.0 } else { -1.0 } + i as f64 * 0.1)
            .collect();
        let rsi = calc.rsi(&values, RsiParams { period: 5 }).unwrap();

        for value in rsi.iter().flatten() {
            assert!((0.0..=100.0).contains(value));
        }
    }
}
