//! 변동성/추세 강도 지표 (Volatility Indicators).
//!
//! - ATR (Average True Range)
//! - ADX (Average Directional Index) 와 +DI / -DI

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// ATR 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AtrParams {
    /// ATR 기간 (기본: 14).
    pub period: usize,
}

impl Default for AtrParams {
    fn default() -> Self {
        Self { period: 14 }
    }
}

/// ADX 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AdxParams {
    /// ADX 기간 (기본: 14).
    pub period: usize,
}

impl Default for AdxParams {
    fn default() -> Self {
        Self { period: 14 }
    }
}

/// 한 시점의 ADX 값.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AdxPoint {
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
}

/// 변동성 지표 계산기.
#[derive(Debug, Default, Clone, Copy)]
pub struct VolatilityIndicators;

fn true_ranges(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let len = high.len().min(low.len()).min(close.len());
    let mut tr = Vec::with_capacity(len);
    if len == 0 {
        return tr;
    }
    tr.push(high[0] - low[0]);
    for i in 1..len {
        let hl = high[i] - low[i];
        let hc = (high[i] - close[i - 1]).abs();
        let lc = (low[i] - close[i - 1]).abs();
        tr.push(hl.max(hc).max(lc));
    }
    tr
}

impl VolatilityIndicators {
    pub fn new() -> Self {
        Self
    }

    /// ATR 계산 (Wilder 평활).
    pub fn atr(
        &self,
        high: &[f64],
        low: &[f64],
        close: &[f64],
        params: AtrParams,
    ) -> AnalysisResult<Vec<Option<f64>>> {
        let period = params.period;
        if period == 0 {
            return Err(AnalysisError::InvalidParameter(
                "기간은 0보다 커야 합니다".to_string(),
            ));
        }
        let tr = true_ranges(high, low, close);
        AnalysisError::ensure_len(tr.len(), period + 1)?;

        let mut result = vec![None; period - 1];
        let mut atr = tr[..period].iter().sum::<f64>() / period as f64;
        result.push(Some(atr));

        let p = period as f64;
        for value in tr.iter().skip(period) {
            atr = (atr * (p - 1.0) + value) / p;
            result.push(Some(atr));
        }

        Ok(result)
    }

    /// ADX 계산.
    ///
    /// +DM/-DM과 TR을 Wilder 방식으로 평활해 +DI/-DI를 구하고,
    /// DX의 Wilder 평균을 ADX로 사용합니다. 첫 ADX는 `2 * period - 1`
    /// 인덱스에서 정의됩니다.
    pub fn adx(
        &self,
        high: &[f64],
        low: &[f64],
        close: &[f64],
        params: AdxParams,
    ) -> AnalysisResult<Vec<AdxPoint>> {
        let period = params.period;
        if period == 0 {
            return Err(AnalysisError::InvalidParameter(
                "기간은 0보다 커야 합니다".to_string(),
            ));
        }
        let tr = true_ranges(high, low, close);
        let len = tr.len();
        AnalysisError::ensure_len(len, 2 * period)?;

        let mut plus_dm = vec![0.0; len];
        let mut minus_dm = vec![0.0; len];
        for i in 1..len {
            let up = high[i] - high[i - 1];
            let down = low[i - 1] - low[i];
            if up > down && up > 0.0 {
                plus_dm[i] = up;
            }
            if down > up && down > 0.0 {
                minus_dm[i] = down;
            }
        }

        let p = period as f64;
        let mut result = vec![AdxPoint::default(); len];

        // 첫 평활 합계는 1..=period 구간
        let mut s_tr: f64 = tr[1..=period].iter().sum();
        let mut s_plus: f64 = plus_dm[1..=period].iter().sum();
        let mut s_minus: f64 = minus_dm[1..=period].iter().sum();

        let mut dx_values = Vec::with_capacity(len);
        let mut adx: Option<f64> = None;

        for i in period..len {
            if i > period {
                s_tr = s_tr - s_tr / p + tr[i];
                s_plus = s_plus - s_plus / p + plus_dm[i];
                s_minus = s_minus - s_minus / p + minus_dm[i];
            }

            let (plus_di, minus_di) = if s_tr > 0.0 {
                (100.0 * s_plus / s_tr, 100.0 * s_minus / s_tr)
            } else {
                (0.0, 0.0)
            };
            let di_sum = plus_di + minus_di;
            let dx = if di_sum > 0.0 {
                100.0 * (plus_di - minus_di).abs() / di_sum
            } else {
                0.0
            };
            dx_values.push(dx);

            adx = match adx {
                None if dx_values.len() == period => {
                    Some(dx_values.iter().sum::<f64>() / p)
                }
                Some(prev) => Some((prev * (p - 1.0) + dx) / p),
                None => None,
            };

            result[i] = AdxPoint {
                adx,
                plus_di: Some(plus_di),
                minus_di: Some(minus_di),
            };
        }

        Ok(result)
    }
}
