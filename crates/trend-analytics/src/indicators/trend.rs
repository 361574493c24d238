//! 추세 지표 (Trend Indicators).
//!
//! - SMA, EMA, MACD
//! - 선형회귀 기울기

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// SMA 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SmaParams {
    /// 이동평균 기간.
    pub period: usize,
}

impl Default for SmaParams {
    fn default() -> Self {
        Self { period: 20 }
    }
}

/// EMA 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EmaParams {
    /// 이동평균 기간.
    pub period: usize,
}

impl Default for EmaParams {
    fn default() -> Self {
        Self { period: 20 }
    }
}

/// MACD 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MacdParams {
    /// 단기 EMA 기간 (기본: 12).
    pub fast_period: usize,
    /// 장기 EMA 기간 (기본: 26).
    pub slow_period: usize,
    /// 시그널 EMA 기간 (기본: 9).
    pub signal_period: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

/// 한 시점의 MACD 값.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MacdPoint {
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

/// 추세 지표 계산기.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrendIndicators;

impl TrendIndicators {
    pub fn new() -> Self {
        Self
    }

    /// 단순 이동평균 (SMA) 계산.
    pub fn sma(&self, values: &[f64], params: SmaParams) -> AnalysisResult<Vec<Option<f64>>> {
        let period = params.period;
        if period == 0 {
            return Err(AnalysisError::InvalidParameter(
                "기간은 0보다 커야 합니다".to_string(),
            ));
        }
        AnalysisError::ensure_len(values.len(), period)?;

        let mut result = vec![None; period - 1];
        let mut sum: f64 = values[..period].iter().sum();
        result.push(Some(sum / period as f64));
        for i in period..values.len() {
            sum += values[i] - values[i - period];
            result.push(Some(sum / period as f64));
        }

        Ok(result)
    }

    /// 지수 이동평균 (EMA) 계산.
    ///
    /// 첫 값은 처음 `period`개의 SMA로 시작합니다.
    pub fn ema(&self, values: &[f64], params: EmaParams) -> AnalysisResult<Vec<Option<f64>>> {
        let period = params.period;
        if period == 0 {
            return Err(AnalysisError::InvalidParameter(
                "기간은 0보다 커야 합니다".to_string(),
            ));
        }
        AnalysisError::ensure_len(values.len(), period)?;

        let multiplier = 2.0 / (period as f64 + 1.0);
        let mut result = vec![None; period - 1];

        let mut prev = values[..period].iter().sum::<f64>() / period as f64;
        result.push(Some(prev));

        // 상수 입력에서 값이 흔들리지 않도록 차분 형태로 갱신
        for value in values.iter().skip(period) {
            prev += (value - prev) * multiplier;
            result.push(Some(prev));
        }

        Ok(result)
    }

    /// MACD 계산.
    ///
    /// MACD 라인 = 단기 EMA - 장기 EMA
    /// 시그널 라인 = MACD 라인의 EMA
    /// 히스토그램 = MACD 라인 - 시그널 라인
    pub fn macd(&self, values: &[f64], params: MacdParams) -> AnalysisResult<Vec<MacdPoint>> {
        if params.fast_period >= params.slow_period {
            return Err(AnalysisError::InvalidParameter(format!(
                "MACD 단기 기간({})은 장기 기간({})보다 작아야 합니다",
                params.fast_period, params.slow_period
            )));
        }
        AnalysisError::ensure_len(values.len(), params.slow_period + params.signal_period)?;

        let fast = self.ema(values, EmaParams { period: params.fast_period })?;
        let slow = self.ema(values, EmaParams { period: params.slow_period })?;

        let macd_line: Vec<Option<f64>> = fast
            .iter()
            .zip(slow.iter())
            .map(|(f, s)| match (f, s) {
                (Some(f), Some(s)) => Some(f - s),
                _ => None,
            })
            .collect();

        // 시그널 라인은 유효한 MACD 값만으로 계산
        let offset = params.slow_period - 1;
        let compact: Vec<f64> = macd_line.iter().flatten().copied().collect();
        let signal = self.ema(&compact, EmaParams { period: params.signal_period })?;

        let result = macd_line
            .iter()
            .enumerate()
            .map(|(i, macd)| {
                let signal = if i >= offset { signal[i - offset] } else { None };
                let histogram = match (macd, signal) {
                    (Some(m), Some(s)) => Some(m - s),
                    _ => None,
                };
                MacdPoint {
                    macd: *macd,
                    signal,
                    histogram,
                }
            })
            .collect();

        Ok(result)
    }
}

/// 최소자승 선형회귀 기울기 (x = 0, 1, 2, ...).
pub fn linear_regression_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 || values.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n_f;

    let (mut num, mut den) = (0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }

    if den == 0.0 {
        None
    } else {
        Some(num / den)
    }
}

/// 지표 열의 각 시점에서 최근 `lookback`개 값의 회귀 기울기를 봉당 %로 계산합니다.
pub fn slope_pct_per_bar(values: &[Option<f64>], lookback: usize) -> Vec<Option<f64>> {
    let lookback = lookback.max(2);
    (0..values.len())
        .map(|i| {
            if i + 1 < lookback {
                return None;
            }
            let window: Option<Vec<f64>> = values[i + 1 - lookback..=i].iter().copied().collect();
            let window = window?;
            let last = *window.last()?;
            if last == 0.0 {
                return None;
            }
            linear_regression_slope(&window).map(|s| s / last * 100.0)
        })
        .collect()
}
