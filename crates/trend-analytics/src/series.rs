//! 분석용 f64 가격 시계열.
//!
//! `Kline`의 Decimal 가격을 한 번만 f64로 변환해 열(column) 단위로
//! 보관합니다. 지표 계산은 모두 이 시계열을 기준으로 합니다.
//!
//! 호출자가 RSI/MACD/EMA 값을 미리 계산해 둔 경우 `with_*` 메서드로
//! 주석(annotation)을 붙이면 분석기가 재계산하지 않고 그대로 사용합니다.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use trend_core::{Kline, Timeframe};

use crate::error::{AnalysisError, AnalysisResult};
use crate::swing::{find_swings, SwingKind, SwingPoint};

/// 호출자가 미리 계산한 지표 열.
///
/// 각 열의 길이는 시계열 길이와 같아야 합니다.
#[derive(Debug, Clone, Default)]
pub struct IndicatorAnnotations {
    pub rsi: Option<Vec<Option<f64>>>,
    pub macd: Option<Vec<Option<f64>>>,
    pub macd_signal: Option<Vec<Option<f64>>>,
    pub ema_fast: Option<Vec<Option<f64>>>,
    pub ema_slow: Option<Vec<Option<f64>>>,
}

/// 열 단위 f64 OHLCV 시계열.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    timeframe: Option<Timeframe>,
    pub times: Vec<DateTime<Utc>>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
    annotations: IndicatorAnnotations,
}

fn to_f64(value: Decimal, field: &str, index: usize) -> AnalysisResult<f64> {
    value
        .to_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            AnalysisError::InvalidSeries(format!("{} 변환 실패 (index {})", field, index))
        })
}

impl PriceSeries {
    /// 캔들 목록에서 시계열을 생성합니다.
    ///
    /// 타임프레임은 첫 캔들의 값을 사용합니다.
    pub fn from_klines(klines: &[Kline]) -> AnalysisResult<Self> {
        let len = klines.len();
        let mut series = Self {
            timeframe: klines.first().map(|k| k.timeframe),
            times: Vec::with_capacity(len),
            open: Vec::with_capacity(len),
            high: Vec::with_capacity(len),
            low: Vec::with_capacity(len),
            close: Vec::with_capacity(len),
            volume: Vec::with_capacity(len),
            annotations: IndicatorAnnotations::default(),
        };

        for (i, kline) in klines.iter().enumerate() {
            series.times.push(kline.open_time);
            series.open.push(to_f64(kline.open, "open", i)?);
            series.high.push(to_f64(kline.high, "high", i)?);
            series.low.push(to_f64(kline.low, "low", i)?);
            series.close.push(to_f64(kline.close, "close", i)?);
            series.volume.push(to_f64(kline.volume, "volume", i)?);
        }

        Ok(series)
    }

    fn check_column(&self, name: &str, values: &[Option<f64>]) -> AnalysisResult<()> {
        if values.len() != self.len() {
            return Err(AnalysisError::InvalidSeries(format!(
                "{} 길이 불일치: {} != {}",
                name,
                values.len(),
                self.len()
            )));
        }
        Ok(())
    }

    /// 미리 계산한 RSI를 붙입니다.
    pub fn with_rsi(mut self, rsi: Vec<Option<f64>>) -> AnalysisResult<Self> {
        self.check_column("rsi", &rsi)?;
        self.annotations.rsi = Some(rsi);
        Ok(self)
    }

    /// 미리 계산한 MACD 라인과 시그널 라인을 붙입니다.
    pub fn with_macd(
        mut self,
        macd: Vec<Option<f64>>,
        signal: Vec<Option<f64>>,
    ) -> AnalysisResult<Self> {
        self.check_column("macd", &macd)?;
        self.check_column("macd_signal", &signal)?;
        self.annotations.macd = Some(macd);
        self.annotations.macd_signal = Some(signal);
        Ok(self)
    }

    /// 미리 계산한 단기/장기 EMA를 붙입니다.
    pub fn with_emas(
        mut self,
        fast: Vec<Option<f64>>,
        slow: Vec<Option<f64>>,
    ) -> AnalysisResult<Self> {
        self.check_column("ema_fast", &fast)?;
        self.check_column("ema_slow", &slow)?;
        self.annotations.ema_fast = Some(fast);
        self.annotations.ema_slow = Some(slow);
        Ok(self)
    }

    pub fn annotations(&self) -> &IndicatorAnnotations {
        &self.annotations
    }

    pub fn timeframe(&self) -> Option<Timeframe> {
        self.timeframe
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.close.last().copied()
    }

    /// 앞쪽 `len`개 캔들만 남긴 시계열. 주석 열도 함께 잘립니다.
    pub fn truncated(&self, len: usize) -> Self {
        let len = len.min(self.len());
        let cut = |col: &Option<Vec<Option<f64>>>| col.as_ref().map(|v| v[..len].to_vec());

        Self {
            timeframe: self.timeframe,
            times: self.times[..len].to_vec(),
            open: self.open[..len].to_vec(),
            high: self.high[..len].to_vec(),
            low: self.low[..len].to_vec(),
            close: self.close[..len].to_vec(),
            volume: self.volume[..len].to_vec(),
            annotations: IndicatorAnnotations {
                rsi: cut(&self.annotations.rsi),
                macd: cut(&self.annotations.macd),
                macd_signal: cut(&self.annotations.macd_signal),
                ema_fast: cut(&self.annotations.ema_fast),
                ema_slow: cut(&self.annotations.ema_slow),
            },
        }
    }

    /// 두 인덱스 사이의 경과 일수.
    pub fn span_days(&self, from: usize, to: usize) -> f64 {
        match (self.times.get(from), self.times.get(to)) {
            (Some(a), Some(b)) => (*b - *a).num_seconds().abs() as f64 / 86_400.0,
            _ => 0.0,
        }
    }

    /// `end` 직전 `window`개 캔들의 평균 거래량 (`end` 미포함).
    pub fn average_volume(&self, end: usize, window: usize) -> Option<f64> {
        let end = end.min(self.len());
        let start = end.saturating_sub(window);
        if end <= start {
            return None;
        }
        let slice = &self.volume[start..end];
        Some(slice.iter().sum::<f64>() / slice.len() as f64)
    }

    /// 고가 기준 스윙 고점 (타임스탬프 포함).
    pub fn swing_highs(&self, window: usize) -> Vec<SwingPoint> {
        self.attach_times(find_swings(&self.high, window, SwingKind::High))
    }

    /// 저가 기준 스윙 저점 (타임스탬프 포함).
    pub fn swing_lows(&self, window: usize) -> Vec<SwingPoint> {
        self.attach_times(find_swings(&self.low, window, SwingKind::Low))
    }

    pub(crate) fn attach_times(&self, points: Vec<SwingPoint>) -> Vec<SwingPoint> {
        points
            .into_iter()
            .map(|mut p| {
                p.timestamp = self.times.get(p.index).copied();
                p
            })
            .collect()
    }

    /// 최근 `window`개 종가 수익률의 표준편차 (%).
    pub fn return_volatility_pct(&self, window: usize) -> f64 {
        let n = self.len();
        if n < 3 {
            return 0.0;
        }
        let start = n.saturating_sub(window + 1);
        let returns: Vec<f64> = self.close[start..]
            .windows(2)
            .filter(|w| w[0] > 0.0)
            .map(|w| (w[1] - w[0]) / w[0] * 100.0)
            .collect();
        if returns.len() < 2 {
            return 0.0;
        }
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let var =
            returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
        var.sqrt()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! 분석기 테스트용 캔들 생성기.

    use super::PriceSeries;
    use chrono::{TimeZone, Utc};
    use rust_decimal::prelude::FromPrimitive;
    use rust_decimal::Decimal;
    use trend_core::{Kline, Timeframe};

    fn dec(value: f64) -> Decimal {
        Decimal::from_f64(value).unwrap().round_dp(6)
    }

    /// 종가 목록에서 1시간봉 캔들을 생성합니다 (고가/저가 = 종가 ± spread%).
    pub fn klines_from_closes(closes: &[f64], spread_pct: f64, volume: f64) -> Vec<Kline> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let open = if i == 0 { c } else { closes[i - 1] };
                let spread = c * spread_pct / 100.0;
                Kline::new(
                    "TEST",
                    Timeframe::H1,
                    Utc.timestamp_opt(1_700_000_000 + i as i64 * 3_600, 0).unwrap(),
                    dec(open),
                    dec(c.max(open) + spread),
                    dec(c.min(open) - spread),
                    dec(c),
                    dec(volume),
                )
            })
            .collect()
    }

    pub fn series_from_closes(closes: &[f64]) -> PriceSeries {
        PriceSeries::from_klines(&klines_from_closes(closes, 0.05, 1000.0)).unwrap()
    }

    /// 시가 = 종가이고 고가/저가 = 종가 ± `wick`인 캔들 시계열.
    ///
    /// `volumes`가 짧으면 나머지 봉은 1000으로 채웁니다.
    pub fn doji_series(closes: &[f64], wick: f64, volumes: &[f64]) -> PriceSeries {
        let klines: Vec<Kline> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Kline::new(
                    "TEST",
                    Timeframe::H1,
                    Utc.timestamp_opt(1_700_000_000 + i as i64 * 3_600, 0).unwrap(),
                    dec(c),
                    dec(c + wick),
                    dec(c - wick),
                    dec(c),
                    dec(volumes.get(i).copied().unwrap_or(1000.0)),
                )
            })
            .collect();
        PriceSeries::from_klines(&klines).unwrap()
    }

    /// 봉당 `drift_pct`% 상승하는 종가.
    pub fn trending_closes(count: usize, drift_pct: f64) -> Vec<f64> {
        (0..count)
            .map(|i| 100.0 * (1.0 + drift_pct / 100.0).powi(i as i32))
            .collect()
    }
}
