//! 추세선 분석기.
//!
//! 최근 `trendline_lookback` 구간의 스윙 저점 쌍으로 지지 추세선을, 스윙
//! 고점 쌍으로 저항 추세선을 만들고 다음 조건으로 걸러냅니다:
//!
//! - 두 앵커 사이에서 선을 허용 오차 이상 침범한 캔들이 없어야 함
//! - 선 근처의 스윙 접점이 `min_trendline_touches`개 이상
//! - 각도가 `[trendline_angle_min, trendline_angle_max]`도 범위
//!
//! 각도는 `atan(|봉당 기울기| / 앵커 가격 × 100)`이므로 봉당 1% 선이 45도입니다.

use serde::Serialize;
use tracing::debug;
use trend_core::{SignalDirection, SignalSource, TrendConfig, TrendSignal, Verbosity};

use crate::analyzers::LevelType;
use crate::component::{AnalysisContext, ComponentReport, SignalComponent};
use crate::error::{AnalysisError, AnalysisResult};
use crate::series::PriceSeries;
use crate::swing::SwingPoint;

/// 거래량 평균 구간.
const VOLUME_AVERAGE_WINDOW: usize = 20;
/// 신호로 변환할 최근 돌파 범위 (봉).
const RECENT_BREAK_BARS: usize = 10;
/// 돌파 크기 정규화 기준 (%).
const BREAK_MAGNITUDE_SCALE_PCT: f64 = 2.0;
/// 확장 리테스트 허용 배수.
const ENHANCED_RETEST_FACTOR: f64 = 1.5;
/// 재테스트 봉이 거절 캔들일 때 돌파 강도 가산치
const REJECTION_RETEST_BONUS: f64 = 0.1;

/// 추세선 파라미터.
#[derive(Debug, Clone, Serialize)]
pub struct TrendlineParams {
    pub swing_strength: usize,
    pub min_touches: usize,
    /// 최소 각도 (도)
    pub angle_min: f64,
    /// 최대 각도 (도)
    pub angle_max: f64,
    pub max_trendlines: usize,
    /// 접점/돌파 허용 오차 (%)
    pub touch_tolerance_pct: f64,
    /// 리테스트 허용 오차 (%)
    pub retest_tolerance_pct: f64,
    pub lookback: usize,
    pub volume_confirmation_threshold: f64,
}

impl Default for TrendlineParams {
    fn default() -> Self {
        Self::from(&TrendConfig::default())
    }
}

impl From<&TrendConfig> for TrendlineParams {
    fn from(config: &TrendConfig) -> Self {
        Self {
            swing_strength: config.swing_strength,
            min_touches: config.min_trendline_touches,
            angle_min: config.trendline_angle_min,
            angle_max: config.trendline_angle_max,
            max_trendlines: config.max_trendlines,
            touch_tolerance_pct: config.trendline_touch_tolerance_pct,
            retest_tolerance_pct: config.retest_tolerance_pct,
            lookback: config.trendline_lookback,
            volume_confirmation_threshold: config.volume_confirmation_threshold,
        }
    }
}

/// 두 스윙을 잇는 추세선.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trendline {
    pub line_type: LevelType,
    pub start: SwingPoint,
    pub end: SwingPoint,
    /// 봉당 가격 변화
    pub slope: f64,
    pub angle_deg: f64,
    /// 선 근처 스윙 인덱스
    pub touch_points: Vec<usize>,
    pub strength: f64,
}

impl Trendline {
    /// 인덱스에서의 선 값.
    pub fn value_at(&self, index: usize) -> f64 {
        self.start.value + self.slope * (index as f64 - self.start.index as f64)
    }

    pub fn touch_count(&self) -> usize {
        self.touch_points.len()
    }

    /// 이 선의 돌파가 가리키는 방향 (지지선 이탈은 하락).
    pub fn break_direction(&self) -> SignalDirection {
        match self.line_type {
            LevelType::Support => SignalDirection::Bearish,
            LevelType::Resistance => SignalDirection::Bullish,
        }
    }
}

/// 추세선 돌파.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendlineBreak {
    pub trendline: Trendline,
    pub break_index: usize,
    pub break_price: f64,
    pub line_value: f64,
    /// 선 대비 이탈 (%)
    pub magnitude_pct: f64,
    pub volume_ratio: f64,
    pub volume_confirmation: bool,
    pub retest_confirmed: bool,
    pub break_strength: f64,
}

impl TrendlineBreak {
    pub fn direction(&self) -> SignalDirection {
        self.trendline.break_direction()
    }
}

/// 현재가와 가장 가까운 추세선.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendlineProximity {
    pub line_type: LevelType,
    pub line_value: f64,
    /// 현재가와의 거리 (%)
    pub distance_pct: f64,
}

/// 추세선 분석 결과.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrendlineReport {
    pub trendlines: Vec<Trendline>,
    pub breaks: Vec<TrendlineBreak>,
    pub nearest: Option<TrendlineProximity>,
    /// 분석한 캔들 수
    pub bar_count: usize,
}

impl TrendlineReport {
    /// 최근 돌파를 신호로 변환합니다.
    pub fn signals(&self, price: f64) -> Vec<TrendSignal> {
        self.breaks
            .iter()
            .filter(|b| b.break_index + RECENT_BREAK_BARS >= self.bar_count)
            .map(|b| {
                let mut confidence = if b.volume_confirmation { 0.75 } else { 0.55 };
                if b.retest_confirmed {
                    confidence += 0.1;
                }
                let kind = match b.trendline.line_type {
                    LevelType::Support => "support_trendline_break",
                    LevelType::Resistance => "resistance_trendline_break",
                };
                let mut signal = TrendSignal::new(
                    SignalSource::Trendline,
                    b.direction(),
                    b.break_strength,
                    confidence,
                    price,
                )
                .with_factor(kind);
                if b.volume_confirmation {
                    signal = signal.with_factor("volume_confirmed");
                }
                if b.retest_confirmed {
                    signal = signal.with_factor("retest_confirmed");
                }
                signal
            })
            .collect()
    }
}

/// 추세선 분석기.
#[derive(Debug, Clone)]
pub struct TrendlineAnalyzer {
    params: TrendlineParams,
    verbosity: Verbosity,
}

impl TrendlineAnalyzer {
    pub fn new(params: TrendlineParams, verbosity: Verbosity) -> Self {
        Self { params, verbosity }
    }

    pub fn params(&self) -> &TrendlineParams {
        &self.params
    }

    /// 스윙 두 개를 만들 수 있는 최소 캔들 수.
    pub fn min_bars(&self) -> usize {
        4 * self.params.swing_strength + 2
    }

    fn tolerance(&self) -> f64 {
        self.params.touch_tolerance_pct / 100.0
    }

    /// 추세선을 찾아 강도순으로 최대 `max_trendlines`개 반환합니다.
    pub fn identify_trendlines(&self, series: &PriceSeries) -> AnalysisResult<Vec<Trendline>> {
        AnalysisError::ensure_len(series.len(), self.min_bars())?;

        let start = series.len().saturating_sub(self.params.lookback);
        let window = self.params.swing_strength;

        let lows: Vec<SwingPoint> = series
            .swing_lows(window)
            .into_iter()
            .filter(|s| s.index >= start)
            .collect();
        let highs: Vec<SwingPoint> = series
            .swing_highs(window)
            .into_iter()
            .filter(|s| s.index >= start)
            .collect();

        let mut candidates = self.candidates(series, &lows, LevelType::Support);
        candidates.extend(self.candidates(series, &highs, LevelType::Resistance));
        candidates.sort_by(|a, b| b.strength.total_cmp(&a.strength));

        let last = series.len() - 1;
        let tol = self.tolerance();
        let mut accepted: Vec<Trendline> = Vec::new();
        for line in candidates {
            let duplicate = accepted.iter().any(|other| {
                other.line_type == line.line_type && {
                    let a = other.value_at(last);
                    let b = line.value_at(last);
                    a > 0.0 && ((a - b) / a).abs() <= tol
                }
            });
            if !duplicate {
                accepted.push(line);
            }
            if accepted.len() >= self.params.max_trendlines {
                break;
            }
        }

        if self.verbosity.is_debug() {
            debug!(count = accepted.len(), "추세선 식별");
        }
        Ok(accepted)
    }

    fn candidates(
        &self,
        series: &PriceSeries,
        swings: &[SwingPoint],
        line_type: LevelType,
    ) -> Vec<Trendline> {
        let mut lines = Vec::new();
        for i in 0..swings.len() {
            for j in i + 1..swings.len() {
                if let Some(line) = self.build_line(series, &swings[i], &swings[j], swings, line_type)
                {
                    lines.push(line);
                }
            }
        }
        lines
    }

    fn build_line(
        &self,
        series: &PriceSeries,
        a: &SwingPoint,
        b: &SwingPoint,
        swings: &[SwingPoint],
        line_type: LevelType,
    ) -> Option<Trendline> {
        if a.value <= 0.0 || b.index <= a.index {
            return None;
        }
        let slope = (b.value - a.value) / (b.index - a.index) as f64;
        let angle_deg = (slope.abs() / a.value * 100.0).atan().to_degrees();
        if angle_deg < self.params.angle_min || angle_deg > self.params.angle_max {
            return None;
        }

        let mut line = Trendline {
            line_type,
            start: a.clone(),
            end: b.clone(),
            slope,
            angle_deg,
            touch_points: Vec::new(),
            strength: 0.0,
        };

        // 앵커 사이 침범 검사
        let tol = self.tolerance();
        for k in a.index..=b.index {
            let value = line.value_at(k);
            if value <= 0.0 {
                return None;
            }
            let violated = match line_type {
                LevelType::Support => series.low[k] < value * (1.0 - tol),
                LevelType::Resistance => series.high[k] > value * (1.0 + tol),
            };
            if violated {
                return None;
            }
        }

        line.touch_points = swings
            .iter()
            .filter(|s| s.index >= a.index)
            .filter(|s| {
                let value = line.value_at(s.index);
                value > 0.0 && ((s.value - value) / value).abs() <= tol
            })
            .map(|s| s.index)
            .collect();
        if line.touch_count() < self.params.min_touches {
            return None;
        }

        let span = (b.index - a.index) as f64;
        line.strength = (0.3
            + 0.4 * (line.touch_count() as f64 / 5.0).min(1.0)
            + 0.3 * (span / self.params.lookback.max(1) as f64).min(1.0))
        .clamp(0.0, 1.0);

        Some(line)
    }

    /// 각 추세선에 대해 끝 앵커 이후 첫 돌파를 찾습니다.
    ///
    /// 종가가 선을 허용 오차 이상 넘어서면 돌파입니다. 거래량이 20봉 평균의
    /// `volume_confirmation_threshold`배 이상이면 확인된 돌파 (강도 0.5 이상),
    /// 아니면 미확인 돌파 (강도 0.7 이하)입니다.
    pub fn detect_trendline_breaks(
        &self,
        series: &PriceSeries,
        trendlines: &[Trendline],
    ) -> Vec<TrendlineBreak> {
        let tol = self.tolerance();
        let mut breaks = Vec::new();

        for line in trendlines {
            let beyond = |k: usize| {
                let value = line.value_at(k);
                match line.line_type {
                    LevelType::Support => series.close[k] < value * (1.0 - tol),
                    LevelType::Resistance => series.close[k] > value * (1.0 + tol),
                }
            };

            let Some(break_index) = (line.end.index + 1..series.len()).find(|&k| beyond(k)) else {
                continue;
            };

            let line_value = line.value_at(break_index);
            let break_price = series.close[break_index];
            let magnitude_pct = ((break_price - line_value) / line_value * 100.0).abs();

            let volume_ratio = series
                .average_volume(break_index, VOLUME_AVERAGE_WINDOW)
                .filter(|avg| *avg > 0.0)
                .map(|avg| series.volume[break_index] / avg)
                .unwrap_or(0.0);
            let volume_confirmation = volume_ratio >= self.params.volume_confirmation_threshold;

            // 돌파 이후 선 바깥에 머문 봉 수
            let after = &series.close[break_index + 1..];
            let held = (break_index + 1..series.len())
                .take_while(|&k| match line.line_type {
                    LevelType::Support => series.close[k] < line.value_at(k),
                    LevelType::Resistance => series.close[k] > line.value_at(k),
                })
                .count();
            let sustained = if after.is_empty() {
                0.0
            } else {
                (held as f64 / 3.0).min(1.0)
            };
            let magnitude = (magnitude_pct / BREAK_MAGNITUDE_SCALE_PCT).min(1.0);

            let break_strength = if volume_confirmation {
                (0.5 + 0.3 * magnitude + 0.2 * sustained).min(1.0)
            } else {
                (0.2 + 0.3 * magnitude + 0.2 * sustained).min(0.7)
            };

            let mut brk = TrendlineBreak {
                trendline: line.clone(),
                break_index,
                break_price,
                line_value,
                magnitude_pct,
                volume_ratio,
                volume_confirmation,
                retest_confirmed: false,
                break_strength,
            };
            brk.retest_confirmed = self.detect_retest(series, &brk);
            if brk.retest_confirmed && self.detect_rejection_retest(series, &brk) {
                let cap = if volume_confirmation { 1.0 } else { 0.7 };
                brk.break_strength = (brk.break_strength + REJECTION_RETEST_BONUS).min(cap);
            }
            breaks.push(brk);
        }

        breaks.sort_by(|a, b| b.break_strength.total_cmp(&a.break_strength));
        breaks
    }

    /// 돌파 이후 가격이 선으로 되돌아와 지지/저항을 확인했는지 검사합니다.
    ///
    /// 기본 검사를 통과한 봉이 있어야 합니다.
    pub fn detect_retest(&self, series: &PriceSeries, brk: &TrendlineBreak) -> bool {
        (brk.break_index + 1..series.len()).any(|k| self.basic_retest(series, &brk.trendline, k))
    }

    /// 기본 재테스트 봉 중 거절 캔들(확장 검사)까지 통과한 봉이 있는지.
    fn detect_rejection_retest(&self, series: &PriceSeries, brk: &TrendlineBreak) -> bool {
        (brk.break_index + 1..series.len()).any(|k| {
            self.basic_retest(series, &brk.trendline, k)
                && self.enhanced_retest(series, &brk.trendline, k)
        })
    }

    /// 종가가 선의 `retest_tolerance_pct` 이내로 돌아왔지만 돌파 방향에 머무름.
    fn basic_retest(&self, series: &PriceSeries, line: &Trendline, k: usize) -> bool {
        let value = line.value_at(k);
        if value <= 0.0 {
            return false;
        }
        let close = series.close[k];
        let near = ((close - value) / value).abs() <= self.params.retest_tolerance_pct / 100.0;
        let held = match line.line_type {
            LevelType::Support => close <= value,
            LevelType::Resistance => close >= value,
        };
        near && held
    }

    /// 꼬리가 선에 닿은 뒤 돌파 방향으로 마감한 거절 캔들.
    fn enhanced_retest(&self, series: &PriceSeries, line: &Trendline, k: usize) -> bool {
        let value = line.value_at(k);
        if value <= 0.0 {
            return false;
        }
        let tol = ENHANCED_RETEST_FACTOR * self.params.retest_tolerance_pct / 100.0;
        let (high, low, open, close) = (series.high[k], series.low[k], series.open[k], series.close[k]);
        let range = high - low;
        if range <= 0.0 {
            return false;
        }

        match line.line_type {
            // 이탈한 지지선이 저항으로 작용
            LevelType::Support => {
                ((high - value) / value).abs() <= tol
                    && close < value
                    && close <= open
                    && (close - low) / range <= 0.5
            }
            LevelType::Resistance => {
                ((low - value) / value).abs() <= tol
                    && close > value
                    && close >= open
                    && (high - close) / range <= 0.5
            }
        }
    }

    /// 현재가에 가장 가까운 추세선.
    pub fn nearest_trendline(
        &self,
        series: &PriceSeries,
        trendlines: &[Trendline],
    ) -> Option<TrendlineProximity> {
        let last = series.len().checked_sub(1)?;
        let price = series.close[last];
        trendlines
            .iter()
            .filter_map(|line| {
                let value = line.value_at(last);
                (value > 0.0).then(|| TrendlineProximity {
                    line_type: line.line_type,
                    line_value: value,
                    distance_pct: ((price - value) / value * 100.0).abs(),
                })
            })
            .min_by(|a, b| a.distance_pct.total_cmp(&b.distance_pct))
    }

    pub fn analyze_series(&self, series: &PriceSeries) -> AnalysisResult<TrendlineReport> {
        let trendlines = self.identify_trendlines(series)?;
        let breaks = self.detect_trendline_breaks(series, &trendlines);
        let nearest = self.nearest_trendline(series, &trendlines);

        if self.verbosity.is_verbose() && !breaks.is_empty() {
            debug!(
                lines = trendlines.len(),
                breaks = breaks.len(),
                strongest = breaks[0].break_strength,
                "추세선 돌파 감지"
            );
        }

        Ok(TrendlineReport {
            trendlines,
            breaks,
            nearest,
            bar_count: series.len(),
        })
    }
}

impl SignalComponent for TrendlineAnalyzer {
    fn source(&self) -> SignalSource {
        SignalSource::Trendline
    }

    fn analyze(&mut self, ctx: &AnalysisContext<'_>) -> AnalysisResult<ComponentReport> {
        self.analyze_series(ctx.series).map(ComponentReport::Trendline)
    }
}

// =============================================================================
// 테스트
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::test_support::*;

    /// 봉당 0.5 상승 + 주기 10 삼각파. 저점은 i % 10 == 5, 고점은 i % 10 == 0.
    fn zigzag(count: usize, drift: f64) -> Vec<f64> {
        (0..count)
            .map(|i| {
                let m = (i % 10) as f64;
                100.0 + drift * i as f64 + 4.0 * (m - 5.0).abs() / 5.0
            })
            .collect()
    }

    /// 상승 지그재그 후 76번 봉에서 지지선 아래로 급락.
    fn support_break(break_volume: f64, closes_after: &[f64]) -> PriceSeries {
        let mut closes = zigzag(76, 0.5);
        let line = |i: usize| 99.9 + 0.5 * i as f64;
        closes.push(line(76) * 0.97);
        for (offset, ratio) in closes_after.iter().enumerate() {
            closes.push(line(77 + offset) * ratio);
        }
        let mut volumes = vec![1000.0; 76];
        volumes.push(break_volume);
        doji_series(&closes, 0.1, &volumes)
    }

    fn analyzer() -> TrendlineAnalyzer {
        TrendlineAnalyzer::new(TrendlineParams::default(), Verbosity::Quiet)
    }

    #[test]
    fn test_identify_rising_trendlines() {
        let series = doji_series(&zigzag(80, 0.5), 0.1, &[]);
        let lines = analyzer().identify_trendlines(&series).unwrap();

        assert_eq!(lines.len(), 2);
        let support = lines
            .iter()
            .find(|l| l.line_type == LevelType::Support)
            .expect("지지 추세선");
        assert!((support.slope - 0.5).abs() < 1e-6);
        assert!(support.touch_count() >= 5);
        assert!(support.angle_deg > 10.0 && support.angle_deg < 80.0);
        assert!(support.strength > 0.5 && support.strength <= 1.0);
        assert!(lines.iter().any(|l| l.line_type == LevelType::Resistance));
    }

    #[test]
    fn test_flat_lines_rejected_by_angle() {
        let series = doji_series(&zigzag(80, 0.0), 0.1, &[]);
        assert!(analyzer().identify_trendlines(&series).unwrap().is_empty());
    }

    #[test]
    fn test_confirmed_support_break() {
        let series = support_break(3000.0, &[0.965, 0.96]);
        let report = analyzer().analyze_series(&series).unwrap();

        let brk = report
            .breaks
            .iter()
            .find(|b| b.trendline.line_type == LevelType::Support)
            .expect("지지선 돌파");
        assert_eq!(brk.break_index, 76);
        assert!(brk.volume_confirmation);
        assert!(brk.volume_ratio >= 1.5);
        assert!(brk.break_strength >= 0.5);
        assert!(!brk.retest_confirmed);
        assert_eq!(brk.direction(), SignalDirection::Bearish);

        let signals = report.signals(series.close[78]);
        assert!(signals
            .iter()
            .any(|s| s.signal_type == SignalDirection::Bearish && s.confidence == 0.75));
    }

    #[test]
    fn test_unconfirmed_break_capped() {
        let series = support_break(1000.0, &[0.965, 0.96]);
        let breaks = analyzer().analyze_series(&series).unwrap().breaks;

        let brk = breaks
            .iter()
            .find(|b| b.trendline.line_type == LevelType::Support)
            .expect("지지선 돌파");
        assert!(!brk.volume_confirmation);
        assert!(brk.break_strength <= 0.7);
    }

    #[test]
    fn test_retest_after_break() {
        // 돌파 후 선의 0.2% 아래로 되돌아옴
        let series = support_break(3000.0, &[0.998, 0.98]);
        let report = analyzer().analyze_series(&series).unwrap();

        let brk = report
            .breaks
            .iter()
            .find(|b| b.trendline.line_type == LevelType::Support)
            .expect("지지선 돌파");
        assert!(brk.retest_confirmed);

        let signal = report
            .signals(series.close[78])
            .into_iter()
            .find(|s| s.signal_type == SignalDirection::Bearish)
            .expect("하락 신호");
        assert!((signal.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_wick_touch_alone_is_not_retest() {
        // 종가는 선에서 0.6% 떨어져 기본 허용 오차(0.5%) 밖, 꼬리만 선 근처
        let series = support_break(3000.0, &[0.994, 0.98]);
        let brk = analyzer()
            .analyze_series(&series)
            .unwrap()
            .breaks
            .into_iter()
            .find(|b| b.trendline.line_type == LevelType::Support)
            .expect("지지선 돌파");
        assert!(!brk.retest_confirmed);

        let a = analyzer();
        assert!(!a.detect_rejection_retest(&series, &brk));
    }

    #[test]
    fn test_nearest_trendline() {
        let series = doji_series(&zigzag(80, 0.5), 0.1, &[]);
        let a = analyzer();
        let lines = a.identify_trendlines(&series).unwrap();
        let nearest = a.nearest_trendline(&series, &lines).unwrap();

        // 79번 봉은 저점(75) 직후 상승 구간
        assert!(nearest.distance_pct < 5.0);
    }

    #[test]
    fn test_short_series_is_insufficient() {
        let series = doji_series(&zigzag(10, 0.5), 0.1, &[]);
        assert!(analyzer()
            .identify_trendlines(&series)
            .unwrap_err()
            .is_insufficient_data());
    }
}
