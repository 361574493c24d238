//! 시장 구조 분석기.
//!
//! 스윙 고점/저점으로 시장 구조를 파악하고 다음 구조 돌파를 감지합니다:
//! - **고점 돌파 실패** (Higher-High break): 새 스윙 고점이 이전 고점을
//!   넘었지만 현재가가 이전 고점의 99.5% 아래로 밀린 경우 (하락 신호)
//! - **저점 돌파 실패** (Lower-Low break): 대칭 (상승 신호)
//! - **지지/저항 돌파**: 군집된 지지/저항 레벨을 종가가 임계값 이상 넘어선 경우
//!
//! 거래량 확인은 세 가지 휴리스틱 중 하나만 만족하면 됩니다.

use serde::Serialize;
use tracing::debug;
use trend_core::{SignalDirection, SignalSource, TrendConfig, TrendSignal, Verbosity};

use crate::component::{AnalysisContext, ComponentReport, SignalComponent};
use crate::error::{AnalysisError, AnalysisResult};
use crate::indicators::linear_regression_slope;
use crate::series::PriceSeries;
use crate::swing::SwingPoint;

/// 고점 돌파 실패 판정 비율.
const HIGHER_HIGH_FAILURE_RATIO: f64 = 0.995;
/// 저점 돌파 실패 판정 비율.
const LOWER_LOW_FAILURE_RATIO: f64 = 1.005;
/// 거래량 평균 구간.
const VOLUME_AVERAGE_WINDOW: usize = 20;

/// 시장 구조 분석 파라미터.
#[derive(Debug, Clone, Serialize)]
pub struct MarketStructureParams {
    /// 스윙 좌우 창 크기
    pub swing_strength: usize,
    /// 지지/저항 군집 허용 오차 (%)
    pub sr_tolerance_pct: f64,
    /// 지지/저항 돌파 임계값 (%)
    pub sr_break_threshold_pct: f64,
    /// 최대 지지/저항 레벨 수
    pub max_sr_levels: usize,
    /// 거래량 확인 배수
    pub volume_confirmation_threshold: f64,
}

impl Default for MarketStructureParams {
    fn default() -> Self {
        Self::from(&TrendConfig::default())
    }
}

impl From<&TrendConfig> for MarketStructureParams {
    fn from(config: &TrendConfig) -> Self {
        Self {
            swing_strength: config.swing_strength,
            sr_tolerance_pct: config.sr_tolerance_pct,
            sr_break_threshold_pct: config.sr_break_threshold_pct,
            max_sr_levels: config.max_sr_levels,
            volume_confirmation_threshold: config.volume_confirmation_threshold,
        }
    }
}

/// 스윙 배열로 본 시장 구조.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStructure {
    /// 고점/저점 모두 상승 (HH, HL)
    Uptrend,
    /// 고점/저점 모두 하락 (LH, LL)
    Downtrend,
    /// 혼재
    Sideways,
    /// 스윙 부족
    Undetermined,
}

/// 지지/저항 구분.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelType {
    Support,
    Resistance,
}

/// 군집된 지지/저항 레벨.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SRLevel {
    pub price: f64,
    pub level_type: LevelType,
    pub touch_count: usize,
    pub strength: f64,
    pub first_index: usize,
    pub last_index: usize,
}

/// 구조 돌파 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureBreakType {
    HigherHighBreak,
    LowerLowBreak,
    ResistanceBreak,
    SupportBreak,
}

impl StructureBreakType {
    /// 돌파가 가리키는 방향.
    pub fn direction(&self) -> SignalDirection {
        match self {
            StructureBreakType::HigherHighBreak | StructureBreakType::SupportBreak => {
                SignalDirection::Bearish
            }
            StructureBreakType::LowerLowBreak | StructureBreakType::ResistanceBreak => {
                SignalDirection::Bullish
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StructureBreakType::HigherHighBreak => "higher_high_break",
            StructureBreakType::LowerLowBreak => "lower_low_break",
            StructureBreakType::ResistanceBreak => "resistance_break",
            StructureBreakType::SupportBreak => "support_break",
        }
    }
}

/// 구조 돌파 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureBreakResult {
    pub break_type: StructureBreakType,
    /// 돌파가 일어난 레벨
    pub break_level: f64,
    /// 비교 기준이 된 이전 레벨
    pub previous_level: f64,
    /// 현재가와 이전 레벨의 차이 (%)
    pub magnitude_pct: f64,
    pub volume_confirmation: bool,
    pub strength: f64,
    /// 거래량 확인 또는 1% 초과 이탈
    pub confirmed: bool,
}

/// 시장 구조 분석 결과.
#[derive(Debug, Clone, Serialize)]
pub struct MarketStructureReport {
    pub structure: MarketStructure,
    pub structure_break: Option<StructureBreakResult>,
    pub support_resistance: Vec<SRLevel>,
    pub swing_high_count: usize,
    pub swing_low_count: usize,
}

impl MarketStructureReport {
    pub fn signals(&self, price: f64) -> Vec<TrendSignal> {
        let Some(brk) = &self.structure_break else {
            return Vec::new();
        };

        let confidence = if brk.confirmed { 0.8 } else { 0.6 };
        let mut signal = TrendSignal::new(
            SignalSource::MarketStructure,
            brk.break_type.direction(),
            brk.strength,
            confidence,
            price,
        )
        .with_factor(brk.break_type.as_str());
        if brk.volume_confirmation {
            signal = signal.with_factor("volume_confirmed");
        }
        vec![signal]
    }
}

/// 시장 구조 분석기.
#[derive(Debug, Clone)]
pub struct MarketStructureAnalyzer {
    params: MarketStructureParams,
    verbosity: Verbosity,
}

impl MarketStructureAnalyzer {
    pub fn new(params: MarketStructureParams, verbosity: Verbosity) -> Self {
        Self { params, verbosity }
    }

    pub fn params(&self) -> &MarketStructureParams {
        &self.params
    }

    /// 최소 필요 캔들 수.
    pub fn min_bars(&self) -> usize {
        4 * self.params.swing_strength + 2
    }

    /// 최근 두 스윙 고점/저점으로 시장 구조를 분류합니다.
    pub fn classify_structure(highs: &[SwingPoint], lows: &[SwingPoint]) -> MarketStructure {
        if highs.len() < 2 || lows.len() < 2 {
            return MarketStructure::Undetermined;
        }
        let hh = highs[highs.len() - 1].value > highs[highs.len() - 2].value;
        let hl = lows[lows.len() - 1].value > lows[lows.len() - 2].value;

        match (hh, hl) {
            (true, true) => MarketStructure::Uptrend,
            (false, false) => MarketStructure::Downtrend,
            _ => MarketStructure::Sideways,
        }
    }

    /// 구조 돌파를 감지합니다. 여러 돌파가 동시에 발견되면 강도가 가장 큰
    /// 것을 반환합니다.
    pub fn detect_structure_break(&self, series: &PriceSeries) -> Option<StructureBreakResult> {
        let n = series.len();
        if n < self.min_bars() {
            return None;
        }
        let close = series.close[n - 1];
        let window = self.params.swing_strength;

        let highs = series.swing_highs(window);
        let lows = series.swing_lows(window);
        let volume_confirmed = self.volume_confirmation(series, n - 1);

        let mut candidates: Vec<StructureBreakResult> = Vec::new();

        if let [.., prev, last] = highs.as_slice() {
            if last.value > prev.value && close < prev.value * HIGHER_HIGH_FAILURE_RATIO {
                candidates.push(self.build_break(
                    series,
                    StructureBreakType::HigherHighBreak,
                    last.value,
                    prev.value,
                    volume_confirmed,
                ));
            }
        }

        if let [.., prev, last] = lows.as_slice() {
            if last.value < prev.value && close > prev.value * LOWER_LOW_FAILURE_RATIO {
                candidates.push(self.build_break(
                    series,
                    StructureBreakType::LowerLowBreak,
                    last.value,
                    prev.value,
                    volume_confirmed,
                ));
            }
        }

        // 지지/저항 레벨은 마지막 캔들을 제외하고 구성
        let history = series.truncated(n - 1);
        let prev_close = series.close[n - 2];
        let threshold = self.params.sr_break_threshold_pct / 100.0;

        for level in self.identify_support_resistance(&history) {
            if level.price >= prev_close {
                if close > level.price * (1.0 + threshold) {
                    candidates.push(self.build_break(
                        series,
                        StructureBreakType::ResistanceBreak,
                        level.price,
                        level.price,
                        volume_confirmed,
                    ));
                }
            } else if close < level.price * (1.0 - threshold) {
                candidates.push(self.build_break(
                    series,
                    StructureBreakType::SupportBreak,
                    level.price,
                    level.price,
                    volume_confirmed,
                ));
            }
        }

        let best = candidates
            .into_iter()
            .max_by(|a, b| a.strength.total_cmp(&b.strength));

        if self.verbosity.is_verbose() {
            if let Some(brk) = &best {
                debug!(
                    break_type = brk.break_type.as_str(),
                    level = brk.break_level,
                    strength = brk.strength,
                    volume_confirmed = brk.volume_confirmation,
                    "구조 돌파 감지"
                );
            }
        }

        best
    }

    fn build_break(
        &self,
        series: &PriceSeries,
        break_type: StructureBreakType,
        break_level: f64,
        previous_level: f64,
        volume_confirmation: bool,
    ) -> StructureBreakResult {
        let close = series.last_close().unwrap_or(previous_level);
        let magnitude_pct = if previous_level > 0.0 {
            (close - previous_level).abs() / previous_level * 100.0
        } else {
            0.0
        };

        let strength = self.calculate_break_strength(series, magnitude_pct, volume_confirmation);

        StructureBreakResult {
            break_type,
            break_level,
            previous_level,
            magnitude_pct,
            volume_confirmation,
            strength,
            confirmed: volume_confirmation || magnitude_pct > 1.0,
        }
    }

    /// 돌파 강도 = 0.5 + 거래량 0.2 + 크기 최대 0.2 + 변동성 최대 0.1.
    fn calculate_break_strength(
        &self,
        series: &PriceSeries,
        magnitude_pct: f64,
        volume_confirmation: bool,
    ) -> f64 {
        let mut strength = 0.5;
        if volume_confirmation {
            strength += 0.2;
        }

        strength += if magnitude_pct > 2.0 {
            0.2
        } else if magnitude_pct > 1.0 {
            0.1
        } else if magnitude_pct > 0.5 {
            0.05
        } else {
            0.0
        };

        let volatility = series.return_volatility_pct(VOLUME_AVERAGE_WINDOW);
        strength += 0.1 * (volatility / 2.0).min(1.0);

        strength.clamp(0.0, 1.0)
    }

    /// 거래량 확인.
    ///
    /// 다음 중 하나를 만족하면 확인된 것으로 봅니다:
    /// 1. 20봉 평균 대비 배수가 임계값 초과
    /// 2. 최근 20봉 중 상위 20% 거래량
    /// 3. 1.2배 초과이면서 최근 5봉 거래량 증가 추세
    pub fn volume_confirmation(&self, series: &PriceSeries, index: usize) -> bool {
        if index >= series.len() || index < 5 {
            return false;
        }
        let Some(avg) = series.average_volume(index, VOLUME_AVERAGE_WINDOW) else {
            return false;
        };
        if avg <= 0.0 {
            return false;
        }

        let volume = series.volume[index];
        let ratio = volume / avg;
        if ratio > self.params.volume_confirmation_threshold {
            return true;
        }

        let start = (index + 1).saturating_sub(VOLUME_AVERAGE_WINDOW);
        let window = &series.volume[start..=index];
        let below = window.iter().filter(|v| **v < volume).count();
        if below as f64 / window.len() as f64 >= 0.8 {
            return true;
        }

        let recent = &series.volume[index - 4..=index];
        let rising = linear_regression_slope(recent).is_some_and(|s| s > 0.0);
        ratio > 1.2 && rising
    }

    /// 스윙 포인트를 가격 허용 오차로 군집해 지지/저항 레벨을 구합니다.
    ///
    /// 2회 이상 접촉한 레벨만 포함하며, 강도순으로 최대 `max_sr_levels`개를
    /// 반환합니다.
    pub fn identify_support_resistance(&self, series: &PriceSeries) -> Vec<SRLevel> {
        let Some(last_close) = series.last_close() else {
            return Vec::new();
        };
        let window = self.params.swing_strength;

        let mut points: Vec<SwingPoint> = series.swing_highs(window);
        points.extend(series.swing_lows(window));
        if points.len() < 2 {
            return Vec::new();
        }
        points.sort_by(|a, b| a.value.total_cmp(&b.value));

        let tolerance = self.params.sr_tolerance_pct / 100.0;
        let mut clusters: Vec<Vec<SwingPoint>> = Vec::new();
        for point in points {
            match clusters.last_mut() {
                Some(cluster) => {
                    let mean = cluster.iter().map(|p| p.value).sum::<f64>() / cluster.len() as f64;
                    if (point.value - mean).abs() / mean <= tolerance {
                        cluster.push(point);
                    } else {
                        clusters.push(vec![point]);
                    }
                }
                None => clusters.push(vec![point]),
            }
        }

        let overall_volume = series.average_volume(series.len(), series.len()).unwrap_or(0.0);

        let mut levels: Vec<SRLevel> = clusters
            .into_iter()
            .filter(|c| c.len() >= 2)
            .map(|cluster| {
                let price = cluster.iter().map(|p| p.value).sum::<f64>() / cluster.len() as f64;
                let first_index = cluster.iter().map(|p| p.index).min().unwrap_or(0);
                let last_index = cluster.iter().map(|p| p.index).max().unwrap_or(0);
                let touch_count = cluster.len();

                let span_days = series.span_days(first_index, last_index);
                let touch_volume = cluster.iter().map(|p| series.volume[p.index]).sum::<f64>()
                    / touch_count as f64;
                let volume_score = if overall_volume > 0.0 {
                    (touch_volume / overall_volume).min(2.0) / 2.0
                } else {
                    0.0
                };

                let strength = 0.3
                    + 0.4 * (touch_count as f64 / 5.0).min(1.0)
                    + 0.2 * (span_days / 30.0).min(1.0)
                    + 0.1 * volume_score;

                SRLevel {
                    price,
                    level_type: if price >= last_close {
                        LevelType::Resistance
                    } else {
                        LevelType::Support
                    },
                    touch_count,
                    strength: strength.clamp(0.0, 1.0),
                    first_index,
                    last_index,
                }
            })
            .collect();

        levels.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        levels.truncate(self.params.max_sr_levels);
        levels
    }

    /// 전체 시장 구조 분석.
    pub fn analyze_series(&self, series: &PriceSeries) -> AnalysisResult<MarketStructureReport> {
        AnalysisError::ensure_len(series.len(), self.min_bars())?;

        let window = self.params.swing_strength;
        let highs = series.swing_highs(window);
        let lows = series.swing_lows(window);

        Ok(MarketStructureReport {
            structure: Self::classify_structure(&highs, &lows),
            structure_break: self.detect_structure_break(series),
            support_resistance: self.identify_support_resistance(series),
            swing_high_count: highs.len(),
            swing_low_count: lows.len(),
        })
    }
}

impl SignalComponent for MarketStructureAnalyzer {
    fn source(&self) -> SignalSource {
        SignalSource::MarketStructure
    }

    fn analyze(&mut self, ctx: &AnalysisContext<'_>) -> AnalysisResult<ComponentReport> {
        self.analyze_series(ctx.series)
            .map(ComponentReport::MarketStructure)
    }
}

// =============================================================================
// 테스트
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::test_support::*;
    use crate::swing::SwingKind;

    fn analyzer() -> MarketStructureAnalyzer {
        MarketStructureAnalyzer::new(MarketStructureParams::default(), Verbosity::Quiet)
    }

    /// 100 → 110 (봉 20) → 100 → 112 (봉 40) → 하락 마감.
    fn failed_breakout_closes() -> Vec<f64> {
        let mut closes = Vec::new();
        for i in 0..=20 {
            closes.push(100.0 + i as f64 * 0.5);
        }
        for i in 1..=10 {
            closes.push(110.0 - i as f64);
        }
        for i in 1..=10 {
            closes.push(100.0 + i as f64 * 1.2);
        }
        for i in 1..=14 {
            closes.push(112.0 - i as f64 * 0.8);
        }
        closes
    }

    #[test]
    fn test_higher_high_failure_detected() {
        let series = series_from_closes(&failed_breakout_closes());
        let brk = analyzer().detect_structure_break(&series).unwrap();

        // 마지막 종가 100.8 < 이전 고점(≈110) × 0.995
        assert!(matches!(
            brk.break_type,
            StructureBreakType::HigherHighBreak | StructureBreakType::SupportBreak
        ));
        assert_eq!(brk.break_type.direction(), SignalDirection::Bearish);
        assert!(brk.strength >= 0.5 && brk.strength <= 1.0);
    }

    #[test]
    fn test_no_break_in_steady_trend() {
        let series = series_from_closes(&trending_closes(120, 0.5));
        let report = analyzer().analyze_series(&series).unwrap();

        assert!(report.structure_break.is_none());
        assert!(report.signals(series.last_close().unwrap()).is_empty());
    }

    #[test]
    fn test_break_strength_components() {
        let series = series_from_closes(&vec![100.0; 60]);
        let a = analyzer();

        // 평탄 시계열: 변동성 보너스 0
        assert!((a.calculate_break_strength(&series, 0.3, false) - 0.5).abs() < 1e-9);
        assert!((a.calculate_break_strength(&series, 0.7, true) - 0.75).abs() < 1e-9);
        assert!((a.calculate_break_strength(&series, 1.5, false) - 0.6).abs() < 1e-9);
        assert!((a.calculate_break_strength(&series, 3.0, true) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_volume_confirmation_heuristics() {
        let mut series = series_from_closes(&vec![100.0; 40]);
        let a = analyzer();

        // 일정한 거래량 → 확인 안 됨
        assert!(!a.volume_confirmation(&series, 39));

        // 2배 급증 → 배수 조건
        series.volume[39] = 2000.0;
        assert!(a.volume_confirmation(&series, 39));

        // 1.3배 + 5봉 증가 추세 → 세 번째 조건 (상위 20% 조건도 만족)
        series.volume[35..40].copy_from_slice(&[900.0, 950.0, 1000.0, 1100.0, 1300.0]);
        assert!(a.volume_confirmation(&series, 39));
    }

    #[test]
    fn test_support_resistance_clusters() {
        // 105 부근 고점 3회, 95 부근 저점 3회 반복
        let mut closes = Vec::new();
        for cycle in 0..3 {
            let bump = cycle as f64 * 0.05;
            for i in 0..10 {
                closes.push(100.0 + i as f64 * 0.5 + bump);
            }
            for i in 0..20 {
                closes.push(105.0 + bump - i as f64 * 0.5);
            }
            for i in 0..10 {
                closes.push(95.0 + bump + i as f64 * 0.5);
            }
        }
        let series = series_from_closes(&closes);
        let levels = analyzer().identify_support_resistance(&series);

        assert!(levels.len() >= 2);
        assert!(levels.iter().all(|l| l.touch_count >= 2));
        assert!(levels.iter().all(|l| (0.0..=1.0).contains(&l.strength)));
        assert!(levels.windows(2).all(|w| w[0].strength >= w[1].strength));
        assert!(levels.iter().any(|l| l.level_type == LevelType::Resistance));
    }

    #[test]
    fn test_classify_structure() {
        let point = |index, value, kind| SwingPoint {
            index,
            timestamp: None,
            value,
            kind,
            window: 5,
        };
        let highs = vec![point(10, 105.0, SwingKind::High), point(30, 108.0, SwingKind::High)];
        let lows = vec![point(20, 98.0, SwingKind::Low), point(40, 101.0, SwingKind::Low)];

        assert_eq!(
            MarketStructureAnalyzer::classify_structure(&highs, &lows),
            MarketStructure::Uptrend
        );
        assert_eq!(
            MarketStructureAnalyzer::classify_structure(&highs[..1], &lows),
            MarketStructure::Undetermined
        );
    }
}
