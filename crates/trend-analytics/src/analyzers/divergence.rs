//! 가격/지표 다이버전스 탐지기.
//!
//! 가격과 RSI/MACD 시계열에서 같은 방식으로 스윙 포인트를 찾은 뒤, 가격
//! 스윙 쌍마다 가장 가까운 지표 스윙을 짝지어 방향이 엇갈리는지 확인합니다.
//!
//! - **약세(bearish)**: 가격은 고점을 높이는데 지표는 고점을 낮춤
//! - **강세(bullish)**: 가격은 저점을 낮추는데 지표는 저점을 높임
//!
//! 변화량은 모두 % 단위입니다. 가격은 `|p2 - p1| / p1 × 100`, RSI는 0~100
//! 척도의 포인트, MACD는 `|m2 - m1| / 가격 × 100`을 사용합니다.
//! 검증을 통과한 다이버전스만 반환합니다.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;
use trend_core::{SignalDirection, SignalSource, TrendConfig, TrendSignal, Verbosity};

use crate::component::{AnalysisContext, ComponentReport, SignalComponent};
use crate::error::{AnalysisError, AnalysisResult};
use crate::indicators::{MacdParams, MomentumCalculator, RsiParams, TrendIndicators};
use crate::series::PriceSeries;
use crate::swing::{find_swings, option_column, SwingKind, SwingPoint};

/// 쌍을 만들 최근 가격 스윙 수.
const RECENT_SWINGS: usize = 6;
/// 검증 최소 강도.
const MIN_VALID_STRENGTH: f64 = 0.1;
/// 검증 최소 변화량 (%). 탐지 임계값이 더 낮아도 이 값 이하는 거부합니다.
const MIN_VALID_MAGNITUDE_PCT: f64 = 0.2;

/// 다이버전스 파라미터.
#[derive(Debug, Clone, Serialize)]
pub struct DivergenceParams {
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub macd_fast_period: usize,
    pub macd_slow_period: usize,
    pub macd_signal_period: usize,
    pub swing_strength: usize,
    pub min_swing_separation: usize,
    /// 최소 변화율 (%)
    pub threshold: f64,
}

impl Default for DivergenceParams {
    fn default() -> Self {
        Self::from(&TrendConfig::default())
    }
}

impl From<&TrendConfig> for DivergenceParams {
    fn from(config: &TrendConfig) -> Self {
        Self {
            rsi_period: config.rsi_period,
            rsi_overbought: config.rsi_overbought,
            rsi_oversold: config.rsi_oversold,
            macd_fast_period: config.macd_fast_period,
            macd_slow_period: config.macd_slow_period,
            macd_signal_period: config.macd_signal_period,
            swing_strength: config.divergence_swing_strength,
            min_swing_separation: config.min_swing_separation,
            threshold: config.divergence_threshold,
        }
    }
}

/// 다이버전스 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceType {
    Bullish,
    Bearish,
}

impl DivergenceType {
    pub fn direction(&self) -> SignalDirection {
        match self {
            DivergenceType::Bullish => SignalDirection::Bullish,
            DivergenceType::Bearish => SignalDirection::Bearish,
        }
    }

    fn swing_kind(&self) -> SwingKind {
        match self {
            DivergenceType::Bullish => SwingKind::Low,
            DivergenceType::Bearish => SwingKind::High,
        }
    }
}

/// 비교 지표.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceIndicator {
    Rsi,
    Macd,
}

impl DivergenceIndicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            DivergenceIndicator::Rsi => "rsi",
            DivergenceIndicator::Macd => "macd",
        }
    }
}

/// 다이버전스 한 건.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DivergenceResult {
    pub divergence_type: DivergenceType,
    pub indicator: DivergenceIndicator,
    /// 가격 스윙 (이전, 최근)
    pub price_points: [SwingPoint; 2],
    /// 짝지어진 지표 스윙 (이전, 최근)
    pub indicator_points: [SwingPoint; 2],
    /// 가격 변화 (%, 부호 포함)
    pub price_change_pct: f64,
    /// 지표 변화 (%, 부호 포함)
    pub indicator_change_pct: f64,
    pub strength: f64,
    pub validated: bool,
}

impl DivergenceResult {
    /// 가격 변화와 지표 변화의 방향이 반대인지 확인합니다.
    pub fn is_opposing(&self) -> bool {
        self.price_change_pct != 0.0
            && self.indicator_change_pct != 0.0
            && self.price_change_pct.signum() != self.indicator_change_pct.signum()
    }

    pub fn signal(&self, price: f64) -> TrendSignal {
        TrendSignal::new(
            SignalSource::Divergence,
            self.divergence_type.direction(),
            self.strength,
            0.5 + 0.4 * self.strength,
            price,
        )
        .with_factor(format!(
            "{}_{}_divergence",
            match self.divergence_type {
                DivergenceType::Bullish => "bullish",
                DivergenceType::Bearish => "bearish",
            },
            self.indicator.as_str()
        ))
    }
}

/// 다이버전스 분석 결과 (강도순).
#[derive(Debug, Clone, Default, Serialize)]
pub struct DivergenceReport {
    pub divergences: Vec<DivergenceResult>,
}

impl DivergenceReport {
    pub fn strongest(&self) -> Option<&DivergenceResult> {
        self.divergences.first()
    }

    /// 가장 강한 다이버전스 하나만 신호로 변환합니다.
    pub fn signals(&self, price: f64) -> Vec<TrendSignal> {
        self.strongest().map(|d| d.signal(price)).into_iter().collect()
    }
}

/// 다이버전스 탐지기.
#[derive(Debug, Clone)]
pub struct DivergenceDetector {
    params: DivergenceParams,
    verbosity: Verbosity,
}

impl DivergenceDetector {
    pub fn new(params: DivergenceParams, verbosity: Verbosity) -> Self {
        Self { params, verbosity }
    }

    pub fn params(&self) -> &DivergenceParams {
        &self.params
    }

    pub fn min_bars(&self) -> usize {
        self.params.min_swing_separation + 2 * self.params.swing_strength + 1
    }

    /// RSI 열. 주석이 없으면 계산합니다.
    fn rsi_column(&self, series: &PriceSeries) -> AnalysisResult<Vec<Option<f64>>> {
        match &series.annotations().rsi {
            Some(rsi) => Ok(rsi.clone()),
            None => MomentumCalculator::new().rsi(
                &series.close,
                RsiParams {
                    period: self.params.rsi_period,
                },
            ),
        }
    }

    /// MACD 라인 열. 주석이 없으면 계산합니다.
    fn macd_column(&self, series: &PriceSeries) -> AnalysisResult<Vec<Option<f64>>> {
        match &series.annotations().macd {
            Some(macd) => Ok(macd.clone()),
            None => Ok(TrendIndicators::new()
                .macd(
                    &series.close,
                    MacdParams {
                        fast_period: self.params.macd_fast_period,
                        slow_period: self.params.macd_slow_period,
                        signal_period: self.params.macd_signal_period,
                    },
                )?
                .into_iter()
                .map(|p| p.macd)
                .collect()),
        }
    }

    /// RSI 다이버전스.
    pub fn detect_rsi_divergence(
        &self,
        series: &PriceSeries,
    ) -> AnalysisResult<Vec<DivergenceResult>> {
        AnalysisError::ensure_len(series.len(), self.min_bars())?;
        let rsi = option_column(&self.rsi_column(series)?);
        Ok(self.detect(series, &rsi, DivergenceIndicator::Rsi))
    }

    /// MACD 다이버전스.
    pub fn detect_macd_divergence(
        &self,
        series: &PriceSeries,
    ) -> AnalysisResult<Vec<DivergenceResult>> {
        AnalysisError::ensure_len(series.len(), self.min_bars())?;
        let macd = option_column(&self.macd_column(series)?);
        Ok(self.detect(series, &macd, DivergenceIndicator::Macd))
    }

    /// RSI와 MACD 다이버전스를 모두 탐지해 강도순으로 반환합니다.
    ///
    /// MACD 계산에 캔들이 부족하면 RSI 결과만 사용합니다.
    pub fn detect_all(&self, series: &PriceSeries) -> AnalysisResult<DivergenceReport> {
        let mut divergences = self.detect_rsi_divergence(series)?;
        match self.detect_macd_divergence(series) {
            Ok(macd) => divergences.extend(macd),
            Err(e) if e.is_insufficient_data() => {}
            Err(e) => return Err(e),
        }
        divergences.sort_by(|a, b| b.strength.total_cmp(&a.strength));

        if self.verbosity.is_verbose() && !divergences.is_empty() {
            debug!(
                count = divergences.len(),
                strongest = divergences[0].strength,
                "다이버전스 감지"
            );
        }

        Ok(DivergenceReport { divergences })
    }

    fn detect(
        &self,
        series: &PriceSeries,
        indicator: &[f64],
        kind: DivergenceIndicator,
    ) -> Vec<DivergenceResult> {
        let mut results = Vec::new();
        for divergence_type in [DivergenceType::Bearish, DivergenceType::Bullish] {
            let swing_kind = divergence_type.swing_kind();
            let window = self.params.swing_strength;

            let price_swings = match swing_kind {
                SwingKind::High => series.swing_highs(window),
                SwingKind::Low => series.swing_lows(window),
            };
            let indicator_swings =
                series.attach_times(find_swings(indicator, window, swing_kind));

            let recent = &price_swings[price_swings.len().saturating_sub(RECENT_SWINGS)..];
            let mut candidates = Vec::new();

            for i in 0..recent.len() {
                for j in i + 1..recent.len() {
                    if let Some(candidate) = self.evaluate_pair(
                        series,
                        &recent[i],
                        &recent[j],
                        &indicator_swings,
                        divergence_type,
                        kind,
                    ) {
                        candidates.push(candidate);
                    }
                }
            }

            // 쌍 수 점수는 같은 종류의 후보 수로 계산
            let pair_count = candidates.len();
            for mut candidate in candidates {
                candidate.strength = self.calculate_strength(series, &candidate, pair_count);
                candidate.validated = self.validate(&candidate);
                if candidate.validated {
                    results.push(candidate);
                }
            }
        }

        results.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        results
    }

    fn evaluate_pair(
        &self,
        series: &PriceSeries,
        first: &SwingPoint,
        second: &SwingPoint,
        indicator_swings: &[SwingPoint],
        divergence_type: DivergenceType,
        kind: DivergenceIndicator,
    ) -> Option<DivergenceResult> {
        if second.index - first.index < self.params.min_swing_separation {
            return None;
        }

        let price_up = second.value > first.value;
        match divergence_type {
            DivergenceType::Bearish if !price_up => return None,
            DivergenceType::Bullish if second.value >= first.value => return None,
            _ => {}
        }

        let mut used = HashSet::new();
        let ind_first = self.match_indicator_swing(first, indicator_swings, &used)?;
        used.insert(ind_first.index);
        let ind_second = self.match_indicator_swing(second, indicator_swings, &used)?;
        if ind_second.index <= ind_first.index {
            return None;
        }

        match divergence_type {
            DivergenceType::Bearish if ind_second.value >= ind_first.value => return None,
            DivergenceType::Bullish if ind_second.value <= ind_first.value => return None,
            _ => {}
        }

        let price_change_pct = (second.value - first.value) / first.value * 100.0;
        let indicator_change_pct = match kind {
            DivergenceIndicator::Rsi => ind_second.value - ind_first.value,
            DivergenceIndicator::Macd => {
                let reference = series.close[second.index];
                if reference <= 0.0 {
                    return None;
                }
                (ind_second.value - ind_first.value) / reference * 100.0
            }
        };

        if price_change_pct.abs() <= self.params.threshold
            || indicator_change_pct.abs() <= self.params.threshold
        {
            return None;
        }

        Some(DivergenceResult {
            divergence_type,
            indicator: kind,
            price_points: [first.clone(), second.clone()],
            indicator_points: [ind_first.clone(), ind_second.clone()],
            price_change_pct,
            indicator_change_pct,
            strength: 0.0,
            validated: false,
        })
    }

    /// `min_swing_separation` 이내에서 아직 쓰이지 않은 가장 가까운 지표 스윙.
    fn match_indicator_swing<'a>(
        &self,
        price_swing: &SwingPoint,
        indicator_swings: &'a [SwingPoint],
        used: &HashSet<usize>,
    ) -> Option<&'a SwingPoint> {
        indicator_swings
            .iter()
            .filter(|s| !used.contains(&s.index))
            .filter(|s| s.index.abs_diff(price_swing.index) <= self.params.min_swing_separation)
            .min_by_key(|s| s.index.abs_diff(price_swing.index))
    }

    /// 강도 = 0.4 × 크기 + 0.2 × 기간 + 0.2 × 쌍 수 + 0.2 × 극단 보너스.
    fn calculate_strength(
        &self,
        series: &PriceSeries,
        divergence: &DivergenceResult,
        pair_count: usize,
    ) -> f64 {
        let magnitude = ((divergence.price_change_pct.abs()
            + divergence.indicator_change_pct.abs())
            / 4.0)
            .min(1.0);

        let [first, second] = &divergence.price_points;
        let span_days = series.span_days(first.index, second.index);
        let time_score = (span_days / 7.0).min(1.0);

        let count_score = (pair_count as f64 / 4.0).min(1.0);

        let [ind_first, ind_second] = &divergence.indicator_points;
        let extreme = match divergence.indicator {
            DivergenceIndicator::Rsi => {
                let hit = match divergence.divergence_type {
                    DivergenceType::Bearish => {
                        ind_first.value.max(ind_second.value) > self.params.rsi_overbought
                    }
                    DivergenceType::Bullish => {
                        ind_first.value.min(ind_second.value) < self.params.rsi_oversold
                    }
                };
                if hit {
                    1.0
                } else {
                    0.0
                }
            }
            DivergenceIndicator::Macd => 0.5,
        };

        (0.4 * magnitude + 0.2 * time_score + 0.2 * count_score + 0.2 * extreme).clamp(0.0, 1.0)
    }

    /// 검증: 최소 강도, 반대 방향, 두 변화량 모두 임계값과 0.2% 초과.
    pub fn validate(&self, divergence: &DivergenceResult) -> bool {
        let floor = self.params.threshold.max(MIN_VALID_MAGNITUDE_PCT);
        divergence.strength >= MIN_VALID_STRENGTH
            && divergence.is_opposing()
            && divergence.price_change_pct.abs() > floor
            && divergence.indicator_change_pct.abs() > floor
    }
}

impl SignalComponent for DivergenceDetector {
    fn source(&self) -> SignalSource {
        SignalSource::Divergence
    }

    fn analyze(&mut self, ctx: &AnalysisContext<'_>) -> AnalysisResult<ComponentReport> {
        self.detect_all(ctx.series).map(ComponentReport::Divergence)
    }
}

// =============================================================================
// 테스트
// =============================================================================
