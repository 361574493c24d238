//! 추세 감지 엔진 설정.
//!
//! 모든 파라미터를 하나의 평탄한 구조체로 정의합니다. 범위 검증과 보정은
//! `trend-engine`의 `ConfigurationValidator`가 한 곳에서 담당하며, 엔진은
//! 검증을 통과한 설정만 보유합니다.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::SignalSource;
use crate::error::TrendResult;
use crate::types::{Timeframe, Verbosity};

/// 신호 소스별 결합 가중치.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceWeights {
    /// 시장 구조 가중치
    #[serde(default = "default_market_structure_weight")]
    pub market_structure: f64,
    /// Aroon 가중치
    #[serde(default = "default_aroon_weight")]
    pub aroon: f64,
    /// 다이버전스 가중치
    #[serde(default = "default_divergence_weight")]
    pub divergence: f64,
    /// 거래량 가중치
    #[serde(default = "default_volume_weight")]
    pub volume: f64,
    /// 표에 없는 소스의 기본 가중치
    #[serde(default = "default_source_weight")]
    pub default_weight: f64,
}

fn default_market_structure_weight() -> f64 {
    0.4
}
fn default_aroon_weight() -> f64 {
    0.3
}
fn default_divergence_weight() -> f64 {
    0.2
}
fn default_volume_weight() -> f64 {
    0.1
}
fn default_source_weight() -> f64 {
    0.1
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            market_structure: default_market_structure_weight(),
            aroon: default_aroon_weight(),
            divergence: default_divergence_weight(),
            volume: default_volume_weight(),
            default_weight: default_source_weight(),
        }
    }
}

impl SourceWeights {
    /// 소스의 결합 가중치를 조회합니다.
    ///
    /// 다중 타임프레임 소스는 `mtf_weight`를 사용하고, 표에 없는 나머지
    /// 소스는 `default_weight`를 사용합니다.
    pub fn weight_for(&self, source: SignalSource, mtf_weight: f64) -> f64 {
        match source {
            SignalSource::MarketStructure => self.market_structure,
            SignalSource::Aroon => self.aroon,
            SignalSource::Divergence => self.divergence,
            SignalSource::Volume => self.volume,
            SignalSource::MultiTimeframe => mtf_weight,
            SignalSource::EmaMomentum | SignalSource::Trendline => self.default_weight,
        }
    }
}

/// 추세 감지 엔진 설정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    // ==================== 일반 ====================
    /// 추세 감지 활성화 여부
    #[serde(default = "default_true")]
    pub enable_trend_detection: bool,
    /// 감지 민감도 (1 ~ 10, 높을수록 약한 신호도 채택)
    #[serde(default = "default_sensitivity")]
    pub trend_detection_sensitivity: u32,
    /// 매매 허용 최소 신뢰도 (0 ~ 1)
    #[serde(default = "default_min_trend_confidence")]
    pub min_trend_confidence: f64,
    /// 분석에 필요한 최소 캔들 수
    #[serde(default = "default_min_bars_required")]
    pub min_bars_required: usize,
    /// 결과 캐시 최대 항목 수
    #[serde(default = "default_trend_cache_size")]
    pub trend_cache_size: usize,
    /// 결과 캐시 TTL (초)
    #[serde(default = "default_trend_cache_ttl_secs")]
    pub trend_cache_ttl_secs: u64,
    /// 반복 실패 컴포넌트 차단 여부
    #[serde(default = "default_true")]
    pub enable_circuit_breaker: bool,
    /// 차단까지의 연속 실패 횟수
    #[serde(default = "default_circuit_breaker_threshold")]
    pub circuit_breaker_threshold: u32,
    /// 차단된 컴포넌트가 있어도 나머지로 분석을 계속할지 여부
    #[serde(default = "default_true")]
    pub graceful_degradation: bool,
    /// 컴포넌트 로그 상세도
    #[serde(default)]
    pub verbosity: Verbosity,

    // ==================== 시장 구조 ====================
    /// 스윙 포인트 좌우 윈도우 크기
    #[serde(default = "default_swing_strength")]
    pub swing_strength: usize,
    /// 지지/저항 군집 허용 오차 (%)
    #[serde(default = "default_sr_tolerance_pct")]
    pub sr_tolerance_pct: f64,
    /// 지지/저항 돌파 판정 임계값 (%)
    #[serde(default = "default_sr_break_threshold_pct")]
    pub sr_break_threshold_pct: f64,
    /// 최대 지지/저항 레벨 수
    #[serde(default = "default_max_sr_levels")]
    pub max_sr_levels: usize,
    /// 거래량 확인 배수 (20봉 평균 대비)
    #[serde(default = "default_volume_confirmation_threshold")]
    pub volume_confirmation_threshold: f64,

    // ==================== Aroon ====================
    /// Aroon 기간
    #[serde(default = "default_aroon_period")]
    pub aroon_period: usize,
    /// 강한 추세 기준값
    #[serde(default = "default_aroon_strong_threshold")]
    pub aroon_strong_threshold: f64,
    /// 약한 지표 기준값
    #[serde(default = "default_aroon_weak_threshold")]
    pub aroon_weak_threshold: f64,

    // ==================== EMA 모멘텀 ====================
    /// 단기 EMA 기간
    #[serde(default = "default_ema_fast_period")]
    pub ema_fast_period: usize,
    /// 장기 EMA 기간
    #[serde(default = "default_ema_slow_period")]
    pub ema_slow_period: usize,
    /// 기울기 선형회귀 구간
    #[serde(default = "default_ema_slope_lookback")]
    pub ema_slope_lookback: usize,

    // ==================== 다이버전스 ====================
    /// RSI 기간
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    /// RSI 과매수 기준
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,
    /// RSI 과매도 기준
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,
    /// MACD 단기 기간
    #[serde(default = "default_macd_fast_period")]
    pub macd_fast_period: usize,
    /// MACD 장기 기간
    #[serde(default = "default_macd_slow_period")]
    pub macd_slow_period: usize,
    /// MACD 시그널 기간
    #[serde(default = "default_macd_signal_period")]
    pub macd_signal_period: usize,
    /// 다이버전스 스윙 윈도우
    #[serde(default = "default_divergence_swing_strength")]
    pub divergence_swing_strength: usize,
    /// 스윙 쌍 최소 간격 (봉)
    #[serde(default = "default_min_swing_separation")]
    pub min_swing_separation: usize,
    /// 가격/지표 최소 변화율 (%)
    #[serde(default = "default_divergence_threshold")]
    pub divergence_threshold: f64,

    // ==================== 다중 타임프레임 ====================
    /// 다중 타임프레임 분석 활성화
    #[serde(default = "default_true")]
    pub enable_mtf_analysis: bool,
    /// 캔들에 타임프레임 정보가 없을 때 사용할 기본 타임프레임
    #[serde(default = "default_primary_timeframe")]
    pub primary_timeframe: Timeframe,
    /// 기본 타임프레임 → 상위 타임프레임 매핑
    #[serde(default = "default_mtf_mapping")]
    pub mtf_primary_to_higher: BTreeMap<Timeframe, Timeframe>,
    /// 신호 확인 최소 정렬 점수
    #[serde(default = "default_mtf_alignment_threshold")]
    pub mtf_alignment_threshold: f64,
    /// 다중 타임프레임 신호 결합 가중치
    #[serde(default = "default_mtf_weight")]
    pub mtf_weight: f64,
    /// 상위 타임프레임 캐시 TTL (초)
    #[serde(default = "default_mtf_cache_ttl_secs")]
    pub mtf_cache_ttl_secs: u64,
    /// 상위 타임프레임 조회 캔들 수
    #[serde(default = "default_mtf_bar_count")]
    pub mtf_bar_count: usize,

    // ==================== 추세선 ====================
    /// 추세선 최소 접점 수
    #[serde(default = "default_min_trendline_touches")]
    pub min_trendline_touches: usize,
    /// 추세선 최소 각도 (도)
    #[serde(default = "default_trendline_angle_min")]
    pub trendline_angle_min: f64,
    /// 추세선 최대 각도 (도)
    #[serde(default = "default_trendline_angle_max")]
    pub trendline_angle_max: f64,
    /// 최대 추세선 수
    #[serde(default = "default_max_trendlines")]
    pub max_trendlines: usize,
    /// 접점 판정 허용 오차 (%)
    #[serde(default = "default_trendline_touch_tolerance_pct")]
    pub trendline_touch_tolerance_pct: f64,
    /// 리테스트 허용 오차 (%)
    #[serde(default = "default_retest_tolerance_pct")]
    pub retest_tolerance_pct: f64,
    /// 추세선 탐색 구간 (봉)
    #[serde(default = "default_trendline_lookback")]
    pub trendline_lookback: usize,

    // ==================== 결합 ====================
    /// 신호 소스별 가중치
    #[serde(default)]
    pub source_weights: SourceWeights,
}

fn default_true() -> bool {
    true
}
fn default_sensitivity() -> u32 {
    5
}
fn default_min_trend_confidence() -> f64 {
    0.6
}
fn default_min_bars_required() -> usize {
    50
}
fn default_trend_cache_size() -> usize {
    100
}
fn default_trend_cache_ttl_secs() -> u64 {
    300
}
fn default_circuit_breaker_threshold() -> u32 {
    5
}
fn default_swing_strength() -> usize {
    5
}
fn default_sr_tolerance_pct() -> f64 {
    0.5
}
fn default_sr_break_threshold_pct() -> f64 {
    0.2
}
fn default_max_sr_levels() -> usize {
    10
}
fn default_volume_confirmation_threshold() -> f64 {
    1.5
}
fn default_aroon_period() -> usize {
    25
}
fn default_aroon_strong_threshold() -> f64 {
    70.0
}
fn default_aroon_weak_threshold() -> f64 {
    30.0
}
fn default_ema_fast_period() -> usize {
    20
}
fn default_ema_slow_period() -> usize {
    50
}
fn default_ema_slope_lookback() -> usize {
    5
}
fn default_rsi_period() -> usize {
    14
}
fn default_rsi_overbought() -> f64 {
    70.0
}
fn default_rsi_oversold() -> f64 {
    30.0
}
fn default_macd_fast_period() -> usize {
    12
}
fn default_macd_slow_period() -> usize {
    26
}
fn default_macd_signal_period() -> usize {
    9
}
fn default_divergence_swing_strength() -> usize {
    5
}
fn default_min_swing_separation() -> usize {
    10
}
fn default_divergence_threshold() -> f64 {
    0.2
}
fn default_primary_timeframe() -> Timeframe {
    Timeframe::H1
}
/// 기본 상위 타임프레임 매핑.
pub fn default_mtf_mapping() -> BTreeMap<Timeframe, Timeframe> {
    BTreeMap::from([
        (Timeframe::M1, Timeframe::M15),
        (Timeframe::M5, Timeframe::H1),
        (Timeframe::M15, Timeframe::H4),
        (Timeframe::M30, Timeframe::H4),
        (Timeframe::H1, Timeframe::H4),
        (Timeframe::H4, Timeframe::D1),
        (Timeframe::D1, Timeframe::W1),
    ])
}
fn default_mtf_alignment_threshold() -> f64 {
    0.6
}
fn default_mtf_weight() -> f64 {
    0.25
}
fn default_mtf_cache_ttl_secs() -> u64 {
    300
}
fn default_mtf_bar_count() -> usize {
    200
}
fn default_min_trendline_touches() -> usize {
    2
}
fn default_trendline_angle_min() -> f64 {
    10.0
}
fn default_trendline_angle_max() -> f64 {
    80.0
}
fn default_max_trendlines() -> usize {
    5
}
fn default_trendline_touch_tolerance_pct() -> f64 {
    0.5
}
fn default_retest_tolerance_pct() -> f64 {
    0.5
}
fn default_trendline_lookback() -> usize {
    100
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            enable_trend_detection: true,
            trend_detection_sensitivity: default_sensitivity(),
            min_trend_confidence: default_min_trend_confidence(),
            min_bars_required: default_min_bars_required(),
            trend_cache_size: default_trend_cache_size(),
            trend_cache_ttl_secs: default_trend_cache_ttl_secs(),
            enable_circuit_breaker: true,
            circuit_breaker_threshold: default_circuit_breaker_threshold(),
            graceful_degradation: true,
            verbosity: Verbosity::default(),
            swing_strength: default_swing_strength(),
            sr_tolerance_pct: default_sr_tolerance_pct(),
            sr_break_threshold_pct: default_sr_break_threshold_pct(),
            max_sr_levels: default_max_sr_levels(),
            volume_confirmation_threshold: default_volume_confirmation_threshold(),
            aroon_period: default_aroon_period(),
            aroon_strong_threshold: default_aroon_strong_threshold(),
            aroon_weak_threshold: default_aroon_weak_threshold(),
            ema_fast_period: default_ema_fast_period(),
            ema_slow_period: default_ema_slow_period(),
            ema_slope_lookback: default_ema_slope_lookback(),
            rsi_period: default_rsi_period(),
            rsi_overbought: default_rsi_overbought(),
            rsi_oversold: default_rsi_oversold(),
            macd_fast_period: default_macd_fast_period(),
            macd_slow_period: default_macd_slow_period(),
            macd_signal_period: default_macd_signal_period(),
            divergence_swing_strength: default_divergence_swing_strength(),
            min_swing_separation: default_min_swing_separation(),
            divergence_threshold: default_divergence_threshold(),
            enable_mtf_analysis: true,
            primary_timeframe: default_primary_timeframe(),
            mtf_primary_to_higher: default_mtf_mapping(),
            mtf_alignment_threshold: default_mtf_alignment_threshold(),
            mtf_weight: default_mtf_weight(),
            mtf_cache_ttl_secs: default_mtf_cache_ttl_secs(),
            mtf_bar_count: default_mtf_bar_count(),
            min_trendline_touches: default_min_trendline_touches(),
            trendline_angle_min: default_trendline_angle_min(),
            trendline_angle_max: default_trendline_angle_max(),
            max_trendlines: default_max_trendlines(),
            trendline_touch_tolerance_pct: default_trendline_touch_tolerance_pct(),
            retest_tolerance_pct: default_retest_tolerance_pct(),
            trendline_lookback: default_trendline_lookback(),
            source_weights: SourceWeights::default(),
        }
    }
}

impl TrendConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 환경 변수는 `TREND__` 접두사를 사용합니다
    /// (예: `TREND__MIN_TREND_CONFIDENCE=0.7`). 로드된 값은 아직 검증되지
    /// 않았으므로 엔진 생성 시 검증/보정됩니다.
    pub fn load<P: AsRef<Path>>(path: P) -> TrendResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("TREND")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// 소스의 결합 가중치.
    pub fn weight_for(&self, source: SignalSource) -> f64 {
        self.source_weights.weight_for(source, self.mtf_weight)
    }

    /// 기본 타임프레임에 대응하는 상위 타임프레임.
    pub fn higher_timeframe_for(&self, primary: Timeframe) -> Option<Timeframe> {
        self.mtf_primary_to_higher.get(&primary).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrendConfig::default();

        assert!(config.enable_trend_detection);
        assert_eq!(config.min_trend_confidence, 0.6);
        assert_eq!(config.min_bars_required, 50);
        assert!(config.ema_fast_period < config.ema_slow_period);
        assert!(config.trendline_angle_min < config.trendline_angle_max);
        assert_eq!(config.higher_timeframe_for(Timeframe::H1), Some(Timeframe::H4));
    }

    #[test]
    fn test_source_weights() {
        let config = TrendConfig::default();

        assert_eq!(config.weight_for(SignalSource::MarketStructure), 0.4);
        assert_eq!(config.weight_for(SignalSource::Aroon), 0.3);
        assert_eq!(config.weight_for(SignalSource::Divergence), 0.2);
        assert_eq!(config.weight_for(SignalSource::Volume), 0.1);
        assert_eq!(config.weight_for(SignalSource::Trendline), 0.1);
        assert_eq!(config.weight_for(SignalSource::EmaMomentum), 0.1);
        assert_eq!(config.weight_for(SignalSource::MultiTimeframe), 0.25);
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let json = r#"{ "aroon_period": 14, "mtf_primary_to_higher": { "5m": "1h" } }"#;
        let config: TrendConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.aroon_period, 14);
        assert_eq!(config.ema_slow_period, 50);
        assert_eq!(config.mtf_primary_to_higher.len(), 1);
        assert_eq!(config.source_weights, SourceWeights::default());
    }
}
