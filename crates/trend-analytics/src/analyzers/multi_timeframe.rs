//! 다중 타임프레임 정렬 분석기.
//!
//! 기본 타임프레임을 설정된 상위 타임프레임에 매핑하고, 상위 타임프레임
//! 캔들을 외부 `MarketDataProvider`에서 조회해 (심볼, 타임프레임) 단위로
//! TTL 캐시에 보관합니다. 두 시계열 각각에 대해 EMA/RSI/MACD/ADX 투표로
//! 방향을 정하고, 두 방향의 정렬 정도를 [0, 1] 점수로 계산합니다.
//!
//! 조회 실패는 오류로 전파하지 않고 상위 타임프레임 사용 불가로 처리합니다.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};
use trend_core::{
    MarketDataProvider, SignalDirection, SignalSource, Timeframe, TradeSide, TrendConfig,
    TrendSignal, Verbosity,
};
use trend_data::{CacheStats, TtlCache};

use crate::component::{AnalysisContext, ComponentReport, SignalComponent};
use crate::error::{AnalysisError, AnalysisResult};
use crate::indicators::{
    last_value, slope_pct_per_bar, value_back, AdxParams, EmaParams, MacdParams,
    MomentumCalculator, RsiParams, TrendIndicators, VolatilityIndicators,
};
use crate::series::PriceSeries;

/// 타임프레임 신호의 EMA 기간.
const SIGNAL_EMA_FAST: usize = 20;
const SIGNAL_EMA_SLOW: usize = 50;
const SIGNAL_SLOPE_LOOKBACK: usize = 5;
/// ADX 추세 기준.
const ADX_TRENDING: f64 = 25.0;
/// 방향 판정에 필요한 점수 차.
const DIRECTION_MARGIN: f64 = 0.2;
/// 상위 타임프레임 캐시 항목 수.
const HTF_CACHE_CAPACITY: usize = 64;

/// 다중 타임프레임 파라미터.
#[derive(Debug, Clone, Serialize)]
pub struct MultiTimeframeParams {
    pub primary_timeframe: Timeframe,
    pub primary_to_higher: BTreeMap<Timeframe, Timeframe>,
    pub alignment_threshold: f64,
    pub cache_ttl_secs: u64,
    pub bar_count: usize,
    pub rsi_period: usize,
    pub macd_fast_period: usize,
    pub macd_slow_period: usize,
    pub macd_signal_period: usize,
}

impl Default for MultiTimeframeParams {
    fn default() -> Self {
        Self::from(&TrendConfig::default())
    }
}

impl From<&TrendConfig> for MultiTimeframeParams {
    fn from(config: &TrendConfig) -> Self {
        Self {
            primary_timeframe: config.primary_timeframe,
            primary_to_higher: config.mtf_primary_to_higher.clone(),
            alignment_threshold: config.mtf_alignment_threshold,
            cache_ttl_secs: config.mtf_cache_ttl_secs,
            bar_count: config.mtf_bar_count,
            rsi_period: config.rsi_period,
            macd_fast_period: config.macd_fast_period,
            macd_slow_period: config.macd_slow_period,
            macd_signal_period: config.macd_signal_period,
        }
    }
}

/// 정렬 확인 수준.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationLevel {
    Strong,
    Moderate,
    Weak,
    Contradictory,
}

impl ConfirmationLevel {
    /// 점수 구간: 0.8 이상 strong, 0.6 이상 moderate, 0.4 이상 weak.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ConfirmationLevel::Strong
        } else if score >= 0.6 {
            ConfirmationLevel::Moderate
        } else if score >= 0.4 {
            ConfirmationLevel::Weak
        } else {
            ConfirmationLevel::Contradictory
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            ConfirmationLevel::Strong => 0.85,
            ConfirmationLevel::Moderate => 0.7,
            ConfirmationLevel::Weak => 0.5,
            ConfirmationLevel::Contradictory => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationLevel::Strong => "strong",
            ConfirmationLevel::Moderate => "moderate",
            ConfirmationLevel::Weak => "weak",
            ConfirmationLevel::Contradictory => "contradictory",
        }
    }
}

impl fmt::Display for ConfirmationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 한 타임프레임의 방향 투표 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeframeSignal {
    pub timeframe: Option<Timeframe>,
    pub direction: SignalDirection,
    pub bullish_score: f64,
    pub bearish_score: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub rsi: Option<f64>,
    /// MACD 라인 - 시그널 라인
    pub macd_spread: Option<f64>,
    pub adx: Option<f64>,
}

impl TimeframeSignal {
    /// ADX 기반 추세 강도 (0.0 ~ 1.0).
    pub fn trend_strength(&self) -> f64 {
        self.adx.map(|adx| (adx / 50.0).min(1.0)).unwrap_or(0.0)
    }

    fn is_trending(&self) -> bool {
        self.adx.is_some_and(|adx| adx > ADX_TRENDING)
    }
}

/// 타임프레임 정렬 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentResult {
    pub primary_timeframe: Option<Timeframe>,
    pub higher_timeframe: Option<Timeframe>,
    pub primary_signal: TimeframeSignal,
    pub higher_signal: Option<TimeframeSignal>,
    pub alignment_score: f64,
    pub confirmation_level: ConfirmationLevel,
}

impl AlignmentResult {
    /// 상위 타임프레임 데이터를 사용할 수 있었는지 여부.
    pub fn higher_available(&self) -> bool {
        self.higher_signal.is_some()
    }

    pub fn is_contradictory(&self) -> bool {
        self.confirmation_level == ConfirmationLevel::Contradictory
    }

    /// 상위 타임프레임 방향을 신호로 변환합니다.
    ///
    /// 상위 타임프레임이 없거나, 중립이거나, 정렬이 상충하면 신호가 없습니다.
    pub fn signals(&self, price: f64) -> Vec<TrendSignal> {
        let Some(higher) = &self.higher_signal else {
            return Vec::new();
        };
        if !higher.direction.is_directional() || self.is_contradictory() {
            return Vec::new();
        }

        vec![TrendSignal::new(
            SignalSource::MultiTimeframe,
            higher.direction,
            self.alignment_score,
            self.confirmation_level.confidence(),
            price,
        )
        .with_factor(format!("htf_{}_alignment", self.confirmation_level))]
    }
}

/// 다중 타임프레임 분석기.
pub struct MultiTimeframeAnalyzer {
    params: MultiTimeframeParams,
    verbosity: Verbosity,
    provider: Option<Arc<dyn MarketDataProvider>>,
    cache: TtlCache<(String, Timeframe), PriceSeries>,
}

impl fmt::Debug for MultiTimeframeAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiTimeframeAnalyzer")
            .field("params", &self.params)
            .field(
                "provider",
                &self.provider.as_ref().map(|p| p.provider_name().to_string()),
            )
            .field("cache_len", &self.cache.len())
            .finish()
    }
}

impl MultiTimeframeAnalyzer {
    /// 분석기를 생성합니다. 제공자가 없으면 상위 타임프레임은 항상 사용 불가입니다.
    pub fn new(
        params: MultiTimeframeParams,
        provider: Option<Arc<dyn MarketDataProvider>>,
        verbosity: Verbosity,
    ) -> AnalysisResult<Self> {
        let ttl = Duration::from_secs(params.cache_ttl_secs.max(1));
        let cache = TtlCache::new(HTF_CACHE_CAPACITY, ttl)
            .map_err(|e| AnalysisError::InvalidParameter(e.to_string()))?;

        Ok(Self {
            params,
            verbosity,
            provider,
            cache,
        })
    }

    pub fn params(&self) -> &MultiTimeframeParams {
        &self.params
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// 방향 투표에 필요한 최소 캔들 수.
    pub fn min_bars(&self) -> usize {
        SIGNAL_EMA_SLOW
            .max(self.params.macd_slow_period + self.params.macd_signal_period)
            .max(self.params.rsi_period + 1)
            .max(2 * AdxParams::default().period)
    }

    /// 기본 타임프레임에 매핑된 상위 타임프레임.
    pub fn higher_timeframe_for(&self, primary: Timeframe) -> Option<Timeframe> {
        self.params.primary_to_higher.get(&primary).copied()
    }

    /// 상위 타임프레임 캔들을 조회합니다 (캐시 우선).
    ///
    /// 제공자가 없거나 조회/변환에 실패하면 `None`을 반환합니다.
    pub fn get_higher_timeframe_data(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Option<PriceSeries> {
        let key = (symbol.to_string(), timeframe);
        if let Some(series) = self.cache.get(&key) {
            return Some(series);
        }

        let provider = self.provider.as_ref()?;
        let klines = match provider.fetch(symbol, timeframe, self.params.bar_count) {
            Ok(klines) => klines,
            Err(e) => {
                warn!(
                    symbol,
                    timeframe = %timeframe,
                    provider = provider.provider_name(),
                    error = %e,
                    retryable = e.is_retryable(),
                    "상위 타임프레임 조회 실패"
                );
                return None;
            }
        };

        let series = match PriceSeries::from_klines(&klines) {
            Ok(series) if !series.is_empty() => series,
            Ok(_) => {
                warn!(symbol, timeframe = %timeframe, "상위 타임프레임 데이터 없음");
                return None;
            }
            Err(e) => {
                warn!(symbol, timeframe = %timeframe, error = %e, "상위 타임프레임 변환 실패");
                return None;
            }
        };

        if self.verbosity.is_debug() {
            debug!(symbol, timeframe = %timeframe, bars = series.len(), "상위 타임프레임 캐시 적재");
        }
        self.cache.insert(key, series.clone());
        Some(series)
    }

    /// 한 타임프레임의 방향을 가중 투표로 결정합니다.
    ///
    /// - EMA(20) vs EMA(50): 0.3, EMA(20) 기울기: 0.1
    /// - RSI가 30~70 구간일 때 50 기준: 0.2
    /// - MACD 라인 vs 시그널: 0.2, 히스토그램 증감: 0.1
    /// - ADX > 25이면 앞선 쪽에 0.1
    pub fn timeframe_signal(&self, series: &PriceSeries) -> AnalysisResult<TimeframeSignal> {
        AnalysisError::ensure_len(series.len(), self.min_bars())?;

        let ti = TrendIndicators::new();
        let fast = ti.ema(&series.close, EmaParams { period: SIGNAL_EMA_FAST })?;
        let slow = ti.ema(&series.close, EmaParams { period: SIGNAL_EMA_SLOW })?;
        let slope = last_value(&slope_pct_per_bar(&fast, SIGNAL_SLOPE_LOOKBACK));

        let (ema_fast, ema_slow) = match (last_value(&fast), last_value(&slow)) {
            (Some(f), Some(s)) => (f, s),
            _ => {
                return Err(AnalysisError::Calculation(
                    "EMA 값을 계산할 수 없습니다".to_string(),
                ))
            }
        };

        let rsi = last_value(&MomentumCalculator::new().rsi(
            &series.close,
            RsiParams {
                period: self.params.rsi_period,
            },
        )?);

        let macd = ti.macd(
            &series.close,
            MacdParams {
                fast_period: self.params.macd_fast_period,
                slow_period: self.params.macd_slow_period,
                signal_period: self.params.macd_signal_period,
            },
        )?;
        let histogram: Vec<Option<f64>> = macd.iter().map(|p| p.histogram).collect();
        let macd_spread = macd
            .last()
            .and_then(|p| Some(p.macd? - p.signal?));

        let adx = VolatilityIndicators::new()
            .adx(&series.high, &series.low, &series.close, AdxParams::default())?
            .last()
            .and_then(|p| p.adx);

        let mut bullish = 0.0;
        let mut bearish = 0.0;

        if ema_fast > ema_slow {
            bullish += 0.3;
        } else if ema_fast < ema_slow {
            bearish += 0.3;
        }
        match slope {
            Some(s) if s > 0.0 => bullish += 0.1,
            Some(s) if s < 0.0 => bearish += 0.1,
            _ => {}
        }

        if let Some(r) = rsi {
            if r > 30.0 && r < 70.0 {
                if r > 50.0 {
                    bullish += 0.2;
                } else if r < 50.0 {
                    bearish += 0.2;
                }
            }
        }

        match macd_spread {
            Some(s) if s > 0.0 => bullish += 0.2,
            Some(s) if s < 0.0 => bearish += 0.2,
            _ => {}
        }
        if let (Some(now), Some(prev)) = (value_back(&histogram, 0), value_back(&histogram, 1)) {
            if now > prev {
                bullish += 0.1;
            } else if now < prev {
                bearish += 0.1;
            }
        }

        if adx.is_some_and(|a| a > ADX_TRENDING) {
            if bullish > bearish {
                bullish += 0.1;
            } else if bearish > bullish {
                bearish += 0.1;
            }
        }

        let diff = bullish - bearish;
        let direction = if diff > DIRECTION_MARGIN {
            SignalDirection::Bullish
        } else if diff < -DIRECTION_MARGIN {
            SignalDirection::Bearish
        } else {
            SignalDirection::Neutral
        };

        Ok(TimeframeSignal {
            timeframe: series.timeframe(),
            direction,
            bullish_score: bullish,
            bearish_score: bearish,
            ema_fast,
            ema_slow,
            rsi,
            macd_spread,
            adx,
        })
    }

    /// 두 타임프레임 신호의 정렬 점수를 계산합니다.
    ///
    /// 기본 점수: 같은 방향 0.8, 둘 다 중립 0.5, 한쪽만 중립 0.6, 반대 0.2.
    /// 반대가 아닐 때 상위 타임프레임 ADX > 25 (+0.1), RSI 50 기준 같은 편
    /// (+0.05), MACD 라인/시그널 같은 편 (+0.05) 보너스를 더합니다.
    /// 상위 타임프레임이 없으면 0.5 (weak)입니다.
    pub fn analyze_timeframe_alignment(
        &self,
        primary: TimeframeSignal,
        higher: Option<TimeframeSignal>,
        higher_timeframe: Option<Timeframe>,
    ) -> AlignmentResult {
        let primary_timeframe = primary.timeframe;
        let Some(higher_signal) = higher else {
            return AlignmentResult {
                primary_timeframe,
                higher_timeframe,
                primary_signal: primary,
                higher_signal: None,
                alignment_score: 0.5,
                confirmation_level: ConfirmationLevel::Weak,
            };
        };

        let p = primary.direction;
        let h = higher_signal.direction;
        let contradictory = p.is_directional() && h.is_directional() && p != h;

        let mut score: f64 = if contradictory {
            0.2
        } else if p.is_directional() && p == h {
            0.8
        } else if !p.is_directional() && !h.is_directional() {
            0.5
        } else {
            0.6
        };

        if !contradictory {
            if higher_signal.is_trending() {
                score += 0.1;
            }
            if let (Some(a), Some(b)) = (primary.rsi, higher_signal.rsi) {
                if (a - 50.0).signum() == (b - 50.0).signum() && a != 50.0 && b != 50.0 {
                    score += 0.05;
                }
            }
            if let (Some(a), Some(b)) = (primary.macd_spread, higher_signal.macd_spread) {
                if a != 0.0 && b != 0.0 && a.signum() == b.signum() {
                    score += 0.05;
                }
            }
        }

        let score = score.min(1.0);
        AlignmentResult {
            primary_timeframe,
            higher_timeframe,
            primary_signal: primary,
            higher_signal: Some(higher_signal),
            alignment_score: score,
            confirmation_level: ConfirmationLevel::from_score(score),
        }
    }

    /// 정렬 결과가 주어진 매매 방향을 지지하는지 확인합니다.
    ///
    /// 점수가 임계값 이상이고, 상충하지 않으며, 상위 타임프레임이 같은
    /// 방향이거나 (중립이면서 점수 0.5 이상)이어야 합니다.
    pub fn should_confirm_signal(&self, alignment: &AlignmentResult, side: TradeSide) -> bool {
        let Some(higher) = &alignment.higher_signal else {
            return false;
        };
        if alignment.alignment_score < self.params.alignment_threshold
            || alignment.is_contradictory()
        {
            return false;
        }

        higher.direction == side.expected_direction()
            || (higher.direction == SignalDirection::Neutral && alignment.alignment_score >= 0.5)
    }

    /// 상위 타임프레임 캐시 통계.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.cache.reset_stats();
    }
}

impl SignalComponent for MultiTimeframeAnalyzer {
    fn source(&self) -> SignalSource {
        SignalSource::MultiTimeframe
    }

    fn analyze(&mut self, ctx: &AnalysisContext<'_>) -> AnalysisResult<ComponentReport> {
        let primary = self.timeframe_signal(ctx.series)?;
        let primary_tf = ctx
            .series
            .timeframe()
            .unwrap_or(self.params.primary_timeframe);

        let higher_tf = self.higher_timeframe_for(primary_tf);
        let higher = match higher_tf {
            Some(tf) => self
                .get_higher_timeframe_data(ctx.symbol, tf)
                .and_then(|series| match self.timeframe_signal(&series) {
                    Ok(signal) => Some(signal),
                    Err(e) => {
                        debug!(symbol = ctx.symbol, timeframe = %tf, error = %e, "상위 타임프레임 신호 계산 불가");
                        None
                    }
                }),
            None => None,
        };

        let alignment = self.analyze_timeframe_alignment(primary, higher, higher_tf);
        if self.verbosity.is_verbose() {
            debug!(
                symbol = ctx.symbol,
                score = alignment.alignment_score,
                level = %alignment.confirmation_level,
                available = alignment.higher_available(),
                "타임프레임 정렬"
            );
        }

        Ok(ComponentReport::MultiTimeframe(alignment))
    }

    fn cache_stats(&self) -> Option<CacheStats> {
        Some(MultiTimeframeAnalyzer::cache_stats(self))
    }

    fn clear_cache(&mut self) {
        MultiTimeframeAnalyzer::clear_cache(self);
    }
}

// =============================================================================
// 테스트
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::test_support::*;
    use trend_data::InMemoryProvider;

    const SYMBOL: &str = "BTCUSDT";

    fn analyzer(provider: Option<Arc<InMemoryProvider>>) -> MultiTimeframeAnalyzer {
        MultiTimeframeAnalyzer::new(
            MultiTimeframeParams::default(),
            provider.map(|p| p as Arc<dyn MarketDataProvider>),
            Verbosity::Quiet,
        )
        .unwrap()
    }

    fn provider_with(drift_pct: f64) -> Arc<InMemoryProvider> {
        let klines = klines_from_closes(&trending_closes(200, drift_pct), 0.05, 1000.0);
        Arc::new(InMemoryProvider::new().with_series(SYMBOL, Timeframe::H4, klines))
    }

    fn run(analyzer: &mut MultiTimeframeAnalyzer, series: &PriceSeries) -> AlignmentResult {
        let ctx = AnalysisContext::new(SYMBOL, series);
        match analyzer.analyze(&ctx).unwrap() {
            ComponentReport::MultiTimeframe(alignment) => alignment,
            other => panic!("unexpected report: {:?}", other),
        }
    }

    #[test]
    fn test_timeframe_signal_directions() {
        let a = analyzer(None);

        let up = a
            .timeframe_signal(&series_from_closes(&trending_closes(200, 0.5)))
            .unwrap();
        assert_eq!(up.direction, SignalDirection::Bullish);
        assert!(up.ema_fast > up.ema_slow);

        let down = a
            .timeframe_signal(&series_from_closes(&trending_closes(200, -0.5)))
            .unwrap();
        assert_eq!(down.direction, SignalDirection::Bearish);

        let flat = a.timeframe_signal(&series_from_closes(&[100.0; 120])).unwrap();
        assert_eq!(flat.direction, SignalDirection::Neutral);
    }

    #[test]
    fn test_short_series_is_insufficient() {
        let a = analyzer(None);
        let err = a
            .timeframe_signal(&series_from_closes(&trending_closes(30, 0.5)))
            .unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_strong_alignment() {
        let mut a = analyzer(Some(provider_with(0.5)));
        let primary = series_from_closes(&trending_closes(200, 0.5));

        let alignment = run(&mut a, &primary);
        assert!(alignment.higher_available());
        assert_eq!(alignment.higher_timeframe, Some(Timeframe::H4));
        assert!(alignment.alignment_score >= 0.8);
        assert_eq!(alignment.confirmation_level, ConfirmationLevel::Strong);

        let signals = alignment.signals(150.0);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal_type, SignalDirection::Bullish);
        assert_eq!(signals[0].confidence, 0.85);

        assert!(a.should_confirm_signal(&alignment, TradeSide::Buy));
        assert!(!a.should_confirm_signal(&alignment, TradeSide::Sell));
    }

    #[test]
    fn test_contradictory_alignment() {
        let mut a = analyzer(Some(provider_with(-0.5)));
        let primary = series_from_closes(&trending_closes(200, 0.5));

        let alignment = run(&mut a, &primary);
        assert_eq!(alignment.alignment_score, 0.2);
        assert!(alignment.is_contradictory());
        assert!(alignment.signals(150.0).is_empty());
        assert!(!a.should_confirm_signal(&alignment, TradeSide::Buy));
    }

    #[test]
    fn test_unavailable_higher_timeframe() {
        let mut a = analyzer(None);
        let primary = series_from_closes(&trending_closes(200, 0.5));

        let alignment = run(&mut a, &primary);
        assert!(!alignment.higher_available());
        assert_eq!(alignment.alignment_score, 0.5);
        assert_eq!(alignment.confirmation_level, ConfirmationLevel::Weak);
        assert!(alignment.signals(150.0).is_empty());
        assert!(!a.should_confirm_signal(&alignment, TradeSide::Buy));
    }

    #[test]
    fn test_fetch_failure_degrades() {
        let provider = provider_with(0.5);
        provider.set_failing(SYMBOL, true);
        let mut a = analyzer(Some(provider.clone()));

        assert!(a.get_higher_timeframe_data(SYMBOL, Timeframe::H4).is_none());

        let alignment = run(&mut a, &series_from_closes(&trending_closes(200, 0.5)));
        assert!(!alignment.higher_available());
        assert_eq!(provider.fetch_count(), 2);
    }

    #[test]
    fn test_higher_timeframe_cache() {
        let provider = provider_with(0.5);
        let mut a = analyzer(Some(provider.clone()));

        assert!(a.get_higher_timeframe_data(SYMBOL, Timeframe::H4).is_some());
        assert!(a.get_higher_timeframe_data(SYMBOL, Timeframe::H4).is_some());
        assert_eq!(provider.fetch_count(), 1);

        let stats = a.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);

        a.clear_cache();
        assert!(a.get_higher_timeframe_data(SYMBOL, Timeframe::H4).is_some());
        assert_eq!(provider.fetch_count(), 2);
    }

    #[test]
    fn test_confirmation_level_buckets() {
        assert_eq!(ConfirmationLevel::from_score(0.8), ConfirmationLevel::Strong);
        assert_eq!(ConfirmationLevel::from_score(0.65), ConfirmationLevel::Moderate);
        assert_eq!(ConfirmationLevel::from_score(0.4), ConfirmationLevel::Weak);
        assert_eq!(
            ConfirmationLevel::from_score(0.39),
            ConfirmationLevel::Contradictory
        );
    }

    #[test]
    fn test_neutral_higher_timeframe_confirms_with_score() {
        let a = analyzer(None);
        let primary = a
            .timeframe_signal(&series_from_closes(&trending_closes(200, 0.5)))
            .unwrap();
        let mut higher = a.timeframe_signal(&series_from_closes(&[100.0; 120])).unwrap();
        higher.adx = Some(30.0);

        let alignment = a.analyze_timeframe_alignment(primary, Some(higher), Some(Timeframe::H4));
        // 한쪽 중립 0.6 + ADX 0.1
        assert!(alignment.alignment_score >= 0.6);
        assert!(a.should_confirm_signal(&alignment, TradeSide::Buy));
        assert!(a.should_confirm_signal(&alignment, TradeSide::Sell));
        assert!(alignment.signals(100.0).is_empty());
    }
}
