//! 추세 감지 엔진.
//!
//! 검증된 설정으로 6개 분석 컴포넌트를 생성하고, 호출마다 순서대로 실행해
//! 신호를 가중 결합합니다.
//!
//! # 호출 흐름
//!
//! ```text
//! 비활성화 / 캔들 부족 / 입력 오류 ──> 빈 결과 (confidence 0.0)
//!          │
//!          ▼
//!   결과 캐시 조회 ──(적중)──> 캐시된 결과
//!          │
//!          ▼
//!   컴포넌트 실행 ──> 거래량 신호 ──> 민감도 필터 ──> 가중 결합 ──> 조기 경고
//! ```
//!
//! 컴포넌트 오류는 로그와 상태 추적기에만 반영되며 `analyze_trend_change`는
//! 항상 결과를 반환합니다.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::mem::size_of;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};
use trend_analytics::{
    AnalysisContext, AnalysisResult, AroonIndicator, AroonParams, ComponentReport,
    DivergenceDetector, DivergenceParams, EmaMomentumAnalyzer, EmaMomentumParams, LevelType,
    MarketStructureAnalyzer, MarketStructureParams, MultiTimeframeAnalyzer, MultiTimeframeParams,
    PriceSeries, SignalComponent, TrendlineAnalyzer, TrendlineParams,
};
use trend_core::{
    analysis_span, validate_klines, Kline, MarketDataProvider, Price, SignalDirection,
    SignalSource, Timeframe, TradeSide, TrendConfig, TrendResult, TrendSignal,
};
use trend_data::{CacheStats, TtlCache};

use crate::health::{ComponentHealth, ComponentHealthTracker, ComponentStatus, HealthPolicy};
use crate::result::{
    AnalysisStatus, ComponentFailure, EarlyWarning, TrendAnalysisResult, WarningKind,
    WarningSeverity,
};
use crate::stats::{HealthStatus, PerformanceStats, PerformanceTracker};
use crate::validator::{ConfigurationValidator, ValidationReport};

/// 거래량 신호의 평균 구간 (봉)
const VOLUME_AVERAGE_WINDOW: usize = 20;
/// 거래량 신호 신뢰도
const VOLUME_SIGNAL_CONFIDENCE: f64 = 0.6;
/// 민감도 1단계당 최소 신호 강도 변화
const SENSITIVITY_STEP: f64 = 0.02;
/// 결과 하나가 차지하는 힙 데이터 추정치 (신호, 리포트)
const APPROX_RESULT_HEAP_BYTES: usize = 4 * 1024;

/// 결과 캐시 키: (심볼, 타임프레임, 캔들 수, 마지막 캔들 시작 시각, 마지막 종가)
type ResultKey = (String, Option<Timeframe>, usize, i64, Price);

/// 컴포넌트와 상태 추적기.
struct ComponentSlot {
    source: SignalSource,
    /// 생성 실패 시 None
    component: Option<Box<dyn SignalComponent>>,
    health: ComponentHealthTracker,
}

/// 설정 요약.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigInfo {
    pub config: TrendConfig,
    pub enabled_components: Vec<SignalSource>,
    /// 소스별 결합 가중치
    pub weights: BTreeMap<SignalSource, f64>,
    pub min_signal_strength: f64,
    pub provider: Option<String>,
}

impl ConfigInfo {
    pub fn to_json(&self) -> TrendResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// 추세 감지 엔진.
pub struct TrendDetectionEngine {
    config: TrendConfig,
    provider: Option<Arc<dyn MarketDataProvider>>,
    slots: Vec<ComponentSlot>,
    result_cache: TtlCache<ResultKey, TrendAnalysisResult>,
    performance: PerformanceTracker,
}

impl fmt::Debug for TrendDetectionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let components: Vec<_> = self
            .slots
            .iter()
            .map(|s| (s.source, s.health.health()))
            .collect();
        f.debug_struct("TrendDetectionEngine")
            .field("config", &self.config)
            .field("provider", &self.provider.as_ref().map(|p| p.provider_name()))
            .field("components", &components)
            .finish()
    }
}

impl TrendDetectionEngine {
    /// 새 엔진을 생성합니다.
    ///
    /// 설정은 검증 후 보정본이 사용됩니다. 생성에 실패한 컴포넌트는
    /// Disabled 상태로 등록되고 나머지 컴포넌트로 동작합니다.
    ///
    /// # Errors
    ///
    /// 구조적 설정 오류(단기 기간 >= 장기 기간)면 `TrendError::Configuration`.
    pub fn new(
        config: TrendConfig,
        provider: Option<Arc<dyn MarketDataProvider>>,
    ) -> TrendResult<Self> {
        let report = ConfigurationValidator::validate_config(&config);
        if !report.corrections.is_empty() {
            info!(corrections = report.corrections.len(), "설정 값 보정");
        }
        let config = report.into_result()?;

        let result_cache = Self::build_result_cache(&config)?;
        let mut engine = Self {
            config,
            provider,
            slots: Vec::new(),
            result_cache,
            performance: PerformanceTracker::new(),
        };
        engine.rebuild_components();

        info!(
            components = engine.slots.len(),
            mtf = engine.config.enable_mtf_analysis,
            "추세 감지 엔진 생성"
        );
        Ok(engine)
    }

    /// 기본 설정, 외부 제공자 없이 생성합니다.
    pub fn with_defaults() -> TrendResult<Self> {
        Self::new(TrendConfig::default(), None)
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    fn build_result_cache(
        config: &TrendConfig,
    ) -> TrendResult<TtlCache<ResultKey, TrendAnalysisResult>> {
        Ok(TtlCache::new(
            config.trend_cache_size,
            Duration::from_secs(config.trend_cache_ttl_secs),
        )?)
    }

    /// 설정에서 활성화된 컴포넌트 목록.
    fn enabled_sources(config: &TrendConfig) -> Vec<SignalSource> {
        SignalSource::COMPONENTS
            .into_iter()
            .filter(|s| *s != SignalSource::MultiTimeframe || config.enable_mtf_analysis)
            .collect()
    }

    fn build_component(
        source: SignalSource,
        config: &TrendConfig,
        provider: Option<Arc<dyn MarketDataProvider>>,
    ) -> AnalysisResult<Box<dyn SignalComponent>> {
        let verbosity = config.verbosity;
        let component: Box<dyn SignalComponent> = match source {
            SignalSource::MarketStructure => Box::new(MarketStructureAnalyzer::new(
                MarketStructureParams::from(config),
                verbosity,
            )),
            SignalSource::Aroon => {
                Box::new(AroonIndicator::new(AroonParams::from(config), verbosity))
            }
            SignalSource::EmaMomentum => Box::new(EmaMomentumAnalyzer::new(
                EmaMomentumParams::from(config),
                verbosity,
            )?),
            SignalSource::Divergence => Box::new(DivergenceDetector::new(
                DivergenceParams::from(config),
                verbosity,
            )),
            SignalSource::MultiTimeframe => Box::new(MultiTimeframeAnalyzer::new(
                MultiTimeframeParams::from(config),
                provider,
                verbosity,
            )?),
            SignalSource::Trendline => {
                Box::new(TrendlineAnalyzer::new(TrendlineParams::from(config), verbosity))
            }
            SignalSource::Volume => {
                return Err(trend_analytics::AnalysisError::InvalidParameter(
                    "거래량 신호는 엔진이 직접 계산합니다".to_string(),
                ))
            }
        };
        Ok(component)
    }

    /// 현재 설정으로 컴포넌트를 다시 만듭니다.
    ///
    /// 기존 상태 추적기는 유지합니다. 이전에 생성에 실패했던 컴포넌트가
    /// 이번에 생성되면 추적기를 리셋합니다. 서킷 브레이커로 비활성화된
    /// 컴포넌트는 명시적 리셋 전까지 그대로 둡니다.
    fn rebuild_components(&mut self) {
        let policy = HealthPolicy::from(&self.config);
        let mut previous: BTreeMap<SignalSource, (ComponentHealthTracker, bool)> = self
            .slots
            .drain(..)
            .map(|slot| (slot.source, (slot.health, slot.component.is_none())))
            .collect();

        for source in Self::enabled_sources(&self.config) {
            let (mut health, init_failed) = previous
                .remove(&source)
                .unwrap_or_else(|| (ComponentHealthTracker::new(source, policy), false));
            health.set_policy(policy);

            let component =
                match Self::build_component(source, &self.config, self.provider.clone()) {
                    Ok(component) => {
                        if init_failed {
                            health.reset();
                        }
                        Some(component)
                    }
                    Err(e) => {
                        health.record_init_failure(e.to_string());
                        None
                    }
                };

            self.slots.push(ComponentSlot {
                source,
                component,
                health,
            });
        }
    }

    /// 신호로 채택할 최소 강도. 민감도가 높을수록 낮아집니다.
    pub fn min_signal_strength(&self) -> f64 {
        let sensitivity = self.config.trend_detection_sensitivity.min(10);
        f64::from(10 - sensitivity) * SENSITIVITY_STEP
    }

    // ==================== 분석 ====================

    /// 캔들 시퀀스의 추세 변화를 분석합니다.
    ///
    /// 어떤 입력에도 패닉이나 오류 없이 결과를 반환합니다. 분석할 수 없는
    /// 입력은 신호가 없고 신뢰도가 0인 결과가 됩니다.
    pub fn analyze_trend_change(&mut self, klines: &[Kline], symbol: &str) -> TrendAnalysisResult {
        let started = Instant::now();
        let timeframe = klines.first().map(|k| k.timeframe);
        let span = match timeframe {
            Some(tf) => analysis_span!("analyze_trend_change", symbol, tf),
            None => analysis_span!("analyze_trend_change", symbol),
        };
        let _enter = span.enter();

        if !self.config.enable_trend_detection {
            self.performance.record_empty();
            return TrendAnalysisResult::empty(symbol, klines.len(), AnalysisStatus::Disabled);
        }

        if klines.len() < self.config.min_bars_required {
            debug!(
                bars = klines.len(),
                required = self.config.min_bars_required,
                "캔들 수 부족"
            );
            self.performance.record_empty();
            return TrendAnalysisResult::empty(
                symbol,
                klines.len(),
                AnalysisStatus::InsufficientData,
            );
        }

        if let Err(e) = validate_klines(klines) {
            warn!(error = %e, "입력 캔들 검증 실패");
            self.performance.record_data_error();
            return TrendAnalysisResult::empty(symbol, klines.len(), AnalysisStatus::InvalidInput);
        }

        if !self.config.graceful_degradation {
            if let Some(slot) = self
                .slots
                .iter()
                .find(|s| s.health.health() == ComponentHealth::Disabled)
            {
                warn!(component = %slot.source, "비활성화된 컴포넌트가 있어 분석을 거부합니다");
                self.performance.record_empty();
                let mut result =
                    TrendAnalysisResult::empty(symbol, klines.len(), AnalysisStatus::FailClosed);
                result.early_warnings = self.health_warnings();
                return result;
            }
        }

        let key = Self::cache_key(symbol, klines);
        if let Some(key) = &key {
            if let Some(mut cached) = self.result_cache.get(key) {
                cached.cached = true;
                self.performance
                    .record_analysis(started.elapsed(), cached.signals.len());
                debug!("결과 캐시 적중");
                return cached;
            }
        }

        let series = match PriceSeries::from_klines(klines) {
            Ok(series) => series,
            Err(e) => {
                warn!(error = %e, "가격 시계열 변환 실패");
                self.performance.record_data_error();
                return TrendAnalysisResult::empty(
                    symbol,
                    klines.len(),
                    AnalysisStatus::InvalidInput,
                );
            }
        };

        let mut result = self.run_components(symbol, &series);

        if let Some(signal) = self.volume_signal(&series) {
            result.signals.push(signal);
        }

        let min_strength = self.min_signal_strength();
        result.signals.retain(|s| s.strength >= min_strength);
        result.confidence = combined_confidence(&result.signals, &self.config);

        let mut warnings = self.component_warnings(&result.component_results);
        warnings.extend(self.health_warnings());
        result.early_warnings = warnings;

        let elapsed = started.elapsed();
        result.duration_ms = elapsed.as_secs_f64() * 1000.0;
        self.performance.record_analysis(elapsed, result.signals.len());

        if let Some(key) = key {
            self.result_cache.insert(key, result.clone());
        }

        debug!(
            signals = result.signals.len(),
            confidence = result.confidence,
            warnings = result.early_warnings.len(),
            elapsed_ms = result.duration_ms,
            "추세 분석 완료"
        );
        result
    }

    fn cache_key(symbol: &str, klines: &[Kline]) -> Option<ResultKey> {
        let last = klines.last()?;
        Some((
            symbol.to_string(),
            Some(last.timeframe),
            klines.len(),
            last.open_time.timestamp_millis(),
            last.close,
        ))
    }

    /// 실행 가능한 컴포넌트를 순서대로 실행합니다.
    fn run_components(&mut self, symbol: &str, series: &PriceSeries) -> TrendAnalysisResult {
        let ctx = AnalysisContext::new(symbol, series);
        let price = series.last_close().unwrap_or_default();
        let verbose = self.config.verbosity.is_verbose();

        let mut result =
            TrendAnalysisResult::empty(symbol, series.len(), AnalysisStatus::Completed);
        result.timeframe = series.timeframe();

        for slot in self.slots.iter_mut() {
            if !slot.health.is_runnable() {
                continue;
            }
            let Some(component) = slot.component.as_mut() else {
                continue;
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| component.analyze(&ctx)))
                .unwrap_or_else(|payload| Err(panic_error(payload.as_ref())));

            match outcome {
                Ok(report) => {
                    slot.health.record_success();
                    result.signals.extend(report.signals(price));
                    result.component_results.insert(slot.source, report);
                }
                Err(e) if e.is_insufficient_data() => {
                    slot.health.record_skip();
                    result.skipped_components.push(slot.source);
                    if verbose {
                        debug!(component = %slot.source, reason = %e, "컴포넌트 건너뜀");
                    }
                }
                Err(e) => {
                    warn!(component = %slot.source, error = %e, "분석 컴포넌트 실패");
                    slot.health.record_failure(e.to_string());
                    self.performance.record_component_error();
                    result.failed_components.push(ComponentFailure {
                        source: slot.source,
                        error: e.to_string(),
                    });
                }
            }
        }

        result
    }

    /// 마지막 봉의 거래량 급증 신호.
    ///
    /// 직전 20봉 평균 대비 배수가 확인 임계값 이상이고 몸통 방향이 분명할
    /// 때만 생성합니다. 임계값의 두 배에서 강도 1.0이 됩니다.
    pub fn volume_signal(&self, series: &PriceSeries) -> Option<TrendSignal> {
        let last = series.len().checked_sub(1)?;
        let average = series.average_volume(last, VOLUME_AVERAGE_WINDOW)?;
        if average <= 0.0 {
            return None;
        }

        let threshold = self.config.volume_confirmation_threshold;
        let ratio = series.volume[last] / average;
        if ratio < threshold {
            return None;
        }

        let body = series.close[last] - series.open[last];
        let direction = SignalDirection::from_sign(body);
        if !direction.is_directional() {
            return None;
        }

        Some(
            TrendSignal::new(
                SignalSource::Volume,
                direction,
                ratio / (2.0 * threshold),
                VOLUME_SIGNAL_CONFIDENCE,
                series.close[last],
            )
            .with_factor(format!("volume_ratio_{:.2}", ratio)),
        )
    }

    /// 분석 결과에서 조기 경고를 추출합니다.
    fn component_warnings(
        &self,
        reports: &BTreeMap<SignalSource, ComponentReport>,
    ) -> Vec<EarlyWarning> {
        let ema_direction = match reports.get(&SignalSource::EmaMomentum) {
            Some(ComponentReport::EmaMomentum(ema)) => ema.signal_type.direction(),
            _ => SignalDirection::Neutral,
        };

        let mut warnings = Vec::new();
        for (source, report) in reports {
            let source = *source;
            match report {
                ComponentReport::Aroon(aroon) if aroon.signal_type.is_weakening() => {
                    warnings.push(EarlyWarning::new(
                        WarningKind::TrendWeakening,
                        source,
                        WarningSeverity::Medium,
                        format!("Aroon 추세 약화 ({})", aroon.signal_type.as_str()),
                    ));
                }
                ComponentReport::EmaMomentum(ema) if ema.signal_type.is_weakening() => {
                    warnings.push(EarlyWarning::new(
                        WarningKind::TrendWeakening,
                        source,
                        WarningSeverity::Medium,
                        format!("EMA 모멘텀 약화 ({})", ema.signal_type.as_str()),
                    ));
                }
                ComponentReport::Divergence(report) => {
                    let Some(divergence) = report.strongest() else {
                        continue;
                    };
                    let direction = divergence.divergence_type.direction();
                    if ema_direction.is_directional() && direction == ema_direction.opposite() {
                        let severity = if divergence.strength >= 0.6 {
                            WarningSeverity::High
                        } else {
                            WarningSeverity::Medium
                        };
                        warnings.push(EarlyWarning::new(
                            WarningKind::DivergenceAgainstTrend,
                            source,
                            severity,
                            format!(
                                "{} {} 다이버전스가 {} 추세와 반대 (강도 {:.2})",
                                divergence.indicator.as_str(),
                                direction,
                                ema_direction,
                                divergence.strength
                            ),
                        ));
                    }
                }
                ComponentReport::Trendline(report) => {
                    let Some(nearest) = &report.nearest else {
                        continue;
                    };
                    if nearest.distance_pct <= self.config.retest_tolerance_pct {
                        let kind = match nearest.line_type {
                            LevelType::Support => "지지",
                            LevelType::Resistance => "저항",
                        };
                        warnings.push(EarlyWarning::new(
                            WarningKind::TrendlineProximity,
                            source,
                            WarningSeverity::Low,
                            format!(
                                "{} 추세선 {:.4} 근접 ({:.2}%)",
                                kind, nearest.line_value, nearest.distance_pct
                            ),
                        ));
                    }
                }
                ComponentReport::MultiTimeframe(alignment) if alignment.is_contradictory() => {
                    warnings.push(EarlyWarning::new(
                        WarningKind::TimeframeConflict,
                        source,
                        WarningSeverity::High,
                        format!(
                            "상위 타임프레임과 방향 충돌 (정렬 점수 {:.2})",
                            alignment.alignment_score
                        ),
                    ));
                }
                ComponentReport::MarketStructure(structure) => {
                    if let Some(brk) = structure.structure_break.as_ref().filter(|b| !b.confirmed)
                    {
                        warnings.push(EarlyWarning::new(
                            WarningKind::UnconfirmedBreak,
                            source,
                            WarningSeverity::Low,
                            format!("미확인 구조 돌파 ({})", brk.break_type.as_str()),
                        ));
                    }
                }
                _ => {}
            }
        }
        warnings
    }

    /// Degraded/Disabled 컴포넌트 경고.
    fn health_warnings(&self) -> Vec<EarlyWarning> {
        self.slots
            .iter()
            .filter_map(|slot| {
                let severity = match slot.health.health() {
                    ComponentHealth::Available => return None,
                    ComponentHealth::Degraded => WarningSeverity::Medium,
                    ComponentHealth::Disabled => WarningSeverity::High,
                };
                Some(EarlyWarning::new(
                    WarningKind::ComponentDegraded,
                    slot.source,
                    severity,
                    format!("{} 컴포넌트 상태: {}", slot.source, slot.health.health()),
                ))
            })
            .collect()
    }

    /// 매매 방향이 추세와 맞는지 판단합니다.
    ///
    /// 방향이 일치하는 신호가 하나 이상 있고 결합 신뢰도가
    /// `min_trend_confidence` 이상이어야 합니다.
    pub fn should_trade_trend(
        &mut self,
        klines: &[Kline],
        symbol: &str,
        side: TradeSide,
    ) -> (bool, f64) {
        let result = self.analyze_trend_change(klines, symbol);
        let allowed =
            result.has_signal_for(side) && result.confidence >= self.config.min_trend_confidence;

        debug!(
            symbol,
            side = ?side,
            allowed,
            confidence = result.confidence,
            "매매 판단"
        );
        (allowed, result.confidence)
    }

    // ==================== 설정 ====================

    /// 설정을 교체합니다.
    ///
    /// 검증에 실패하면 기존 설정을 유지합니다. 성공하면 컴포넌트를 새 설정으로
    /// 다시 만들고 결과 캐시를 비웁니다. 컴포넌트 상태는 유지되지만, 생성
    /// 실패로 비활성화됐던 컴포넌트는 새 설정으로 생성되면 다시 사용 가능해집니다.
    pub fn update_config(&mut self, config: TrendConfig) -> TrendResult<ValidationReport> {
        let report = ConfigurationValidator::validate_config(&config);
        let validated = report.clone().into_result()?;

        self.result_cache = Self::build_result_cache(&validated)?;
        self.config = validated;
        self.rebuild_components();

        info!(
            corrections = report.corrections.len(),
            components = self.slots.len(),
            "설정 갱신"
        );
        Ok(report)
    }

    /// 현재 설정을 다시 검증합니다.
    pub fn validate_runtime_config(&self) -> ValidationReport {
        ConfigurationValidator::validate_config(&self.config)
    }

    pub fn get_config_info(&self) -> ConfigInfo {
        let enabled_components: Vec<SignalSource> = self.slots.iter().map(|s| s.source).collect();
        let weights = enabled_components
            .iter()
            .copied()
            .chain(std::iter::once(SignalSource::Volume))
            .map(|s| (s, self.config.weight_for(s)))
            .collect();

        ConfigInfo {
            config: self.config.clone(),
            enabled_components,
            weights,
            min_signal_strength: self.min_signal_strength(),
            provider: self.provider.as_ref().map(|p| p.provider_name().to_string()),
        }
    }

    // ==================== 상태 ====================

    /// 등록된 컴포넌트를 교체합니다 (같은 소스의 슬롯).
    ///
    /// 교체된 컴포넌트의 상태는 리셋됩니다. 해당 소스의 슬롯이 없으면
    /// false를 반환합니다.
    pub fn replace_component(&mut self, component: Box<dyn SignalComponent>) -> bool {
        let source = component.source();
        let Some(slot) = self.slots.iter_mut().find(|s| s.source == source) else {
            return false;
        };
        slot.component = Some(component);
        slot.health.reset();
        self.result_cache.clear();
        true
    }

    pub fn get_component_status(&self) -> Vec<ComponentStatus> {
        self.slots.iter().map(|s| s.health.status()).collect()
    }

    pub fn component_health(&self, source: SignalSource) -> Option<ComponentHealth> {
        self.slots
            .iter()
            .find(|s| s.source == source)
            .map(|s| s.health.health())
    }

    /// 컴포넌트를 수동 리셋합니다.
    ///
    /// 생성에 실패했던 컴포넌트는 다시 생성을 시도합니다. 리셋 후 실행
    /// 가능하면 true.
    pub fn reset_component(&mut self, source: SignalSource) -> bool {
        let config = &self.config;
        let provider = &self.provider;
        let Some(slot) = self.slots.iter_mut().find(|s| s.source == source) else {
            return false;
        };

        slot.health.reset();
        if slot.component.is_none() {
            match Self::build_component(source, config, provider.clone()) {
                Ok(component) => slot.component = Some(component),
                Err(e) => {
                    slot.health.record_init_failure(e.to_string());
                    return false;
                }
            }
        }
        self.result_cache.clear();
        true
    }

    pub fn reset_all_components(&mut self) {
        let sources: Vec<SignalSource> = self.slots.iter().map(|s| s.source).collect();
        for source in sources {
            self.reset_component(source);
        }
    }

    /// 상위 타임프레임 캐시 통계.
    fn mtf_cache_stats(&self) -> Option<CacheStats> {
        self.slots
            .iter()
            .filter_map(|s| s.component.as_ref())
            .find_map(|c| c.cache_stats())
    }

    /// 캐시 보유 데이터 추정 크기.
    fn estimated_memory_bytes(&self, mtf_cache: Option<&CacheStats>) -> usize {
        let results = self.result_cache.len()
            * (size_of::<TrendAnalysisResult>() + APPROX_RESULT_HEAP_BYTES);
        // 상위 타임프레임 시계열: 시각 + OHLCV 6열
        let series = mtf_cache.map_or(0, |stats| {
            stats.len * self.config.mtf_bar_count * 6 * size_of::<f64>()
        });
        results + series
    }

    pub fn get_performance_stats(&self) -> PerformanceStats {
        let mtf_cache = self.mtf_cache_stats();
        let memory = self.estimated_memory_bytes(mtf_cache.as_ref());
        self.performance
            .snapshot(self.result_cache.stats(), mtf_cache, memory)
    }

    pub fn get_health_status(&self) -> HealthStatus {
        HealthStatus::evaluate(&self.get_component_status(), self.performance.error_rate())
    }

    /// 결과 캐시와 컴포넌트 내부 캐시를 비웁니다.
    pub fn clear_caches(&mut self) {
        self.result_cache.clear();
        self.result_cache.reset_stats();
        for component in self.slots.iter_mut().filter_map(|s| s.component.as_mut()) {
            component.clear_cache();
        }
    }

    pub fn reset_performance_stats(&mut self) {
        self.performance.reset();
    }
}

/// 신호의 가중 결합 신뢰도.
///
/// `Σ(confidence × strength × weight) / Σ(weight)`. 신호가 없으면 0.0.
pub fn combined_confidence(signals: &[TrendSignal], config: &TrendConfig) -> f64 {
    let (weighted, total_weight) =
        signals
            .iter()
            .fold((0.0, 0.0), |(weighted, total), signal| {
                let weight = config.weight_for(signal.source);
                (weighted + signal.score() * weight, total + weight)
            });

    if total_weight > 0.0 {
        (weighted / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// 컴포넌트 패닉을 분석 실패로 변환합니다.
fn panic_error(payload: &(dyn Any + Send)) -> trend_analytics::AnalysisError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "알 수 없는 패닉".to_string());
    trend_analytics::AnalysisError::Calculation(format!("컴포넌트 패닉: {}", message))
}

// =============================================================================
// 테스트
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn signal(source: SignalSource, strength: f64, confidence: f64) -> TrendSignal {
        TrendSignal::new(source, SignalDirection::Bullish, strength, confidence, 100.0)
    }

    fn kline(i: i64, open: f64, close: f64, volume: f64) -> Kline {
        let dec = |v: f64| Decimal::from_f64_retain(v).unwrap().round_dp(8);
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + ChronoDuration::hours(i);
        Kline::new(
            "BTC/USDT",
            Timeframe::H1,
            time,
            dec(open),
            dec(open.max(close) + 0.5),
            dec(open.min(close) - 0.5),
            dec(close),
            dec(volume),
        )
    }

    #[test]
    fn test_combined_confidence_weighting() {
        let config = TrendConfig::default();
        let signals = vec![
            signal(SignalSource::MarketStructure, 1.0, 0.8),
            signal(SignalSource::Aroon, 0.5, 0.6),
        ];

        // (0.8 * 0.4 + 0.3 * 0.3) / 0.7
        let expected = (0.32 + 0.09) / 0.7;
        assert!((combined_confidence(&signals, &config) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_combined_confidence_empty() {
        assert_eq!(combined_confidence(&[], &TrendConfig::default()), 0.0);
    }

    #[test]
    fn test_min_signal_strength_by_sensitivity() {
        let mut config = TrendConfig::default();
        config.trend_detection_sensitivity = 10;
        let engine = TrendDetectionEngine::new(config, None).unwrap();
        assert_eq!(engine.min_signal_strength(), 0.0);

        let engine = TrendDetectionEngine::with_defaults().unwrap();
        assert!((engine.min_signal_strength() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_volume_signal() {
        let engine = TrendDetectionEngine::with_defaults().unwrap();

        let mut klines: Vec<Kline> = (0..30).map(|i| kline(i, 100.0, 100.5, 1000.0)).collect();
        klines.push(kline(30, 100.0, 102.0, 3000.0));
        let series = PriceSeries::from_klines(&klines).unwrap();

        let signal = engine.volume_signal(&series).unwrap();
        assert_eq!(signal.source, SignalSource::Volume);
        assert_eq!(signal.signal_type, SignalDirection::Bullish);
        // 3.0 / (2 * 1.5)
        assert!((signal.strength - 1.0).abs() < 1e-9);

        // 평균 수준의 거래량은 신호 없음
        klines.pop();
        klines.push(kline(30, 102.0, 101.0, 1100.0));
        let series = PriceSeries::from_klines(&klines).unwrap();
        assert!(engine.volume_signal(&series).is_none());
    }

    #[test]
    fn test_mtf_disabled_removes_component() {
        let mut config = TrendConfig::default();
        config.enable_mtf_analysis = false;
        let engine = TrendDetectionEngine::new(config, None).unwrap();

        let info = engine.get_config_info();
        assert_eq!(info.enabled_components.len(), 5);
        assert!(!info
            .enabled_components
            .contains(&SignalSource::MultiTimeframe));
        assert!(engine.get_performance_stats().mtf_cache.is_none());
        assert!(info.to_json().is_ok());
    }

    #[test]
    fn test_update_config_recovers_init_failure() {
        let mut engine = TrendDetectionEngine::with_defaults().unwrap();
        let slot = engine
            .slots
            .iter_mut()
            .find(|s| s.source == SignalSource::Trendline)
            .unwrap();
        slot.component = None;
        slot.health.record_init_failure("생성 실패");
        assert_eq!(
            engine.component_health(SignalSource::Trendline),
            Some(ComponentHealth::Disabled)
        );

        engine.update_config(TrendConfig::default()).unwrap();
        assert_eq!(
            engine.component_health(SignalSource::Trendline),
            Some(ComponentHealth::Available)
        );
        assert!(engine
            .slots
            .iter()
            .all(|s| s.component.is_some()));
    }

    #[test]
    fn test_update_config_keeps_breaker_disabled_component() {
        let mut engine = TrendDetectionEngine::with_defaults().unwrap();
        let threshold = engine.config().circuit_breaker_threshold;
        let slot = engine
            .slots
            .iter_mut()
            .find(|s| s.source == SignalSource::Aroon)
            .unwrap();
        for _ in 0..threshold {
            slot.health.record_failure("계산 실패");
        }
        assert_eq!(
            engine.component_health(SignalSource::Aroon),
            Some(ComponentHealth::Disabled)
        );

        engine.update_config(TrendConfig::default()).unwrap();
        assert_eq!(
            engine.component_health(SignalSource::Aroon),
            Some(ComponentHealth::Disabled)
        );
    }

    #[test]
    fn test_structural_config_error_is_fatal() {
        let mut config = TrendConfig::default();
        config.ema_fast_period = 60;
        config.ema_slow_period = 50;

        let err = TrendDetectionEngine::new(config, None).unwrap_err();
        assert!(err.is_fatal());
    }
}
