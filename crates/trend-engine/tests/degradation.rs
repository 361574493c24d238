//! 컴포넌트 장애, 서킷 브레이커, 다중 타임프레임 가용성, 설정 갱신 테스트.

mod common;

use std::sync::Arc;

use common::*;
use trend_analytics::{
    AnalysisContext, AnalysisError, AnalysisResult, ComponentReport, SignalComponent,
};
use trend_core::{MarketDataProvider, SignalDirection, SignalSource, Timeframe, TrendConfig};
use trend_data::InMemoryProvider;
use trend_engine::{
    AnalysisStatus, ComponentHealth, HealthLevel, TrendDetectionEngine, WarningKind,
};

/// 항상 계산 오류를 내는 Aroon 대체 컴포넌트.
struct FailingAroon;

impl SignalComponent for FailingAroon {
    fn source(&self) -> SignalSource {
        SignalSource::Aroon
    }

    fn analyze(&mut self, _ctx: &AnalysisContext<'_>) -> AnalysisResult<ComponentReport> {
        Err(AnalysisError::Calculation("boom".to_string()))
    }
}

/// 분석 중 패닉을 일으키는 추세선 대체 컴포넌트.
struct PanickingTrendline;

impl SignalComponent for PanickingTrendline {
    fn source(&self) -> SignalSource {
        SignalSource::Trendline
    }

    fn analyze(&mut self, ctx: &AnalysisContext<'_>) -> AnalysisResult<ComponentReport> {
        panic!("추세선 인덱스 초과: {}", ctx.series.len());
    }
}

fn failing_engine(graceful_degradation: bool) -> TrendDetectionEngine {
    let config = TrendConfig {
        circuit_breaker_threshold: 3,
        graceful_degradation,
        enable_mtf_analysis: false,
        ..TrendConfig::default()
    };
    let mut engine = TrendDetectionEngine::new(config, None).unwrap();
    assert!(engine.replace_component(Box::new(FailingAroon)));
    engine
}

#[test]
fn test_component_failure_is_isolated() {
    let mut engine = failing_engine(true);
    let klines = uptrend_klines();

    let result = engine.analyze_trend_change(&klines, SYMBOL);
    assert_eq!(result.status, AnalysisStatus::Completed);
    assert_eq!(result.failed_components.len(), 1);
    assert_eq!(result.failed_components[0].source, SignalSource::Aroon);
    assert!(!result.component_results.contains_key(&SignalSource::Aroon));
    assert_eq!(result.signals_from(SignalSource::Aroon).count(), 0);

    // 나머지 컴포넌트는 계속 동작
    assert!(result
        .component_results
        .contains_key(&SignalSource::EmaMomentum));
    assert_eq!(engine.get_performance_stats().component_errors, 1);
}

#[test]
fn test_component_panic_is_recorded_as_failure() {
    let config = TrendConfig {
        enable_mtf_analysis: false,
        ..TrendConfig::default()
    };
    let mut engine = TrendDetectionEngine::new(config, None).unwrap();
    assert!(engine.replace_component(Box::new(PanickingTrendline)));
    let klines = uptrend_klines();

    let result = engine.analyze_trend_change(&klines, SYMBOL);
    assert_eq!(result.status, AnalysisStatus::Completed);
    assert_eq!(result.failed_components.len(), 1);
    assert_eq!(result.failed_components[0].source, SignalSource::Trendline);
    assert!(result.failed_components[0].error.contains("패닉"));
    assert!(result
        .component_results
        .contains_key(&SignalSource::EmaMomentum));
    assert_eq!(engine.get_performance_stats().component_errors, 1);
    assert_eq!(
        engine.component_health(SignalSource::Trendline),
        Some(ComponentHealth::Available)
    );

    // 연속 패닉은 서킷 브레이커로 이어짐
    let threshold = engine.config().circuit_breaker_threshold as usize;
    for extra in 1..threshold {
        engine.analyze_trend_change(&klines[..klines.len() - extra], SYMBOL);
    }
    assert_eq!(
        engine.component_health(SignalSource::Trendline),
        Some(ComponentHealth::Disabled)
    );
}

#[test]
fn test_circuit_breaker_disables_component() {
    let mut engine = failing_engine(true);
    let klines = uptrend_klines();

    // 캐시를 피하려고 매번 다른 길이로 분석
    engine.analyze_trend_change(&klines[..150], SYMBOL);
    assert_eq!(
        engine.component_health(SignalSource::Aroon),
        Some(ComponentHealth::Available)
    );

    engine.analyze_trend_change(&klines[..151], SYMBOL);
    assert_eq!(
        engine.component_health(SignalSource::Aroon),
        Some(ComponentHealth::Degraded)
    );

    engine.analyze_trend_change(&klines[..152], SYMBOL);
    assert_eq!(
        engine.component_health(SignalSource::Aroon),
        Some(ComponentHealth::Disabled)
    );

    // 비활성화된 컴포넌트는 실행되지 않음
    let result = engine.analyze_trend_change(&klines[..153], SYMBOL);
    assert_eq!(result.status, AnalysisStatus::Completed);
    assert!(result.failed_components.is_empty());
    assert!(result
        .early_warnings
        .iter()
        .any(|w| w.kind == WarningKind::ComponentDegraded && w.source == SignalSource::Aroon));

    let status = engine
        .get_component_status()
        .into_iter()
        .find(|s| s.source == SignalSource::Aroon)
        .unwrap();
    assert_eq!(status.total_failures, 3);
    assert_eq!(status.disabled_count, 1);
    assert_eq!(status.last_error.as_deref(), Some("계산 오류: boom"));

    let health = engine.get_health_status();
    assert_eq!(health.disabled_components, 1);
    assert_ne!(health.level, HealthLevel::Healthy);
    assert!(health.score < 100.0);

    assert!(engine.reset_component(SignalSource::Aroon));
    assert_eq!(
        engine.component_health(SignalSource::Aroon),
        Some(ComponentHealth::Available)
    );
}

#[test]
fn test_fail_closed_without_graceful_degradation() {
    let mut engine = failing_engine(false);
    let klines = uptrend_klines();

    for len in 150..153 {
        engine.analyze_trend_change(&klines[..len], SYMBOL);
    }
    assert_eq!(
        engine.component_health(SignalSource::Aroon),
        Some(ComponentHealth::Disabled)
    );

    let result = engine.analyze_trend_change(&klines[..160], SYMBOL);
    assert_eq!(result.status, AnalysisStatus::FailClosed);
    assert!(result.signals.is_empty());
    assert_eq!(result.confidence, 0.0);
    assert!(!result.early_warnings.is_empty());

    engine.reset_all_components();
    let result = engine.analyze_trend_change(&klines[..161], SYMBOL);
    assert_eq!(result.status, AnalysisStatus::Completed);
    assert!(engine
        .get_component_status()
        .iter()
        .all(|s| s.health != ComponentHealth::Disabled));
}

fn mtf_engine(provider: Arc<InMemoryProvider>) -> TrendDetectionEngine {
    TrendDetectionEngine::new(
        TrendConfig::default(),
        Some(provider as Arc<dyn MarketDataProvider>),
    )
    .unwrap()
}

#[test]
fn test_higher_timeframe_confirmation() {
    let higher = klines_from_closes(&trending_closes(200, 0.5), 0.05, 1000.0);
    let provider = Arc::new(InMemoryProvider::new().with_series(SYMBOL, Timeframe::H4, higher));
    let mut engine = mtf_engine(provider.clone());
    let primary = klines_from_closes(&trending_closes(200, 0.5), 0.05, 1000.0);

    let result = engine.analyze_trend_change(&primary, SYMBOL);
    match result.component_results.get(&SignalSource::MultiTimeframe) {
        Some(ComponentReport::MultiTimeframe(alignment)) => {
            assert!(alignment.higher_available());
            assert_eq!(alignment.higher_timeframe, Some(Timeframe::H4));
            assert!(!alignment.is_contradictory());
            assert_eq!(
                alignment.higher_signal.as_ref().map(|s| s.direction),
                Some(SignalDirection::Bullish)
            );
        }
        other => panic!("다중 타임프레임 결과 없음: {:?}", other),
    }
    assert_eq!(result.signals_from(SignalSource::MultiTimeframe).count(), 1);

    // 상위 타임프레임 데이터는 캐시에서 재사용
    engine.analyze_trend_change(&primary[..199], SYMBOL);
    assert_eq!(provider.fetch_count(), 1);

    let mtf_cache = engine.get_performance_stats().mtf_cache.unwrap();
    assert_eq!(mtf_cache.hits, 1);
    assert_eq!(mtf_cache.len, 1);
}

#[test]
fn test_higher_timeframe_unavailable_degrades() {
    let provider = Arc::new(InMemoryProvider::new());
    provider.set_failing(SYMBOL, true);
    let mut engine = mtf_engine(provider.clone());
    let primary = klines_from_closes(&trending_closes(200, 0.5), 0.05, 1000.0);

    let result = engine.analyze_trend_change(&primary, SYMBOL);
    assert_eq!(result.status, AnalysisStatus::Completed);
    assert!(result.failed_components.is_empty());
    match result.component_results.get(&SignalSource::MultiTimeframe) {
        Some(ComponentReport::MultiTimeframe(alignment)) => {
            assert!(!alignment.higher_available());
        }
        other => panic!("다중 타임프레임 결과 없음: {:?}", other),
    }
    assert_eq!(result.signals_from(SignalSource::MultiTimeframe).count(), 0);
    assert_eq!(provider.fetch_count(), 1);
    assert_eq!(
        engine.component_health(SignalSource::MultiTimeframe),
        Some(ComponentHealth::Available)
    );
}

#[test]
fn test_update_config() {
    let mut engine = TrendDetectionEngine::new(TrendConfig::default(), None).unwrap();
    let klines = uptrend_klines();
    engine.analyze_trend_change(&klines, SYMBOL);

    // 구조적 오류는 거부되고 기존 설정 유지
    let invalid = TrendConfig {
        macd_fast_period: 30,
        macd_slow_period: 20,
        ..TrendConfig::default()
    };
    let err = engine.update_config(invalid).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(engine.config().macd_fast_period, 12);

    // 범위 밖 값은 보정
    let clamped = TrendConfig {
        aroon_period: 500,
        enable_mtf_analysis: false,
        ..TrendConfig::default()
    };
    let report = engine.update_config(clamped).unwrap();
    assert!(report.is_valid);
    assert!(report.corrections.iter().any(|c| c.field == "aroon_period"));
    assert_eq!(engine.config().aroon_period, 100);
    assert_eq!(engine.get_config_info().enabled_components.len(), 5);

    // 결과 캐시는 새로 생성
    let result = engine.analyze_trend_change(&klines, SYMBOL);
    assert!(!result.cached);

    let first = engine.validate_runtime_config();
    let second = engine.validate_runtime_config();
    assert!(first.is_valid);
    assert_eq!(first.is_valid, second.is_valid);
    assert_eq!(first.error_count(), second.error_count());
    assert!(first.corrections.is_empty());
}

#[test]
fn test_config_info_json() {
    let engine = TrendDetectionEngine::new(TrendConfig::default(), None).unwrap();
    let info = engine.get_config_info();

    assert_eq!(info.enabled_components.len(), 6);
    assert_eq!(info.weights.get(&SignalSource::Volume), Some(&0.1));
    assert_eq!(info.weights.get(&SignalSource::MultiTimeframe), Some(&0.25));
    assert!(info.provider.is_none());

    let json = info.to_json().unwrap();
    assert_eq!(json["config"]["aroon_period"], 25);
    assert!(json["enabled_components"].is_array());
}
