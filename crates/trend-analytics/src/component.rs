//! 분석 컴포넌트 공통 인터페이스.
//!
//! 엔진은 모든 분석기를 `SignalComponent` trait 객체로 보유하고 순서대로
//! 실행합니다. 각 분석기의 결과는 `ComponentReport`의 변형(variant)으로
//! 반환되며, 방향성이 있는 결과만 `TrendSignal`로 변환됩니다.

use serde::Serialize;
use trend_core::{SignalSource, TrendSignal};
use trend_data::CacheStats;

use crate::analyzers::{
    AlignmentResult, AroonSignal, DivergenceReport, EmaSignal, MarketStructureReport,
    TrendlineReport,
};
use crate::error::AnalysisResult;
use crate::series::PriceSeries;

/// 한 번의 분석 호출에 공유되는 입력.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub symbol: &'a str,
    pub series: &'a PriceSeries,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(symbol: &'a str, series: &'a PriceSeries) -> Self {
        Self { symbol, series }
    }
}

/// 분석 컴포넌트 trait.
///
/// 다중 타임프레임 분석기처럼 내부 캐시를 가진 컴포넌트가 있으므로
/// `analyze`는 `&mut self`를 받습니다.
pub trait SignalComponent: Send {
    /// 이 컴포넌트의 신호 소스.
    fn source(&self) -> SignalSource;

    /// 입력 시계열을 분석합니다.
    ///
    /// # Errors
    ///
    /// - `AnalysisError::InsufficientData`: 이 컴포넌트에 필요한 캔들 부족
    /// - 그 외: 계산 실패 (엔진이 장애로 집계)
    fn analyze(&mut self, ctx: &AnalysisContext<'_>) -> AnalysisResult<ComponentReport>;

    /// 내부 캐시 통계 (캐시가 없는 컴포넌트는 None).
    fn cache_stats(&self) -> Option<CacheStats> {
        None
    }

    /// 내부 캐시 비우기.
    fn clear_cache(&mut self) {}
}

/// 분석기별 결과.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "component", rename_all = "snake_case")]
pub enum ComponentReport {
    MarketStructure(MarketStructureReport),
    Aroon(AroonSignal),
    EmaMomentum(EmaSignal),
    Divergence(DivergenceReport),
    MultiTimeframe(AlignmentResult),
    Trendline(TrendlineReport),
}

impl ComponentReport {
    pub fn source(&self) -> SignalSource {
        match self {
            ComponentReport::MarketStructure(_) => SignalSource::MarketStructure,
            ComponentReport::Aroon(_) => SignalSource::Aroon,
            ComponentReport::EmaMomentum(_) => SignalSource::EmaMomentum,
            ComponentReport::Divergence(_) => SignalSource::Divergence,
            ComponentReport::MultiTimeframe(_) => SignalSource::MultiTimeframe,
            ComponentReport::Trendline(_) => SignalSource::Trendline,
        }
    }

    /// 방향성이 있는 결과를 신호로 변환합니다.
    pub fn signals(&self, price: f64) -> Vec<TrendSignal> {
        match self {
            ComponentReport::MarketStructure(report) => report.signals(price),
            ComponentReport::Aroon(signal) => signal.signals(price),
            ComponentReport::EmaMomentum(signal) => signal.signals(price),
            ComponentReport::Divergence(report) => report.signals(price),
            ComponentReport::MultiTimeframe(alignment) => alignment.signals(price),
            ComponentReport::Trendline(report) => report.signals(price),
        }
    }
}

// =============================================================================
// 테스트
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::{AroonSignalType, TrendlineReport};
    use trend_core::SignalDirection;

    #[test]
    fn test_report_serializes_with_component_tag() {
        let report = ComponentReport::Aroon(AroonSignal {
            aroon_up: 96.0,
            aroon_down: 0.0,
            oscillator: 96.0,
            signal_type: AroonSignalType::VeryStrongBullish,
            trend_strength: 0.85,
            crossover_strength: None,
        });

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["component"], "aroon");
        assert_eq!(json["signal_type"], "very_strong_bullish");

        let signals = report.signals(150.0);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].source, report.source());
        assert_eq!(signals[0].signal_type, SignalDirection::Bullish);
    }

    #[test]
    fn test_empty_report_has_no_signals() {
        let report = ComponentReport::Trendline(TrendlineReport::default());
        assert_eq!(report.source(), SignalSource::Trendline);
        assert!(report.signals(100.0).is_empty());
        assert_eq!(serde_json::to_value(&report).unwrap()["component"], "trendline");
    }
}
