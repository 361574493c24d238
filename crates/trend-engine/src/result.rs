//! 엔진 분석 결과.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use trend_analytics::ComponentReport;
use trend_core::{SignalDirection, SignalSource, Timeframe, TradeSide, TrendSignal};
use uuid::Uuid;

/// 분석 호출의 종료 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// 모든 단계 완료
    Completed,
    /// 설정으로 추세 감지 비활성화
    Disabled,
    /// 캔들 수 부족
    InsufficientData,
    /// 입력 캔들 검증 실패
    InvalidInput,
    /// 비활성화된 컴포넌트가 있어 분석 거부 (graceful_degradation = false)
    FailClosed,
}

/// 조기 경고 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    TrendWeakening,
    DivergenceAgainstTrend,
    TrendlineProximity,
    TimeframeConflict,
    UnconfirmedBreak,
    ComponentDegraded,
}

/// 경고 심각도.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningSeverity {
    Low,
    Medium,
    High,
}

/// 조기 경고.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarlyWarning {
    pub kind: WarningKind,
    pub source: SignalSource,
    pub message: String,
    pub severity: WarningSeverity,
}

impl EarlyWarning {
    pub fn new(
        kind: WarningKind,
        source: SignalSource,
        severity: WarningSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source,
            message: message.into(),
            severity,
        }
    }
}

/// 컴포넌트 실패 기록.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentFailure {
    pub source: SignalSource,
    pub error: String,
}

/// 추세 분석 결과.
#[derive(Debug, Clone, Serialize)]
pub struct TrendAnalysisResult {
    pub id: Uuid,
    pub symbol: String,
    pub timeframe: Option<Timeframe>,
    pub timestamp: DateTime<Utc>,
    pub status: AnalysisStatus,
    pub bar_count: usize,
    pub signals: Vec<TrendSignal>,
    /// 가중 결합 신뢰도 (0.0 ~ 1.0)
    pub confidence: f64,
    pub component_results: BTreeMap<SignalSource, ComponentReport>,
    pub early_warnings: Vec<EarlyWarning>,
    /// 데이터 부족으로 건너뛴 컴포넌트
    pub skipped_components: Vec<SignalSource>,
    pub failed_components: Vec<ComponentFailure>,
    pub duration_ms: f64,
    /// 결과 캐시에서 반환되었는지
    pub cached: bool,
}

impl TrendAnalysisResult {
    /// 신호가 없는 결과.
    pub fn empty(symbol: &str, bar_count: usize, status: AnalysisStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            timeframe: None,
            timestamp: Utc::now(),
            status,
            bar_count,
            signals: Vec::new(),
            confidence: 0.0,
            component_results: BTreeMap::new(),
            early_warnings: Vec::new(),
            skipped_components: Vec::new(),
            failed_components: Vec::new(),
            duration_ms: 0.0,
            cached: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn signals_from(&self, source: SignalSource) -> impl Iterator<Item = &TrendSignal> {
        self.signals.iter().filter(move |s| s.source == source)
    }

    /// 매매 방향과 일치하는 신호가 있는지.
    pub fn has_signal_for(&self, side: TradeSide) -> bool {
        self.signals.iter().any(|s| s.matches(side))
    }

    /// 신뢰도 × 강도 합이 큰 방향.
    pub fn dominant_direction(&self) -> SignalDirection {
        let net: f64 = self
            .signals
            .iter()
            .map(|s| match s.signal_type {
                SignalDirection::Bullish => s.score(),
                SignalDirection::Bearish => -s.score(),
                SignalDirection::Neutral => 0.0,
            })
            .sum();
        SignalDirection::from_sign(net)
    }
}
