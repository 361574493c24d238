//! 추세 감지 엔진.
//!
//! 이 crate는 다음을 제공합니다:
//! - 설정 검증 및 보정 (`ConfigurationValidator`)
//! - 컴포넌트 상태 머신 (`ComponentHealthTracker`)
//! - 성능 통계와 상태 점수
//! - 6개 분석 컴포넌트를 결합하는 `TrendDetectionEngine`
//!
//! # 예제
//!
//! ```ignore
//! use trend_engine::TrendDetectionEngine;
//! use trend_core::{TradeSide, TrendConfig};
//!
//! let mut engine = TrendDetectionEngine::new(TrendConfig::default(), None)?;
//! let result = engine.analyze_trend_change(&klines, "BTC/USDT");
//! let (allowed, confidence) = engine.should_trade_trend(&klines, "BTC/USDT", TradeSide::Buy);
//! ```

pub mod engine;
pub mod health;
pub mod result;
pub mod stats;
pub mod validator;

pub use engine::{combined_confidence, ConfigInfo, TrendDetectionEngine};
pub use health::{ComponentHealth, ComponentHealthTracker, ComponentStatus, HealthPolicy};
pub use result::{
    AnalysisStatus, ComponentFailure, EarlyWarning, TrendAnalysisResult, WarningKind,
    WarningSeverity,
};
pub use stats::{HealthLevel, HealthStatus, PerformanceStats, PerformanceTracker};
pub use validator::{ConfigCorrection, ConfigIssue, ConfigurationValidator, ValidationReport};
