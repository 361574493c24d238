//! 추세 분석 엔진의 분석 컴포넌트.
//!
//! 이 crate는 다음을 제공합니다:
//! - f64 가격 시계열 변환 (`PriceSeries`)
//! - 기술적 지표 (SMA/EMA/MACD, RSI, ATR/ADX)
//! - 스윙 포인트 탐지
//! - 공통 `SignalComponent` trait 뒤의 6개 분석기
//!   - 시장 구조 (`MarketStructureAnalyzer`)
//!   - Aroon (`AroonIndicator`)
//!   - EMA 모멘텀 (`EmaMomentumAnalyzer`)
//!   - 다이버전스 (`DivergenceDetector`)
//!   - 다중 타임프레임 정렬 (`MultiTimeframeAnalyzer`)
//!   - 추세선 (`TrendlineAnalyzer`)

pub mod analyzers;
pub mod component;
pub mod error;
pub mod indicators;
pub mod series;
pub mod swing;

pub use analyzers::*;
pub use component::{AnalysisContext, ComponentReport, SignalComponent};
pub use error::{AnalysisError, AnalysisResult};
pub use series::{IndicatorAnnotations, PriceSeries};
pub use swing::{find_swings, SwingKind, SwingPoint};
