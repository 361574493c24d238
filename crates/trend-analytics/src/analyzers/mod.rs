//! 추세 분석기 모듈.
//!
//! 각 분석기는 `SignalComponent`를 구현하며 설정(`TrendConfig`)에서 만든
//! 파라미터 구조체와 `Verbosity`를 생성 시 주입받습니다.

pub mod aroon;
pub mod divergence;
pub mod ema_momentum;
pub mod market_structure;
pub mod multi_timeframe;
pub mod trendline;

pub use aroon::{
    AroonIndicator, AroonParams, AroonSeries, AroonSignal, AroonSignalType, ConsolidationAnalysis,
};
pub use divergence::{
    DivergenceDetector, DivergenceIndicator, DivergenceParams, DivergenceReport, DivergenceResult,
    DivergenceType,
};
pub use ema_momentum::{
    EmaLevel, EmaMomentumAnalyzer, EmaMomentumParams, EmaSeries, EmaSignal, EmaSignalType,
};
pub use market_structure::{
    LevelType, MarketStructure, MarketStructureAnalyzer, MarketStructureParams,
    MarketStructureReport, SRLevel, StructureBreakResult, StructureBreakType,
};
pub use multi_timeframe::{
    AlignmentResult, ConfirmationLevel, MultiTimeframeAnalyzer, MultiTimeframeParams,
    TimeframeSignal,
};
pub use trendline::{
    Trendline, TrendlineAnalyzer, TrendlineBreak, TrendlineParams, TrendlineProximity,
    TrendlineReport,
};
