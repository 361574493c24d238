//! # Trend Core
//!
//! 추세 감지 엔진의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 워크스페이스 전반에서 사용되는 기본 타입을 제공합니다:
//! - OHLCV 캔들 (`Kline`) 및 타임프레임
//! - 추세 신호 (`TrendSignal`) 및 신호 소스
//! - 외부 시세 제공자 추상화 (`MarketDataProvider`)
//! - 엔진 설정 (`TrendConfig`)
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use crate::config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
