//! 추세 감지 시스템의 에러 타입.
//!
//! 이 모듈은 워크스페이스 전반에서 사용되는 최상위 에러 타입을 정의합니다.

use thiserror::Error;

use crate::domain::ProviderError;

/// 핵심 추세 감지 에러.
#[derive(Debug, Error)]
pub enum TrendError {
    /// 설정 에러 (구조적 관계 위반, 엔진 시작 불가)
    #[error("설정 에러: {0}")]
    Configuration(String),

    /// 분석 컴포넌트 에러
    #[error("분석 에러 [{component}]: {message}")]
    Analysis { component: String, message: String },

    /// 데이터 부족
    #[error("데이터가 부족합니다: 필요 {required}개, 제공 {provided}개")]
    InsufficientData { required: usize, provided: usize },

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 외부 시세 제공자 에러
    #[error("시세 제공자 에러: {0}")]
    Provider(#[from] ProviderError),

    /// 데이터/캐시 에러
    #[error("데이터 에러: {0}")]
    Data(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 추세 감지 작업을 위한 Result 타입.
pub type TrendResult<T> = Result<T, TrendError>;

impl TrendError {
    /// 분석 에러를 생성합니다.
    pub fn analysis(component: impl Into<String>, message: impl Into<String>) -> Self {
        TrendError::Analysis {
            component: component.into(),
            message: message.into(),
        }
    }

    /// 엔진을 시작할 수 없는 치명적인 에러인지 확인합니다.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TrendError::Configuration(_))
    }

    /// 호출 단위로 흡수 가능한(복구 가능한) 에러인지 확인합니다.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TrendError::Analysis { .. }
                | TrendError::InsufficientData { .. }
                | TrendError::Provider(_)
                | TrendError::Data(_)
        )
    }
}

impl From<serde_json::Error> for TrendError {
    fn from(err: serde_json::Error) -> Self {
        TrendError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for TrendError {
    fn from(err: config::ConfigError) -> Self {
        TrendError::Configuration(err.to_string())
    }
}
