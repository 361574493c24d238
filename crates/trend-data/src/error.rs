//! 데이터 모듈 오류 타입.

use thiserror::Error;
use trend_core::TrendError;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 잘못된 캐시 설정
    #[error("Cache configuration error: {0}")]
    CacheConfig(String),

    /// 레코드를 찾을 수 없음
    #[error("Record not found: {0}")]
    NotFound(String),

    /// 잘못된 데이터 형식
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// 데이터 작업 Result 타입.
pub type Result<T> = std::result::Result<T, DataError>;

impl From<DataError> for TrendError {
    fn from(err: DataError) -> Self {
        TrendError::Data(err.to_string())
    }
}
