//! 시세 데이터 제공자 추상화.
//!
//! 상위 타임프레임 캔들을 외부 데이터 소스에서 조회하기 위한
//! 소스 중립적인 인터페이스를 제공합니다.
//!
//! 엔진은 동기식으로 실행되므로 `fetch`도 동기 호출입니다. 네트워크를
//! 사용하는 구현체는 자체 타임아웃을 적용해야 하며, 실패 시 엔진은 해당
//! 타임프레임을 사용 불가로 처리합니다.

use thiserror::Error;

use super::Kline;
use crate::types::Timeframe;

// =============================================================================
// 에러 타입
// =============================================================================

/// MarketDataProvider 에러.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 네트워크 에러
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 요청 타임아웃
    #[error("타임아웃: {0}")]
    Timeout(String),

    /// 심볼/타임프레임 데이터 없음
    #[error("데이터 없음: {0}")]
    NotFound(String),

    /// 지원하지 않는 타임프레임 등
    #[error("지원하지 않는 기능: {0}")]
    Unsupported(String),

    /// 기타 에러
    #[error("기타 에러: {0}")]
    Other(String),
}

impl ProviderError {
    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Network(_) | ProviderError::Timeout(_))
    }
}

// =============================================================================
// MarketDataProvider Trait
// =============================================================================

/// 시세 데이터 제공자 trait.
///
/// # 구현 예시
///
/// ```ignore
/// pub struct RestKlineProvider {
///     client: RestClient,
/// }
///
/// impl MarketDataProvider for RestKlineProvider {
///     fn fetch(&self, symbol: &str, timeframe: Timeframe, bar_count: usize)
///         -> Result<Vec<Kline>, ProviderError>
///     {
///         // REST 호출 및 변환 (타임아웃 포함)
///     }
///
///     fn provider_name(&self) -> &str {
///         "rest"
///     }
/// }
/// ```
pub trait MarketDataProvider: Send + Sync {
    /// 최근 `bar_count`개의 캔들을 시간순으로 조회합니다.
    ///
    /// # Errors
    ///
    /// - `ProviderError::Network` / `ProviderError::Timeout`: 일시적 장애
    /// - `ProviderError::NotFound`: 심볼 또는 타임프레임 데이터 없음
    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bar_count: usize,
    ) -> Result<Vec<Kline>, ProviderError>;

    /// 제공자 이름 (로깅용).
    fn provider_name(&self) -> &str;
}
