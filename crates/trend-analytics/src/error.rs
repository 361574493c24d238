//! 분석 컴포넌트 오류 타입.

use thiserror::Error;
use trend_core::{SignalSource, TrendError};

/// 분석 오류.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// 데이터 부족 오류
    #[error("데이터가 부족합니다: 필요 {required}개, 제공 {provided}개")]
    InsufficientData { required: usize, provided: usize },

    /// 잘못된 파라미터
    #[error("잘못된 파라미터: {0}")]
    InvalidParameter(String),

    /// 계산 오류
    #[error("계산 오류: {0}")]
    Calculation(String),

    /// 잘못된 시계열 (길이 불일치, 비정상 값)
    #[error("잘못된 시계열: {0}")]
    InvalidSeries(String),
}

/// 분석 결과 타입.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

impl AnalysisError {
    /// 데이터 부족으로 인한 건너뜀인지 확인합니다.
    ///
    /// 데이터 부족은 컴포넌트 장애로 집계하지 않습니다.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, AnalysisError::InsufficientData { .. })
    }

    /// 데이터 개수가 부족하면 에러를 반환합니다.
    pub fn ensure_len(provided: usize, required: usize) -> AnalysisResult<()> {
        if provided < required {
            Err(AnalysisError::InsufficientData { required, provided })
        } else {
            Ok(())
        }
    }

    /// 컴포넌트 정보를 붙여 `TrendError`로 변환합니다.
    pub fn into_trend_error(self, source: SignalSource) -> TrendError {
        match self {
            AnalysisError::InsufficientData { required, provided } => {
                TrendError::InsufficientData { required, provided }
            }
            other => TrendError::analysis(source.as_str(), other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_trend_error() {
        let err = AnalysisError::Calculation("NaN slope".to_string());
        let trend = err.into_trend_error(SignalSource::EmaMomentum);
        assert_eq!(trend.to_string(), "분석 에러 [ema_momentum]: 계산 오류: NaN slope");

        let short = AnalysisError::ensure_len(10, 25).unwrap_err();
        assert!(short.is_insufficient_data());
        assert!(matches!(
            short.into_trend_error(SignalSource::Aroon),
            TrendError::InsufficientData { required: 25, provided: 10 }
        ));
    }
}
