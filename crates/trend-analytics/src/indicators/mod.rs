//! 기술적 지표 모듈.
//!
//! 분석기에서 사용하는 지표를 f64 시계열 기준으로 제공합니다.
//!
//! # 지원 지표
//!
//! ## 추세 지표 (Trend Indicators)
//! - **SMA**: 단순 이동평균 (Simple Moving Average)
//! - **EMA**: 지수 이동평균 (Exponential Moving Average)
//! - **MACD**: 이동평균 수렴/확산 (Moving Average Convergence Divergence)
//! - **선형회귀 기울기**: 봉당 % 변화율
//!
//! ## 모멘텀 지표 (Momentum Indicators)
//! - **RSI**: 상대강도지수 (Relative Strength Index)
//!
//! ## 변동성 지표 (Volatility Indicators)
//! - **ATR**: 평균 실제 범위 (Average True Range)
//! - **ADX**: 평균 방향성 지수 (Average Directional Index)
//!
//! 모든 지표는 입력과 같은 길이의 `Vec<Option<f64>>`를 반환하며, 값이
//! 정의되지 않는 앞부분은 `None`입니다.

pub mod momentum;
pub mod trend;
pub mod volatility;

pub use momentum::{MomentumCalculator, RsiParams};
pub use trend::{
    linear_regression_slope, slope_pct_per_bar, EmaParams, MacdParams, MacdPoint, SmaParams,
    TrendIndicators,
};
pub use volatility::{AdxParams, AdxPoint, AtrParams, VolatilityIndicators};

/// 마지막 유효 값.
pub fn last_value(values: &[Option<f64>]) -> Option<f64> {
    values.last().copied().flatten()
}

/// 끝에서 `back`번째 이전 값 (`back = 0`이면 마지막 값).
pub fn value_back(values: &[Option<f64>], back: usize) -> Option<f64> {
    values
        .len()
        .checked_sub(back + 1)
        .and_then(|i| values[i])
}
