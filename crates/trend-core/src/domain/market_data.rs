//! 시장 데이터 타입.
//!
//! - `Kline` - OHLCV 캔들스틱 데이터
//! - `validate_klines` - 엔진 입력 시퀀스 검증

use crate::error::{TrendError, TrendResult};
use crate::types::Timeframe;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 가격 타입.
pub type Price = Decimal;

/// 거래량 타입.
pub type Quantity = Decimal;

/// OHLCV 캔들스틱 데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    /// 종목 코드
    pub ticker: String,
    /// 타임프레임
    pub timeframe: Timeframe,
    /// 캔들 시작 시간
    pub open_time: DateTime<Utc>,
    /// 시가
    pub open: Price,
    /// 고가
    pub high: Price,
    /// 저가
    pub low: Price,
    /// 종가
    pub close: Price,
    /// 거래량
    pub volume: Quantity,
    /// 캔들 종료 시간
    pub close_time: DateTime<Utc>,
}

impl Kline {
    /// 새 캔들을 생성합니다. 종료 시간은 타임프레임 길이로 계산합니다.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ticker: impl Into<String>,
        timeframe: Timeframe,
        open_time: DateTime<Utc>,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Quantity,
    ) -> Self {
        let span = chrono::Duration::seconds(timeframe.as_secs() as i64);
        Self {
            ticker: ticker.into(),
            timeframe,
            open_time,
            open,
            high,
            low,
            close,
            volume,
            close_time: open_time + span,
        }
    }

    /// 캔들 몸통 크기(절대값)를 반환합니다.
    pub fn body_size(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    /// 캔들 범위(고가 - 저가)를 반환합니다.
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// 양봉(종가 > 시가)인지 확인합니다.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 음봉(종가 < 시가)인지 확인합니다.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// 가격 필드가 모두 양수이고 고가 >= 저가인지 확인합니다.
    pub fn is_well_formed(&self) -> bool {
        self.low > Decimal::ZERO
            && self.high >= self.low
            && self.open > Decimal::ZERO
            && self.close > Decimal::ZERO
            && self.volume >= Decimal::ZERO
    }
}

/// 엔진 입력 캔들 시퀀스를 검증합니다.
///
/// 시작 시간이 엄격하게 증가해야 하며, 모든 캔들이 정상 형태여야 합니다.
pub fn validate_klines(klines: &[Kline]) -> TrendResult<()> {
    if let Some(idx) = klines.iter().position(|k| !k.is_well_formed()) {
        return Err(TrendError::InvalidInput(format!(
            "잘못된 캔들 (index {}): 가격은 양수이고 고가 >= 저가여야 합니다",
            idx
        )));
    }

    if let Some(idx) = klines
        .windows(2)
        .position(|w| w[1].open_time <= w[0].open_time)
    {
        return Err(TrendError::InvalidInput(format!(
            "캔들 시간이 증가하지 않습니다 (index {})",
            idx + 1
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn make_kline(hour: u32, close: Decimal) -> Kline {
        Kline::new(
            "BTC/USDT",
            Timeframe::H1,
            Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            close,
            close + dec!(1),
            close - dec!(1),
            close,
            dec!(1000),
        )
    }

    #[test]
    fn test_kline_close_time() {
        let kline = make_kline(3, dec!(100));
        assert_eq!(
            kline.close_time,
            Utc.with_ymd_and_hms(2024, 1, 1, 4, 0, 0).unwrap()
        );
        assert_eq!(kline.range(), dec!(2));
    }

    #[test]
    fn test_validate_klines_ordering() {
        let ok = vec![make_kline(1, dec!(100)), make_kline(2, dec!(101))];
        assert!(validate_klines(&ok).is_ok());

        let unordered = vec![make_kline(2, dec!(100)), make_kline(1, dec!(101))];
        assert!(validate_klines(&unordered).is_err());

        let duplicated = vec![make_kline(2, dec!(100)), make_kline(2, dec!(101))];
        assert!(validate_klines(&duplicated).is_err());
    }

    #[test]
    fn test_validate_klines_malformed() {
        let mut bad = make_kline(1, dec!(100));
        bad.high = dec!(90);
        assert!(validate_klines(&[bad]).is_err());
        assert!(validate_klines(&[]).is_ok());
    }
}
