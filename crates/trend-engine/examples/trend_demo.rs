//! 추세 감지 엔진 데모
//!
//! 합성 상승 추세 캔들로 엔진을 한 번 실행하고 결과를 JSON으로 출력합니다.
//!
//! # 실행 방법
//!
//! ```bash
//! # 기본 설정
//! cargo run --example trend_demo
//!
//! # 설정 파일 + JSON 로그
//! LOG_FORMAT=json cargo run --example trend_demo -- config/trend.toml
//! ```

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use trend_core::{
    init_logging, Kline, LogConfig, LogFormat, Timeframe, TradeSide, TrendConfig, TrendError,
};
use trend_engine::TrendDetectionEngine;

const SYMBOL: &str = "BTC/USDT";

fn price(value: f64) -> Result<Decimal, TrendError> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(2))
        .ok_or_else(|| TrendError::InvalidInput(format!("가격 변환 실패: {}", value)))
}

/// 봉당 0.8% 상승하는 1시간봉 200개.
fn synthetic_klines() -> Result<Vec<Kline>, TrendError> {
    let start = Utc.timestamp_opt(1_700_000_000, 0).single().ok_or_else(|| {
        TrendError::InvalidInput("시작 시각 변환 실패".to_string())
    })?;

    let mut close = 30_000.0_f64;
    (0..200)
        .map(|i| {
            let open = close;
            close *= 1.008 + 0.001 * (i as f64 * 0.9).sin();
            Ok(Kline::new(
                SYMBOL,
                Timeframe::H1,
                start + Duration::hours(i),
                price(open)?,
                price(open.max(close) * 1.001)?,
                price(open.min(close) * 0.999)?,
                price(close)?,
                price(1_000.0 + 50.0 * (i % 7) as f64)?,
            ))
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => TrendConfig::load(path)?,
        None => TrendConfig::default(),
    };

    let format = std::env::var("LOG_FORMAT")
        .ok()
        .map(|s| s.parse::<LogFormat>())
        .transpose()?
        .unwrap_or_default();
    init_logging(LogConfig::from_trend_config(&config).with_format(format))?;

    let mut engine = TrendDetectionEngine::new(config, None)?;
    let klines = synthetic_klines()?;

    let result = engine.analyze_trend_change(&klines, SYMBOL);
    println!("{}", serde_json::to_string_pretty(&result)?);

    let (allowed, confidence) = engine.should_trade_trend(&klines, SYMBOL, TradeSide::Buy);
    println!("\n매수 허용: {} (신뢰도 {:.3})", allowed, confidence);
    println!("{}", serde_json::to_string_pretty(&engine.get_health_status())?);

    Ok(())
}
