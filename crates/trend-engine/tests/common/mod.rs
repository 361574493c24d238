//! 통합 테스트용 캔들 생성기.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use trend_core::{Kline, Timeframe};

pub const SYMBOL: &str = "BTC/USDT";

pub fn dec(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap().round_dp(6)
}

fn open_time(i: usize) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + i as i64 * 3_600, 0).unwrap()
}

/// 종가 목록에서 1시간봉 캔들을 생성합니다.
///
/// 시가 = 직전 종가, 고가/저가 = 몸통 ± 종가의 `spread_pct`%.
pub fn klines_from_closes(closes: &[f64], spread_pct: f64, volume: f64) -> Vec<Kline> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let open = if i == 0 { c } else { closes[i - 1] };
            let spread = c * spread_pct / 100.0;
            Kline::new(
                SYMBOL,
                Timeframe::H1,
                open_time(i),
                dec(open),
                dec(c.max(open) + spread),
                dec(c.min(open) - spread),
                dec(c),
                dec(volume),
            )
        })
        .collect()
}

/// 시가 = 종가, 고가/저가 = 종가 ± `wick`.
pub fn doji_klines(closes: &[f64], wick: f64) -> Vec<Kline> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            Kline::new(
                SYMBOL,
                Timeframe::H1,
                open_time(i),
                dec(c),
                dec(c + wick),
                dec(c - wick),
                dec(c),
                dec(1000.0),
            )
        })
        .collect()
}

/// 봉당 `drift_pct`% 상승하는 종가.
pub fn trending_closes(count: usize, drift_pct: f64) -> Vec<f64> {
    (0..count)
        .map(|i| 100.0 * (1.0 + drift_pct / 100.0).powi(i as i32))
        .collect()
}

/// 봉당 1% 상승 + 약 0.02% 결정적 노이즈 (200봉).
pub fn uptrend_klines() -> Vec<Kline> {
    let closes: Vec<f64> = trending_closes(200, 1.0)
        .into_iter()
        .enumerate()
        .map(|(i, c)| c * (1.0 + 0.0002 * (i as f64 * 1.7).sin()))
        .collect();
    klines_from_closes(&closes, 0.03, 1000.0)
}

/// 진폭 0.05%, 주기 20봉의 사인파 뒤 마지막 13봉은 중심선에서 평탄 (150봉).
///
/// 평탄 구간이 Aroon 기간의 절반보다 길어서 최근 극값이 모두 13봉 이전에
/// 놓이고, Aroon 상승/하락이 함께 50 아래로 내려갑니다.
pub fn sideways_klines() -> Vec<Kline> {
    let closes: Vec<f64> = (0..150)
        .map(|i| {
            if i >= 137 {
                100.0
            } else {
                100.0 * (1.0 + 0.0005 * (2.0 * std::f64::consts::PI * i as f64 / 20.0).sin())
            }
        })
        .collect();
    doji_klines(&closes, 0.01)
}

/// 고정 시드 LCG 노이즈로 만든 횡보 구간 (150봉).
///
/// 종가는 100을 중심으로 ±0.04% 범위에서 독립적으로 흔들립니다. 추세도 평탄
/// 구간도 없으므로 Aroon 값은 노이즈의 극값 위치에 따라 정해집니다.
pub fn noisy_sideways_klines(seed: u32) -> Vec<Kline> {
    let mut state = seed;
    let closes: Vec<f64> = (0..150)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let unit = state as f64 / 4_294_967_296.0 * 2.0 - 1.0;
            100.0 * (1.0 + 0.0004 * unit)
        })
        .collect();
    doji_klines(&closes, 0.01)
}

/// 봉 40과 60에 고점이 있는 모양 (다이버전스 픽스처).
pub fn double_peak(peak1: f64, peak2: f64, base: f64) -> Vec<f64> {
    let mut values = vec![base; 30];
    for (from, to) in [(base, peak1), (peak1, base), (base, peak2), (peak2, base)] {
        for i in 1..=10 {
            values.push(from + (to - from) * i as f64 / 10.0);
        }
    }
    values.extend(vec![base; 10]);
    values
}
