//! 메모리 기반 시세 제공자.
//!
//! 미리 적재한 캔들을 반환하는 `MarketDataProvider` 구현체입니다.
//! 백테스트 리플레이와 통합 테스트에서 외부 거래소 대신 사용합니다.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tracing::debug;
use trend_core::{Kline, MarketDataProvider, ProviderError, Timeframe};

type SeriesKey = (String, Timeframe);

/// 메모리 기반 시세 제공자.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    series: RwLock<HashMap<SeriesKey, Vec<Kline>>>,
    /// 조회 시 네트워크 에러를 반환할 심볼
    failing: RwLock<HashSet<String>>,
    fetch_count: AtomicU64,
}

impl InMemoryProvider {
    /// 빈 제공자를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 심볼/타임프레임의 캔들을 적재합니다. 기존 데이터는 교체됩니다.
    pub fn insert(&self, symbol: impl Into<String>, timeframe: Timeframe, klines: Vec<Kline>) {
        let mut series = self
            .series
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        series.insert((symbol.into(), timeframe), klines);
    }

    /// 빌더 형태의 적재.
    pub fn with_series(
        self,
        symbol: impl Into<String>,
        timeframe: Timeframe,
        klines: Vec<Kline>,
    ) -> Self {
        self.insert(symbol, timeframe, klines);
        self
    }

    /// 심볼 조회를 실패하도록 설정하거나 해제합니다.
    pub fn set_failing(&self, symbol: impl Into<String>, failing: bool) {
        let mut set = self
            .failing
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let symbol = symbol.into();
        if failing {
            set.insert(symbol);
        } else {
            set.remove(&symbol);
        }
    }

    /// 지금까지의 `fetch` 호출 횟수.
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::Relaxed)
    }
}

impl MarketDataProvider for InMemoryProvider {
    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bar_count: usize,
    ) -> Result<Vec<Kline>, ProviderError> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        let failing = self
            .failing
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if failing.contains(symbol) {
            return Err(ProviderError::Network(format!(
                "{} 조회 실패 (simulated)",
                symbol
            )));
        }
        drop(failing);

        let series = self
            .series
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let klines = series
            .get(&(symbol.to_string(), timeframe))
            .ok_or_else(|| ProviderError::NotFound(format!("{} {}", symbol, timeframe)))?;

        let start = klines.len().saturating_sub(bar_count);
        debug!(
            symbol = symbol,
            timeframe = %timeframe,
            requested = bar_count,
            returned = klines.len() - start,
            "메모리 캔들 조회"
        );

        Ok(klines[start..].to_vec())
    }

    fn provider_name(&self) -> &str {
        "in_memory"
    }
}
