//! 용량 제한 TTL/LRU 캐시.
//!
//! 엔진 인스턴스가 소유하는 명시적인 캐시 추상화입니다. 상위 타임프레임
//! 캔들 캐시와 분석 결과 캐시가 모두 이 타입을 사용합니다.
//!
//! # 축출 순서
//!
//! 1. 조회 시 TTL이 지난 항목은 즉시 제거됩니다 (miss로 집계).
//! 2. 용량이 가득 찬 상태에서 새 키를 삽입하면 먼저 만료 항목을 모두
//!    제거하고, 그래도 가득 차 있으면 가장 오래 사용되지 않은 항목 하나를
//!    제거합니다.
//!
//! 이 캐시는 동기화되지 않습니다(`&mut self`). 여러 스레드에서 공유하려면
//! 호출자가 `Mutex`로 감싸거나 심볼별로 분할해야 합니다.

use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::error::{DataError, Result};

/// 캐시 통계.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// 용량 초과로 제거된 항목 수
    pub evictions: u64,
    /// TTL 만료로 제거된 항목 수
    pub expirations: u64,
    /// 현재 항목 수
    pub len: usize,
    /// 최대 항목 수
    pub capacity: usize,
    pub hit_rate: f64,
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
    last_access: u64,
}

/// 용량 제한 TTL/LRU 캐시.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, Entry<V>>,
    capacity: usize,
    ttl: Duration,
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// 새 캐시를 생성합니다.
    ///
    /// # Errors
    ///
    /// 용량이 0이면 `DataError::CacheConfig`를 반환합니다.
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self> {
        if capacity == 0 {
            return Err(DataError::CacheConfig(
                "용량은 0보다 커야 합니다".to_string(),
            ));
        }

        Ok(Self {
            entries: HashMap::with_capacity(capacity),
            capacity,
            ttl,
            tick: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
        })
    }

    /// 값을 조회합니다. 만료된 항목은 제거되고 miss로 처리됩니다.
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// 주어진 시각 기준으로 값을 조회합니다.
    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => now.saturating_duration_since(entry.inserted_at) >= self.ttl,
            None => {
                self.misses += 1;
                return None;
            }
        };

        if expired {
            self.entries.remove(key);
            self.expirations += 1;
            self.misses += 1;
            return None;
        }

        self.tick += 1;
        let tick = self.tick;
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = tick;
                self.hits += 1;
                Some(entry.value.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// 값을 삽입합니다.
    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    /// 주어진 시각을 삽입 시각으로 값을 삽입합니다.
    pub fn insert_at(&mut self, key: K, value: V, now: Instant) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.purge_expired_at(now);
            if self.entries.len() >= self.capacity {
                self.evict_lru();
            }
        }

        self.tick += 1;
        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
                last_access: self.tick,
            },
        );
    }

    /// 키를 제거합니다.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// 만료된 항목을 모두 제거하고 제거한 수를 반환합니다.
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.inserted_at) < ttl);
        let removed = before - self.entries.len();
        self.expirations += removed as u64;
        removed
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.evictions += 1;
        }
    }

    /// 모든 항목을 제거합니다. 통계는 유지됩니다.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 현재 항목 수.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어있는지 확인.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 최대 항목 수.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 항목 TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 캐시 통계를 반환합니다.
    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        let hit_rate = if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        };

        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            expirations: self.expirations,
            len: self.entries.len(),
            capacity: self.capacity,
            hit_rate,
        }
    }

    /// 통계를 초기화합니다.
    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
        self.expirations = 0;
    }
}

// =============================================================================
// 테스트
// =============================================================================
