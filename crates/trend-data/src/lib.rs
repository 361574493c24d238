//! 데이터 관리 및 캐싱.
//!
//! 이 crate는 다음을 제공합니다:
//! - 용량 제한과 TTL이 있는 LRU 캐시 (`TtlCache`)
//! - 리플레이와 테스트용 메모리 기반 시세 제공자 (`InMemoryProvider`)

pub mod cache;
pub mod error;
pub mod provider;

pub use cache::{CacheStats, TtlCache};
pub use error::{DataError, Result};
pub use provider::InMemoryProvider;
