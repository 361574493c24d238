//! 워크스페이스 전반에서 사용되는 공통 타입.

mod timeframe;
mod verbosity;

pub use timeframe::*;
pub use verbosity::*;
