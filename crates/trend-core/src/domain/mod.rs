//! 추세 감지를 위한 도메인 모델.

mod market_data;
mod provider;
mod signal;

pub use market_data::*;
pub use provider::*;
pub use signal::*;
