//! 컴포넌트 로그 상세도.
//!
//! 프로세스 전역 로그 레벨을 바꾸는 대신, 각 컴포넌트가 생성 시점에
//! `Verbosity` 값을 전달받아 상세 로그 출력 여부를 스스로 결정합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 컴포넌트 로그 상세도.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// 경고/에러만
    Quiet,
    /// 분석 요약
    #[default]
    Normal,
    /// 컴포넌트별 결과
    Verbose,
    /// 중간 계산값까지
    Debug,
}

impl Verbosity {
    /// 컴포넌트별 결과 로그를 출력해야 하는지.
    pub fn is_verbose(&self) -> bool {
        *self >= Verbosity::Verbose
    }

    /// 중간 계산값 로그를 출력해야 하는지.
    pub fn is_debug(&self) -> bool {
        *self == Verbosity::Debug
    }

    /// 대응하는 tracing 필터 레벨 문자열.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::Debug => "trace",
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::Debug => "debug",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quiet" => Ok(Self::Quiet),
            "normal" => Ok(Self::Normal),
            "verbose" => Ok(Self::Verbose),
            "debug" => Ok(Self::Debug),
            _ => Err(format!("Unknown verbosity: {}", s)),
        }
    }
}
