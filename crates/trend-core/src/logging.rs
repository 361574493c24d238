//! 엔진 로깅 구성.
//!
//! 구독자(subscriber) 설치는 애플리케이션이 시작할 때 한 번 합니다. 엔진
//! 컴포넌트는 전역 레벨을 바꾸지 않고 생성 시 받은 `Verbosity`로 진단 로그
//! 양을 조절하며, 여기서는 같은 `Verbosity`를 크레이트별 필터로 옮깁니다.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::{
    fmt::{self as fmt_layer, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::TrendConfig;
use crate::error::{TrendError, TrendResult};
use crate::types::Verbosity;

/// 엔진을 구성하는 크레이트 (필터 대상).
const ENGINE_TARGETS: [&str; 4] = ["trend_core", "trend_data", "trend_analytics", "trend_engine"];

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 사람이 읽기 쉬운 여러 줄 형식
    #[default]
    Pretty,
    /// 로그 수집기용 JSON
    Json,
    /// 한 줄 형식
    Compact,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Compact => write!(f, "compact"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = TrendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(TrendError::InvalidInput(format!(
                "알 수 없는 로그 형식: {}",
                other
            ))),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// `EnvFilter` 지시문 (예: "warn,trend_engine=debug")
    pub filter: String,
    pub format: LogFormat,
    /// 분석 span 진입/종료 이벤트 출력 여부
    pub with_span_events: bool,
    /// 파일명과 줄 번호 포함 여부
    pub with_file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from_verbosity(Verbosity::default())
    }
}

impl LogConfig {
    /// 엔진 크레이트만 `verbosity` 레벨로 두고 나머지는 `warn`으로 둡니다.
    pub fn from_verbosity(verbosity: Verbosity) -> Self {
        let level = verbosity.as_filter();
        let filter = std::iter::once("warn".to_string())
            .chain(ENGINE_TARGETS.iter().map(|t| format!("{}={}", t, level)))
            .collect::<Vec<_>>()
            .join(",");

        Self {
            filter,
            format: LogFormat::default(),
            // 디버그 수준에서는 컴포넌트별 분석 구간이 보이도록
            with_span_events: verbosity.is_debug(),
            with_file: verbosity.is_debug(),
        }
    }

    /// 엔진 설정의 `verbosity`를 따릅니다.
    pub fn from_trend_config(config: &TrendConfig) -> Self {
        Self::from_verbosity(config.verbosity)
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.with_span_events = enabled;
        self
    }

    /// `RUST_LOG`가 있으면 그것을, 없으면 `filter`를 사용합니다.
    fn env_filter(&self) -> TrendResult<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.filter).map_err(|e| {
                TrendError::Configuration(format!("로그 필터 오류 '{}': {}", self.filter, e))
            }),
        }
    }
}

/// 전역 tracing 구독자를 설치합니다.
///
/// 프로세스당 한 번만 성공합니다. 이미 구독자가 있으면
/// `TrendError::Internal`을 반환합니다.
///
/// ```no_run
/// use trend_core::{init_logging, LogConfig, LogFormat, TrendConfig};
///
/// let config = TrendConfig::default();
/// init_logging(LogConfig::from_trend_config(&config).with_format(LogFormat::Json)).unwrap();
/// ```
pub fn init_logging(config: LogConfig) -> TrendResult<()> {
    let env_filter = config.env_filter()?;
    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = match config.format {
        LogFormat::Pretty => fmt_layer::layer()
            .pretty()
            .with_file(config.with_file)
            .with_line_number(config.with_file)
            .with_span_events(span_events)
            .boxed(),
        LogFormat::Json => fmt_layer::layer()
            .json()
            .with_file(config.with_file)
            .with_line_number(config.with_file)
            .with_span_events(span_events)
            .boxed(),
        LogFormat::Compact => fmt_layer::layer()
            .compact()
            .with_file(config.with_file)
            .with_line_number(config.with_file)
            .with_span_events(span_events)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| TrendError::Internal(format!("로깅 초기화 실패: {}", e)))?;

    tracing::debug!(format = %config.format, filter = %config.filter, "로깅 초기화");
    Ok(())
}

/// 심볼(과 타임프레임) 필드를 가진 분석 span.
#[macro_export]
macro_rules! analysis_span {
    ($name:expr, $symbol:expr) => {
        tracing::info_span!($name, symbol = %$symbol)
    };
    ($name:expr, $symbol:expr, $timeframe:expr) => {
        tracing::info_span!($name, symbol = %$symbol, timeframe = %$timeframe)
    };
}

// =============================================================================
// 테스트
// =============================================================================
