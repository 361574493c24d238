//! 추세 변화 신호.
//!
//! 이 모듈은 분석 컴포넌트가 생성하는 신호 관련 타입을 정의합니다:
//! - `SignalSource` - 신호를 생성한 컴포넌트
//! - `SignalDirection` - 신호 방향 (상승/하락)
//! - `TradeSide` - 호출자가 확인하려는 매매 방향
//! - `TrendSignal` - 가중 결합의 단위가 되는 신호 한 건

use serde::{Deserialize, Serialize};
use std::fmt;

/// 신호를 생성한 분석 컴포넌트.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// 시장 구조 (스윙/지지저항 돌파)
    MarketStructure,
    /// Aroon 오실레이터
    Aroon,
    /// EMA 모멘텀
    EmaMomentum,
    /// 가격/지표 다이버전스
    Divergence,
    /// 다중 타임프레임 정렬
    MultiTimeframe,
    /// 추세선
    Trendline,
    /// 거래량
    Volume,
}

impl SignalSource {
    /// 엔진이 소유하는 분석 컴포넌트 목록 (실행 순서).
    pub const COMPONENTS: [SignalSource; 6] = [
        SignalSource::MarketStructure,
        SignalSource::Aroon,
        SignalSource::EmaMomentum,
        SignalSource::Divergence,
        SignalSource::MultiTimeframe,
        SignalSource::Trendline,
    ];

    /// snake_case 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::MarketStructure => "market_structure",
            SignalSource::Aroon => "aroon",
            SignalSource::EmaMomentum => "ema_momentum",
            SignalSource::Divergence => "divergence",
            SignalSource::MultiTimeframe => "multi_timeframe",
            SignalSource::Trendline => "trendline",
            SignalSource::Volume => "volume",
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 신호 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalDirection {
    /// 상승
    Bullish,
    /// 하락
    Bearish,
    /// 중립
    Neutral,
}

impl SignalDirection {
    /// 방향성이 있는 신호인지 확인.
    pub fn is_directional(&self) -> bool {
        !matches!(self, SignalDirection::Neutral)
    }

    /// 반대 방향.
    pub fn opposite(&self) -> Self {
        match self {
            SignalDirection::Bullish => SignalDirection::Bearish,
            SignalDirection::Bearish => SignalDirection::Bullish,
            SignalDirection::Neutral => SignalDirection::Neutral,
        }
    }

    /// 부호로부터 방향 결정 (0은 중립).
    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 {
            SignalDirection::Bullish
        } else if value < 0.0 {
            SignalDirection::Bearish
        } else {
            SignalDirection::Neutral
        }
    }
}

impl fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalDirection::Bullish => write!(f, "bullish"),
            SignalDirection::Bearish => write!(f, "bearish"),
            SignalDirection::Neutral => write!(f, "neutral"),
        }
    }
}

/// 호출자가 확인하려는 매매 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    /// 매수
    Buy,
    /// 매도
    Sell,
}

impl TradeSide {
    /// 이 매매 방향에 부합하는 신호 방향.
    pub fn expected_direction(&self) -> SignalDirection {
        match self {
            TradeSide::Buy => SignalDirection::Bullish,
            TradeSide::Sell => SignalDirection::Bearish,
        }
    }
}

impl std::str::FromStr for TradeSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            _ => Err(format!("Unknown trade side: {}", s)),
        }
    }
}

/// 가중 결합의 단위가 되는 추세 신호.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSignal {
    /// 신호 방향
    pub signal_type: SignalDirection,
    /// 신호 강도 (0.0 ~ 1.0)
    pub strength: f64,
    /// 신호 소스
    pub source: SignalSource,
    /// 신뢰도 (0.0 ~ 1.0)
    pub confidence: f64,
    /// 신호 기준 가격
    pub price_level: f64,
    /// 신호 근거 (예: "strong_bullish_crossover", "volume_confirmed")
    #[serde(default)]
    pub factors: Vec<String>,
}

impl TrendSignal {
    /// 새 신호를 생성합니다. 강도와 신뢰도는 [0, 1]로 제한됩니다.
    pub fn new(
        source: SignalSource,
        signal_type: SignalDirection,
        strength: f64,
        confidence: f64,
        price_level: f64,
    ) -> Self {
        Self {
            signal_type,
            strength: clamp_unit(strength),
            source,
            confidence: clamp_unit(confidence),
            price_level,
            factors: Vec::new(),
        }
    }

    /// 근거를 추가합니다.
    pub fn with_factor(mut self, factor: impl Into<String>) -> Self {
        self.factors.push(factor.into());
        self
    }

    /// 근거 목록을 설정합니다.
    pub fn with_factors<I, S>(mut self, factors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.factors.extend(factors.into_iter().map(Into::into));
        self
    }

    /// 신뢰도 × 강도.
    pub fn score(&self) -> f64 {
        self.confidence * self.strength
    }

    /// 매매 방향과 일치하는지 확인.
    pub fn matches(&self, side: TradeSide) -> bool {
        self.signal_type == side.expected_direction()
    }
}

/// NaN은 0으로, 나머지는 [0, 1]로 제한.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
