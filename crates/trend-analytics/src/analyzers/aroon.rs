//! Aroon 오실레이터.
//!
//! 기간 P 동안 최고가/최저가 이후 경과한 봉 수로 추세의 신선도를 측정합니다.
//!
//! ```text
//! Aroon Up   = 100 × (P - 1 - 최고가 이후 경과 봉) / P
//! Aroon Down = 100 × (P - 1 - 최저가 이후 경과 봉) / P
//! Oscillator = Up - Down
//! ```
//!
//! 창 안에 같은 극값이 여러 번 있으면 가장 먼저 나온 위치를 사용합니다.

use serde::Serialize;
use tracing::debug;
use trend_core::{SignalDirection, SignalSource, TrendConfig, TrendSignal, Verbosity};

use crate::component::{AnalysisContext, ComponentReport, SignalComponent};
use crate::error::{AnalysisError, AnalysisResult};
use crate::indicators::value_back;
use crate::series::PriceSeries;

/// 모멘텀/약화 판정 구간.
const MOMENTUM_BARS: usize = 5;
/// 강한 크로스오버 기준.
const STRONG_CROSSOVER: f64 = 0.7;
/// 매우 강한 추세 기준.
const VERY_STRONG_LEVEL: f64 = 85.0;
/// 약화 판정 하락폭.
const WEAKENING_DROP: f64 = 10.0;

/// Aroon 파라미터.
#[derive(Debug, Clone, Serialize)]
pub struct AroonParams {
    pub period: usize,
    pub strong_threshold: f64,
    pub weak_threshold: f64,
}

impl Default for AroonParams {
    fn default() -> Self {
        Self::from(&TrendConfig::default())
    }
}

impl From<&TrendConfig> for AroonParams {
    fn from(config: &TrendConfig) -> Self {
        Self {
            period: config.aroon_period,
            strong_threshold: config.aroon_strong_threshold,
            weak_threshold: config.aroon_weak_threshold,
        }
    }
}

/// Aroon 시계열.
#[derive(Debug, Clone, Default)]
pub struct AroonSeries {
    pub up: Vec<Option<f64>>,
    pub down: Vec<Option<f64>>,
    pub oscillator: Vec<Option<f64>>,
}

/// Aroon 신호 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AroonSignalType {
    StrongBullishCrossover,
    BullishCrossover,
    StrongBearishCrossover,
    BearishCrossover,
    VeryStrongBullish,
    StrongBullish,
    VeryStrongBearish,
    StrongBearish,
    TightConsolidation,
    Consolidation,
    WeakeningBullish,
    WeakeningBearish,
    ModerateBullish,
    ModerateBearish,
    Neutral,
}

impl AroonSignalType {
    pub fn direction(&self) -> SignalDirection {
        use AroonSignalType::*;
        match self {
            StrongBullishCrossover | BullishCrossover | VeryStrongBullish | StrongBullish
            | WeakeningBullish | ModerateBullish => SignalDirection::Bullish,
            StrongBearishCrossover | BearishCrossover | VeryStrongBearish | StrongBearish
            | WeakeningBearish | ModerateBearish => SignalDirection::Bearish,
            TightConsolidation | Consolidation | Neutral => SignalDirection::Neutral,
        }
    }

    /// 신호 분류별 기본 신뢰도.
    pub fn confidence(&self) -> f64 {
        use AroonSignalType::*;
        match self {
            StrongBullishCrossover | StrongBearishCrossover => 0.8,
            BullishCrossover | BearishCrossover => 0.65,
            VeryStrongBullish | VeryStrongBearish => 0.85,
            StrongBullish | StrongBearish => 0.75,
            ModerateBullish | ModerateBearish => 0.55,
            WeakeningBullish | WeakeningBearish => 0.5,
            TightConsolidation | Consolidation | Neutral => 0.0,
        }
    }

    pub fn is_weakening(&self) -> bool {
        matches!(
            self,
            AroonSignalType::WeakeningBullish | AroonSignalType::WeakeningBearish
        )
    }

    pub fn as_str(&self) -> &'static str {
        use AroonSignalType::*;
        match self {
            StrongBullishCrossover => "strong_bullish_crossover",
            BullishCrossover => "bullish_crossover",
            StrongBearishCrossover => "strong_bearish_crossover",
            BearishCrossover => "bearish_crossover",
            VeryStrongBullish => "very_strong_bullish",
            StrongBullish => "strong_bullish",
            VeryStrongBearish => "very_strong_bearish",
            StrongBearish => "strong_bearish",
            TightConsolidation => "tight_consolidation",
            Consolidation => "consolidation",
            WeakeningBullish => "weakening_bullish",
            WeakeningBearish => "weakening_bearish",
            ModerateBullish => "moderate_bullish",
            ModerateBearish => "moderate_bearish",
            Neutral => "neutral",
        }
    }
}

/// Aroon 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AroonSignal {
    pub aroon_up: f64,
    pub aroon_down: f64,
    pub oscillator: f64,
    pub signal_type: AroonSignalType,
    pub trend_strength: f64,
    /// 크로스오버가 발생한 경우의 강도
    pub crossover_strength: Option<f64>,
}

impl AroonSignal {
    pub fn signals(&self, price: f64) -> Vec<TrendSignal> {
        let direction = self.signal_type.direction();
        if !direction.is_directional() {
            return Vec::new();
        }
        vec![TrendSignal::new(
            SignalSource::Aroon,
            direction,
            self.trend_strength,
            self.signal_type.confidence(),
            price,
        )
        .with_factor(self.signal_type.as_str())]
    }
}

/// 횡보 분석 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidationAnalysis {
    pub is_consolidating: bool,
    /// 두 지표가 모두 50 미만인 연속 봉 수
    pub duration_bars: usize,
    /// 횡보 구간 고저 범위 (%)
    pub range_pct: f64,
    pub breakout_probability: f64,
    pub likely_direction: SignalDirection,
}

/// Aroon 지표.
#[derive(Debug, Clone)]
pub struct AroonIndicator {
    params: AroonParams,
    verbosity: Verbosity,
}

impl AroonIndicator {
    pub fn new(params: AroonParams, verbosity: Verbosity) -> Self {
        Self { params, verbosity }
    }

    pub fn params(&self) -> &AroonParams {
        &self.params
    }

    /// 신호 분류에 필요한 최소 캔들 수.
    pub fn min_bars(&self) -> usize {
        self.params.period + MOMENTUM_BARS
    }

    /// Aroon Up/Down/Oscillator 시계열을 계산합니다.
    ///
    /// 캔들이 기간보다 적으면 모든 값이 `None`인 시계열을 반환합니다.
    pub fn calculate_aroon(&self, series: &PriceSeries) -> AroonSeries {
        let n = series.len();
        let period = self.params.period;
        let mut out = AroonSeries {
            up: vec![None; n],
            down: vec![None; n],
            oscillator: vec![None; n],
        };
        if period == 0 || n < period {
            return out;
        }

        let p = period as f64;
        for i in period - 1..n {
            let start = i + 1 - period;
            let (mut hi_idx, mut lo_idx) = (start, start);
            for j in start..=i {
                // 첫 번째 극값 유지 (엄격 비교)
                if series.high[j] > series.high[hi_idx] {
                    hi_idx = j;
                }
                if series.low[j] < series.low[lo_idx] {
                    lo_idx = j;
                }
            }

            let up = 100.0 * (p - 1.0 - (i - hi_idx) as f64) / p;
            let down = 100.0 * (p - 1.0 - (i - lo_idx) as f64) / p;
            out.up[i] = Some(up);
            out.down[i] = Some(down);
            out.oscillator[i] = Some(up - down);
        }

        out
    }

    /// 현재 Aroon 신호를 분류합니다.
    ///
    /// 우선순위: 크로스오버 → 강한 추세 → 횡보 → 약화 → 보통.
    pub fn get_aroon_signal(&self, series: &PriceSeries) -> AnalysisResult<AroonSignal> {
        AnalysisError::ensure_len(series.len(), self.min_bars())?;
        let aroon = self.calculate_aroon(series);

        let value = |col: &[Option<f64>], back: usize| {
            value_back(col, back).ok_or_else(|| {
                AnalysisError::Calculation(format!("Aroon 값 없음 (back {})", back))
            })
        };

        let up = value(&aroon.up, 0)?;
        let down = value(&aroon.down, 0)?;
        let prev_up = value(&aroon.up, 1)?;
        let prev_down = value(&aroon.down, 1)?;
        let osc = up - down;
        let osc_back = value(&aroon.oscillator, MOMENTUM_BARS)?;

        let strong = self.params.strong_threshold;
        let weak = self.params.weak_threshold;

        let bullish_cross = prev_up <= prev_down && up > down;
        let bearish_cross = prev_down <= prev_up && down > up;

        let mut crossover_strength = None;
        let signal_type = if bullish_cross || bearish_cross {
            let cs = Self::crossover_strength(up, down, osc - osc_back);
            crossover_strength = Some(cs);
            match (bullish_cross, cs > STRONG_CROSSOVER) {
                (true, true) => AroonSignalType::StrongBullishCrossover,
                (true, false) => AroonSignalType::BullishCrossover,
                (false, true) => AroonSignalType::StrongBearishCrossover,
                (false, false) => AroonSignalType::BearishCrossover,
            }
        } else if up > strong && down < weak {
            if up > VERY_STRONG_LEVEL {
                AroonSignalType::VeryStrongBullish
            } else {
                AroonSignalType::StrongBullish
            }
        } else if down > strong && up < weak {
            if down > VERY_STRONG_LEVEL {
                AroonSignalType::VeryStrongBearish
            } else {
                AroonSignalType::StrongBearish
            }
        } else if up < 50.0 && down < 50.0 {
            if up < weak && down < weak {
                AroonSignalType::TightConsolidation
            } else {
                AroonSignalType::Consolidation
            }
        } else if up > down && value(&aroon.up, MOMENTUM_BARS)? - up > WEAKENING_DROP {
            AroonSignalType::WeakeningBullish
        } else if down > up && value(&aroon.down, MOMENTUM_BARS)? - down > WEAKENING_DROP {
            AroonSignalType::WeakeningBearish
        } else if up > down {
            AroonSignalType::ModerateBullish
        } else if down > up {
            AroonSignalType::ModerateBearish
        } else {
            AroonSignalType::Neutral
        };

        let trend_strength = self.trend_strength(&aroon, up, down)?;

        if self.verbosity.is_debug() {
            debug!(
                aroon_up = up,
                aroon_down = down,
                signal = signal_type.as_str(),
                trend_strength,
                "Aroon 신호"
            );
        }

        Ok(AroonSignal {
            aroon_up: up,
            aroon_down: down,
            oscillator: osc,
            signal_type,
            trend_strength,
            crossover_strength,
        })
    }

    /// 크로스오버 강도 = 이격 0.4 + 레벨 0.3 + 5봉 모멘텀 0.3.
    fn crossover_strength(up: f64, down: f64, osc_change: f64) -> f64 {
        let separation = ((up - down).abs() / 50.0).min(1.0);
        let level = up.max(down) / 100.0;
        let momentum = (osc_change.abs() / 100.0).min(1.0);
        (0.4 * separation + 0.3 * level + 0.3 * momentum).clamp(0.0, 1.0)
    }

    /// 추세 강도 = 0.6 × (이격 × 레벨) + 0.2 × 일관성 + 0.1 × 모멘텀 + 극단 보너스.
    fn trend_strength(&self, aroon: &AroonSeries, up: f64, down: f64) -> AnalysisResult<f64> {
        let osc = up - down;
        let separation = osc.abs() / 100.0;
        let level = up.max(down) / 100.0;
        let base = separation * level;

        let sign = osc.signum();
        let consistency = if osc == 0.0 {
            0.0
        } else {
            (0..MOMENTUM_BARS)
                .filter_map(|back| value_back(&aroon.oscillator, back))
                .filter(|o| *o != 0.0 && o.signum() == sign)
                .count() as f64
                / MOMENTUM_BARS as f64
        };

        let osc_back = value_back(&aroon.oscillator, MOMENTUM_BARS).ok_or_else(|| {
            AnalysisError::Calculation("Aroon 모멘텀 계산 불가".to_string())
        })?;
        let change = osc - osc_back;
        let momentum = if osc != 0.0 && change.signum() == sign {
            (change.abs() / 50.0).min(1.0)
        } else {
            0.0
        };

        let bonus = if up.max(down) > 80.0 { 0.1 } else { 0.0 };

        Ok((0.6 * base + 0.2 * consistency + 0.1 * momentum + bonus).clamp(0.0, 1.0))
    }

    /// 횡보 구간과 돌파 가능성을 분석합니다.
    pub fn analyze_consolidation(
        &self,
        series: &PriceSeries,
    ) -> AnalysisResult<ConsolidationAnalysis> {
        AnalysisError::ensure_len(series.len(), self.params.period)?;
        let aroon = self.calculate_aroon(series);
        let n = series.len();

        let duration_bars = (0..n)
            .rev()
            .take_while(|&i| match (aroon.up[i], aroon.down[i]) {
                (Some(u), Some(d)) => u < 50.0 && d < 50.0,
                _ => false,
            })
            .count();

        let span = duration_bars.max(self.params.period).min(n);
        let start = n - span;
        let high = series.high[start..]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let low = series.low[start..].iter().copied().fold(f64::INFINITY, f64::min);
        let range_pct = if low > 0.0 { (high - low) / low * 100.0 } else { 0.0 };

        // 오래 지속되고 좁을수록 돌파 가능성이 높음
        let duration_score = (duration_bars as f64 / self.params.period as f64).min(1.0);
        let tightness = (1.0 - range_pct / 2.0).clamp(0.0, 1.0);
        let osc = value_back(&aroon.oscillator, 0).unwrap_or(0.0);
        let bias = (osc.abs() / 50.0).min(1.0);
        let breakout_probability = if duration_bars == 0 {
            0.0
        } else {
            (0.5 * duration_score + 0.3 * tightness + 0.2 * bias).clamp(0.0, 1.0)
        };

        // 오실레이터 부호, 같으면 범위 내 종가 위치로 방향 추정
        let last_close = series.last_close().unwrap_or(0.0);
        let mid = (high + low) / 2.0;
        let likely_direction = if osc > 0.0 {
            SignalDirection::Bullish
        } else if osc < 0.0 {
            SignalDirection::Bearish
        } else {
            SignalDirection::from_sign(last_close - mid)
        };

        Ok(ConsolidationAnalysis {
            is_consolidating: duration_bars > 0,
            duration_bars,
            range_pct,
            breakout_probability,
            likely_direction,
        })
    }
}

impl SignalComponent for AroonIndicator {
    fn source(&self) -> SignalSource {
        SignalSource::Aroon
    }

    fn analyze(&mut self, ctx: &AnalysisContext<'_>) -> AnalysisResult<ComponentReport> {
        self.get_aroon_signal(ctx.series).map(ComponentReport::Aroon)
    }
}

// =============================================================================
// 테스트
// =============================================================================
