//! EMA 모멘텀 분석기.
//!
//! 단기/장기 EMA의 이격도(%)와 선형회귀 기울기(봉당 %)로 추세의 방향과
//! 모멘텀을 평가합니다. 각 EMA는 현재가 위치에 따라 동적 지지/저항으로도
//! 사용됩니다.

use serde::Serialize;
use tracing::debug;
use trend_core::{SignalDirection, SignalSource, TrendConfig, TrendSignal, Verbosity};

use crate::analyzers::LevelType;
use crate::component::{AnalysisContext, ComponentReport, SignalComponent};
use crate::error::{AnalysisError, AnalysisResult};
use crate::indicators::{last_value, slope_pct_per_bar, value_back, EmaParams, TrendIndicators};
use crate::series::PriceSeries;

/// 크로스오버 확인에 필요한 유지 봉 수.
const CONFIRMATION_BARS: usize = 3;
/// 최근 크로스오버 탐색 구간.
const CROSSOVER_LOOKBACK: usize = 10;
/// 일관성 판정 구간.
const CONSISTENCY_BARS: usize = 5;
/// EMA 접촉 허용 오차 (0.1%).
const TOUCH_TOLERANCE: f64 = 0.001;
/// EMA 지지/저항 탐색 구간.
const TOUCH_LOOKBACK: usize = 50;

/// EMA 모멘텀 파라미터.
#[derive(Debug, Clone, Serialize)]
pub struct EmaMomentumParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub slope_lookback: usize,
}

impl Default for EmaMomentumParams {
    fn default() -> Self {
        Self::from(&TrendConfig::default())
    }
}

impl From<&TrendConfig> for EmaMomentumParams {
    fn from(config: &TrendConfig) -> Self {
        Self {
            fast_period: config.ema_fast_period,
            slow_period: config.ema_slow_period,
            slope_lookback: config.ema_slope_lookback,
        }
    }
}

/// EMA 시계열.
#[derive(Debug, Clone, Default)]
pub struct EmaSeries {
    pub fast: Vec<Option<f64>>,
    pub slow: Vec<Option<f64>>,
    /// 단기 EMA 기울기 (봉당 %)
    pub fast_slope: Vec<Option<f64>>,
    /// 장기 EMA 기울기 (봉당 %)
    pub slow_slope: Vec<Option<f64>>,
}

impl EmaSeries {
    /// 인덱스의 이격도 (%).
    pub fn separation_at(&self, index: usize) -> Option<f64> {
        match (self.fast.get(index).copied().flatten(), self.slow.get(index).copied().flatten()) {
            (Some(f), Some(s)) if s != 0.0 => Some((f - s) / s * 100.0),
            _ => None,
        }
    }
}

/// EMA 신호 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmaSignalType {
    StrongBullishCrossover,
    BullishCrossover,
    StrongBearishCrossover,
    BearishCrossover,
    StrongBullish,
    ModerateBullish,
    WeakeningBullish,
    StrongBearish,
    ModerateBearish,
    WeakeningBearish,
    Consolidation,
    WeakBullish,
    WeakBearish,
}

impl EmaSignalType {
    pub fn direction(&self) -> SignalDirection {
        use EmaSignalType::*;
        match self {
            StrongBullishCrossover | BullishCrossover | StrongBullish | ModerateBullish
            | WeakeningBullish | WeakBullish => SignalDirection::Bullish,
            StrongBearishCrossover | BearishCrossover | StrongBearish | ModerateBearish
            | WeakeningBearish | WeakBearish => SignalDirection::Bearish,
            Consolidation => SignalDirection::Neutral,
        }
    }

    pub fn is_crossover(&self) -> bool {
        use EmaSignalType::*;
        matches!(
            self,
            StrongBullishCrossover | BullishCrossover | StrongBearishCrossover | BearishCrossover
        )
    }

    pub fn is_weakening(&self) -> bool {
        matches!(
            self,
            EmaSignalType::WeakeningBullish | EmaSignalType::WeakeningBearish
        )
    }

    pub fn as_str(&self) -> &'static str {
        use EmaSignalType::*;
        match self {
            StrongBullishCrossover => "strong_bullish_crossover",
            BullishCrossover => "bullish_crossover",
            StrongBearishCrossover => "strong_bearish_crossover",
            BearishCrossover => "bearish_crossover",
            StrongBullish => "strong_bullish",
            ModerateBullish => "moderate_bullish",
            WeakeningBullish => "weakening_bullish",
            StrongBearish => "strong_bearish",
            ModerateBearish => "moderate_bearish",
            WeakeningBearish => "weakening_bearish",
            Consolidation => "consolidation",
            WeakBullish => "weak_bullish",
            WeakBearish => "weak_bearish",
        }
    }
}

/// EMA 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmaSignal {
    pub fast_ema: f64,
    pub slow_ema: f64,
    /// (단기 - 장기) / 장기 × 100
    pub separation_pct: f64,
    pub fast_slope: f64,
    pub slow_slope: f64,
    pub momentum_strength: f64,
    pub signal_type: EmaSignalType,
    pub crossover_confirmed: bool,
}

impl EmaSignal {
    fn confidence(&self) -> f64 {
        use EmaSignalType::*;
        match self.signal_type {
            StrongBullishCrossover | StrongBearishCrossover | BullishCrossover
            | BearishCrossover
                if self.crossover_confirmed =>
            {
                0.8
            }
            StrongBullishCrossover | StrongBearishCrossover => 0.7,
            BullishCrossover | BearishCrossover => 0.6,
            StrongBullish | StrongBearish => 0.8,
            ModerateBullish | ModerateBearish => 0.65,
            WeakeningBullish | WeakeningBearish => 0.5,
            WeakBullish | WeakBearish => 0.45,
            Consolidation => 0.0,
        }
    }

    pub fn signals(&self, price: f64) -> Vec<TrendSignal> {
        let direction = self.signal_type.direction();
        if !direction.is_directional() {
            return Vec::new();
        }
        let mut signal = TrendSignal::new(
            SignalSource::EmaMomentum,
            direction,
            self.momentum_strength,
            self.confidence(),
            price,
        )
        .with_factor(self.signal_type.as_str());
        if self.crossover_confirmed {
            signal = signal.with_factor("crossover_confirmed");
        }
        vec![signal]
    }
}

/// EMA 동적 지지/저항.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmaLevel {
    pub period: usize,
    pub value: f64,
    pub level_type: LevelType,
    pub touches: usize,
    pub strength: f64,
}

/// EMA 모멘텀 분석기.
#[derive(Debug, Clone)]
pub struct EmaMomentumAnalyzer {
    params: EmaMomentumParams,
    verbosity: Verbosity,
    indicators: TrendIndicators,
}

impl EmaMomentumAnalyzer {
    /// 새 분석기를 생성합니다.
    ///
    /// # Errors
    ///
    /// 단기 기간이 장기 기간 이상이면 `AnalysisError::InvalidParameter`.
    pub fn new(params: EmaMomentumParams, verbosity: Verbosity) -> AnalysisResult<Self> {
        if params.fast_period >= params.slow_period {
            return Err(AnalysisError::InvalidParameter(format!(
                "단기 EMA 기간({})은 장기 EMA 기간({})보다 작아야 합니다",
                params.fast_period, params.slow_period
            )));
        }
        if params.fast_period == 0 {
            return Err(AnalysisError::InvalidParameter(
                "EMA 기간은 0보다 커야 합니다".to_string(),
            ));
        }

        Ok(Self {
            params,
            verbosity,
            indicators: TrendIndicators::new(),
        })
    }

    pub fn params(&self) -> &EmaMomentumParams {
        &self.params
    }

    /// 신호 분류에 필요한 최소 캔들 수.
    pub fn min_bars(&self) -> usize {
        self.params.slow_period + self.params.slope_lookback.max(CONSISTENCY_BARS)
    }

    /// 단기/장기 EMA와 기울기 시계열을 계산합니다.
    ///
    /// 시계열에 EMA 주석이 있으면 그대로 사용합니다.
    pub fn calculate_emas(&self, series: &PriceSeries) -> AnalysisResult<EmaSeries> {
        let annotations = series.annotations();
        let (fast, slow) = match (&annotations.ema_fast, &annotations.ema_slow) {
            (Some(fast), Some(slow)) => (fast.clone(), slow.clone()),
            _ => (
                self.indicators.ema(
                    &series.close,
                    EmaParams {
                        period: self.params.fast_period,
                    },
                )?,
                self.indicators.ema(
                    &series.close,
                    EmaParams {
                        period: self.params.slow_period,
                    },
                )?,
            ),
        };

        let fast_slope = slope_pct_per_bar(&fast, self.params.slope_lookback);
        let slow_slope = slope_pct_per_bar(&slow, self.params.slope_lookback);

        Ok(EmaSeries {
            fast,
            slow,
            fast_slope,
            slow_slope,
        })
    }

    /// 현재 EMA 신호를 분류합니다.
    ///
    /// 우선순위: 크로스오버(최근 3봉 이내) → 추세(이격 1% 초과) → 횡보(이격 0.2% 미만) → 약한 추세.
    pub fn get_ema_signal(&self, series: &PriceSeries) -> AnalysisResult<EmaSignal> {
        let n = series.len();
        AnalysisError::ensure_len(n, self.min_bars())?;
        let emas = self.calculate_emas(series)?;

        let missing = || AnalysisError::Calculation("EMA 값 없음".to_string());
        let fast_ema = last_value(&emas.fast).ok_or_else(missing)?;
        let slow_ema = last_value(&emas.slow).ok_or_else(missing)?;
        let separation = emas.separation_at(n - 1).ok_or_else(missing)?;
        let fast_slope = last_value(&emas.fast_slope).ok_or_else(missing)?;
        let slow_slope = last_value(&emas.slow_slope).ok_or_else(missing)?;

        let sign = separation.signum();
        let agreeing = [fast_slope, slow_slope]
            .iter()
            .filter(|s| **s != 0.0 && s.signum() == sign)
            .count();
        let bullish = separation > 0.0;

        // 최근 3봉 이내 교차는 크로스오버로 분류 (3봉째에 확인 여부 판정)
        let cross_index = Self::last_cross_index(&emas, n);
        let crossed = cross_index.is_some_and(|i| n - i <= CONFIRMATION_BARS);

        let signal_type = if crossed {
            let strong = separation.abs() > 0.5 && fast_slope != 0.0 && fast_slope.signum() == sign;
            match (bullish, strong) {
                (true, true) => EmaSignalType::StrongBullishCrossover,
                (true, false) => EmaSignalType::BullishCrossover,
                (false, true) => EmaSignalType::StrongBearishCrossover,
                (false, false) => EmaSignalType::BearishCrossover,
            }
        } else if separation.abs() > 1.0 {
            match (bullish, agreeing) {
                (true, 2) => EmaSignalType::StrongBullish,
                (true, 1) => EmaSignalType::ModerateBullish,
                (true, _) => EmaSignalType::WeakeningBullish,
                (false, 2) => EmaSignalType::StrongBearish,
                (false, 1) => EmaSignalType::ModerateBearish,
                (false, _) => EmaSignalType::WeakeningBearish,
            }
        } else if separation.abs() < 0.2 {
            EmaSignalType::Consolidation
        } else if bullish {
            EmaSignalType::WeakBullish
        } else {
            EmaSignalType::WeakBearish
        };

        let momentum_strength =
            self.momentum_strength(&emas, n, separation, fast_slope, slow_slope, agreeing);
        let crossover_confirmed = Self::crossover_confirmed(&emas, n);

        if self.verbosity.is_debug() {
            debug!(
                separation_pct = separation,
                fast_slope,
                slow_slope,
                signal = signal_type.as_str(),
                momentum_strength,
                "EMA 신호"
            );
        }

        Ok(EmaSignal {
            fast_ema,
            slow_ema,
            separation_pct: separation,
            fast_slope,
            slow_slope,
            momentum_strength,
            signal_type,
            crossover_confirmed,
        })
    }

    /// 모멘텀 강도 = 0.4 × 이격 + 0.2 × 기울기 방향 일치 + 0.2 × 평균 기울기 + 0.2 × 5봉 일관성.
    fn momentum_strength(
        &self,
        emas: &EmaSeries,
        n: usize,
        separation: f64,
        fast_slope: f64,
        slow_slope: f64,
        agreeing: usize,
    ) -> f64 {
        let separation_score = (separation.abs() / 2.0).min(1.0);
        let agreement = agreeing as f64 / 2.0;
        let slope_score = ((fast_slope.abs() + slow_slope.abs()) / 2.0 / 1.0).min(1.0);

        let sign = separation.signum();
        let consistency = if separation == 0.0 {
            0.0
        } else {
            (0..CONSISTENCY_BARS)
                .filter_map(|back| n.checked_sub(back + 1))
                .filter_map(|i| emas.separation_at(i))
                .filter(|s| *s != 0.0 && s.signum() == sign)
                .count() as f64
                / CONSISTENCY_BARS as f64
        };

        let strength =
            0.4 * separation_score + 0.2 * agreement + 0.2 * slope_score + 0.2 * consistency;
        strength.clamp(0.0, 1.0)
    }

    /// 최근 `CROSSOVER_LOOKBACK`봉 안에서 가장 마지막 교차가 일어난 인덱스.
    fn last_cross_index(emas: &EmaSeries, n: usize) -> Option<usize> {
        let start = n.saturating_sub(CROSSOVER_LOOKBACK).max(1);
        (start..n).rev().find(|&i| {
            match (emas.separation_at(i - 1), emas.separation_at(i)) {
                (Some(prev), Some(curr)) => {
                    curr != 0.0 && (prev == 0.0 || prev.signum() != curr.signum())
                }
                _ => false,
            }
        })
    }

    /// 최근 크로스오버 이후 단기 EMA가 마지막 3봉 동안 교차 후 방향을
    /// 유지했는지 확인합니다.
    fn crossover_confirmed(emas: &EmaSeries, n: usize) -> bool {
        let Some(cross_index) = Self::last_cross_index(emas, n) else {
            return false;
        };
        if n - cross_index < CONFIRMATION_BARS {
            return false;
        }

        let Some(post_sign) = emas.separation_at(cross_index).map(f64::signum) else {
            return false;
        };
        (n - CONFIRMATION_BARS..n).all(|i| {
            emas.separation_at(i)
                .is_some_and(|s| s != 0.0 && s.signum() == post_sign)
        })
    }

    /// 각 EMA를 현재가 위치에 따라 지지 또는 저항으로 평가합니다.
    ///
    /// 최근 50봉에서 고가/저가가 EMA의 0.1% 이내에 닿은 횟수로 강도를 매깁니다.
    pub fn identify_ema_support_resistance(
        &self,
        series: &PriceSeries,
    ) -> AnalysisResult<Vec<EmaLevel>> {
        let n = series.len();
        AnalysisError::ensure_len(n, self.params.slow_period)?;
        let emas = self.calculate_emas(series)?;
        let close = series.close[n - 1];

        let mut levels = Vec::with_capacity(2);
        for (period, column) in [
            (self.params.fast_period, &emas.fast),
            (self.params.slow_period, &emas.slow),
        ] {
            let Some(value) = value_back(column, 0) else {
                continue;
            };

            let start = n.saturating_sub(TOUCH_LOOKBACK);
            let touches = (start..n)
                .filter(|&i| match column[i] {
                    Some(ema) => {
                        series.low[i] <= ema * (1.0 + TOUCH_TOLERANCE)
                            && series.high[i] >= ema * (1.0 - TOUCH_TOLERANCE)
                    }
                    None => false,
                })
                .count();

            levels.push(EmaLevel {
                period,
                value,
                level_type: if close >= value {
                    LevelType::Support
                } else {
                    LevelType::Resistance
                },
                touches,
                strength: (touches as f64 / 5.0).min(1.0),
            });
        }

        Ok(levels)
    }
}

impl SignalComponent for EmaMomentumAnalyzer {
    fn source(&self) -> SignalSource {
        SignalSource::EmaMomentum
    }

    fn analyze(&mut self, ctx: &AnalysisContext<'_>) -> AnalysisResult<ComponentReport> {
        self.get_ema_signal(ctx.series)
            .map(ComponentReport::EmaMomentum)
    }
}

// =============================================================================
// 테스트
// =============================================================================
