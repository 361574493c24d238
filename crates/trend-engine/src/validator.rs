//! 설정 검증 및 보정.
//!
//! 범위를 벗어난 스칼라 값은 가장 가까운 경계로 보정하고, 구조적 관계
//! 위반(EMA/MACD 단기 기간 >= 장기 기간)만 오류로 보고합니다. 검증은
//! 입력을 바꾸지 않는 순수 함수이며, 같은 입력에 대해 항상 같은 결과를
//! 반환합니다.

use std::fmt::Display;

use serde::Serialize;
use trend_core::{TrendConfig, TrendError, TrendResult};

/// 구조적 설정 오류.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigIssue {
    pub field: String,
    pub message: String,
}

/// 적용된 보정.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigCorrection {
    pub field: String,
    pub original: String,
    pub corrected: String,
}

/// 검증 결과.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ConfigIssue>,
    pub corrections: Vec<ConfigCorrection>,
    /// 보정이 적용된 설정
    pub corrected: TrendConfig,
}

impl ValidationReport {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// 유효하면 보정된 설정을, 아니면 `TrendError::Configuration`을 반환합니다.
    pub fn into_result(self) -> TrendResult<TrendConfig> {
        if self.is_valid {
            Ok(self.corrected)
        } else {
            let messages: Vec<String> = self
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            Err(TrendError::Configuration(messages.join("; ")))
        }
    }
}

/// 보정 기록기.
#[derive(Default)]
struct Corrector {
    corrections: Vec<ConfigCorrection>,
}

impl Corrector {
    fn record(&mut self, field: &str, original: impl Display, corrected: impl Display) {
        self.corrections.push(ConfigCorrection {
            field: field.to_string(),
            original: original.to_string(),
            corrected: corrected.to_string(),
        });
    }

    fn clamp<T>(&mut self, field: &str, value: &mut T, min: T, max: T)
    where
        T: PartialOrd + Copy + Display,
    {
        let original = *value;
        if original < min {
            *value = min;
        } else if original > max {
            *value = max;
        } else {
            return;
        }
        self.record(field, original, *value);
    }

    /// NaN은 하한으로 보정합니다.
    fn clamp_f64(&mut self, field: &str, value: &mut f64, min: f64, max: f64) {
        if value.is_nan() {
            let original = *value;
            *value = min;
            self.record(field, original, min);
            return;
        }
        self.clamp(field, value, min, max);
    }

    /// `low < high`가 아니면 두 값을 기본값으로 되돌립니다.
    fn ensure_order(
        &mut self,
        (low_field, low): (&str, &mut f64),
        (high_field, high): (&str, &mut f64),
        (low_default, high_default): (f64, f64),
    ) {
        if *low < *high {
            return;
        }
        self.record(low_field, *low, low_default);
        self.record(high_field, *high, high_default);
        *low = low_default;
        *high = high_default;
    }
}

/// 설정 검증기.
pub struct ConfigurationValidator;

impl ConfigurationValidator {
    /// 설정을 검증하고 보정본을 만듭니다.
    pub fn validate_config(config: &TrendConfig) -> ValidationReport {
        let mut c = config.clone();
        let mut fix = Corrector::default();
        let defaults = TrendConfig::default();

        // 엔진
        fix.clamp("trend_detection_sensitivity", &mut c.trend_detection_sensitivity, 1, 10);
        fix.clamp_f64("min_trend_confidence", &mut c.min_trend_confidence, 0.0, 1.0);
        fix.clamp("min_bars_required", &mut c.min_bars_required, 20, 500);
        fix.clamp("trend_cache_size", &mut c.trend_cache_size, 1, 10_000);
        fix.clamp("trend_cache_ttl_secs", &mut c.trend_cache_ttl_secs, 1, 86_400);
        fix.clamp("circuit_breaker_threshold", &mut c.circuit_breaker_threshold, 1, 100);

        // 시장 구조
        fix.clamp("swing_strength", &mut c.swing_strength, 2, 20);
        fix.clamp_f64("sr_tolerance_pct", &mut c.sr_tolerance_pct, 0.05, 5.0);
        fix.clamp_f64("sr_break_threshold_pct", &mut c.sr_break_threshold_pct, 0.05, 2.0);
        fix.clamp("max_sr_levels", &mut c.max_sr_levels, 1, 50);
        fix.clamp_f64(
            "volume_confirmation_threshold",
            &mut c.volume_confirmation_threshold,
            1.0,
            5.0,
        );

        // Aroon
        fix.clamp("aroon_period", &mut c.aroon_period, 5, 100);
        fix.clamp_f64("aroon_strong_threshold", &mut c.aroon_strong_threshold, 50.0, 100.0);
        fix.clamp_f64("aroon_weak_threshold", &mut c.aroon_weak_threshold, 0.0, 50.0);
        fix.ensure_order(
            ("aroon_weak_threshold", &mut c.aroon_weak_threshold),
            ("aroon_strong_threshold", &mut c.aroon_strong_threshold),
            (defaults.aroon_weak_threshold, defaults.aroon_strong_threshold),
        );

        // EMA
        fix.clamp("ema_fast_period", &mut c.ema_fast_period, 5, 200);
        fix.clamp("ema_slow_period", &mut c.ema_slow_period, 10, 500);
        fix.clamp("ema_slope_lookback", &mut c.ema_slope_lookback, 2, 50);

        // 다이버전스
        fix.clamp("rsi_period", &mut c.rsi_period, 2, 50);
        fix.clamp_f64("rsi_overbought", &mut c.rsi_overbought, 50.0, 95.0);
        fix.clamp_f64("rsi_oversold", &mut c.rsi_oversold, 5.0, 50.0);
        fix.ensure_order(
            ("rsi_oversold", &mut c.rsi_oversold),
            ("rsi_overbought", &mut c.rsi_overbought),
            (defaults.rsi_oversold, defaults.rsi_overbought),
        );
        fix.clamp("macd_fast_period", &mut c.macd_fast_period, 2, 50);
        fix.clamp("macd_slow_period", &mut c.macd_slow_period, 5, 100);
        fix.clamp("macd_signal_period", &mut c.macd_signal_period, 2, 50);
        fix.clamp("divergence_swing_strength", &mut c.divergence_swing_strength, 2, 20);
        fix.clamp("min_swing_separation", &mut c.min_swing_separation, 2, 100);
        fix.clamp_f64("divergence_threshold", &mut c.divergence_threshold, 0.01, 10.0);

        // 다중 타임프레임
        fix.clamp_f64("mtf_alignment_threshold", &mut c.mtf_alignment_threshold, 0.0, 1.0);
        fix.clamp_f64("mtf_weight", &mut c.mtf_weight, 0.1, 0.5);
        fix.clamp("mtf_cache_ttl_secs", &mut c.mtf_cache_ttl_secs, 60, 3_600);
        fix.clamp("mtf_bar_count", &mut c.mtf_bar_count, 50, 1_000);
        let invalid_mappings: Vec<_> = c
            .mtf_primary_to_higher
            .iter()
            .filter(|(primary, higher)| !higher.is_longer_than(**primary))
            .map(|(primary, higher)| (*primary, *higher))
            .collect();
        for (primary, higher) in invalid_mappings {
            c.mtf_primary_to_higher.remove(&primary);
            fix.record(
                &format!("mtf_primary_to_higher.{}", primary),
                higher,
                "removed",
            );
        }

        // 추세선
        fix.clamp("min_trendline_touches", &mut c.min_trendline_touches, 2, 10);
        fix.clamp_f64("trendline_angle_min", &mut c.trendline_angle_min, 5.0, 85.0);
        fix.clamp_f64("trendline_angle_max", &mut c.trendline_angle_max, 5.0, 85.0);
        fix.ensure_order(
            ("trendline_angle_min", &mut c.trendline_angle_min),
            ("trendline_angle_max", &mut c.trendline_angle_max),
            (defaults.trendline_angle_min, defaults.trendline_angle_max),
        );
        fix.clamp("max_trendlines", &mut c.max_trendlines, 1, 20);
        fix.clamp_f64(
            "trendline_touch_tolerance_pct",
            &mut c.trendline_touch_tolerance_pct,
            0.05,
            5.0,
        );
        fix.clamp_f64("retest_tolerance_pct", &mut c.retest_tolerance_pct, 0.05, 5.0);
        fix.clamp("trendline_lookback", &mut c.trendline_lookback, 20, 1_000);

        // 가중치
        let w = &mut c.source_weights;
        fix.clamp_f64("source_weights.market_structure", &mut w.market_structure, 0.0, 1.0);
        fix.clamp_f64("source_weights.aroon", &mut w.aroon, 0.0, 1.0);
        fix.clamp_f64("source_weights.divergence", &mut w.divergence, 0.0, 1.0);
        fix.clamp_f64("source_weights.volume", &mut w.volume, 0.0, 1.0);
        fix.clamp_f64("source_weights.default_weight", &mut w.default_weight, 0.0, 1.0);

        // 구조적 관계 (보정하지 않음)
        let mut errors = Vec::new();
        if c.ema_fast_period >= c.ema_slow_period {
            errors.push(ConfigIssue {
                field: "ema_fast_period".to_string(),
                message: format!(
                    "단기 기간({})은 장기 기간({})보다 작아야 합니다",
                    c.ema_fast_period, c.ema_slow_period
                ),
            });
        }
        if c.macd_fast_period >= c.macd_slow_period {
            errors.push(ConfigIssue {
                field: "macd_fast_period".to_string(),
                message: format!(
                    "MACD 단기 기간({})은 장기 기간({})보다 작아야 합니다",
                    c.macd_fast_period, c.macd_slow_period
                ),
            });
        }

        ValidationReport {
            is_valid: errors.is_empty(),
            errors,
            corrections: fix.corrections,
            corrected: c,
        }
    }
}

// =============================================================================
// 테스트
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use trend_core::Timeframe;

    #[test]
    fn test_default_config_is_valid() {
        let report = ConfigurationValidator::validate_config(&TrendConfig::default());

        assert!(report.is_valid);
        assert_eq!(report.error_count(), 0);
        assert!(report.corrections.is_empty());
    }

    #[test]
    fn test_scalars_are_clamped() {
        let config = TrendConfig {
            trend_detection_sensitivity: 42,
            min_trend_confidence: 1.7,
            mtf_weight: 0.9,
            aroon_period: 2,
            divergence_threshold: f64::NAN,
            ..Default::default()
        };

        let report = ConfigurationValidator::validate_config(&config);
        assert!(report.is_valid);
        assert_eq!(report.corrected.trend_detection_sensitivity, 10);
        assert_eq!(report.corrected.min_trend_confidence, 1.0);
        assert_eq!(report.corrected.mtf_weight, 0.5);
        assert_eq!(report.corrected.aroon_period, 5);
        assert_eq!(report.corrected.divergence_threshold, 0.01);
        assert_eq!(report.corrections.len(), 5);
    }

    #[test]
    fn test_structural_violation_is_error() {
        let config = TrendConfig {
            ema_fast_period: 60,
            ema_slow_period: 50,
            ..Default::default()
        };

        let report = ConfigurationValidator::validate_config(&config);
        assert!(!report.is_valid);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.errors[0].field, "ema_fast_period");

        let err = report.into_result().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_inverted_angles_reset_to_defaults() {
        let config = TrendConfig {
            trendline_angle_min: 70.0,
            trendline_angle_max: 20.0,
            ..Default::default()
        };

        let report = ConfigurationValidator::validate_config(&config);
        assert!(report.is_valid);
        assert_eq!(report.corrected.trendline_angle_min, 10.0);
        assert_eq!(report.corrected.trendline_angle_max, 80.0);
    }

    #[test]
    fn test_invalid_mtf_mapping_dropped() {
        let mut config = TrendConfig::default();
        config.mtf_primary_to_higher.insert(Timeframe::D1, Timeframe::H1);

        let report = ConfigurationValidator::validate_config(&config);
        assert!(report.is_valid);
        assert!(!report.corrected.mtf_primary_to_higher.contains_key(&Timeframe::D1));
        assert_eq!(
            report.corrected.higher_timeframe_for(Timeframe::H1),
            Some(Timeframe::H4)
        );
    }

    fn arbitrary_config() -> impl Strategy<Value = TrendConfig> {
        (
            (0u32..30, -1.0f64..2.0, 0usize..600, 0usize..300, 0usize..600),
            (0.0f64..100.0, 0.0f64..100.0, 0usize..80, 0usize..150, 0.0f64..1.0),
            (0.0f64..120.0, 0.0f64..120.0, 0.0f64..20.0),
        )
            .prop_map(|(a, b, c)| TrendConfig {
                trend_detection_sensitivity: a.0,
                min_trend_confidence: a.1,
                min_bars_required: a.2,
                ema_fast_period: a.3,
                ema_slow_period: a.4,
                trendline_angle_min: b.0,
                trendline_angle_max: b.1,
                macd_fast_period: b.2,
                macd_slow_period: b.3,
                mtf_weight: b.4,
                rsi_oversold: c.0,
                rsi_overbought: c.1,
                divergence_threshold: c.2,
                ..Default::default()
            })
    }

    proptest! {
        #[test]
        fn prop_validation_is_idempotent(config in arbitrary_config()) {
            let first = ConfigurationValidator::validate_config(&config);
            let second = ConfigurationValidator::validate_config(&config);

            prop_assert_eq!(first.is_valid, second.is_valid);
            prop_assert_eq!(first.error_count(), second.error_count());
            prop_assert_eq!(&first.corrections, &second.corrections);

            // 보정본 재검증: 같은 유효성, 같은 오류 수, 추가 보정 없음
            let again = ConfigurationValidator::validate_config(&first.corrected);
            prop_assert_eq!(again.is_valid, first.is_valid);
            prop_assert_eq!(again.error_count(), first.error_count());
            prop_assert!(again.corrections.is_empty());
        }

        #[test]
        fn prop_corrected_angles_are_ordered(config in arbitrary_config()) {
            let report = ConfigurationValidator::validate_config(&config);
            let c = &report.corrected;

            prop_assert!(c.trendline_angle_min < c.trendline_angle_max);
            prop_assert!(c.rsi_oversold < c.rsi_overbought);
            prop_assert!((5.0..=85.0).contains(&c.trendline_angle_min));
            prop_assert!((0.1..=0.5).contains(&c.mtf_weight));
        }
    }
}
