//! 엔진 성능 통계와 상태 점수.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trend_data::CacheStats;

use crate::health::{ComponentHealth, ComponentStatus};

/// 누적 성능 카운터.
#[derive(Debug, Clone)]
pub struct PerformanceTracker {
    started: Instant,
    started_at: DateTime<Utc>,
    total_analyses: u64,
    completed_analyses: u64,
    empty_results: u64,
    data_errors: u64,
    component_errors: u64,
    signals_generated: u64,
    total_duration: Duration,
    max_duration: Duration,
    last_duration: Duration,
    last_analysis_at: Option<DateTime<Utc>>,
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
            total_analyses: 0,
            completed_analyses: 0,
            empty_results: 0,
            data_errors: 0,
            component_errors: 0,
            signals_generated: 0,
            total_duration: Duration::ZERO,
            max_duration: Duration::ZERO,
            last_duration: Duration::ZERO,
            last_analysis_at: None,
        }
    }

    /// 분석 호출 완료 기록 (캐시 적중 포함).
    pub fn record_analysis(&mut self, elapsed: Duration, signal_count: usize) {
        self.total_analyses += 1;
        self.completed_analyses += 1;
        self.signals_generated += signal_count as u64;
        self.total_duration += elapsed;
        self.max_duration = self.max_duration.max(elapsed);
        self.last_duration = elapsed;
        self.last_analysis_at = Some(Utc::now());
    }

    /// 비활성화/데이터 부족/거부로 빈 결과를 반환한 호출.
    pub fn record_empty(&mut self) {
        self.total_analyses += 1;
        self.empty_results += 1;
        self.last_analysis_at = Some(Utc::now());
    }

    /// 입력 검증 실패.
    pub fn record_data_error(&mut self) {
        self.data_errors += 1;
        self.record_empty();
    }

    pub fn record_component_error(&mut self) {
        self.component_errors += 1;
    }

    pub fn total_analyses(&self) -> u64 {
        self.total_analyses
    }

    /// 호출당 오류율 (데이터 오류 + 컴포넌트 오류).
    ///
    /// 컴포넌트 오류는 호출당 최대 6건이므로 1.0으로 제한합니다.
    pub fn error_rate(&self) -> f64 {
        if self.total_analyses == 0 {
            return 0.0;
        }
        let errors = (self.data_errors + self.component_errors) as f64;
        (errors / self.total_analyses as f64).min(1.0)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// 통계 스냅샷.
    pub fn snapshot(
        &self,
        result_cache: CacheStats,
        mtf_cache: Option<CacheStats>,
        estimated_memory_bytes: usize,
    ) -> PerformanceStats {
        let avg_duration_ms = if self.completed_analyses > 0 {
            self.total_duration.as_secs_f64() * 1000.0 / self.completed_analyses as f64
        } else {
            0.0
        };

        PerformanceStats {
            total_analyses: self.total_analyses,
            completed_analyses: self.completed_analyses,
            empty_results: self.empty_results,
            data_errors: self.data_errors,
            component_errors: self.component_errors,
            signals_generated: self.signals_generated,
            avg_duration_ms,
            max_duration_ms: self.max_duration.as_secs_f64() * 1000.0,
            last_duration_ms: self.last_duration.as_secs_f64() * 1000.0,
            error_rate: self.error_rate(),
            result_cache,
            mtf_cache,
            estimated_memory_bytes,
            started_at: self.started_at,
            uptime_secs: self.started.elapsed().as_secs(),
            last_analysis_at: self.last_analysis_at,
        }
    }
}

/// 성능 통계 스냅샷.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceStats {
    /// 전체 분석 호출 수
    pub total_analyses: u64,
    /// 분석기까지 실행된 호출 수 (캐시 적중 포함)
    pub completed_analyses: u64,
    /// 빈 결과로 끝난 호출 수
    pub empty_results: u64,
    pub data_errors: u64,
    pub component_errors: u64,
    /// 생성된 총 신호 수
    pub signals_generated: u64,
    pub avg_duration_ms: f64,
    pub max_duration_ms: f64,
    pub last_duration_ms: f64,
    pub error_rate: f64,
    /// 결과 캐시 통계
    pub result_cache: CacheStats,
    /// 상위 타임프레임 캐시 통계 (다중 타임프레임 분석 비활성화 시 None)
    pub mtf_cache: Option<CacheStats>,
    /// 캐시 보유 데이터 추정 크기
    pub estimated_memory_bytes: usize,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub last_analysis_at: Option<DateTime<Utc>>,
}

/// 전체 상태 등급.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    Healthy,
    Degraded,
    Critical,
}

impl HealthLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            HealthLevel::Healthy
        } else if score >= 50.0 {
            HealthLevel::Degraded
        } else {
            HealthLevel::Critical
        }
    }
}

/// 엔진 상태 요약.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// 0 ~ 100
    pub score: f64,
    pub level: HealthLevel,
    pub available_components: usize,
    pub degraded_components: usize,
    pub disabled_components: usize,
    pub error_rate: f64,
    pub issues: Vec<String>,
}

impl HealthStatus {
    /// 컴포넌트 가용성 70점 + 오류율 30점.
    ///
    /// Degraded 컴포넌트는 절반만 인정합니다.
    pub fn evaluate(components: &[ComponentStatus], error_rate: f64) -> Self {
        let count = |health| components.iter().filter(|c| c.health == health).count();
        let available = count(ComponentHealth::Available);
        let degraded = count(ComponentHealth::Degraded);
        let disabled = count(ComponentHealth::Disabled);

        let availability = if components.is_empty() {
            0.0
        } else {
            (available as f64 + 0.5 * degraded as f64) / components.len() as f64
        };
        let error_rate = error_rate.clamp(0.0, 1.0);
        let score = (70.0 * availability + 30.0 * (1.0 - error_rate)).clamp(0.0, 100.0);

        let mut issues: Vec<String> = components
            .iter()
            .filter(|c| c.health != ComponentHealth::Available)
            .map(|c| match &c.last_error {
                Some(err) => format!("{} {}: {}", c.source, c.health, err),
                None => format!("{} {}", c.source, c.health),
            })
            .collect();
        if error_rate > 0.1 {
            issues.push(format!("오류율 {:.1}%", error_rate * 100.0));
        }

        Self {
            score,
            level: HealthLevel::from_score(score),
            available_components: available,
            degraded_components: degraded,
            disabled_components: disabled,
            error_rate,
            issues,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.level == HealthLevel::Healthy
    }
}

// =============================================================================
// 테스트
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use trend_core::SignalSource;

    fn status(source: SignalSource, health: ComponentHealth) -> ComponentStatus {
        ComponentStatus {
            source,
            health,
            consecutive_failures: 0,
            total_successes: 0,
            total_failures: 0,
            total_skips: 0,
            disabled_count: 0,
            last_error: None,
            last_state_change: Utc::now(),
        }
    }

    #[test]
    fn test_error_rate() {
        let mut tracker = PerformanceTracker::new();
        assert_eq!(tracker.error_rate(), 0.0);

        tracker.record_analysis(Duration::from_millis(4), 2);
        tracker.record_analysis(Duration::from_millis(2), 0);
        tracker.record_component_error();
        tracker.record_data_error();

        // 호출 3건, 오류 2건
        assert_eq!(tracker.total_analyses(), 3);
        assert!((tracker.error_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_durations() {
        let mut tracker = PerformanceTracker::new();
        tracker.record_analysis(Duration::from_millis(10), 3);
        tracker.record_analysis(Duration::from_millis(30), 1);
        tracker.record_empty();

        let stats = tracker.snapshot(CacheStats::default(), None, 0);
        assert_eq!(stats.completed_analyses, 2);
        assert_eq!(stats.empty_results, 1);
        assert_eq!(stats.signals_generated, 4);
        assert!((stats.avg_duration_ms - 20.0).abs() < 1e-6);
        assert!((stats.max_duration_ms - 30.0).abs() < 1e-6);
        assert!(stats.last_analysis_at.is_some());
    }

    #[test]
    fn test_health_all_available() {
        let components: Vec<_> = SignalSource::COMPONENTS
            .iter()
            .map(|s| status(*s, ComponentHealth::Available))
            .collect();
        let health = HealthStatus::evaluate(&components, 0.0);

        assert_eq!(health.score, 100.0);
        assert_eq!(health.level, HealthLevel::Healthy);
        assert!(health.issues.is_empty());
    }

    #[test]
    fn test_health_with_disabled_components() {
        let mut components: Vec<_> = SignalSource::COMPONENTS
            .iter()
            .map(|s| status(*s, ComponentHealth::Available))
            .collect();
        components[0].health = ComponentHealth::Disabled;
        components[1].health = ComponentHealth::Disabled;
        components[2].health = ComponentHealth::Degraded;
        components[2].last_error = Some("boom".to_string());

        let health = HealthStatus::evaluate(&components, 0.5);

        // 70 * (3 + 0.5) / 6 + 30 * 0.5 = 55.83
        assert!((health.score - 55.833).abs() < 0.01);
        assert_eq!(health.level, HealthLevel::Degraded);
        assert_eq!(health.disabled_components, 2);
        assert_eq!(health.degraded_components, 1);
        assert!(health.issues.iter().any(|i| i.contains("boom")));
    }

    #[test]
    fn test_health_level_buckets() {
        assert_eq!(HealthLevel::from_score(80.0), HealthLevel::Healthy);
        assert_eq!(HealthLevel::from_score(79.9), HealthLevel::Degraded);
        assert_eq!(HealthLevel::from_score(50.0), HealthLevel::Degraded);
        assert_eq!(HealthLevel::from_score(10.0), HealthLevel::Critical);
    }
}
