//! 분석 컴포넌트 상태 머신.
//!
//! # 상태 전이
//!
//! ```text
//! Available ──[연속 실패 ceil(N/2)]──> Degraded ──[연속 실패 N]──> Disabled
//!     ↑                                   │                          │
//!     └──────────────[성공]───────────────┘                          │
//!     └──────────────────────────[reset]─────────────────────────────┘
//! ```
//!
//! `Disabled` 전이는 서킷 브레이커가 활성화된 경우에만 일어나며, 해제는
//! 명시적인 `reset`으로만 가능합니다. 데이터 부족으로 건너뛴 호출은
//! 성공/실패 어느 쪽으로도 집계하지 않습니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use trend_core::{SignalSource, TrendConfig};

/// 컴포넌트 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentHealth {
    /// 정상
    Available,
    /// 연속 실패 중 (계속 실행)
    Degraded,
    /// 실행 중단 (수동 리셋 필요)
    Disabled,
}

impl fmt::Display for ComponentHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentHealth::Available => write!(f, "available"),
            ComponentHealth::Degraded => write!(f, "degraded"),
            ComponentHealth::Disabled => write!(f, "disabled"),
        }
    }
}

/// 상태 전이 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthPolicy {
    /// 서킷 브레이커 활성화 여부
    pub circuit_breaker: bool,
    /// Disabled 전이 연속 실패 수
    pub failure_threshold: u32,
}

impl HealthPolicy {
    /// Degraded 전이 연속 실패 수 (임계값의 절반, 올림).
    pub fn degraded_threshold(&self) -> u32 {
        self.failure_threshold.div_ceil(2).max(1)
    }
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self::from(&TrendConfig::default())
    }
}

impl From<&TrendConfig> for HealthPolicy {
    fn from(config: &TrendConfig) -> Self {
        Self {
            circuit_breaker: config.enable_circuit_breaker,
            failure_threshold: config.circuit_breaker_threshold.max(1),
        }
    }
}

/// 컴포넌트 상태 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentStatus {
    pub source: SignalSource,
    pub health: ComponentHealth,
    pub consecutive_failures: u32,
    pub total_successes: u64,
    pub total_failures: u64,
    /// 데이터 부족으로 건너뛴 횟수
    pub total_skips: u64,
    pub disabled_count: u64,
    pub last_error: Option<String>,
    pub last_state_change: DateTime<Utc>,
}

/// 컴포넌트별 상태 추적기.
#[derive(Debug, Clone)]
pub struct ComponentHealthTracker {
    source: SignalSource,
    policy: HealthPolicy,
    health: ComponentHealth,
    consecutive_failures: u32,
    total_successes: u64,
    total_failures: u64,
    total_skips: u64,
    disabled_count: u64,
    last_error: Option<String>,
    last_state_change: DateTime<Utc>,
}

impl ComponentHealthTracker {
    pub fn new(source: SignalSource, policy: HealthPolicy) -> Self {
        Self {
            source,
            policy,
            health: ComponentHealth::Available,
            consecutive_failures: 0,
            total_successes: 0,
            total_failures: 0,
            total_skips: 0,
            disabled_count: 0,
            last_error: None,
            last_state_change: Utc::now(),
        }
    }

    pub fn source(&self) -> SignalSource {
        self.source
    }

    pub fn health(&self) -> ComponentHealth {
        self.health
    }

    /// 이번 호출에서 실행해도 되는지.
    pub fn is_runnable(&self) -> bool {
        self.health != ComponentHealth::Disabled
    }

    /// 정책 교체 (설정 갱신). 현재 상태는 유지합니다.
    pub fn set_policy(&mut self, policy: HealthPolicy) {
        self.policy = policy;
    }

    /// 성공 기록. Degraded 상태면 Available로 복귀합니다.
    pub fn record_success(&mut self) {
        self.total_successes += 1;
        self.consecutive_failures = 0;

        if self.health == ComponentHealth::Degraded {
            self.transition_to(ComponentHealth::Available);
            info!(component = %self.source, "컴포넌트 복구: degraded -> available");
        }
    }

    /// 실패 기록.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.total_failures += 1;
        self.consecutive_failures += 1;
        self.last_error = Some(error.into());

        if self.health == ComponentHealth::Disabled {
            return;
        }

        if self.policy.circuit_breaker && self.consecutive_failures >= self.policy.failure_threshold
        {
            self.transition_to(ComponentHealth::Disabled);
            self.disabled_count += 1;
            warn!(
                component = %self.source,
                failures = self.consecutive_failures,
                threshold = self.policy.failure_threshold,
                "컴포넌트 비활성화"
            );
        } else if self.health == ComponentHealth::Available
            && self.consecutive_failures >= self.policy.degraded_threshold()
        {
            self.transition_to(ComponentHealth::Degraded);
            warn!(
                component = %self.source,
                failures = self.consecutive_failures,
                "컴포넌트 성능 저하"
            );
        }
    }

    /// 컴포넌트 생성 실패. 정책과 무관하게 즉시 Disabled로 전이합니다.
    pub fn record_init_failure(&mut self, error: impl Into<String>) {
        self.total_failures += 1;
        self.last_error = Some(error.into());
        if self.health != ComponentHealth::Disabled {
            self.transition_to(ComponentHealth::Disabled);
            self.disabled_count += 1;
        }
        warn!(
            component = %self.source,
            error = self.last_error.as_deref().unwrap_or_default(),
            "컴포넌트 초기화 실패"
        );
    }

    /// 데이터 부족으로 건너뜀.
    pub fn record_skip(&mut self) {
        self.total_skips += 1;
    }

    /// 수동 리셋. 누적 통계는 유지합니다.
    pub fn reset(&mut self) {
        self.transition_to(ComponentHealth::Available);
        self.consecutive_failures = 0;
        self.last_error = None;
        info!(component = %self.source, "컴포넌트 수동 리셋");
    }

    pub fn status(&self) -> ComponentStatus {
        ComponentStatus {
            source: self.source,
            health: self.health,
            consecutive_failures: self.consecutive_failures,
            total_successes: self.total_successes,
            total_failures: self.total_failures,
            total_skips: self.total_skips,
            disabled_count: self.disabled_count,
            last_error: self.last_error.clone(),
            last_state_change: self.last_state_change,
        }
    }

    fn transition_to(&mut self, health: ComponentHealth) {
        if self.health != health {
            self.health = health;
            self.last_state_change = Utc::now();
        }
    }
}

// =============================================================================
// 테스트
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(threshold: u32, circuit_breaker: bool) -> ComponentHealthTracker {
        ComponentHealthTracker::new(
            SignalSource::Aroon,
            HealthPolicy {
                circuit_breaker,
                failure_threshold: threshold,
            },
        )
    }

    #[test]
    fn test_initial_state() {
        let t = tracker(5, true);
        assert_eq!(t.health(), ComponentHealth::Available);
        assert!(t.is_runnable());
    }

    #[test]
    fn test_degraded_then_disabled() {
        let mut t = tracker(5, true);

        t.record_failure("boom");
        t.record_failure("boom");
        assert_eq!(t.health(), ComponentHealth::Available);

        // ceil(5 / 2) = 3
        t.record_failure("boom");
        assert_eq!(t.health(), ComponentHealth::Degraded);
        assert!(t.is_runnable());

        t.record_failure("boom");
        t.record_failure("boom");
        assert_eq!(t.health(), ComponentHealth::Disabled);
        assert!(!t.is_runnable());
        assert_eq!(t.status().disabled_count, 1);
    }

    #[test]
    fn test_success_recovers_from_degraded() {
        let mut t = tracker(4, true);
        t.record_failure("x");
        t.record_failure("x");
        assert_eq!(t.health(), ComponentHealth::Degraded);

        t.record_success();
        assert_eq!(t.health(), ComponentHealth::Available);
        assert_eq!(t.status().consecutive_failures, 0);
    }

    #[test]
    fn test_without_circuit_breaker_never_disabled() {
        let mut t = tracker(2, false);
        for _ in 0..10 {
            t.record_failure("x");
        }
        assert_eq!(t.health(), ComponentHealth::Degraded);
        assert!(t.is_runnable());
    }

    #[test]
    fn test_manual_reset() {
        let mut t = tracker(1, true);
        t.record_failure("x");
        assert_eq!(t.health(), ComponentHealth::Disabled);

        t.reset();
        let status = t.status();
        assert_eq!(status.health, ComponentHealth::Available);
        assert_eq!(status.total_failures, 1);
        assert!(status.last_error.is_none());
    }

    #[test]
    fn test_init_failure_disables_even_without_circuit_breaker() {
        let mut t = tracker(5, false);
        t.record_init_failure("bad params");
        assert_eq!(t.health(), ComponentHealth::Disabled);
        assert_eq!(t.status().last_error.as_deref(), Some("bad params"));
    }

    #[test]
    fn test_skips_do_not_affect_state() {
        let mut t = tracker(1, true);
        t.record_skip();
        t.record_skip();
        assert_eq!(t.health(), ComponentHealth::Available);
        assert_eq!(t.status().total_skips, 2);
    }
}
