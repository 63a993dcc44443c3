//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `featsync_`
//! - 모듈명: `reconcile_`, `lifecycle_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use featsync_core::metrics;
//! use metrics::counter;
//!
//! counter!(featsync_core::metrics::LIFECYCLE_RELOADS_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 서버 레이블 키
pub const LABEL_SERVER: &str = "server";

/// 디스크립터 레이블 키
pub const LABEL_DESCRIPTOR: &str = "descriptor";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 게이트 레이블 키 (lite, full, quarantine)
pub const LABEL_GATE: &str = "gate";

// ─── Reconcile 메트릭 ──────────────────────────────────────────────

/// Reconcile: 실행된 조정 패스 수 (counter, labels: result, gate)
pub const RECONCILE_PASSES_TOTAL: &str = "featsync_reconcile_passes_total";

/// Reconcile: 런타임 레벨 미달로 건너뛴 서버 수 (counter, labels: server, descriptor)
pub const RECONCILE_SERVERS_SKIPPED_TOTAL: &str = "featsync_reconcile_servers_skipped_total";

/// Reconcile: 추가된 기능 수 (counter)
pub const RECONCILE_FEATURES_ADDED_TOTAL: &str = "featsync_reconcile_features_added_total";

/// Reconcile: 제거된 기능 수 (counter)
pub const RECONCILE_FEATURES_REMOVED_TOTAL: &str = "featsync_reconcile_features_removed_total";

/// Reconcile: 대체(supersession)로 퇴출된 기능 수 (counter)
pub const RECONCILE_SUPERSESSIONS_TOTAL: &str = "featsync_reconcile_supersessions_total";

// ─── Lifecycle 메트릭 ──────────────────────────────────────────────

/// Lifecycle: 수행된 서버 재구성 수 (counter, labels: server, result)
pub const LIFECYCLE_RELOADS_TOTAL: &str = "featsync_lifecycle_reloads_total";

/// Lifecycle: 변경 없음으로 재구성을 생략한 수 (counter, label: server)
pub const LIFECYCLE_UNCHANGED_TOTAL: &str = "featsync_lifecycle_unchanged_total";

/// Lifecycle: 타임아웃 후 내부 재시도 수 (counter, label: server)
pub const LIFECYCLE_RETRIES_TOTAL: &str = "featsync_lifecycle_retries_total";

/// Lifecycle: 준비 신호까지 대기 시간 (histogram, 초, label: server)
pub const LIFECYCLE_READINESS_WAIT_SECONDS: &str = "featsync_lifecycle_readiness_wait_seconds";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "featsync_daemon_uptime_seconds";

/// Daemon: 관리 중인 서버 수 (gauge)
pub const DAEMON_SERVERS_MANAGED: &str = "featsync_daemon_servers_managed";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "featsync_daemon_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 준비 신호 대기 시간 히스토그램 버킷 (초)
///
/// 100ms ~ 120s 범위 (서버 재시작은 프로세스 기동 + 기능 해석을 포함)
pub const READINESS_WAIT_BUCKETS: [f64; 9] =
    [0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 90.0, 120.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// `metrics::describe_counter!()`, `describe_gauge!()`, `describe_histogram!()`을
/// 호출하여 Prometheus HELP 텍스트를 설정합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `featsync-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Reconcile
    describe_counter!(
        RECONCILE_PASSES_TOTAL,
        "Total number of reconciliation passes executed"
    );
    describe_counter!(
        RECONCILE_SERVERS_SKIPPED_TOTAL,
        "Total number of servers skipped because their runtime level was too low"
    );
    describe_counter!(
        RECONCILE_FEATURES_ADDED_TOTAL,
        "Total number of features added across all reconciliations"
    );
    describe_counter!(
        RECONCILE_FEATURES_REMOVED_TOTAL,
        "Total number of features removed across all reconciliations"
    );
    describe_counter!(
        RECONCILE_SUPERSESSIONS_TOTAL,
        "Total number of same-family features evicted by a superseding addition"
    );

    // Lifecycle
    describe_counter!(
        LIFECYCLE_RELOADS_TOTAL,
        "Total number of server reconfigurations performed"
    );
    describe_counter!(
        LIFECYCLE_UNCHANGED_TOTAL,
        "Total number of reconfigurations skipped because the feature set was unchanged"
    );
    describe_counter!(
        LIFECYCLE_RETRIES_TOTAL,
        "Total number of internal readiness retries after a timeout"
    );
    describe_histogram!(
        LIFECYCLE_READINESS_WAIT_SECONDS,
        "Time waited for a server to report readiness in seconds"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Featsync daemon uptime in seconds");
    describe_gauge!(
        DAEMON_SERVERS_MANAGED,
        "Number of servers managed by the daemon"
    );
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version labels)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        RECONCILE_PASSES_TOTAL,
        RECONCILE_SERVERS_SKIPPED_TOTAL,
        RECONCILE_FEATURES_ADDED_TOTAL,
        RECONCILE_FEATURES_REMOVED_TOTAL,
        RECONCILE_SUPERSESSIONS_TOTAL,
        LIFECYCLE_RELOADS_TOTAL,
        LIFECYCLE_UNCHANGED_TOTAL,
        LIFECYCLE_RETRIES_TOTAL,
        LIFECYCLE_READINESS_WAIT_SECONDS,
        DAEMON_UPTIME_SECONDS,
        DAEMON_SERVERS_MANAGED,
        DAEMON_BUILD_INFO,
    ];

    #[test]
    fn all_metrics_start_with_featsync_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("featsync_"),
                "Metric '{}' does not start with 'featsync_' prefix",
                name
            );
        }
    }

    #[test]
    fn metric_names_are_unique() {
        let mut seen = std::collections::BTreeSet::new();
        for name in ALL_METRIC_NAMES {
            assert!(seen.insert(*name), "Metric '{}' is defined twice", name);
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // describe_all() should not panic even without a recorder installed
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        let labels = [LABEL_SERVER, LABEL_DESCRIPTOR, LABEL_RESULT, LABEL_GATE];
        for label in &labels {
            assert_eq!(
                label.to_lowercase(),
                *label,
                "Label key '{}' should be lowercase",
                label
            );
        }
    }

    #[test]
    fn readiness_wait_buckets_are_sorted() {
        let buckets = READINESS_WAIT_BUCKETS;
        for i in 1..buckets.len() {
            assert!(
                buckets[i] > buckets[i - 1],
                "Bucket values must be in ascending order"
            );
        }
    }
}
