//! 생명주기 컨트롤러 -- 조정 결과를 서버에 적용
//!
//! [`LifecycleController`]는 조정 엔진이 계산한 목표 기능 집합을 하나의
//! 서버에 적용합니다: tidy → 설정 푸시 → 재적재 신호 → 준비 폴링.
//! 결과가 변경 없음이면 어떤 I/O도 수행하지 않습니다.
//!
//! 준비 대기는 유일한 중단 지점이며 타임아웃으로 제한됩니다. 타임아웃 시
//! 2배 타임아웃으로 내부에서 정확히 한 번 재시도한 뒤 에스컬레이션합니다.

use std::time::Duration;

use metrics::{counter, histogram};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use featsync_core::config::LifecycleConfig;
use featsync_core::error::LifecycleError;
use featsync_core::metrics as metric_names;
use featsync_core::types::ServerState;
use featsync_reconciler::ReconciliationResult;

use crate::control::{ConfigDocument, Probe, ServerControl};
use crate::handle::ServerHandle;

/// apply의 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// 기능 집합 변경 없음 — I/O 없이 종료
    Unchanged,
    /// 재구성 수행 및 준비 확인 완료
    Reloaded,
}

/// 준비 대기 한 회차의 실패 원인
enum WaitFailure {
    TimedOut,
    Fatal(String),
    Died,
}

/// 서버 생명주기 컨트롤러
///
/// 하나의 서버 제어 경계([`ServerControl`])에 묶입니다. apply 중에는
/// 전달받은 핸들의 유일한 작성자입니다.
pub struct LifecycleController<C: ServerControl> {
    control: C,
    config: LifecycleConfig,
}

impl<C: ServerControl> LifecycleController<C> {
    /// 컨트롤러를 생성합니다.
    pub fn new(control: C, config: LifecycleConfig) -> Self {
        Self { control, config }
    }

    /// 조정 결과를 서버에 적용합니다.
    ///
    /// 성공 시 핸들의 상태를 `Running`으로 전환하고 기능 캐시를 갱신합니다.
    /// 실패 시 `Failed`로 전환하며, 에러에 서버의 마지막 진단 로그를
    /// 증거로 담습니다.
    pub async fn apply(
        &self,
        handle: &mut ServerHandle,
        descriptor_id: &str,
        result: &ReconciliationResult,
    ) -> Result<ApplyOutcome, LifecycleError> {
        if !result.changed {
            debug!(
                server_id = handle.id.as_str(),
                descriptor_id, "feature set unchanged, skipping reconfiguration"
            );
            counter!(
                metric_names::LIFECYCLE_UNCHANGED_TOTAL,
                metric_names::LABEL_SERVER => handle.id.clone()
            )
            .increment(1);
            return Ok(ApplyOutcome::Unchanged);
        }

        // 같은 정체성에 남은 이전 인스턴스 잔재는 첫 재구성 전에 정리
        if !handle.tidied {
            self.control.tidy().await?;
            handle.tidied = true;
        }

        let doc = ConfigDocument {
            descriptor_id: descriptor_id.to_owned(),
            features: result.target.clone(),
        };
        self.control.push_config(&doc).await?;

        handle.state = ServerState::Starting;
        self.control.signal_reload().await?;

        let timeout = Duration::from_secs(self.config.readiness_timeout_secs);
        let started = Instant::now();

        let wait = match self.await_ready(timeout).await? {
            Err(WaitFailure::TimedOut) if self.config.retry_on_timeout => {
                warn!(
                    server_id = handle.id.as_str(),
                    descriptor_id,
                    timeout_secs = timeout.as_secs(),
                    "readiness timeout, retrying once with doubled timeout"
                );
                counter!(
                    metric_names::LIFECYCLE_RETRIES_TOTAL,
                    metric_names::LABEL_SERVER => handle.id.clone()
                )
                .increment(1);
                self.control.signal_reload().await?;
                self.await_ready(timeout * 2).await?
            }
            other => other,
        };

        match wait {
            Ok(()) => {
                handle.state = ServerState::Running;
                handle.features = result.target.clone();
                let waited = started.elapsed();
                histogram!(
                    metric_names::LIFECYCLE_READINESS_WAIT_SECONDS,
                    metric_names::LABEL_SERVER => handle.id.clone()
                )
                .record(waited.as_secs_f64());
                counter!(
                    metric_names::LIFECYCLE_RELOADS_TOTAL,
                    metric_names::LABEL_SERVER => handle.id.clone(),
                    metric_names::LABEL_RESULT => "success"
                )
                .increment(1);
                info!(
                    server_id = handle.id.as_str(),
                    descriptor_id,
                    waited_ms = waited.as_millis() as u64,
                    "reconfiguration complete"
                );
                Ok(ApplyOutcome::Reloaded)
            }
            Err(failure) => {
                handle.state = ServerState::Failed;
                counter!(
                    metric_names::LIFECYCLE_RELOADS_TOTAL,
                    metric_names::LABEL_SERVER => handle.id.clone(),
                    metric_names::LABEL_RESULT => "failure"
                )
                .increment(1);
                let evidence = self.collect_evidence().await;
                Err(match failure {
                    WaitFailure::TimedOut => LifecycleError::ReadinessTimeout {
                        server_id: handle.id.clone(),
                        descriptor_id: descriptor_id.to_owned(),
                        waited_secs: started.elapsed().as_secs(),
                        evidence,
                    },
                    WaitFailure::Fatal(marker) => LifecycleError::ReconfigurationFailed {
                        server_id: handle.id.clone(),
                        descriptor_id: descriptor_id.to_owned(),
                        reason: marker,
                        evidence,
                    },
                    WaitFailure::Died => LifecycleError::ReconfigurationFailed {
                        server_id: handle.id.clone(),
                        descriptor_id: descriptor_id.to_owned(),
                        reason: "server process exited during reconfiguration".to_owned(),
                        evidence,
                    },
                })
            }
        }
    }

    /// 준비 신호를 폴링합니다. 제어 경계 I/O 실패만 바깥 `Err`입니다.
    async fn await_ready(
        &self,
        timeout: Duration,
    ) -> Result<Result<(), WaitFailure>, LifecycleError> {
        let deadline = Instant::now() + timeout;
        let interval = Duration::from_millis(self.config.readiness_poll_interval_ms);

        loop {
            match self.control.probe().await? {
                Probe::Ready => return Ok(Ok(())),
                Probe::Fatal(marker) => return Ok(Err(WaitFailure::Fatal(marker))),
                Probe::NotRunning => return Ok(Err(WaitFailure::Died)),
                Probe::Starting => {}
            }
            if Instant::now() >= deadline {
                return Ok(Err(WaitFailure::TimedOut));
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// 실패 증거로 마지막 진단 로그를 수집합니다.
    ///
    /// 수집 자체가 실패해도 원래 실패를 가리지 않도록 빈 목록으로 대체합니다.
    async fn collect_evidence(&self) -> Vec<String> {
        match self.control.tail_log(self.config.evidence_lines).await {
            Ok(lines) => lines,
            Err(e) => {
                warn!(error = %e, "failed to collect log evidence");
                Vec::new()
            }
        }
    }
}
