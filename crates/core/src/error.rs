//! 에러 타입 — 도메인별 에러 정의
//!
//! 각 도메인 크레이트는 여기 정의된 에러를 사용하고,
//! 최상위 [`FeatsyncError`]로 합쳐집니다.

/// Featsync 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum FeatsyncError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 액션 디스크립터 에러
    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    /// 조정(reconciliation) 에러
    #[error("reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// 서버 생명주기 에러
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 액션 디스크립터 에러
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// 같은 기능이 additions와 removals에 동시에 지정됨.
    /// 빌드 시점에 즉시 실패합니다 — 조정 시점의 암묵적 우선순위보다 fail-fast.
    #[error("descriptor '{descriptor_id}' adds and removes the same feature: {feature}")]
    ConflictingDirective {
        descriptor_id: String,
        feature: String,
    },

    /// 엔진에 전달된 이후의 변경 시도. 프로그래밍 오류로 취급합니다.
    #[error("descriptor '{descriptor_id}' is frozen (already handed to the reconcile engine)")]
    Frozen { descriptor_id: String },
}

/// 조정 엔진 에러
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// 서버 런타임 레벨이 디스크립터 요구치보다 낮음.
    /// 복구 가능 — 호출자는 해당 서버를 건너뛰고 패스를 계속할 수 있습니다.
    #[error(
        "descriptor '{descriptor_id}' requires runtime level {required}, server reports {level}"
    )]
    RuntimeLevelTooLow {
        descriptor_id: String,
        level: u32,
        required: u32,
    },
}

/// 서버 생명주기 에러
///
/// 모든 변형은 서버 ID와 디스크립터 ID를 포함해, 실패한 조정을
/// 오프라인에서 재현할 수 있도록 합니다.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// 재구성 실패. 서버 진단 로그의 마지막 N줄을 증거로 포함합니다.
    #[error(
        "reconfiguration failed for server '{server_id}' applying descriptor '{descriptor_id}': {reason}"
    )]
    ReconfigurationFailed {
        server_id: String,
        descriptor_id: String,
        reason: String,
        evidence: Vec<String>,
    },

    /// 준비 신호 타임아웃. [`LifecycleError::ReconfigurationFailed`]의 특수화로,
    /// 호출자가 더 긴 타임아웃으로 정확히 한 번 재시도할 수 있게 구분됩니다.
    #[error(
        "server '{server_id}' did not report readiness within {waited_secs}s applying descriptor '{descriptor_id}'"
    )]
    ReadinessTimeout {
        server_id: String,
        descriptor_id: String,
        waited_secs: u64,
        evidence: Vec<String>,
    },

    /// 제어 경계 I/O 실패 (설정 푸시, 로그 읽기 등)
    #[error("control operation failed for server '{server_id}': {reason}")]
    Control { server_id: String, reason: String },
}

impl LifecycleError {
    /// 실패 당시 수집된 진단 로그 증거를 반환합니다.
    pub fn evidence(&self) -> &[String] {
        match self {
            Self::ReconfigurationFailed { evidence, .. } => evidence,
            Self::ReadinessTimeout { evidence, .. } => evidence,
            Self::Control { .. } => &[],
        }
    }
}
