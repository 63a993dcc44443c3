//! # featsync-core
//!
//! Featsync 공통 기반 크레이트 — 도메인 타입, 에러, 설정, 메트릭 상수.
//!
//! 모든 도메인 크레이트(`featsync-reconciler`, `featsync-lifecycle`)와
//! `featsync-daemon`은 이 크레이트에 의존합니다. 역방향 의존은 없습니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{
    ConfigError, DescriptorError, FeatsyncError, LifecycleError, ReconcileError,
};

// 설정
pub use config::FeatsyncConfig;

// 도메인 타입
pub use types::{Feature, FeatureSet, ServerState, TestModeGate};
