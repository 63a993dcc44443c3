//! # featsync-lifecycle
//!
//! 서버 생명주기 제어 — 설정 푸시, 재적재 신호, 준비 폴링, 증거 수집.
//!
//! 조정 결과의 계산은 `featsync-reconciler`에서 하고, 이 크레이트는
//! 그 결과를 실제 서버에 적용하는 유일한 I/O 경계입니다.

pub mod control;
pub mod controller;
pub mod handle;

pub use control::{ConfigDocument, FsServerControl, Probe, ServerControl};
pub use controller::{ApplyOutcome, LifecycleController};
pub use handle::ServerHandle;
