//! # featsync-reconciler
//!
//! 기능 카탈로그, 액션 디스크립터, 순수 조정 엔진.
//!
//! 이 크레이트는 I/O를 수행하지 않습니다 — 현재 기능 집합과 디스크립터로부터
//! 목표 기능 집합을 계산할 뿐이며, 적용은 `featsync-lifecycle`의 몫입니다.

pub mod catalog;
pub mod descriptor;
pub mod engine;
pub mod profiles;

pub use catalog::{CatalogVersion, FeatureCatalog};
pub use descriptor::{ActionDescriptor, ActionDescriptorBuilder};
pub use engine::{ReconcileEngine, ReconciliationResult, Supersession};
