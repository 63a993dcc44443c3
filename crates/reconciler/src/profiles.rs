//! 프로파일 생성 함수
//!
//! 세대 교체(generation upgrade)처럼 자주 쓰이는 디스크립터 형태를
//! 만들어주는 자유 함수들입니다. 세대마다 타입을 늘리는 대신
//! 데이터로 표현합니다 — 호출자는 반환된 디스크립터를 그대로 쓰거나
//! 동결 전에 수정할 수 있습니다.

use featsync_core::error::DescriptorError;
use featsync_core::types::TestModeGate;

use crate::descriptor::{ActionDescriptor, ActionDescriptorBuilder};

/// 기능 세대 교체 프로파일을 생성합니다.
///
/// 이전 세대의 기능들을 제거하고 새 세대의 기능들을 추가하는
/// 디스크립터를 만듭니다.
///
/// # 사용 예시
/// ```
/// use featsync_reconciler::profiles;
///
/// let descriptor = profiles::replacement(
///     "EE9_FEATURES",
///     ["servlet-4.0", "jsonp-1.1"],
///     ["servlet-5.0", "jsonp-2.0"],
///     8,
/// )
/// .unwrap();
/// assert!(descriptor.additions().contains("servlet-5.0"));
/// ```
pub fn replacement(
    id: impl Into<String>,
    obsolete: impl IntoIterator<Item = impl Into<String>>,
    incoming: impl IntoIterator<Item = impl Into<String>>,
    min_runtime_level: u32,
) -> Result<ActionDescriptor, DescriptorError> {
    ActionDescriptorBuilder::new(id)
        .remove_features(obsolete)
        .add_features(incoming)
        .with_min_runtime_level(min_runtime_level)
        .build()
}

/// 확장 패스 전용(`full` 게이트) 세대 교체 프로파일을 생성합니다.
pub fn replacement_full_only(
    id: impl Into<String>,
    obsolete: impl IntoIterator<Item = impl Into<String>>,
    incoming: impl IntoIterator<Item = impl Into<String>>,
    min_runtime_level: u32,
) -> Result<ActionDescriptor, DescriptorError> {
    ActionDescriptorBuilder::new(id)
        .remove_features(obsolete)
        .add_features(incoming)
        .with_min_runtime_level(min_runtime_level)
        .with_gate(TestModeGate::Full)
        .build()
}
