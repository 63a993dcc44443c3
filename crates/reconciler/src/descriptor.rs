//! 액션 디스크립터 -- 기능 추가/제거 프로파일 정의
//!
//! [`ActionDescriptor`]는 하나의 조정 패스가 수행할 기능 변경과 제약을
//! 선언합니다. [`ActionDescriptorBuilder`]로 구축하며, 엔진에 전달되는
//! 순간 동결(freeze)되어 이후의 변경 시도는 프로그래밍 오류로 거부됩니다.
//!
//! 세대별 프로파일은 타입이 아니라 데이터입니다 — `[[pass]]` 설정 테이블
//! 또는 [`crate::profiles`]의 생성 함수로 만들어집니다.

use std::sync::atomic::{AtomicBool, Ordering};

use featsync_core::config::PassConfig;
use featsync_core::error::DescriptorError;
use featsync_core::types::{FeatureSet, TestModeGate};

/// 액션 디스크립터
///
/// 엔진 전달 이후 불변입니다. 동결 플래그는 `&self`로 설정되어야 하므로
/// `AtomicBool`을 사용합니다 (디스크립터는 패스 전체에서 값으로 공유됨).
#[derive(Debug)]
pub struct ActionDescriptor {
    id: String,
    additions: FeatureSet,
    removals: FeatureSet,
    min_runtime_level: u32,
    target_servers: Vec<String>,
    gate: TestModeGate,
    frozen: AtomicBool,
}

impl ActionDescriptor {
    /// `[[pass]]` 설정 테이블에서 디스크립터를 구축합니다.
    pub fn from_config(config: &PassConfig) -> Result<Self, DescriptorError> {
        ActionDescriptorBuilder::new(&config.id)
            .add_features(config.additions.iter().map(String::as_str))
            .remove_features(config.removals.iter().map(String::as_str))
            .with_min_runtime_level(config.min_runtime_level)
            .with_gate(config.parsed_gate())
            .for_servers(config.target_servers.iter().map(String::as_str))
            .build()
    }

    /// 디스크립터 식별자를 반환합니다.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 추가할 기능 집합을 반환합니다.
    pub fn additions(&self) -> &FeatureSet {
        &self.additions
    }

    /// 제거할 기능 집합을 반환합니다.
    pub fn removals(&self) -> &FeatureSet {
        &self.removals
    }

    /// 요구 최소 런타임 레벨을 반환합니다.
    pub fn min_runtime_level(&self) -> u32 {
        self.min_runtime_level
    }

    /// 테스트 패스 게이트를 반환합니다.
    pub fn gate(&self) -> TestModeGate {
        self.gate
    }

    /// 적용 대상 서버 목록을 반환합니다. 비어 있으면 전체 적용입니다.
    pub fn target_servers(&self) -> &[String] {
        &self.target_servers
    }

    /// 이 디스크립터가 해당 서버에 적용되는지 확인합니다.
    pub fn applies_to(&self, server_id: &str) -> bool {
        self.target_servers.is_empty() || self.target_servers.iter().any(|s| s == server_id)
    }

    /// 디스크립터를 동결합니다. 엔진이 첫 조정 시점에 호출합니다.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    /// 동결 여부를 반환합니다.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// 동결 전 수정: 기능 추가.
    ///
    /// 이미 removals에 있는 기능이면 [`DescriptorError::ConflictingDirective`],
    /// 동결 이후면 [`DescriptorError::Frozen`]을 반환합니다.
    pub fn amend_add(&mut self, feature: impl Into<String>) -> Result<(), DescriptorError> {
        self.check_unfrozen()?;
        let feature = feature.into();
        if self.removals.contains(&feature) {
            return Err(DescriptorError::ConflictingDirective {
                descriptor_id: self.id.clone(),
                feature,
            });
        }
        self.additions.insert(feature);
        Ok(())
    }

    /// 동결 전 수정: 기능 제거 지시 추가.
    pub fn amend_remove(&mut self, feature: impl Into<String>) -> Result<(), DescriptorError> {
        self.check_unfrozen()?;
        let feature = feature.into();
        if self.additions.contains(&feature) {
            return Err(DescriptorError::ConflictingDirective {
                descriptor_id: self.id.clone(),
                feature,
            });
        }
        self.removals.insert(feature);
        Ok(())
    }

    /// 동결 전 수정: 대상 서버 재지정.
    pub fn retarget(
        &mut self,
        servers: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<(), DescriptorError> {
        self.check_unfrozen()?;
        self.target_servers = servers.into_iter().map(Into::into).collect();
        Ok(())
    }

    fn check_unfrozen(&self) -> Result<(), DescriptorError> {
        if self.is_frozen() {
            return Err(DescriptorError::Frozen {
                descriptor_id: self.id.clone(),
            });
        }
        Ok(())
    }
}

impl Clone for ActionDescriptor {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            additions: self.additions.clone(),
            removals: self.removals.clone(),
            min_runtime_level: self.min_runtime_level,
            target_servers: self.target_servers.clone(),
            gate: self.gate,
            // 복제본도 동결 상태를 승계 — 엔진에 전달된 프로파일은
            // 어떤 사본을 통해서도 수정될 수 없습니다.
            frozen: AtomicBool::new(self.is_frozen()),
        }
    }
}

impl PartialEq for ActionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.additions == other.additions
            && self.removals == other.removals
            && self.min_runtime_level == other.min_runtime_level
            && self.target_servers == other.target_servers
            && self.gate == other.gate
    }
}

/// 액션 디스크립터 빌더 (소비형 체인)
///
/// # 사용 예시
/// ```
/// use featsync_reconciler::descriptor::ActionDescriptorBuilder;
///
/// let descriptor = ActionDescriptorBuilder::new("EE9_FEATURES")
///     .add_feature("servlet-5.0")
///     .remove_feature("servlet-4.0")
///     .with_min_runtime_level(8)
///     .build()
///     .unwrap();
/// assert_eq!(descriptor.id(), "EE9_FEATURES");
/// ```
#[derive(Debug, Clone)]
pub struct ActionDescriptorBuilder {
    id: String,
    additions: FeatureSet,
    removals: FeatureSet,
    min_runtime_level: u32,
    target_servers: Vec<String>,
    gate: TestModeGate,
}

impl ActionDescriptorBuilder {
    /// 주어진 식별자로 빌더를 생성합니다.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            additions: FeatureSet::new(),
            removals: FeatureSet::new(),
            min_runtime_level: 0,
            target_servers: Vec::new(),
            gate: TestModeGate::default(),
        }
    }

    /// 추가할 기능을 등록합니다.
    pub fn add_feature(mut self, feature: impl Into<String>) -> Self {
        self.additions.insert(feature);
        self
    }

    /// 추가할 기능 여러 개를 등록합니다.
    pub fn add_features(mut self, features: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.additions.extend(features);
        self
    }

    /// 제거할 기능을 등록합니다.
    pub fn remove_feature(mut self, feature: impl Into<String>) -> Self {
        self.removals.insert(feature);
        self
    }

    /// 제거할 기능 여러 개를 등록합니다.
    pub fn remove_features(
        mut self,
        features: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.removals.extend(features);
        self
    }

    /// 요구 최소 런타임 레벨을 지정합니다.
    pub fn with_min_runtime_level(mut self, level: u32) -> Self {
        self.min_runtime_level = level;
        self
    }

    /// 테스트 패스 게이트를 지정합니다.
    pub fn with_gate(mut self, gate: TestModeGate) -> Self {
        self.gate = gate;
        self
    }

    /// 적용 대상 서버를 지정합니다. 지정하지 않으면 전체 적용입니다.
    pub fn for_servers(
        mut self,
        servers: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.target_servers = servers.into_iter().map(Into::into).collect();
        self
    }

    /// 디스크립터를 구축합니다.
    ///
    /// additions와 removals에 같은 기능이 있으면
    /// [`DescriptorError::ConflictingDirective`]로 즉시 실패합니다.
    /// 조정 시점의 암묵적 우선순위 대신 구축 시점에 거부합니다.
    pub fn build(self) -> Result<ActionDescriptor, DescriptorError> {
        if let Some(feature) = self.additions.intersection(&self.removals).first() {
            return Err(DescriptorError::ConflictingDirective {
                descriptor_id: self.id,
                feature: (*feature).to_owned(),
            });
        }

        Ok(ActionDescriptor {
            id: self.id,
            additions: self.additions,
            removals: self.removals,
            min_runtime_level: self.min_runtime_level,
            target_servers: self.target_servers,
            gate: self.gate,
            frozen: AtomicBool::new(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_descriptor() -> ActionDescriptor {
        ActionDescriptorBuilder::new("EE9_FEATURES")
            .add_features(["servlet-5.0", "jsonp-2.0"])
            .remove_features(["servlet-4.0", "jsonp-1.1"])
            .with_min_runtime_level(8)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_constructs_descriptor() {
        let d = sample_descriptor();
        assert_eq!(d.id(), "EE9_FEATURES");
        assert!(d.additions().contains("servlet-5.0"));
        assert!(d.removals().contains("jsonp-1.1"));
        assert_eq!(d.min_runtime_level(), 8);
        assert_eq!(d.gate(), TestModeGate::Lite);
        assert!(!d.is_frozen());
    }

    #[test]
    fn build_rejects_conflicting_directive() {
        let result = ActionDescriptorBuilder::new("BAD")
            .add_feature("servlet-5.0")
            .remove_feature("servlet-5.0")
            .build();
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            DescriptorError::ConflictingDirective { ref feature, .. } if feature == "servlet-5.0"
        ));
    }

    #[test]
    fn duplicate_additions_collapse() {
        let d = ActionDescriptorBuilder::new("DUP")
            .add_feature("cdi-3.0")
            .add_feature("cdi-3.0")
            .build()
            .unwrap();
        assert_eq!(d.additions().len(), 1);
    }

    #[test]
    fn applies_to_empty_targets_means_all() {
        let d = sample_descriptor();
        assert!(d.applies_to("anyserver"));
    }

    #[test]
    fn applies_to_respects_target_list() {
        let d = ActionDescriptorBuilder::new("TARGETED")
            .for_servers(["jwtsso", "dynamicUpdate"])
            .build()
            .unwrap();
        assert!(d.applies_to("jwtsso"));
        assert!(!d.applies_to("other"));
    }

    #[test]
    fn amend_before_freeze_succeeds() {
        let mut d = sample_descriptor();
        d.amend_add("cdi-3.0").unwrap();
        d.amend_remove("cdi-2.0").unwrap();
        d.retarget(["jwtsso"]).unwrap();
        assert!(d.additions().contains("cdi-3.0"));
        assert!(d.removals().contains("cdi-2.0"));
        assert!(!d.applies_to("other"));
    }

    #[test]
    fn amend_after_freeze_fails() {
        let mut d = sample_descriptor();
        d.freeze();
        assert!(matches!(
            d.amend_add("cdi-3.0"),
            Err(DescriptorError::Frozen { .. })
        ));
        assert!(matches!(
            d.amend_remove("cdi-2.0"),
            Err(DescriptorError::Frozen { .. })
        ));
        assert!(matches!(
            d.retarget(["x"]),
            Err(DescriptorError::Frozen { .. })
        ));
    }

    #[test]
    fn amend_add_rejects_feature_in_removals() {
        let mut d = sample_descriptor();
        let err = d.amend_add("servlet-4.0").unwrap_err();
        assert!(matches!(err, DescriptorError::ConflictingDirective { .. }));
    }

    #[test]
    fn amend_remove_rejects_feature_in_additions() {
        let mut d = sample_descriptor();
        let err = d.amend_remove("servlet-5.0").unwrap_err();
        assert!(matches!(err, DescriptorError::ConflictingDirective { .. }));
    }

    #[test]
    fn clone_preserves_frozen_state() {
        let d = sample_descriptor();
        d.freeze();
        let mut copy = d.clone();
        assert!(copy.is_frozen());
        assert!(copy.amend_add("cdi-3.0").is_err());
        assert_eq!(d, copy);
    }

    #[test]
    fn from_config_builds_descriptor() {
        let config = PassConfig {
            id: "EE9_FEATURES".to_owned(),
            additions: vec!["servlet-5.0".to_owned()],
            removals: vec!["servlet-4.0".to_owned()],
            min_runtime_level: 8,
            target_servers: vec![],
            gate: "full".to_owned(),
        };
        let d = ActionDescriptor::from_config(&config).unwrap();
        assert_eq!(d.gate(), TestModeGate::Full);
        assert_eq!(d.min_runtime_level(), 8);
    }

    #[test]
    fn from_config_rejects_conflict() {
        let config = PassConfig {
            id: "BAD".to_owned(),
            additions: vec!["jsonp-2.0".to_owned()],
            removals: vec!["jsonp-2.0".to_owned()],
            min_runtime_level: 0,
            target_servers: vec![],
            gate: "lite".to_owned(),
        };
        assert!(ActionDescriptor::from_config(&config).is_err());
    }
}
