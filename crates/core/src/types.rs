//! 도메인 타입 — 기능 식별자, 기능 집합, 서버 상태
//!
//! 모든 크레이트가 공유하는 데이터 구조를 정의합니다.
//! 기능(feature)은 `"<family>-<major>.<minor>"` 형식의 식별자로 표현되며,
//! 같은 capability family 안에서는 버전이 다른 기능이 서로 충돌합니다.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 파싱된 기능 식별자
///
/// 식별자의 마지막 `-` 뒤가 버전으로 파싱 가능하면 family/version으로 분리합니다.
/// 버전이 없는 식별자(예: 외부 정의 기능)는 전체가 family로 취급됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    /// 원본 식별자 (예: `"jaxrs-3.0"`)
    pub id: String,
    /// capability family (예: `"jaxrs"`)
    pub family: String,
    /// 버전 서수 (`major * 100 + minor`). 버전이 없으면 0.
    pub version_ordinal: u32,
}

impl Feature {
    /// 식별자를 파싱합니다.
    ///
    /// 버전부가 `major.minor` 숫자 형식이 아니면 식별자 전체를 family로 보고
    /// 서수 0을 부여합니다. 파싱 실패는 에러가 아닙니다 — 카탈로그는 권고적이며,
    /// 외부에서 정의된 기능도 그대로 통과시킵니다.
    pub fn parse(id: &str) -> Self {
        if let Some(pos) = id.rfind('-') {
            let (family, version) = (&id[..pos], &id[pos + 1..]);
            if let Some(ordinal) = parse_version_ordinal(version) {
                return Self {
                    id: id.to_owned(),
                    family: family.to_owned(),
                    version_ordinal: ordinal,
                };
            }
        }
        Self {
            id: id.to_owned(),
            family: id.to_owned(),
            version_ordinal: 0,
        }
    }

    /// 두 기능이 같은 capability family에 속하는지 확인합니다.
    pub fn same_family(&self, other: &Feature) -> bool {
        self.family == other.family
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// `"major.minor"` 문자열을 서수로 변환합니다.
///
/// 카탈로그 로딩처럼 family와 분리된 버전 문자열만 있는 경우에 사용합니다.
pub fn parse_version_ordinal(version: &str) -> Option<u32> {
    let (major, minor) = match version.split_once('.') {
        Some((maj, min)) => (maj, min),
        None => (version, "0"),
    };
    let major: u32 = major.parse().ok()?;
    let minor: u32 = minor.parse().ok()?;
    Some(major * 100 + minor)
}

/// 기능 집합
///
/// 식별자 기준으로 유일하며 순서가 없습니다. 내부적으로 `BTreeSet`을 사용해
/// 순회와 직렬화가 결정적(deterministic)이 되도록 합니다.
///
/// 조정 엔진을 거치지 않은 직접 변경은 허용되지 않습니다 — 오케스트레이터는
/// `apply` 성공 후 캐시된 뷰를 읽기만 합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(BTreeSet<String>);

impl FeatureSet {
    /// 빈 집합을 생성합니다.
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// 기능을 추가합니다. 이미 있으면 `false`를 반환합니다.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.0.insert(id.into())
    }

    /// 기능을 제거합니다. 없으면 `false`를 반환합니다 (멱등).
    pub fn remove(&mut self, id: &str) -> bool {
        self.0.remove(id)
    }

    /// 기능 포함 여부를 확인합니다.
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    /// 집합의 크기를 반환합니다.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 집합이 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 식별자 순회 (사전순).
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// 두 집합의 교집합 원소를 반환합니다.
    pub fn intersection<'a>(&'a self, other: &'a FeatureSet) -> Vec<&'a str> {
        self.0.intersection(&other.0).map(String::as_str).collect()
    }
}

impl<S: Into<String>> FromIterator<S> for FeatureSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for FeatureSet {
    fn extend<T: IntoIterator<Item = S>>(&mut self, iter: T) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for id in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{id}")?;
            first = false;
        }
        Ok(())
    }
}

/// 서버 실행 상태
///
/// 상태 전환:
/// - `Stopped`/`Running` → 재구성 시작 → `Starting`
/// - `Starting` → 준비 신호 수신 → `Running`
/// - `Starting` → 타임아웃 또는 치명적 설정 오류 → `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerState {
    /// 정지됨
    Stopped,
    /// 재구성 적용 중 (준비 신호 대기)
    Starting,
    /// 실행 중
    Running,
    /// 재구성 실패
    Failed,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// 테스트 패스 게이트
///
/// 액션 디스크립터가 어떤 패스에서 실행될지 결정합니다.
/// `Lite`는 항상, `Full`은 확장 패스에서만, `Quarantine`은 실행되지 않습니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestModeGate {
    /// 기본 패스 포함
    #[default]
    Lite,
    /// 확장 패스에서만 실행
    Full,
    /// 실행 격리 (알려진 문제로 보류 중)
    Quarantine,
}

impl TestModeGate {
    /// 문자열에서 게이트를 파싱합니다. 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "lite" => Some(Self::Lite),
            "full" => Some(Self::Full),
            "quarantine" => Some(Self::Quarantine),
            _ => None,
        }
    }
}

impl fmt::Display for TestModeGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lite => write!(f, "lite"),
            Self::Full => write!(f, "full"),
            Self::Quarantine => write!(f, "quarantine"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_parse_family_and_version() {
        let f = Feature::parse("jaxrs-3.0");
        assert_eq!(f.family, "jaxrs");
        assert_eq!(f.version_ordinal, 300);

        let f = Feature::parse("servlet-4.0");
        assert_eq!(f.family, "servlet");
        assert_eq!(f.version_ordinal, 400);

        let f = Feature::parse("jsonp-1.1");
        assert_eq!(f.family, "jsonp");
        assert_eq!(f.version_ordinal, 101);
    }

    #[test]
    fn feature_parse_hyphenated_family() {
        let f = Feature::parse("componenttest-2.0");
        assert_eq!(f.family, "componenttest");
        assert_eq!(f.version_ordinal, 200);
    }

    #[test]
    fn feature_parse_without_version() {
        let f = Feature::parse("customFeature");
        assert_eq!(f.family, "customFeature");
        assert_eq!(f.version_ordinal, 0);
    }

    #[test]
    fn feature_parse_non_numeric_version_falls_back() {
        // 버전부가 숫자가 아니면 식별자 전체가 family
        let f = Feature::parse("usr-myFeature");
        assert_eq!(f.family, "usr-myFeature");
        assert_eq!(f.version_ordinal, 0);
    }

    #[test]
    fn feature_same_family() {
        let a = Feature::parse("jaxrs-2.1");
        let b = Feature::parse("jaxrs-3.0");
        let c = Feature::parse("jsonp-2.0");
        assert!(a.same_family(&b));
        assert!(!a.same_family(&c));
    }

    #[test]
    fn version_ordinal_ordering() {
        assert!(
            Feature::parse("jaxrs-3.0").version_ordinal
                > Feature::parse("jaxrs-2.1").version_ordinal
        );
        assert!(
            Feature::parse("jsonp-2.0").version_ordinal
                > Feature::parse("jsonp-1.1").version_ordinal
        );
    }

    #[test]
    fn feature_set_membership() {
        let mut set = FeatureSet::new();
        assert!(set.insert("servlet-5.0"));
        assert!(!set.insert("servlet-5.0"));
        assert!(set.contains("servlet-5.0"));
        assert_eq!(set.len(), 1);

        assert!(set.remove("servlet-5.0"));
        assert!(!set.remove("servlet-5.0"));
        assert!(set.is_empty());
    }

    #[test]
    fn feature_set_membership_is_order_independent() {
        let a: FeatureSet = ["servlet-5.0", "jsonp-2.0"].into_iter().collect();
        let b: FeatureSet = ["jsonp-2.0", "servlet-5.0"].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn feature_set_display_is_sorted() {
        let set: FeatureSet = ["servlet-5.0", "cdi-3.0", "jsonp-2.0"].into_iter().collect();
        assert_eq!(set.to_string(), "cdi-3.0, jsonp-2.0, servlet-5.0");
    }

    #[test]
    fn feature_set_intersection() {
        let a: FeatureSet = ["servlet-5.0", "jsonp-2.0"].into_iter().collect();
        let b: FeatureSet = ["jsonp-2.0", "cdi-3.0"].into_iter().collect();
        assert_eq!(a.intersection(&b), vec!["jsonp-2.0"]);
    }

    #[test]
    fn feature_set_serialize_roundtrip() {
        let set: FeatureSet = ["servlet-5.0", "jsonp-2.0"].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["jsonp-2.0","servlet-5.0"]"#);
        let back: FeatureSet = serde_json::from_str(&json).unwrap();
        assert_eq!(set, back);
    }

    #[test]
    fn server_state_display() {
        assert_eq!(ServerState::Stopped.to_string(), "stopped");
        assert_eq!(ServerState::Starting.to_string(), "starting");
        assert_eq!(ServerState::Running.to_string(), "running");
        assert_eq!(ServerState::Failed.to_string(), "failed");
    }

    #[test]
    fn gate_default_is_lite() {
        assert_eq!(TestModeGate::default(), TestModeGate::Lite);
    }

    #[test]
    fn gate_from_str_loose() {
        assert_eq!(TestModeGate::from_str_loose("lite"), Some(TestModeGate::Lite));
        assert_eq!(TestModeGate::from_str_loose("FULL"), Some(TestModeGate::Full));
        assert_eq!(
            TestModeGate::from_str_loose("Quarantine"),
            Some(TestModeGate::Quarantine)
        );
        assert_eq!(TestModeGate::from_str_loose("unknown"), None);
    }

    #[test]
    fn gate_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&TestModeGate::Full).unwrap(), r#""full""#);
        let back: TestModeGate = serde_json::from_str(r#""quarantine""#).unwrap();
        assert_eq!(back, TestModeGate::Quarantine);
    }
}
