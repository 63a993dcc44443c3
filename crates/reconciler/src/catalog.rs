//! 기능 카탈로그 -- capability family와 버전 관계 정의
//!
//! [`FeatureCatalog`]는 family별로 알려진 버전, 요구 런타임 레벨,
//! 대체(supersedes) 관계를 담는 읽기 전용 테이블입니다. 시작 시점에
//! `[catalog]` 설정에서 한 번 구축되고 이후 `Arc`로 공유됩니다.
//!
//! 카탈로그는 권고적(advisory)입니다 — 등록되지 않은 기능도 조정을
//! 통과하며, family 판정은 식별자 파싱으로 폴백합니다.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use featsync_core::config::CatalogConfig;
use featsync_core::types::{Feature, parse_version_ordinal};

/// family 내 하나의 버전 항목
#[derive(Debug, Clone)]
pub struct CatalogVersion {
    /// 버전 문자열 (예: `"3.0"`)
    pub version: String,
    /// 정렬용 버전 서수
    pub ordinal: u32,
    /// 이 버전이 요구하는 최소 런타임 레벨
    pub min_runtime_level: u32,
    /// 이 버전이 대체하는 이전 버전
    pub supersedes: Option<String>,
}

/// 기능 카탈로그 -- 로드 이후 불변
pub struct FeatureCatalog {
    /// family 이름 → 버전 목록 (서수 오름차순)
    families: BTreeMap<String, Vec<CatalogVersion>>,
    /// 같은 family라도 공존이 허용되는 기능 ID 쌍 (정규화: 사전순)
    compatible: BTreeSet<(String, String)>,
}

impl FeatureCatalog {
    /// 빈 카탈로그를 생성합니다.
    ///
    /// 모든 판정이 식별자 파싱 폴백으로 동작합니다.
    pub fn empty() -> Self {
        Self {
            families: BTreeMap::new(),
            compatible: BTreeSet::new(),
        }
    }

    /// `[catalog]` 설정에서 카탈로그를 구축합니다.
    ///
    /// 버전 문자열이 `major.minor` 형식이 아니면 서수 0으로 등록되고
    /// 경고가 남습니다. 2개가 아닌 compatible 쌍은 무시됩니다.
    pub fn from_config(config: &CatalogConfig) -> Self {
        let mut families: BTreeMap<String, Vec<CatalogVersion>> = BTreeMap::new();

        for family in &config.families {
            let entries = families.entry(family.name.clone()).or_default();
            for version in &family.versions {
                let ordinal = match parse_version_ordinal(&version.version) {
                    Some(ordinal) => ordinal,
                    None => {
                        warn!(
                            family = family.name.as_str(),
                            version = version.version.as_str(),
                            "catalog version is not in major.minor form, ordering disabled"
                        );
                        0
                    }
                };
                entries.push(CatalogVersion {
                    version: version.version.clone(),
                    ordinal,
                    min_runtime_level: version.min_runtime_level,
                    supersedes: version.supersedes.clone(),
                });
            }
            entries.sort_by_key(|v| v.ordinal);
        }

        let mut compatible = BTreeSet::new();
        for pair in &config.compatible {
            match pair.as_slice() {
                [a, b] => {
                    compatible.insert(normalize_pair(a, b));
                }
                other => {
                    warn!(
                        entries = other.len(),
                        "compatible override must list exactly two feature ids, skipping"
                    );
                }
            }
        }

        Self {
            families,
            compatible,
        }
    }

    /// family의 알려진 버전 목록을 반환합니다 (서수 오름차순).
    ///
    /// 등록되지 않은 family는 빈 슬라이스를 반환합니다.
    pub fn lookup(&self, family: &str) -> &[CatalogVersion] {
        self.families.get(family).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 기능이 카탈로그에 등록되어 있는지 확인합니다.
    pub fn is_known(&self, feature: &Feature) -> bool {
        self.lookup(&feature.family)
            .iter()
            .any(|v| v.ordinal == feature.version_ordinal)
    }

    /// 기능이 요구하는 최소 런타임 레벨을 반환합니다.
    ///
    /// 카탈로그에 없는 기능은 `None` — 요구치가 없는 것으로 취급됩니다.
    pub fn min_runtime_level(&self, feature: &Feature) -> Option<u32> {
        self.lookup(&feature.family)
            .iter()
            .find(|v| v.ordinal == feature.version_ordinal)
            .map(|v| v.min_runtime_level)
    }

    /// 두 기능이 충돌하는지 판정합니다.
    ///
    /// 같은 family의 서로 다른 기능은 충돌합니다. 단 compatible 쌍으로
    /// 명시된 조합은 예외입니다. family 판정은 식별자 파싱에 기반하므로
    /// 카탈로그에 등록되지 않은 기능에도 적용됩니다.
    pub fn conflicts_with(&self, a: &Feature, b: &Feature) -> bool {
        if a.id == b.id || !a.same_family(b) {
            return false;
        }
        if self.compatible.contains(&normalize_pair(&a.id, &b.id)) {
            debug!(
                a = a.id.as_str(),
                b = b.id.as_str(),
                "same family but declared compatible, allowing coexistence"
            );
            return false;
        }
        true
    }

    /// 등록된 family 수를 반환합니다.
    pub fn family_count(&self) -> usize {
        self.families.len()
    }
}

/// 기능 ID 쌍을 사전순으로 정규화합니다.
fn normalize_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_owned(), b.to_owned())
    } else {
        (b.to_owned(), a.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use featsync_core::config::{FamilyConfig, VersionConfig};

    use super::*;

    fn sample_config() -> CatalogConfig {
        CatalogConfig {
            families: vec![
                FamilyConfig {
                    name: "jaxrs".to_owned(),
                    versions: vec![
                        VersionConfig {
                            version: "2.1".to_owned(),
                            min_runtime_level: 8,
                            supersedes: None,
                        },
                        VersionConfig {
                            version: "3.0".to_owned(),
                            min_runtime_level: 8,
                            supersedes: Some("2.1".to_owned()),
                        },
                    ],
                },
                FamilyConfig {
                    name: "servlet".to_owned(),
                    versions: vec![
                        VersionConfig {
                            version: "4.0".to_owned(),
                            min_runtime_level: 7,
                            supersedes: None,
                        },
                        VersionConfig {
                            version: "5.0".to_owned(),
                            min_runtime_level: 8,
                            supersedes: Some("4.0".to_owned()),
                        },
                    ],
                },
            ],
            compatible: vec![vec!["jcache-1.1".to_owned(), "jcache-internal-1.1".to_owned()]],
        }
    }

    #[test]
    fn lookup_returns_versions_sorted_by_ordinal() {
        let catalog = FeatureCatalog::from_config(&sample_config());
        let versions = catalog.lookup("jaxrs");
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version, "2.1");
        assert_eq!(versions[1].version, "3.0");
        assert_eq!(versions[1].supersedes.as_deref(), Some("2.1"));
    }

    #[test]
    fn lookup_unknown_family_is_empty() {
        let catalog = FeatureCatalog::from_config(&sample_config());
        assert!(catalog.lookup("nosuchfamily").is_empty());
    }

    #[test]
    fn is_known() {
        let catalog = FeatureCatalog::from_config(&sample_config());
        assert!(catalog.is_known(&Feature::parse("jaxrs-3.0")));
        assert!(!catalog.is_known(&Feature::parse("jaxrs-9.9")));
        assert!(!catalog.is_known(&Feature::parse("customFeature")));
    }

    #[test]
    fn min_runtime_level_lookup() {
        let catalog = FeatureCatalog::from_config(&sample_config());
        assert_eq!(
            catalog.min_runtime_level(&Feature::parse("servlet-5.0")),
            Some(8)
        );
        assert_eq!(
            catalog.min_runtime_level(&Feature::parse("servlet-4.0")),
            Some(7)
        );
        assert_eq!(catalog.min_runtime_level(&Feature::parse("unknown-1.0")), None);
    }

    #[test]
    fn same_family_different_version_conflicts() {
        let catalog = FeatureCatalog::from_config(&sample_config());
        let a = Feature::parse("jaxrs-2.1");
        let b = Feature::parse("jaxrs-3.0");
        assert!(catalog.conflicts_with(&a, &b));
        assert!(catalog.conflicts_with(&b, &a));
    }

    #[test]
    fn different_family_does_not_conflict() {
        let catalog = FeatureCatalog::from_config(&sample_config());
        let a = Feature::parse("jaxrs-3.0");
        let b = Feature::parse("servlet-5.0");
        assert!(!catalog.conflicts_with(&a, &b));
    }

    #[test]
    fn identical_feature_does_not_conflict_with_itself() {
        let catalog = FeatureCatalog::from_config(&sample_config());
        let a = Feature::parse("jaxrs-3.0");
        assert!(!catalog.conflicts_with(&a, &a.clone()));
    }

    #[test]
    fn compatible_pair_does_not_conflict() {
        let catalog = FeatureCatalog::from_config(&sample_config());
        // 같은 family("jcache...")로 파싱되지는 않지만, 명시 쌍 검사가 우선함을
        // 확인하기 위해 같은 family인 인위적 쌍으로 재검증
        let config = CatalogConfig {
            families: vec![],
            compatible: vec![vec!["jdbc-4.2".to_owned(), "jdbc-4.3".to_owned()]],
        };
        let catalog2 = FeatureCatalog::from_config(&config);
        let a = Feature::parse("jdbc-4.2");
        let b = Feature::parse("jdbc-4.3");
        assert!(catalog.conflicts_with(&a, &b));
        assert!(!catalog2.conflicts_with(&a, &b));
        // 쌍은 순서 무관
        assert!(!catalog2.conflicts_with(&b, &a));
    }

    #[test]
    fn unregistered_features_conflict_by_parsed_family() {
        let catalog = FeatureCatalog::empty();
        let a = Feature::parse("mpHealth-3.1");
        let b = Feature::parse("mpHealth-4.0");
        assert!(catalog.conflicts_with(&a, &b));
    }

    #[test]
    fn malformed_compatible_pair_is_skipped() {
        let config = CatalogConfig {
            families: vec![],
            compatible: vec![vec!["only-one-1.0".to_owned()]],
        };
        let catalog = FeatureCatalog::from_config(&config);
        let a = Feature::parse("only-one-1.0");
        let b = Feature::parse("only-one-2.0");
        assert!(catalog.conflicts_with(&a, &b));
    }

    #[test]
    fn family_count() {
        let catalog = FeatureCatalog::from_config(&sample_config());
        assert_eq!(catalog.family_count(), 2);
        assert_eq!(FeatureCatalog::empty().family_count(), 0);
    }
}
