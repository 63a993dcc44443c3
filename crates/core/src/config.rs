//! 설정 관리 — featsync.toml 파싱 및 런타임 설정
//!
//! [`FeatsyncConfig`]는 데몬과 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`FEATSYNC_LIFECYCLE_READINESS_TIMEOUT_SECS=60` 형식)
//! 3. 설정 파일 (`featsync.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), featsync_core::error::FeatsyncError> {
//! use featsync_core::config::FeatsyncConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = FeatsyncConfig::load("featsync.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = FeatsyncConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, FeatsyncError};
use crate::types::TestModeGate;

/// Featsync 통합 설정
///
/// `featsync.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatsyncConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 메트릭 엔드포인트 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 서버 생명주기 설정
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// 기능 카탈로그
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// 관리 대상 서버 목록
    #[serde(default, rename = "server")]
    pub servers: Vec<ServerConfig>,
    /// 액션 디스크립터(패스) 목록
    #[serde(default, rename = "pass")]
    pub passes: Vec<PassConfig>,
}

impl FeatsyncConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, FeatsyncError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, FeatsyncError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FeatsyncError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                FeatsyncError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, FeatsyncError> {
        toml::from_str(toml_str).map_err(|e| {
            FeatsyncError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `FEATSYNC_{SECTION}_{FIELD}`
    /// 예: `FEATSYNC_LIFECYCLE_READINESS_TIMEOUT_SECS=60`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "FEATSYNC_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "FEATSYNC_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.data_dir, "FEATSYNC_GENERAL_DATA_DIR");

        // Metrics
        override_bool(&mut self.metrics.enabled, "FEATSYNC_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "FEATSYNC_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "FEATSYNC_METRICS_PORT");

        // Lifecycle
        override_u64(
            &mut self.lifecycle.readiness_timeout_secs,
            "FEATSYNC_LIFECYCLE_READINESS_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.lifecycle.readiness_poll_interval_ms,
            "FEATSYNC_LIFECYCLE_READINESS_POLL_INTERVAL_MS",
        );
        override_usize(
            &mut self.lifecycle.evidence_lines,
            "FEATSYNC_LIFECYCLE_EVIDENCE_LINES",
        );
        override_bool(
            &mut self.lifecycle.retry_on_timeout,
            "FEATSYNC_LIFECYCLE_RETRY_ON_TIMEOUT",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), FeatsyncError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // lifecycle 검증
        if self.lifecycle.readiness_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "lifecycle.readiness_timeout_secs".to_owned(),
                reason: "must be greater than zero".to_owned(),
            }
            .into());
        }
        if self.lifecycle.readiness_poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "lifecycle.readiness_poll_interval_ms".to_owned(),
                reason: "must be greater than zero".to_owned(),
            }
            .into());
        }

        // 서버 검증: ID는 비어 있지 않고 유일해야 함
        let mut seen = std::collections::BTreeSet::new();
        for server in &self.servers {
            if server.id.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "server.id".to_owned(),
                    reason: "server id must not be empty".to_owned(),
                }
                .into());
            }
            if !seen.insert(server.id.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "server.id".to_owned(),
                    reason: format!("duplicate server id '{}'", server.id),
                }
                .into());
            }
            if server.root_dir.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("server.{}.root_dir", server.id),
                    reason: "root_dir must not be empty".to_owned(),
                }
                .into());
            }
        }

        // 패스 검증: ID 유일성, 게이트 값
        let mut seen = std::collections::BTreeSet::new();
        for pass in &self.passes {
            if pass.id.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "pass.id".to_owned(),
                    reason: "pass id must not be empty".to_owned(),
                }
                .into());
            }
            if !seen.insert(pass.id.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "pass.id".to_owned(),
                    reason: format!("duplicate pass id '{}'", pass.id),
                }
                .into());
            }
            if TestModeGate::from_str_loose(&pass.gate).is_none() {
                return Err(ConfigError::InvalidValue {
                    field: format!("pass.{}.gate", pass.id),
                    reason: "must be one of: lite, full, quarantine".to_owned(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 데이터 디렉토리
    pub data_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            data_dir: "/var/lib/featsync".to_owned(),
        }
    }
}

/// 메트릭 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9590,
            endpoint: "/metrics".to_owned(),
        }
    }
}

/// 서버 생명주기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// 준비 신호 대기 타임아웃 (초)
    pub readiness_timeout_secs: u64,
    /// 준비 신호 폴링 간격 (밀리초)
    pub readiness_poll_interval_ms: u64,
    /// 실패 시 수집할 진단 로그 줄 수
    pub evidence_lines: usize,
    /// 타임아웃 시 2배 타임아웃으로 내부 1회 재시도 여부
    pub retry_on_timeout: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            readiness_timeout_secs: 30,
            readiness_poll_interval_ms: 500,
            evidence_lines: 40,
            retry_on_timeout: true,
        }
    }
}

/// 기능 카탈로그 설정
///
/// `{capability family -> [{version, min_runtime_level, supersedes}]}` 정적 테이블과
/// family 내 공존이 허용되는 기능 쌍(compatible) 목록입니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// capability family 목록
    pub families: Vec<FamilyConfig>,
    /// 같은 family라도 공존이 허용되는 기능 ID 쌍
    pub compatible: Vec<Vec<String>>,
}

/// 하나의 capability family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyConfig {
    /// family 이름 (예: `"jaxrs"`)
    pub name: String,
    /// 알려진 버전 목록
    #[serde(default)]
    pub versions: Vec<VersionConfig>,
}

/// family 내 하나의 버전
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionConfig {
    /// 버전 문자열 (예: `"3.0"`)
    pub version: String,
    /// 이 버전이 요구하는 최소 런타임 레벨
    #[serde(default)]
    pub min_runtime_level: u32,
    /// 이 버전이 대체(supersede)하는 이전 버전
    #[serde(default)]
    pub supersedes: Option<String>,
}

/// 관리 대상 서버
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 서버 식별자
    pub id: String,
    /// 호스트
    #[serde(default = "default_host")]
    pub host: String,
    /// 포트
    #[serde(default = "default_port")]
    pub port: u16,
    /// 서버가 보고하는 런타임 레벨
    #[serde(default = "default_runtime_level")]
    pub runtime_level: u32,
    /// 서버 루트 디렉토리 (설정 푸시/로그 조회 경로)
    pub root_dir: String,
    /// 현재 활성화된 기능 집합 (초기 캐시 뷰)
    #[serde(default)]
    pub features: Vec<String>,
}

fn default_host() -> String {
    "localhost".to_owned()
}

fn default_port() -> u16 {
    9080
}

fn default_runtime_level() -> u32 {
    8
}

/// 하나의 액션 디스크립터(패스) 정의
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassConfig {
    /// 디스크립터 식별자 (예: `"EE9_FEATURES"`)
    pub id: String,
    /// 추가할 기능 목록
    #[serde(default)]
    pub additions: Vec<String>,
    /// 제거할 기능 목록
    #[serde(default)]
    pub removals: Vec<String>,
    /// 요구 최소 런타임 레벨
    #[serde(default)]
    pub min_runtime_level: u32,
    /// 적용 대상 서버 ID (비어 있으면 전체)
    #[serde(default)]
    pub target_servers: Vec<String>,
    /// 테스트 패스 게이트 (lite, full, quarantine)
    #[serde(default = "default_gate")]
    pub gate: String,
}

fn default_gate() -> String {
    "lite".to_owned()
}

impl PassConfig {
    /// 게이트 문자열을 [`TestModeGate`]로 변환합니다.
    ///
    /// `validate()`를 통과한 설정에서는 항상 성공합니다.
    pub fn parsed_gate(&self) -> TestModeGate {
        TestModeGate::from_str_loose(&self.gate).unwrap_or_default()
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = FeatsyncConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert!(!config.metrics.enabled);
        assert_eq!(config.lifecycle.readiness_timeout_secs, 30);
        assert_eq!(config.lifecycle.evidence_lines, 40);
        assert!(config.lifecycle.retry_on_timeout);
        assert!(config.servers.is_empty());
        assert!(config.passes.is_empty());
    }

    #[test]
    fn default_config_passes_validation() {
        let config = FeatsyncConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = FeatsyncConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.lifecycle.readiness_timeout_secs, 30);
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[lifecycle]
readiness_timeout_secs = 60
"#;
        let config = FeatsyncConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.lifecycle.readiness_timeout_secs, 60);
        assert_eq!(config.lifecycle.readiness_poll_interval_ms, 500);
    }

    #[test]
    fn from_str_full_toml() {
        let toml = r#"
[general]
log_level = "warn"
log_format = "pretty"
data_dir = "/opt/featsync/data"

[metrics]
enabled = true
listen_addr = "0.0.0.0"
port = 9591

[lifecycle]
readiness_timeout_secs = 45
readiness_poll_interval_ms = 250
evidence_lines = 20
retry_on_timeout = false

[[catalog.families]]
name = "servlet"
[[catalog.families.versions]]
version = "4.0"
min_runtime_level = 7
[[catalog.families.versions]]
version = "5.0"
min_runtime_level = 8
supersedes = "4.0"

[[server]]
id = "jwtsso"
host = "localhost"
port = 8920
runtime_level = 8
root_dir = "/srv/servers/jwtsso"
features = ["servlet-4.0", "jsonp-1.1"]

[[pass]]
id = "EE9_FEATURES"
additions = ["servlet-5.0", "jsonp-2.0"]
removals = ["servlet-4.0", "jsonp-1.1"]
min_runtime_level = 8
gate = "lite"
"#;
        let config = FeatsyncConfig::parse(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.catalog.families.len(), 1);
        assert_eq!(config.catalog.families[0].versions.len(), 2);
        assert_eq!(
            config.catalog.families[0].versions[1].supersedes.as_deref(),
            Some("4.0")
        );
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0].port, 8920);
        assert_eq!(config.passes.len(), 1);
        assert_eq!(config.passes[0].parsed_gate(), TestModeGate::Lite);
        assert!(!config.lifecycle.retry_on_timeout);
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let result = FeatsyncConfig::parse("invalid = [[[toml");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            FeatsyncError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = FeatsyncConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = FeatsyncConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_zero_readiness_timeout() {
        let mut config = FeatsyncConfig::default();
        config.lifecycle.readiness_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("readiness_timeout_secs"));
    }

    #[test]
    fn validate_rejects_duplicate_server_ids() {
        let toml = r#"
[[server]]
id = "a"
root_dir = "/srv/a"

[[server]]
id = "a"
root_dir = "/srv/b"
"#;
        let config = FeatsyncConfig::parse(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate server id"));
    }

    #[test]
    fn validate_rejects_empty_server_root_dir() {
        let toml = r#"
[[server]]
id = "a"
root_dir = ""
"#;
        let config = FeatsyncConfig::parse(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("root_dir"));
    }

    #[test]
    fn validate_rejects_invalid_pass_gate() {
        let toml = r#"
[[pass]]
id = "EE9"
gate = "sometimes"
"#;
        let config = FeatsyncConfig::parse(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("gate"));
    }

    #[test]
    fn validate_rejects_duplicate_pass_ids() {
        let toml = r#"
[[pass]]
id = "EE9"

[[pass]]
id = "EE9"
"#;
        let config = FeatsyncConfig::parse(toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate pass id"));
    }

    #[test]
    #[serial]
    fn env_override_lifecycle_timeout() {
        let mut config = FeatsyncConfig::default();
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("FEATSYNC_LIFECYCLE_READINESS_TIMEOUT_SECS", "90") };
        config.apply_env_overrides();
        assert_eq!(config.lifecycle.readiness_timeout_secs, 90);
        unsafe { std::env::remove_var("FEATSYNC_LIFECYCLE_READINESS_TIMEOUT_SECS") };
    }

    #[test]
    #[serial]
    fn env_override_invalid_value_keeps_original() {
        let mut config = FeatsyncConfig::default();
        // SAFETY: 테스트는 단일 스레드에서 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("FEATSYNC_METRICS_PORT", "not-a-port") };
        config.apply_env_overrides();
        assert_eq!(config.metrics.port, 9590);
        unsafe { std::env::remove_var("FEATSYNC_METRICS_PORT") };
    }

    #[test]
    #[serial]
    fn env_override_missing_var_keeps_original() {
        let mut config = FeatsyncConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = FeatsyncConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = FeatsyncConfig::parse(&toml_str).unwrap();
        assert_eq!(config.general.log_level, parsed.general.log_level);
        assert_eq!(
            config.lifecycle.readiness_timeout_secs,
            parsed.lifecycle.readiness_timeout_secs
        );
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = FeatsyncConfig::from_file("/nonexistent/path/featsync.toml").await;
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            FeatsyncError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
