//! 서버 핸들 -- 관리 대상 서버의 정체성과 상태
//!
//! [`ServerHandle`]은 하나의 관리 대상 서버에 대한 데몬 측 뷰입니다.
//! `apply` 중에는 담당 컨트롤러만 상태와 기능 캐시를 갱신합니다
//! (단일 작성자 규율). 그 외 구간에서는 읽기 전용입니다.

use std::path::PathBuf;

use featsync_core::config::ServerConfig;
use featsync_core::types::{FeatureSet, ServerState};

/// 관리 대상 서버 핸들
#[derive(Debug, Clone)]
pub struct ServerHandle {
    /// 서버 식별자
    pub id: String,
    /// 호스트
    pub host: String,
    /// 포트
    pub port: u16,
    /// 서버가 보고하는 런타임 레벨
    pub runtime_level: u32,
    /// 서버 루트 디렉토리
    pub root_dir: PathBuf,
    /// 실행 상태
    pub state: ServerState,
    /// 활성 기능 집합의 캐시된 뷰 (apply 성공 시에만 갱신)
    pub features: FeatureSet,
    /// 이 핸들에 대해 tidy가 이미 수행되었는지 여부
    pub tidied: bool,
}

impl ServerHandle {
    /// `[[server]]` 설정 테이블에서 핸들을 생성합니다.
    ///
    /// 초기 상태는 `Stopped`입니다 — 실제 상태는 첫 apply의 probe로 확인됩니다.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            id: config.id.clone(),
            host: config.host.clone(),
            port: config.port,
            runtime_level: config.runtime_level,
            root_dir: PathBuf::from(&config.root_dir),
            state: ServerState::Stopped,
            features: config.features.iter().cloned().collect(),
            tidied: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_populates_handle() {
        let config = ServerConfig {
            id: "jwtsso".to_owned(),
            host: "localhost".to_owned(),
            port: 8920,
            runtime_level: 8,
            root_dir: "/srv/servers/jwtsso".to_owned(),
            features: vec!["servlet-4.0".to_owned(), "jsonp-1.1".to_owned()],
        };
        let handle = ServerHandle::from_config(&config);
        assert_eq!(handle.id, "jwtsso");
        assert_eq!(handle.state, ServerState::Stopped);
        assert_eq!(handle.features.len(), 2);
        assert!(handle.features.contains("jsonp-1.1"));
        assert!(!handle.tidied);
    }
}
