//! 설정 관리 — hostwatch.toml 파싱 및 런타임 설정
//!
//! [`HostwatchConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`HOSTWATCH_NETWORK_ENABLED=true` 형식)
//! 3. 설정 파일 (`hostwatch.toml`)
//! 4. 기본값 (`Default` 구현 — 세 모듈 모두 활성화)
//!
//! 설정 파일이 없거나 파싱할 수 없으면 기동을 실패시키지 않고
//! 기본값으로 대체합니다 ([`HostwatchConfig::load_or_default`]).

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, HostwatchError};

/// Hostwatch 통합 설정
///
/// `hostwatch.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostwatchConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 네트워크 모니터 설정
    #[serde(default)]
    pub network: NetworkConfig,
    /// 파일 모니터 설정
    #[serde(default)]
    pub file_monitor: FileMonitorConfig,
    /// 정적 분석 설정
    #[serde(default)]
    pub static_analysis: StaticAnalysisConfig,
    /// 알림 로그/전달 설정
    #[serde(default)]
    pub alerts: AlertConfig,
}

impl HostwatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HostwatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정을 로드하되, 실패 시 기본값으로 대체합니다.
    ///
    /// 파일이 없거나 파싱/검증에 실패해도 기동을 막지 않습니다.
    /// 기본값은 세 모듈을 모두 활성화합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path).await {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to load config, using default configuration"
                );
                let mut config = Self::default();
                config.apply_env_overrides();
                config
            }
        }
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, HostwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HostwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                HostwatchError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, HostwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            HostwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `HOSTWATCH_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "HOSTWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "HOSTWATCH_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.data_dir, "HOSTWATCH_GENERAL_DATA_DIR");
        override_string(&mut self.general.pid_file, "HOSTWATCH_GENERAL_PID_FILE");

        // Network
        override_bool(&mut self.network.enabled, "HOSTWATCH_NETWORK_ENABLED");
        override_u64(
            &mut self.network.flush_every_packets,
            "HOSTWATCH_NETWORK_FLUSH_EVERY_PACKETS",
        );
        override_csv(
            &mut self.network.benign_domains,
            "HOSTWATCH_NETWORK_BENIGN_DOMAINS",
        );
        override_csv(
            &mut self.network.benign_hosts,
            "HOSTWATCH_NETWORK_BENIGN_HOSTS",
        );

        // File monitor
        override_bool(
            &mut self.file_monitor.enabled,
            "HOSTWATCH_FILE_MONITOR_ENABLED",
        );
        override_csv(
            &mut self.file_monitor.watch_paths,
            "HOSTWATCH_FILE_MONITOR_WATCH_PATHS",
        );
        override_csv(
            &mut self.file_monitor.excluded_paths,
            "HOSTWATCH_FILE_MONITOR_EXCLUDED_PATHS",
        );
        override_csv(
            &mut self.file_monitor.alert_on,
            "HOSTWATCH_FILE_MONITOR_ALERT_ON",
        );

        // Static analysis
        override_bool(
            &mut self.static_analysis.enabled,
            "HOSTWATCH_STATIC_ANALYSIS_ENABLED",
        );
        override_usize(
            &mut self.static_analysis.queue_capacity,
            "HOSTWATCH_STATIC_ANALYSIS_QUEUE_CAPACITY",
        );

        // Alerts
        override_string(&mut self.alerts.log_path, "HOSTWATCH_ALERTS_LOG_PATH");
        override_string(
            &mut self.alerts.collector_url,
            "HOSTWATCH_ALERTS_COLLECTOR_URL",
        );
        override_bool(
            &mut self.alerts.forward_enabled,
            "HOSTWATCH_ALERTS_FORWARD_ENABLED",
        );
        override_u64(
            &mut self.alerts.poll_interval_secs,
            "HOSTWATCH_ALERTS_POLL_INTERVAL_SECS",
        );
        override_bool(&mut self.alerts.fail_open, "HOSTWATCH_ALERTS_FAIL_OPEN");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), HostwatchError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.network.enabled && self.network.flush_every_packets == 0 {
            return Err(ConfigError::InvalidValue {
                field: "network.flush_every_packets".to_owned(),
                reason: "must be at least 1".to_owned(),
            }
            .into());
        }

        if self.file_monitor.enabled {
            for entry in &self.file_monitor.alert_on {
                if crate::event::ChangeKind::from_config_key(entry).is_none() {
                    return Err(ConfigError::InvalidValue {
                        field: "file_monitor.alert_on".to_owned(),
                        reason: format!(
                            "unknown event type '{entry}', expected file_creation, \
                             file_modification or file_deletion"
                        ),
                    }
                    .into());
                }
            }
        }

        if self.static_analysis.enabled && self.static_analysis.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "static_analysis.queue_capacity".to_owned(),
                reason: "must be at least 1".to_owned(),
            }
            .into());
        }

        if self.alerts.log_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "alerts.log_path".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.alerts.forward_enabled && self.alerts.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "alerts.poll_interval_secs".to_owned(),
                reason: "must be at least 1".to_owned(),
            }
            .into());
        }

        Ok(())
    }

    /// 설정에서 활성화된 모듈 여부를 모듈명으로 조회합니다.
    pub fn module_enabled(&self, name: &str) -> bool {
        match name {
            crate::event::MODULE_NETWORK => self.network.enabled,
            crate::event::MODULE_STATIC => self.static_analysis.enabled,
            crate::event::MODULE_FILE => self.file_monitor.enabled,
            _ => false,
        }
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
    /// PID 파일 경로 (빈 문자열이면 기록하지 않음)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            data_dir: "/var/lib/hostwatch".to_owned(),
            pid_file: String::new(),
        }
    }
}

/// 네트워크 모니터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 통계를 저장소로 플러시하는 패킷 주기
    pub flush_every_packets: u64,
    /// 오탐 게이트의 양성 도메인 접미사 목록
    pub benign_domains: Vec<String>,
    /// 오탐 게이트의 양성 호스트 목록
    pub benign_hosts: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            flush_every_packets: 10,
            benign_domains: vec![
                "windowsupdate.com".to_owned(),
                "microsoft.com".to_owned(),
                "ubuntu.com".to_owned(),
                "debian.org".to_owned(),
            ],
            benign_hosts: vec!["localhost".to_owned()],
        }
    }
}

/// 파일 모니터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMonitorConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 감시 경로 목록
    pub watch_paths: Vec<String>,
    /// 제외 경로 접두사 목록
    pub excluded_paths: Vec<String>,
    /// 알림을 발생시킬 이벤트 종류
    pub alert_on: Vec<String>,
}

impl Default for FileMonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            watch_paths: Vec::new(),
            excluded_paths: Vec::new(),
            alert_on: vec![
                "file_creation".to_owned(),
                "file_modification".to_owned(),
                "file_deletion".to_owned(),
            ],
        }
    }
}

/// 정적 분석 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticAnalysisConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 분석 작업 큐 용량
    pub queue_capacity: usize,
}

impl Default for StaticAnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: 256,
        }
    }
}

/// 알림 로그/전달 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// 내구 알림 로그 경로
    pub log_path: String,
    /// 원격 수집기 엔드포인트
    pub collector_url: String,
    /// 전달 루프 활성화 여부
    pub forward_enabled: bool,
    /// 로그 폴링 주기 (초)
    pub poll_interval_secs: u64,
    /// 게이트 내부 오류 시 알림을 통과시킬지 여부
    ///
    /// `true`(기본값)면 정책 오류가 알림을 삼키지 않습니다.
    pub fail_open: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            log_path: "/var/lib/hostwatch/alerts.jsonl".to_owned(),
            collector_url: "http://localhost:5000/api/alerts".to_owned(),
            forward_enabled: true,
            poll_interval_secs: 1,
            fail_open: true,
        }
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

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}
