//! 설정 관리: surimon.toml 파싱 및 런타임 설정
//!
//! [`SurimonConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SURIMON_MONITOR_LOG_DIRECTORY=/var/log/suricata` 형식)
//! 3. 설정 파일 (`surimon.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), surimon_core::error::SurimonError> {
//! use surimon_core::config::SurimonConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = SurimonConfig::load("surimon.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = SurimonConfig::parse("[monitor]\nflood_threshold = 20")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, SurimonError};

/// surimon 통합 설정
///
/// `surimon.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurimonConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 로그 모니터 설정
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// 방화벽 설정
    #[serde(default)]
    pub firewall: FirewallConfig,
    /// 메트릭 엔드포인트 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl SurimonConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SurimonError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일 없이 기본값에 환경변수 오버라이드만 적용합니다.
    pub fn from_env() -> Result<Self, SurimonError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SurimonError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SurimonError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                SurimonError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, SurimonError> {
        toml::from_str(toml_str).map_err(|e| {
            SurimonError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SURIMON_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SURIMON_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SURIMON_GENERAL_LOG_FORMAT");

        // Monitor
        override_string(
            &mut self.monitor.log_directory,
            "SURIMON_MONITOR_LOG_DIRECTORY",
        );
        override_string(&mut self.monitor.output_log, "SURIMON_MONITOR_OUTPUT_LOG");
        override_u64(&mut self.monitor.interval_ms, "SURIMON_MONITOR_INTERVAL_MS");
        override_csv(&mut self.monitor.exclude, "SURIMON_MONITOR_EXCLUDE");
        override_csv(&mut self.monitor.extensions, "SURIMON_MONITOR_EXTENSIONS");
        override_csv(&mut self.monitor.file_names, "SURIMON_MONITOR_FILE_NAMES");
        override_string(&mut self.monitor.rule_file, "SURIMON_MONITOR_RULE_FILE");
        override_u64(
            &mut self.monitor.flood_threshold,
            "SURIMON_MONITOR_FLOOD_THRESHOLD",
        );
        override_bool(&mut self.monitor.notify, "SURIMON_MONITOR_NOTIFY");

        // Firewall
        override_bool(&mut self.firewall.enabled, "SURIMON_FIREWALL_ENABLED");
        override_string(&mut self.firewall.binary, "SURIMON_FIREWALL_BINARY");
        override_string(&mut self.firewall.binary_v6, "SURIMON_FIREWALL_BINARY_V6");
        override_string(&mut self.firewall.chain, "SURIMON_FIREWALL_CHAIN");

        // Metrics
        override_bool(&mut self.metrics.enabled, "SURIMON_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "SURIMON_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "SURIMON_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SurimonError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.monitor.log_directory.trim().is_empty() {
            return Err(invalid("monitor.log_directory", "must not be empty"));
        }

        if self.monitor.interval_ms == 0 {
            return Err(invalid("monitor.interval_ms", "must be greater than 0"));
        }

        if self.monitor.flood_threshold == 0 {
            return Err(invalid("monitor.flood_threshold", "must be greater than 0"));
        }

        if self.monitor.file_names.is_empty() && self.monitor.extensions.is_empty() {
            return Err(invalid(
                "monitor.extensions",
                "at least one extension is required when file_names is empty",
            ));
        }

        if self.firewall.enabled {
            if self.firewall.binary.trim().is_empty() {
                return Err(invalid("firewall.binary", "must not be empty when enabled"));
            }
            if self.firewall.chain.trim().is_empty() {
                return Err(invalid("firewall.chain", "must not be empty when enabled"));
            }
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid("metrics.port", "must be greater than 0 when enabled"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> SurimonError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 로그 모니터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 감시할 Suricata 로그 디렉토리
    pub log_directory: String,
    /// 감사 로그 경로 (빈 문자열이면 콘솔 전용)
    pub output_log: String,
    /// 주기적 폴링 간격 (밀리초)
    pub interval_ms: u64,
    /// 감시에서 제외할 파일 basename 목록
    pub exclude: Vec<String>,
    /// 추적할 파일 확장자 (점 없이)
    pub extensions: Vec<String>,
    /// 고정 파일명 목록 (비어있지 않으면 확장자 대신 사용, 예: fast.log)
    pub file_names: Vec<String>,
    /// 규칙 파일 경로 (빈 문자열이면 규칙 없음)
    pub rule_file: String,
    /// ICMP echo flood 임계값 (이 값을 초과하면 차단)
    pub flood_threshold: u64,
    /// 파일시스템 변경 알림 사용 여부 (false면 폴링만)
    pub notify: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_directory: "/var/log/suricata".to_owned(),
            output_log: "/var/log/suricata-all/suricata-monitor.log".to_owned(),
            interval_ms: 1000,
            exclude: vec!["suricata-monitor.log".to_owned()],
            extensions: vec!["log".to_owned(), "json".to_owned(), "eve".to_owned()],
            file_names: Vec::new(),
            rule_file: String::new(),
            flood_threshold: 10,
            notify: true,
        }
    }
}

/// 방화벽 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallConfig {
    /// 실제 차단 여부 (false면 dry-run: 명령을 로그로만 남김)
    pub enabled: bool,
    /// IPv4 방화벽 명령
    pub binary: String,
    /// IPv6 방화벽 명령
    pub binary_v6: String,
    /// 차단 규칙을 삽입할 체인
    pub chain: String,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: "iptables".to_owned(),
            binary_v6: "ip6tables".to_owned(),
            chain: "INPUT".to_owned(),
        }
    }
}

/// 메트릭 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9184,
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

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = SurimonConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.monitor.log_directory, "/var/log/suricata");
        assert_eq!(config.monitor.interval_ms, 1000);
        assert_eq!(config.monitor.flood_threshold, 10);
        assert_eq!(config.monitor.extensions, vec!["log", "json", "eve"]);
        assert!(config.monitor.exclude.contains(&"suricata-monitor.log".to_owned()));
        assert!(config.firewall.enabled);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        SurimonConfig::default().validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = SurimonConfig::parse("").unwrap();
        assert_eq!(config.monitor.flood_threshold, 10);
        assert_eq!(config.firewall.chain, "INPUT");
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[monitor]
log_directory = "/tmp/suricata"
file_names = ["fast.log"]
flood_threshold = 25
"#;
        let config = SurimonConfig::parse(toml).unwrap();
        assert_eq!(config.monitor.log_directory, "/tmp/suricata");
        assert_eq!(config.monitor.file_names, vec!["fast.log"]);
        assert_eq!(config.monitor.flood_threshold, 25);
        // interval_ms는 기본값 유지
        assert_eq!(config.monitor.interval_ms, 1000);
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let err = SurimonConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            SurimonError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = SurimonConfig::default();
        config.monitor.interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("interval_ms"));
    }

    #[test]
    fn validate_rejects_zero_threshold() {
        let mut config = SurimonConfig::default();
        config.monitor.flood_threshold = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("flood_threshold"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = SurimonConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_requires_extensions_without_file_names() {
        let mut config = SurimonConfig::default();
        config.monitor.extensions.clear();
        assert!(config.validate().is_err());

        config.monitor.file_names = vec!["fast.log".to_owned()];
        config.validate().unwrap();
    }

    #[test]
    fn validate_skips_firewall_fields_when_disabled() {
        let mut config = SurimonConfig::default();
        config.firewall.enabled = false;
        config.firewall.binary = String::new();
        config.validate().unwrap();
    }

    #[test]
    #[serial]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: serial_test로 환경변수 접근을 직렬화합니다.
        unsafe { std::env::set_var("TEST_SURIMON_STR", "overridden") };
        override_string(&mut val, "TEST_SURIMON_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_SURIMON_STR") };
    }

    #[test]
    #[serial]
    fn env_override_u64_invalid_keeps_original() {
        let mut val = 10;
        // SAFETY: serial_test로 환경변수 접근을 직렬화합니다.
        unsafe { std::env::set_var("TEST_SURIMON_U64_BAD", "ten") };
        override_u64(&mut val, "TEST_SURIMON_U64_BAD");
        assert_eq!(val, 10);
        unsafe { std::env::remove_var("TEST_SURIMON_U64_BAD") };
    }

    #[test]
    #[serial]
    fn env_override_csv_drops_empty_items() {
        let mut val = vec!["a".to_owned()];
        // SAFETY: serial_test로 환경변수 접근을 직렬화합니다.
        unsafe { std::env::set_var("TEST_SURIMON_CSV", "x.log, ,y.log,") };
        override_csv(&mut val, "TEST_SURIMON_CSV");
        assert_eq!(val, vec!["x.log", "y.log"]);
        unsafe { std::env::remove_var("TEST_SURIMON_CSV") };
    }

    #[test]
    #[serial]
    fn from_env_applies_monitor_overrides() {
        // SAFETY: serial_test로 환경변수 접근을 직렬화합니다.
        unsafe { std::env::set_var("SURIMON_MONITOR_FLOOD_THRESHOLD", "42") };
        let config = SurimonConfig::from_env().unwrap();
        assert_eq!(config.monitor.flood_threshold, 42);
        unsafe { std::env::remove_var("SURIMON_MONITOR_FLOOD_THRESHOLD") };
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = SurimonConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = SurimonConfig::parse(&toml_str).unwrap();
        assert_eq!(config.monitor.output_log, parsed.monitor.output_log);
        assert_eq!(config.firewall.binary_v6, parsed.firewall.binary_v6);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = SurimonConfig::from_file("/nonexistent/path/surimon.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SurimonError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
