//! 로그 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`MonitorConfig`](surimon_core::config::MonitorConfig)를
//! 기반으로 모니터 내부에서 사용하는 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use surimon_core::config::SurimonConfig;
//! use surimon_log_pipeline::config::PipelineConfig;
//!
//! let core_config = SurimonConfig::default();
//! let config = PipelineConfig::from_core(&core_config.monitor);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use surimon_core::config::MonitorConfig;

use crate::error::LogPipelineError;

/// 기본 감사 로그 파일명. 설정과 무관하게 항상 감시에서 제외됩니다.
pub const DEFAULT_AUDIT_FILE_NAME: &str = "suricata-monitor.log";

/// 로그 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 감시 디렉토리
    pub log_directory: String,
    /// 감사 로그 경로 (빈 문자열이면 콘솔 전용)
    pub output_log: String,
    /// 주기적 폴링 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// 제외할 파일 basename
    pub exclude: Vec<String>,
    /// 추적할 확장자
    pub extensions: Vec<String>,
    /// 고정 파일명 목록
    pub file_names: Vec<String>,
    /// 규칙 파일 경로 (빈 문자열이면 규칙 없음)
    pub rule_file: String,
    /// flood 임계값
    pub flood_threshold: u64,
    /// 파일시스템 변경 알림 사용 여부
    pub notify: bool,
    /// 알림 이벤트 채널 용량
    pub event_channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_core(&MonitorConfig::default())
    }
}

impl PipelineConfig {
    /// core의 `MonitorConfig`에서 파이프라인 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &MonitorConfig) -> Self {
        Self {
            log_directory: core.log_directory.clone(),
            output_log: core.output_log.clone(),
            poll_interval_ms: core.interval_ms,
            exclude: core.exclude.clone(),
            extensions: core.extensions.clone(),
            file_names: core.file_names.clone(),
            rule_file: core.rule_file.clone(),
            flood_threshold: core.flood_threshold,
            notify: core.notify,
            event_channel_capacity: 1024,
        }
    }

    /// 감시 디렉토리 경로
    pub fn log_directory(&self) -> &Path {
        Path::new(&self.log_directory)
    }

    /// 감사 로그 경로. 설정되지 않았으면 `None`.
    pub fn audit_path(&self) -> Option<PathBuf> {
        let trimmed = self.output_log.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    /// 규칙 파일 경로. 설정되지 않았으면 `None`.
    pub fn rule_path(&self) -> Option<PathBuf> {
        let trimmed = self.rule_file.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    /// 폴링 간격
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        const MAX_POLL_INTERVAL_MS: u64 = 3_600_000; // 1 hour

        if self.log_directory.trim().is_empty() {
            return Err(LogPipelineError::Config {
                field: "log_directory".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(LogPipelineError::Config {
                field: "poll_interval_ms".to_owned(),
                reason: format!("must be 1-{MAX_POLL_INTERVAL_MS}"),
            });
        }

        if self.flood_threshold == 0 {
            return Err(LogPipelineError::Config {
                field: "flood_threshold".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.file_names.is_empty() && self.extensions.is_empty() {
            return Err(LogPipelineError::Config {
                field: "extensions".to_owned(),
                reason: "at least one extension is required when file_names is empty".to_owned(),
            });
        }

        if self.event_channel_capacity == 0 {
            return Err(LogPipelineError::Config {
                field: "event_channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 감시 디렉토리를 설정합니다.
    pub fn log_directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.log_directory = dir.as_ref().display().to_string();
        self
    }

    /// 감사 로그 경로를 설정합니다. 빈 경로는 콘솔 전용을 뜻합니다.
    pub fn output_log(mut self, path: impl AsRef<Path>) -> Self {
        self.config.output_log = path.as_ref().display().to_string();
        self
    }

    /// 폴링 간격(밀리초)을 설정합니다.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// 제외 목록을 설정합니다.
    pub fn exclude(mut self, names: Vec<String>) -> Self {
        self.config.exclude = names;
        self
    }

    /// 추적할 확장자를 설정합니다.
    pub fn extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.extensions = extensions;
        self
    }

    /// 고정 파일명 목록을 설정합니다.
    pub fn file_names(mut self, names: Vec<String>) -> Self {
        self.config.file_names = names;
        self
    }

    /// 규칙 파일 경로를 설정합니다.
    pub fn rule_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config.rule_file = path.as_ref().display().to_string();
        self
    }

    /// flood 임계값을 설정합니다.
    pub fn flood_threshold(mut self, threshold: u64) -> Self {
        self.config.flood_threshold = threshold;
        self
    }

    /// 파일시스템 변경 알림 사용 여부를 설정합니다.
    pub fn notify(mut self, enabled: bool) -> Self {
        self.config.notify = enabled;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, LogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
