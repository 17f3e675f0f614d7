//! 모니터 오케스트레이션 -- 엔진 구성과 이벤트 소스 태스크의 생명주기를 관리합니다.
//!
//! [`LogMonitor`]는 core의 [`Pipeline`](surimon_core::pipeline::Pipeline) trait을 구현하여
//! `surimon-daemon`에서 start/stop/health_check 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! notify watcher --+
//!                  +--> MonitorEngine (Mutex<MonitorState>) --> AuditLog / FirewallClient
//! poll interval ---+
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use surimon_core::config::FirewallConfig;
use surimon_core::error::{PipelineError, SurimonError};
use surimon_core::pipeline::{HealthStatus, Pipeline};
use surimon_firewall::{FirewallClient, SystemFirewall};

use crate::collector::{poll, watch};
use crate::config::PipelineConfig;
use crate::engine::MonitorEngine;
use crate::error::LogPipelineError;

/// 정지 시 태스크 종료를 기다리는 최대 시간
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// 모니터 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorLifecycle {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 로그 모니터 -- 테일링/분류/차단의 전체 흐름을 관리합니다.
///
/// # 사용 예시
/// ```ignore
/// use surimon_log_pipeline::{LogMonitorBuilder, PipelineConfig};
///
/// let mut monitor = LogMonitorBuilder::new()
///     .config(PipelineConfig::from_core(&config.monitor))
///     .firewall(SystemFirewall::from_config(&config.firewall))
///     .build()?;
///
/// monitor.start().await?;
/// ```
pub struct LogMonitor<F: FirewallClient = SystemFirewall> {
    config: PipelineConfig,
    firewall: Arc<F>,
    lifecycle: MonitorLifecycle,
    engine: Option<Arc<MonitorEngine<F>>>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl<F: FirewallClient> LogMonitor<F> {
    /// 현재 상태를 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.lifecycle {
            MonitorLifecycle::Initialized => "initialized",
            MonitorLifecycle::Running => "running",
            MonitorLifecycle::Stopped => "stopped",
        }
    }

    /// 모니터 설정
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 실행 중인 엔진. 시작 전에는 `None`.
    pub fn engine(&self) -> Option<&Arc<MonitorEngine<F>>> {
        self.engine.as_ref()
    }

    /// 로드된 규칙 수 (시작 전에는 0)
    pub fn rule_count(&self) -> usize {
        self.engine.as_ref().map_or(0, |e| e.rule_count())
    }

    /// 실행 중인 백그라운드 태스크 수
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl<F: FirewallClient> Pipeline for LogMonitor<F> {
    async fn start(&mut self) -> Result<(), SurimonError> {
        if self.lifecycle == MonitorLifecycle::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        info!(
            directory = %self.config.log_directory,
            output = %self.config.output_log,
            interval_ms = self.config.poll_interval_ms,
            "starting log monitor"
        );

        // 1. 엔진 구성 (감사 로그 준비, 규칙 로드)
        let engine = Arc::new(
            MonitorEngine::from_config(&self.config, Arc::clone(&self.firewall))
                .await
                .map_err(SurimonError::from)?,
        );

        // 2. 기존 파일을 현재 크기로 등록
        engine.initial_scan().await;

        // 3. 이벤트 소스 태스크 스폰
        self.cancel = CancellationToken::new();
        if self.config.notify {
            match watch::spawn(
                Arc::clone(&engine),
                self.config.event_channel_capacity,
                self.cancel.clone(),
            ) {
                Ok(Some(handle)) => self.tasks.push(handle),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "failed to start file watcher, polling only"),
            }
        }
        self.tasks.push(poll::spawn(
            Arc::clone(&engine),
            self.config.poll_interval(),
            self.cancel.clone(),
        ));

        self.engine = Some(engine);
        self.lifecycle = MonitorLifecycle::Running;
        info!(tasks = self.tasks.len(), rules = self.rule_count(), "log monitor started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), SurimonError> {
        if self.lifecycle != MonitorLifecycle::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping log monitor");
        self.cancel.cancel();

        // 진행 중인 패스는 마무리, 대기 중인 이벤트는 버림
        for task in self.tasks.drain(..) {
            let abort = task.abort_handle();
            if tokio::time::timeout(STOP_TIMEOUT, task).await.is_err() {
                warn!("monitor task did not stop in time, aborting");
                abort.abort();
            }
        }

        self.lifecycle = MonitorLifecycle::Stopped;
        info!("log monitor stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match (self.lifecycle, &self.engine) {
            (MonitorLifecycle::Running, Some(engine)) => {
                if engine.discovery().directory_missing() {
                    HealthStatus::Degraded(format!(
                        "watched directory missing: {}",
                        engine.discovery().directory().display()
                    ))
                } else if engine.audit().is_console_only() {
                    HealthStatus::Degraded("audit log is console-only".to_owned())
                } else {
                    HealthStatus::Healthy
                }
            }
            (MonitorLifecycle::Running, None) => {
                HealthStatus::Unhealthy("engine not initialized".to_owned())
            }
            (MonitorLifecycle::Initialized, _) => HealthStatus::Unhealthy("not started".to_owned()),
            (MonitorLifecycle::Stopped, _) => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 로그 모니터 빌더
pub struct LogMonitorBuilder<F: FirewallClient = SystemFirewall> {
    config: PipelineConfig,
    firewall: F,
}

impl LogMonitorBuilder<SystemFirewall> {
    /// 기본 설정과 기본 방화벽(`iptables`)으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            firewall: SystemFirewall::from_config(&FirewallConfig::default()),
        }
    }
}

impl Default for LogMonitorBuilder<SystemFirewall> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FirewallClient> LogMonitorBuilder<F> {
    /// 모니터 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 방화벽 클라이언트를 지정합니다.
    pub fn firewall<G: FirewallClient>(self, firewall: G) -> LogMonitorBuilder<G> {
        LogMonitorBuilder {
            config: self.config,
            firewall,
        }
    }

    /// 모니터를 빌드합니다.
    ///
    /// # Errors
    /// 설정 검증에 실패한 경우
    pub fn build(self) -> Result<LogMonitor<F>, LogPipelineError> {
        self.config.validate()?;

        Ok(LogMonitor {
            config: self.config,
            firewall: Arc::new(self.firewall),
            lifecycle: MonitorLifecycle::Initialized,
            engine: None,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfigBuilder;

    fn dry_run() -> SystemFirewall {
        SystemFirewall::from_config(&FirewallConfig {
            enabled: false,
            ..FirewallConfig::default()
        })
    }

    #[test]
    fn builder_creates_monitor() {
        let monitor = LogMonitorBuilder::new().build().unwrap();
        assert_eq!(monitor.state_name(), "initialized");
        assert_eq!(monitor.rule_count(), 0);
        assert!(monitor.engine().is_none());
    }

    #[test]
    fn builder_with_invalid_config_fails() {
        let mut config = PipelineConfig::default();
        config.flood_threshold = 0;
        assert!(LogMonitorBuilder::new().config(config).build().is_err());
    }

    #[tokio::test]
    async fn lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfigBuilder::new()
            .log_directory(dir.path())
            .output_log(dir.path().join("out").join("suricata-monitor.log"))
            .poll_interval_ms(20)
            .notify(false)
            .build()
            .unwrap();
        let mut monitor = LogMonitorBuilder::new()
            .config(config)
            .firewall(dry_run())
            .build()
            .unwrap();

        assert!(monitor.health_check().await.is_unhealthy());
        assert!(monitor.stop().await.is_err());

        monitor.start().await.unwrap();
        assert_eq!(monitor.state_name(), "running");
        assert!(monitor.health_check().await.is_healthy());
        assert_eq!(monitor.task_count(), 1);
        assert!(monitor.start().await.is_err());

        monitor.stop().await.unwrap();
        assert_eq!(monitor.state_name(), "stopped");
        assert!(monitor.health_check().await.is_unhealthy());
        assert_eq!(monitor.task_count(), 0);
    }

    #[tokio::test]
    async fn missing_directory_degrades_health() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfigBuilder::new()
            .log_directory(dir.path().join("absent"))
            .output_log(dir.path().join("suricata-monitor.log"))
            .build()
            .unwrap();
        let mut monitor = LogMonitorBuilder::new()
            .config(config)
            .firewall(dry_run())
            .build()
            .unwrap();

        // 디렉토리가 없어도 시작은 성공
        monitor.start().await.unwrap();
        assert!(matches!(
            monitor.health_check().await,
            HealthStatus::Degraded(_)
        ));
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn console_only_audit_degrades_health() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let config = PipelineConfigBuilder::new()
            .log_directory(dir.path())
            .output_log(blocker.join("sub").join("audit.log"))
            .notify(false)
            .build()
            .unwrap();
        let mut monitor = LogMonitorBuilder::new()
            .config(config)
            .firewall(dry_run())
            .build()
            .unwrap();

        monitor.start().await.unwrap();
        assert_eq!(
            monitor.health_check().await,
            HealthStatus::Degraded("audit log is console-only".to_owned())
        );
        monitor.stop().await.unwrap();
    }
}
