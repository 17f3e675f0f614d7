//! Daemon assembly and lifecycle management.
//!
//! The [`Daemon`] resolves the layered configuration, installs the optional
//! metrics exporter, builds the [`LogMonitor`] with the configured firewall
//! and runs until a shutdown signal arrives.
//!
//! # Configuration precedence
//!
//! CLI flags > `SURIMON_*` environment variables > config file > built-in defaults

use std::time::Duration;

use anyhow::Result;

use surimon_core::config::SurimonConfig;
use surimon_core::pipeline::{HealthStatus, Pipeline};
use surimon_firewall::SystemFirewall;
use surimon_log_pipeline::{LogMonitor, LogMonitorBuilder, PipelineConfig};

use crate::cli::DaemonCli;
use crate::metrics_server;

/// Interval between health reports in the log.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Resolve the effective configuration for a CLI invocation.
///
/// Loads the config file when `--config` is given (a missing file is an
/// error), then applies environment overrides, then CLI flags, and finally
/// validates the result.
pub async fn load_config(cli: &DaemonCli) -> Result<SurimonConfig> {
    let mut config = match &cli.config {
        Some(path) => SurimonConfig::from_file(path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {e}"))?,
        None => SurimonConfig::default(),
    };
    config.apply_env_overrides();
    cli.apply_overrides(&mut config)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {e}"))?;
    Ok(config)
}

/// The surimon daemon.
pub struct Daemon {
    config: SurimonConfig,
    monitor: LogMonitor<SystemFirewall>,
}

impl Daemon {
    /// Build the daemon from an already resolved configuration.
    ///
    /// Installs the Prometheus recorder when `[metrics] enabled = true`.
    pub fn build_from_config(config: SurimonConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {e}"))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let firewall = SystemFirewall::from_config(&config.firewall);
        if firewall.is_dry_run() {
            tracing::warn!("firewall disabled, block commands will only be logged");
        }

        let monitor = LogMonitorBuilder::new()
            .config(PipelineConfig::from_core(&config.monitor))
            .firewall(firewall)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build log monitor: {e}"))?;

        Ok(Self { config, monitor })
    }

    /// Start the monitor.
    pub async fn start(&mut self) -> Result<()> {
        self.monitor
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start log monitor: {e}"))
    }

    /// Stop the monitor. Queued change events are discarded.
    pub async fn stop(&mut self) -> Result<()> {
        self.monitor
            .stop()
            .await
            .map_err(|e| anyhow::anyhow!("failed to stop log monitor: {e}"))
    }

    /// Start, report health periodically, and stop on SIGINT/SIGTERM.
    pub async fn run(&mut self) -> Result<()> {
        self.start().await?;
        tracing::info!(
            directory = %self.config.monitor.log_directory,
            firewall = if self.config.firewall.enabled { "iptables" } else { "dry-run" },
            "surimon running"
        );

        let shutdown = wait_for_shutdown_signal();
        tokio::pin!(shutdown);
        let mut health_tick = tokio::time::interval(HEALTH_LOG_INTERVAL);
        health_tick.tick().await;

        let signal = loop {
            tokio::select! {
                signal = &mut shutdown => break signal?,
                _ = health_tick.tick() => log_health(&self.health().await),
            }
        };
        tracing::info!(signal, "shutdown signal received");

        self.stop().await?;
        tracing::info!("surimon shut down");
        Ok(())
    }

    /// Current monitor health.
    pub async fn health(&self) -> HealthStatus {
        self.monitor.health_check().await
    }

    /// The resolved configuration.
    pub fn config(&self) -> &SurimonConfig {
        &self.config
    }

    /// The managed monitor.
    pub fn monitor(&self) -> &LogMonitor<SystemFirewall> {
        &self.monitor
    }
}

fn log_health(status: &HealthStatus) {
    match status {
        HealthStatus::Healthy => tracing::debug!(status = %status, "health check"),
        HealthStatus::Degraded(_) | HealthStatus::Unhealthy(_) => {
            tracing::warn!(status = %status, "health check")
        }
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {e}"))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {e}"))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
