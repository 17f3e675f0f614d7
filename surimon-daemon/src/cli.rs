//! CLI argument definitions for surimon.
//!
//! Uses `clap` v4 derive macros. Every flag is optional and, when given,
//! overrides the environment (`SURIMON_*`), the config file and the
//! built-in defaults, in that order.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use surimon_core::config::SurimonConfig;

/// Suricata log monitor.
///
/// Tails the Suricata log directory, detects ICMP echo floods and
/// user-defined patterns, blocks offending addresses with iptables and
/// keeps an append-only audit log.
#[derive(Parser, Debug, Default)]
#[command(name = "surimon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to a surimon.toml configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Audit log path (empty string for console-only output).
    #[arg(short, long)]
    pub output_log: Option<String>,

    /// Poll interval in seconds (fractions allowed, e.g. 0.5).
    #[arg(short, long, allow_negative_numbers = true)]
    pub interval: Option<f64>,

    /// Directory containing the Suricata logs.
    #[arg(short = 'd', long)]
    pub log_directory: Option<String>,

    /// Comma-separated file names to ignore.
    #[arg(short, long)]
    pub exclude: Option<String>,

    /// YAML or JSON rule file.
    #[arg(short, long)]
    pub rule_file: Option<String>,

    /// Echo requests from one source before it is blocked.
    #[arg(long)]
    pub flood_threshold: Option<u64>,

    /// Track only these file names (repeatable). Disables extension matching.
    #[arg(long = "file-name")]
    pub file_names: Vec<String>,

    /// Log firewall commands instead of running them.
    #[arg(long)]
    pub dry_run: bool,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate the configuration and exit without starting the monitor.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Apply command-line overrides on top of an already merged config.
    ///
    /// # Errors
    ///
    /// Returns an error if `--interval` is not a positive finite number.
    pub fn apply_overrides(&self, config: &mut SurimonConfig) -> Result<()> {
        if let Some(path) = &self.output_log {
            config.monitor.output_log = path.clone();
        }
        if let Some(secs) = self.interval {
            config.monitor.interval_ms = interval_ms(secs)?;
        }
        if let Some(dir) = &self.log_directory {
            config.monitor.log_directory = dir.clone();
        }
        if let Some(list) = &self.exclude {
            config.monitor.exclude = split_csv(list);
        }
        if let Some(path) = &self.rule_file {
            config.monitor.rule_file = path.clone();
        }
        if let Some(threshold) = self.flood_threshold {
            config.monitor.flood_threshold = threshold;
        }
        if !self.file_names.is_empty() {
            config.monitor.file_names = self.file_names.clone();
        }
        if self.dry_run {
            config.firewall.enabled = false;
        }
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        Ok(())
    }
}

/// Convert a fractional second interval to whole milliseconds.
pub fn interval_ms(secs: f64) -> Result<u64> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(anyhow::anyhow!(
            "--interval must be a positive number of seconds, got {secs}"
        ));
    }
    let ms = (secs * 1000.0).round();
    if ms < 1.0 {
        return Err(anyhow::anyhow!("--interval must be at least 0.001 seconds"));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(ms as u64)
}

fn split_csv(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
