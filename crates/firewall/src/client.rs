//! Firewall command abstraction for testability.
//!
//! The [`FirewallClient`] trait abstracts the external firewall subsystem,
//! allowing production code to use [`IptablesClient`] while tests use a
//! recording mock.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐
//! │ ActionExecutor │
//! └───────┬────────┘
//!         │
//!         ▼
//!  ┌────────────────┐
//!  │ FirewallClient │ (trait)
//!  └────────────────┘
//!     │     │     │
//!     ▼     ▼     ▼
//! Iptables DryRun Mock
//!     │
//!     ▼
//! iptables / ip6tables
//! ```
//!
//! The firewall is treated as an opaque command: exit status 0 means the deny
//! rule was inserted, anything else is a failure carrying stderr. Invocations
//! are neither retried nor bounded by a timeout.

use std::future::Future;
use std::net::IpAddr;

use tokio::process::Command;
use tracing::{debug, info};

use surimon_core::config::FirewallConfig;

use crate::error::FirewallError;

/// Trait abstracting the firewall block operation.
///
/// # Implementations
///
/// - [`IptablesClient`]: runs `iptables`/`ip6tables` as a subprocess
/// - [`DryRunClient`]: logs the command it would run and reports success
/// - [`SystemFirewall`]: one of the above, selected from configuration
pub trait FirewallClient: Send + Sync + 'static {
    /// Inserts a deny rule for all traffic from `subject`.
    ///
    /// # Errors
    ///
    /// - `FirewallError::Spawn`: the command could not be started
    /// - `FirewallError::CommandFailed`: the command exited with a non-zero status
    fn block(&self, subject: IpAddr) -> impl Future<Output = Result<(), FirewallError>> + Send;
}

/// `iptables` 기반 방화벽 클라이언트
///
/// IPv4 주소는 `binary`, IPv6 주소는 `binary_v6`로 차단합니다.
#[derive(Debug, Clone)]
pub struct IptablesClient {
    binary: String,
    binary_v6: String,
    chain: String,
}

impl IptablesClient {
    /// 명령과 체인을 지정하여 클라이언트를 생성합니다.
    pub fn new(
        binary: impl Into<String>,
        binary_v6: impl Into<String>,
        chain: impl Into<String>,
    ) -> Self {
        Self {
            binary: binary.into(),
            binary_v6: binary_v6.into(),
            chain: chain.into(),
        }
    }

    /// `[firewall]` 설정 섹션에서 클라이언트를 생성합니다.
    pub fn from_config(config: &FirewallConfig) -> Self {
        Self::new(&config.binary, &config.binary_v6, &config.chain)
    }

    /// 주소 체계에 맞는 명령을 반환합니다.
    pub fn binary_for(&self, subject: IpAddr) -> &str {
        match subject {
            IpAddr::V4(_) => &self.binary,
            IpAddr::V6(_) => &self.binary_v6,
        }
    }

    /// 차단 명령 인자를 생성합니다: `-I <chain> -s <ip> -j DROP`
    pub fn block_args(&self, subject: IpAddr) -> Vec<String> {
        vec![
            "-I".to_owned(),
            self.chain.clone(),
            "-s".to_owned(),
            subject.to_string(),
            "-j".to_owned(),
            "DROP".to_owned(),
        ]
    }

    /// 로그 출력용 전체 명령 문자열을 반환합니다.
    pub fn command_line(&self, subject: IpAddr) -> String {
        format!(
            "{} {}",
            self.binary_for(subject),
            self.block_args(subject).join(" ")
        )
    }
}

impl Default for IptablesClient {
    fn default() -> Self {
        Self::from_config(&FirewallConfig::default())
    }
}

impl FirewallClient for IptablesClient {
    async fn block(&self, subject: IpAddr) -> Result<(), FirewallError> {
        let binary = self.binary_for(subject);
        debug!(command = %self.command_line(subject), "running firewall command");

        let output = Command::new(binary)
            .args(self.block_args(subject))
            .output()
            .await
            .map_err(|e| FirewallError::Spawn {
                binary: binary.to_owned(),
                reason: e.to_string(),
            })?;

        if output.status.success() {
            return Ok(());
        }

        Err(FirewallError::CommandFailed {
            binary: binary.to_owned(),
            subject: subject.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}

/// 명령을 실행하지 않고 로그만 남기는 클라이언트 (`firewall.enabled = false`)
#[derive(Debug, Clone, Default)]
pub struct DryRunClient {
    inner: IptablesClient,
}

impl DryRunClient {
    /// 기록할 명령 형식을 결정하는 클라이언트로 생성합니다.
    pub fn new(inner: IptablesClient) -> Self {
        Self { inner }
    }
}

impl FirewallClient for DryRunClient {
    async fn block(&self, subject: IpAddr) -> Result<(), FirewallError> {
        info!(
            command = %self.inner.command_line(subject),
            "dry-run: firewall command not executed"
        );
        Ok(())
    }
}

/// 설정에 따라 선택되는 방화벽 클라이언트
#[derive(Debug, Clone)]
pub enum SystemFirewall {
    /// 실제 명령 실행
    Iptables(IptablesClient),
    /// 로그만 기록
    DryRun(DryRunClient),
}

impl SystemFirewall {
    /// `firewall.enabled`에 따라 클라이언트를 선택합니다.
    pub fn from_config(config: &FirewallConfig) -> Self {
        let client = IptablesClient::from_config(config);
        if config.enabled {
            Self::Iptables(client)
        } else {
            Self::DryRun(DryRunClient::new(client))
        }
    }

    /// dry-run 모드 여부
    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun(_))
    }
}

impl FirewallClient for SystemFirewall {
    async fn block(&self, subject: IpAddr) -> Result<(), FirewallError> {
        match self {
            Self::Iptables(client) => client.block(subject).await,
            Self::DryRun(client) => client.block(subject).await,
        }
    }
}

/// 테스트용 Mock 방화벽 클라이언트
///
/// 호출된 주소를 기록하고, 설정에 따라 실패를 시뮬레이션합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockFirewallClient {
    /// block 호출 기록
    pub calls: std::sync::Mutex<Vec<IpAddr>>,
    /// 호출 시 실패를 시뮬레이션할지 여부
    pub fail_actions: bool,
}

#[cfg(test)]
impl MockFirewallClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 모든 호출이 실패하도록 설정합니다.
    pub fn with_failing_actions(mut self) -> Self {
        self.fail_actions = true;
        self
    }

    /// 지금까지의 호출 기록을 반환합니다.
    pub fn calls(&self) -> Vec<IpAddr> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl FirewallClient for MockFirewallClient {
    async fn block(&self, subject: IpAddr) -> Result<(), FirewallError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(subject);
        }
        if self.fail_actions {
            return Err(FirewallError::CommandFailed {
                binary: "mock".to_owned(),
                subject: subject.to_string(),
                status: "exit status: 1".to_owned(),
                stderr: "mock failure".to_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn block_args_insert_drop_rule() {
        let client = IptablesClient::default();
        assert_eq!(
            client.block_args(ip("10.0.0.5")),
            vec!["-I", "INPUT", "-s", "10.0.0.5", "-j", "DROP"]
        );
    }

    #[test]
    fn binary_selected_by_address_family() {
        let client = IptablesClient::new("iptables", "ip6tables", "SURICATA");
        assert_eq!(client.binary_for(ip("192.168.1.1")), "iptables");
        assert_eq!(client.binary_for(ip("2001:db8::1")), "ip6tables");
        assert_eq!(
            client.command_line(ip("2001:db8::1")),
            "ip6tables -I SURICATA -s 2001:db8::1 -j DROP"
        );
    }

    #[test]
    fn system_firewall_follows_enabled_flag() {
        let mut config = FirewallConfig::default();
        assert!(!SystemFirewall::from_config(&config).is_dry_run());
        config.enabled = false;
        assert!(SystemFirewall::from_config(&config).is_dry_run());
    }

    #[tokio::test]
    async fn zero_exit_status_is_success() {
        let client = IptablesClient::new("true", "true", "INPUT");
        client.block(ip("10.0.0.5")).await.unwrap();
    }

    #[tokio::test]
    async fn non_zero_exit_status_is_failure() {
        let client = IptablesClient::new("false", "false", "INPUT");
        let err = client.block(ip("10.0.0.5")).await.unwrap_err();
        match err {
            FirewallError::CommandFailed {
                binary, subject, ..
            } => {
                assert_eq!(binary, "false");
                assert_eq!(subject, "10.0.0.5");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let client = IptablesClient::new(
            "/nonexistent/surimon-iptables",
            "/nonexistent/surimon-ip6tables",
            "INPUT",
        );
        let err = client.block(ip("::1")).await.unwrap_err();
        assert!(matches!(err, FirewallError::Spawn { .. }));
        assert!(err.to_string().contains("surimon-ip6tables"));
    }

    #[tokio::test]
    async fn dry_run_never_executes() {
        let client = DryRunClient::new(IptablesClient::new(
            "/nonexistent/iptables",
            "/nonexistent/ip6tables",
            "INPUT",
        ));
        client.block(ip("10.0.0.5")).await.unwrap();
    }

    #[tokio::test]
    async fn mock_records_calls() {
        let client = MockFirewallClient::new().with_failing_actions();
        assert!(client.block(ip("10.0.0.1")).await.is_err());
        assert_eq!(client.calls(), vec![ip("10.0.0.1")]);
    }
}
