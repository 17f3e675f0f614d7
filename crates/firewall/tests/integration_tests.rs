//! 통합 테스트 -- 실제 서브프로세스를 통한 차단 플로우 검증
//!
//! 인자를 파일에 기록하는 셸 스크립트를 방화벽 명령으로 사용하여
//! ActionRequest → 명령 실행 → BlockedSet → 감사 기록 흐름을 확인합니다.
//! 스크립트 작성 직후 실행하므로 테스트는 직렬로 실행합니다.

#![cfg(unix)]

use std::net::IpAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serial_test::serial;
use surimon_core::error::SurimonError;
use surimon_core::pipeline::AuditSink;
use surimon_core::types::{ActionRecord, ActionRequest, LogLine};
use surimon_firewall::{
    ActionExecutor, BlockedSet, EnforceOutcome, FirewallClient, IptablesClient, SystemFirewall,
};

#[derive(Default)]
struct RecordingAudit {
    lines: Mutex<Vec<String>>,
}

impl AuditSink for RecordingAudit {
    async fn append_line(&self, line: &LogLine) -> Result<(), SurimonError> {
        self.lines.lock().unwrap().push(line.audit_line());
        Ok(())
    }

    async fn append_action(&self, record: &ActionRecord) -> Result<(), SurimonError> {
        self.lines.lock().unwrap().push(record.audit_line());
        Ok(())
    }
}

/// 인자를 `calls.txt`에 추가하고 지정된 코드로 종료하는 스크립트를 만듭니다.
fn fake_firewall(dir: &Path, name: &str, exit_code: i32) -> (PathBuf, PathBuf) {
    let calls = dir.join(format!("{name}.calls"));
    let script = dir.join(name);
    let body = format!(
        "#!/bin/sh\necho \"$@\" >> {}\necho 'iptables: simulated error' >&2\nexit {exit_code}\n",
        calls.display()
    );
    std::fs::write(&script, body).unwrap();
    let mut perms = std::fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).unwrap();
    (script, calls)
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

#[tokio::test]
#[serial]
async fn block_invokes_command_with_drop_rule() {
    let dir = tempfile::tempdir().unwrap();
    let (v4, v4_calls) = fake_firewall(dir.path(), "fake-iptables", 0);
    let (v6, v6_calls) = fake_firewall(dir.path(), "fake-ip6tables", 0);
    let client = IptablesClient::new(v4.display().to_string(), v6.display().to_string(), "INPUT");

    client.block(ip("10.0.0.5")).await.unwrap();
    client.block(ip("2001:db8::5")).await.unwrap();

    let v4_log = std::fs::read_to_string(v4_calls).unwrap();
    assert_eq!(v4_log.trim(), "-I INPUT -s 10.0.0.5 -j DROP");
    let v6_log = std::fs::read_to_string(v6_calls).unwrap();
    assert_eq!(v6_log.trim(), "-I INPUT -s 2001:db8::5 -j DROP");
}

#[tokio::test]
#[serial]
async fn executor_runs_command_once_per_subject() {
    let dir = tempfile::tempdir().unwrap();
    let (v4, calls) = fake_firewall(dir.path(), "fake-iptables", 0);
    let client = IptablesClient::new(v4.display().to_string(), "ip6tables", "INPUT");
    let executor = ActionExecutor::new(Arc::new(client));
    let audit = RecordingAudit::default();
    let mut blocked = BlockedSet::new();

    let request = ActionRequest::rule(ip("10.0.0.5"), "badsig", 600, "fast.log");
    for _ in 0..3 {
        executor.enforce(&mut blocked, &request, &audit).await;
    }

    let log = std::fs::read_to_string(calls).unwrap();
    assert_eq!(log.lines().count(), 1);
    assert_eq!(blocked.len(), 1);

    let lines = audit.lines.lock().unwrap().clone();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("[ACTION] Blocked 10.0.0.5"));
}

#[tokio::test]
#[serial]
async fn failing_command_records_stderr_and_stays_eligible() {
    let dir = tempfile::tempdir().unwrap();
    let (v4, calls) = fake_firewall(dir.path(), "fake-iptables", 4);
    let client = IptablesClient::new(v4.display().to_string(), "ip6tables", "INPUT");
    let executor = ActionExecutor::new(Arc::new(client));
    let audit = RecordingAudit::default();
    let mut blocked = BlockedSet::new();

    let request = ActionRequest::flood(ip("192.168.1.9"), 11, "fast.log");
    let first = executor.enforce(&mut blocked, &request, &audit).await;
    let second = executor.enforce(&mut blocked, &request, &audit).await;

    assert!(matches!(first, EnforceOutcome::Failed(_)));
    assert!(matches!(second, EnforceOutcome::Failed(_)));
    assert!(blocked.is_empty());
    assert_eq!(std::fs::read_to_string(calls).unwrap().lines().count(), 2);

    let lines = audit.lines.lock().unwrap().clone();
    assert!(lines[0].contains("Failed to block 192.168.1.9"));
    assert!(lines[0].contains("simulated error"));
}

#[tokio::test]
#[serial]
async fn dry_run_firewall_blocks_without_command() {
    let config = surimon_core::config::FirewallConfig {
        enabled: false,
        binary: "/nonexistent/iptables".to_owned(),
        ..Default::default()
    };
    let executor = ActionExecutor::new(Arc::new(SystemFirewall::from_config(&config)));
    let audit = RecordingAudit::default();
    let mut blocked = BlockedSet::new();

    let request = ActionRequest::rule(ip("10.0.0.5"), "badsig", 600, "fast.log");
    let outcome = executor.enforce(&mut blocked, &request, &audit).await;

    assert!(matches!(outcome, EnforceOutcome::Blocked(_)));
    assert!(blocked.contains(&ip("10.0.0.5")));
}
