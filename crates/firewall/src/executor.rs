//! 차단 실행 -- 주소당 최대 한 번의 방화벽 차단
//!
//! [`BlockedSet`]은 이번 프로세스 수명 동안 성공적으로 차단된 주소를 기억합니다.
//! [`ActionExecutor`]는 [`FirewallClient`]로 차단을 수행하고
//! 결과를 [`ActionRecord`]로 감사 로그에 기록합니다.
//!
//! `BlockedSet`은 실행기가 소유하지 않습니다. 호출자가 공유 상태 락을
//! 잡은 채로 `&mut BlockedSet`을 넘기므로, 같은 주소에 대한 두 번의
//! `enforce` 호출이 동시에 명령을 실행하는 일은 없습니다.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use surimon_core::metrics as m;
use surimon_core::pipeline::AuditSink;
use surimon_core::types::{ActionOutcome, ActionRecord, ActionRequest};

use crate::client::FirewallClient;

/// 성공적으로 차단된 주소 집합. 항목은 제거되지 않습니다.
#[derive(Debug, Clone, Default)]
pub struct BlockedSet {
    subjects: HashSet<IpAddr>,
}

impl BlockedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 이미 차단된 주소인지 확인합니다.
    pub fn contains(&self, subject: &IpAddr) -> bool {
        self.subjects.contains(subject)
    }

    /// 주소를 추가합니다. 새로 추가되었으면 `true`.
    pub fn insert(&mut self, subject: IpAddr) -> bool {
        self.subjects.insert(subject)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpAddr> {
        self.subjects.iter()
    }
}

/// `enforce` 결과
#[derive(Debug, Clone)]
pub enum EnforceOutcome {
    /// 이미 차단된 주소. 명령 실행도 기록도 없음
    AlreadyBlocked,
    /// 차단 성공. 기록된 레코드 포함
    Blocked(ActionRecord),
    /// 차단 실패. 주소는 다음 요청 때 다시 시도됨
    Failed(ActionRecord),
}

impl EnforceOutcome {
    /// 방화벽 명령이 실행되었는지 여부
    pub fn invoked(&self) -> bool {
        !matches!(self, Self::AlreadyBlocked)
    }

    /// 기록된 액션 레코드
    pub fn record(&self) -> Option<&ActionRecord> {
        match self {
            Self::AlreadyBlocked => None,
            Self::Blocked(record) | Self::Failed(record) => Some(record),
        }
    }
}

/// 차단 실행기 -- 방화벽 클라이언트로 차단을 수행합니다.
pub struct ActionExecutor<F: FirewallClient> {
    client: Arc<F>,
}

impl<F: FirewallClient> ActionExecutor<F> {
    /// 새 차단 실행기를 생성합니다.
    pub fn new(client: Arc<F>) -> Self {
        Self { client }
    }

    /// 방화벽 클라이언트 참조
    pub fn client(&self) -> &Arc<F> {
        &self.client
    }

    /// 요청된 주소를 차단합니다.
    ///
    /// 이미 `blocked`에 있으면 아무것도 하지 않습니다. 그 외에는 방화벽 명령을
    /// 한 번 실행하고, 성공 시에만 `blocked`에 추가합니다. 어느 경우든
    /// 실행된 시도는 `audit`에 한 줄로 기록됩니다. 실패는 호출자에게
    /// 에러로 전파되지 않습니다.
    pub async fn enforce<A: AuditSink>(
        &self,
        blocked: &mut BlockedSet,
        request: &ActionRequest,
        audit: &A,
    ) -> EnforceOutcome {
        let subject = request.subject;
        if blocked.contains(&subject) {
            debug!(subject = %subject, "subject already blocked, skipping");
            return EnforceOutcome::AlreadyBlocked;
        }

        info!(
            subject = %subject,
            reason = %request.reason,
            source = request.source.as_str(),
            "enforcing firewall block"
        );

        let outcome = match self.client.block(subject).await {
            Ok(()) => ActionOutcome::Success,
            Err(e) => ActionOutcome::Failure(e.to_string()),
        };
        let record = ActionRecord::new(request, outcome);

        metrics::counter!(
            m::ACTIONS_TOTAL,
            m::LABEL_REASON => request.reason.kind(),
            m::LABEL_RESULT => record.outcome.label()
        )
        .increment(1);

        if record.outcome.is_success() {
            blocked.insert(subject);
            metrics::gauge!(m::BLOCKED_SUBJECTS).set(blocked.len() as f64);
            info!(subject = %subject, "firewall block applied");
        } else {
            error!(subject = %subject, message = %record.message(), "firewall block failed");
        }

        if let Err(e) = audit.append_action(&record).await {
            metrics::counter!(m::AUDIT_WRITE_ERRORS_TOTAL).increment(1);
            warn!(subject = %subject, error = %e, "failed to write action record");
        }

        if record.outcome.is_success() {
            EnforceOutcome::Blocked(record)
        } else {
            EnforceOutcome::Failed(record)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockFirewallClient;
    use std::sync::Mutex;
    use surimon_core::error::SurimonError;
    use surimon_core::types::LogLine;

    #[derive(Default)]
    struct MemoryAudit {
        lines: Mutex<Vec<String>>,
    }

    impl MemoryAudit {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl AuditSink for MemoryAudit {
        async fn append_line(&self, line: &LogLine) -> Result<(), SurimonError> {
            self.lines.lock().unwrap().push(line.audit_line());
            Ok(())
        }

        async fn append_action(&self, record: &ActionRecord) -> Result<(), SurimonError> {
            self.lines.lock().unwrap().push(record.audit_line());
            Ok(())
        }
    }

    struct BrokenAudit;

    impl AuditSink for BrokenAudit {
        async fn append_line(&self, _line: &LogLine) -> Result<(), SurimonError> {
            Err(SurimonError::Audit("disk full".to_owned()))
        }

        async fn append_action(&self, _record: &ActionRecord) -> Result<(), SurimonError> {
            Err(SurimonError::Audit("disk full".to_owned()))
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn rule_request(addr: &str) -> ActionRequest {
        ActionRequest::rule(ip(addr), "badsig", 600, "fast.log")
    }

    #[tokio::test]
    async fn success_adds_subject_and_records_once() {
        let client = Arc::new(MockFirewallClient::new());
        let executor = ActionExecutor::new(Arc::clone(&client));
        let audit = MemoryAudit::default();
        let mut blocked = BlockedSet::new();

        let outcome = executor
            .enforce(&mut blocked, &rule_request("10.0.0.5"), &audit)
            .await;

        assert!(matches!(outcome, EnforceOutcome::Blocked(_)));
        assert!(blocked.contains(&ip("10.0.0.5")));
        assert_eq!(client.calls(), vec![ip("10.0.0.5")]);

        let lines = audit.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("[ACTION] Blocked 10.0.0.5"));
    }

    #[tokio::test]
    async fn second_request_for_same_subject_is_noop() {
        let client = Arc::new(MockFirewallClient::new());
        let executor = ActionExecutor::new(Arc::clone(&client));
        let audit = MemoryAudit::default();
        let mut blocked = BlockedSet::new();

        executor
            .enforce(&mut blocked, &rule_request("10.0.0.5"), &audit)
            .await;
        let flood = ActionRequest::flood(ip("10.0.0.5"), 11, "fast.log");
        let outcome = executor.enforce(&mut blocked, &flood, &audit).await;

        assert!(matches!(outcome, EnforceOutcome::AlreadyBlocked));
        assert!(!outcome.invoked());
        assert!(outcome.record().is_none());
        assert_eq!(client.calls().len(), 1);
        assert_eq!(audit.lines().len(), 1);
    }

    #[tokio::test]
    async fn failure_keeps_subject_eligible() {
        let client = Arc::new(MockFirewallClient::new().with_failing_actions());
        let executor = ActionExecutor::new(Arc::clone(&client));
        let audit = MemoryAudit::default();
        let mut blocked = BlockedSet::new();

        let outcome = executor
            .enforce(&mut blocked, &rule_request("10.0.0.5"), &audit)
            .await;
        assert!(matches!(outcome, EnforceOutcome::Failed(_)));
        assert!(blocked.is_empty());

        // 실패한 주소는 다음 요청에서 다시 시도됨
        executor
            .enforce(&mut blocked, &rule_request("10.0.0.5"), &audit)
            .await;
        assert_eq!(client.calls().len(), 2);

        let lines = audit.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[ACTION] Failed to block 10.0.0.5"));
        assert!(lines[0].contains("mock failure"));
    }

    #[tokio::test]
    async fn distinct_subjects_each_blocked_once() {
        let client = Arc::new(MockFirewallClient::new());
        let executor = ActionExecutor::new(Arc::clone(&client));
        let audit = MemoryAudit::default();
        let mut blocked = BlockedSet::new();

        for addr in ["10.0.0.1", "10.0.0.2", "10.0.0.1", "2001:db8::7", "10.0.0.2"] {
            executor
                .enforce(&mut blocked, &rule_request(addr), &audit)
                .await;
        }

        assert_eq!(blocked.len(), 3);
        assert_eq!(client.calls().len(), 3);
    }

    #[tokio::test]
    async fn audit_failure_does_not_undo_block() {
        let client = Arc::new(MockFirewallClient::new());
        let executor = ActionExecutor::new(Arc::clone(&client));
        let mut blocked = BlockedSet::new();

        let outcome = executor
            .enforce(&mut blocked, &rule_request("10.0.0.9"), &BrokenAudit)
            .await;

        assert!(matches!(outcome, EnforceOutcome::Blocked(_)));
        assert!(blocked.contains(&ip("10.0.0.9")));
    }

    #[test]
    fn blocked_set_insert_reports_novelty() {
        let mut set = BlockedSet::new();
        assert!(set.insert(ip("10.0.0.1")));
        assert!(!set.insert(ip("10.0.0.1")));
        assert_eq!(set.iter().count(), 1);
    }
}
