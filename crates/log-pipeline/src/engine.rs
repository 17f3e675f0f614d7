//! 모니터 엔진 -- 테일 패스, 분류, 차단 실행을 하나의 락 아래에서 수행합니다.
//!
//! 이벤트 소스([`watch`](crate::collector::watch), [`poll`](crate::collector::poll))는
//! 같은 [`MonitorEngine`]을 `Arc`로 공유하고, 엔진은 [`MonitorState`] 락으로
//! 패스를 직렬화합니다.
//!
//! # 라인 처리 흐름
//! ```text
//! Tailer -> AuditLog(통과 기록) -> Classifier -> ActionExecutor -> AuditLog(액션 기록)
//! ```

use std::io::ErrorKind;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use surimon_core::metrics as m;
use surimon_core::pipeline::AuditSink;
use surimon_firewall::{ActionExecutor, EnforceOutcome, FirewallClient};

use crate::audit::AuditLog;
use crate::classifier::{Classifier, FloodDetector, Verdict};
use crate::collector::{Discovery, FsChange, Tailer, Trigger};
use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::rule::RuleLoader;
use crate::state::MonitorState;

/// 한 번 이상의 테일 패스 요약
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// 읽은 라인 수
    pub lines: usize,
    /// 분류기가 만든 차단 요청 수
    pub requests: usize,
    /// 새로 차단된 주소 수
    pub blocked: usize,
}

impl PassSummary {
    fn merge(&mut self, other: PassSummary) {
        self.lines += other.lines;
        self.requests += other.requests;
        self.blocked += other.blocked;
    }
}

/// 모니터 엔진
pub struct MonitorEngine<F: FirewallClient> {
    discovery: Discovery,
    classifier: Classifier,
    executor: ActionExecutor<F>,
    audit: AuditLog,
    state: Mutex<MonitorState>,
}

impl<F: FirewallClient> MonitorEngine<F> {
    /// 구성 요소로 엔진을 생성합니다.
    pub fn new(
        discovery: Discovery,
        classifier: Classifier,
        executor: ActionExecutor<F>,
        audit: AuditLog,
    ) -> Self {
        Self {
            discovery,
            classifier,
            executor,
            audit,
            state: Mutex::new(MonitorState::new()),
        }
    }

    /// 파이프라인 설정으로 엔진을 구성합니다.
    ///
    /// 감사 로그 디렉토리를 준비하고 규칙 파일을 로드합니다. 규칙 파일 문제는
    /// 시작을 막지 않습니다.
    pub async fn from_config(
        config: &PipelineConfig,
        client: Arc<F>,
    ) -> Result<Self, LogPipelineError> {
        config.validate()?;

        let audit = AuditLog::open(config.audit_path()).await;
        let discovery = Discovery::from_config(config);
        let rules = RuleLoader::load_rule_set(config.rule_path().as_deref()).await;
        let classifier = Classifier::new(FloodDetector::new(config.flood_threshold)?, rules);

        Ok(Self::new(
            discovery,
            classifier,
            ActionExecutor::new(client),
            audit,
        ))
    }

    /// 시작 시 스캔 -- 기존 파일을 현재 크기로 등록합니다.
    ///
    /// 시작 이전에 쌓인 내용은 다시 처리하지 않습니다.
    pub async fn initial_scan(&self) -> usize {
        let mut state = self.state.lock().await;
        let registered = self.discovery.scan(&mut state.offsets, true).await;
        metrics::gauge!(m::TRACKED_FILES).set(state.offsets.len() as f64);
        info!(
            directory = %self.discovery.directory().display(),
            files = registered.len(),
            "initial scan complete"
        );
        registered.len()
    }

    /// 한 파일에 대해 테일 패스를 실행합니다.
    pub async fn process_file(&self, path: &Path, trigger: Trigger) -> PassSummary {
        let mut state = self.state.lock().await;
        self.process_locked(&mut state, path, trigger).await
    }

    /// 파일시스템 변경 알림을 처리합니다.
    ///
    /// 추적 정책에 맞지 않는 경로는 무시합니다. 아직 추적 중이 아닌 일반 파일은
    /// 오프셋 0으로 등록한 뒤 테일링합니다. [`FsChange::Created`]는 추적 중인
    /// 경로라도 새 파일이므로 오프셋을 0으로 되돌립니다.
    pub async fn on_fs_event(&self, path: &Path, change: FsChange) -> Option<PassSummary> {
        if !self.discovery.accepts(path) {
            return None;
        }
        // 스캔과 같은 키를 쓰도록 감시 디렉토리 기준으로 정규화
        let path = self.discovery.directory().join(path.file_name()?);

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if !state.offsets.contains(&path) {
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {}
                _ => return None,
            }
            state.offsets.register(&path, 0);
            metrics::gauge!(m::TRACKED_FILES).set(state.offsets.len() as f64);
            info!(path = %path.display(), offset = 0, "tracking new file");
        } else if change == FsChange::Created {
            let previous = state.offsets.offset(&path).unwrap_or(0);
            if previous > 0 {
                state.offsets.reset(&path);
                metrics::counter!(m::OFFSET_RESETS_TOTAL).increment(1);
                info!(path = %path.display(), previous_offset = previous, "file recreated, reading from start");
            }
        }

        Some(self.process_locked(state, &path, Trigger::Notify).await)
    }

    /// 전체 폴링 패스를 실행합니다.
    ///
    /// 사라진 파일은 추적에서 제외하고, 남은 파일을 테일링한 뒤, 새 파일을
    /// 오프셋 0으로 등록하여 테일링합니다.
    pub async fn poll_pass(&self) -> PassSummary {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let mut summary = PassSummary::default();

        for path in state.offsets.tracked_paths() {
            match tokio::fs::metadata(&path).await {
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    state.offsets.remove(&path);
                    info!(path = %path.display(), "file disappeared, no longer tracking");
                }
                _ => summary.merge(self.process_locked(state, &path, Trigger::Poll).await),
            }
        }

        for path in self.discovery.scan(&mut state.offsets, false).await {
            summary.merge(self.process_locked(state, &path, Trigger::Poll).await);
        }

        metrics::gauge!(m::TRACKED_FILES).set(state.offsets.len() as f64);
        summary
    }

    async fn process_locked(
        &self,
        state: &mut MonitorState,
        path: &Path,
        trigger: Trigger,
    ) -> PassSummary {
        metrics::counter!(m::TAIL_PASSES_TOTAL, m::LABEL_TRIGGER => trigger.as_str()).increment(1);

        let outcome = match Tailer::tail(&mut state.offsets, path).await {
            Ok(outcome) => outcome,
            Err(e) => {
                metrics::counter!(m::TAIL_ERRORS_TOTAL).increment(1);
                warn!(path = %path.display(), trigger = %trigger, error = %e, "tail pass failed, will retry");
                return PassSummary::default();
            }
        };

        let mut summary = PassSummary {
            lines: outcome.lines.len(),
            ..PassSummary::default()
        };

        for line in &outcome.lines {
            if let Err(e) = self.audit.append_line(line).await {
                metrics::counter!(m::AUDIT_WRITE_ERRORS_TOTAL).increment(1);
                warn!(error = %e, "failed to write audit line");
            }
            metrics::counter!(m::LINES_PROCESSED_TOTAL).increment(1);

            let verdict = self
                .classifier
                .classify(line, &mut state.flood, &state.blocked);
            if let Verdict::Action(request) = verdict {
                summary.requests += 1;
                let result = self
                    .executor
                    .enforce(&mut state.blocked, &request, &self.audit)
                    .await;
                if matches!(result, EnforceOutcome::Blocked(_)) {
                    summary.blocked += 1;
                }
            }
        }

        if summary.lines > 0 {
            debug!(
                path = %path.display(),
                trigger = %trigger,
                lines = summary.lines,
                requests = summary.requests,
                "processed new lines"
            );
        }
        summary
    }

    /// 저장된 오프셋
    pub async fn offset(&self, path: &Path) -> Option<u64> {
        self.state.lock().await.offset(path)
    }

    /// 추적 중인 파일 목록 (정렬됨)
    pub async fn tracked_files(&self) -> Vec<PathBuf> {
        self.state.lock().await.offsets().tracked_paths()
    }

    /// 차단된 주소 목록 (정렬됨)
    pub async fn blocked_subjects(&self) -> Vec<IpAddr> {
        self.state.lock().await.blocked_subjects()
    }

    /// 주소의 echo request 누적 수
    pub async fn flood_count(&self, subject: &IpAddr) -> u64 {
        self.state.lock().await.flood_count(subject)
    }

    /// 로드된 규칙 수
    pub fn rule_count(&self) -> usize {
        self.classifier.rules().len()
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }
}
