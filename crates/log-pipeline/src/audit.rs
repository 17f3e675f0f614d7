//! 감사 로그 -- append-only 기록 싱크
//!
//! 통과 기록(`[ts] <source-name>: <line>`)과 액션 기록(`[ts] [ACTION] <message>`)을
//! 파일 끝에 추가하고, 같은 내용을 `surimon::audit` 타깃으로 콘솔에도 남깁니다.
//!
//! 상위 디렉토리를 만들 수 없으면 콘솔 전용으로 동작합니다.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use surimon_core::error::SurimonError;
use surimon_core::pipeline::AuditSink;
use surimon_core::types::{ActionRecord, LogLine};

use crate::error::LogPipelineError;

/// 콘솔 출력에 사용하는 tracing 타깃
pub const AUDIT_TARGET: &str = "surimon::audit";

/// 파일 기반 감사 로그
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: Option<PathBuf>,
}

impl AuditLog {
    /// 콘솔 전용 감사 로그
    pub fn console() -> Self {
        Self { path: None }
    }

    /// 감사 로그를 엽니다.
    ///
    /// 상위 디렉토리가 없으면 생성합니다. 생성에 실패하면 경고를 남기고
    /// 콘솔 전용으로 동작합니다.
    pub async fn open(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            info!("no audit log path configured, audit output goes to console only");
            return Self::console();
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if tokio::fs::metadata(parent).await.is_err() {
                match tokio::fs::create_dir_all(parent).await {
                    Ok(()) => info!(directory = %parent.display(), "created audit log directory"),
                    Err(e) => {
                        warn!(
                            directory = %parent.display(),
                            error = %e,
                            "failed to create audit log directory, audit output goes to console only"
                        );
                        return Self::console();
                    }
                }
            }
        }

        info!(path = %path.display(), "audit log ready");
        Self { path: Some(path) }
    }

    /// 기록 대상 파일 경로
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 콘솔 전용 여부
    pub fn is_console_only(&self) -> bool {
        self.path.is_none()
    }

    /// 한 줄을 기록합니다.
    ///
    /// 매 기록마다 append 모드로 파일을 열므로 외부에서 파일을 옮기거나
    /// 지워도 다음 기록에서 다시 만들어집니다.
    pub async fn append(&self, text: &str) -> Result<(), LogPipelineError> {
        info!(target: AUDIT_TARGET, "{text}");

        let Some(path) = &self.path else {
            return Ok(());
        };

        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            let mut buf = String::with_capacity(text.len() + 1);
            buf.push_str(text);
            buf.push('\n');
            file.write_all(buf.as_bytes()).await?;
            file.flush().await
        }
        .await;

        result.map_err(|e| LogPipelineError::Audit {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

impl AuditSink for AuditLog {
    async fn append_line(&self, line: &LogLine) -> Result<(), SurimonError> {
        self.append(&line.audit_line()).await.map_err(SurimonError::from)
    }

    async fn append_action(&self, record: &ActionRecord) -> Result<(), SurimonError> {
        self.append(&record.audit_line()).await.map_err(SurimonError::from)
    }
}
