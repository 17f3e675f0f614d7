//! 도메인 타입: 시스템 전역에서 사용되는 공통 타입
//!
//! 모니터링 파이프라인과 차단 실행기가 공유하는 데이터 구조를 정의합니다.
//! 감사 로그의 두 가지 라인 형식(통과 기록, 액션 기록)도 여기서 결정됩니다.

use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 감사 로그 타임스탬프 형식 (로컬 시각)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 감사 로그용 타임스탬프 문자열을 생성합니다.
pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// 테일러가 읽어낸 한 줄의 로그
///
/// 테일러가 생성하고 분류기가 한 번 소비하는 일시적인 값입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    /// 원본 텍스트 (줄바꿈 제외)
    pub text: String,
    /// 원본 파일 경로
    pub path: PathBuf,
    /// 원본 파일의 basename (감사 로그의 source-name)
    pub source_name: String,
    /// 수신 시각
    pub received_at: DateTime<Local>,
}

impl LogLine {
    /// 새 로그 라인을 생성합니다.
    pub fn new(text: impl Into<String>, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            text: text.into(),
            path: path.to_path_buf(),
            source_name,
            received_at: Local::now(),
        }
    }

    /// 감사 로그용 통과 기록 라인을 생성합니다.
    ///
    /// 형식: `[<timestamp>] <source-name>: <line>`
    pub fn audit_line(&self) -> String {
        format!(
            "[{}] {}: {}",
            format_timestamp(&self.received_at),
            self.source_name,
            self.text
        )
    }
}

/// 차단 사유
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionReason {
    /// 내장 ICMP echo flood 휴리스틱
    Flood {
        /// 임계값 초과 시점의 누적 probe 수
        count: u64,
    },
    /// 사용자 정의 규칙 매칭
    RuleMatch {
        /// 규칙 이름
        rule: String,
        /// 설정된 차단 기간 (초, 정보용)
        duration_secs: u64,
    },
}

impl ActionReason {
    /// 메트릭 레이블용 고정된 사유명을 반환합니다.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Flood { .. } => "flood",
            Self::RuleMatch { .. } => "rule",
        }
    }
}

impl fmt::Display for ActionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flood { count } => write!(f, "ICMP echo flood ({count} requests)"),
            Self::RuleMatch {
                rule,
                duration_secs,
            } => write!(f, "rule '{rule}' matched (duration {duration_secs}s)"),
        }
    }
}

/// 분류기가 생성하는 차단 요청
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// 차단 대상 주소
    pub subject: IpAddr,
    /// 차단 사유
    pub reason: ActionReason,
    /// 탐지가 발생한 파일의 basename
    pub source: String,
}

impl ActionRequest {
    /// flood 휴리스틱 요청을 생성합니다.
    pub fn flood(subject: IpAddr, count: u64, source: impl Into<String>) -> Self {
        Self {
            subject,
            reason: ActionReason::Flood { count },
            source: source.into(),
        }
    }

    /// 규칙 매칭 요청을 생성합니다.
    pub fn rule(
        subject: IpAddr,
        rule: impl Into<String>,
        duration_secs: u64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            subject,
            reason: ActionReason::RuleMatch {
                rule: rule.into(),
                duration_secs,
            },
            source: source.into(),
        }
    }
}

/// 차단 실행 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// 방화벽 명령 성공
    Success,
    /// 방화벽 명령 실패 (진단 메시지 포함)
    Failure(String),
}

impl ActionOutcome {
    /// 성공 여부를 반환합니다.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// 메트릭 레이블용 결과명을 반환합니다.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure(_) => "failure",
        }
    }
}

/// 감사 로그에 한 번 기록되는 액션 레코드
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    /// 레코드 ID (UUID v4)
    pub id: String,
    /// 기록 시각
    pub timestamp: DateTime<Local>,
    /// 차단 대상 주소
    pub subject: IpAddr,
    /// 차단 사유
    pub reason: ActionReason,
    /// 실행 결과
    pub outcome: ActionOutcome,
}

impl ActionRecord {
    /// 요청과 결과로부터 레코드를 생성합니다.
    pub fn new(request: &ActionRequest, outcome: ActionOutcome) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Local::now(),
            subject: request.subject,
            reason: request.reason.clone(),
            outcome,
        }
    }

    /// 사람이 읽을 수 있는 액션 메시지를 반환합니다.
    pub fn message(&self) -> String {
        match &self.outcome {
            ActionOutcome::Success => format!("Blocked {}: {}", self.subject, self.reason),
            ActionOutcome::Failure(diag) => format!(
                "Failed to block {}: {} ({diag})",
                self.subject, self.reason
            ),
        }
    }

    /// 감사 로그용 액션 라인을 생성합니다.
    ///
    /// 형식: `[<timestamp>] [ACTION] <message>`
    pub fn audit_line(&self) -> String {
        format!(
            "[{}] [ACTION] {}",
            format_timestamp(&self.timestamp),
            self.message()
        )
    }
}
