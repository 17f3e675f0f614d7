//! 탐지 규칙 데이터 타입
//!
//! 규칙 파일에서 역직렬화되는 구조체를 정의합니다.

use serde::{Deserialize, Serialize};

use crate::error::LogPipelineError;

/// 주소를 추출하는 named capture group 이름
pub const SUBJECT_GROUP: &str = "ip";

/// 규칙 정의 -- 규칙 파일의 한 항목에 대응합니다.
///
/// # YAML 스키마
/// ```yaml
/// - name: bad_signature
///   pattern: 'BADSIG.*src=(?P<ip>\d{1,3}(?:\.\d{1,3}){3})'
///   duration: 600
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// 규칙 이름 (없으면 위치 기반 이름 사용)
    #[serde(default)]
    pub name: Option<String>,
    /// 정규식 패턴. `ip` named group이 필요합니다.
    pub pattern: String,
    /// 차단 기간 (초, 정보용)
    #[serde(default)]
    pub duration: u64,
}

impl RuleDefinition {
    /// 규칙을 생성합니다.
    pub fn new(name: Option<&str>, pattern: impl Into<String>, duration: u64) -> Self {
        Self {
            name: name.map(str::to_owned),
            pattern: pattern.into(),
            duration,
        }
    }

    /// 표시용 이름. 이름이 없으면 `rule-<1부터 시작하는 위치>`.
    pub fn display_name(&self, position: usize) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => format!("rule-{}", position + 1),
        }
    }

    /// 구조적 유효성을 검증합니다 (정규식 컴파일 제외).
    pub fn validate(&self, position: usize) -> Result<(), LogPipelineError> {
        if self.pattern.trim().is_empty() {
            return Err(LogPipelineError::RuleValidation {
                rule: self.display_name(position),
                reason: "pattern must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}
