//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 테일링, 규칙 로딩, 감시, 감사 로그 기록 중 발생하는
//! 에러를 표현합니다. `From<LogPipelineError> for SurimonError` 변환이 구현되어
//! 있어 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use surimon_core::error::{ConfigError, PipelineError, SurimonError};

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 파일 테일링 실패 (권한, 일시적 I/O 에러 등)
    #[error("tail error: {path}: {reason}")]
    Tail {
        /// 대상 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 규칙 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 규칙 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 개별 규칙 유효성 검증 실패
    #[error("rule validation error: rule '{rule}': {reason}")]
    RuleValidation {
        /// 문제가 된 규칙 이름
        rule: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 파일시스템 감시 에러
    #[error("watch error: {0}")]
    Watch(String),

    /// 감사 로그 기록 실패
    #[error("audit log error: {path}: {reason}")]
    Audit {
        /// 감사 로그 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<LogPipelineError> for SurimonError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Config { field, reason } => {
                SurimonError::Config(ConfigError::InvalidValue { field, reason })
            }
            LogPipelineError::Audit { .. } => SurimonError::Audit(err.to_string()),
            LogPipelineError::Io(e) => SurimonError::Io(e),
            other => SurimonError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}

impl From<notify::Error> for LogPipelineError {
    fn from(err: notify::Error) -> Self {
        Self::Watch(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_error_display() {
        let err = LogPipelineError::Tail {
            path: "/var/log/suricata/fast.log".to_owned(),
            reason: "permission denied".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("fast.log"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn rule_load_error_display() {
        let err = LogPipelineError::RuleLoad {
            path: "/etc/surimon/rules.yml".to_owned(),
            reason: "invalid YAML".to_owned(),
        };
        assert!(err.to_string().contains("rules.yml"));
    }

    #[test]
    fn config_error_converts_to_config() {
        let err = LogPipelineError::Config {
            field: "poll_interval_ms".to_owned(),
            reason: "must be greater than 0".to_owned(),
        };
        let top: SurimonError = err.into();
        assert!(matches!(
            top,
            SurimonError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn audit_error_converts_to_audit() {
        let err = LogPipelineError::Audit {
            path: "/var/log/suricata-all/suricata-monitor.log".to_owned(),
            reason: "read-only file system".to_owned(),
        };
        let top: SurimonError = err.into();
        match top {
            SurimonError::Audit(msg) => assert!(msg.contains("read-only")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn watch_error_converts_to_pipeline() {
        let top: SurimonError = LogPipelineError::Watch("inotify limit".to_owned()).into();
        assert!(matches!(top, SurimonError::Pipeline(_)));
    }
}
