//! 에러 타입: 도메인별 에러 정의

/// surimon 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum SurimonError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 모니터링 파이프라인 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 방화벽 차단 실행 에러
    #[error("enforcement error: {0}")]
    Enforcement(#[from] EnforcementError),

    /// 감사 로그 기록 에러
    #[error("audit error: {0}")]
    Audit(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중
    #[error("pipeline is already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("pipeline is not running")]
    NotRunning,
}

/// 차단 실행 에러
#[derive(Debug, thiserror::Error)]
pub enum EnforcementError {
    /// 외부 명령 실행 실패 (0이 아닌 종료 코드)
    #[error("firewall command failed for {subject}: {reason}")]
    CommandFailed { subject: String, reason: String },

    /// 외부 명령을 시작할 수 없음
    #[error("failed to spawn firewall command: {0}")]
    Spawn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: SurimonError = ConfigError::InvalidValue {
            field: "monitor.interval_ms".to_owned(),
            reason: "must be greater than 0".to_owned(),
        }
        .into();
        assert!(matches!(err, SurimonError::Config(_)));
        assert!(err.to_string().contains("monitor.interval_ms"));
    }

    #[test]
    fn enforcement_error_display() {
        let err = EnforcementError::CommandFailed {
            subject: "10.0.0.5".to_owned(),
            reason: "iptables: Permission denied".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("10.0.0.5"));
        assert!(msg.contains("Permission denied"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SurimonError = io.into();
        assert!(matches!(err, SurimonError::Io(_)));
    }
}
