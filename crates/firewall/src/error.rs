//! 방화벽 에러 타입
//!
//! [`FirewallError`]는 차단 명령 실행 중 발생하는 에러를 표현합니다.
//! `From<FirewallError> for SurimonError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use surimon_core::error::{EnforcementError, SurimonError};

/// 방화벽 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum FirewallError {
    /// 명령이 0이 아닌 상태로 종료됨
    #[error("{binary} exited with {status}: {stderr}")]
    CommandFailed {
        /// 실행한 명령
        binary: String,
        /// 대상 주소
        subject: String,
        /// 종료 상태
        status: String,
        /// 표준 에러 출력 (앞뒤 공백 제거)
        stderr: String,
    },

    /// 명령을 시작하지 못함 (바이너리 없음, 권한 없음 등)
    #[error("failed to spawn {binary}: {reason}")]
    Spawn {
        /// 실행하려던 명령
        binary: String,
        /// 실패 사유
        reason: String,
    },
}

impl From<FirewallError> for SurimonError {
    fn from(err: FirewallError) -> Self {
        match &err {
            FirewallError::CommandFailed { subject, .. } => {
                SurimonError::Enforcement(EnforcementError::CommandFailed {
                    subject: subject.clone(),
                    reason: err.to_string(),
                })
            }
            FirewallError::Spawn { .. } => {
                SurimonError::Enforcement(EnforcementError::Spawn(err.to_string()))
            }
        }
    }
}
