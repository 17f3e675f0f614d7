//! 파이프라인 trait: 모듈 확장 포인트 정의

use std::fmt;
use std::future::Future;

use serde::Serialize;

use crate::error::SurimonError;
use crate::types::{ActionRecord, LogLine};

/// 모듈 헬스 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// 정상 동작 중
    Healthy,
    /// 동작은 하지만 일부 기능이 저하됨
    Degraded(String),
    /// 동작하지 않음
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 비정상 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// 시작/정지/헬스 체크 생명주기를 가진 모듈
///
/// `surimon-daemon`은 이 trait을 통해 모니터를 관리합니다.
pub trait Pipeline: Send {
    /// 모듈을 시작합니다. 백그라운드 태스크를 스폰한 뒤 즉시 반환합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), SurimonError>> + Send;

    /// 모듈을 정지합니다. 대기 중인 이벤트는 처리하지 않습니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), SurimonError>> + Send;

    /// 현재 헬스 상태를 반환합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// 감사 로그 싱크: append-only 기록 대상
///
/// 차단 실행기는 이 trait을 통해 액션 레코드를 기록하므로,
/// 방화벽 크레이트는 파일 기반 감사 로그 구현에 의존하지 않습니다.
pub trait AuditSink: Send + Sync {
    /// 통과 기록(원본 로그 라인)을 추가합니다.
    fn append_line(&self, line: &LogLine) -> impl Future<Output = Result<(), SurimonError>> + Send;

    /// 액션 레코드를 추가합니다.
    fn append_action(
        &self,
        record: &ActionRecord,
    ) -> impl Future<Output = Result<(), SurimonError>> + Send;
}
