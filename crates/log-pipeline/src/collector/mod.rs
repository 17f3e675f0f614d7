//! 로그 수집 모듈 -- 감시 디렉토리의 로그 파일을 테일링합니다.
//!
//! # 구성 요소
//! - [`OffsetStore`]: 추적 중인 파일별 마지막 소비 바이트 오프셋
//! - [`Tailer`]: 저장된 오프셋 이후에 추가된 바이트만 읽어 라인으로 분리
//! - [`Discovery`]: 추적 정책(확장자/고정 파일명, 제외 목록)에 맞는 파일 등록
//! - [`watch`]: 파일시스템 변경 알림 소스 (`notify`)
//! - [`poll`]: 고정 주기 폴링 소스
//!
//! # 아키텍처
//! 두 이벤트 소스는 각자 tokio 태스크에서 실행되며, 같은
//! [`MonitorEngine`](crate::engine::MonitorEngine)에 테일 패스를 요청합니다.

pub mod discovery;
pub mod offset;
pub mod poll;
pub mod tailer;
pub mod watch;

pub use discovery::{Discovery, FilePolicy};
pub use offset::OffsetStore;
pub use tailer::Tailer;

/// 테일 패스를 요청한 트리거
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// 파일시스템 변경 알림
    Notify,
    /// 주기적 폴링
    Poll,
}

impl Trigger {
    /// 메트릭 레이블용 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notify => "notify",
            Self::Poll => "poll",
        }
    }
}

/// 파일시스템 알림의 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsChange {
    /// 경로에 파일이 새로 생김 (삭제/이름 변경 후 재생성 포함)
    Created,
    /// 기존 파일 내용 또는 메타데이터 변경
    Modified,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
