//! 공유 모니터 상태 -- 단일 락 도메인
//!
//! 오프셋, flood 카운터, 차단 집합은 하나의 `tokio::sync::Mutex` 뒤에 있습니다.
//! 한 파일에 대한 패스는 크기 관찰부터 분류, 차단 실행까지 락을 유지하므로
//! 같은 파일에 대한 두 패스가 겹치지 않습니다.

use std::net::IpAddr;
use std::path::Path;

use surimon_firewall::BlockedSet;

use crate::classifier::FloodCounters;
use crate::collector::OffsetStore;

/// 모니터의 가변 상태
#[derive(Debug, Default)]
pub struct MonitorState {
    pub(crate) offsets: OffsetStore,
    pub(crate) flood: FloodCounters,
    pub(crate) blocked: BlockedSet,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 오프셋
    pub fn offset(&self, path: &Path) -> Option<u64> {
        self.offsets.offset(path)
    }

    /// 오프셋 저장소
    pub fn offsets(&self) -> &OffsetStore {
        &self.offsets
    }

    /// 주소의 echo request 누적 수
    pub fn flood_count(&self, subject: &IpAddr) -> u64 {
        self.flood.count(subject)
    }

    /// 이미 차단된 주소인지
    pub fn is_blocked(&self, subject: &IpAddr) -> bool {
        self.blocked.contains(subject)
    }

    /// 차단된 주소 목록 (정렬됨)
    pub fn blocked_subjects(&self) -> Vec<IpAddr> {
        let mut subjects: Vec<IpAddr> = self.blocked.iter().copied().collect();
        subjects.sort();
        subjects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_empty() {
        let state = MonitorState::new();
        assert!(state.offsets().is_empty());
        assert!(state.blocked_subjects().is_empty());
        assert_eq!(state.flood_count(&"10.0.0.1".parse().unwrap()), 0);
    }

    #[test]
    fn accessors_reflect_mutations() {
        let mut state = MonitorState::new();
        let subject: IpAddr = "10.0.0.1".parse().unwrap();
        state.offsets.register("/var/log/suricata/fast.log", 10);
        state.flood.increment(subject);
        state.blocked.insert(subject);

        assert_eq!(state.offset(Path::new("/var/log/suricata/fast.log")), Some(10));
        assert_eq!(state.flood_count(&subject), 1);
        assert!(state.is_blocked(&subject));
        assert_eq!(state.blocked_subjects(), vec![subject]);
    }
}
