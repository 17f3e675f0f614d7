//! 오프셋 저장소 -- 추적 중인 파일의 마지막 소비 위치

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 파일 경로 → 마지막으로 소비한 바이트 오프셋
///
/// 메모리에만 존재하며 재시작 시 초기화됩니다. 항목의 존재가 곧
/// "추적 중" 상태를 뜻합니다.
#[derive(Debug, Default, Clone)]
pub struct OffsetStore {
    offsets: HashMap<PathBuf, u64>,
}

impl OffsetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 파일을 주어진 오프셋으로 등록합니다. 이미 추적 중이면 아무것도 하지 않습니다.
    ///
    /// 새로 등록되었으면 `true`를 반환합니다.
    pub fn register(&mut self, path: impl Into<PathBuf>, offset: u64) -> bool {
        let path = path.into();
        if self.offsets.contains_key(&path) {
            return false;
        }
        self.offsets.insert(path, offset);
        true
    }

    /// 저장된 오프셋
    pub fn offset(&self, path: &Path) -> Option<u64> {
        self.offsets.get(path).copied()
    }

    /// 오프셋을 갱신합니다. 추적 중이 아니면 등록합니다.
    pub fn advance(&mut self, path: &Path, offset: u64) {
        match self.offsets.get_mut(path) {
            Some(current) => *current = offset,
            None => {
                self.offsets.insert(path.to_path_buf(), offset);
            }
        }
    }

    /// 오프셋을 0으로 되돌립니다 (truncation/rotation).
    pub fn reset(&mut self, path: &Path) {
        if let Some(current) = self.offsets.get_mut(path) {
            *current = 0;
        }
    }

    /// 추적을 중단합니다. 다시 나타나면 새 파일로 취급됩니다.
    pub fn remove(&mut self, path: &Path) -> Option<u64> {
        self.offsets.remove(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.offsets.contains_key(path)
    }

    /// 추적 중인 경로의 스냅샷 (정렬됨)
    pub fn tracked_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.offsets.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}
