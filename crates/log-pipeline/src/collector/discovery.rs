//! 파일 탐색 -- 감시 디렉토리에서 추적 대상 파일을 찾아 등록합니다.
//!
//! 추적 정책은 확장자 허용 목록 또는 고정 파일명 목록 중 하나이며,
//! 그 다음 제외 목록이 적용됩니다. 제외 목록에는 감사 로그의 basename이
//! 생성 시점에 자동으로 추가되어, 모니터가 자신의 출력을 다시 읽지 않습니다.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use super::offset::OffsetStore;
use crate::config::{DEFAULT_AUDIT_FILE_NAME, PipelineConfig};

/// 추적 대상 파일 정책
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilePolicy {
    /// 확장자 허용 목록 (점 없이, 예: `log`)
    Extensions(Vec<String>),
    /// 정확한 basename 목록 (예: `fast.log`)
    FileNames(Vec<String>),
}

impl FilePolicy {
    /// 설정에서 정책을 결정합니다. 고정 파일명이 있으면 우선합니다.
    pub fn from_config(config: &PipelineConfig) -> Self {
        if config.file_names.is_empty() {
            Self::Extensions(
                config
                    .extensions
                    .iter()
                    .map(|e| e.trim().trim_start_matches('.').to_owned())
                    .filter(|e| !e.is_empty())
                    .collect(),
            )
        } else {
            Self::FileNames(config.file_names.clone())
        }
    }

    /// basename이 정책에 맞는지 확인합니다.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Extensions(exts) => Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| exts.iter().any(|allowed| allowed == ext)),
            Self::FileNames(names) => names.iter().any(|n| n == name),
        }
    }
}

/// 감시 디렉토리 탐색기
#[derive(Debug)]
pub struct Discovery {
    directory: PathBuf,
    /// 생성 시점의 정규화 경로 (디렉토리가 없었으면 `None`)
    canonical_directory: Option<PathBuf>,
    policy: FilePolicy,
    excluded: HashSet<String>,
    audit_in_directory: bool,
    directory_missing: AtomicBool,
}

impl Discovery {
    /// 탐색기를 생성합니다.
    ///
    /// `audit_path`의 basename과 기본 감사 로그 파일명은 항상 제외됩니다.
    /// 감사 로그가 감시 디렉토리 안에 있으면 경고를 남깁니다.
    pub fn new(
        directory: impl Into<PathBuf>,
        policy: FilePolicy,
        exclude: impl IntoIterator<Item = String>,
        audit_path: Option<&Path>,
    ) -> Self {
        let directory = directory.into();
        let canonical_directory = std::fs::canonicalize(&directory).ok();
        let mut excluded: HashSet<String> = exclude
            .into_iter()
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .collect();
        excluded.insert(DEFAULT_AUDIT_FILE_NAME.to_owned());

        let mut audit_in_directory = false;
        if let Some(audit) = audit_path {
            if let Some(name) = audit.file_name() {
                excluded.insert(name.to_string_lossy().into_owned());
            }
            if same_directory(audit.parent(), &directory, canonical_directory.as_deref()) {
                audit_in_directory = true;
                warn!(
                    audit = %audit.display(),
                    directory = %directory.display(),
                    "audit log is inside the watched directory; it is excluded automatically, \
                     but placing it elsewhere is recommended"
                );
            }
        }

        let mut names: Vec<&String> = excluded.iter().collect();
        names.sort();
        info!(excluded = ?names, "files excluded from monitoring");

        Self {
            directory,
            canonical_directory,
            policy,
            excluded,
            audit_in_directory,
            directory_missing: AtomicBool::new(false),
        }
    }

    /// 파이프라인 설정에서 탐색기를 생성합니다.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let audit = config.audit_path();
        Self::new(
            config.log_directory(),
            FilePolicy::from_config(config),
            config.exclude.clone(),
            audit.as_deref(),
        )
    }

    /// 감시 디렉토리
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// 추적 정책
    pub fn policy(&self) -> &FilePolicy {
        &self.policy
    }

    /// 제외 대상 basename인지 확인합니다.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(name)
    }

    /// 감사 로그가 감시 디렉토리 안에 있는지
    pub fn audit_in_directory(&self) -> bool {
        self.audit_in_directory
    }

    /// 마지막 스캔에서 감시 디렉토리가 없었는지
    pub fn directory_missing(&self) -> bool {
        self.directory_missing.load(Ordering::Relaxed)
    }

    /// 경로가 감시 디렉토리 바로 아래에 있고, 제외되지 않았으며, 정책에 맞는지 확인합니다.
    ///
    /// 파일 종류(일반 파일 여부)는 확인하지 않으며 파일시스템에 접근하지 않습니다.
    pub fn accepts(&self, path: &Path) -> bool {
        let Some(parent) = path.parent() else {
            return false;
        };
        if parent != self.directory && Some(parent) != self.canonical_directory.as_deref() {
            return false;
        }
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => !self.is_excluded(name) && self.policy.matches(name),
            None => false,
        }
    }

    /// 디렉토리를 스캔하여 추적 중이 아닌 대상 파일을 등록합니다.
    ///
    /// `initial`이면 현재 크기로, 아니면 0으로 등록합니다.
    /// 새로 등록된 경로를 정렬해 반환합니다.
    pub async fn scan(&self, offsets: &mut OffsetStore, initial: bool) -> Vec<PathBuf> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => {
                if self.directory_missing.swap(false, Ordering::Relaxed) {
                    info!(directory = %self.directory.display(), "watched directory is available again");
                }
                entries
            }
            Err(e) => {
                if !self.directory_missing.swap(true, Ordering::Relaxed) {
                    warn!(
                        directory = %self.directory.display(),
                        error = %e,
                        "watched directory is not accessible; check that Suricata is installed and configured"
                    );
                }
                return Vec::new();
            }
        };

        let mut registered = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(directory = %self.directory.display(), error = %e, "failed to read directory entry");
                    break;
                }
            };

            let path = entry.path();
            if !self.accepts(&path) || offsets.contains(&path) {
                continue;
            }

            // 심볼릭 링크는 따라가서 판단
            let metadata = match tokio::fs::metadata(&path).await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };

            let offset = if initial { metadata.len() } else { 0 };
            if offsets.register(&path, offset) {
                info!(path = %path.display(), offset, "tracking new file");
                registered.push(path);
            }
        }

        registered.sort();
        registered
    }
}

/// 감사 로그 위치 판단용 디렉토리 비교. 생성 시 한 번만 호출됩니다.
fn same_directory(candidate: Option<&Path>, directory: &Path, canonical: Option<&Path>) -> bool {
    let Some(candidate) = candidate else {
        return false;
    };
    let candidate = if candidate.as_os_str().is_empty() {
        Path::new(".")
    } else {
        candidate
    };
    if candidate == directory {
        return true;
    }
    match (std::fs::canonicalize(candidate), canonical) {
        (Ok(a), Some(b)) => a == b,
        _ => false,
    }
}
