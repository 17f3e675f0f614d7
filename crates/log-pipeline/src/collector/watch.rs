//! 파일시스템 변경 알림 소스
//!
//! 감시 디렉토리에 `notify::RecommendedWatcher`를 (비재귀로) 걸고, 생성/수정
//! 이벤트마다 해당 파일의 테일 패스를 엔진에 요청합니다. 접근/삭제 이벤트는
//! 무시합니다. 삭제된 파일의 정리는 폴링 패스가 맡습니다. 생성 이벤트는
//! 이미 추적 중인 경로라도 새 파일로 보고 처음부터 읽게 합니다.
//!
//! 워처 콜백은 notify의 스레드에서 실행되므로 `blocking_send`로 tokio 채널에
//! 넘깁니다.

use std::path::PathBuf;
use std::sync::Arc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use surimon_firewall::FirewallClient;

use super::FsChange;
use crate::engine::MonitorEngine;
use crate::error::LogPipelineError;

/// 테일 패스를 요청할 이벤트 종류를 판별합니다.
///
/// 생성/수정만 대상이며, 접근/삭제 등은 `None`입니다.
pub fn change_kind(kind: &EventKind) -> Option<FsChange> {
    match kind {
        EventKind::Create(_) => Some(FsChange::Created),
        EventKind::Modify(_) => Some(FsChange::Modified),
        _ => None,
    }
}

/// 이벤트에서 변경 종류와 테일 대상 경로를 꺼냅니다.
fn targets(event: Event) -> Option<(FsChange, Vec<PathBuf>)> {
    change_kind(&event.kind).map(|change| (change, event.paths))
}

type WatchResult = Result<Event, notify::Error>;

/// 워처 스레드에서 이벤트를 태스크로 넘깁니다. 수신측이 닫혔으면 `false`.
fn forward(tx: &mpsc::Sender<WatchResult>, res: WatchResult) -> bool {
    match tx.blocking_send(res) {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "watch receiver closed, dropping file event");
            false
        }
    }
}

/// 알림 소스 태스크를 시작합니다.
///
/// 감시 디렉토리가 없으면 경고를 남기고 `None`을 반환합니다. 이 경우
/// 폴링 소스만으로 모니터링합니다.
pub fn spawn<F: FirewallClient>(
    engine: Arc<MonitorEngine<F>>,
    capacity: usize,
    cancel: CancellationToken,
) -> Result<Option<JoinHandle<()>>, LogPipelineError> {
    let directory = engine.discovery().directory().to_path_buf();
    if !directory.is_dir() {
        warn!(
            directory = %directory.display(),
            "watched directory does not exist, change notifications disabled (polling only)"
        );
        return Ok(None);
    }

    let (tx, mut rx) = mpsc::channel::<WatchResult>(capacity);
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            forward(&tx, res);
        },
        Config::default(),
    )?;
    watcher.watch(&directory, RecursiveMode::NonRecursive)?;
    info!(directory = %directory.display(), "watching directory for changes");

    let handle = tokio::spawn(async move {
        // 태스크가 끝날 때 워처도 해제
        let _watcher = watcher;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                received = rx.recv() => match received {
                    Some(Ok(event)) => {
                        if let Some((change, paths)) = targets(event) {
                            for path in paths {
                                engine.on_fs_event(&path, change).await;
                            }
                        }
                    }
                    Some(Err(e)) => warn!(error = %e, "file watcher error"),
                    None => break,
                },
            }
        }
        debug!("watch task stopped");
    });

    Ok(Some(handle))
}
