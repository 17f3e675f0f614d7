//! 주기적 폴링 소스
//!
//! 변경 알림을 놓치거나 알림을 쓸 수 없는 환경에서도 고정 주기로 전체 패스를
//! 실행합니다. 사라진 파일 정리와 새 파일 탐색도 여기서 이뤄집니다.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use surimon_firewall::FirewallClient;

use crate::engine::MonitorEngine;

/// 폴링 소스 태스크를 시작합니다.
pub fn spawn<F: FirewallClient>(
    engine: Arc<MonitorEngine<F>>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 첫 tick은 즉시 완료됨. 시작 스캔 직후 바로 돌 필요 없음
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let summary = engine.poll_pass().await;
                    if summary.lines > 0 {
                        debug!(
                            lines = summary.lines,
                            requests = summary.requests,
                            blocked = summary.blocked,
                            "poll pass complete"
                        );
                    }
                }
            }
        }
        debug!("poll task stopped");
    })
}
