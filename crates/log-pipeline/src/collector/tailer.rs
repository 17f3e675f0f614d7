//! 증분 테일러
//!
//! 한 번의 패스는 파일 크기 `S`를 먼저 관찰하고, `[offset, S)` 구간만 읽은 뒤
//! 오프셋을 읽은 끝 위치로 옮깁니다. 줄바꿈으로 끝나지 않은 마지막 조각도
//! 한 줄로 내보냅니다.
//!
//! # 로테이션 감지
//! - 현재 크기가 저장된 오프셋보다 작으면 (truncation, 더 작은 새 파일로 교체)
//!   오프셋을 0으로 되돌린 후 읽습니다.

use std::io::SeekFrom;
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info};

use surimon_core::metrics as m;
use surimon_core::types::LogLine;

use super::offset::OffsetStore;
use crate::error::LogPipelineError;

/// 한 번의 테일 패스 결과
#[derive(Debug, Default)]
pub struct TailOutcome {
    /// 새로 읽은 라인
    pub lines: Vec<LogLine>,
    /// 이번 패스에서 오프셋이 0으로 리셋되었는지
    pub reset: bool,
    /// 패스 시작 시 관찰한 파일 크기
    pub observed_size: u64,
    /// 읽은 바이트 수
    pub bytes_read: u64,
}

/// 증분 테일러
pub struct Tailer;

impl Tailer {
    /// 저장된 오프셋 이후에 추가된 라인을 읽습니다.
    ///
    /// 추적 중이 아닌 파일은 오프셋 0으로 등록한 뒤 읽습니다.
    /// 실패 시 오프셋은 변경되지 않습니다 (리셋이 먼저 일어난 경우 제외).
    pub async fn tail(
        offsets: &mut OffsetStore,
        path: &Path,
    ) -> Result<TailOutcome, LogPipelineError> {
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| tail_error(path, "failed to read metadata", e))?
            .len();

        offsets.register(path, 0);
        let mut offset = offsets.offset(path).unwrap_or(0);
        let mut outcome = TailOutcome {
            observed_size: size,
            ..TailOutcome::default()
        };

        if size < offset {
            info!(
                path = %path.display(),
                previous_offset = offset,
                size,
                "file shrank, reading from start"
            );
            metrics::counter!(m::OFFSET_RESETS_TOTAL).increment(1);
            offsets.reset(path);
            offset = 0;
            outcome.reset = true;
        }

        if size == offset {
            return Ok(outcome);
        }

        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| tail_error(path, "failed to open", e))?;
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| tail_error(path, "failed to seek", e))?;

        let want = size - offset;
        let mut buf = Vec::with_capacity(usize::try_from(want).unwrap_or(0));
        let read = file
            .take(want)
            .read_to_end(&mut buf)
            .await
            .map_err(|e| tail_error(path, "failed to read", e))?;

        // 읽는 도중 파일이 줄어들었으면 실제로 읽은 만큼만 전진
        let read = read as u64;
        offsets.advance(path, offset + read);
        outcome.bytes_read = read;
        outcome.lines = split_lines(&buf)
            .into_iter()
            .map(|text| LogLine::new(text, path))
            .collect();

        debug!(
            path = %path.display(),
            from = offset,
            to = offset + read,
            lines = outcome.lines.len(),
            "tail pass complete"
        );

        Ok(outcome)
    }
}

/// 바이트를 lossy UTF-8로 디코딩하고 라인으로 분리합니다.
///
/// `\n`과 `\r\n`을 모두 허용합니다. 마지막 줄바꿈 뒤의 빈 조각은 버립니다.
pub fn split_lines(buf: &[u8]) -> Vec<String> {
    if buf.is_empty() {
        return Vec::new();
    }
    let text = String::from_utf8_lossy(buf);
    let body = text.strip_suffix('\n').unwrap_or(&text);
    body.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_owned())
        .collect()
}

fn tail_error(path: &Path, action: &str, err: std::io::Error) -> LogPipelineError {
    LogPipelineError::Tail {
        path: path.display().to_string(),
        reason: format!("{action}: {err}"),
    }
}
