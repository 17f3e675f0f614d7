#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`collector`]: 오프셋 추적, 증분 테일링, 파일 탐색, 이벤트 소스
//! - [`classifier`]: ICMP echo flood 휴리스틱과 규칙 매칭
//! - [`rule`]: 정규식 탐지 규칙 로딩/컴파일
//! - [`audit`]: append-only 감사 로그
//! - [`state`]: 공유 모니터 상태 (오프셋, flood 카운터, 차단 집합)
//! - [`engine`]: 테일 패스 실행 엔진
//! - [`pipeline`]: 생명주기 관리 (Pipeline trait 구현)
//! - [`config`]: 모니터 설정 (core 설정 기반)
//! - [`error`]: 도메인 에러 타입

pub mod audit;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod state;

pub mod collector;
pub mod rule;

// --- 주요 타입 re-export ---

// 모니터
pub use pipeline::{LogMonitor, LogMonitorBuilder};

// 엔진
pub use engine::{MonitorEngine, PassSummary};
pub use state::MonitorState;

// 설정
pub use config::{PipelineConfig, PipelineConfigBuilder};

// 에러
pub use error::LogPipelineError;

// 분류기
pub use classifier::{Classifier, FloodCounters, FloodDetector, Verdict};

// 규칙
pub use rule::{CompiledRule, RuleDefinition, RuleLoader, RuleMatch, RuleSet};

// 수집기
pub use collector::{Discovery, FilePolicy, FsChange, OffsetStore, Tailer, Trigger};

// 감사 로그
pub use audit::AuditLog;
