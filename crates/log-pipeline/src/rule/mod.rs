//! 탐지 규칙 -- 사용자 정의 정규식 규칙 집합
//!
//! 규칙 파일은 순서 있는 규칙 정의의 목록입니다. 각 규칙은 `ip` named
//! capture group으로 차단 대상 주소를 지정합니다.
//!
//! # 규칙 형식
//! ```yaml
//! - name: bad_signature
//!   pattern: 'BADSIG.*src=(?P<ip>\d{1,3}(?:\.\d{1,3}){3})'
//!   duration: 600
//! ```
//!
//! # 아키텍처
//! - [`loader`]: YAML/JSON 파일 로딩
//! - [`matcher`]: 정규식 컴파일 및 순서대로 첫 매칭 탐색 ([`RuleSet`])
//! - [`types`]: 규칙 데이터 구조 정의

pub mod loader;
pub mod matcher;
pub mod types;

pub use loader::RuleLoader;
pub use matcher::{CompiledRule, RuleMatch, RuleSet};
pub use types::{RuleDefinition, SUBJECT_GROUP};
