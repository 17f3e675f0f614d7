//! 규칙 파일 로더 -- YAML/JSON 규칙 파일을 디스크에서 로드합니다.
//!
//! 파일 확장자가 `.json`이면 JSON, 그 외에는 YAML로 파싱합니다.
//! 최상위는 규칙 정의의 목록이어야 합니다.

use std::path::Path;

use tracing::{info, warn};

use surimon_core::metrics as m;

use super::matcher::RuleSet;
use super::types::RuleDefinition;
use crate::error::LogPipelineError;

/// 규칙 파일 로더 설정
const MAX_RULE_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB
const MAX_RULES_COUNT: usize = 10_000;

/// 규칙 파일 로더
pub struct RuleLoader;

impl RuleLoader {
    /// 규칙 파일을 로드하여 컴파일된 규칙 집합을 반환합니다.
    ///
    /// 경로가 없으면 빈 집합입니다. 파일을 읽거나 파싱할 수 없으면
    /// 경고를 남기고 빈 집합을 반환합니다. 시작을 막지 않습니다.
    pub async fn load_rule_set(path: Option<&Path>) -> RuleSet {
        let Some(path) = path else {
            info!("no rule file configured, rule matching disabled");
            metrics::gauge!(m::RULES_LOADED).set(0.0);
            return RuleSet::empty();
        };

        let set = match Self::load_file(path).await {
            Ok(defs) => {
                let set = RuleSet::compile(&defs);
                info!(
                    path = %path.display(),
                    defined = defs.len(),
                    loaded = set.len(),
                    "loaded detection rules"
                );
                set
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to load rule file, continuing with no rules"
                );
                RuleSet::empty()
            }
        };

        metrics::gauge!(m::RULES_LOADED).set(set.len() as f64);
        set
    }

    /// 규칙 파일에서 규칙 정의를 읽습니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Vec<RuleDefinition>, LogPipelineError> {
        let path = path.as_ref();

        // 파일 크기 검증
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| LogPipelineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(LogPipelineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_RULE_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| LogPipelineError::RuleLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file: {e}"),
                })?;

        let source = path.display().to_string();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        if is_json {
            Self::parse_json(&content, &source)
        } else {
            Self::parse_yaml(&content, &source)
        }
    }

    /// YAML 문자열을 파싱합니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<Vec<RuleDefinition>, LogPipelineError> {
        let defs: Vec<RuleDefinition> =
            serde_yaml::from_str(yaml_str).map_err(|e| LogPipelineError::RuleLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;
        Self::check_count(defs, source)
    }

    /// JSON 문자열을 파싱합니다.
    pub fn parse_json(json_str: &str, source: &str) -> Result<Vec<RuleDefinition>, LogPipelineError> {
        let defs: Vec<RuleDefinition> =
            serde_json::from_str(json_str).map_err(|e| LogPipelineError::RuleLoad {
                path: source.to_owned(),
                reason: format!("JSON parse error: {e}"),
            })?;
        Self::check_count(defs, source)
    }

    fn check_count(
        defs: Vec<RuleDefinition>,
        source: &str,
    ) -> Result<Vec<RuleDefinition>, LogPipelineError> {
        if defs.len() > MAX_RULES_COUNT {
            return Err(LogPipelineError::RuleLoad {
                path: source.to_owned(),
                reason: format!("too many rules: max {MAX_RULES_COUNT}"),
            });
        }
        Ok(defs)
    }
}
