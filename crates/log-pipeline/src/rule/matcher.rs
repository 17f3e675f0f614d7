//! 규칙 매칭 로직 -- 컴파일된 규칙과 순서 있는 규칙 집합
//!
//! 정규식은 로드 시 한 번만 컴파일합니다. [`RuleSet::first_match`]는
//! 정의 순서대로 평가하여 처음으로 유효한 주소를 내놓는 규칙을 반환합니다.

use std::net::IpAddr;

use regex::Regex;
use tracing::warn;

use super::types::{RuleDefinition, SUBJECT_GROUP};
use crate::error::LogPipelineError;

/// 컴파일된 규칙
#[derive(Debug, Clone)]
pub struct CompiledRule {
    name: String,
    duration_secs: u64,
    position: usize,
    regex: Regex,
}

impl CompiledRule {
    /// 규칙 정의를 컴파일합니다.
    ///
    /// # Errors
    /// - 패턴이 비어있거나 정규식 컴파일에 실패한 경우
    /// - `ip` named group이 없는 경우
    pub fn compile(def: &RuleDefinition, position: usize) -> Result<Self, LogPipelineError> {
        def.validate(position)?;
        let name = def.display_name(position);

        let regex = Regex::new(&def.pattern).map_err(|e| LogPipelineError::RuleValidation {
            rule: name.clone(),
            reason: format!("invalid pattern: {e}"),
        })?;

        if !regex.capture_names().flatten().any(|n| n == SUBJECT_GROUP) {
            return Err(LogPipelineError::RuleValidation {
                rule: name,
                reason: format!("pattern has no named group '{SUBJECT_GROUP}'"),
            });
        }

        Ok(Self {
            name,
            duration_secs: def.duration,
            position,
            regex,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// 규칙 파일 내 위치 (0부터)
    pub fn position(&self) -> usize {
        self.position
    }

    /// 라인에서 주소를 추출합니다.
    ///
    /// 패턴이 매칭되고 `ip` 캡처가 비어있지 않으며 주소로 파싱될 때만 `Some`.
    pub fn extract_subject(&self, line: &str) -> Option<IpAddr> {
        let captures = self.regex.captures(line)?;
        let raw = captures.name(SUBJECT_GROUP)?.as_str().trim();
        if raw.is_empty() {
            return None;
        }
        raw.parse().ok()
    }
}

/// 규칙 매칭 결과
#[derive(Debug, Clone, Copy)]
pub struct RuleMatch<'a> {
    /// 매칭된 규칙
    pub rule: &'a CompiledRule,
    /// 추출된 주소
    pub subject: IpAddr,
}

/// 순서 있는 규칙 집합. 로드 이후 변경되지 않습니다.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// 빈 규칙 집합
    pub fn empty() -> Self {
        Self::default()
    }

    /// 규칙 정의 목록을 컴파일합니다.
    ///
    /// 컴파일할 수 없는 규칙은 경고를 남기고 건너뜁니다. 나머지 규칙의
    /// 상대 순서는 유지됩니다.
    pub fn compile(defs: &[RuleDefinition]) -> Self {
        let mut rules = Vec::with_capacity(defs.len());
        for (position, def) in defs.iter().enumerate() {
            match CompiledRule::compile(def, position) {
                Ok(rule) => rules.push(rule),
                Err(e) => {
                    warn!(position, error = %e, "skipping invalid rule");
                }
            }
        }
        Self { rules }
    }

    /// 처음으로 매칭되는 규칙을 찾습니다.
    ///
    /// 패턴이 매칭되더라도 주소를 얻지 못하면 다음 규칙으로 넘어갑니다.
    pub fn first_match(&self, line: &str) -> Option<RuleMatch<'_>> {
        self.rules.iter().find_map(|rule| {
            rule.extract_subject(line)
                .map(|subject| RuleMatch { rule, subject })
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPV4: &str = r"\d{1,3}(?:\.\d{1,3}){3}";

    fn def(name: &str, pattern: &str, duration: u64) -> RuleDefinition {
        RuleDefinition::new(Some(name), pattern, duration)
    }

    #[test]
    fn compile_rejects_pattern_without_ip_group() {
        let err = CompiledRule::compile(&def("noip", r"BADSIG (\S+)", 60), 0).unwrap_err();
        assert!(err.to_string().contains("named group"));
    }

    #[test]
    fn compile_rejects_invalid_regex() {
        let err = CompiledRule::compile(&def("broken", r"BADSIG (?P<ip>[", 60), 0).unwrap_err();
        assert!(matches!(err, LogPipelineError::RuleValidation { .. }));
    }

    #[test]
    fn both_named_group_syntaxes_accepted() {
        let python_style = format!(r"src=(?P<ip>{IPV4})");
        let modern_style = format!(r"src=(?<ip>{IPV4})");
        let set = RuleSet::compile(&[def("a", &python_style, 1), def("b", &modern_style, 2)]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn extract_requires_parseable_address() {
        let rule = CompiledRule::compile(&def("r", r"src=(?P<ip>\S*)", 60), 0).unwrap();
        assert_eq!(rule.extract_subject("src=10.0.0.5"), Some("10.0.0.5".parse().unwrap()));
        assert_eq!(rule.extract_subject("src=2001:db8::1"), Some("2001:db8::1".parse().unwrap()));
        assert_eq!(rule.extract_subject("src="), None);
        assert_eq!(rule.extract_subject("src=not-an-ip"), None);
        assert_eq!(rule.extract_subject("no match here"), None);
    }

    #[test]
    fn first_matching_rule_wins() {
        let set = RuleSet::compile(&[
            def("first", &format!(r"SCAN.*from (?P<ip>{IPV4})"), 300),
            def("second", &format!(r"from (?P<ip>{IPV4})"), 600),
        ]);

        let m = set.first_match("ET SCAN nmap from 192.168.1.7").unwrap();
        assert_eq!(m.rule.name(), "first");
        assert_eq!(m.rule.duration_secs(), 300);

        let m = set.first_match("connection from 192.168.1.8").unwrap();
        assert_eq!(m.rule.name(), "second");
        assert_eq!(m.subject, "192.168.1.8".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn unparseable_capture_falls_through_to_next_rule() {
        let set = RuleSet::compile(&[
            def("loose", r"host=(?P<ip>\S+)", 60),
            def("strict", &format!(r"addr (?P<ip>{IPV4})"), 120),
        ]);
        let m = set.first_match("host=gateway addr 10.1.1.1").unwrap();
        assert_eq!(m.rule.name(), "strict");
    }

    #[test]
    fn invalid_rules_skipped_order_kept() {
        let set = RuleSet::compile(&[
            def("ok1", r"a(?P<ip>\S+)", 1),
            def("bad", r"(", 2),
            def("noip", r"b(\S+)", 3),
            def("ok2", r"c(?P<ip>\S+)", 4),
        ]);
        let names: Vec<&str> = set.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["ok1", "ok2"]);
        assert_eq!(set.iter().map(|r| r.position()).collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn empty_set_never_matches() {
        let set = RuleSet::empty();
        assert!(set.is_empty());
        assert!(set.first_match("BADSIG src=10.0.0.5").is_none());
    }
}
