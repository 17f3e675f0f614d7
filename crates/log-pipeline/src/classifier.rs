//! 라인 분류기 -- 내장 flood 휴리스틱과 사용자 규칙
//!
//! 분류는 두 단계로 이뤄집니다.
//!
//! 1. ICMP echo request 라인(Suricata fast.log 형식의 `{ICMP} <src>:8 -> <dst>:0`)은
//!    출발지별 카운터를 올리고, 카운터가 임계값을 넘었으며 아직 차단되지 않은
//!    주소이면 flood 차단을 요청합니다. probe 라인은 규칙 단계로 넘어가지 않습니다.
//! 2. 그 외 라인은 순서 있는 규칙 집합에 대해 평가되며, 첫 매칭이 규칙 차단을
//!    요청합니다.
//!
//! 카운터는 프로세스 수명 동안 줄어들지 않습니다.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};

use regex::Regex;

use surimon_core::metrics as m;
use surimon_core::types::{ActionRequest, LogLine};
use surimon_firewall::BlockedSet;

use crate::error::LogPipelineError;
use crate::rule::RuleSet;

/// ICMP echo request (type 8) 라인에서 IPv4 출발지를 추출하는 패턴
pub const ECHO_REQUEST_PATTERN: &str = r"\{ICMP\}\s+(?P<ip>\d{1,3}(?:\.\d{1,3}){3}):8\s+->";

/// 기본 flood 임계값
pub const DEFAULT_FLOOD_THRESHOLD: u64 = 10;

/// 출발지별 echo request 누적 카운터
#[derive(Debug, Clone, Default)]
pub struct FloodCounters {
    counts: HashMap<IpAddr, u64>,
}

impl FloodCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// 카운터를 1 올리고 새 값을 반환합니다.
    pub fn increment(&mut self, subject: IpAddr) -> u64 {
        let count = self.counts.entry(subject).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// 현재 카운트 (없으면 0)
    pub fn count(&self, subject: &IpAddr) -> u64 {
        self.counts.get(subject).copied().unwrap_or(0)
    }

    /// 카운터가 있는 주소 수
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// ICMP echo flood 탐지기
#[derive(Debug, Clone)]
pub struct FloodDetector {
    pattern: Regex,
    threshold: u64,
}

impl FloodDetector {
    /// 임계값을 지정하여 탐지기를 생성합니다.
    pub fn new(threshold: u64) -> Result<Self, LogPipelineError> {
        Ok(Self {
            pattern: Regex::new(ECHO_REQUEST_PATTERN)?,
            threshold,
        })
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// echo request 라인이면 IPv4 출발지를 반환합니다.
    pub fn probe_source(&self, line: &str) -> Option<Ipv4Addr> {
        let captures = self.pattern.captures(line)?;
        captures.name("ip")?.as_str().parse().ok()
    }
}

/// 분류 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// 통과 기록만 남김
    Pass,
    /// echo request probe. 카운터만 증가
    Probe {
        /// 출발지
        subject: IpAddr,
        /// 증가 후 카운트
        count: u64,
    },
    /// 차단 요청
    Action(ActionRequest),
}

impl Verdict {
    /// 차단 요청이 있으면 반환합니다.
    pub fn action(&self) -> Option<&ActionRequest> {
        match self {
            Self::Action(req) => Some(req),
            _ => None,
        }
    }
}

/// 2단계 라인 분류기
#[derive(Debug, Clone)]
pub struct Classifier {
    flood: FloodDetector,
    rules: RuleSet,
}

impl Classifier {
    pub fn new(flood: FloodDetector, rules: RuleSet) -> Self {
        Self { flood, rules }
    }

    pub fn flood_detector(&self) -> &FloodDetector {
        &self.flood
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// 라인을 분류합니다.
    ///
    /// `counters`는 probe 라인일 때만 변경됩니다. `blocked`는 flood 요청을
    /// 걸러내는 데만 사용되며, 규칙 요청의 중복 차단은 실행기가 막습니다.
    pub fn classify(
        &self,
        line: &LogLine,
        counters: &mut FloodCounters,
        blocked: &BlockedSet,
    ) -> Verdict {
        if let Some(source) = self.flood.probe_source(&line.text) {
            metrics::counter!(m::PROBE_LINES_TOTAL).increment(1);
            let subject = IpAddr::V4(source);
            let count = counters.increment(subject);
            if count > self.flood.threshold && !blocked.contains(&subject) {
                return Verdict::Action(ActionRequest::flood(
                    subject,
                    count,
                    line.source_name.clone(),
                ));
            }
            return Verdict::Probe { subject, count };
        }

        if let Some(found) = self.rules.first_match(&line.text) {
            metrics::counter!(m::RULE_MATCHES_TOTAL).increment(1);
            return Verdict::Action(ActionRequest::rule(
                found.subject,
                found.rule.name(),
                found.rule.duration_secs(),
                line.source_name.clone(),
            ));
        }

        Verdict::Pass
    }
}
