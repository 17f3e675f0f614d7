//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `surimon_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(surimon_core::metrics::LINES_PROCESSED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 차단 사유 레이블 키 (flood, rule)
pub const LABEL_REASON: &str = "reason";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 트리거 레이블 키 (notify, poll)
pub const LABEL_TRIGGER: &str = "trigger";

// ─── 테일러 메트릭 ──────────────────────────────────────────────────

/// 읽어서 분류기로 전달한 전체 라인 수 (counter)
pub const LINES_PROCESSED_TOTAL: &str = "surimon_lines_processed_total";

/// 읽기 실패 수 (counter)
pub const TAIL_ERRORS_TOTAL: &str = "surimon_tail_errors_total";

/// truncation/rotation 감지로 오프셋이 0으로 리셋된 횟수 (counter)
pub const OFFSET_RESETS_TOTAL: &str = "surimon_offset_resets_total";

/// 실행된 tail pass 수 (counter, label: trigger)
pub const TAIL_PASSES_TOTAL: &str = "surimon_tail_passes_total";

/// 현재 추적 중인 파일 수 (gauge)
pub const TRACKED_FILES: &str = "surimon_tracked_files";

// ─── 분류기 메트릭 ──────────────────────────────────────────────────

/// ICMP echo request로 인식된 라인 수 (counter)
pub const PROBE_LINES_TOTAL: &str = "surimon_probe_lines_total";

/// 규칙 매칭 수 (counter)
pub const RULE_MATCHES_TOTAL: &str = "surimon_rule_matches_total";

/// 로드된 규칙 수 (gauge)
pub const RULES_LOADED: &str = "surimon_rules_loaded";

// ─── 차단 실행 메트릭 ────────────────────────────────────────────────

/// 방화벽 차단 시도 수 (counter, labels: reason, result)
pub const ACTIONS_TOTAL: &str = "surimon_actions_total";

/// 차단된 주소 수 (gauge)
pub const BLOCKED_SUBJECTS: &str = "surimon_blocked_subjects";

/// 감사 로그 기록 실패 수 (counter)
pub const AUDIT_WRITE_ERRORS_TOTAL: &str = "surimon_audit_write_errors_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `surimon-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        LINES_PROCESSED_TOTAL,
        "Total number of log lines handed to the classifier"
    );
    describe_counter!(TAIL_ERRORS_TOTAL, "Total number of failed tail passes");
    describe_counter!(
        OFFSET_RESETS_TOTAL,
        "Offsets reset to zero after truncation or rotation"
    );
    describe_counter!(TAIL_PASSES_TOTAL, "Tail passes by trigger (notify, poll)");
    describe_gauge!(TRACKED_FILES, "Number of files currently tracked");

    describe_counter!(
        PROBE_LINES_TOTAL,
        "Lines recognized as IPv4 ICMP echo requests"
    );
    describe_counter!(RULE_MATCHES_TOTAL, "Total number of rule matches");
    describe_gauge!(RULES_LOADED, "Number of compiled detection rules");

    describe_counter!(
        ACTIONS_TOTAL,
        "Firewall enforcement attempts by reason and result"
    );
    describe_gauge!(BLOCKED_SUBJECTS, "Number of subjects blocked in this process");
    describe_counter!(
        AUDIT_WRITE_ERRORS_TOTAL,
        "Total number of failed audit log writes"
    );
}
