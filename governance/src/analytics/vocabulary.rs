//! Closed lists the analytics firewall checks against.

use std::sync::LazyLock;

use regex::Regex;

/// Events the client may send.
pub const ALLOWED_EVENTS: &[&str] = &[
    "tool_view",
    "tool_start",
    "tool_complete",
    "tool_exit",
    "pain_point_view",
    "gate_view",
    "navigation",
    "share_click",
    "search_performed",
];

/// Events that encode psychological inference and are never accepted.
pub const FORBIDDEN_EVENTS: &[&str] = &[
    "mood_check",
    "emotion_detected",
    "distress_signal",
    "vulnerability_flag",
    "sentiment_score",
];

/// Parameter names an event may carry.
pub const ALLOWED_PARAMS: &[&str] = &[
    "tool_id",
    "pain_point_id",
    "gate_id",
    "duration_secs",
    "step_index",
    "step_count",
    "from_page",
    "to_page",
    "result_count",
    "share_target",
    "region",
];

/// Parameter names that name a psychological label.
pub const FORBIDDEN_PARAMS: &[&str] = &[
    "emotional_state",
    "emotion",
    "mood",
    "mental_state",
    "stress_level",
    "anxiety_level",
    "vulnerability_score",
    "risk_score",
    "diagnosis",
    "sentiment",
    "user_feeling",
];

/// Purposes aggregate data may be used for.
pub const ALLOWED_USE_CASES: &[&str] = &[
    "weight_adjustment",
    "tool_ordering",
    "aggregate_usefulness_report",
    "flag_for_human_review",
];

/// Purposes aggregate data must never be used for.
pub const DENIED_USE_CASES: &[&str] = &[
    "merch_trigger",
    "tone_change",
    "personalization",
    "vulnerability_targeting",
];

/// Terms that must not appear in any parameter value.
const BANNED_TERMS: &[&str] = &[
    "depressed",
    "depression",
    "anxious",
    "suicidal",
    "suicide",
    "self-harm",
    "self harm",
    "lonely",
    "loneliness",
    "vulnerable",
    "vulnerability",
    "distressed",
    "hopeless",
    "worthless",
    "traumatized",
    "diagnosis",
    "diagnosed",
    "disorder",
    "bipolar",
    "ptsd",
    "medication",
    "crying",
    "sad",
    "unhappy",
    "mood",
    "emotional",
];

static BANNED_VOCABULARY: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = BANNED_TERMS
        .iter()
        .map(|term| regex::escape(term))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).expect("hardcoded regex")
});

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]{0,63}$").expect("hardcoded regex"));

static PAGE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[a-z0-9/_-]{0,255}$").expect("hardcoded regex"));

pub fn is_allowed_event(name: &str) -> bool {
    ALLOWED_EVENTS.contains(&name)
}

pub fn is_forbidden_event(name: &str) -> bool {
    FORBIDDEN_EVENTS.contains(&name.to_ascii_lowercase().as_str())
}

pub fn is_allowed_param(name: &str) -> bool {
    ALLOWED_PARAMS.contains(&name)
}

pub fn is_forbidden_param(name: &str) -> bool {
    FORBIDDEN_PARAMS.contains(&name.to_ascii_lowercase().as_str())
}

pub fn is_allowed_use_case(use_case: &str) -> bool {
    ALLOWED_USE_CASES.contains(&use_case)
}

pub fn is_denied_use_case(use_case: &str) -> bool {
    DENIED_USE_CASES.contains(&use_case.to_ascii_lowercase().as_str())
}

/// First banned term in `value`, if any.
pub fn banned_term(value: &str) -> Option<String> {
    BANNED_VOCABULARY
        .find(value)
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Lower-case slug identifier.
pub fn is_identifier(value: &str) -> bool {
    IDENTIFIER.is_match(value)
}

/// Site-relative page path.
pub fn is_page_path(value: &str) -> bool {
    PAGE_PATH.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_are_disjoint() {
        assert!(ALLOWED_EVENTS.iter().all(|e| !FORBIDDEN_EVENTS.contains(e)));
        assert!(ALLOWED_PARAMS.iter().all(|p| !FORBIDDEN_PARAMS.contains(p)));
        assert!(ALLOWED_USE_CASES.iter().all(|u| !DENIED_USE_CASES.contains(u)));
    }

    #[test]
    fn test_banned_term_word_boundaries() {
        assert_eq!(banned_term("user seems Depressed today"), Some("depressed".to_string()));
        assert_eq!(banned_term("self-harm"), Some("self-harm".to_string()));
        // "sad" inside another word is not a match
        assert_eq!(banned_term("crusader"), None);
        assert_eq!(banned_term("breathing-reset"), None);
    }

    #[test]
    fn test_identifier_and_path() {
        assert!(is_identifier("breathing-reset"));
        assert!(!is_identifier("Breathing Reset"));
        assert!(!is_identifier(""));
        assert!(is_page_path("/tools/breathing-reset"));
        assert!(!is_page_path("https://example.com/"));
        assert!(!is_page_path("/tools?mood=low"));
    }
}
