//! Core types for veto evaluation.
//!
//! With the `typescript` feature enabled, the result types can be exported
//! to TypeScript for the rendering layer using ts-rs.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Category of a veto rule.
///
/// The first five are text categories evaluated by
/// [`EthicsGuard::evaluate`](crate::EthicsGuard::evaluate); the next four are
/// UX-pattern categories. The last three are reserved for input and
/// evaluation failures and are never produced by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleCategory {
    /// Diagnostic or treatment language about mental health conditions
    ClinicalLanguage,
    /// Urgency or pressure framing ("act now", "last chance")
    UrgencyPressure,
    /// Leveraging fear, shame or guilt to drive action
    EmotionalLeverage,
    /// Promises of guaranteed results
    OutcomeGuarantee,
    /// Symbolic systems (numerology, astrology) framed as literal truth
    SymbolicAsLiteral,
    /// UX timed to moments of distress
    DistressTiming,
    /// Blocking or forced actions
    ForcedAction,
    /// Countdown timers and expiry pressure
    CountdownPressure,
    /// Manipulative choice framing
    DarkPatternChoice,
    /// Empty or whitespace-only input
    EmptyInput,
    /// Input that is not a string or not a well-formed descriptor
    InvalidInput,
    /// Internal failure during evaluation
    EvaluationError,
}

impl RuleCategory {
    /// Upper-case code used in veto reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClinicalLanguage => "CLINICAL_LANGUAGE",
            Self::UrgencyPressure => "URGENCY_PRESSURE",
            Self::EmotionalLeverage => "EMOTIONAL_LEVERAGE",
            Self::OutcomeGuarantee => "OUTCOME_GUARANTEE",
            Self::SymbolicAsLiteral => "SYMBOLIC_AS_LITERAL",
            Self::DistressTiming => "DISTRESS_TIMING",
            Self::ForcedAction => "FORCED_ACTION",
            Self::CountdownPressure => "COUNTDOWN_PRESSURE",
            Self::DarkPatternChoice => "DARK_PATTERN_CHOICE",
            Self::EmptyInput => "EMPTY_INPUT",
            Self::InvalidInput => "INVALID_INPUT",
            Self::EvaluationError => "EVALUATION_ERROR",
        }
    }

    /// Lower-case code, used when the category is embedded in other reports.
    pub fn code(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }

    /// Whether rules of this category apply to free text.
    pub fn is_text_category(&self) -> bool {
        matches!(
            self,
            Self::ClinicalLanguage
                | Self::UrgencyPressure
                | Self::EmotionalLeverage
                | Self::OutcomeGuarantee
                | Self::SymbolicAsLiteral
        )
    }

    /// Whether rules of this category apply to UX descriptors.
    pub fn is_ux_category(&self) -> bool {
        matches!(
            self,
            Self::DistressTiming
                | Self::ForcedAction
                | Self::CountdownPressure
                | Self::DarkPatternChoice
        )
    }

    /// Text categories in reporting order.
    pub fn text_categories() -> [Self; 5] {
        [
            Self::ClinicalLanguage,
            Self::UrgencyPressure,
            Self::EmotionalLeverage,
            Self::OutcomeGuarantee,
            Self::SymbolicAsLiteral,
        ]
    }

    /// UX categories in reporting order.
    pub fn ux_categories() -> [Self; 4] {
        [
            Self::DistressTiming,
            Self::ForcedAction,
            Self::CountdownPressure,
            Self::DarkPatternChoice,
        ]
    }
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single matched rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Violation {
    /// Category of the rule that matched
    pub category: RuleCategory,
    /// Rule identifier within the rule set
    pub rule_id: String,
    /// The pattern (or structural check) that matched
    pub matched_pattern: String,
    /// The text that matched, if the match came from text
    pub matched_text: Option<String>,
}

impl Violation {
    /// Violation with no originating rule.
    pub fn system(category: RuleCategory, detail: impl Into<String>) -> Self {
        Self {
            category,
            rule_id: category.code(),
            matched_pattern: detail.into(),
            matched_text: None,
        }
    }
}

/// Result of a veto evaluation.
///
/// A pure function of the evaluated input and the rule set that produced it;
/// the rule set is cited so the decision can be reproduced later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct VetoResult {
    /// Whether the input may pass
    pub allowed: bool,
    /// All matched rules, ordered by category then position
    pub violations: Vec<Violation>,
    /// Version of the rule set used
    pub rule_set_version: String,
    /// SHA-256 fingerprint of the rule set definition
    pub rule_set_fingerprint: String,
}

impl VetoResult {
    /// Build a result from collected violations. Allowed only when empty.
    pub fn from_violations(
        violations: Vec<Violation>,
        rule_set_version: impl Into<String>,
        rule_set_fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            allowed: violations.is_empty(),
            violations,
            rule_set_version: rule_set_version.into(),
            rule_set_fingerprint: rule_set_fingerprint.into(),
        }
    }

    /// Categories that matched, deduplicated, in reporting order.
    pub fn categories(&self) -> Vec<RuleCategory> {
        let mut categories: Vec<RuleCategory> =
            self.violations.iter().map(|v| v.category).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Check whether a category matched.
    pub fn has_category(&self, category: RuleCategory) -> bool {
        self.violations.iter().any(|v| v.category == category)
    }

    /// Whether this result came from an internal failure.
    pub fn is_evaluation_error(&self) -> bool {
        self.has_category(RuleCategory::EvaluationError)
    }
}

/// Where a piece of text is going to be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    /// Tool title or description
    #[default]
    ToolDescription,
    /// Static page copy
    Page,
    /// Notification or prompt
    Notification,
    /// Share text
    Share,
    /// Generated or user-submitted text
    Generated,
}

/// Context for an evaluation.
///
/// Carried into logs only; verdicts depend on text and rule set alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// Where the text will appear
    pub surface: Surface,
    /// Region the text is destined for
    pub region_code: Option<String>,
    /// Content item under review
    pub content_id: Option<String>,
}

impl EvaluationContext {
    /// Context for a specific content item.
    pub fn for_content(content_id: impl Into<String>) -> Self {
        Self {
            content_id: Some(content_id.into()),
            ..Default::default()
        }
    }

    /// Builder: set surface.
    pub fn with_surface(mut self, surface: Surface) -> Self {
        self.surface = surface;
        self
    }

    /// Builder: set region.
    pub fn with_region(mut self, region_code: impl Into<String>) -> Self {
        self.region_code = Some(region_code.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_partitions() {
        for category in RuleCategory::text_categories() {
            assert!(category.is_text_category());
            assert!(!category.is_ux_category());
        }
        for category in RuleCategory::ux_categories() {
            assert!(category.is_ux_category());
        }
        assert!(!RuleCategory::EvaluationError.is_text_category());
        assert!(!RuleCategory::EvaluationError.is_ux_category());
    }

    #[test]
    fn test_category_serde_codes() {
        let json = serde_json::to_string(&RuleCategory::EvaluationError).unwrap();
        assert_eq!(json, "\"EVALUATION_ERROR\"");
        assert_eq!(RuleCategory::OutcomeGuarantee.code(), "outcome_guarantee");
    }

    #[test]
    fn test_empty_violations_allowed() {
        let result = VetoResult::from_violations(vec![], "v1", "abc");
        assert!(result.allowed);

        let result = VetoResult::from_violations(
            vec![Violation::system(RuleCategory::EmptyInput, "empty")],
            "v1",
            "abc",
        );
        assert!(!result.allowed);
        assert_eq!(result.categories(), vec![RuleCategory::EmptyInput]);
    }
}
