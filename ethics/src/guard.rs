//! The ethics guard: a stateless, fail-closed veto over text and UX patterns.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::rules::RuleSet;
use crate::types::{EvaluationContext, RuleCategory, VetoResult, Violation};
use crate::ux::{structural_violations, UxPatternDescriptor};

/// Veto function over text and UX descriptors.
///
/// Holds only an immutable rule set, so it can be cloned and shared across
/// threads freely. Every category is checked against the whole input; a
/// result lists all matched categories, not just the first. Any panic
/// during evaluation becomes a denial with [`RuleCategory::EvaluationError`].
#[derive(Debug, Clone)]
pub struct EthicsGuard {
    rules: Arc<RuleSet>,
}

impl EthicsGuard {
    /// Create a guard over the built-in rule set.
    pub fn new() -> Self {
        Self::with_rules(Arc::new(RuleSet::builtin()))
    }

    /// Create a guard over a specific rule set.
    pub fn with_rules(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    /// The rule set in use.
    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    /// Evaluate free text.
    pub fn evaluate(&self, text: &str, context: &EvaluationContext) -> VetoResult {
        let result = self.guarded(|rules| {
            if text.trim().is_empty() {
                return vec![Violation::system(RuleCategory::EmptyInput, "empty input")];
            }
            evaluate_categories(rules, text, &RuleCategory::text_categories())
        });
        self.log_result("text", &result, context);
        result
    }

    /// Evaluate untyped input. Anything but a string is a violation.
    pub fn evaluate_value(&self, value: &serde_json::Value, context: &EvaluationContext) -> VetoResult {
        match value {
            serde_json::Value::String(text) => self.evaluate(text, context),
            other => {
                let result = self.deny(Violation::system(
                    RuleCategory::InvalidInput,
                    format!("expected string, got {}", json_type(other)),
                ));
                self.log_result("text", &result, context);
                result
            }
        }
    }

    /// Evaluate a UX-pattern descriptor.
    ///
    /// Combines structural checks on the descriptor's fields with the UX
    /// rules applied to its description and choice labels.
    pub fn evaluate_ux_pattern(&self, descriptor: &UxPatternDescriptor) -> VetoResult {
        let result = self.guarded(|rules| {
            let mut violations = structural_violations(descriptor);

            let mut prose = descriptor.description.clone();
            for choice in &descriptor.choices {
                prose.push('\n');
                prose.push_str(&choice.label);
            }
            if !prose.trim().is_empty() {
                violations.extend(evaluate_categories(
                    rules,
                    &prose,
                    &RuleCategory::ux_categories(),
                ));
            }

            violations.sort_by_key(|v| v.category);
            violations
        });

        let context = EvaluationContext::for_content(descriptor.id.clone());
        self.log_result("ux_pattern", &result, &context);
        result
    }

    /// Evaluate an untyped UX descriptor; malformed descriptors are denied.
    pub fn evaluate_ux_value(&self, value: &serde_json::Value) -> VetoResult {
        match serde_json::from_value::<UxPatternDescriptor>(value.clone()) {
            Ok(descriptor) => self.evaluate_ux_pattern(&descriptor),
            Err(e) => {
                warn!(error = %e, "Malformed UX descriptor");
                self.deny(Violation::system(
                    RuleCategory::InvalidInput,
                    format!("malformed descriptor: {}", e),
                ))
            }
        }
    }

    /// Run an evaluation, converting any panic into a denial.
    fn guarded<F>(&self, evaluate: F) -> VetoResult
    where
        F: FnOnce(&RuleSet) -> Vec<Violation>,
    {
        let rules = self.rules.as_ref();
        match panic::catch_unwind(AssertUnwindSafe(|| evaluate(rules))) {
            Ok(violations) => VetoResult::from_violations(
                violations,
                rules.version(),
                rules.fingerprint(),
            ),
            Err(_) => {
                error!(
                    rule_set = %rules.version(),
                    "Evaluation panicked; denying"
                );
                self.deny(Violation::system(
                    RuleCategory::EvaluationError,
                    "EVALUATION_ERROR",
                ))
            }
        }
    }

    fn deny(&self, violation: Violation) -> VetoResult {
        VetoResult::from_violations(
            vec![violation],
            self.rules.version(),
            self.rules.fingerprint(),
        )
    }

    fn log_result(&self, kind: &str, result: &VetoResult, context: &EvaluationContext) {
        if result.allowed {
            debug!(
                kind = kind,
                content_id = ?context.content_id,
                surface = ?context.surface,
                "Veto check passed"
            );
        } else {
            warn!(
                kind = kind,
                content_id = ?context.content_id,
                region = ?context.region_code,
                categories = ?result.categories(),
                rule_set = %result.rule_set_version,
                "Veto issued"
            );
        }
    }
}

impl Default for EthicsGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply every rule in the given categories, with no early exit.
fn evaluate_categories(rules: &RuleSet, text: &str, categories: &[RuleCategory]) -> Vec<Violation> {
    let mut found: Vec<(RuleCategory, usize, Violation)> = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for category in categories {
        for rule in rules.rules_for(*category) {
            for (position, violation) in rule.find_all(text) {
                let key = (
                    violation.rule_id.clone(),
                    violation
                        .matched_text
                        .as_deref()
                        .unwrap_or_default()
                        .to_lowercase(),
                );
                if seen.insert(key) {
                    found.push((*category, position, violation));
                }
            }
        }
    }

    found.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    found.into_iter().map(|(_, _, v)| v).collect()
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ux::{ChoiceKind, UxTrigger};

    fn ctx() -> EvaluationContext {
        EvaluationContext::default()
    }

    #[test]
    fn test_cure_anxiety_guaranteed() {
        let guard = EthicsGuard::new();
        let result = guard.evaluate("This tool will cure your anxiety, guaranteed.", &ctx());

        assert!(!result.allowed);
        assert!(result.has_category(RuleCategory::OutcomeGuarantee));
        assert!(result.has_category(RuleCategory::ClinicalLanguage));
        // Clinical is reported before outcome
        assert_eq!(result.violations[0].category, RuleCategory::ClinicalLanguage);
    }

    #[test]
    fn test_benign_text_allowed() {
        let guard = EthicsGuard::new();
        let result = guard.evaluate(
            "A five-minute breathing exercise you can try whenever you like.",
            &ctx(),
        );
        assert!(result.allowed, "unexpected: {:?}", result.violations);
        assert_eq!(result.rule_set_version, crate::categories::BUILTIN_VERSION);
    }

    #[test]
    fn test_all_categories_reported() {
        let guard = EthicsGuard::new();
        let text = "Act now! You'll regret it. Results guaranteed. \
                    Your destiny is sealed. This treats depression.";
        let result = guard.evaluate(text, &ctx());

        assert_eq!(result.categories(), RuleCategory::text_categories().to_vec());
    }

    #[test]
    fn test_empty_and_non_string_denied() {
        let guard = EthicsGuard::new();

        let result = guard.evaluate("   ", &ctx());
        assert!(!result.allowed);
        assert!(result.has_category(RuleCategory::EmptyInput));

        let result = guard.evaluate_value(&serde_json::json!(42), &ctx());
        assert!(!result.allowed);
        assert!(result.has_category(RuleCategory::InvalidInput));

        let result = guard.evaluate_value(&serde_json::json!("Take a short walk."), &ctx());
        assert!(result.allowed);
    }

    #[test]
    fn test_panic_is_fail_closed() {
        let guard = EthicsGuard::new();
        let result = guard.guarded(|_| panic!("boom"));

        assert!(!result.allowed);
        assert!(result.is_evaluation_error());
        assert_eq!(result.violations.len(), 1);
    }

    #[test]
    fn test_deterministic() {
        let guard = EthicsGuard::new();
        let text = "Hurry, last chance! Guaranteed results.";
        assert_eq!(guard.evaluate(text, &ctx()), guard.evaluate(text, &ctx()));
    }

    #[test]
    fn test_ux_distress_and_countdown() {
        let guard = EthicsGuard::new();
        let mut descriptor = UxPatternDescriptor::new("promo")
            .with_trigger(UxTrigger::OnDistressSignal)
            .with_description("Show an offer when the user seems sad, with a countdown.");
        descriptor.countdown_secs = Some(30);

        let result = guard.evaluate_ux_pattern(&descriptor);
        assert!(!result.allowed);
        assert!(result.has_category(RuleCategory::DistressTiming));
        assert!(result.has_category(RuleCategory::CountdownPressure));
    }

    #[test]
    fn test_ux_confirmshaming_and_forced() {
        let guard = EthicsGuard::new();
        let mut descriptor = UxPatternDescriptor::new("newsletter")
            .with_choice("Yes, help me", ChoiceKind::Accept)
            .with_choice("No thanks, I prefer staying stuck", ChoiceKind::Decline);
        descriptor.blocking = true;
        descriptor.dismissible = false;

        let result = guard.evaluate_ux_pattern(&descriptor);
        assert!(result.has_category(RuleCategory::DarkPatternChoice));
        assert!(result.has_category(RuleCategory::ForcedAction));
    }

    #[test]
    fn test_ux_benign_allowed() {
        let guard = EthicsGuard::new();
        let descriptor = UxPatternDescriptor::new("tip")
            .with_description("A small card offering a related exercise after the user finishes a tool.")
            .with_choice("Try it", ChoiceKind::Accept)
            .with_choice("Not now", ChoiceKind::Decline);

        let result = guard.evaluate_ux_pattern(&descriptor);
        assert!(result.allowed, "unexpected: {:?}", result.violations);
    }

    #[test]
    fn test_ux_malformed_denied() {
        let guard = EthicsGuard::new();
        let result = guard.evaluate_ux_value(&serde_json::json!({ "trigger": 7 }));
        assert!(!result.allowed);
        assert!(result.has_category(RuleCategory::InvalidInput));
    }
}
