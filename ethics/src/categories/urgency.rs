//! Urgency and pressure framing.

use crate::categories::{rule, CategoryProvider};
use crate::rules::RuleDefinition;
use crate::types::RuleCategory;

/// Provider for urgency rules.
pub struct UrgencyRules;

impl CategoryProvider for UrgencyRules {
    fn name(&self) -> &'static str {
        "urgency"
    }

    fn default_rules(&self) -> Vec<RuleDefinition> {
        vec![
            rule(
                "urgency-act-now",
                RuleCategory::UrgencyPressure,
                "Demands for immediate action",
                &[
                    r"\bact (now|fast|immediately|today)\b",
                    r"\bhurry\b",
                    r"\bdon'?t (wait|delay|miss out)\b",
                    r"\bbefore it'?s too late\b",
                ],
                &[],
            ),
            rule(
                "urgency-scarcity",
                RuleCategory::UrgencyPressure,
                "Artificial scarcity or deadlines",
                &[
                    r"\b(last|final) chance\b",
                    r"\blimited[- ]time\b",
                    r"\bonly \d+ (left|remaining|spots?|seats?)\b",
                    r"\boffer (ends|expires)\b",
                ],
                &[],
            ),
        ]
    }
}
