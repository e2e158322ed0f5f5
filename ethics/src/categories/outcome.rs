//! Guaranteed-outcome claims.

use crate::categories::{rule, CategoryProvider};
use crate::rules::RuleDefinition;
use crate::types::RuleCategory;

/// Provider for outcome-guarantee rules.
pub struct OutcomeRules;

impl CategoryProvider for OutcomeRules {
    fn name(&self) -> &'static str {
        "outcome"
    }

    fn default_rules(&self) -> Vec<RuleDefinition> {
        vec![
            rule(
                "outcome-guarantee",
                RuleCategory::OutcomeGuarantee,
                "Explicit guarantees",
                &[
                    r"\bguarantee[ds]?\b",
                    r"\b100 ?% (success|effective|results?)\b",
                    r"\bworks for everyone\b",
                ],
                &[],
            ),
            rule(
                "outcome-certain-result",
                RuleCategory::OutcomeGuarantee,
                "Promising a certain or permanent result",
                &[
                    r"\bwill (cure|fix|eliminate|end|solve|remove|erase)\b",
                    r"\b(never|no longer) (feel|be) (anxious|sad|stressed|alone|lonely|afraid) again\b",
                    r"\bproven to (work|change|fix)\b",
                    r"\b(permanent|instant) (results|relief|fix|cure)\b",
                ],
                &[],
            ),
        ]
    }
}
