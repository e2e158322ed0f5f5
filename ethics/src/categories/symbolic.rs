//! Symbolic content framed as literal truth.
//!
//! Numerology and similar systems may be offered as reflection prompts; they
//! may not be presented as facts about the reader's life.

use crate::categories::{rule, CategoryProvider};
use crate::rules::RuleDefinition;
use crate::types::RuleCategory;

/// Provider for symbolic-framing rules.
pub struct SymbolicRules;

impl CategoryProvider for SymbolicRules {
    fn name(&self) -> &'static str {
        "symbolic"
    }

    fn default_rules(&self) -> Vec<RuleDefinition> {
        vec![
            rule(
                "symbolic-literal-truth",
                RuleCategory::SymbolicAsLiteral,
                "Symbolic systems stated as fact",
                &[
                    r"\b(the )?numbers? (prove|proves|never lie|don'?t lie)\b",
                    r"\b(numerology|astrology|tarot|the stars|the universe) (proves?|guarantees?|determines?|dictates?)\b",
                    r"\bscientifically (proven|validated) (numerology|astrology)\b",
                ],
                &[],
            ),
            rule(
                "symbolic-fate",
                RuleCategory::SymbolicAsLiteral,
                "Fixed destiny claims",
                &[
                    r"\byour (destiny|fate) (is|has been) (sealed|fixed|determined|written)\b",
                    r"\byour life path number (determines|dictates|decides|means you will)\b",
                ],
                &[],
            ),
        ]
    }
}
