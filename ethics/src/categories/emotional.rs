//! Emotional-leverage framing: fear, shame and guilt used to drive action.

use crate::categories::{rule, CategoryProvider};
use crate::rules::RuleDefinition;
use crate::types::RuleCategory;

/// Provider for emotional-leverage rules.
pub struct EmotionalLeverageRules;

impl CategoryProvider for EmotionalLeverageRules {
    fn name(&self) -> &'static str {
        "emotional"
    }

    fn default_rules(&self) -> Vec<RuleDefinition> {
        vec![
            rule(
                "emotional-guilt",
                RuleCategory::EmotionalLeverage,
                "Guilt or obligation toward others",
                &[
                    r"\b(don'?t|do not) let (your )?(family|loved ones|kids|children|friends|partner) down\b",
                    r"\bif you (really |truly )?(cared|loved)\b",
                    r"\byou owe it to\b",
                ],
                &[],
            ),
            rule(
                "emotional-shame",
                RuleCategory::EmotionalLeverage,
                "Shaming or belittling the reader",
                &[
                    r"\bwhat'?s wrong with you\b",
                    r"\byou('re| are) (failing|worthless|broken|a failure|pathetic)\b",
                    r"\bshame on you\b",
                    r"\b(everyone|everybody) else (is|has|already)\b",
                ],
                &[],
            ),
            rule(
                "emotional-fear",
                RuleCategory::EmotionalLeverage,
                "Threats of regret or lasting harm",
                &[
                    r"\byou('ll| will) (regret|be sorry)\b",
                    r"\b(stay|be) (stuck|miserable|alone|unhappy) forever\b",
                    r"\bthings will only get worse\b",
                ],
                &[],
            ),
        ]
    }
}
