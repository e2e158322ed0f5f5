//! Patterns over free-text UX descriptions.
//!
//! Structural checks on descriptors live in [`crate::ux`]; these rules catch
//! the same behaviours when they are only described in prose.

use crate::categories::{rule, CategoryProvider};
use crate::rules::RuleDefinition;
use crate::types::RuleCategory;

/// Provider for UX-description rules.
pub struct InteractionRules;

impl CategoryProvider for InteractionRules {
    fn name(&self) -> &'static str {
        "interaction"
    }

    fn default_rules(&self) -> Vec<RuleDefinition> {
        vec![
            rule(
                "ux-distress-timing",
                RuleCategory::DistressTiming,
                "Prompts timed to distress",
                &[
                    r"\bwhen (the )?users? (is|are|feels?|seems?|appears?) (sad|upset|distressed|vulnerable|low|lonely|anxious|overwhelmed)\b",
                    r"\b(on|after|during) (a )?(crisis|breakdown|panic|distress|low mood)\b",
                    r"\b(at|in) (their|the user'?s) (lowest|weakest|most vulnerable)\b",
                    r"\b(distress|mood)[- ](triggered|based|trigger)\b",
                ],
                &[],
            ),
            rule(
                "ux-forced-action",
                RuleCategory::ForcedAction,
                "Actions the user cannot decline",
                &[
                    r"\bcannot be (closed|dismissed|skipped)\b",
                    r"\b(can'?t|cannot|unable to) (close|dismiss|skip|exit|leave)\b",
                    r"\bmust (sign up|register|share|subscribe|pay)\b",
                    r"\bforced (sign[- ]?up|share|action|interstitial)\b",
                    r"\bblocks? (the )?(page|content|screen) until\b",
                ],
                &[],
            ),
            rule(
                "ux-countdown",
                RuleCategory::CountdownPressure,
                "Countdown and expiry pressure",
                &[
                    r"\bcountdown\b",
                    r"\b(timer|clock) (is )?(ticking|running)\b",
                    r"\bexpires? in\b",
                    r"\bonly \d+ (seconds?|minutes?|hours?) left\b",
                ],
                &[],
            ),
            rule(
                "ux-dark-choice",
                RuleCategory::DarkPatternChoice,
                "Confirmshaming and rigged choices",
                &[
                    r"\bno thanks,? i\b",
                    r"\bi (don'?t|do not) (want|care|need) (to )?(feel better|get better|help|improve|be happy)\b",
                    r"\bi (prefer|like|want) (to stay|staying|being) (stuck|miserable|sad|unhappy|alone)\b",
                    r"\b(pre-?selected|pre-?checked|opted[- ]in by default)\b",
                    r"\bhidden (decline|opt[- ]out|cancel)\b",
                    r"\bconfirm ?sham(e|ing)\b",
                ],
                &[],
            ),
        ]
    }
}
