//! Clinical and diagnostic language.
//!
//! Self-help tools may talk about feelings; they may not diagnose, treat or
//! promise to cure a condition.

use crate::categories::{rule, CategoryProvider};
use crate::rules::RuleDefinition;
use crate::types::RuleCategory;

/// Clinical terms a treatment verb must co-occur with.
const CONDITIONS: &str = r"\b(anxiety|depression|depressive|ptsd|adhd|ocd|bipolar|insomnia|panic attacks?|trauma|disorders?|mental illness|schizophrenia|addiction)\b";

/// Provider for clinical-language rules.
pub struct ClinicalRules;

impl CategoryProvider for ClinicalRules {
    fn name(&self) -> &'static str {
        "clinical"
    }

    fn default_rules(&self) -> Vec<RuleDefinition> {
        vec![
            rule(
                "clinical-treatment-claim",
                RuleCategory::ClinicalLanguage,
                "Treatment verb applied to a clinical condition",
                &[r"\b(cure[sd]?|curing|treat(s|ed|ing)?|heal(s|ed|ing)?|diagnos(e|es|ed|ing)|eliminat(e|es|ed|ing)|reverse[sd]?)\b"],
                &[CONDITIONS],
            ),
            rule(
                "clinical-diagnostic-framing",
                RuleCategory::ClinicalLanguage,
                "Telling the reader they have a condition",
                &[
                    r"\byou (may |might |probably |likely |clearly )?(have|suffer from) (an? )?(anxiety|depression|ptsd|adhd|ocd|bipolar|(\w+ )?disorder)\b",
                    r"\b(symptoms?|signs) of (clinical )?(depression|anxiety disorder|ptsd|adhd|bipolar)\b",
                ],
                &[],
            ),
            rule(
                "clinical-medical-substitute",
                RuleCategory::ClinicalLanguage,
                "Positioning a tool as medical care",
                &[
                    r"\bclinical(ly)? (proven|treatment|intervention|grade)\b",
                    r"\b(replaces?|instead of|no need for) (your )?(therapy|therapist|medication|doctor|psychiatrist)\b",
                    r"\b(prescri(be|bed|ption)|dosage)\b",
                ],
                &[],
            ),
        ]
    }
}
