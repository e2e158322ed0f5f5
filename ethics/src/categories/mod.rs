//! Built-in rule providers, one per veto category.
//!
//! Each provider contributes the default rules for its category. The
//! built-in rule set is assembled from all providers in reporting order.

pub mod clinical;
pub mod emotional;
pub mod interaction;
pub mod outcome;
pub mod symbolic;
pub mod urgency;

pub use clinical::ClinicalRules;
pub use emotional::EmotionalLeverageRules;
pub use interaction::InteractionRules;
pub use outcome::OutcomeRules;
pub use symbolic::SymbolicRules;
pub use urgency::UrgencyRules;

use crate::rules::{RuleDefinition, RuleSet, RuleSetDefinition};

/// Version of the built-in rule set.
pub const BUILTIN_VERSION: &str = "2024.1";

/// Trait for category-specific default rules.
pub trait CategoryProvider: Send + Sync {
    /// Short name of the provider
    fn name(&self) -> &'static str;

    /// Default rule definitions for this category
    fn default_rules(&self) -> Vec<RuleDefinition>;
}

/// All built-in providers in reporting order.
pub fn providers() -> Vec<Box<dyn CategoryProvider>> {
    vec![
        Box::new(ClinicalRules),
        Box::new(UrgencyRules),
        Box::new(EmotionalLeverageRules),
        Box::new(OutcomeRules),
        Box::new(SymbolicRules),
        Box::new(InteractionRules),
    ]
}

/// Definition of the built-in rule set.
pub fn builtin_definition() -> RuleSetDefinition {
    RuleSetDefinition {
        version: BUILTIN_VERSION.to_string(),
        rules: providers()
            .iter()
            .flat_map(|provider| provider.default_rules())
            .collect(),
    }
}

/// Compile the built-in rule set.
pub fn builtin_rule_set() -> RuleSet {
    RuleSet::from_definition(builtin_definition())
        .expect("built-in rule set patterns are static and must compile")
}

/// Shorthand used by the providers.
pub(crate) fn rule(
    id: &str,
    category: crate::types::RuleCategory,
    description: &str,
    patterns: &[&str],
    requires_any: &[&str],
) -> RuleDefinition {
    RuleDefinition {
        id: id.to_string(),
        category,
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        requires_any: requires_any.iter().map(|p| p.to_string()).collect(),
        description: description.to_string(),
    }
}
