//! Versioned, immutable rule sets.
//!
//! A rule set is loaded once (built-in defaults or YAML), its patterns are
//! compiled, and it is shared read-only behind an `Arc`. Every verdict cites
//! the version and fingerprint of the rule set that produced it.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{RuleCategory, Violation};

/// Error types for rule-set loading.
#[derive(Debug, thiserror::Error)]
pub enum RuleSetError {
    /// A pattern failed to compile
    #[error("Invalid pattern in rule {rule_id}: {source}")]
    InvalidPattern {
        rule_id: String,
        #[source]
        source: regex::Error,
    },

    /// Rule definition is unusable
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// Rule set has no rules
    #[error("Rule set {0} contains no rules")]
    Empty(String),

    /// Could not parse the definition
    #[error("Failed to parse rule set: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Could not read the definition
    #[error("Failed to read rule set: {0}")]
    Io(#[from] std::io::Error),
}

/// Serializable definition of a single rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Unique identifier
    pub id: String,
    /// Category the rule reports under
    pub category: RuleCategory,
    /// Patterns, any of which triggers the rule
    pub patterns: Vec<String>,
    /// If non-empty, one of these must also match in the same sentence
    #[serde(default)]
    pub requires_any: Vec<String>,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

/// Serializable definition of a rule set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSetDefinition {
    /// Rule set version
    pub version: String,
    /// Rules in evaluation order
    pub rules: Vec<RuleDefinition>,
}

/// A rule with compiled patterns.
#[derive(Debug)]
pub struct CompiledRule {
    id: String,
    category: RuleCategory,
    patterns: Vec<Regex>,
    requires_any: Vec<Regex>,
}

impl CompiledRule {
    fn compile(definition: &RuleDefinition) -> Result<Self, RuleSetError> {
        if definition.id.trim().is_empty() {
            return Err(RuleSetError::InvalidRule("rule without id".to_string()));
        }
        if definition.patterns.is_empty() {
            return Err(RuleSetError::InvalidRule(format!(
                "rule {} has no patterns",
                definition.id
            )));
        }
        if matches!(
            definition.category,
            RuleCategory::EmptyInput | RuleCategory::InvalidInput | RuleCategory::EvaluationError
        ) {
            return Err(RuleSetError::InvalidRule(format!(
                "rule {} uses reserved category {}",
                definition.id, definition.category
            )));
        }

        let compile_all = |sources: &[String]| -> Result<Vec<Regex>, RuleSetError> {
            sources
                .iter()
                .map(|source| {
                    RegexBuilder::new(source)
                        .case_insensitive(true)
                        .build()
                        .map_err(|source| RuleSetError::InvalidPattern {
                            rule_id: definition.id.clone(),
                            source,
                        })
                })
                .collect()
        };

        Ok(Self {
            id: definition.id.clone(),
            category: definition.category,
            patterns: compile_all(&definition.patterns)?,
            requires_any: compile_all(&definition.requires_any)?,
        })
    }

    /// Rule identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Rule category.
    pub fn category(&self) -> RuleCategory {
        self.category
    }

    /// Find every match of this rule in `text`.
    ///
    /// Returns `(position, violation)` pairs. Rules with a co-occurrence
    /// requirement are checked sentence by sentence.
    pub fn find_all(&self, text: &str) -> Vec<(usize, Violation)> {
        let mut found = Vec::new();

        if self.requires_any.is_empty() {
            self.collect_matches(text, 0, None, &mut found);
            return found;
        }

        for (offset, sentence) in sentences(text) {
            let companion = self
                .requires_any
                .iter()
                .find_map(|re| re.find(sentence).map(|m| m.as_str().to_string()));
            if let Some(companion) = companion {
                self.collect_matches(sentence, offset, Some(&companion), &mut found);
            }
        }

        found
    }

    fn collect_matches(
        &self,
        text: &str,
        offset: usize,
        companion: Option<&str>,
        found: &mut Vec<(usize, Violation)>,
    ) {
        for pattern in &self.patterns {
            for m in pattern.find_iter(text) {
                let matched_text = match companion {
                    Some(companion) => format!("{} ... {}", m.as_str(), companion),
                    None => m.as_str().to_string(),
                };
                found.push((
                    offset + m.start(),
                    Violation {
                        category: self.category,
                        rule_id: self.id.clone(),
                        matched_pattern: pattern.as_str().to_string(),
                        matched_text: Some(matched_text),
                    },
                ));
            }
        }
    }
}

/// Split text into sentences with their byte offsets.
fn sentences(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        if matches!(ch, '.' | '!' | '?' | '\n' | ';') {
            let end = idx + ch.len_utf8();
            if !text[start..end].trim().is_empty() {
                out.push((start, &text[start..end]));
            }
            start = end;
        }
    }
    if start < text.len() && !text[start..].trim().is_empty() {
        out.push((start, &text[start..]));
    }
    out
}

/// An immutable, compiled rule set.
#[derive(Debug)]
pub struct RuleSet {
    version: String,
    fingerprint: String,
    rules: Vec<CompiledRule>,
    definition: RuleSetDefinition,
}

impl RuleSet {
    /// Compile a rule set from its definition.
    pub fn from_definition(definition: RuleSetDefinition) -> Result<Self, RuleSetError> {
        if definition.rules.is_empty() {
            return Err(RuleSetError::Empty(definition.version));
        }

        let mut seen = std::collections::HashSet::new();
        let mut rules = Vec::with_capacity(definition.rules.len());
        for rule in &definition.rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(RuleSetError::InvalidRule(format!(
                    "duplicate rule id {}",
                    rule.id
                )));
            }
            rules.push(CompiledRule::compile(rule)?);
        }

        let fingerprint = fingerprint_definition(&definition);

        tracing::info!(
            version = %definition.version,
            fingerprint = %fingerprint,
            rules = rules.len(),
            "Rule set loaded"
        );

        Ok(Self {
            version: definition.version.clone(),
            fingerprint,
            rules,
            definition,
        })
    }

    /// Load a rule set from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, RuleSetError> {
        let definition: RuleSetDefinition = serde_yaml::from_str(yaml)?;
        Self::from_definition(definition)
    }

    /// Load a rule set from a YAML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, RuleSetError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// The built-in rule set.
    pub fn builtin() -> Self {
        crate::categories::builtin_rule_set()
    }

    /// Rule set version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// SHA-256 fingerprint of the definition.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// All compiled rules.
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Rules in one category.
    pub fn rules_for(&self, category: RuleCategory) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter().filter(move |r| r.category == category)
    }

    /// The definition this set was compiled from.
    pub fn definition(&self) -> &RuleSetDefinition {
        &self.definition
    }

    /// Serialize the definition to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.definition)
    }
}

/// Compute SHA-256 hash of content.
pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Compute the fingerprint of a rule-set definition.
pub fn fingerprint_definition(definition: &RuleSetDefinition) -> String {
    let json = serde_json::to_string(definition).unwrap_or_default();
    compute_hash(json.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version: "test-1"
rules:
  - id: outcome-guarantee
    category: OUTCOME_GUARANTEE
    patterns: ['\bguaranteed?\b']
  - id: clinical-cure
    category: CLINICAL_LANGUAGE
    patterns: ['\bcure\b']
    requires_any: ['\banxiety\b']
"#;

    #[test]
    fn test_load_from_yaml() {
        let set = RuleSet::from_yaml(SAMPLE).unwrap();
        assert_eq!(set.version(), "test-1");
        assert_eq!(set.rules().len(), 2);
        assert_eq!(set.fingerprint().len(), 64);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = RuleSet::from_yaml(SAMPLE).unwrap();
        let b = RuleSet::from_yaml(SAMPLE).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let changed = SAMPLE.replace("test-1", "test-2");
        let c = RuleSet::from_yaml(&changed).unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let yaml = r#"
version: "bad"
rules:
  - id: broken
    category: URGENCY_PRESSURE
    patterns: ['(unclosed']
"#;
        let err = RuleSet::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, RuleSetError::InvalidPattern { .. }));
    }

    #[test]
    fn test_empty_and_reserved_rejected() {
        let empty = "version: \"e\"\nrules: []\n";
        assert!(matches!(
            RuleSet::from_yaml(empty).unwrap_err(),
            RuleSetError::Empty(_)
        ));

        let reserved = r#"
version: "r"
rules:
  - id: sneaky
    category: EVALUATION_ERROR
    patterns: ['x']
"#;
        assert!(matches!(
            RuleSet::from_yaml(reserved).unwrap_err(),
            RuleSetError::InvalidRule(_)
        ));
    }

    #[test]
    fn test_co_occurrence_is_per_sentence() {
        let set = RuleSet::from_yaml(SAMPLE).unwrap();
        let rule = set.rules_for(RuleCategory::ClinicalLanguage).next().unwrap();

        assert_eq!(rule.find_all("This may cure your anxiety.").len(), 1);
        assert!(rule
            .find_all("There is no cure for boredom. Anxiety is common.")
            .is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        let set = RuleSet::from_yaml(SAMPLE).unwrap();
        let rule = set.rules_for(RuleCategory::OutcomeGuarantee).next().unwrap();
        assert_eq!(rule.find_all("GUARANTEED results").len(), 1);
    }
}
