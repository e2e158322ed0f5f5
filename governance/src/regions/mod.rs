//! Region profiles: required disclaimers, commerce and consent rules, and
//! the tone overlay applied to canonical content.
//!
//! A profile may change surface language only. Tone substitutions are the
//! only rewriting it can do, and the compliance engine checks that a
//! rendered text keeps the veto categories of its canonical source.

pub mod au;
pub mod ca;
pub mod eu;
pub mod uk;
pub mod us;

pub use au::AustraliaRegion;
pub use ca::CanadaRegion;
pub use eu::EuropeRegion;
pub use uk::UnitedKingdomRegion;
pub use us::UnitedStatesRegion;

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::compliance::ContentKind;

/// Error types for region profiles.
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    /// A tone rule pattern does not compile
    #[error("Invalid tone pattern in region {region}: {source}")]
    InvalidPattern {
        region: String,
        #[source]
        source: regex::Error,
    },

    /// A profile is inconsistent
    #[error("Invalid region profile: {0}")]
    Invalid(String),

    /// Two profiles share a code
    #[error("Duplicate region code: {0}")]
    Duplicate(String),

    /// Could not parse YAML
    #[error("Failed to parse region catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Could not read the file
    #[error("Failed to read region catalog: {0}")]
    Io(#[from] std::io::Error),
}

/// A disclaimer a region requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Disclaimer {
    /// Identifier content must list to satisfy it
    pub id: String,
    /// Text shown to the user
    pub text: String,
    /// Content kinds it applies to; empty means all
    #[serde(default)]
    pub applies_to: Vec<ContentKind>,
}

impl Disclaimer {
    pub fn applies(&self, kind: ContentKind) -> bool {
        self.applies_to.is_empty() || self.applies_to.contains(&kind)
    }
}

/// A surface-language rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToneRule {
    /// Replace a whole word or phrase
    Substitute { from: String, to: String },
    /// Flag a pattern with a warning and a required change
    Advisory { pattern: String, message: String },
}

/// Declarative profile for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RegionProfile {
    /// Region code (e.g. "US")
    pub code: String,
    /// Display name
    pub name: String,
    /// Language tag
    pub language: String,
    /// Disclaimers that must accompany content
    #[serde(default)]
    pub required_disclaimers: Vec<Disclaimer>,
    /// Accepted wording for commerce notices; empty accepts any notice
    #[serde(default)]
    pub commerce_notice_markers: Vec<String>,
    /// Whether analytics collection needs explicit opt-in
    #[serde(default)]
    pub requires_explicit_consent: bool,
    /// Surface wording rules
    #[serde(default)]
    pub tone_rules: Vec<ToneRule>,
}

/// Trait for built-in region profiles.
pub trait RegionProvider: Send + Sync {
    /// Region code
    fn code(&self) -> &'static str;

    /// The profile
    fn profile(&self) -> RegionProfile;
}

/// All built-in providers.
pub fn providers() -> Vec<Box<dyn RegionProvider>> {
    vec![
        Box::new(UnitedStatesRegion),
        Box::new(EuropeRegion),
        Box::new(UnitedKingdomRegion),
        Box::new(CanadaRegion),
        Box::new(AustraliaRegion),
    ]
}

/// A profile with its tone rules compiled.
#[derive(Debug, Clone)]
pub struct Region {
    profile: RegionProfile,
    substitutions: Vec<(Regex, String)>,
    advisories: Vec<(Regex, String)>,
}

impl Region {
    pub fn compile(profile: RegionProfile) -> Result<Self, RegionError> {
        if profile.code.trim().is_empty() {
            return Err(RegionError::Invalid("region code is empty".to_string()));
        }

        let compile = |pattern: &str| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| RegionError::InvalidPattern {
                    region: profile.code.clone(),
                    source,
                })
        };

        let mut substitutions = Vec::new();
        let mut advisories = Vec::new();
        for rule in &profile.tone_rules {
            match rule {
                ToneRule::Substitute { from, to } => {
                    let pattern = format!(r"\b{}\b", regex::escape(from));
                    substitutions.push((compile(&pattern)?, to.clone()));
                }
                ToneRule::Advisory { pattern, message } => {
                    advisories.push((compile(pattern)?, message.clone()));
                }
            }
        }

        Ok(Self {
            profile,
            substitutions,
            advisories,
        })
    }

    pub fn profile(&self) -> &RegionProfile {
        &self.profile
    }

    pub fn code(&self) -> &str {
        &self.profile.code
    }

    /// Apply the tone substitutions to canonical text.
    pub fn render(&self, text: &str) -> String {
        self.substitutions
            .iter()
            .fold(text.to_string(), |acc, (pattern, to)| {
                pattern.replace_all(&acc, regex::NoExpand(to.as_str())).into_owned()
            })
    }

    /// Advisory messages whose pattern matches `text`.
    pub fn advisories(&self, text: &str) -> Vec<&str> {
        self.advisories
            .iter()
            .filter(|(pattern, _)| pattern.is_match(text))
            .map(|(_, message)| message.as_str())
            .collect()
    }
}

/// Canonical form of a region code: trimmed and upper-case.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Region profiles keyed by upper-case code.
#[derive(Debug, Clone)]
pub struct RegionCatalog {
    regions: BTreeMap<String, Arc<Region>>,
}

impl RegionCatalog {
    /// Build from profiles; codes are case-insensitive and must be unique.
    pub fn from_profiles(profiles: Vec<RegionProfile>) -> Result<Self, RegionError> {
        let mut regions = BTreeMap::new();
        for profile in profiles {
            let code = normalize_code(&profile.code);
            let region = Region::compile(profile)?;
            if regions.insert(code.clone(), Arc::new(region)).is_some() {
                return Err(RegionError::Duplicate(code));
            }
        }
        Ok(Self { regions })
    }

    /// The built-in regions.
    pub fn builtin() -> Self {
        Self::from_profiles(providers().iter().map(|p| p.profile()).collect())
            .expect("built-in region profiles are static and must compile")
    }

    /// Load a list of profiles from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, RegionError> {
        let profiles: Vec<RegionProfile> = serde_yaml::from_str(yaml)?;
        Self::from_profiles(profiles)
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, RegionError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    pub fn get(&self, code: &str) -> Option<&Arc<Region>> {
        self.regions.get(&normalize_code(code))
    }

    pub fn codes(&self) -> Vec<&str> {
        self.regions.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl Default for RegionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Disclaimer shared by every built-in region.
pub(crate) fn not_medical_advice(text: &str) -> Disclaimer {
    Disclaimer {
        id: "not_medical_advice".to_string(),
        text: text.to_string(),
        applies_to: Vec::new(),
    }
}

/// Shorthand used by the providers.
pub(crate) fn substitute(from: &str, to: &str) -> ToneRule {
    ToneRule::Substitute {
        from: from.to_string(),
        to: to.to_string(),
    }
}

pub(crate) fn advisory(pattern: &str, message: &str) -> ToneRule {
    ToneRule::Advisory {
        pattern: pattern.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_regions() {
        let catalog = RegionCatalog::builtin();
        assert_eq!(catalog.codes(), vec!["AU", "CA", "EU", "UK", "US"]);
        assert!(catalog.get("us").is_some());
        assert!(catalog.get("XX").is_none());
        for code in catalog.codes() {
            let region = catalog.get(code).unwrap();
            assert!(region
                .profile()
                .required_disclaimers
                .iter()
                .any(|d| d.id == "not_medical_advice"));
        }
    }

    #[test]
    fn test_render_substitutes_whole_words() {
        let catalog = RegionCatalog::builtin();
        let uk = catalog.get("UK").unwrap();
        assert_eq!(
            uk.render("Pick a color for your program."),
            "Pick a colour for your programme."
        );
        // Not inside other words
        assert_eq!(uk.render("colorful"), "colorful");
    }

    #[test]
    fn test_yaml_catalog() {
        let yaml = r#"
- code: NZ
  name: New Zealand
  language: en-NZ
  required_disclaimers:
    - id: not_medical_advice
      text: Not medical advice.
  tone_rules:
    - kind: substitute
      from: vacation
      to: holiday
    - kind: advisory
      pattern: '\bfree\b'
      message: State any conditions attached to free offers.
"#;
        let catalog = RegionCatalog::from_yaml(yaml).unwrap();
        let nz = catalog.get("nz").unwrap();
        assert_eq!(nz.render("Plan a vacation"), "Plan a holiday");
        assert_eq!(nz.advisories("A free guide").len(), 1);
    }

    #[test]
    fn test_invalid_and_duplicate_profiles() {
        let bad = RegionProfile {
            code: "ZZ".to_string(),
            name: "Broken".to_string(),
            language: "en".to_string(),
            required_disclaimers: vec![],
            commerce_notice_markers: vec![],
            requires_explicit_consent: false,
            tone_rules: vec![advisory("(unclosed", "x")],
        };
        assert!(matches!(
            RegionCatalog::from_profiles(vec![bad]),
            Err(RegionError::InvalidPattern { .. })
        ));

        let us = UnitedStatesRegion.profile();
        assert!(matches!(
            RegionCatalog::from_profiles(vec![us.clone(), us]),
            Err(RegionError::Duplicate(_))
        ));
    }
}
