//! United Kingdom.

use crate::compliance::ContentKind;
use crate::regions::{
    advisory, not_medical_advice, substitute, Disclaimer, RegionProfile, RegionProvider,
};

/// Provider for the UK profile.
pub struct UnitedKingdomRegion;

impl RegionProvider for UnitedKingdomRegion {
    fn code(&self) -> &'static str {
        "UK"
    }

    fn profile(&self) -> RegionProfile {
        RegionProfile {
            code: self.code().to_string(),
            name: "United Kingdom".to_string(),
            language: "en-GB".to_string(),
            required_disclaimers: vec![
                not_medical_advice("This is a self-help tool, not medical advice."),
                Disclaimer {
                    id: "crisis_line_uk".to_string(),
                    text: "If you need to talk, Samaritans are available on 116 123.".to_string(),
                    applies_to: vec![ContentKind::Tool],
                },
            ],
            commerce_notice_markers: vec![
                "advertisement".to_string(),
                "affiliate".to_string(),
                "sponsored".to_string(),
            ],
            requires_explicit_consent: true,
            tone_rules: vec![
                substitute("color", "colour"),
                substitute("behavior", "behaviour"),
                substitute("program", "programme"),
                substitute("vacation", "holiday"),
                advisory(r"\bfree trial\b", "State renewal terms next to any free trial"),
            ],
        }
    }
}
