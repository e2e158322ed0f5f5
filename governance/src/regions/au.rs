//! Australia.

use crate::compliance::ContentKind;
use crate::regions::{
    advisory, not_medical_advice, substitute, Disclaimer, RegionProfile, RegionProvider,
};

/// Provider for the AU profile.
pub struct AustraliaRegion;

impl RegionProvider for AustraliaRegion {
    fn code(&self) -> &'static str {
        "AU"
    }

    fn profile(&self) -> RegionProfile {
        RegionProfile {
            code: self.code().to_string(),
            name: "Australia".to_string(),
            language: "en-AU".to_string(),
            required_disclaimers: vec![
                not_medical_advice("This is general information, not medical advice."),
                Disclaimer {
                    id: "crisis_line_au".to_string(),
                    text: "If you need support now, Lifeline is on 13 11 14.".to_string(),
                    applies_to: vec![ContentKind::Tool],
                },
            ],
            commerce_notice_markers: vec![
                "advertisement".to_string(),
                "sponsored".to_string(),
                "affiliate".to_string(),
            ],
            requires_explicit_consent: false,
            tone_rules: vec![
                substitute("color", "colour"),
                substitute("vacation", "holiday"),
                advisory(
                    r"\bwas \$\d+",
                    "Was/now price comparisons must reflect a genuine prior price",
                ),
            ],
        }
    }
}
