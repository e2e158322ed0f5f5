//! United States.

use crate::compliance::ContentKind;
use crate::regions::{advisory, not_medical_advice, Disclaimer, RegionProfile, RegionProvider};

/// Provider for the US profile.
pub struct UnitedStatesRegion;

impl RegionProvider for UnitedStatesRegion {
    fn code(&self) -> &'static str {
        "US"
    }

    fn profile(&self) -> RegionProfile {
        RegionProfile {
            code: self.code().to_string(),
            name: "United States".to_string(),
            language: "en-US".to_string(),
            required_disclaimers: vec![
                not_medical_advice(
                    "This is a self-help tool, not medical advice or treatment.",
                ),
                Disclaimer {
                    id: "crisis_line_us".to_string(),
                    text: "If you are in crisis, call or text 988.".to_string(),
                    applies_to: vec![ContentKind::Tool],
                },
            ],
            commerce_notice_markers: vec![
                "affiliate".to_string(),
                "sponsored".to_string(),
                "paid partnership".to_string(),
            ],
            requires_explicit_consent: false,
            tone_rules: vec![advisory(
                r"\bfree trial\b",
                "State renewal terms next to any free trial",
            )],
        }
    }
}
