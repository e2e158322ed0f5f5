//! Canada (English-language edition).

use crate::compliance::ContentKind;
use crate::regions::{not_medical_advice, substitute, Disclaimer, RegionProfile, RegionProvider};

/// Provider for the CA profile.
pub struct CanadaRegion;

impl RegionProvider for CanadaRegion {
    fn code(&self) -> &'static str {
        "CA"
    }

    fn profile(&self) -> RegionProfile {
        RegionProfile {
            code: self.code().to_string(),
            name: "Canada".to_string(),
            language: "en-CA".to_string(),
            required_disclaimers: vec![
                not_medical_advice("This is a self-help tool, not medical advice."),
                Disclaimer {
                    id: "crisis_line_ca".to_string(),
                    text: "If you are in crisis, call or text 988.".to_string(),
                    applies_to: vec![ContentKind::Tool],
                },
                Disclaimer {
                    id: "unsubscribe".to_string(),
                    text: "You can unsubscribe from these messages at any time.".to_string(),
                    applies_to: vec![ContentKind::Notification],
                },
            ],
            commerce_notice_markers: vec!["sponsored".to_string(), "affiliate".to_string()],
            requires_explicit_consent: true,
            tone_rules: vec![
                substitute("color", "colour"),
                substitute("behavior", "behaviour"),
            ],
        }
    }
}
