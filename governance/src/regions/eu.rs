//! European Union (English-language edition).

use crate::compliance::ContentKind;
use crate::regions::{advisory, not_medical_advice, Disclaimer, RegionProfile, RegionProvider};

/// Provider for the EU profile.
pub struct EuropeRegion;

impl RegionProvider for EuropeRegion {
    fn code(&self) -> &'static str {
        "EU"
    }

    fn profile(&self) -> RegionProfile {
        RegionProfile {
            code: self.code().to_string(),
            name: "European Union".to_string(),
            language: "en-IE".to_string(),
            required_disclaimers: vec![
                not_medical_advice(
                    "This is a self-help resource and does not replace professional care.",
                ),
                Disclaimer {
                    id: "data_processing".to_string(),
                    text: "We process aggregate usage data only, with your consent.".to_string(),
                    applies_to: vec![ContentKind::Page, ContentKind::Notification],
                },
            ],
            commerce_notice_markers: vec![
                "advertisement".to_string(),
                "sponsored".to_string(),
                "affiliate".to_string(),
            ],
            requires_explicit_consent: true,
            tone_rules: vec![
                advisory(
                    r"\bfree trial\b",
                    "State renewal terms and the withdrawal period next to any free trial",
                ),
                advisory(
                    r"\b(best|#1|number one)\b",
                    "Comparative claims need substantiation",
                ),
            ],
        }
    }
}
