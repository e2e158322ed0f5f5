//! UX-pattern descriptors and their structural checks.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::types::{RuleCategory, Violation};

/// What causes a UX element to appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum UxTrigger {
    /// Shown as a direct response to a user action
    #[default]
    OnUserAction,
    /// Shown when the page loads
    OnLoad,
    /// Shown after a fixed delay
    AfterDelay,
    /// Shown on scroll depth
    OnScroll,
    /// Shown when the user tries to leave
    OnExitIntent,
    /// Shown when signals suggest the user is distressed
    OnDistressSignal,
}

/// Role of a choice in a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ChoiceKind {
    /// Accepts the offer
    Accept,
    /// Declines the offer
    Decline,
    /// Neither
    #[default]
    Neutral,
}

/// One option in a prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ChoiceOption {
    /// Label shown to the user
    pub label: String,
    /// Role of the option
    #[serde(default)]
    pub kind: ChoiceKind,
    /// Whether it is selected before the user acts
    #[serde(default)]
    pub preselected: bool,
}

/// Description of a behavioural UX element.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct UxPatternDescriptor {
    /// Identifier of the element
    pub id: String,
    /// What makes it appear
    #[serde(default)]
    pub trigger: UxTrigger,
    /// Whether it blocks the underlying page
    #[serde(default)]
    pub blocking: bool,
    /// Whether the user can close it
    #[serde(default = "default_true")]
    pub dismissible: bool,
    /// Visible countdown, if any
    #[serde(default)]
    pub countdown_secs: Option<u32>,
    /// Choices offered
    #[serde(default)]
    pub choices: Vec<ChoiceOption>,
    /// Free-text description of the behaviour
    #[serde(default)]
    pub description: String,
}

fn default_true() -> bool {
    true
}

impl UxPatternDescriptor {
    /// A dismissible, user-triggered element with no choices.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dismissible: true,
            ..Default::default()
        }
    }

    /// Builder: set trigger.
    pub fn with_trigger(mut self, trigger: UxTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    /// Builder: set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: add a choice.
    pub fn with_choice(mut self, label: impl Into<String>, kind: ChoiceKind) -> Self {
        self.choices.push(ChoiceOption {
            label: label.into(),
            kind,
            preselected: false,
        });
        self
    }
}

/// Structural checks that do not depend on the rule set.
pub(crate) fn structural_violations(descriptor: &UxPatternDescriptor) -> Vec<Violation> {
    let mut violations = Vec::new();

    if descriptor.trigger == UxTrigger::OnDistressSignal {
        violations.push(structural(
            RuleCategory::DistressTiming,
            "ux-structural-distress-trigger",
            "trigger=on_distress_signal",
        ));
    }

    if descriptor.blocking && !descriptor.dismissible {
        violations.push(structural(
            RuleCategory::ForcedAction,
            "ux-structural-blocking",
            "blocking && !dismissible",
        ));
    }
    if descriptor.trigger == UxTrigger::OnExitIntent && descriptor.blocking {
        violations.push(structural(
            RuleCategory::ForcedAction,
            "ux-structural-exit-block",
            "trigger=on_exit_intent && blocking",
        ));
    }

    if let Some(secs) = descriptor.countdown_secs {
        violations.push(structural(
            RuleCategory::CountdownPressure,
            "ux-structural-countdown",
            format!("countdown_secs={}", secs),
        ));
    }

    let has_accept = descriptor
        .choices
        .iter()
        .any(|c| c.kind == ChoiceKind::Accept);
    let has_decline = descriptor
        .choices
        .iter()
        .any(|c| c.kind == ChoiceKind::Decline);

    if has_accept && !has_decline {
        violations.push(structural(
            RuleCategory::DarkPatternChoice,
            "ux-structural-no-decline",
            "accept without decline",
        ));
    }
    if descriptor
        .choices
        .iter()
        .any(|c| c.kind == ChoiceKind::Accept && c.preselected)
    {
        violations.push(structural(
            RuleCategory::DarkPatternChoice,
            "ux-structural-preselected",
            "preselected accept",
        ));
    }

    violations
}

fn structural(category: RuleCategory, rule_id: &str, detail: impl Into<String>) -> Violation {
    Violation {
        category,
        rule_id: rule_id.to_string(),
        matched_pattern: detail.into(),
        matched_text: None,
    }
}
