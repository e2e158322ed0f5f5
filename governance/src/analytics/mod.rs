//! Analytics firewall between raw telemetry and the weight table.
//!
//! Telemetry reaches ranking only as a [`Reinforcement`], and the only code
//! that can build one lives in this module. Three gates sit in front of it:
//!
//! - [`AnalyticsGuard::validate_event`]: closed lists of event and parameter
//!   names plus a banned-vocabulary scan of every value
//! - [`AnalyticsGuard::sanitize_for_matrix`]: reduces raw data to the fixed
//!   [`AggregateSignal`] shape
//! - [`AnalyticsGuard::validate_matrix_use`]: declared purpose and cohort
//!   size checks before aggregates are used

mod sanitize;
pub mod vocabulary;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::config::AnalyticsConfig;
use crate::weights::ReasonCode;

pub use sanitize::{AggregateSignal, Reinforcement};

/// Use case under which aggregates adjust weights.
pub const WEIGHT_ADJUSTMENT: &str = "weight_adjustment";

/// Why a piece of telemetry was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum FirewallCode {
    /// Event name not on the allow-list
    UnknownEvent,
    /// Event encodes psychological inference
    ForbiddenEvent,
    /// Parameter name not on the allow-list
    UnknownParam,
    /// Parameter names a psychological label
    ForbiddenParam,
    /// Value contains banned vocabulary
    BannedVocabulary,
    /// Value is neither a string nor a finite number
    InvalidValueType,
    /// Use case not on the allow-list
    UnlistedUseCase,
    /// Use case explicitly denied
    DeniedUseCase,
    /// Aggregate below the cohort floor
    InsufficientAggregate,
    /// Required aggregate field absent
    MissingField,
    /// Aggregate field present but malformed
    InvalidField,
}

impl FirewallCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownEvent => "unknown_event",
            Self::ForbiddenEvent => "forbidden_event",
            Self::UnknownParam => "unknown_param",
            Self::ForbiddenParam => "forbidden_param",
            Self::BannedVocabulary => "banned_vocabulary",
            Self::InvalidValueType => "invalid_value_type",
            Self::UnlistedUseCase => "unlisted_use_case",
            Self::DeniedUseCase => "denied_use_case",
            Self::InsufficientAggregate => "insufficient_aggregate",
            Self::MissingField => "missing_field",
            Self::InvalidField => "invalid_field",
        }
    }
}

impl std::fmt::Display for FirewallCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rejected item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct FirewallViolation {
    /// Violation code
    pub code: FirewallCode,
    /// Event, parameter, field or use case the violation is about
    pub subject: String,
    /// Human-readable detail (never the raw value)
    pub detail: String,
}

impl FirewallViolation {
    pub fn new(code: FirewallCode, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code,
            subject: subject.into(),
            detail: detail.into(),
        }
    }
}

/// Result of a firewall check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct FirewallVerdict {
    /// Whether the data may pass
    pub allowed: bool,
    /// Every violation found
    pub violations: Vec<FirewallViolation>,
}

impl FirewallVerdict {
    pub fn from_violations(violations: Vec<FirewallViolation>) -> Self {
        Self {
            allowed: violations.is_empty(),
            violations,
        }
    }

    pub fn has_code(&self, code: FirewallCode) -> bool {
        self.violations.iter().any(|v| v.code == code)
    }

    /// Distinct codes, in first-seen order.
    pub fn codes(&self) -> Vec<FirewallCode> {
        let mut codes = Vec::new();
        for v in &self.violations {
            if !codes.contains(&v.code) {
                codes.push(v.code);
            }
        }
        codes
    }
}

/// The analytics firewall.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsGuard {
    config: AnalyticsConfig,
}

impl AnalyticsGuard {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Check an event name and its parameters.
    ///
    /// All checks run; the verdict lists every problem found.
    pub fn validate_event(
        &self,
        event_name: &str,
        params: &serde_json::Map<String, serde_json::Value>,
    ) -> FirewallVerdict {
        let mut violations = Vec::new();

        if vocabulary::is_forbidden_event(event_name) {
            violations.push(FirewallViolation::new(
                FirewallCode::ForbiddenEvent,
                event_name,
                "event encodes psychological inference",
            ));
        } else if !vocabulary::is_allowed_event(event_name) {
            violations.push(FirewallViolation::new(
                FirewallCode::UnknownEvent,
                event_name,
                "event not on the allow-list",
            ));
        }

        for (name, value) in params {
            if vocabulary::is_forbidden_param(name) {
                violations.push(FirewallViolation::new(
                    FirewallCode::ForbiddenParam,
                    name,
                    "parameter names a psychological label",
                ));
            } else if !vocabulary::is_allowed_param(name) {
                violations.push(FirewallViolation::new(
                    FirewallCode::UnknownParam,
                    name,
                    "parameter not on the allow-list",
                ));
            }

            // Values are scanned even under allowed names
            match value {
                serde_json::Value::String(text) => {
                    if let Some(term) = vocabulary::banned_term(text) {
                        violations.push(FirewallViolation::new(
                            FirewallCode::BannedVocabulary,
                            name,
                            term,
                        ));
                    }
                }
                serde_json::Value::Number(n) if n.as_f64().is_some_and(f64::is_finite) => {}
                _ => violations.push(FirewallViolation::new(
                    FirewallCode::InvalidValueType,
                    name,
                    "expected a string or finite number",
                )),
            }
        }

        let verdict = FirewallVerdict::from_violations(violations);
        if verdict.allowed {
            debug!(event = event_name, params = params.len(), "Event accepted");
        } else {
            warn!(event = event_name, codes = ?verdict.codes(), "Event rejected");
        }
        verdict
    }

    /// Check an untyped event payload; anything but an object is rejected.
    pub fn validate_event_value(&self, event_name: &str, params: &serde_json::Value) -> FirewallVerdict {
        match params {
            serde_json::Value::Object(map) => self.validate_event(event_name, map),
            _ => FirewallVerdict::from_violations(vec![FirewallViolation::new(
                FirewallCode::InvalidValueType,
                "params",
                "expected an object",
            )]),
        }
    }

    /// Check whether an aggregate may be used for a declared purpose.
    pub fn validate_matrix_use(&self, aggregate: &AggregateSignal, use_case: &str) -> FirewallVerdict {
        let mut violations = Vec::new();

        let denied = vocabulary::is_denied_use_case(use_case);
        if denied {
            violations.push(FirewallViolation::new(
                FirewallCode::DeniedUseCase,
                use_case,
                "use case is explicitly denied",
            ));
        }
        if !vocabulary::is_allowed_use_case(use_case) && !denied {
            violations.push(FirewallViolation::new(
                FirewallCode::UnlistedUseCase,
                use_case,
                "use case is not on the allow-list",
            ));
        }

        if aggregate.view_count() < self.config.min_cohort_size {
            violations.push(FirewallViolation::new(
                FirewallCode::InsufficientAggregate,
                "view_count",
                format!(
                    "{} views, at least {} required",
                    aggregate.view_count(),
                    self.config.min_cohort_size
                ),
            ));
        }

        FirewallVerdict::from_violations(violations)
    }

    /// Reduce raw aggregate data to the fixed [`AggregateSignal`] shape.
    pub fn sanitize_for_matrix(&self, raw: &serde_json::Value) -> Result<AggregateSignal, FirewallVerdict> {
        sanitize::sanitize(raw).map_err(|violations| {
            let verdict = FirewallVerdict::from_violations(violations);
            warn!(codes = ?verdict.codes(), "Aggregate rejected");
            verdict
        })
    }

    /// Turn an aggregate into a bounded weight change.
    ///
    /// The delta is `(completion_rate - baseline) * scale`, capped at
    /// `max_delta_per_signal` either way.
    pub fn reinforcement_for(&self, aggregate: &AggregateSignal) -> Result<Reinforcement, FirewallVerdict> {
        let verdict = self.validate_matrix_use(aggregate, WEIGHT_ADJUSTMENT);
        if !verdict.allowed {
            return Err(verdict);
        }

        // The cap may come from a config that was never validated
        let cap = match self.config.max_delta_per_signal.abs() {
            cap if cap.is_nan() => 0.0,
            cap => cap,
        };
        let raw = (aggregate.completion_rate() - self.config.completion_baseline)
            * self.config.reinforcement_scale;
        let delta = if raw.is_finite() { raw.clamp(-cap, cap) } else { 0.0 };
        let reason = if delta < 0.0 {
            ReasonCode::EngagementNegative
        } else {
            ReasonCode::EngagementPositive
        };

        Ok(Reinforcement::new(aggregate.key(), delta, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    fn aggregate(views: u64, completions: u64) -> AggregateSignal {
        AnalyticsGuard::default()
            .sanitize_for_matrix(&json!({
                "pain_point_id": "p1",
                "tool_id": "t1",
                "view_count": views,
                "completion_count": completions
            }))
            .unwrap()
    }

    #[test]
    fn test_allowed_event() {
        let guard = AnalyticsGuard::default();
        let verdict = guard.validate_event(
            "tool_complete",
            &params(json!({ "tool_id": "t1", "duration_secs": 120 })),
        );
        assert!(verdict.allowed);
    }

    #[test]
    fn test_forbidden_param_under_allowed_event() {
        let guard = AnalyticsGuard::default();
        let verdict = guard.validate_event(
            "tool_view",
            &params(json!({ "tool_id": "t1", "emotional_state": "low" })),
        );
        assert!(!verdict.allowed);
        assert_eq!(verdict.codes(), vec![FirewallCode::ForbiddenParam]);
    }

    #[test]
    fn test_banned_value_under_allowed_param() {
        let guard = AnalyticsGuard::default();
        let verdict = guard.validate_event(
            "share_click",
            &params(json!({ "share_target": "user is depressed" })),
        );
        assert!(verdict.has_code(FirewallCode::BannedVocabulary));
    }

    #[test]
    fn test_unknown_and_forbidden_events() {
        let guard = AnalyticsGuard::default();
        assert!(guard
            .validate_event("mood_check", &params(json!({})))
            .has_code(FirewallCode::ForbiddenEvent));
        assert!(guard
            .validate_event("page_scroll", &params(json!({ "depth": 3 })))
            .has_code(FirewallCode::UnknownEvent));
        assert!(guard
            .validate_event("page_scroll", &params(json!({ "depth": 3 })))
            .has_code(FirewallCode::UnknownParam));
    }

    #[test]
    fn test_value_types() {
        let guard = AnalyticsGuard::default();
        let verdict = guard.validate_event("tool_view", &params(json!({ "tool_id": ["t1"] })));
        assert!(verdict.has_code(FirewallCode::InvalidValueType));
        assert!(!guard.validate_event_value("tool_view", &json!("t1")).allowed);
    }

    #[test]
    fn test_matrix_use_lists_checked_independently() {
        let guard = AnalyticsGuard::default();
        let signal = aggregate(20, 10);

        assert!(guard.validate_matrix_use(&signal, "tool_ordering").allowed);
        assert!(guard
            .validate_matrix_use(&signal, "personalization")
            .has_code(FirewallCode::DeniedUseCase));
        // A novel purpose is rejected, not merely unmatched
        assert!(guard
            .validate_matrix_use(&signal, "retention_nudges")
            .has_code(FirewallCode::UnlistedUseCase));
    }

    #[test]
    fn test_cohort_floor() {
        let guard = AnalyticsGuard::default();
        let verdict = guard.validate_matrix_use(&aggregate(3, 3), WEIGHT_ADJUSTMENT);
        assert!(verdict.has_code(FirewallCode::InsufficientAggregate));
        assert!(guard.reinforcement_for(&aggregate(3, 3)).is_err());
    }

    #[test]
    fn test_reinforcement_is_bounded() {
        let guard = AnalyticsGuard::default();

        let up = guard.reinforcement_for(&aggregate(100, 100)).unwrap();
        assert_eq!(up.delta(), 5.0);
        assert_eq!(up.reason(), ReasonCode::EngagementPositive);

        let down = guard.reinforcement_for(&aggregate(100, 40)).unwrap();
        assert!((down.delta() + 1.0).abs() < 1e-9);
        assert_eq!(down.reason(), ReasonCode::EngagementNegative);
        assert_eq!(down.key().tool_id, "t1");
    }

    #[test]
    fn test_reinforcement_with_unvalidated_cap() {
        let negative = AnalyticsGuard::new(AnalyticsConfig {
            max_delta_per_signal: -1.0,
            ..AnalyticsConfig::default()
        });
        let up = negative.reinforcement_for(&aggregate(100, 100)).unwrap();
        assert_eq!(up.delta(), 1.0);
        let down = negative.reinforcement_for(&aggregate(100, 0)).unwrap();
        assert_eq!(down.delta(), -1.0);

        let nan = AnalyticsGuard::new(AnalyticsConfig {
            max_delta_per_signal: f64::NAN,
            ..AnalyticsConfig::default()
        });
        assert_eq!(nan.reinforcement_for(&aggregate(100, 100)).unwrap().delta(), 0.0);
    }
}
