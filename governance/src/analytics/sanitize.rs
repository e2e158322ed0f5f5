//! The aggregate shape that may cross into ranking, and the only way to
//! build a weight reinforcement.

use serde::Serialize;
use tracing::debug;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use super::vocabulary::{banned_term, is_identifier, is_page_path};
use super::{FirewallCode, FirewallViolation};
use crate::weights::{ReasonCode, WeightKey};

/// Aggregate engagement for one (pain point, tool) pair.
///
/// Has no public constructor and does not implement `Deserialize`; the
/// only way to obtain one is
/// [`AnalyticsGuard::sanitize_for_matrix`](super::AnalyticsGuard::sanitize_for_matrix).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AggregateSignal {
    pain_point_id: String,
    tool_id: String,
    view_count: u64,
    completion_count: u64,
    avg_time_secs: f64,
    navigation_paths: Vec<String>,
}

impl AggregateSignal {
    pub fn pain_point_id(&self) -> &str {
        &self.pain_point_id
    }

    pub fn tool_id(&self) -> &str {
        &self.tool_id
    }

    pub fn view_count(&self) -> u64 {
        self.view_count
    }

    pub fn completion_count(&self) -> u64 {
        self.completion_count
    }

    pub fn avg_time_secs(&self) -> f64 {
        self.avg_time_secs
    }

    pub fn navigation_paths(&self) -> &[String] {
        &self.navigation_paths
    }

    /// Completions per view, 0 when there are no views.
    pub fn completion_rate(&self) -> f64 {
        if self.view_count == 0 {
            0.0
        } else {
            self.completion_count as f64 / self.view_count as f64
        }
    }

    pub fn key(&self) -> WeightKey {
        WeightKey::new(&self.pain_point_id, &self.tool_id)
    }
}

/// A bounded score change derived from an [`AggregateSignal`].
///
/// [`WeightTable::reinforce`](crate::weights::WeightTable::reinforce) accepts
/// nothing else, and this type can only be built inside the analytics module.
#[derive(Debug, Clone, PartialEq)]
pub struct Reinforcement {
    key: WeightKey,
    delta: f64,
    reason: ReasonCode,
}

impl Reinforcement {
    pub(super) fn new(key: WeightKey, delta: f64, reason: ReasonCode) -> Self {
        Self { key, delta, reason }
    }

    pub fn key(&self) -> &WeightKey {
        &self.key
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn reason(&self) -> ReasonCode {
        self.reason
    }
}

/// Build an [`AggregateSignal`] from raw JSON, dropping every other key.
pub(super) fn sanitize(raw: &serde_json::Value) -> Result<AggregateSignal, Vec<FirewallViolation>> {
    let Some(object) = raw.as_object() else {
        return Err(vec![FirewallViolation::new(
            FirewallCode::InvalidField,
            "aggregate",
            "expected an object",
        )]);
    };

    let mut violations = Vec::new();

    let pain_point_id = identifier(object, "pain_point_id", &mut violations);
    let tool_id = identifier(object, "tool_id", &mut violations);

    let view_count = match object.get("view_count") {
        None => {
            violations.push(FirewallViolation::new(
                FirewallCode::MissingField,
                "view_count",
                "required",
            ));
            0
        }
        Some(value) => count(value, "view_count", &mut violations),
    };
    let completion_count = object
        .get("completion_count")
        .map_or(0, |value| count(value, "completion_count", &mut violations))
        .min(view_count);

    let avg_time_secs = match object.get("avg_time_secs") {
        None => 0.0,
        Some(value) => match value.as_f64() {
            Some(secs) if secs.is_finite() && secs >= 0.0 => secs,
            _ => {
                violations.push(FirewallViolation::new(
                    FirewallCode::InvalidField,
                    "avg_time_secs",
                    "expected a non-negative number",
                ));
                0.0
            }
        },
    };

    let navigation_paths: Vec<String> = object
        .get("navigation_paths")
        .and_then(|value| value.as_array())
        .map(|paths| {
            paths
                .iter()
                .filter_map(|p| p.as_str())
                .filter(|p| is_page_path(p) && banned_term(p).is_none())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let stripped = object
        .keys()
        .filter(|k| !SIGNAL_FIELDS.contains(&k.as_str()))
        .count();
    if stripped > 0 {
        debug!(stripped, "Dropped keys outside the aggregate shape");
    }

    if !violations.is_empty() {
        return Err(violations);
    }

    Ok(AggregateSignal {
        pain_point_id,
        tool_id,
        view_count,
        completion_count,
        avg_time_secs,
        navigation_paths,
    })
}

const SIGNAL_FIELDS: &[&str] = &[
    "pain_point_id",
    "tool_id",
    "view_count",
    "completion_count",
    "avg_time_secs",
    "navigation_paths",
];

fn identifier(
    object: &serde_json::Map<String, serde_json::Value>,
    field: &str,
    violations: &mut Vec<FirewallViolation>,
) -> String {
    match object.get(field).map(|v| v.as_str()) {
        None => {
            violations.push(FirewallViolation::new(FirewallCode::MissingField, field, "required"));
            String::new()
        }
        Some(Some(id)) if is_identifier(id) => {
            if let Some(term) = banned_term(id) {
                violations.push(FirewallViolation::new(FirewallCode::BannedVocabulary, field, term));
            }
            id.to_string()
        }
        Some(_) => {
            violations.push(FirewallViolation::new(
                FirewallCode::InvalidField,
                field,
                "expected a lower-case identifier",
            ));
            String::new()
        }
    }
}

fn count(value: &serde_json::Value, field: &str, violations: &mut Vec<FirewallViolation>) -> u64 {
    match value.as_u64() {
        Some(n) => n,
        None => {
            violations.push(FirewallViolation::new(
                FirewallCode::InvalidField,
                field,
                "expected a non-negative integer",
            ));
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strips_unknown_keys() {
        let signal = sanitize(&json!({
            "pain_point_id": "overthinking",
            "tool_id": "breathing-reset",
            "view_count": 40,
            "completion_count": 30,
            "avg_time_secs": 95.5,
            "navigation_paths": ["/tools/breathing-reset", "javascript:alert(1)"],
            "user_mood": "low",
            "session_id": "abc"
        }))
        .unwrap();

        assert_eq!(signal.view_count(), 40);
        assert_eq!(signal.navigation_paths(), ["/tools/breathing-reset".to_string()]);
        let shape = serde_json::to_value(&signal).unwrap();
        assert_eq!(shape.as_object().unwrap().len(), SIGNAL_FIELDS.len());
    }

    #[test]
    fn test_completions_capped_at_views() {
        let signal = sanitize(&json!({
            "pain_point_id": "p1", "tool_id": "t1",
            "view_count": 10, "completion_count": 99
        }))
        .unwrap();
        assert_eq!(signal.completion_count(), 10);
        assert_eq!(signal.completion_rate(), 1.0);
    }

    #[test]
    fn test_rejects_missing_and_invalid_fields() {
        let violations = sanitize(&json!({
            "tool_id": "Not An Id",
            "view_count": -3
        }))
        .unwrap_err();

        let codes: Vec<_> = violations.iter().map(|v| v.code).collect();
        assert!(codes.contains(&FirewallCode::MissingField));
        assert!(codes.contains(&FirewallCode::InvalidField));
        assert!(sanitize(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_rejects_banned_identifier() {
        let violations = sanitize(&json!({
            "pain_point_id": "depressed-users", "tool_id": "t1", "view_count": 10
        }))
        .unwrap_err();
        assert_eq!(violations[0].code, FirewallCode::BannedVocabulary);
    }
}
