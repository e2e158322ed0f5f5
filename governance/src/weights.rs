//! Bounded relevance scores per (pain point, tool).
//!
//! Every write is a read-modify-clamp-write under the DashMap entry guard,
//! so concurrent updates to one key are serialized while different keys
//! proceed independently. Each change is audited inside the same critical
//! section, which keeps the audit order for a key identical to the order
//! the updates were applied in.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::analytics::Reinforcement;
use crate::audit::{AuditError, AuditLog, AuditRecord, Subsystem};
use crate::config::WeightConfig;

/// Key of a weight entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct WeightKey {
    /// Pain point the tool is ranked for
    pub pain_point_id: String,
    /// Ranked tool
    pub tool_id: String,
}

impl WeightKey {
    pub fn new(pain_point_id: impl Into<String>, tool_id: impl Into<String>) -> Self {
        Self {
            pain_point_id: pain_point_id.into(),
            tool_id: tool_id.into(),
        }
    }

    /// Parse the `pain_point::tool` form used as audit subject key.
    pub fn parse(subject_key: &str) -> Option<Self> {
        let (pain_point, tool) = subject_key.split_once("::")?;
        if pain_point.is_empty() || tool.is_empty() {
            return None;
        }
        Some(Self::new(pain_point, tool))
    }
}

impl std::fmt::Display for WeightKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.pain_point_id, self.tool_id)
    }
}

/// A stored score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct WeightEntry {
    /// Pain point and tool
    pub key: WeightKey,
    /// Current bounded score
    pub score: f64,
    /// Last change
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

impl WeightEntry {
    pub fn new(key: WeightKey, score: f64) -> Self {
        Self {
            key,
            score,
            updated_at: Utc::now(),
        }
    }
}

/// Closed set of reasons a score may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Completion rate above baseline
    EngagementPositive,
    /// Completion rate below baseline
    EngagementNegative,
    /// Operator adjustment or revert
    ManualReview,
    /// Scheduled decay toward the minimum
    DecaySchedule,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EngagementPositive => "engagement_positive",
            Self::EngagementNegative => "engagement_negative",
            Self::ManualReview => "manual_review",
            Self::DecaySchedule => "decay_schedule",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything that can answer "what is the score of this pair".
///
/// Routing ranks against this so a historical ranking can be recomputed
/// from audit history instead of live state.
pub trait ScoreSource: Send + Sync {
    fn score(&self, key: &WeightKey) -> f64;
}

/// Bounded weight table.
#[derive(Debug)]
pub struct WeightTable {
    entries: DashMap<WeightKey, WeightEntry>,
    bounds: WeightConfig,
    audit: Arc<AuditLog>,
}

impl WeightTable {
    pub fn new(bounds: WeightConfig, audit: Arc<AuditLog>) -> Self {
        Self {
            entries: DashMap::new(),
            bounds,
            audit,
        }
    }

    pub fn bounds(&self) -> &WeightConfig {
        &self.bounds
    }

    /// Apply a sanitized engagement signal. Returns the new score.
    pub fn reinforce(&self, reinforcement: Reinforcement) -> f64 {
        let delta = finite_or_zero(reinforcement.delta());
        self.mutate(
            reinforcement.key(),
            Change::new("reinforce", reinforcement.reason()),
            |score| score + delta,
        )
    }

    /// Operator adjustment outside the telemetry path.
    pub fn review_adjust(&self, key: &WeightKey, delta: f64, reviewer: &str) -> f64 {
        let delta = finite_or_zero(delta);
        self.mutate(
            key,
            Change::new("review_adjust", ReasonCode::ManualReview).actor(reviewer),
            |score| score + delta,
        )
    }

    /// Move a score toward MIN by `factor` (1 keeps it, 0 drops it to MIN).
    pub fn decay(&self, pain_point_id: &str, tool_id: &str, factor: f64) -> f64 {
        self.decay_key(&WeightKey::new(pain_point_id, tool_id), factor)
    }

    /// Decay every entry. Returns the number of scores that changed.
    pub fn decay_all(&self, factor: f64) -> usize {
        let keys: Vec<WeightKey> = self.entries.iter().map(|e| e.key().clone()).collect();
        let changed = keys
            .iter()
            .filter(|key| {
                let before = self.get_key(key);
                self.decay_key(key, factor) != before
            })
            .count();
        info!(entries = keys.len(), changed, factor, "Decay schedule applied");
        changed
    }

    fn decay_key(&self, key: &WeightKey, factor: f64) -> f64 {
        let factor = if factor.is_nan() { 1.0 } else { factor.clamp(0.0, 1.0) };
        let min = self.bounds.min;
        self.mutate(
            key,
            Change::new("decay", ReasonCode::DecaySchedule),
            |score| min + (score - min) * factor,
        )
    }

    /// Current score, or the default if the pair has never been scored.
    ///
    /// A stored value outside the bounds is corrected, written back and
    /// audited instead of being passed on.
    pub fn get_score(&self, pain_point_id: &str, tool_id: &str) -> f64 {
        self.get_key(&WeightKey::new(pain_point_id, tool_id))
    }

    fn get_key(&self, key: &WeightKey) -> f64 {
        match self.entries.get(key) {
            None => return self.bounds.default_score,
            Some(entry) if self.in_bounds(entry.score) => return entry.score,
            Some(_) => {}
        }

        // Out of range: correct under the write guard
        let Some(mut entry) = self.entries.get_mut(key) else {
            return self.bounds.default_score;
        };
        let stored = entry.score;
        if self.in_bounds(stored) {
            return stored;
        }
        let corrected = self.clamp(stored);
        entry.score = corrected;
        entry.updated_at = Utc::now();
        self.audit.append(
            AuditRecord::new(Subsystem::Weights, key.to_string(), "clamp_on_read", "integrity_correction")
                .with_values(json!(stored), json!(corrected)),
        );
        warn!(key = %key, stored, corrected, "Out-of-range weight corrected on read");
        corrected
    }

    /// Undo a weight change by restoring its before-value.
    pub fn revert(&self, entry_id: Uuid, reviewer: &str) -> Result<f64, AuditError> {
        let entry = self.audit.get(entry_id).ok_or(AuditError::UnknownEntry(entry_id))?;
        if entry.subsystem != Subsystem::Weights {
            return Err(AuditError::NotCompensable(format!(
                "entry belongs to {}",
                entry.subsystem
            )));
        }
        let key = WeightKey::parse(&entry.subject_key)
            .ok_or_else(|| AuditError::NotCompensable(format!("bad weight key: {}", entry.subject_key)))?;
        let target = entry.before.as_f64().unwrap_or(self.bounds.default_score);

        Ok(self.mutate(
            &key,
            Change::new("revert", ReasonCode::ManualReview)
                .actor(reviewer)
                .compensating(entry_id),
            |_| target,
        ))
    }

    /// Load a persisted snapshot as-is.
    ///
    /// Values are not corrected here; corrupt values are caught on read.
    pub fn restore(&self, entries: Vec<WeightEntry>) {
        let count = entries.len();
        for entry in entries {
            self.entries.insert(entry.key.clone(), entry);
        }
        info!(entries = count, "Weights restored");
    }

    /// All entries, sorted by key.
    pub fn snapshot(&self) -> Vec<WeightEntry> {
        let mut entries: Vec<WeightEntry> = self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read-modify-clamp-write for one key, audited when the value changes.
    fn mutate<F>(&self, key: &WeightKey, change: Change<'_>, apply: F) -> f64
    where
        F: FnOnce(f64) -> f64,
    {
        let default = self.bounds.default_score;
        let mut entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| WeightEntry::new(key.clone(), default));

        let before = entry.score;
        let after = self.clamp(apply(self.clamp(before)));
        if after == before {
            return after;
        }

        entry.score = after;
        entry.updated_at = Utc::now();

        let mut record = AuditRecord::new(Subsystem::Weights, key.to_string(), change.decision, change.reason.as_str())
            .with_values(json!(before), json!(after));
        if let Some(actor) = change.actor {
            record = record.with_actor(actor);
        }
        if let Some(id) = change.compensates {
            record = record.compensating(id);
        }
        self.audit.append(record);

        info!(
            key = %key,
            before,
            after,
            reason = %change.reason,
            "Weight updated"
        );
        after
    }

    fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            self.bounds.min
        } else {
            value.max(self.bounds.min).min(self.bounds.max)
        }
    }

    fn in_bounds(&self, value: f64) -> bool {
        value >= self.bounds.min && value <= self.bounds.max
    }
}

impl ScoreSource for WeightTable {
    fn score(&self, key: &WeightKey) -> f64 {
        self.get_key(key)
    }
}

/// Scores reconstructed from audit history.
#[derive(Debug, Clone)]
pub struct HistoricalWeights {
    /// Point in time the scores reflect
    pub as_of: DateTime<Utc>,
    scores: HashMap<WeightKey, f64>,
    default_score: f64,
}

impl HistoricalWeights {
    /// Replay the weights subsystem of `audit` up to `as_of`.
    pub fn from_audit(audit: &AuditLog, as_of: DateTime<Utc>, default_score: f64) -> Self {
        let scores = audit
            .weights_as_of(as_of)
            .into_iter()
            .filter_map(|(subject, score)| WeightKey::parse(&subject).map(|key| (key, score)))
            .collect();
        Self {
            as_of,
            scores,
            default_score,
        }
    }
}

impl ScoreSource for HistoricalWeights {
    fn score(&self, key: &WeightKey) -> f64 {
        self.scores.get(key).copied().unwrap_or(self.default_score)
    }
}

struct Change<'a> {
    decision: &'static str,
    reason: ReasonCode,
    actor: Option<&'a str>,
    compensates: Option<Uuid>,
}

impl<'a> Change<'a> {
    fn new(decision: &'static str, reason: ReasonCode) -> Self {
        Self {
            decision,
            reason,
            actor: None,
            compensates: None,
        }
    }

    fn actor(mut self, actor: &'a str) -> Self {
        self.actor = Some(actor);
        self
    }

    fn compensating(mut self, entry_id: Uuid) -> Self {
        self.compensates = Some(entry_id);
        self
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
