//! Append-only audit trail shared by every governance subsystem.
//!
//! Entries are grouped per subsystem so appends from different subsystems
//! never contend on the same lock. Sequence numbers come from one atomic
//! counter, which gives a total order per subject key without a global lock.
//! History is never edited: undo is a compensating entry.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Error types for audit operations.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// No entry with this id
    #[error("Unknown audit entry: {0}")]
    UnknownEntry(Uuid),

    /// Entry cannot be compensated through the log alone
    #[error("Entry not compensable: {0}")]
    NotCompensable(String),
}

/// Subsystem that produced an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    /// Weight table mutations
    Weights,
    /// Ethics vetoes
    Ethics,
    /// Compliance blocks and unblocks
    Compliance,
    /// Rejected telemetry
    Analytics,
    /// Routing fallbacks
    Routing,
}

impl Subsystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weights => "weights",
            Self::Ethics => "ethics",
            Self::Compliance => "compliance",
            Self::Analytics => "analytics",
            Self::Routing => "routing",
        }
    }

    pub fn all() -> [Self; 5] {
        [
            Self::Weights,
            Self::Ethics,
            Self::Compliance,
            Self::Analytics,
            Self::Routing,
        ]
    }
}

impl std::fmt::Display for Subsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Subsystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|sub| sub.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown subsystem: {}", s))
    }
}

/// An immutable audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AuditEntry {
    /// Unique entry ID
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub id: Uuid,
    /// Position in the global append order
    pub sequence: u64,
    /// When the entry was appended
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub timestamp: DateTime<Utc>,
    /// Producing subsystem
    pub subsystem: Subsystem,
    /// What the decision is about (weight key, content id, event name)
    pub subject_key: String,
    /// Value before the decision
    #[cfg_attr(feature = "typescript", ts(type = "unknown"))]
    pub before: serde_json::Value,
    /// Value after the decision
    #[cfg_attr(feature = "typescript", ts(type = "unknown"))]
    pub after: serde_json::Value,
    /// What was decided
    pub decision: String,
    /// Reason code
    pub reason: String,
    /// Operator or component that asked for the change
    #[serde(default)]
    pub actor: Option<String>,
    /// Entry this one compensates
    #[serde(default)]
    #[cfg_attr(feature = "typescript", ts(type = "string | null"))]
    pub compensates: Option<Uuid>,
}

/// Fields supplied by a caller when appending.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// Producing subsystem
    pub subsystem: Subsystem,
    /// What the decision is about
    pub subject_key: String,
    /// Value before the decision
    pub before: serde_json::Value,
    /// Value after the decision
    pub after: serde_json::Value,
    /// What was decided
    pub decision: String,
    /// Reason code
    pub reason: String,
    /// Operator or component that asked for the change
    pub actor: Option<String>,
    /// Entry this one compensates
    pub compensates: Option<Uuid>,
}

impl AuditRecord {
    pub fn new(
        subsystem: Subsystem,
        subject_key: impl Into<String>,
        decision: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            subsystem,
            subject_key: subject_key.into(),
            before: serde_json::Value::Null,
            after: serde_json::Value::Null,
            decision: decision.into(),
            reason: reason.into(),
            actor: None,
            compensates: None,
        }
    }

    /// Builder: set before/after values.
    pub fn with_values(mut self, before: serde_json::Value, after: serde_json::Value) -> Self {
        self.before = before;
        self.after = after;
        self
    }

    /// Builder: set actor.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Builder: mark as compensating another entry.
    pub fn compensating(mut self, entry_id: Uuid) -> Self {
        self.compensates = Some(entry_id);
        self
    }
}

/// Filter for [`AuditLog::query`]. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Only this subsystem
    pub subsystem: Option<Subsystem>,
    /// Only this subject key
    pub subject_key: Option<String>,
    /// Entries at or after this time
    pub from: Option<DateTime<Utc>>,
    /// Entries at or before this time
    pub to: Option<DateTime<Utc>>,
}

impl AuditQuery {
    pub fn subsystem(mut self, subsystem: Subsystem) -> Self {
        self.subsystem = Some(subsystem);
        self
    }

    pub fn subject(mut self, subject_key: impl Into<String>) -> Self {
        self.subject_key = Some(subject_key.into());
        self
    }

    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    fn matches(&self, entry: &AuditEntry) -> bool {
        self.subject_key
            .as_deref()
            .map_or(true, |key| entry.subject_key == key)
            && self.from.map_or(true, |from| entry.timestamp >= from)
            && self.to.map_or(true, |to| entry.timestamp <= to)
    }
}

/// Append-only audit log.
#[derive(Debug, Default)]
pub struct AuditLog {
    /// Entries per subsystem, in append order
    entries: DashMap<Subsystem, Vec<AuditEntry>>,
    /// Next sequence number
    sequence: AtomicU64,
    /// Optional forwarder to an external store
    sink: Option<mpsc::UnboundedSender<AuditEntry>>,
}

impl AuditLog {
    /// Create an in-memory log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that also pushes every entry onto a channel.
    ///
    /// The receiving side is normally drained by
    /// [`spawn_audit_forwarder`](crate::store::spawn_audit_forwarder).
    pub fn with_sink(sink: mpsc::UnboundedSender<AuditEntry>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::default()
        }
    }

    /// Append an entry and return it.
    ///
    /// The timestamp is never earlier than the previous entry of the same
    /// subsystem, even if the wall clock steps backwards.
    pub fn append(&self, record: AuditRecord) -> AuditEntry {
        let entry = {
            let mut list = self.entries.entry(record.subsystem).or_default();
            let now = Utc::now();
            let timestamp = match list.last() {
                Some(last) if last.timestamp > now => last.timestamp,
                _ => now,
            };
            let entry = AuditEntry {
                id: Uuid::new_v4(),
                sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
                timestamp,
                subsystem: record.subsystem,
                subject_key: record.subject_key,
                before: record.before,
                after: record.after,
                decision: record.decision,
                reason: record.reason,
                actor: record.actor,
                compensates: record.compensates,
            };
            list.push(entry.clone());
            entry
        };

        debug!(
            subsystem = %entry.subsystem,
            subject = %entry.subject_key,
            decision = %entry.decision,
            sequence = entry.sequence,
            "Audit entry appended"
        );

        if let Some(sink) = &self.sink {
            if sink.send(entry.clone()).is_err() {
                warn!(sequence = entry.sequence, "Audit forwarder closed; entry kept in memory only");
            }
        }

        entry
    }

    /// Entries matching a query, in sequence order.
    pub fn query(&self, query: &AuditQuery) -> Vec<AuditEntry> {
        let mut found: Vec<AuditEntry> = match query.subsystem {
            Some(subsystem) => self
                .entries
                .get(&subsystem)
                .map(|list| list.iter().filter(|e| query.matches(e)).cloned().collect())
                .unwrap_or_default(),
            None => self
                .entries
                .iter()
                .flat_map(|list| {
                    list.value()
                        .iter()
                        .filter(|e| query.matches(e))
                        .cloned()
                        .collect::<Vec<_>>()
                })
                .collect(),
        };
        found.sort_by_key(|e| e.sequence);
        found
    }

    /// All entries for a subject key, in sequence order.
    pub fn entries_for(&self, subject_key: &str) -> Vec<AuditEntry> {
        self.query(&AuditQuery::default().subject(subject_key))
    }

    /// Every entry, in sequence order.
    pub fn all(&self) -> Vec<AuditEntry> {
        self.query(&AuditQuery::default())
    }

    /// Look up one entry.
    pub fn get(&self, id: Uuid) -> Option<AuditEntry> {
        self.entries
            .iter()
            .find_map(|list| list.value().iter().find(|e| e.id == id).cloned())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|list| list.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append an entry that undoes another one.
    ///
    /// Before and after are swapped. Weight entries carry live state and
    /// must be reverted through
    /// [`WeightTable::revert`](crate::weights::WeightTable::revert).
    pub fn compensate(&self, entry_id: Uuid, reason: impl Into<String>) -> Result<AuditEntry, AuditError> {
        let original = self.get(entry_id).ok_or(AuditError::UnknownEntry(entry_id))?;
        if original.subsystem == Subsystem::Weights {
            return Err(AuditError::NotCompensable(
                "weight entries are reverted through the weight table".to_string(),
            ));
        }

        let record = AuditRecord::new(original.subsystem, original.subject_key, "compensate", reason)
            .with_values(original.after, original.before)
            .compensating(entry_id);
        Ok(self.append(record))
    }

    /// Weight values as they stood at `as_of`, keyed by subject key.
    pub fn weights_as_of(&self, as_of: DateTime<Utc>) -> BTreeMap<String, f64> {
        let entries = self.query(&AuditQuery::default().subsystem(Subsystem::Weights).to(as_of));
        let mut scores = BTreeMap::new();
        for entry in entries {
            if let Some(score) = entry.after.as_f64() {
                scores.insert(entry.subject_key, score);
            }
        }
        scores
    }

    /// Load previously persisted entries into an empty log.
    ///
    /// New appends continue after the highest restored sequence.
    pub fn restore(&self, entries: Vec<AuditEntry>) {
        let mut next = self.sequence.load(Ordering::SeqCst);
        for entry in entries {
            next = next.max(entry.sequence + 1);
            self.entries.entry(entry.subsystem).or_default().push(entry);
        }
        for mut list in self.entries.iter_mut() {
            list.value_mut().sort_by_key(|e| e.sequence);
        }
        self.sequence.store(next, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(subsystem: Subsystem, subject: &str) -> AuditRecord {
        AuditRecord::new(subsystem, subject, "block", "test")
    }

    #[test]
    fn test_append_and_query() {
        let log = AuditLog::new();
        log.append(record(Subsystem::Compliance, "tool-a"));
        log.append(record(Subsystem::Analytics, "tool_view"));
        log.append(record(Subsystem::Compliance, "tool-b"));

        assert_eq!(log.len(), 3);
        let compliance = log.query(&AuditQuery::default().subsystem(Subsystem::Compliance));
        assert_eq!(compliance.len(), 2);
        assert!(compliance[0].sequence < compliance[1].sequence);
        assert_eq!(log.entries_for("tool-b").len(), 1);
    }

    #[test]
    fn test_timestamps_monotonic_per_subsystem() {
        let log = AuditLog::new();
        for i in 0..50 {
            log.append(record(Subsystem::Routing, &format!("p{}", i)));
        }
        let entries = log.query(&AuditQuery::default().subsystem(Subsystem::Routing));
        assert!(entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_compensate_swaps_values() {
        let log = AuditLog::new();
        let original = log.append(
            record(Subsystem::Compliance, "tool-a").with_values(json!("deploy"), json!("block")),
        );
        let undo = log.compensate(original.id, "reviewed").unwrap();

        assert_eq!(undo.compensates, Some(original.id));
        assert_eq!(undo.before, json!("block"));
        assert_eq!(undo.after, json!("deploy"));
        // The original is untouched
        assert_eq!(log.get(original.id).unwrap(), original);
    }

    #[test]
    fn test_compensate_unknown_or_weight_entry() {
        let log = AuditLog::new();
        assert!(matches!(
            log.compensate(Uuid::new_v4(), "x"),
            Err(AuditError::UnknownEntry(_))
        ));

        let weight = log.append(record(Subsystem::Weights, "p1::t1"));
        assert!(matches!(
            log.compensate(weight.id, "x"),
            Err(AuditError::NotCompensable(_))
        ));
    }

    #[test]
    fn test_weights_as_of() {
        let log = AuditLog::new();
        log.append(record(Subsystem::Weights, "p1::t1").with_values(json!(50.0), json!(55.0)));
        let cutoff = log
            .append(record(Subsystem::Weights, "p1::t1").with_values(json!(55.0), json!(60.0)))
            .timestamp;
        std::thread::sleep(std::time::Duration::from_millis(5));
        log.append(record(Subsystem::Weights, "p1::t1").with_values(json!(60.0), json!(65.0)));

        let scores = log.weights_as_of(cutoff);
        assert_eq!(scores.get("p1::t1"), Some(&60.0));
    }

    #[test]
    fn test_restore_continues_sequence() {
        let source = AuditLog::new();
        source.append(record(Subsystem::Ethics, "a"));
        source.append(record(Subsystem::Ethics, "b"));

        let restored = AuditLog::new();
        restored.restore(source.all());
        let next = restored.append(record(Subsystem::Ethics, "c"));
        assert_eq!(next.sequence, 2);
        assert_eq!(restored.len(), 3);
    }

    #[tokio::test]
    async fn test_sink_receives_entries() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let log = AuditLog::with_sink(tx);
        let entry = log.append(record(Subsystem::Analytics, "tool_view"));

        let forwarded = rx.recv().await.unwrap();
        assert_eq!(forwarded.id, entry.id);
    }
}
