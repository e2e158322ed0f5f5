//! Persistence boundary for the audit log and the weight table.
//!
//! The core never waits on these stores. Audit entries reach them through a
//! channel drained by a background forwarder; weight snapshots are saved
//! and loaded explicitly by the owner of the engine.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::audit::{AuditEntry, AuditLog};
use crate::config::PersistenceConfig;
use crate::weights::WeightEntry;

/// Error types for stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not encode or decode a record
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored record is unreadable
    #[error("Corrupt record at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    /// Store cannot accept writes right now
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only storage for audit entries.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist one entry. Appending the same entry twice must be harmless
    /// to readers, which deduplicate by id.
    async fn append(&self, entry: &AuditEntry) -> Result<(), StoreError>;

    /// Every persisted entry, in sequence order.
    async fn load_all(&self) -> Result<Vec<AuditEntry>, StoreError>;
}

/// Snapshot storage for weights.
#[async_trait]
pub trait WeightStore: Send + Sync {
    async fn save(&self, entries: &[WeightEntry]) -> Result<(), StoreError>;

    async fn load(&self) -> Result<Vec<WeightEntry>, StoreError>;
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    audit: RwLock<Vec<AuditEntry>>,
    weights: RwLock<Vec<WeightEntry>>,
    /// Appends that fail before the store starts accepting writes
    failures: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose first `count` appends fail.
    pub fn failing(count: usize) -> Self {
        Self {
            failures: AtomicUsize::new(count),
            ..Self::default()
        }
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        self.audit.write().await.push(entry.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<AuditEntry>, StoreError> {
        Ok(dedup_sorted(self.audit.read().await.clone()))
    }
}

#[async_trait]
impl WeightStore for MemoryStore {
    async fn save(&self, entries: &[WeightEntry]) -> Result<(), StoreError> {
        *self.weights.write().await = entries.to_vec();
        Ok(())
    }

    async fn load(&self) -> Result<Vec<WeightEntry>, StoreError> {
        Ok(self.weights.read().await.clone())
    }
}

/// Audit entries as JSON lines, appended to one file.
#[derive(Debug)]
pub struct JsonlAuditStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlAuditStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditStore for JsonlAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<AuditEntry>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: AuditEntry = serde_json::from_str(line).map_err(|e| StoreError::Corrupt {
                line: index + 1,
                reason: e.to_string(),
            })?;
            entries.push(entry);
        }
        Ok(dedup_sorted(entries))
    }
}

/// Weight snapshot as one JSON document, replaced atomically.
#[derive(Debug)]
pub struct JsonWeightStore {
    path: PathBuf,
}

impl JsonWeightStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl WeightStore for JsonWeightStore {
    async fn save(&self, entries: &[WeightEntry]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), entries = entries.len(), "Weights saved");
        Ok(())
    }

    async fn load(&self) -> Result<Vec<WeightEntry>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Retry settings for the audit forwarder.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retry_count: usize,
    /// Pause between attempts
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&PersistenceConfig::default())
    }
}

impl From<&PersistenceConfig> for RetryPolicy {
    fn from(config: &PersistenceConfig) -> Self {
        Self {
            retry_count: config.retry_count,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Totals reported when the forwarder stops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForwarderReport {
    /// Entries written to the store
    pub forwarded: usize,
    /// Entries that exhausted their retries at least once
    pub deferred: usize,
    /// Entries the store never accepted, in sequence order
    pub unpersisted: Vec<AuditEntry>,
}

impl ForwarderReport {
    pub fn failed(&self) -> usize {
        self.unpersisted.len()
    }
}

/// Open a log that continues a persisted audit stream.
///
/// Persisted entries are restored before anything is appended, so new
/// sequence numbers follow the stored history instead of restarting at
/// zero. New entries are forwarded to the same store.
pub async fn open_persistent_log(
    store: Arc<dyn AuditStore>,
    policy: RetryPolicy,
) -> Result<(AuditLog, JoinHandle<ForwarderReport>), StoreError> {
    let history = store.load_all().await?;
    let restored = history.len();

    let (tx, rx) = mpsc::unbounded_channel();
    let log = AuditLog::with_sink(tx);
    log.restore(history);
    info!(restored, "Audit history restored");

    Ok((log, spawn_audit_forwarder(store, rx, policy)))
}

/// Drain audit entries into a store until every sender is dropped.
///
/// Each append is retried per the policy. An entry that still fails is
/// deferred: deferred entries are retried whenever a later append
/// succeeds, and once more when the channel closes. Whatever the store
/// never accepted is returned in the report.
pub fn spawn_audit_forwarder(
    store: Arc<dyn AuditStore>,
    mut rx: mpsc::UnboundedReceiver<AuditEntry>,
    policy: RetryPolicy,
) -> JoinHandle<ForwarderReport> {
    tokio::spawn(async move {
        let mut report = ForwarderReport::default();
        let mut deferred: Vec<AuditEntry> = Vec::new();

        while let Some(entry) = rx.recv().await {
            if !append_with_retry(store.as_ref(), &entry, policy).await {
                warn!(sequence = entry.sequence, "Audit append deferred");
                report.deferred += 1;
                deferred.push(entry);
                continue;
            }
            report.forwarded += 1;

            // The store is accepting writes again
            if !deferred.is_empty() {
                let mut still_failing = Vec::new();
                for entry in deferred.drain(..) {
                    match store.append(&entry).await {
                        Ok(()) => report.forwarded += 1,
                        Err(_) => still_failing.push(entry),
                    }
                }
                deferred = still_failing;
            }
        }

        // Final flush before shutdown
        for entry in deferred {
            if append_with_retry(store.as_ref(), &entry, policy).await {
                report.forwarded += 1;
            } else {
                error!(sequence = entry.sequence, "Audit entry could not be persisted");
                report.unpersisted.push(entry);
            }
        }

        info!(
            forwarded = report.forwarded,
            deferred = report.deferred,
            failed = report.failed(),
            "Audit forwarder stopped"
        );
        report
    })
}

async fn append_with_retry(store: &dyn AuditStore, entry: &AuditEntry, policy: RetryPolicy) -> bool {
    let mut attempt = 0;
    loop {
        match store.append(entry).await {
            Ok(()) => return true,
            Err(e) if attempt < policy.retry_count => {
                attempt += 1;
                warn!(sequence = entry.sequence, attempt, error = %e, "Audit append failed; retrying");
                tokio::time::sleep(policy.retry_delay).await;
            }
            Err(e) => {
                warn!(sequence = entry.sequence, error = %e, "Audit append failed; retries exhausted");
                return false;
            }
        }
    }
}

fn dedup_sorted(mut entries: Vec<AuditEntry>) -> Vec<AuditEntry> {
    entries.sort_by_key(|e| e.sequence);
    let mut seen = std::collections::HashSet::new();
    entries.retain(|e| seen.insert(e.id));
    entries
}
