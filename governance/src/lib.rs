//! Bounded adaptive routing and governance engine
//!
//! Sits between raw signals (content, engagement telemetry, regional
//! variants) and anything shown to a user or fed back into ranking.
//!
//! # Architecture
//!
//! ```text
//! telemetry ──► AnalyticsGuard ──► WeightTable ──► AuditLog
//! content   ──► EthicsGuard + ComplianceEngine ──► AuditLog
//!                                   │
//! query     ──► RoutingEngine ◄─────┘ (only compliant tools)
//! ```
//!
//! # Key Components
//!
//! - [`AuditLog`]: append-only record of every state-changing decision
//! - [`WeightTable`]: bounded per-(pain point, tool) scores
//! - [`AnalyticsGuard`]: the only path from telemetry to the weight table
//! - [`ComplianceEngine`]: region-aware deploy/block classification
//! - [`RoutingEngine`]: deterministic ranking with a fallback tool
//! - [`GovernanceEngine`]: wires the above around one audit log
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use governance::{Catalog, GovernanceConfig, GovernanceEngine, RegionCatalog};
//!
//! let catalog = Catalog::from_yaml(r#"
//! pain_points:
//!   - { id: p1, title: Restless evenings, tool_ids: [t1] }
//! tools:
//!   - { id: t1, title: Box Breathing, slug: /tools/t1 }
//! "#).unwrap();
//! let engine = GovernanceEngine::new(
//!     GovernanceConfig::default(),
//!     catalog,
//!     RegionCatalog::builtin(),
//!     Arc::new(ethics::RuleSet::builtin()),
//! );
//!
//! // No compliance report yet, so nothing is eligible
//! assert!(engine.route("p1").is_fallback());
//! ```

pub mod analytics;
pub mod audit;
pub mod boundary;
pub mod catalog;
pub mod compliance;
pub mod config;
pub mod engine;
pub mod numerology;
pub mod regions;
pub mod routing;
pub mod store;
pub mod types;
pub mod weights;

// Re-export main types
pub use analytics::{AggregateSignal, AnalyticsGuard, FirewallCode, FirewallVerdict, Reinforcement};
pub use audit::{AuditEntry, AuditError, AuditLog, AuditQuery, AuditRecord, Subsystem};
pub use boundary::{Disposition, ServingMode, ServingPolicy};
pub use catalog::{Catalog, CatalogError, PainPoint, Tool};
pub use compliance::{
    ComplianceEngine, ComplianceRegistry, ComplianceReport, ConsentMechanism, ContentItem, ContentKind, Finding,
};
pub use config::{ConfigError, GovernanceConfig};
pub use engine::GovernanceEngine;
pub use regions::{Region, RegionCatalog, RegionError, RegionProfile, RegionProvider};
pub use routing::{FallbackReason, RouteOutcome, RouteResult, RoutingEngine, ToolRef};
pub use store::{
    open_persistent_log, spawn_audit_forwarder, AuditStore, ForwarderReport, JsonWeightStore, JsonlAuditStore,
    MemoryStore, RetryPolicy, StoreError, WeightStore,
};
pub use types::{GovernanceError, Result};
pub use weights::{HistoricalWeights, ReasonCode, ScoreSource, WeightEntry, WeightKey, WeightTable};
