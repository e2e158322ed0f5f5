//! Shared error types for the governance engine.

use crate::audit::AuditError;
use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::regions::RegionError;
use crate::store::StoreError;

/// Error types for governance operations.
///
/// Evaluation paths (veto, compliance, routing, weight updates) never
/// return these; they report explicit results instead. Errors come only
/// from loading and persistence.
#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog error
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Region profile error
    #[error("Region profile error: {0}")]
    Region(#[from] RegionError),

    /// Rule set error
    #[error("Rule set error: {0}")]
    RuleSet(#[from] ethics::RuleSetError),

    /// Audit error
    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    /// Persistence error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, GovernanceError>;
