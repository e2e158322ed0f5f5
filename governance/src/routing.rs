//! Pain point to ranked tools.
//!
//! Only tools with a passing compliance report for the active region are
//! eligible. Ordering is fully deterministic: score descending, then title
//! number ascending, then tool id. An empty result never reaches the
//! caller; the designated fallback tool is returned instead.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::audit::{AuditLog, AuditRecord, Subsystem};
use crate::catalog::{Catalog, Tool};
use crate::compliance::ComplianceRegistry;
use crate::config::{FallbackTool, RoutingConfig};
use crate::numerology::title_number;
use crate::regions::normalize_code;
use crate::weights::{ScoreSource, WeightKey, WeightTable};

/// A tool as returned to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ToolRef {
    /// Tool ID
    pub id: String,
    /// Display title
    pub title: String,
    /// Path the rendering layer links to
    pub slug: String,
    /// Ranking score; absent for the fallback tool
    pub score: Option<f64>,
}

impl ToolRef {
    fn ranked(tool: &Tool, score: f64) -> Self {
        Self {
            id: tool.id.clone(),
            title: tool.title.clone(),
            slug: tool.slug.clone(),
            score: Some(score),
        }
    }

    fn fallback(tool: &FallbackTool) -> Self {
        Self {
            id: tool.id.clone(),
            title: tool.title.clone(),
            slug: tool.slug.clone(),
            score: None,
        }
    }
}

/// Why the fallback tool was returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Pain point not in the catalog
    UnknownPainPoint,
    /// No tool passed compliance for the region
    NoEligibleTools,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownPainPoint => "unknown_pain_point",
            Self::NoEligibleTools => "no_eligible_tools",
        }
    }
}

/// How a route was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteOutcome {
    /// Ranked from eligible tools
    Ranked,
    /// Fallback tool returned
    Fallback { reason: FallbackReason },
}

/// Result of routing one pain point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct RouteResult {
    /// Pain point that was routed
    pub pain_point_id: String,
    /// Region whose reports gated eligibility
    pub region: String,
    /// Tools in rank order (never empty)
    pub tools: Vec<ToolRef>,
    /// How the result was produced
    pub outcome: RouteOutcome,
}

impl RouteResult {
    pub fn is_fallback(&self) -> bool {
        matches!(self.outcome, RouteOutcome::Fallback { .. })
    }

    pub fn tool_ids(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.id.as_str()).collect()
    }
}

/// The routing engine.
#[derive(Debug, Clone)]
pub struct RoutingEngine {
    catalog: Arc<Catalog>,
    weights: Arc<WeightTable>,
    registry: Arc<ComplianceRegistry>,
    audit: Arc<AuditLog>,
    config: RoutingConfig,
}

impl RoutingEngine {
    pub fn new(
        config: RoutingConfig,
        catalog: Arc<Catalog>,
        weights: Arc<WeightTable>,
        registry: Arc<ComplianceRegistry>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            catalog,
            weights,
            registry,
            audit,
            config,
        }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Rank tools for a pain point against live weights.
    pub fn route(&self, pain_point_id: &str) -> RouteResult {
        self.rank_with(pain_point_id, self.weights.as_ref())
    }

    /// Rank tools against any score source, e.g. historical weights.
    pub fn rank_with(&self, pain_point_id: &str, scores: &dyn ScoreSource) -> RouteResult {
        let region = normalize_code(&self.config.active_region);

        if self.catalog.pain_point(pain_point_id).is_none() {
            return self.fallback(pain_point_id, region, FallbackReason::UnknownPainPoint);
        }

        let mut candidates: Vec<(f64, u32, &Tool)> = self
            .catalog
            .tools_for(pain_point_id)
            .into_iter()
            .filter(|tool| self.registry.can_deploy(&tool.id, &region))
            .map(|tool| {
                let score = scores.score(&WeightKey::new(pain_point_id, &tool.id));
                (score, title_number(&tool.title), tool)
            })
            .collect();

        if candidates.is_empty() {
            return self.fallback(pain_point_id, region, FallbackReason::NoEligibleTools);
        }

        candidates.sort_by(|a, b| compare(a, b));
        candidates.truncate(self.config.max_results);

        let tools: Vec<ToolRef> = candidates
            .iter()
            .map(|(score, _, tool)| ToolRef::ranked(tool, *score))
            .collect();
        debug!(pain_point = pain_point_id, region = %region, tools = tools.len(), "Routed");

        RouteResult {
            pain_point_id: pain_point_id.to_string(),
            region,
            tools,
            outcome: RouteOutcome::Ranked,
        }
    }

    fn fallback(&self, pain_point_id: &str, region: String, reason: FallbackReason) -> RouteResult {
        let tool = ToolRef::fallback(&self.config.fallback_tool);
        warn!(
            pain_point = pain_point_id,
            region = %region,
            reason = reason.as_str(),
            "Routing fell back"
        );
        self.audit.append(
            AuditRecord::new(Subsystem::Routing, pain_point_id, "fallback", reason.as_str())
                .with_values(serde_json::Value::Null, json!({ "region": region, "tool": tool.id })),
        );
        RouteResult {
            pain_point_id: pain_point_id.to_string(),
            region,
            tools: vec![tool],
            outcome: RouteOutcome::Fallback { reason },
        }
    }
}

fn compare(a: &(f64, u32, &Tool), b: &(f64, u32, &Tool)) -> Ordering {
    b.0.total_cmp(&a.0)
        .then(a.1.cmp(&b.1))
        .then_with(|| a.2.id.cmp(&b.2.id))
}
