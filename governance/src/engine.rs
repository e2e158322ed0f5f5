//! The governance engine facade.
//!
//! Wires every component around one shared audit log. There is no global
//! state: each engine owns its weight table and compliance registry, so
//! several engines (one per region or tenant) can run side by side.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ethics::{EthicsGuard, EvaluationContext, RuleSet, UxPatternDescriptor, VetoResult};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::analytics::{AnalyticsGuard, FirewallVerdict};
use crate::audit::{AuditError, AuditLog, AuditRecord, Subsystem};
use crate::catalog::Catalog;
use crate::compliance::{ComplianceEngine, ComplianceRegistry, ComplianceReport, ContentItem};
use crate::config::GovernanceConfig;
use crate::regions::RegionCatalog;
use crate::routing::{RouteResult, RoutingEngine};
use crate::store::WeightStore;
use crate::types::Result;
use crate::weights::{HistoricalWeights, WeightEntry, WeightKey, WeightTable};

/// The bounded adaptive routing and governance engine.
pub struct GovernanceEngine {
    config: GovernanceConfig,
    audit: Arc<AuditLog>,
    guard: EthicsGuard,
    weights: Arc<WeightTable>,
    analytics: AnalyticsGuard,
    compliance: ComplianceEngine,
    router: RoutingEngine,
}

impl GovernanceEngine {
    /// Build an engine with an in-memory audit log.
    pub fn new(
        config: GovernanceConfig,
        catalog: Catalog,
        regions: RegionCatalog,
        rule_set: Arc<RuleSet>,
    ) -> Self {
        Self::with_audit(config, catalog, regions, rule_set, Arc::new(AuditLog::new()))
    }

    /// Build an engine around an existing audit log (e.g. one with a sink).
    pub fn with_audit(
        config: GovernanceConfig,
        catalog: Catalog,
        regions: RegionCatalog,
        rule_set: Arc<RuleSet>,
        audit: Arc<AuditLog>,
    ) -> Self {
        let guard = EthicsGuard::with_rules(rule_set);
        let registry = Arc::new(ComplianceRegistry::new());
        let weights = Arc::new(WeightTable::new(config.weights.clone(), audit.clone()));
        let analytics = AnalyticsGuard::new(config.analytics.clone());
        let compliance = ComplianceEngine::new(
            guard.clone(),
            Arc::new(regions),
            registry.clone(),
            audit.clone(),
        );
        let router = RoutingEngine::new(
            config.routing.clone(),
            Arc::new(catalog),
            weights.clone(),
            registry,
            audit.clone(),
        );

        info!(
            rule_set = %guard.rules().version(),
            region = %config.routing.active_region,
            "Governance engine initialized"
        );

        Self {
            config,
            audit,
            guard,
            weights,
            analytics,
            compliance,
            router,
        }
    }

    /// Build from config, loading the rule set it names (or the built-in one).
    pub fn from_config(
        config: GovernanceConfig,
        catalog: Catalog,
        regions: RegionCatalog,
        audit: Arc<AuditLog>,
    ) -> Result<Self> {
        config.validate()?;
        let rule_set = match &config.ethics.rule_set_path {
            Some(path) => RuleSet::from_file(path)?,
            None => RuleSet::builtin(),
        };
        Ok(Self::with_audit(config, catalog, regions, Arc::new(rule_set), audit))
    }

    /// Veto check over text; vetoes are audited under `ethics`.
    pub fn evaluate_text(&self, text: &str, context: &EvaluationContext) -> VetoResult {
        let result = self.guard.evaluate(text, context);
        let subject = context.content_id.as_deref().unwrap_or("inline");
        self.audit_veto(subject, &result);
        result
    }

    /// Veto check over a UX descriptor; vetoes are audited under `ethics`.
    pub fn evaluate_ux_pattern(&self, descriptor: &UxPatternDescriptor) -> VetoResult {
        let result = self.guard.evaluate_ux_pattern(descriptor);
        self.audit_veto(&descriptor.id, &result);
        result
    }

    /// Validate a telemetry event; rejections are audited under `analytics`.
    pub fn record_event(&self, event_name: &str, params: &serde_json::Value) -> FirewallVerdict {
        let verdict = self.analytics.validate_event_value(event_name, params);
        if !verdict.allowed {
            self.audit_rejection(event_name, &verdict);
        }
        verdict
    }

    /// Turn raw aggregate telemetry into a weight update.
    ///
    /// This is the only path from telemetry to the weight table. Returns the
    /// new score, or the verdict that stopped the data.
    pub fn ingest_telemetry(&self, raw: &serde_json::Value) -> std::result::Result<f64, FirewallVerdict> {
        let signal = self.analytics.sanitize_for_matrix(raw).map_err(|verdict| {
            self.audit_rejection("aggregate", &verdict);
            verdict
        })?;
        let reinforcement = self.analytics.reinforcement_for(&signal).map_err(|verdict| {
            self.audit_rejection(&signal.key().to_string(), &verdict);
            verdict
        })?;
        Ok(self.weights.reinforce(reinforcement))
    }

    /// Check content for a region and record the report for routing.
    pub fn review_content(&self, content: &ContentItem, region_code: &str) -> ComplianceReport {
        self.compliance.check_compliance(content, region_code)
    }

    /// Check untyped content for a region.
    pub fn review_content_value(&self, content: &serde_json::Value, region_code: &str) -> ComplianceReport {
        self.compliance.check_compliance_value(content, region_code)
    }

    /// Ranked tools for a pain point.
    pub fn route(&self, pain_point_id: &str) -> RouteResult {
        self.router.route(pain_point_id)
    }

    /// Recompute a ranking from the weights as they stood at `as_of`.
    ///
    /// Eligibility uses the current compliance registry.
    pub fn route_as_of(&self, pain_point_id: &str, as_of: DateTime<Utc>) -> RouteResult {
        let history = HistoricalWeights::from_audit(&self.audit, as_of, self.config.weights.default_score);
        self.router.rank_with(pain_point_id, &history)
    }

    /// Operator adjustment of one weight.
    pub fn review_adjust(&self, key: &WeightKey, delta: f64, reviewer: &str) -> f64 {
        self.weights.review_adjust(key, delta, reviewer)
    }

    /// Undo a weight change recorded in the audit log.
    pub fn revert_weight(&self, entry_id: Uuid, reviewer: &str) -> std::result::Result<f64, AuditError> {
        self.weights.revert(entry_id, reviewer)
    }

    /// Apply the configured decay factor to every weight.
    pub fn run_decay_schedule(&self) -> usize {
        self.weights.decay_all(self.config.weights.decay_factor)
    }

    /// Load weights from a snapshot.
    pub fn restore_weights(&self, entries: Vec<WeightEntry>) {
        self.weights.restore(entries);
    }

    /// Load weights from a store. Returns the number of entries.
    pub async fn load_weights(&self, store: &dyn WeightStore) -> Result<usize> {
        let entries = store.load().await?;
        let count = entries.len();
        self.restore_weights(entries);
        Ok(count)
    }

    /// Save a weight snapshot to a store.
    pub async fn save_weights(&self, store: &dyn WeightStore) -> Result<usize> {
        let snapshot = self.weights.snapshot();
        store.save(&snapshot).await?;
        Ok(snapshot.len())
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    pub fn guard(&self) -> &EthicsGuard {
        &self.guard
    }

    pub fn weights(&self) -> &Arc<WeightTable> {
        &self.weights
    }

    pub fn analytics(&self) -> &AnalyticsGuard {
        &self.analytics
    }

    pub fn compliance(&self) -> &ComplianceEngine {
        &self.compliance
    }

    pub fn router(&self) -> &RoutingEngine {
        &self.router
    }

    fn audit_veto(&self, subject: &str, result: &VetoResult) {
        if result.allowed {
            return;
        }
        let categories: Vec<String> = result.categories().iter().map(|c| c.code()).collect();
        self.audit.append(
            AuditRecord::new(Subsystem::Ethics, subject, "veto", categories.join(","))
                .with_values(
                    serde_json::Value::Null,
                    json!({
                        "categories": categories,
                        "rule_set_version": result.rule_set_version,
                        "rule_set_fingerprint": result.rule_set_fingerprint,
                    }),
                ),
        );
    }

    fn audit_rejection(&self, subject: &str, verdict: &FirewallVerdict) {
        let codes: Vec<&str> = verdict.codes().iter().map(|c| c.as_str()).collect();
        let subjects: Vec<&str> = verdict.violations.iter().map(|v| v.subject.as_str()).collect();
        self.audit.append(
            AuditRecord::new(Subsystem::Analytics, subject, "reject", codes.join(","))
                .with_values(serde_json::Value::Null, json!({ "codes": codes, "fields": subjects })),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditQuery;
    use crate::compliance::ContentKind;
    use crate::store::MemoryStore;

    fn engine() -> GovernanceEngine {
        let catalog = Catalog::from_yaml(
            r#"
pain_points:
  - { id: p1, title: Restless evenings, tool_ids: [t1, t2] }
tools:
  - { id: t1, title: Box Breathing, slug: /tools/t1 }
  - { id: t2, title: Body Scan, slug: /tools/t2 }
"#,
        )
        .unwrap();
        GovernanceEngine::new(
            GovernanceConfig::default(),
            catalog,
            RegionCatalog::builtin(),
            Arc::new(RuleSet::builtin()),
        )
    }

    fn approve(engine: &GovernanceEngine, id: &str) {
        let item = ContentItem::new(id, ContentKind::Tool, "A calm, short exercise.")
            .with_disclaimer("not_medical_advice")
            .with_disclaimer("crisis_line_us");
        assert!(engine.review_content(&item, "US").can_deploy);
    }

    #[test]
    fn test_telemetry_path() {
        let engine = engine();
        let score = engine
            .ingest_telemetry(&json!({
                "pain_point_id": "p1", "tool_id": "t2",
                "view_count": 50, "completion_count": 50
            }))
            .unwrap();
        assert_eq!(score, 55.0);
        assert_eq!(engine.weights().get_score("p1", "t2"), 55.0);

        approve(&engine, "t1");
        approve(&engine, "t2");
        assert_eq!(engine.route("p1").tools[0].id, "t2");
    }

    #[test]
    fn test_rejections_audited_without_values() {
        let engine = engine();
        let verdict = engine.record_event("tool_view", &json!({ "tool_id": "t1", "mood": "low" }));
        assert!(!verdict.allowed);

        let small = engine.ingest_telemetry(&json!({
            "pain_point_id": "p1", "tool_id": "t1", "view_count": 2
        }));
        assert!(small.is_err());
        assert_eq!(engine.weights().len(), 0);

        let rejections = engine
            .audit()
            .query(&AuditQuery::default().subsystem(Subsystem::Analytics));
        assert_eq!(rejections.len(), 2);
        assert_eq!(rejections[0].reason, "forbidden_param");
        assert!(!rejections[0].after.to_string().contains("low"));
        assert_eq!(rejections[1].subject_key, "p1::t1");
    }

    #[test]
    fn test_vetoes_audited() {
        let engine = engine();
        let result = engine.evaluate_text(
            "Act now before it's too late!",
            &EvaluationContext::for_content("banner-1"),
        );
        assert!(!result.allowed);
        let entries = engine.audit().entries_for("banner-1");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reason, "urgency_pressure");
    }

    #[test]
    fn test_decay_schedule_and_route_as_of() {
        let engine = engine();
        approve(&engine, "t1");
        approve(&engine, "t2");
        engine.review_adjust(&WeightKey::new("p1", "t1"), 40.0, "ops");
        let as_of = Utc::now();
        let before = engine.route("p1");

        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(engine.run_decay_schedule(), 1);
        assert!(engine.weights().get_score("p1", "t1") < 90.0);
        assert_eq!(engine.route_as_of("p1", as_of), before);
    }

    #[tokio::test]
    async fn test_weights_persist() {
        let engine = engine();
        let store = MemoryStore::new();
        engine.review_adjust(&WeightKey::new("p1", "t1"), 10.0, "ops");
        assert_eq!(engine.save_weights(&store).await.unwrap(), 1);

        let fresh = self::engine();
        assert_eq!(fresh.load_weights(&store).await.unwrap(), 1);
        assert_eq!(fresh.weights().get_score("p1", "t1"), 60.0);
    }

    #[test]
    fn test_from_config_bad_rule_set_path() {
        let mut config = GovernanceConfig::default();
        config.ethics.rule_set_path = Some("/nonexistent/rules.yaml".to_string());
        let result = GovernanceEngine::from_config(
            config,
            Catalog::default(),
            RegionCatalog::builtin(),
            Arc::new(AuditLog::new()),
        );
        assert!(matches!(result, Err(crate::GovernanceError::RuleSet(_))));
    }
}
