//! End-to-end behaviour of the governance engine.

use std::sync::Arc;

use ethics::{EthicsGuard, EvaluationContext, RuleCategory, RuleSet};
use governance::{
    AnalyticsGuard, AuditQuery, Catalog, ComplianceReport, ContentItem, ContentKind, Disposition, FallbackReason,
    FirewallCode, GovernanceConfig, GovernanceEngine, RegionCatalog, RouteOutcome, ServingPolicy, Subsystem,
};
use serde_json::json;

const CATALOG: &str = r#"
pain_points:
  - id: p1
    title: Can't switch off after work
    gate: rest
    tool_ids: [t1, t2]
tools:
  - id: t1
    title: Box Breathing
    slug: /tools/box-breathing
  - id: t2
    title: Worry List
    slug: /tools/worry-list
"#;

fn engine_with(config: GovernanceConfig) -> GovernanceEngine {
    GovernanceEngine::new(
        config,
        Catalog::from_yaml(CATALOG).unwrap(),
        RegionCatalog::builtin(),
        Arc::new(RuleSet::builtin()),
    )
}

fn engine() -> GovernanceEngine {
    engine_with(GovernanceConfig::default())
}

fn compliant_tool(id: &str) -> ContentItem {
    ContentItem::new(id, ContentKind::Tool, "Breathe in for four counts and out for four.")
        .with_disclaimer("not_medical_advice")
        .with_disclaimer("crisis_line_us")
}

#[test]
fn cure_anxiety_guaranteed_is_vetoed() {
    let result = EthicsGuard::new().evaluate(
        "This tool will cure your anxiety, guaranteed.",
        &EvaluationContext::default(),
    );
    assert!(!result.allowed);
    assert!(result.has_category(RuleCategory::OutcomeGuarantee));
    assert!(result.has_category(RuleCategory::ClinicalLanguage));
}

#[test]
fn oversized_reinforcement_is_clamped_to_max() {
    // Let a single signal carry +500 so the clamp, not the per-signal cap, bounds it
    let mut config = GovernanceConfig::default();
    config.analytics.reinforcement_scale = 1000.0;
    config.analytics.max_delta_per_signal = 1000.0;
    let engine = engine_with(config);

    let score = engine
        .ingest_telemetry(&json!({
            "pain_point_id": "p1",
            "tool_id": "t1",
            "view_count": 10,
            "completion_count": 10
        }))
        .unwrap();
    assert_eq!(score, 100.0);
    assert_eq!(engine.weights().get_score("p1", "t1"), 100.0);

    let entries = engine.audit().entries_for("p1::t1");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].before, json!(50.0));
    assert_eq!(entries[0].after, json!(100.0));
    assert_eq!(entries[0].reason, "engagement_positive");
}

#[test]
fn forbidden_param_rejected_under_allowed_event() {
    let guard = AnalyticsGuard::default();
    let verdict = guard.validate_event_value("tool_view", &json!({ "tool_id": "t1", "emotional_state": "low" }));
    assert!(!verdict.allowed);
    assert!(verdict.has_code(FirewallCode::ForbiddenParam));
}

#[test]
fn unknown_region_blocks() {
    let engine = engine();
    let report = engine.review_content(&compliant_tool("t1"), "XX");
    assert!(!report.can_deploy);
    assert!(report.has_blocker("unknown_region"));

    // Even the lenient boundary withholds it
    assert!(matches!(
        ServingPolicy::lenient().disposition(&report),
        Disposition::Withhold { .. }
    ));
}

#[test]
fn all_tools_non_compliant_routes_to_fallback() {
    let engine = engine();
    for id in ["t1", "t2"] {
        let item = ContentItem::new(id, ContentKind::Tool, "Last chance! Act now.");
        assert!(!engine.review_content(&item, "US").can_deploy);
    }

    let result = engine.route("p1");
    assert_eq!(
        result.outcome,
        RouteOutcome::Fallback {
            reason: FallbackReason::NoEligibleTools
        }
    );
    assert_eq!(result.tools.len(), 1);
    assert_eq!(result.tools[0].id, engine.config().routing.fallback_tool.id);
}

#[test]
fn firewall_keeps_banned_signals_out_of_weights() {
    let engine = engine();

    let rejected = [
        json!({ "pain_point_id": "p1", "tool_id": "t1", "view_count": 2 }),
        json!({ "pain_point_id": "lonely-users", "tool_id": "t1", "view_count": 50 }),
        json!({ "pain_point_id": "p1", "tool_id": "t1" }),
        json!("p1::t1"),
    ];
    for raw in &rejected {
        assert!(engine.ingest_telemetry(raw).is_err(), "accepted {}", raw);
    }

    assert!(engine.weights().is_empty());
    assert!(engine
        .audit()
        .query(&AuditQuery::default().subsystem(Subsystem::Weights))
        .is_empty());
    assert_eq!(
        engine
            .audit()
            .query(&AuditQuery::default().subsystem(Subsystem::Analytics))
            .len(),
        rejected.len()
    );
}

#[test]
fn malformed_content_fails_closed() {
    let engine = engine();
    for raw in [json!(null), json!([]), json!({ "id": "t1" }), json!({ "id": "t1", "text": false })] {
        let report: ComplianceReport = engine.review_content_value(&raw, "US");
        assert!(!report.can_deploy);
        assert!(report.has_blocker("evaluation_error"));
    }
}

#[test]
fn engagement_reorders_compliant_tools() {
    let engine = engine();
    engine.review_content(&compliant_tool("t1"), "US");
    engine.review_content(&compliant_tool("t2"), "US");

    for _ in 0..3 {
        engine
            .ingest_telemetry(&json!({
                "pain_point_id": "p1", "tool_id": "t2",
                "view_count": 20, "completion_count": 18
            }))
            .unwrap();
    }

    let result = engine.route("p1");
    assert_eq!(result.outcome, RouteOutcome::Ranked);
    assert_eq!(result.tool_ids(), vec!["t2", "t1"]);
    assert_eq!(
        engine
            .audit()
            .query(&AuditQuery::default().subsystem(Subsystem::Weights))
            .len(),
        3
    );
}

#[test]
fn lenient_mode_relaxes_only_soft_blockers() {
    let engine = engine();
    let missing = ContentItem::new("t1", ContentKind::Tool, "Write down three worries.");
    let report = engine.review_content(&missing, "US");
    assert!(!report.can_deploy);
    assert!(!ServingPolicy::strict().disposition(&report).is_served());
    assert!(ServingPolicy::lenient().disposition(&report).is_served());

    let vetoed = compliant_tool("t2");
    let vetoed = ContentItem {
        text: "You'll regret it if you skip this.".to_string(),
        ..vetoed
    };
    let report = engine.review_content(&vetoed, "US");
    assert!(!ServingPolicy::lenient().disposition(&report).is_served());
}

#[test]
fn unvalidated_negative_cap_still_bounds_telemetry() {
    let mut config = GovernanceConfig::default();
    config.analytics.max_delta_per_signal = -1.0;
    let engine = engine_with(config);

    let score = engine
        .ingest_telemetry(&json!({
            "pain_point_id": "p1", "tool_id": "t1",
            "view_count": 40, "completion_count": 40
        }))
        .unwrap();
    assert_eq!(score, 51.0);
}
