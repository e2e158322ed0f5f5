//! Region-aware compliance evaluation.
//!
//! The engine classifies; it never decides whether a blocked item is
//! served anyway. That choice belongs to the caller (see
//! [`boundary`](crate::boundary)).

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ethics::{EthicsGuard, EvaluationContext, RuleCategory, Surface, UxPatternDescriptor, VetoResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::audit::{AuditLog, AuditRecord, Subsystem};
use crate::regions::{normalize_code, Region, RegionCatalog};

pub const EVALUATION_ERROR: &str = "evaluation_error";
pub const UNKNOWN_REGION: &str = "unknown_region";
pub const MISSING_COMMERCE_NOTICE: &str = "missing_commerce_notice";
pub const CONSENT_REQUIRED: &str = "consent_required";
pub const OVERLAY_CHANGES_INTENT: &str = "overlay_changes_intent";

/// Kind of content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Self-help tool
    #[default]
    Tool,
    /// Informational page
    Page,
    /// Anything that sells or links to a purchase
    Commerce,
    /// Push or email notification
    Notification,
}

impl ContentKind {
    fn surface(&self) -> Surface {
        match self {
            Self::Tool => Surface::ToolDescription,
            Self::Page | Self::Commerce => Surface::Page,
            Self::Notification => Surface::Notification,
        }
    }
}

/// How consent for analytics was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ConsentMechanism {
    /// No consent collected
    #[default]
    None,
    /// Consent inferred from continued use
    Implied,
    /// User actively opted in
    ExplicitOptIn,
}

/// A piece of canonical content to check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ContentItem {
    /// Unique content ID
    pub id: String,
    /// What kind of content this is
    #[serde(default)]
    pub kind: ContentKind,
    /// Canonical text
    pub text: String,
    /// Disclaimer ids shown with the content
    #[serde(default)]
    pub disclaimers: Vec<String>,
    /// Notice shown with commerce content
    #[serde(default)]
    pub commerce_notice: Option<String>,
    /// Whether the content collects analytics
    #[serde(default)]
    pub collects_analytics: bool,
    /// How analytics consent is obtained
    #[serde(default)]
    pub consent: ConsentMechanism,
    /// Interaction patterns shown with the content
    #[serde(default)]
    pub ux_patterns: Vec<UxPatternDescriptor>,
}

impl ContentItem {
    pub fn new(id: impl Into<String>, kind: ContentKind, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            text: text.into(),
            ..Default::default()
        }
    }

    /// Builder: add a disclaimer id.
    pub fn with_disclaimer(mut self, id: impl Into<String>) -> Self {
        self.disclaimers.push(id.into());
        self
    }

    /// Builder: set the commerce notice.
    pub fn with_commerce_notice(mut self, notice: impl Into<String>) -> Self {
        self.commerce_notice = Some(notice.into());
        self
    }

    /// Builder: mark as collecting analytics under a consent mechanism.
    pub fn with_analytics(mut self, consent: ConsentMechanism) -> Self {
        self.collects_analytics = true;
        self.consent = consent;
        self
    }

    /// Builder: attach a UX pattern.
    pub fn with_ux_pattern(mut self, pattern: UxPatternDescriptor) -> Self {
        self.ux_patterns.push(pattern);
        self
    }
}

/// A blocker or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Finding {
    /// Machine-readable code
    pub code: String,
    /// Explanation for reviewers
    pub message: String,
}

impl Finding {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether no serving policy may relax this blocker.
    pub fn is_hard_veto(&self) -> bool {
        !(self.code.starts_with("missing_disclaimer:")
            || self.code == MISSING_COMMERCE_NOTICE
            || self.code == CONSENT_REQUIRED)
    }
}

/// Result of one (content, region) evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ComplianceReport {
    /// Content that was checked
    pub content_id: String,
    /// Normalized region code
    pub region_code: String,
    /// Whether no blocker was found
    pub can_deploy: bool,
    /// Findings that prevent deployment
    pub blockers: Vec<Finding>,
    /// Findings that do not block
    pub warnings: Vec<Finding>,
    /// Edits that would resolve the findings
    pub required_changes: Vec<String>,
    /// Veto over the canonical text, when it was evaluated
    pub veto: Option<VetoResult>,
    /// Text after the region's tone overlay
    pub rendered_text: Option<String>,
    /// When the report was produced
    #[cfg_attr(feature = "typescript", ts(type = "string"))]
    pub evaluated_at: DateTime<Utc>,
}

impl ComplianceReport {
    fn new(content_id: &str, region_code: &str) -> Self {
        Self {
            content_id: content_id.to_string(),
            region_code: region_code.to_string(),
            can_deploy: false,
            blockers: Vec::new(),
            warnings: Vec::new(),
            required_changes: Vec::new(),
            veto: None,
            rendered_text: None,
            evaluated_at: Utc::now(),
        }
    }

    /// A report that blocks with `evaluation_error`.
    pub fn evaluation_error(content_id: &str, region_code: &str, detail: impl Into<String>) -> Self {
        let mut report = Self::new(content_id, region_code);
        report.block(EVALUATION_ERROR, detail);
        report
    }

    pub fn has_blocker(&self, code: &str) -> bool {
        self.blockers.iter().any(|b| b.code == code)
    }

    pub fn blocker_codes(&self) -> Vec<&str> {
        self.blockers.iter().map(|b| b.code.as_str()).collect()
    }

    fn block(&mut self, code: impl Into<String>, message: impl Into<String>) {
        let finding = Finding::new(code, message);
        if !self.blockers.contains(&finding) {
            self.blockers.push(finding);
        }
        self.can_deploy = false;
    }

    fn warn(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(Finding::new(code, message));
    }

    fn finish(mut self) -> Self {
        self.can_deploy = self.blockers.is_empty();
        self
    }
}

/// Latest report per (content id, region).
#[derive(Debug, Default)]
pub struct ComplianceRegistry {
    reports: DashMap<(String, String), ComplianceReport>,
}

impl ComplianceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a report, returning the one it replaced.
    pub fn record(&self, report: ComplianceReport) -> Option<ComplianceReport> {
        let key = (report.content_id.clone(), report.region_code.clone());
        self.reports.insert(key, report)
    }

    pub fn latest(&self, content_id: &str, region_code: &str) -> Option<ComplianceReport> {
        self.reports
            .get(&(content_id.to_string(), normalize_code(region_code)))
            .map(|r| r.value().clone())
    }

    /// Deployable only with a recorded, passing report.
    pub fn can_deploy(&self, content_id: &str, region_code: &str) -> bool {
        self.reports
            .get(&(content_id.to_string(), normalize_code(region_code)))
            .is_some_and(|r| r.can_deploy)
    }

    /// Every report for one content id, sorted by region.
    pub fn reports_for(&self, content_id: &str) -> Vec<ComplianceReport> {
        let mut reports: Vec<ComplianceReport> = self
            .reports
            .iter()
            .filter(|r| r.key().0 == content_id)
            .map(|r| r.value().clone())
            .collect();
        reports.sort_by(|a, b| a.region_code.cmp(&b.region_code));
        reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

/// Compliance engine.
#[derive(Debug, Clone)]
pub struct ComplianceEngine {
    guard: EthicsGuard,
    regions: Arc<RegionCatalog>,
    registry: Arc<ComplianceRegistry>,
    audit: Arc<AuditLog>,
}

impl ComplianceEngine {
    pub fn new(
        guard: EthicsGuard,
        regions: Arc<RegionCatalog>,
        registry: Arc<ComplianceRegistry>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            guard,
            regions,
            registry,
            audit,
        }
    }

    pub fn registry(&self) -> &Arc<ComplianceRegistry> {
        &self.registry
    }

    pub fn regions(&self) -> &Arc<RegionCatalog> {
        &self.regions
    }

    /// Evaluate, record in the registry and mirror blocks to the audit log.
    pub fn check_compliance(&self, content: &ContentItem, region_code: &str) -> ComplianceReport {
        let report = self.evaluate(content, region_code);
        self.record(&report);
        report
    }

    /// Check untyped content; anything that does not deserialize blocks.
    pub fn check_compliance_value(&self, content: &serde_json::Value, region_code: &str) -> ComplianceReport {
        match serde_json::from_value::<ContentItem>(content.clone()) {
            Ok(item) => self.check_compliance(&item, region_code),
            Err(e) => {
                let content_id = content
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("<unknown>");
                warn!(content_id, error = %e, "Malformed content");
                let report = ComplianceReport::evaluation_error(
                    content_id,
                    &normalize_code(region_code),
                    format!("malformed content: {}", e),
                );
                self.record(&report);
                report
            }
        }
    }

    /// Classify without recording anything.
    ///
    /// A panic anywhere in the evaluation becomes an `evaluation_error`
    /// blocker.
    pub fn evaluate(&self, content: &ContentItem, region_code: &str) -> ComplianceReport {
        let region_code = normalize_code(region_code);
        Self::guarded(&content.id, &region_code, || self.classify(content, &region_code))
    }

    /// Run a classification, converting any panic into a blocking report.
    fn guarded<F>(content_id: &str, region_code: &str, classify: F) -> ComplianceReport
    where
        F: FnOnce() -> ComplianceReport,
    {
        match panic::catch_unwind(AssertUnwindSafe(classify)) {
            Ok(report) => report,
            Err(_) => {
                error!(content_id, region = %region_code, "Compliance evaluation panicked; blocking");
                ComplianceReport::evaluation_error(content_id, region_code, "internal evaluation failure")
            }
        }
    }

    fn classify(&self, content: &ContentItem, region_code: &str) -> ComplianceReport {
        let mut report = ComplianceReport::new(&content.id, region_code);

        if content.id.trim().is_empty() {
            report.block(EVALUATION_ERROR, "content id is empty");
        }

        let region = self.regions.get(region_code);
        if region.is_none() {
            report.block(UNKNOWN_REGION, format!("no profile configured for region '{}'", region_code));
        }

        let context = EvaluationContext::for_content(content.id.clone())
            .with_surface(content.kind.surface())
            .with_region(region_code);
        let veto = self.guard.evaluate(&content.text, &context);
        for category in veto.categories() {
            if category == RuleCategory::EvaluationError {
                report.block(EVALUATION_ERROR, "ethics evaluation failed");
            } else {
                report.block(
                    format!("ethics:{}", category.code()),
                    format!("content vetoed for {}", category),
                );
            }
        }

        for pattern in &content.ux_patterns {
            let ux = self.guard.evaluate_ux_pattern(pattern);
            for category in ux.categories() {
                if category == RuleCategory::EvaluationError {
                    report.block(EVALUATION_ERROR, format!("UX pattern '{}' evaluation failed", pattern.id));
                    continue;
                }
                report.block(
                    format!("ux:{}", category.code()),
                    format!("UX pattern '{}' vetoed for {}", pattern.id, category),
                );
            }
        }

        if let Some(region) = region {
            self.apply_region(&mut report, content, region, &veto);
        }

        report.veto = Some(veto);
        let report = report.finish();
        debug!(
            content_id = %report.content_id,
            region = %report.region_code,
            can_deploy = report.can_deploy,
            blockers = report.blockers.len(),
            warnings = report.warnings.len(),
            "Compliance evaluated"
        );
        report
    }

    fn apply_region(&self, report: &mut ComplianceReport, content: &ContentItem, region: &Region, veto: &VetoResult) {
        let profile = region.profile();

        for disclaimer in profile
            .required_disclaimers
            .iter()
            .filter(|d| d.applies(content.kind))
        {
            if !content.disclaimers.iter().any(|id| id == &disclaimer.id) {
                report.block(
                    format!("missing_disclaimer:{}", disclaimer.id),
                    format!("{} requires disclaimer '{}'", profile.code, disclaimer.id),
                );
                report
                    .required_changes
                    .push(format!("Add disclaimer '{}': {}", disclaimer.id, disclaimer.text));
            }
        }

        if content.kind == ContentKind::Commerce && !commerce_notice_ok(content, &profile.commerce_notice_markers) {
            report.block(
                MISSING_COMMERCE_NOTICE,
                format!("{} requires a commerce notice on commercial content", profile.code),
            );
            let wording = if profile.commerce_notice_markers.is_empty() {
                "a commerce notice".to_string()
            } else {
                format!("a notice mentioning one of: {}", profile.commerce_notice_markers.join(", "))
            };
            report.required_changes.push(format!("Add {}", wording));
        }

        if content.collects_analytics {
            if profile.requires_explicit_consent && content.consent != ConsentMechanism::ExplicitOptIn {
                report.block(
                    CONSENT_REQUIRED,
                    format!("{} requires explicit opt-in before collecting analytics", profile.code),
                );
                report
                    .required_changes
                    .push("Collect explicit opt-in consent before analytics".to_string());
            } else if content.consent == ConsentMechanism::None {
                report.warn("consent_missing", "analytics collected without any consent mechanism");
            }
        }

        // Overlay invariance: the rendered text must veto exactly like the canonical text
        let rendered = region.render(&content.text);
        if rendered != content.text {
            let context = EvaluationContext::for_content(content.id.clone()).with_region(profile.code.clone());
            let rendered_veto = self.guard.evaluate(&rendered, &context);
            if rendered_veto.categories() != veto.categories() {
                report.block(
                    OVERLAY_CHANGES_INTENT,
                    format!("{} tone overlay changes the veto categories of the content", profile.code),
                );
            }
        }

        for message in region.advisories(&rendered) {
            report.warn("tone_advisory", message);
            report.required_changes.push(message.to_string());
        }

        report.rendered_text = Some(rendered);
    }

    fn record(&self, report: &ComplianceReport) {
        let previous = self.registry.record(report.clone());

        if !report.can_deploy {
            let codes = report.blocker_codes();
            self.audit.append(
                AuditRecord::new(Subsystem::Compliance, report.content_id.clone(), "block", codes.join(","))
                    .with_values(
                        json!(previous.as_ref().map(|p| p.can_deploy)),
                        json!({ "region": report.region_code, "blockers": codes }),
                    ),
            );
            warn!(
                content_id = %report.content_id,
                region = %report.region_code,
                blockers = ?codes,
                "Content blocked"
            );
        } else if previous.is_some_and(|p| !p.can_deploy) {
            self.audit.append(
                AuditRecord::new(Subsystem::Compliance, report.content_id.clone(), "deploy", "blockers_resolved")
                    .with_values(json!(false), json!({ "region": report.region_code })),
            );
            info!(content_id = %report.content_id, region = %report.region_code, "Content unblocked");
        }
    }
}

fn commerce_notice_ok(content: &ContentItem, markers: &[String]) -> bool {
    let Some(notice) = content.commerce_notice.as_deref().filter(|n| !n.trim().is_empty()) else {
        return false;
    };
    let notice = notice.to_lowercase();
    markers.is_empty() || markers.iter().any(|m| notice.contains(&m.to_lowercase()))
}
