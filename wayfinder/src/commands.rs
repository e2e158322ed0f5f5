//! Operator subcommands.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context};
use clap::Subcommand;
use ethics::{EvaluationContext, UxPatternDescriptor};
use governance::{AuditQuery, AuditStore, ContentItem, GovernanceEngine, JsonlAuditStore, ServingMode, ServingPolicy, Subsystem};
use serde::Serialize;
use tracing::info;

/// Wayfinder subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the ethics veto over text
    Evaluate {
        /// Text to evaluate
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,
        /// Read the text from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Content id recorded with the veto
        #[arg(long)]
        id: Option<String>,
    },

    /// Run the ethics veto over a UX-pattern descriptor (YAML or JSON)
    Ux {
        /// Descriptor file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Check content items against a region and apply a serving policy
    Check {
        /// Content file: one item or a list (YAML or JSON)
        #[arg(short, long)]
        content: PathBuf,
        /// Region code (defaults to the active region)
        #[arg(short, long)]
        region: Option<String>,
        /// Serving mode (strict, lenient)
        #[arg(short, long, default_value = "strict")]
        mode: String,
    },

    /// Rank tools for a pain point
    Route {
        /// Pain point id
        #[arg(short, long)]
        pain_point: String,
        /// Content items to review for the active region first
        #[arg(short, long)]
        content: Option<PathBuf>,
    },

    /// Validate a telemetry event against the analytics firewall
    ValidateEvent {
        /// Event name
        #[arg(short, long)]
        name: String,
        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Show persisted audit entries
    Audit {
        /// Filter by subsystem (weights, ethics, compliance, analytics, routing)
        #[arg(short, long)]
        subsystem: Option<String>,
        /// Filter by subject key
        #[arg(long)]
        subject: Option<String>,
        /// Show at most this many entries (newest last)
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show the rule set in use
    Rules,
}

/// Run a command. Returns `false` when the input was vetoed or blocked.
pub async fn execute(engine: &GovernanceEngine, command: Command) -> anyhow::Result<bool> {
    match command {
        Command::Evaluate { text, file, id } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => bail!("either --text or --file is required"),
            };
            let context = id.map(EvaluationContext::for_content).unwrap_or_default();
            let result = engine.evaluate_text(&text, &context);
            print_json(&result)?;
            Ok(result.allowed)
        }

        Command::Ux { file } => {
            let descriptor: UxPatternDescriptor = read_structured(&file)?;
            let result = engine.evaluate_ux_pattern(&descriptor);
            print_json(&result)?;
            Ok(result.allowed)
        }

        Command::Check { content, region, mode } => {
            let mode = ServingMode::from_str(&mode).map_err(anyhow::Error::msg)?;
            let policy = ServingPolicy { mode };
            let region = region.unwrap_or_else(|| engine.config().routing.active_region.clone());

            let mut all_served = true;
            for item in read_content(&content)? {
                let report = engine.review_content(&item, &region);
                let disposition = policy.disposition(&report);
                all_served &= disposition.is_served();
                print_json(&serde_json::json!({
                    "report": report,
                    "disposition": disposition,
                }))?;
            }
            Ok(all_served)
        }

        Command::Route { pain_point, content } => {
            if let Some(path) = content {
                let region = engine.config().routing.active_region.clone();
                let items = read_content(&path)?;
                let deployable = items
                    .iter()
                    .filter(|item| engine.review_content(item, &region).can_deploy)
                    .count();
                info!(reviewed = items.len(), deployable, region = %region, "Content reviewed");
            }
            let result = engine.route(&pain_point);
            print_json(&result)?;
            Ok(true)
        }

        Command::ValidateEvent { name, params } => {
            let params: serde_json::Value =
                serde_json::from_str(&params).context("--params must be a JSON object")?;
            let verdict = engine.record_event(&name, &params);
            print_json(&verdict)?;
            Ok(verdict.allowed)
        }

        Command::Audit {
            subsystem,
            subject,
            limit,
        } => {
            let Some(path) = engine.config().persistence.audit_path.as_deref() else {
                bail!("persistence.audit_path is not configured");
            };
            let entries = JsonlAuditStore::new(path).load_all().await?;
            let mut query = AuditQuery::default();
            if let Some(subsystem) = subsystem {
                query = query.subsystem(Subsystem::from_str(&subsystem).map_err(anyhow::Error::msg)?);
            }
            if let Some(subject) = subject {
                query = query.subject(subject);
            }

            let log = governance::AuditLog::new();
            log.restore(entries);
            let found = log.query(&query);
            let skip = found.len().saturating_sub(limit);
            print_json(&found[skip..])?;
            Ok(true)
        }

        Command::Rules => {
            let rules = engine.guard().rules();
            print_json(&serde_json::json!({
                "version": rules.version(),
                "fingerprint": rules.fingerprint(),
                "rules": rules.rules().len(),
            }))?;
            Ok(true)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Read YAML or JSON by extension.
fn read_structured<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&contents)?,
        _ => serde_yaml::from_str(&contents)?,
    };
    Ok(value)
}

/// One content item or a list of them.
fn read_content(path: &Path) -> anyhow::Result<Vec<ContentItem>> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<ContentItem>),
        One(ContentItem),
    }

    Ok(match read_structured::<OneOrMany>(path)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
    })
}
