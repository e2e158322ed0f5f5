//! wayfinder: operator CLI for the bounded routing and governance engine
//!
//! Runs one governance operation against a catalog and region set and
//! prints the result as JSON. Exits non-zero when the input is vetoed,
//! blocked, or rejected, so it can gate content in CI.

mod commands;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use governance::{
    open_persistent_log, AuditLog, Catalog, GovernanceConfig, GovernanceEngine, JsonWeightStore, JsonlAuditStore,
    RegionCatalog, RetryPolicy,
};

#[derive(Parser)]
#[command(name = "wayfinder")]
#[command(about = "Bounded adaptive routing and governance engine")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "wayfinder.yaml", env = "WAYFINDER_CONFIG")]
    config: String,

    /// Active region (overrides config file)
    #[arg(long, env = "WAYFINDER_REGION")]
    region: Option<String>,

    /// Pain point and tool catalog (YAML or JSON)
    #[arg(long, env = "WAYFINDER_CATALOG")]
    catalog: Option<String>,

    /// Region profiles replacing the built-in set (YAML)
    #[arg(long)]
    regions: Option<String>,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = if Path::new(&cli.config).exists() {
        GovernanceConfig::from_file(&cli.config).with_context(|| format!("loading {}", cli.config))?
    } else {
        GovernanceConfig::default()
    };
    if let Some(region) = cli.region.clone() {
        config.routing.active_region = region;
    }

    init_tracing(&config.general.log_level)?;
    if !Path::new(&cli.config).exists() {
        info!(path = %cli.config, "Config file not found, using defaults");
    }

    let catalog = match &cli.catalog {
        Some(path) => Catalog::from_file(path).with_context(|| format!("loading catalog {}", path))?,
        None => {
            info!("No catalog given; routing will always fall back");
            Catalog::default()
        }
    };
    let regions = match &cli.regions {
        Some(path) => RegionCatalog::from_file(path).with_context(|| format!("loading regions {}", path))?,
        None => RegionCatalog::builtin(),
    };

    // Persisted history is restored first; new entries are forwarded in the background
    let (audit, forwarder) = match config.persistence.audit_path.clone() {
        Some(path) => {
            let store = Arc::new(JsonlAuditStore::new(&path));
            let (log, handle) = open_persistent_log(store, RetryPolicy::from(&config.persistence))
                .await
                .with_context(|| format!("loading audit history {}", path))?;
            (Arc::new(log), Some(handle))
        }
        None => (Arc::new(AuditLog::new()), None),
    };

    let weights_store = config.persistence.weights_path.clone().map(JsonWeightStore::new);
    let engine = GovernanceEngine::from_config(config, catalog, regions, audit)?;

    if let Some(store) = &weights_store {
        let loaded = engine.load_weights(store).await?;
        info!(entries = loaded, "Weights loaded");
    }

    info!(
        region = %engine.config().routing.active_region,
        rules = %engine.guard().rules().version(),
        "Wayfinder ready"
    );

    let outcome = commands::execute(&engine, cli.command).await;

    if let Some(store) = &weights_store {
        if let Err(e) = engine.save_weights(store).await {
            error!(error = %e, "Failed to save weights");
        }
    }

    // Dropping the engine closes the audit channel so the forwarder drains
    drop(engine);
    if let Some(handle) = forwarder {
        let report = handle.await?;
        if report.failed() > 0 {
            error!(failed = report.failed(), "Audit entries were not persisted; writing them to stderr");
            for entry in &report.unpersisted {
                eprintln!("{}", serde_json::to_string(entry)?);
            }
        }
    }

    if !outcome? {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("warn")
            .add_directive(format!("wayfinder={}", level).parse()?)
            .add_directive(format!("governance={}", level).parse()?)
            .add_directive(format!("ethics={}", level).parse()?),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
