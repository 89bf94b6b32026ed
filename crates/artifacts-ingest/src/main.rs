//! Artifacts Ingest - registry to store ingestion tool

use std::sync::Arc;

use anyhow::Result;
use artifacts_common::config::Settings;
use artifacts_common::logging::{init_logging, LogConfig, LogLevel};
use artifacts_common::Status;
use artifacts_ingest::{CodeArtifactRegistry, IngestOrchestrator, OrchestratorConfig};
use artifacts_store::{open_store, ArtifactFilter};
use clap::{Parser, Subcommand};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "artifacts-ingest")]
#[command(author, version, about = "Artifact metadata ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import every repository, package and version from the registry
    Run,

    /// Print stored artifacts as JSON
    List {
        /// Status partition to read (repeatable, all statuses when omitted)
        #[arg(short, long = "status")]
        statuses: Vec<Status>,

        /// Namespace substring
        #[arg(short, long, default_value = "")]
        namespace: String,

        /// Package substring
        #[arg(short, long, default_value = "")]
        package: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("artifacts-ingest")
        .build()
        .merge_env()?;

    init_logging(&log_config)?;

    let settings = Settings::load()?;
    let store = open_store(&settings.store).await?;
    info!(backend = ?store.backend(), "Store ready");

    match cli.command {
        Command::Run => {
            settings.require_registry()?;

            let registry = CodeArtifactRegistry::connect(
                settings.registry.region.clone(),
                settings.registry.domain.clone(),
                settings.registry.domain_owner.clone(),
                settings.registry.page_size,
            )
            .await;

            let orchestrator = IngestOrchestrator::new(
                Arc::new(registry),
                store,
                OrchestratorConfig::from_settings(&settings),
            );

            let report = match orchestrator.run().await {
                Ok(report) => report,
                Err(e) => {
                    error!(error = %e, "Ingestion failed");
                    return Err(e.into());
                },
            };

            println!("{}", serde_json::to_string_pretty(&report)?);
            info!("Ingestion complete");
        },
        Command::List {
            statuses,
            namespace,
            package,
        } => {
            let filter = if statuses.is_empty() {
                ArtifactFilter::all_statuses()
            } else {
                ArtifactFilter::new(statuses, "", "")
            }
            .with_namespace(namespace)
            .with_package(package);

            let artifacts = store.list(&filter).await?;
            println!("{}", serde_json::to_string_pretty(&artifacts)?);
        },
    }

    Ok(())
}
