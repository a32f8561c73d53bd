//! `forge` - run the generation pipeline locally
//!
//! Drives the in-memory engine with answers read from a fixture directory
//! and prints every event a live session would receive, one JSON object
//! per line on stdout. Logs go to stderr.

mod fixtures;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use fixtures::FixtureGateway;
use forge_core::{
    ArtifactStore, ForgeConfig, MemoryStore, NewProject, ProjectId, SubscriptionTier, Tenant,
};
use forge_pipeline::{
    OutboundEvent, Pipeline, PipelineContext, RunHandle, RunOutcome, Session, SessionRegistry,
};
use forge_quota::MemoryLedger;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "forge", version, about = "Forge generation pipeline runner")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze a product idea into features and screens
    Analyze(AnalyzeArgs),
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    /// Product idea
    #[arg(long)]
    description: String,

    /// Directory holding analysis.json and wireframe fixtures
    #[arg(long)]
    fixtures: PathBuf,

    /// Subscription tier of the caller
    #[arg(long, default_value = "free")]
    tier: SubscriptionTier,

    /// Tenant identifier
    #[arg(long, default_value = "local")]
    tenant: String,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Generate wireframes for every screen after analysis
    #[arg(long)]
    wireframes: bool,
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    match cli.command {
        Command::Analyze(args) => analyze(args).await,
    }
}

async fn analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => ForgeConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ForgeConfig::default(),
    };
    let gateway = Arc::new(FixtureGateway::open(&args.fixtures)?);

    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    let registry = Arc::new(SessionRegistry::new());
    let pipeline = Pipeline::new(PipelineContext::new(
        store.clone(),
        gateway,
        ledger.clone(),
        registry.clone(),
        config,
    ));

    let tenant = Tenant::new(args.tenant.clone(), args.tier);
    let session = registry.connect(tenant.id.clone());
    let session_id = session.id;
    let printer = tokio::spawn(print_events(session));

    let project = store
        .create_project(NewProject::new(tenant.id.clone(), args.description.clone()))
        .await
        .context("creating project")?;
    tracing::info!(project_id = %project.id, tier = %tenant.tier.as_str(), "project created");

    let result = drive(&pipeline, &tenant, project.id, &args).await;

    registry.disconnect(&tenant.id, session_id);
    printer.await.context("event printer stopped")??;

    let usage = ledger.snapshot(&tenant.id);
    tracing::info!(
        tokens = usage.monthly_tokens,
        requests = usage.daily_requests,
        "usage recorded"
    );
    result
}

async fn drive(
    pipeline: &Pipeline,
    tenant: &Tenant,
    project_id: ProjectId,
    args: &AnalyzeArgs,
) -> anyhow::Result<()> {
    let handle = pipeline
        .start_analysis(tenant, project_id, args.description.clone())
        .await
        .context("analysis rejected")?;
    finish(handle).await?;

    if args.wireframes {
        let start = pipeline
            .start_wireframe_generation(tenant, project_id)
            .await
            .context("wireframe generation rejected")?;
        tracing::info!(screens = start.screen_count, "generating wireframes");
        finish(start.handle).await?;
    }

    let relations = pipeline.project(tenant, project_id).await?;
    tracing::info!(
        project_id = %project_id,
        name = %relations.project.name,
        status = %relations.project.status,
        features = relations.features.len(),
        screens = relations.screens.len(),
        "done"
    );
    Ok(())
}

async fn finish(handle: RunHandle) -> anyhow::Result<()> {
    let kind = handle.kind();
    match handle.wait().await {
        RunOutcome::Completed => Ok(()),
        RunOutcome::Failed { category } => anyhow::bail!("{kind} run failed ({category})"),
    }
}

async fn print_events(mut session: Session) -> anyhow::Result<()> {
    while let Some(event) = session.recv().await {
        write_event(&event)?;
    }
    Ok(())
}

fn write_event(event: &OutboundEvent) -> anyhow::Result<()> {
    let line = serde_json::to_string(event)?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "{line}")?;
    Ok(())
}
