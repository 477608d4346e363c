//! LoopForge pipeline CLI.
//!
//! Thin wrapper around the orchestration core: selects the stage set,
//! forwards pass-through stage options, prints the end-of-run summary, and
//! maps the run outcome to the process exit code.

use anyhow::Context;
use clap::Parser;
use loopforge::config::LoopForgeConfig;
use loopforge::notify::Notifier;
use loopforge::pipeline::{Orchestrator, RetryConfig, RetryPolicy, RunLog, StageRunner};
use loopforge::stages::{ProcessInvoker, StageName};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "loopforge", version, about = "LoopForge pipeline orchestrator")]
struct Cli {
    /// Run all stages of the pipeline
    #[arg(long, conflicts_with = "stage")]
    all: bool,

    /// Run a specific stage (generate, render, process, upload)
    #[arg(long, value_parser = parse_stage)]
    stage: Option<StageName>,

    /// Path to the configuration file
    #[arg(long, default_value = "config/config.json")]
    config: PathBuf,

    /// Topic to generate prompts for
    #[arg(long)]
    topic: Option<String>,

    /// Number of prompts to generate
    #[arg(long)]
    count: Option<u32>,

    /// Rendering engine to use
    #[arg(long)]
    engine: Option<String>,

    /// Custom workflow file for the rendering engine
    #[arg(long)]
    workflow: Option<String>,

    /// Skip adding captions to videos
    #[arg(long)]
    skip_captions: bool,

    /// Add random B-roll to videos
    #[arg(long)]
    b_roll: bool,

    /// Platforms to upload to
    #[arg(long)]
    platform: Vec<String>,

    /// Simulate uploads without actually uploading
    #[arg(long)]
    dry_run: bool,
}

fn parse_stage(value: &str) -> Result<StageName, String> {
    value.parse()
}

/// Builds the per-stage pass-through argument lists from the CLI flags.
fn stage_args(cli: &Cli) -> HashMap<StageName, Vec<String>> {
    let mut map = HashMap::new();

    let mut generate = Vec::new();
    if let Some(topic) = &cli.topic {
        generate.extend(["--topic".to_string(), topic.clone()]);
    }
    if let Some(count) = cli.count {
        generate.extend(["--count".to_string(), count.to_string()]);
    }
    if !generate.is_empty() {
        map.insert(StageName::Generate, generate);
    }

    let mut render = Vec::new();
    if let Some(engine) = &cli.engine {
        render.extend(["--engine".to_string(), engine.clone()]);
    }
    if let Some(workflow) = &cli.workflow {
        render.extend(["--workflow".to_string(), workflow.clone()]);
    }
    if !render.is_empty() {
        map.insert(StageName::Render, render);
    }

    let mut process = Vec::new();
    if cli.skip_captions {
        process.push("--skip-captions".to_string());
    }
    if cli.b_roll {
        process.push("--b-roll".to_string());
    }
    if !process.is_empty() {
        map.insert(StageName::Process, process);
    }

    let mut upload = Vec::new();
    for platform in &cli.platform {
        upload.extend(["--platform".to_string(), platform.clone()]);
    }
    if cli.dry_run {
        upload.push("--dry-run".to_string());
    }
    if !upload.is_empty() {
        map.insert(StageName::Upload, upload);
    }

    map
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let requested: Vec<StageName> = if cli.all {
        StageName::FULL_ORDER.to_vec()
    } else if let Some(stage) = cli.stage {
        vec![stage]
    } else {
        anyhow::bail!("nothing to do: pass --all or --stage <name>");
    };

    let config = Arc::new(
        LoopForgeConfig::from_file(&cli.config)
            .with_context(|| format!("loading configuration from {}", cli.config.display()))?,
    );

    let run_log = RunLog::create(&config.paths.log_dir, Uuid::new_v4())
        .context("creating run log file")?;
    let runner = StageRunner::new(Arc::new(ProcessInvoker::new()), run_log);
    let policy = RetryPolicy::new(runner, RetryConfig::default());
    let notifier = Notifier::from_config(&config.notifications);
    let orchestrator = Orchestrator::new(Arc::clone(&config), policy, notifier);

    let summary = orchestrator
        .run_pipeline_with_args(&requested, &stage_args(&cli))
        .await;

    println!("\n{}", summary.render_table());
    std::process::exit(summary.exit_code);
}
