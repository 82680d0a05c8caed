//! `steward`: interactive console for the personal assistant.

use anyhow::Context;
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;
use steward_rs::config::{LayeredConfigOptions, StewardConfig};
use steward_rs::setup::{build_llm, build_orchestrator};
use steward_rs::{console, init_logging};
use uuid::Uuid;

/// Command-line options for the console.
#[derive(Parser)]
#[command(name = "steward", version)]
struct Cli {
    /// Extra steward.json5 applied on top of the discovered config layers
    #[arg(long)]
    config: Option<PathBuf>,
    /// Model name override
    #[arg(long)]
    model: Option<String>,
    /// Continue an existing session (created if unknown)
    #[arg(long)]
    session: Option<Uuid>,
    /// Memory document path override
    #[arg(long)]
    memory_path: Option<PathBuf>,
    /// Finish the session's interrupted turn before reading input
    #[arg(long, requires = "session")]
    resume: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<StewardConfig> {
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let mut options = LayeredConfigOptions::new(&cwd);
    if let Some(path) = cli.config.as_ref() {
        info!("adding runtime config layer: {}", path.display());
        options = options.with_runtime_path(path);
    }
    let layered = StewardConfig::load_layered_with_options(options)
        .context("failed to load layered config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());

    let mut config = layered.config;
    if let Some(model) = cli.model.as_ref() {
        config.llm.model = model.clone();
    }
    if let Some(path) = cli.memory_path.as_ref() {
        config.memory.path = Some(path.to_string_lossy().to_string());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    info!(
        "starting console (config_set={}, model_set={}, session_set={}, resume={})",
        cli.config.is_some(),
        cli.model.is_some(),
        cli.session.is_some(),
        cli.resume
    );
    let config = load_config(&cli)?;
    let llm = build_llm(&config.llm)?;
    let orchestrator = build_orchestrator(config, llm, None)?;

    let session_id = match cli.session {
        Some(session_id) => orchestrator.open_session(session_id)?.id,
        None => orchestrator.create_session()?,
    };
    if cli.resume {
        match orchestrator.resume_turn(session_id).await {
            Ok(Some(result)) => println!("Steward: {}", result.response),
            Ok(None) => println!("Nothing to resume in session {session_id}."),
            Err(err) => eprintln!("Error: {err}"),
        }
    }

    console::run(&orchestrator, session_id).await
}
