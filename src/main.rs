//! Cadence - Entry Point
//!
//! Interactive shell over an in-memory scene. Each line is one utterance;
//! results are printed with their kind.

use cadence_nl::command::CommandCatalog;
use cadence_nl::core::error::Result;
use cadence_nl::core::types::ProcessingResult;
use cadence_nl::host::MemoryScene;
use cadence_nl::llm::LlmClient;
use cadence_nl::{Pipeline, PipelineConfig};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

/// Cadence - type modeling commands in plain language
#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(about = "Natural-language command shell over an in-memory scene")]
struct Args {
    /// TOML pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// TOML command catalog replacing the built-in one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Session id used for every utterance
    #[arg(long, default_value = "local")]
    session: String,

    /// Process a single utterance and exit
    #[arg(long)]
    once: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cadence_nl=info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let catalog = match &args.catalog {
        Some(path) => CommandCatalog::load_from_toml(path)?,
        None => CommandCatalog::with_defaults(),
    };

    let providers = LlmClient::providers_from_config(&config.providers);
    if providers.is_empty() {
        tracing::warn!("no AI providers available - unclear requests will ask for clarification");
    }

    let scene = MemoryScene::new(config.max_dimension);
    let pipeline = Pipeline::new(config, catalog, Arc::new(scene.clone()), scene.dispatch_table(), providers)?;

    let rt = Runtime::new()?;

    if let Some(text) = &args.once {
        let result = rt.block_on(pipeline.process_utterance(text, &args.session));
        print_result(&result);
        return Ok(());
    }

    println!("\n=== CADENCE ===");
    println!("Describe what to create or change, e.g. \"create a sphere with radius 5 at the origin\"");
    println!("  quit / q        - Exit");
    println!();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "q" {
            break;
        }

        let result = rt.block_on(pipeline.process_utterance(input, &args.session));
        print_result(&result);
    }

    let purged = pipeline.cache().purge_expired();
    tracing::debug!("purged {} expired cache entries", purged);
    println!("Goodbye!");
    Ok(())
}

fn print_result(result: &ProcessingResult) {
    let tag = match result {
        ProcessingResult::Success(_) => "ok",
        ProcessingResult::Warning(_) => "warning",
        ProcessingResult::Partial(_) => "?",
        ProcessingResult::Error(_) => "error",
    };
    for (i, line) in result.message().lines().enumerate() {
        if i == 0 {
            println!("[{}] {}", tag, line);
        } else {
            println!("    {}", line);
        }
    }
}
