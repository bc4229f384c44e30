// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `ask`      — run the evidence pipeline for a question
//   2. `discover` — list the papers discovery would use
//   3. `config`   — print the effective run configuration
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

mod render;

use anyhow::Result;
use clap::Parser;
use commands::{AskArgs, Commands, ConfigArgs, DiscoverArgs};
use std::time::Duration;

use crate::domain::error::PipelineError;

/// The main CLI struct. The Parser derive generates the argument
/// parsing code from its fields.
#[derive(Parser, Debug)]
#[command(
    name = "evidence-qa",
    version,
    about = "Answer research questions from papers, with the evidence that supports each answer."
)]
pub struct Cli {
    /// Log debug detail (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// The CLI layer only routes and prints.
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Ask(args)      => run_ask(args).await,
            Commands::Discover(args) => run_discover(args).await,
            Commands::Config(args)   => run_config(args),
        }
    }
}

/// Handles the `ask` subcommand.
async fn run_ask(args: AskArgs) -> Result<()> {
    use crate::application::ask_use_case::{AskOptions, AskUseCase};

    let config  = args.run.resolve()?;
    let options = AskOptions {
        corpus_dir: args.corpus_dir,
        cache_dir:  args.cache_dir,
        llm:        args.llm.into(),
    };
    let use_case = AskUseCase::new(config, options)?;

    match use_case.answer(&args.question).await {
        Ok(report) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report.state)?);
            } else {
                println!("\n{}", report.state.final_answer);
                println!("\nEvidence trail:\n{}", render::evidence_trail(&report.state));
            }
            if args.trace {
                println!("\nStages:\n{}", render::trace(&report.trace));
            }
            Ok(())
        }
        Err(err) => {
            // Show what was gathered before the run was halted, then fail
            let PipelineError::BudgetExceeded { ref state, .. } = err;
            if args.json {
                println!("{}", serde_json::to_string_pretty(state.as_ref())?);
            } else {
                println!("\nRun halted before an answer was written.");
                println!("\nEvidence trail:\n{}", render::evidence_trail(state));
            }
            Err(err.into())
        }
    }
}

/// Handles the `discover` subcommand.
async fn run_discover(args: DiscoverArgs) -> Result<()> {
    use crate::application::discover_use_case::DiscoverUseCase;

    let timeout  = Duration::from_secs(args.fetch_timeout_secs);
    let use_case = DiscoverUseCase::new(args.corpus_dir.as_deref(), timeout)?;
    let papers   = use_case.discover(&args.query, args.max_results).await?;

    println!("{}", render::papers(&papers));
    Ok(())
}

/// Handles the `config` subcommand.
fn run_config(args: ConfigArgs) -> Result<()> {
    let config = args.run.resolve()?;
    if let Some(path) = &args.save {
        crate::infra::config_store::save(path, &config)?;
        tracing::info!("Run config written to '{}'", path.display());
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
