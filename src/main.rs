#![allow(dead_code)]

mod cli;
mod application;
mod domain;
mod data;
mod retrieval;
mod infra;

use anyhow::Result;
use cli::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("evidence_qa={level}").parse()?),
        )
        .init();

    cli.run().await
}
