// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cmt` — keep CMake build models in sync and build source trees in
//! dependency order.

mod color;
mod commands;
mod exit_error;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{build, configure, model, plan};
use exit_error::ExitError;

#[derive(Parser)]
#[command(
    name = "cmt",
    version = concat!(env!("CARGO_PKG_VERSION"), "+", env!("CMT_GIT_HASH")),
    about = "CMake build model sync and ordering",
    styles = color::styles()
)]
struct Cli {
    /// Path to the workspace config (default: ./cmt.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the layered build order for a project
    Plan(plan::PlanArgs),
    /// Configure a project and refresh its code model
    Configure(configure::ConfigureArgs),
    /// Build a project and everything it depends on
    Build(build::BuildArgs),
    /// Print a project's code model
    Model(model::ModelArgs),
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("CMT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = commands::load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Plan(args) => plan::handle(&config, args),
        Commands::Configure(args) => configure::handle(&config, args).await,
        Commands::Build(args) => build::handle(&config, args).await,
        Commands::Model(args) => model::handle(&config, args).await,
    }
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        match err.downcast_ref::<ExitError>() {
            Some(exit) => {
                eprintln!("error: {}", exit);
                std::process::exit(exit.code);
            }
            None => {
                eprintln!("error: {:#}", err);
                std::process::exit(1);
            }
        }
    }
}
