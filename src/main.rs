// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! watermill - Composable Task Pipelines
//!
//! Run shell-command pipelines described in YAML, JSON or TOML files.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use watermill::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    watermill::utils::init_colors();

    let default_filter = if cli.verbose { "watermill=debug" } else { "watermill=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    let options = cli.run_options();

    match cli.command {
        Commands::Run {
            pipeline,
            dry_run,
            format,
        } => watermill::cli::run::run(pipeline, options, dry_run, format).await,
        Commands::Validate { pipeline } => watermill::cli::validate::run(pipeline, options).await,
        Commands::Graph { pipeline, format } => {
            watermill::cli::graph::run(pipeline, options, format).await
        }
    }
}
