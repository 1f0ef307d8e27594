// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Run command - execute the pipeline

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{load_pipeline, OutputFormat, RunOptions};
use crate::executors::Executor;
use crate::pipeline::{NodeResult, PipelineGraph, PipelineValidator, Scheduler};
use crate::utils::{print_section, Mark, ProgressObserver};

/// Run the pipeline
pub async fn run(
    pipeline_path: PathBuf,
    options: RunOptions,
    dry_run: bool,
    format: OutputFormat,
) -> Result<()> {
    let file = load_pipeline(&pipeline_path)?;
    let settings = options.build_settings();

    // Validate pipeline
    let validation = PipelineValidator::validate(&file, &settings);

    if !validation.is_valid() {
        eprintln!("{}", "Pipeline validation failed:".red().bold());
        for error in &validation.errors {
            eprintln!("  {} {}", Mark::Failed.symbol(), error);
        }
        return Err(miette::miette!("Pipeline configuration is invalid"));
    }

    if validation.has_warnings() && options.verbose {
        eprintln!("{}", "Pipeline warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", Mark::Warning.symbol(), warning);
        }
        eprintln!();
    }

    let root = file.build(&settings)?;
    let workspace = options.workspace_for(&file);

    if dry_run {
        println!("{} {}", "Dry run:".bold(), file.name);
        println!("  Workspace: {}", workspace.display());
        println!();
        print!("{}", PipelineGraph::build(&root).to_text());
        return Ok(());
    }

    let executor = options.executor_for(&file);
    if !executor.check_available().await? {
        return Err(miette::miette!(
            "Shell '{}' is not installed or not on PATH",
            executor.shell()
        ));
    }

    let mut scheduler = Scheduler::new(Arc::new(executor));
    if format == OutputFormat::Text {
        scheduler = scheduler.with_observer(Arc::new(ProgressObserver::new(options.verbose)));
    }

    // Ctrl-C stops new tasks from launching; running ones finish
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, waiting for running tasks");
            on_signal.cancel();
        }
    });

    let outcome = scheduler
        .run_with_cancellation(&root, &workspace, cancel)
        .await;
    signal.abort();

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            eprintln!();
            eprintln!("{}", format!("Pipeline '{}' failed:", file.name).red().bold());
            if let Some(stderr) = e.stderr().filter(|s| !s.trim().is_empty()) {
                eprintln!("{}", stderr.trim_end().dimmed());
            }
            return Err(e.into());
        }
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)
                .map_err(|e| miette::miette!("Failed to serialize result: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            print_section("Result");
            print_result(&result, 1);

            let outputs = result.outputs();
            if !outputs.is_empty() {
                print_section("Outputs");
                for output in outputs {
                    println!("  - {}", output.display());
                }
            }
        }
    }

    Ok(())
}

fn print_result(result: &NodeResult, depth: usize) {
    let indent = "  ".repeat(depth);

    match result {
        NodeResult::Task(task) => {
            println!(
                "{}{} {} {}",
                indent,
                Mark::Ok.symbol(),
                task.name,
                format!("({:.2?})", task.duration).dimmed()
            );
        }
        NodeResult::Fork(branches) | NodeResult::Junction(branches) => {
            let label = if matches!(result, NodeResult::Fork(_)) { "fork" } else { "junction" };
            println!("{}{}", indent, label.cyan());
            for branch in branches {
                print_result(branch, depth + 1);
            }
        }
    }
}

