// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Validate command - check pipeline configuration

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::RunOptions;
use crate::executors::Executor;
use crate::pipeline::{PipelineFile, PipelineValidator};
use crate::utils::{print_mark, print_section, Mark};

/// Run the validate command
pub async fn run(pipeline_path: PathBuf, options: RunOptions) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    // Check pipeline exists
    if !pipeline_path.exists() {
        return Err(miette::miette!(
            "Pipeline file not found: {}",
            pipeline_path.display()
        ));
    }

    // Load pipeline
    let file = match PipelineFile::from_file(&pipeline_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("  {} Failed to parse pipeline", Mark::Failed.symbol());
            eprintln!();
            return Err(miette::miette!("Parse error: {}", e));
        }
    };

    print_mark(Mark::Ok, "Pipeline file parsed");

    let settings = options.build_settings();
    let validation = PipelineValidator::validate(&file, &settings);

    let executor = options.executor_for(&file);
    let shell_available = executor.check_available().await.unwrap_or(false);

    // Report results
    if !validation.errors.is_empty() {
        print_section("Errors");
        for error in &validation.errors {
            print_mark(Mark::Failed, error);
        }
    }

    if !shell_available {
        print_section("Missing tools");
        print_mark(Mark::Failed, &format!("shell '{}' not found on PATH", executor.shell()));
    }

    if !validation.warnings.is_empty() {
        print_section("Warnings");
        for warning in &validation.warnings {
            print_mark(Mark::Warning, warning);
        }
    }

    if options.verbose {
        print_section("Pipeline summary");
        println!("  Name: {}", file.name);
        println!("  Tasks: {}", file.tasks.len());
        for (id, task) in &file.tasks {
            let label = task
                .name
                .as_deref()
                .filter(|n| *n != id)
                .map(|n| format!(" ({})", n))
                .unwrap_or_default();
            println!("    - {}{} {}", id, label, task.command.dimmed());
        }
    }

    println!();

    if !validation.is_valid() || !shell_available {
        Err(miette::miette!("Pipeline validation failed"))
    } else if validation.has_warnings() {
        println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
        Ok(())
    } else {
        println!("{}", "Pipeline is valid!".green().bold());
        Ok(())
    }
}
