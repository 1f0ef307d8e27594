// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for watermill.

pub mod graph;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand, ValueEnum};
use miette::Result;
use std::path::{Path, PathBuf};

use crate::executors::ShellExecutor;
use crate::pipeline::{BuildSettings, PipelineFile};

/// Default pipeline file name
pub const DEFAULT_PIPELINE: &str = "watermill.yaml";

/// Composable task pipeline runner
///
/// Run shell-command tasks composed with join, fork and junction.
#[derive(Parser, Debug)]
#[clap(
    name = "watermill",
    version,
    about = "Run shell-command pipelines composed with join, fork and junction",
    long_about = None,
    after_help = "Examples:\n\
        watermill run                          Run watermill.yaml in the current directory\n\
        watermill run -p mappers.yaml -t 8     Run with params.threads = 8\n\
        watermill validate mappers.yaml        Check a pipeline without running it\n\
        watermill graph -f mermaid             Print the task graph\n\n\
        See 'watermill <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Thread count passed to tasks as params.threads
    #[clap(short, long, global = true, env = "WATERMILL_THREADS", default_value_t = 2)]
    pub threads: usize,

    /// Initial workspace directory (overrides the pipeline file)
    #[clap(short, long, global = true, env = "WATERMILL_WORKSPACE", value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Shell used to run commands (overrides the pipeline file)
    #[clap(long, global = true)]
    pub shell: Option<String>,
}

impl Cli {
    /// Options shared by every subcommand
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            threads: self.threads,
            workspace: self.workspace.clone(),
            shell: self.shell.clone(),
            verbose: self.verbose,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline
    Run {
        /// Pipeline file
        #[clap(short, long, default_value = DEFAULT_PIPELINE)]
        pipeline: PathBuf,

        /// Dry run (show what would be done)
        #[clap(long)]
        dry_run: bool,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Validate pipeline configuration
    Validate {
        /// Pipeline file to validate
        #[clap(default_value = DEFAULT_PIPELINE)]
        pipeline: PathBuf,
    },

    /// Show pipeline as a graph
    Graph {
        /// Pipeline file
        #[clap(default_value = DEFAULT_PIPELINE)]
        pipeline: PathBuf,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
    },
}

/// Settings resolved from flags and environment
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub threads: usize,
    pub workspace: Option<PathBuf>,
    pub shell: Option<String>,
    pub verbose: bool,
}

impl RunOptions {
    pub fn build_settings(&self) -> BuildSettings {
        BuildSettings {
            threads: self.threads,
        }
    }

    /// Initial workspace: flag first, then the pipeline file, then `.`
    pub fn workspace_for(&self, file: &PipelineFile) -> PathBuf {
        self.workspace
            .clone()
            .or_else(|| file.workspace.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Shell executor configured from the pipeline file and flags
    pub fn executor_for(&self, file: &PipelineFile) -> ShellExecutor {
        let executor = match self.shell.as_ref().or(file.shell.as_ref()) {
            Some(shell) => ShellExecutor::with_shell(shell.clone()),
            None => ShellExecutor::new(),
        };
        executor.with_env(file.env.clone())
    }
}

/// Load a pipeline file, with a hint when it is missing
pub fn load_pipeline(path: &Path) -> Result<PipelineFile> {
    if !path.exists() {
        return Err(miette::miette!(
            "Pipeline file not found: {}\n\n\
             Pass a file with '-p <FILE>' or create {}.",
            path.display(),
            DEFAULT_PIPELINE
        ));
    }

    PipelineFile::from_file(path).map_err(|e| miette::miette!("Failed to load pipeline: {}", e))
}

/// Output format for the run command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "watermill", "run", "-p", "mappers.yaml", "--threads", "8", "--format", "json",
        ])
        .unwrap();

        assert_eq!(cli.threads, 8);
        match cli.command {
            Commands::Run {
                pipeline, format, dry_run,
            } => {
                assert_eq!(pipeline, PathBuf::from("mappers.yaml"));
                assert_eq!(format, OutputFormat::Json);
                assert!(!dry_run);
            }
            other => panic!("Expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_workspace_precedence() {
        let file = PipelineFile::from_yaml(
            "name: p\nworkspace: from-file\ntasks:\n  a: { command: 'true' }\npipeline: a\n",
        )
        .unwrap();

        let flagged = RunOptions {
            workspace: Some(PathBuf::from("from-flag")),
            ..Default::default()
        };
        assert_eq!(flagged.workspace_for(&file), PathBuf::from("from-flag"));
        assert_eq!(RunOptions::default().workspace_for(&file), PathBuf::from("from-file"));
    }

    #[test]
    fn test_shell_flag_overrides_file() {
        let file = PipelineFile::from_yaml(
            "name: p\nshell: bash\ntasks:\n  a: { command: 'true' }\npipeline: a\n",
        )
        .unwrap();

        assert_eq!(RunOptions::default().executor_for(&file).shell(), "bash");
        let flagged = RunOptions {
            shell: Some("zsh".into()),
            ..Default::default()
        };
        assert_eq!(flagged.executor_for(&file).shell(), "zsh");
    }
}
