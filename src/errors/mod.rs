// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Error types
//!
//! Every failure a task can hit carries the task name and enough captured
//! output to tell which step broke and why.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for watermill operations
pub type WatermillResult<T> = Result<T, WatermillError>;

/// Main error type for watermill
#[derive(Error, Debug, Diagnostic)]
pub enum WatermillError {
    // ─────────────────────────────────────────────────────────────────────────
    // Construction Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Task '{task}' has an invalid descriptor: {reason}")]
    #[diagnostic(
        code(watermill::descriptor),
        help("input/output must be a glob, a list of globs, or a mapping of names to globs or lists")
    )]
    Descriptor { task: String, reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Task Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Task '{task}': input pattern '{pattern}' matched no files in {}", .dir.display())]
    #[diagnostic(
        code(watermill::input_resolution),
        help("An upstream task should produce files matching '{pattern}' in this workspace")
    )]
    InputResolution {
        task: String,
        pattern: String,
        dir: PathBuf,
    },

    #[error("Task '{task}' command failed{}", .exit_code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    #[diagnostic(code(watermill::command_execution))]
    CommandExecution {
        task: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        #[help]
        help: Option<String>,
    },

    #[error("Task '{task}': output pattern '{pattern}' matched no files in {} after the command finished", .dir.display())]
    #[diagnostic(
        code(watermill::output_not_found),
        help("The command exited successfully but did not write the files it declares")
    )]
    OutputNotFound {
        task: String,
        pattern: String,
        dir: PathBuf,
    },

    #[error("Workspace directory {} is unusable: {error}", .path.display())]
    #[diagnostic(code(watermill::directory))]
    Directory { path: PathBuf, error: String },

    #[error("Task '{task}' was not started because the run was cancelled")]
    #[diagnostic(code(watermill::cancelled))]
    Cancelled { task: String },

    #[error("A concurrent branch panicked: {message}")]
    #[diagnostic(code(watermill::branch_panicked))]
    BranchPanicked { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Pipeline File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid pipeline definition: {reason}")]
    #[diagnostic(code(watermill::invalid_pipeline))]
    InvalidPipeline {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Pipeline refers to unknown task '{task}'")]
    #[diagnostic(
        code(watermill::unknown_task),
        help("Check that '{task}' is defined under 'tasks'")
    )]
    UnknownTask { task: String },

    #[error("Task '{task}': bad command template: {reason}")]
    #[diagnostic(code(watermill::template))]
    Template { task: String, reason: String },

    #[error("Failed to read file '{}': {error}", .path.display())]
    #[diagnostic(code(watermill::file_read_error))]
    FileRead { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(watermill::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(watermill::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(watermill::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(watermill::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(watermill::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for WatermillError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for WatermillError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for WatermillError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for WatermillError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for WatermillError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl WatermillError {
    /// Short, stable tag for the kind of failure
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Descriptor { .. } => "DescriptorError",
            Self::InputResolution { .. } => "InputResolutionError",
            Self::CommandExecution { .. } => "CommandExecutionError",
            Self::OutputNotFound { .. } => "OutputNotFoundError",
            Self::Directory { .. } => "DirectoryError",
            Self::Cancelled { .. } => "Cancelled",
            Self::BranchPanicked { .. } => "BranchPanicked",
            Self::InvalidPipeline { .. } => "InvalidPipeline",
            Self::UnknownTask { .. } => "UnknownTask",
            Self::Template { .. } => "TemplateError",
            Self::FileRead { .. } => "FileReadError",
            Self::Io { .. } => "IoError",
            Self::Yaml { .. } => "YamlError",
            Self::Json { .. } => "JsonError",
            Self::Toml { .. } => "TomlError",
            Self::GlobPattern { .. } => "GlobPatternError",
        }
    }

    /// Name of the task that failed, if the error belongs to one
    pub fn task(&self) -> Option<&str> {
        match self {
            Self::Descriptor { task, .. }
            | Self::InputResolution { task, .. }
            | Self::CommandExecution { task, .. }
            | Self::OutputNotFound { task, .. }
            | Self::Cancelled { task }
            | Self::Template { task, .. }
            | Self::UnknownTask { task } => Some(task),
            _ => None,
        }
    }

    /// Create a descriptor error
    pub fn descriptor(task: &str, reason: impl Into<String>) -> Self {
        Self::Descriptor {
            task: task.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a command failure from captured process output
    pub fn command_failed(task: &str, exit_code: Option<i32>, stdout: String, stderr: String) -> Self {
        let help = Self::generate_help_for_stderr(&stderr);
        Self::CommandExecution {
            task: task.to_string(),
            exit_code,
            stdout,
            stderr,
            help,
        }
    }

    /// Create a directory error
    pub fn directory(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::Directory {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Captured stderr for command failures
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::CommandExecution { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    fn generate_help_for_stderr(stderr: &str) -> Option<String> {
        if stderr.contains("command not found") || stderr.contains("not found") {
            Some("A tool used by this command is not installed or not on PATH".into())
        } else if stderr.contains("No such file or directory") {
            Some("The command referenced a path that does not exist in the task's directory".into())
        } else if stderr.contains("Permission denied") {
            Some("Check the permissions of the task's working directory".into())
        } else {
            None
        }
    }
}
