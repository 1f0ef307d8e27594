// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Process executors
//!
//! Runs a task's generated shell command (or direct action) to completion
//! and reports what happened. No retries, no timeouts.

mod shell;

pub use shell::ShellExecutor;

use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::{Duration, Instant};

use crate::errors::WatermillError;

/// A direct asynchronous action a task can perform instead of a command
pub type ActionFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// Captured result of a finished process
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code, `None` when killed by a signal or for actions
    pub exit_code: Option<i32>,

    /// Standard output
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Wall clock duration
    pub duration: Duration,
}

impl ProcessOutput {
    /// Whether the process exited cleanly
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for command executors
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a shell command in `working_dir`
    ///
    /// A nonzero exit is reported through the returned `ProcessOutput`,
    /// not as an error. Errors mean the process could not be run at all.
    async fn run(&self, command: &str, working_dir: &Path) -> Result<ProcessOutput, WatermillError>;

    /// Drive a direct action to completion
    async fn run_action(&self, task: &str, action: ActionFuture) -> Result<ProcessOutput, WatermillError> {
        let start = Instant::now();
        match action.await {
            Ok(()) => Ok(ProcessOutput {
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
                duration: start.elapsed(),
            }),
            Err(e) => Err(WatermillError::command_failed(task, None, String::new(), format!("{:#}", e))),
        }
    }

    /// Check the executor can run anything at all
    async fn check_available(&self) -> Result<bool, WatermillError>;
}
