// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Shell executor
//!
//! Executes command strings through a shell.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

use super::{Executor, ProcessOutput};
use crate::errors::WatermillError;

/// Shell executor
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    /// Shell binary, invoked as `<shell> -c <command>`
    shell: String,

    /// Extra environment for every command
    env: HashMap<String, String>,
}

impl ShellExecutor {
    /// Create a new shell executor using `sh`
    pub fn new() -> Self {
        Self::with_shell("sh")
    }

    /// Create a shell executor using a specific shell
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            env: HashMap::new(),
        }
    }

    /// Set environment variables passed to every command
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for ShellExecutor {
    async fn run(&self, command: &str, working_dir: &Path) -> Result<ProcessOutput, WatermillError> {
        let start = Instant::now();
        debug!(shell = %self.shell, dir = %working_dir.display(), "spawning: {}", command);

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command);
        cmd.current_dir(working_dir);
        cmd.envs(&self.env);

        let output = cmd.output().await.map_err(|e| WatermillError::Io {
            message: format!("Failed to spawn shell '{}': {}", self.shell, e),
        })?;

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration: start.elapsed(),
        })
    }

    async fn check_available(&self) -> Result<bool, WatermillError> {
        Ok(which::which(&self.shell).is_ok())
    }
}
