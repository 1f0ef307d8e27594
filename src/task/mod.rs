// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Tasks
//!
//! A task is the leaf unit of work: declared input/output globs, free-form
//! parameters, and a function turning a resolved context into a command.

mod command;
mod context;

pub use command::{Command, IntoCommand};
pub use context::{Context, Params};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::errors::WatermillError;
use crate::executors::Executor;
use crate::pipeline::Node;
use crate::workspace::{self, Patterns, Resolved, Resolver};

/// Declarative part of a task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Display label
    pub name: String,

    /// Parameters passed through to the command function
    #[serde(default)]
    pub params: Params,

    /// Files the task needs; `None` makes it a root producer
    #[serde(default)]
    pub input: Option<Patterns>,

    /// Files the task promises to leave behind
    #[serde(default)]
    pub output: Option<Patterns>,

    /// Working directory override, relative to the inherited workspace
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl TaskDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn input(mut self, patterns: impl Into<Patterns>) -> Self {
        self.input = Some(patterns.into());
        self
    }

    pub fn output(mut self, patterns: impl Into<Patterns>) -> Self {
        self.output = Some(patterns.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params.extend(params);
        self
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Check the descriptor is well formed
    pub fn validate(&self) -> Result<(), WatermillError> {
        if self.name.trim().is_empty() {
            return Err(WatermillError::descriptor("<unnamed>", "task name is empty"));
        }

        if let Some(ref input) = self.input {
            input
                .check()
                .map_err(|reason| WatermillError::descriptor(&self.name, format!("input: {}", reason)))?;
        }

        if let Some(ref output) = self.output {
            output
                .check()
                .map_err(|reason| WatermillError::descriptor(&self.name, format!("output: {}", reason)))?;
        }

        if matches!(self.dir, Some(ref d) if d.as_os_str().is_empty()) {
            return Err(WatermillError::descriptor(&self.name, "dir override is empty"));
        }

        Ok(())
    }
}

type CommandFn = dyn Fn(&Context) -> Result<Command, String> + Send + Sync;

/// A validated task ready to be placed in a pipeline
#[derive(Clone)]
pub struct Task {
    descriptor: TaskDescriptor,
    command_fn: Arc<CommandFn>,
}

impl Task {
    /// Validate a descriptor and pair it with its command function
    pub fn new<F, R>(descriptor: TaskDescriptor, command_fn: F) -> Result<Self, WatermillError>
    where
        F: Fn(&Context) -> R + Send + Sync + 'static,
        R: IntoCommand,
    {
        descriptor.validate()?;

        Ok(Self {
            descriptor,
            command_fn: Arc::new(move |ctx: &Context| command_fn(ctx).into_command()),
        })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &TaskDescriptor {
        &self.descriptor
    }

    /// Run the task once in `workspace`
    ///
    /// Resolves input, builds the context, runs the command, then verifies
    /// the declared output exists.
    pub async fn run(
        &self,
        workspace: &Path,
        resolver: &Resolver,
        executor: &dyn Executor,
    ) -> Result<TaskResult, WatermillError> {
        let start = Instant::now();
        let name = self.name();

        let dir = match self.descriptor.dir {
            Some(ref dir) => workspace::ensure_dir(workspace, dir).await?,
            None => workspace.to_path_buf(),
        };

        let input = match self.descriptor.input {
            Some(ref patterns) => Some(resolver.resolve(name, patterns, &dir).await?),
            None => None,
        };

        let context = Context {
            name: name.to_string(),
            input: input.clone(),
            output: self.descriptor.output.clone(),
            params: self.descriptor.params.clone(),
            dir: dir.clone(),
        };

        let command = (self.command_fn)(&context)
            .map_err(|reason| WatermillError::command_failed(name, None, String::new(), reason))?;

        let process = match command {
            Command::Shell(cmd) => {
                info!(task = %name, "$ {}", cmd);
                let process = executor
                    .run(&cmd, &dir)
                    .await
                    .map_err(|e| WatermillError::command_failed(name, None, String::new(), e.to_string()))?;
                if !process.success() {
                    return Err(WatermillError::command_failed(
                        name,
                        process.exit_code,
                        process.stdout,
                        process.stderr,
                    ));
                }
                process
            }
            Command::Action(action) => {
                debug!(task = %name, "running action");
                executor.run_action(name, action).await?
            }
        };

        let output = match self.descriptor.output {
            Some(ref patterns) => Some(resolver.verify(name, patterns, &dir).await?),
            None => None,
        };

        Ok(TaskResult {
            name: name.to_string(),
            dir,
            input,
            output,
            stdout: process.stdout,
            stderr: process.stderr,
            exit_code: process.exit_code,
            duration: start.elapsed(),
        })
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Outcome of one successful task run
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub name: String,
    pub dir: PathBuf,
    pub input: Option<Resolved>,
    pub output: Option<Resolved>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    #[serde(serialize_with = "serialize_duration")]
    pub duration: Duration,
}

fn serialize_duration<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Build a task node, failing fast on a malformed descriptor
pub fn task<F, R>(descriptor: TaskDescriptor, command_fn: F) -> Result<Node, WatermillError>
where
    F: Fn(&Context) -> R + Send + Sync + 'static,
    R: IntoCommand,
{
    Task::new(descriptor, command_fn).map(Node::from)
}
