// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! What a task's command function produces

use std::fmt;
use std::future::Future;

use crate::executors::ActionFuture;

/// Work for the executor: a shell command or a direct action
pub enum Command {
    /// Command string run through the shell in the task's directory
    Shell(String),

    /// Asynchronous action awaited in place of a process
    Action(ActionFuture),
}

impl Command {
    /// Wrap a future as a direct action
    pub fn action<F>(fut: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::Action(Box::pin(fut))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell(cmd) => f.debug_tuple("Shell").field(cmd).finish(),
            Self::Action(_) => f.write_str("Action(..)"),
        }
    }
}

/// Values a command function may return
///
/// An `Err` becomes a command failure of the task that produced it.
pub trait IntoCommand {
    fn into_command(self) -> Result<Command, String>;
}

impl IntoCommand for Command {
    fn into_command(self) -> Result<Command, String> {
        Ok(self)
    }
}

impl IntoCommand for String {
    fn into_command(self) -> Result<Command, String> {
        Ok(Command::Shell(self))
    }
}

impl IntoCommand for &str {
    fn into_command(self) -> Result<Command, String> {
        Ok(Command::Shell(self.to_string()))
    }
}

impl<C, E> IntoCommand for Result<C, E>
where
    C: IntoCommand,
    E: fmt::Display,
{
    fn into_command(self) -> Result<Command, String> {
        self.map_err(|e| e.to_string())?.into_command()
    }
}
