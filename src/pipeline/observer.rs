// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Run progress hooks

use std::path::Path;

use crate::errors::WatermillError;
use crate::task::{Task, TaskResult};

/// Receives task lifecycle events during a scheduler run
///
/// Called from concurrently running branches, so implementations must be
/// cheap and thread safe.
pub trait RunObserver: Send + Sync {
    /// A task is about to resolve its input in `workspace`
    fn task_started(&self, _task: &Task, _workspace: &Path) {}

    /// A task finished, successfully or not
    fn task_finished(&self, _task: &Task, _outcome: Result<&TaskResult, &WatermillError>) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}
