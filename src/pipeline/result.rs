// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Nested run results

use serde::Serialize;
use std::path::PathBuf;

use crate::task::TaskResult;

/// Result tree of a scheduler run
///
/// A join has no variant of its own: it yields its last child's result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeResult {
    Task(TaskResult),
    Fork(Vec<NodeResult>),
    Junction(Vec<NodeResult>),
}

impl NodeResult {
    pub fn as_task(&self) -> Option<&TaskResult> {
        match self {
            Self::Task(t) => Some(t),
            _ => None,
        }
    }

    /// Branch results of a fork or junction, in declaration order
    pub fn branches(&self) -> Option<&[NodeResult]> {
        match self {
            Self::Task(_) => None,
            Self::Fork(b) | Self::Junction(b) => Some(b),
        }
    }

    /// Task results contained in this tree, depth first
    pub fn tasks(&self) -> Vec<&TaskResult> {
        match self {
            Self::Task(t) => vec![t],
            Self::Fork(b) | Self::Junction(b) => b.iter().flat_map(NodeResult::tasks).collect(),
        }
    }

    /// Verified output files of every task in this tree
    pub fn outputs(&self) -> Vec<&PathBuf> {
        self.tasks()
            .into_iter()
            .filter_map(|t| t.output.as_ref())
            .flat_map(|o| o.paths())
            .collect()
    }
}
