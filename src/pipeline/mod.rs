// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Pipeline composition and execution
//!
//! Tasks are composed into a static tree with three combinators:
//!
//! - `join` runs children one after another in a shared workspace
//! - `fork` runs children concurrently from the same upstream state
//! - `junction` runs independent producers concurrently, so a later step
//!   can consume everything they wrote
//!
//! The `Scheduler` walks the tree and returns a `NodeResult` mirroring it.

mod definition;
mod graph;
mod observer;
mod result;
mod scheduler;
mod template;
mod validation;

pub use definition::{BuildSettings, NodeSpec, PipelineFile, TaskSpec};
pub use graph::PipelineGraph;
pub use observer::{NoopObserver, RunObserver};
pub use result::NodeResult;
pub use scheduler::Scheduler;
pub use template::CommandTemplate;
pub use validation::{PipelineValidator, ValidationResult};

use std::sync::Arc;

use crate::errors::WatermillError;
use crate::task::Task;

/// A node of the pipeline tree
#[derive(Debug, Clone)]
pub enum Node {
    Task(Arc<Task>),
    Join(Arc<[Node]>),
    Fork(Arc<[Node]>),
    Junction(Arc<[Node]>),
}

impl Node {
    /// Combinator or leaf label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Task(_) => "task",
            Self::Join(_) => "join",
            Self::Fork(_) => "fork",
            Self::Junction(_) => "junction",
        }
    }

    /// Direct children (empty for a task)
    pub fn children(&self) -> &[Node] {
        match self {
            Self::Task(_) => &[],
            Self::Join(c) | Self::Fork(c) | Self::Junction(c) => c,
        }
    }

    /// Every task occurrence, depth first in declaration order
    pub fn tasks(&self) -> Vec<&Task> {
        match self {
            Self::Task(t) => vec![t.as_ref()],
            _ => self.children().iter().flat_map(Node::tasks).collect(),
        }
    }
}

impl From<Task> for Node {
    fn from(task: Task) -> Self {
        Self::Task(Arc::new(task))
    }
}

fn combinator(
    kind: &str,
    children: impl IntoIterator<Item = Node>,
    wrap: fn(Arc<[Node]>) -> Node,
) -> Result<Node, WatermillError> {
    let children: Vec<Node> = children.into_iter().collect();

    if children.len() < 2 {
        return Err(WatermillError::InvalidPipeline {
            reason: format!("{} needs at least two children, got {}", kind, children.len()),
            help: Some("A single node can be used directly without a combinator".into()),
        });
    }

    Ok(wrap(children.into()))
}

/// Sequential composition
pub fn join(children: impl IntoIterator<Item = Node>) -> Result<Node, WatermillError> {
    combinator("join", children, Node::Join)
}

/// Concurrent divergent branches from a shared upstream state
pub fn fork(children: impl IntoIterator<Item = Node>) -> Result<Node, WatermillError> {
    combinator("fork", children, Node::Fork)
}

/// Concurrent independent producers feeding a shared workspace
pub fn junction(children: impl IntoIterator<Item = Node>) -> Result<Node, WatermillError> {
    combinator("junction", children, Node::Junction)
}
