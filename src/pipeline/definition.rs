// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Pipeline file definitions
//!
//! Declarative form of a pipeline, loaded from YAML (or JSON/TOML by file
//! extension):
//!
//! ```yaml
//! name: fork-fork
//! tasks:
//!   task1: { command: 'echo "something1"' }
//!   task2: { command: 'echo "something2"' }
//!   task3: { command: 'echo "something3"' }
//! pipeline:
//!   join:
//!     - task1
//!     - fork: [task2, task3]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{fork, join, junction, CommandTemplate, Node};
use crate::errors::WatermillError;
use crate::task::{Context, Params, Task, TaskDescriptor};
use crate::workspace::Patterns;

/// Pipeline definition file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineFile {
    /// Pipeline name
    pub name: String,

    /// Pipeline description
    #[serde(default)]
    pub description: Option<String>,

    /// Default workspace directory, relative to the current directory
    #[serde(default)]
    pub workspace: Option<PathBuf>,

    /// Shell used to run commands
    #[serde(default)]
    pub shell: Option<String>,

    /// Environment variables for every command
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Task definitions by id
    pub tasks: BTreeMap<String, TaskSpec>,

    /// Pipeline structure over task ids
    pub pipeline: NodeSpec,
}

/// A task as written in a pipeline file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Display label, defaults to the task id
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub params: Params,

    #[serde(default)]
    pub input: Option<Patterns>,

    #[serde(default)]
    pub output: Option<Patterns>,

    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Command template
    pub command: String,
}

/// Structure node as written in a pipeline file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    /// Reference to a task id
    Task(String),
    Join { join: Vec<NodeSpec> },
    Fork { fork: Vec<NodeSpec> },
    Junction { junction: Vec<NodeSpec> },
}

impl NodeSpec {
    /// Task ids referenced, in declaration order, with repeats
    pub fn task_refs(&self) -> Vec<&str> {
        match self {
            Self::Task(id) => vec![id.as_str()],
            Self::Join { join: c } | Self::Fork { fork: c } | Self::Junction { junction: c } => {
                c.iter().flat_map(NodeSpec::task_refs).collect()
            }
        }
    }
}

/// Values threaded into every task when a file is built
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Thread count exposed to commands as `params.threads`
    pub threads: usize,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self { threads: 2 }
    }
}

impl PipelineFile {
    /// Load a pipeline file, choosing the format by extension
    pub fn from_file(path: &Path) -> Result<Self, WatermillError> {
        let content = std::fs::read_to_string(path).map_err(|e| WatermillError::FileRead {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(Into::into),
            Some("toml") => toml::from_str(&content).map_err(Into::into),
            _ => Self::from_yaml(&content),
        }
    }

    /// Parse a pipeline from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, WatermillError> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Descriptor for a task id, with build settings applied
    pub fn descriptor(&self, id: &str, settings: &BuildSettings) -> Result<TaskDescriptor, WatermillError> {
        let spec = self.tasks.get(id).ok_or_else(|| WatermillError::UnknownTask {
            task: id.to_string(),
        })?;

        let mut params = spec.params.clone();
        params
            .entry("threads".to_string())
            .or_insert_with(|| json!(settings.threads));

        Ok(TaskDescriptor {
            name: spec.name.clone().unwrap_or_else(|| id.to_string()),
            params,
            input: spec.input.clone(),
            output: spec.output.clone(),
            dir: spec.dir.clone(),
        })
    }

    /// Build the executable node tree
    ///
    /// Each task id becomes one task, shared by every place it is used.
    pub fn build(&self, settings: &BuildSettings) -> Result<Node, WatermillError> {
        let mut built: HashMap<&str, Node> = HashMap::new();
        self.build_node(&self.pipeline, settings, &mut built)
    }

    fn build_node<'a>(
        &'a self,
        spec: &'a NodeSpec,
        settings: &BuildSettings,
        built: &mut HashMap<&'a str, Node>,
    ) -> Result<Node, WatermillError> {
        match spec {
            NodeSpec::Task(id) => {
                if let Some(node) = built.get(id.as_str()) {
                    return Ok(node.clone());
                }
                let node = self.build_task(id, settings)?;
                built.insert(id.as_str(), node.clone());
                Ok(node)
            }
            NodeSpec::Join { join: c } => join(self.build_children(c, settings, built)?),
            NodeSpec::Fork { fork: c } => fork(self.build_children(c, settings, built)?),
            NodeSpec::Junction { junction: c } => junction(self.build_children(c, settings, built)?),
        }
    }

    fn build_children<'a>(
        &'a self,
        specs: &'a [NodeSpec],
        settings: &BuildSettings,
        built: &mut HashMap<&'a str, Node>,
    ) -> Result<Vec<Node>, WatermillError> {
        specs
            .iter()
            .map(|s| self.build_node(s, settings, built))
            .collect()
    }

    fn build_task(&self, id: &str, settings: &BuildSettings) -> Result<Node, WatermillError> {
        let descriptor = self.descriptor(id, settings)?;
        let command = &self.tasks[id].command;

        let template = CommandTemplate::parse(command, &descriptor).map_err(|reason| {
            WatermillError::Template {
                task: descriptor.name.clone(),
                reason,
            }
        })?;
        let template = Arc::new(template);

        let task = Task::new(descriptor, move |ctx: &Context| template.render(ctx))?;
        Ok(Node::from(task))
    }
}
