// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Pipeline validation
//!
//! Checks a pipeline file before anything runs.

use std::collections::{BTreeSet, HashMap};

use super::definition::{BuildSettings, NodeSpec, PipelineFile};

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline file
    pub fn validate(file: &PipelineFile, settings: &BuildSettings) -> ValidationResult {
        let mut result = ValidationResult::new();

        if file.tasks.is_empty() {
            result.add_error("Pipeline has no tasks defined");
        }

        // Build errors cover unknown ids, bad templates, bad descriptors
        if let Err(e) = file.build(settings) {
            result.add_error(&e.to_string());
        }

        let mut uses: HashMap<&str, usize> = HashMap::new();
        for id in file.pipeline.task_refs() {
            *uses.entry(id).or_default() += 1;
        }

        for id in file.tasks.keys() {
            match uses.get(id.as_str()) {
                None => result.add_warning(&format!("Task '{}' is defined but never used", id)),
                Some(&n) if n > 1 => result.add_warning(&format!(
                    "Task '{}' is used {} times; it runs again at each place",
                    id, n
                )),
                _ => {}
            }
        }

        Self::check_sibling_outputs(file, &file.pipeline, &mut result);

        result
    }

    /// Warn when concurrent branches sharing a workspace declare the same output
    fn check_sibling_outputs(file: &PipelineFile, spec: &NodeSpec, result: &mut ValidationResult) {
        match spec {
            NodeSpec::Task(_) => {}
            NodeSpec::Join { join: children } => {
                for child in children {
                    Self::check_sibling_outputs(file, child, result);
                }
            }
            NodeSpec::Fork { fork: children } | NodeSpec::Junction { junction: children } => {
                let mut seen: HashMap<String, usize> = HashMap::new();

                for (branch, child) in children.iter().enumerate() {
                    for glob in Self::shared_outputs(file, child) {
                        match seen.get(&glob) {
                            Some(&other) if other != branch => result.add_warning(&format!(
                                "Concurrent branches {} and {} both write '{}' into the same workspace",
                                other + 1,
                                branch + 1,
                                glob
                            )),
                            Some(_) => {}
                            None => {
                                seen.insert(glob, branch);
                            }
                        }
                    }
                    Self::check_sibling_outputs(file, child, result);
                }
            }
        }
    }

    /// Output globs of tasks in a subtree that run in the inherited workspace
    fn shared_outputs(file: &PipelineFile, spec: &NodeSpec) -> BTreeSet<String> {
        spec.task_refs()
            .into_iter()
            .filter_map(|id| file.tasks.get(id))
            .filter(|task| task.dir.is_none())
            .filter_map(|task| task.output.as_ref())
            .flat_map(|output| output.globs().into_iter().map(String::from).collect::<Vec<_>>())
            .collect()
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
