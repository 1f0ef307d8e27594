// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Progress spinner utilities
//!
//! Provides progress indicators for running pipelines.

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use super::Mark;
use crate::errors::WatermillError;
use crate::pipeline::RunObserver;
use crate::task::{Task, TaskResult};

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
        .template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Create a spinner for indeterminate progress
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// One spinner line per running task
///
/// The same task may run several times at once (a task shared by two fork
/// branches), so spinners are stacked per task name.
#[derive(Default)]
pub struct ProgressObserver {
    multi: MultiProgress,
    running: Mutex<HashMap<String, Vec<ProgressBar>>>,
    verbose: bool,
}

impl ProgressObserver {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            ..Default::default()
        }
    }

    fn take(&self, name: &str) -> Option<ProgressBar> {
        let mut running = self.running.lock().ok()?;
        let bars = running.get_mut(name)?;
        let bar = bars.pop();
        if bars.is_empty() {
            running.remove(name);
        }
        bar
    }

    /// Number of spinners still running
    pub fn running(&self) -> usize {
        self.running
            .lock()
            .map(|r| r.values().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

impl RunObserver for ProgressObserver {
    fn task_started(&self, task: &Task, workspace: &Path) {
        let message = if self.verbose {
            format!("{} {}", task.name(), workspace.display().to_string().dimmed())
        } else {
            task.name().to_string()
        };

        let pb = self.multi.add(create_spinner(&message));
        if let Ok(mut running) = self.running.lock() {
            running.entry(task.name().to_string()).or_default().push(pb);
        }
    }

    fn task_finished(&self, task: &Task, outcome: Result<&TaskResult, &WatermillError>) {
        let Some(pb) = self.take(task.name()) else {
            return;
        };

        pb.set_style(ProgressStyle::default_spinner().template("{msg}").unwrap_or_else(|_| spinner_style()));
        match outcome {
            Ok(result) => pb.finish_with_message(format!(
                "{} {} {}",
                Mark::Ok.symbol(),
                task.name(),
                format!("({:.2?})", result.duration).dimmed()
            )),
            Err(e) => pb.finish_with_message(format!(
                "{} {} {}",
                Mark::Failed.symbol(),
                task.name(),
                e.kind().dimmed()
            )),
        }
    }
}
