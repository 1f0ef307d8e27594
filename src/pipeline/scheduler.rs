// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Pipeline scheduler
//!
//! Walks a node tree depth first. Joins run their children strictly in
//! order; forks and junctions spawn every branch before awaiting any and
//! fail fast on the first branch error. Branches still running at that
//! point are detached, not aborted: they finish their current process but
//! launch nothing new.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use super::{Node, NodeResult, NoopObserver, RunObserver};
use crate::errors::WatermillError;
use crate::executors::{Executor, ShellExecutor};
use crate::task::Task;
use crate::workspace::{self, GlobMatcher, Resolver};

/// A node's result plus the workspace it leaves for its successor
struct Evaluated {
    result: NodeResult,
    workspace: PathBuf,
}

type EvalFuture = Pin<Box<dyn Future<Output = Result<Evaluated, WatermillError>> + Send + 'static>>;

/// Executes pipeline trees
///
/// Holds no state between runs; every run re-reads the filesystem.
#[derive(Clone)]
pub struct Scheduler {
    executor: Arc<dyn Executor>,
    resolver: Resolver,
    observer: Arc<dyn RunObserver>,
}

impl Scheduler {
    /// Create a scheduler around an executor
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            resolver: Resolver::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Use a different glob matching capability
    pub fn with_matcher(mut self, matcher: Arc<dyn GlobMatcher>) -> Self {
        self.resolver = Resolver::new(matcher);
        self
    }

    /// Report task lifecycle events to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run `root` once with `workspace` as the initial working directory
    pub async fn run(&self, root: &Node, workspace: impl AsRef<Path>) -> Result<NodeResult, WatermillError> {
        self.run_with_cancellation(root, workspace, CancellationToken::new())
            .await
    }

    /// Run `root`, stopping the launch of new tasks once `cancel` fires
    pub async fn run_with_cancellation(
        &self,
        root: &Node,
        workspace: impl AsRef<Path>,
        cancel: CancellationToken,
    ) -> Result<NodeResult, WatermillError> {
        let start = Instant::now();
        let workspace = workspace::ensure_dir(Path::new("."), workspace.as_ref()).await?;
        info!(workspace = %workspace.display(), "pipeline started");

        match self.eval(root.clone(), workspace, cancel).await {
            Ok(evaluated) => {
                info!(elapsed = ?start.elapsed(), "pipeline finished");
                Ok(evaluated.result)
            }
            Err(e) => {
                error!(kind = e.kind(), task = e.task().unwrap_or("-"), elapsed = ?start.elapsed(), "pipeline failed: {}", e);
                Err(e)
            }
        }
    }

    fn eval(&self, node: Node, workspace: PathBuf, cancel: CancellationToken) -> EvalFuture {
        let this = self.clone();
        Box::pin(async move {
            match node {
                Node::Task(task) => this.run_task(&task, workspace, &cancel).await,
                Node::Join(children) => this.run_join(&children, workspace, &cancel).await,
                Node::Fork(children) => {
                    let results = this.run_concurrent(&children, &workspace, &cancel).await?;
                    Ok(Evaluated {
                        result: NodeResult::Fork(results),
                        workspace,
                    })
                }
                Node::Junction(children) => {
                    let results = this.run_concurrent(&children, &workspace, &cancel).await?;
                    Ok(Evaluated {
                        result: NodeResult::Junction(results),
                        workspace,
                    })
                }
            }
        })
    }

    async fn run_task(
        &self,
        task: &Task,
        workspace: PathBuf,
        cancel: &CancellationToken,
    ) -> Result<Evaluated, WatermillError> {
        if cancel.is_cancelled() {
            debug!(task = %task.name(), "skipped, scope cancelled");
            return Err(WatermillError::Cancelled {
                task: task.name().to_string(),
            });
        }

        self.observer.task_started(task, &workspace);

        let span = info_span!("task", name = %task.name());
        let outcome = task
            .run(&workspace, &self.resolver, self.executor.as_ref())
            .instrument(span)
            .await;

        self.observer.task_finished(task, outcome.as_ref());

        match outcome {
            Ok(result) => {
                info!(task = %task.name(), duration = ?result.duration, "task finished");
                Ok(Evaluated {
                    workspace: result.dir.clone(),
                    result: NodeResult::Task(result),
                })
            }
            Err(e) => {
                error!(task = %task.name(), kind = e.kind(), "task failed: {}", e);
                Err(e)
            }
        }
    }

    async fn run_join(
        &self,
        children: &[Node],
        workspace: PathBuf,
        cancel: &CancellationToken,
    ) -> Result<Evaluated, WatermillError> {
        let mut workspace = workspace;
        let mut last = None;

        for child in children {
            let evaluated = self.eval(child.clone(), workspace, cancel.clone()).await?;
            workspace = evaluated.workspace.clone();
            last = Some(evaluated);
        }

        last.ok_or_else(|| WatermillError::InvalidPipeline {
            reason: "join has no children".into(),
            help: None,
        })
    }

    async fn run_concurrent(
        &self,
        children: &[Node],
        workspace: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<NodeResult>, WatermillError> {
        let scope = cancel.child_token();
        let mut branches = JoinSet::new();

        debug!(branches = children.len(), "fan-out");
        for (index, child) in children.iter().enumerate() {
            let branch = self.eval(child.clone(), workspace.to_path_buf(), scope.clone());
            branches.spawn(async move { (index, branch.await) });
        }

        let mut results: Vec<Option<NodeResult>> = std::iter::repeat_with(|| None)
            .take(children.len())
            .collect();

        while let Some(joined) = branches.join_next().await {
            let failure = match joined {
                Ok((index, Ok(evaluated))) => {
                    results[index] = Some(evaluated.result);
                    continue;
                }
                Ok((_, Err(e))) => e,
                Err(join_error) => WatermillError::BranchPanicked {
                    message: join_error.to_string(),
                },
            };

            scope.cancel();
            branches.detach_all();
            return Err(failure);
        }

        debug!(branches = children.len(), "fan-in");
        Ok(results.into_iter().flatten().collect())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Arc::new(ShellExecutor::new()))
    }
}
