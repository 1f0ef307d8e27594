// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! # watermill - Composable Task Pipelines
//!
//! `watermill` runs shell-command tasks composed into a static tree, with
//! file-glob inputs and outputs resolved against a working directory.
//!
//! ## Features
//!
//! - **Task factory** - Declare name, params, input and output patterns once
//! - **Combinators** - `join` for sequence, `fork` and `junction` for concurrency
//! - **Checked outputs** - A task only succeeds if its declared files exist
//! - **Fail fast** - The first failure stops new work and is reported
//!
//! ## Quick Start
//!
//! ```no_run
//! use watermill::{join, task, Context, Scheduler, TaskDescriptor};
//!
//! # async fn demo() -> watermill::WatermillResult<()> {
//! let download = task(
//!     TaskDescriptor::new("download").output("*.fna.gz"),
//!     |_: &Context| "curl -sO https://example.org/ref_genomic.fna.gz",
//! )?;
//! let count = task(
//!     TaskDescriptor::new("count").input("*.fna.gz"),
//!     |ctx: &Context| format!("zcat {} | wc -c", ctx.input.as_ref().map(|i| i.to_string()).unwrap_or_default()),
//! )?;
//!
//! Scheduler::default().run(&join([download, count])?, "data").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ```bash
//! # Run a pipeline file
//! watermill run pipeline.yaml
//!
//! # Show its task graph
//! watermill graph pipeline.yaml --format mermaid
//! ```

pub mod cli;
pub mod errors;
pub mod executors;
pub mod pipeline;
pub mod task;
pub mod utils;
pub mod workspace;

// Re-export commonly used types
pub use errors::{WatermillError, WatermillResult};
pub use pipeline::{fork, join, junction, Node, NodeResult, Scheduler};
pub use task::{task, Command, Context, TaskDescriptor};
pub use workspace::Patterns;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
