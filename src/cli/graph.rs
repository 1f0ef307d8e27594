// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Graph command - visualize pipeline as a graph

use miette::Result;
use std::path::PathBuf;

use super::{load_pipeline, GraphFormat, RunOptions};
use crate::pipeline::PipelineGraph;

/// Run the graph command
pub async fn run(pipeline_path: PathBuf, options: RunOptions, format: GraphFormat) -> Result<()> {
    let file = load_pipeline(&pipeline_path)?;
    let root = file.build(&options.build_settings())?;

    let graph = PipelineGraph::build(&root);

    // Output in requested format
    let output = match format {
        GraphFormat::Text => graph.to_text(),
        GraphFormat::Dot => graph.to_dot(),
        GraphFormat::Mermaid => graph.to_mermaid(),
    };

    print!("{}", output);

    Ok(())
}
