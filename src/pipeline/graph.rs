// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 watermill contributors

//! Task precedence graph
//!
//! Flattens a pipeline tree into a DAG of task occurrences. A join adds an
//! edge from every exit task of child i to every entry task of child i+1;
//! fork and junction branches share the entries and exits of their parent.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::Node;

/// Precedence graph of task occurrences
///
/// Node indices follow declaration order, which is also a valid
/// topological order since edges only ever point forward.
pub struct PipelineGraph {
    graph: DiGraph<String, ()>,
}

impl PipelineGraph {
    /// Build the graph for a pipeline tree
    pub fn build(root: &Node) -> Self {
        let mut graph = DiGraph::new();
        Self::add(&mut graph, root);
        Self { graph }
    }

    /// Add a subtree, returning its entry and exit tasks
    fn add(graph: &mut DiGraph<String, ()>, node: &Node) -> (Vec<NodeIndex>, Vec<NodeIndex>) {
        match node {
            Node::Task(task) => {
                let idx = graph.add_node(task.name().to_string());
                (vec![idx], vec![idx])
            }
            Node::Join(children) => {
                let mut entries = Vec::new();
                let mut exits: Vec<NodeIndex> = Vec::new();

                for (i, child) in children.iter().enumerate() {
                    let (child_entries, child_exits) = Self::add(graph, child);
                    if i == 0 {
                        entries = child_entries;
                    } else {
                        for &from in &exits {
                            for &to in &child_entries {
                                graph.add_edge(from, to, ());
                            }
                        }
                    }
                    exits = child_exits;
                }

                (entries, exits)
            }
            Node::Fork(children) | Node::Junction(children) => {
                let mut entries = Vec::new();
                let mut exits = Vec::new();
                for child in children.iter() {
                    let (e, x) = Self::add(graph, child);
                    entries.extend(e);
                    exits.extend(x);
                }
                (entries, exits)
            }
        }
    }

    /// Number of task occurrences
    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Task names in a valid execution order
    pub fn execution_order(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .map(|n| self.graph[n].as_str())
            .collect()
    }

    /// Direct predecessors of a task occurrence
    fn predecessors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut preds: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .map(|e| e.source())
            .collect();
        preds.sort();
        preds
    }

    /// Whether some occurrence of `before` must finish before some
    /// occurrence of `after` starts
    pub fn precedes(&self, before: &str, after: &str) -> bool {
        let occurrences = |name: &str| -> Vec<NodeIndex> {
            self.graph
                .node_indices()
                .filter(|&n| self.graph[n] == name)
                .collect()
        };

        occurrences(before).iter().any(|&a| {
            occurrences(after)
                .iter()
                .any(|&b| a != b && petgraph::algo::has_path_connecting(&self.graph, a, b, None))
        })
    }

    /// Text listing in execution order
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        for (i, node) in self.graph.node_indices().enumerate() {
            out.push_str(&format!("{}. {}", i + 1, self.graph[node]));

            let preds = self.predecessors(node);
            if !preds.is_empty() {
                let names: Vec<&str> = preds.iter().map(|&p| self.graph[p].as_str()).collect();
                out.push_str(&format!(" [after: {}]", names.join(", ")));
            }

            out.push('\n');
        }

        out
    }

    /// Mermaid flowchart
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for node in self.graph.node_indices() {
            out.push_str(&format!(
                "    t{}[\"{}\"]\n",
                node.index(),
                self.graph[node].replace('"', "'")
            ));
        }

        for edge in self.graph.edge_references() {
            out.push_str(&format!(
                "    t{} --> t{}\n",
                edge.source().index(),
                edge.target().index()
            ));
        }

        out
    }

    /// Graphviz DOT digraph
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for node in self.graph.node_indices() {
            out.push_str(&format!(
                "    t{} [label=\"{}\"];\n",
                node.index(),
                self.graph[node].replace('"', "\\\"")
            ));
        }

        for edge in self.graph.edge_references() {
            out.push_str(&format!(
                "    t{} -> t{};\n",
                edge.source().index(),
                edge.target().index()
            ));
        }

        out.push_str("}\n");
        out
    }
}
