//! Dependency graph over emitted build actions.

use crate::action::BuildAction;
use dexer_common::{ArtifactPath, DexerResult, InternalError};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Build actions connected by producer → consumer edges.
///
/// Every output path has exactly one producing action. Adding a second
/// action that declares an already-produced output is an internal error,
/// since two actions writing one file makes incremental rebuilds incorrect.
#[derive(Debug, Default)]
pub struct ActionGraph {
    graph: DiGraph<BuildAction, ()>,
    producers: HashMap<ArtifactPath, NodeIndex>,
}

impl ActionGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an action, wiring it to the actions it consumes from or feeds.
    pub fn add(&mut self, action: BuildAction) -> DexerResult<NodeIndex> {
        let mut seen = Vec::new();
        for output in action.outputs() {
            if self.producers.contains_key(output) || seen.contains(&output) {
                return Err(InternalError::new(format!(
                    "output '{output}' is declared by more than one action"
                )));
            }
            seen.push(output);
        }

        let outputs: Vec<ArtifactPath> = action.outputs().cloned().collect();
        let producers: Vec<NodeIndex> = action
            .inputs()
            .filter_map(|input| self.producers.get(input).copied())
            .collect();
        let node = self.graph.add_node(action);

        for producer in producers {
            self.graph.update_edge(producer, node, ());
        }
        let consumers: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&n| n != node && self.graph[n].inputs().any(|i| outputs.contains(i)))
            .collect();
        for consumer in consumers {
            self.graph.update_edge(node, consumer, ());
        }
        for output in outputs {
            self.producers.insert(output, node);
        }
        Ok(node)
    }

    /// Returns the action producing `path`, if any.
    pub fn producer_of(&self, path: &ArtifactPath) -> Option<&BuildAction> {
        self.producers.get(path).map(|&n| &self.graph[n])
    }

    /// Number of actions.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph holds no actions.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Actions ordered so that every producer precedes its consumers.
    pub fn ordered(&self) -> DexerResult<Vec<&BuildAction>> {
        let order = toposort(&self.graph, None).map_err(|cycle| {
            let action = &self.graph[cycle.node_id()];
            InternalError::new(format!(
                "dependency cycle through action producing '{}'",
                action.output
            ))
        })?;
        Ok(order.into_iter().map(|n| &self.graph[n]).collect())
    }
}
