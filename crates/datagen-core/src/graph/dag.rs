//! Builds the node dependency graph: edges point from a dependent node to
//! the node it must be generated after (fanout parent, `lookup` target
//! table, or `effect` event table).

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::schema::types::{Dataset, GeneratorSpec, ModifierSpec, NodeKind};

/// Why an edge exists between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Fanout,
    Lookup,
    Effect,
}

#[derive(Debug, Clone)]
pub struct EdgeInfo {
    pub kind: EdgeKind,
}

/// A directed graph over dataset nodes. Edges point from dependent to
/// depended-upon (child → parent, in the fanout sense).
pub struct DependencyGraph {
    pub graph: DiGraph<String, EdgeInfo>,
    pub node_indices: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for name in dataset.nodes.keys() {
            let idx = graph.add_node(name.clone());
            node_indices.insert(name.clone(), idx);
        }

        for (name, node) in &dataset.nodes {
            let from_idx = node_indices[name];

            if node.kind == NodeKind::Fact {
                if let Some(parent) = &node.parent {
                    if let Some(&to_idx) = node_indices.get(parent) {
                        graph.add_edge(
                            from_idx,
                            to_idx,
                            EdgeInfo {
                                kind: EdgeKind::Fanout,
                            },
                        );
                    }
                }
            }

            for modifier in &node.table_modifiers {
                if let ModifierSpec::Effect { event_table, .. } = modifier {
                    if event_table != name {
                        if let Some(&to_idx) = node_indices.get(event_table) {
                            graph.add_edge(
                                from_idx,
                                to_idx,
                                EdgeInfo {
                                    kind: EdgeKind::Effect,
                                },
                            );
                        }
                    }
                }
            }

            for column in node.columns.values() {
                if let GeneratorSpec::Lookup { table, .. } = &column.generator {
                    // Self-referential lookups are handled in-node by the
                    // executor, not as a graph edge (see executor docs).
                    if table != name {
                        if let Some(&to_idx) = node_indices.get(table) {
                            graph.add_edge(
                                from_idx,
                                to_idx,
                                EdgeInfo {
                                    kind: EdgeKind::Lookup,
                                },
                            );
                        }
                    }
                }
                for modifier in &column.modifiers {
                    if let ModifierSpec::Effect { event_table, .. } = modifier {
                        if event_table != name {
                            if let Some(&to_idx) = node_indices.get(event_table) {
                                graph.add_edge(
                                    from_idx,
                                    to_idx,
                                    EdgeInfo {
                                        kind: EdgeKind::Effect,
                                    },
                                );
                            }
                        }
                    }
                }
            }
        }

        Self {
            graph,
            node_indices,
        }
    }

    pub fn node_name(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    pub fn node_index(&self, name: &str) -> Option<NodeIndex> {
        self.node_indices.get(name).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
