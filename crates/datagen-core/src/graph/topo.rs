//! Topological ordering of the dependency graph — the Dependency Planner.
//!
//! Unlike a schema introspected from a live database, a declarative dataset
//! has no legitimate reason to contain a cycle across distinct nodes: a
//! cycle here is a schema mistake, not something to break edges around.
//! Self-referential single-node lookups (a node looking up its own
//! already-generated rows) are not graph edges at all — the executor
//! handles them in place, one row at a time.

use petgraph::algo::toposort;

use crate::error::{DatagenError, Result};
use crate::graph::dag::DependencyGraph;

/// Nodes in the order they must be generated: dependencies before
/// dependents.
#[derive(Debug, Clone)]
pub struct GenerationOrder {
    pub nodes: Vec<String>,
}

/// Compute the generation order for a dependency graph.
///
/// Edges point dependent → depended-upon, so `petgraph::toposort` (which
/// places nodes with no incoming edges first) yields depended-upon nodes
/// last; the result is reversed to get parents/targets first.
pub fn plan(graph: &DependencyGraph) -> Result<GenerationOrder> {
    match toposort(&graph.graph, None) {
        Ok(sorted) => {
            let nodes = sorted
                .iter()
                .rev()
                .map(|&idx| graph.node_name(idx).to_string())
                .collect();
            Ok(GenerationOrder { nodes })
        }
        Err(cycle) => {
            let involved = cycle_members(graph, cycle.node_id());
            Err(DatagenError::PlannerCycle {
                nodes: involved.join(", "),
            })
        }
    }
}

/// Best-effort listing of the strongly connected component containing
/// `start`, for a helpful error message.
fn cycle_members(graph: &DependencyGraph, start: petgraph::graph::NodeIndex) -> Vec<String> {
    use petgraph::algo::tarjan_scc;
    for component in tarjan_scc(&graph.graph) {
        if component.contains(&start) {
            return component
                .iter()
                .map(|&idx| graph.node_name(idx).to_string())
                .collect();
        }
    }
    vec![graph.node_name(start).to_string()]
}
