use petgraph::visit::EdgeRef;

use crate::graph::dag::DependencyGraph;

/// Output format for graph visualization.
pub enum GraphFormat {
    Mermaid,
    Dot,
}

/// Render the dependency graph for inspection at the CLI boundary.
pub fn visualize(graph: &DependencyGraph, format: GraphFormat) -> String {
    match format {
        GraphFormat::Mermaid => generate_mermaid(graph),
        GraphFormat::Dot => generate_dot(graph),
    }
}

fn generate_mermaid(graph: &DependencyGraph) -> String {
    let mut output = String::from("graph TD\n");

    for node in graph.graph.node_indices() {
        let name = graph.node_name(node);
        output.push_str(&format!("    {name}[{name}]\n"));
    }

    output.push('\n');

    for edge in graph.graph.edge_references() {
        let from = graph.node_name(edge.source());
        let to = graph.node_name(edge.target());
        let label = format!("{:?}", edge.weight().kind).to_lowercase();
        output.push_str(&format!("    {from} -->|{label}| {to}\n"));
    }

    output
}

fn generate_dot(graph: &DependencyGraph) -> String {
    let mut output = String::from("digraph dependencies {\n");
    output.push_str("    rankdir=TB;\n");
    output.push_str("    node [shape=box, style=rounded];\n\n");

    for edge in graph.graph.edge_references() {
        let from = graph.node_name(edge.source());
        let to = graph.node_name(edge.target());
        let label = format!("{:?}", edge.weight().kind).to_lowercase();
        output.push_str(&format!("    \"{from}\" -> \"{to}\" [label=\"{label}\"];\n"));
    }

    output.push_str("}\n");
    output
}
