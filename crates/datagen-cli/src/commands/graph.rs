use anyhow::{Context, Result};

use datagen_core::graph::dag::DependencyGraph;
use datagen_core::graph::visualize::{self, GraphFormat as VizFormat};
use datagen_core::schema::parse::parse_schema;

use crate::args::{GraphArgs, GraphOutputFormat};

pub fn run(args: &GraphArgs) -> Result<()> {
    let schema_bytes = std::fs::read(&args.schema).with_context(|| format!("reading schema file: {}", args.schema))?;
    let dataset = parse_schema(&schema_bytes).context("parsing schema document")?;

    let dep_graph = DependencyGraph::from_dataset(&dataset);

    let format = match args.format {
        GraphOutputFormat::Mermaid => VizFormat::Mermaid,
        GraphOutputFormat::Dot => VizFormat::Dot,
    };

    println!("{}", visualize::visualize(&dep_graph, format));

    Ok(())
}
