use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use datagen_core::output::{write_csv, write_json};
use datagen_core::schema::hash::schema_hash;
use datagen_core::schema::parse::parse_schema;
use datagen_core::schema::Dataset;
use datagen_core::GeneratedTables;

use crate::args::{GenerateArgs, OutputFormat};

fn spinner(prefix: &str, message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} [{prefix}] {msg}").unwrap());
    pb.set_prefix(prefix.to_string());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

pub fn run(args: &GenerateArgs) -> Result<()> {
    let pb1 = spinner("1/3", "Parsing schema...");
    let schema_bytes = std::fs::read(&args.schema).with_context(|| format!("reading schema file: {}", args.schema))?;
    let dataset = parse_schema(&schema_bytes).context("parsing schema document")?;
    pb1.finish_with_message(format!("Parsing schema... done ({} nodes)", dataset.nodes.len()));

    tracing::debug!(seed = args.seed, nodes = dataset.nodes.len(), "starting generation");
    let pb2 = spinner("2/3", "Generating dataset...");
    let tables = datagen_core::generate(&dataset, args.seed, None).context("generating dataset")?;
    let total_rows: usize = tables.values().map(|t| t.rows.len()).sum();
    pb2.finish_with_message(format!("Generating dataset... done ({total_rows} rows)"));

    let pb3 = spinner("3/3", "Writing output...");
    match &args.output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating output file: {path}"))?;
            let mut writer = BufWriter::new(file);
            write_output(&mut writer, &tables, args.output_format())?;
            write_sidecar(path, &dataset, &tables, args.seed)
                .with_context(|| format!("writing metadata sidecar for: {path}"))?;
            pb3.finish_with_message(format!("Writing output... done -> {path}"));
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            write_output(&mut writer, &tables, args.output_format())?;
            pb3.finish_with_message("Writing output... done (stdout)");
        }
    }

    eprintln!("Generated {total_rows} rows across {} tables", tables.len());

    Ok(())
}

fn write_output<W: Write>(writer: &mut W, tables: &datagen_core::GeneratedTables, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(writer, tables)?,
        OutputFormat::Csv => write_csv(writer, tables)?,
    }
    Ok(())
}

/// Write a small metadata sidecar (`<path>.meta.json`) alongside the
/// generated output: dataset name/version, seed, per-table row/column
/// counts, and a hash of the schema that produced it.
fn write_sidecar(path: &str, dataset: &Dataset, tables: &GeneratedTables, seed: u64) -> Result<()> {
    let sidecar_path = format!("{path}.meta.json");
    let mut body = String::new();
    body.push_str("{\n");
    body.push_str(&format!("  \"dataset_name\": {:?},\n", dataset.metadata.name));
    body.push_str(&format!("  \"schema_version\": {},\n", dataset.version));
    body.push_str(&format!("  \"seed\": {seed},\n"));
    body.push_str(&format!("  \"schema_hash\": {:?},\n", schema_hash(dataset)));
    body.push_str("  \"tables\": {\n");
    let table_count = tables.len();
    for (idx, (name, table)) in tables.iter().enumerate() {
        let columns = table.rows.first().map(|row| row.len()).unwrap_or(0);
        body.push_str(&format!(
            "    {name:?}: {{ \"rows\": {}, \"columns\": {columns} }}",
            table.rows.len()
        ));
        if idx < table_count - 1 {
            body.push(',');
        }
        body.push('\n');
    }
    body.push_str("  }\n}\n");

    std::fs::write(&sidecar_path, body).with_context(|| format!("creating sidecar file: {sidecar_path}"))?;
    Ok(())
}
