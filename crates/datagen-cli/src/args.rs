use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "datagen",
    about = "Generate synthetic relational datasets from a schema document",
    version,
    after_help = "Examples:\n  datagen generate --schema schema.json --seed 42 --output seed.json\n  datagen generate --schema schema.json --format csv --output seed.csv\n  datagen validate --schema schema.json --seed 42\n  datagen graph --schema schema.json --format mermaid"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a synthetic dataset from a schema document
    Generate(GenerateArgs),

    /// Regenerate a dataset from its schema and validate it
    Validate(ValidateArgs),

    /// Visualize the schema's node dependency graph
    Graph(GraphArgs),
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Path to the schema document (JSON)
    #[arg(long)]
    pub schema: String,

    /// Random seed for deterministic generation
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Output file path. Written to stdout if omitted.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output format (auto-detected from the output file extension if not given)
    #[arg(long)]
    pub format: Option<OutputFormat>,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the schema document (JSON) to generate and validate
    #[arg(long)]
    pub schema: String,

    /// Random seed to generate the dataset with before validating
    #[arg(long, default_value = "0")]
    pub seed: u64,
}

#[derive(Parser, Debug)]
pub struct GraphArgs {
    /// Path to the schema document (JSON)
    #[arg(long)]
    pub schema: String,

    /// Output format for the dependency graph
    #[arg(long, default_value = "mermaid")]
    pub format: GraphOutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum GraphOutputFormat {
    Mermaid,
    Dot,
}

impl GenerateArgs {
    /// Determine output format from the explicit `--format` flag, falling
    /// back to the output file's extension, and finally to JSON.
    pub fn output_format(&self) -> OutputFormat {
        if let Some(ref fmt) = self.format {
            return fmt.clone();
        }
        if let Some(ref path) = self.output {
            if path.ends_with(".csv") {
                return OutputFormat::Csv;
            }
        }
        OutputFormat::Json
    }
}
