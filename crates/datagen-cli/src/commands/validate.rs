use anyhow::{Context, Result};

use datagen_core::schema::parse::parse_schema;
use datagen_core::validate::CheckResult;

use crate::args::ValidateArgs;

pub fn run(args: &ValidateArgs) -> Result<()> {
    let schema_bytes = std::fs::read(&args.schema).with_context(|| format!("reading schema file: {}", args.schema))?;
    let dataset = parse_schema(&schema_bytes).context("parsing schema document")?;

    let tables = datagen_core::generate(&dataset, args.seed, None).context("generating dataset")?;
    let report = datagen_core::validate(&dataset, &tables);

    print_bucket("Structural", &report.structural);
    print_bucket("Value", &report.value);
    print_bucket("Behavioral", &report.behavioral);

    println!("\nOverall quality score: {:.1}/100", report.score);

    if !report.all_passed() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_bucket(label: &str, checks: &[CheckResult]) {
    println!("\n{label} checks:");
    if checks.is_empty() {
        println!("  (none declared)");
        return;
    }
    for check in checks {
        let mark = if check.passed { "ok  " } else { "FAIL" };
        println!("  [{mark}] {} - {}", check.name, check.detail);
    }
}
