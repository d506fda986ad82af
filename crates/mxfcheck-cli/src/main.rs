//! mxfcheck - validate MXF files against conformance specifications.

mod baseline;

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::debug;

use mxfcheck_registry::Registry;
use mxfcheck_tree::{run_tests, Report, SniffContext};

#[derive(Debug, Parser)]
#[command(
    name = "mxfcheck",
    version,
    about = "Validate MXF files against conformance specifications"
)]
struct Cli {
    /// MXF file to validate
    file: PathBuf,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report serialization format
    #[arg(short, long, value_enum, default_value = "yaml")]
    format: Format,

    /// Skip the built-in baseline structure checks
    #[arg(long)]
    no_baseline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let file = File::open(&cli.file)
        .with_context(|| format!("opening {}", cli.file.display()))?;
    let reader = BufReader::new(file);

    let registry = Registry::builtin();
    let mut specs = Vec::new();
    if !cli.no_baseline {
        let sc = SniffContext::new();
        specs.push(baseline::specification(&sc));
    }
    debug!(specs = specs.len(), "running conformance tests");

    let report = run_tests(reader, specs, &registry)
        .await
        .with_context(|| format!("validating {}", cli.file.display()))?;

    let rendered = render(&report, cli.format)?;
    match &cli.output {
        Some(path) => {
            let mut out = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            out.write_all(rendered.as_bytes())?;
        }
        None => print!("{rendered}"),
    }

    if !report.test_pass {
        std::process::exit(1);
    }
    Ok(())
}

fn render(report: &Report, format: Format) -> Result<String> {
    Ok(match format {
        Format::Yaml => serde_yaml::to_string(report)?,
        Format::Json => {
            let mut text = serde_json::to_string_pretty(report)?;
            text.push('\n');
            text
        }
    })
}
