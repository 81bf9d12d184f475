use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use viamill::{init_logging, post_processor_for, recalculate, Project, Setup, Unit};

/// Output format name that writes the machine plan as JSON.
const PLAN_FORMAT: &str = "plan";

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Drawing file (JSON with a "segments" list)
    #[arg(value_name = "SEGMENTS")]
    input: PathBuf,

    /// Setup file (JSON or TOML), replaces any setup in the drawing file
    #[arg(short, long, value_name = "FILE")]
    setup: Option<PathBuf>,

    /// Output file, stdout when omitted
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Post-processor name or "plan"; defaults to machine.plugin
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<String>,

    /// Override a setup option, e.g. --set mill.depth=-3
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Drawing coordinates are in inches
    #[arg(long)]
    inch_drawing: bool,

    /// Log progress
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mut project = Project::load_from_file(&cli.input)
        .with_context(|| format!("Failed to read drawing: {}", cli.input.display()))?;

    if let Some(path) = &cli.setup {
        project.setup = Setup::load_from_file(path)
            .with_context(|| format!("Failed to read setup: {}", path.display()))?;
    }
    for entry in &cli.overrides {
        let (key, value) = entry
            .split_once('=')
            .with_context(|| format!("Expected KEY=VALUE, got '{}'", entry))?;
        project
            .setup
            .set_option_str(key.trim(), value.trim())
            .with_context(|| format!("Invalid option '{}'", entry))?;
    }
    if cli.inch_drawing {
        project.drawing_unit = Unit::Inch;
    }

    let result = recalculate(&project).context("Calculation failed")?;
    info!(
        "{} objects, {} tool paths, {} plan entries",
        result.objects.len(),
        result.offsets.len(),
        result.plan.entries.len()
    );

    let format = cli
        .format
        .clone()
        .unwrap_or_else(|| project.setup.machine.plugin.clone());
    let text = if format == PLAN_FORMAT {
        serde_json::to_string_pretty(&result.plan)?
    } else {
        let post = post_processor_for(
            &format,
            project.setup.machine.comments,
            project.setup.machine.arc_mode_r,
        )?;
        post.render(&result.plan, &project.setup)
    };

    match &cli.output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write output: {}", path.display()))?,
        None => print!("{}", text),
    }

    Ok(())
}
