use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use oluct_compare::{run_comparison, CompareConfig, ComparisonReport, RenderMode};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Trend,
    Distribution,
}

impl From<ModeArg> for RenderMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Trend => RenderMode::Trend,
            ModeArg::Distribution => RenderMode::Distribution,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Compare UCT and OLUCT variants over a failure-probability sweep"
)]
struct Cli {
    /// TOML configuration file (built-in long-run comparison when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output base directory; each run writes into a timestamped subdirectory
    #[arg(long, default_value = "output-oluct-compare")]
    output: PathBuf,

    /// Directory holding the result files
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Figure to render
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Natural-log transform every metric before aggregation
    #[arg(long)]
    log: bool,

    /// Print the aggregated data as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Tracing filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(report: &ComparisonReport) {
    match (&report.bundle, &report.distribution) {
        (Some(bundle), _) => println!(
            "Trend comparison complete. Sweep points: {} | Series: {} | Dropped rows: {}",
            bundle.sweep_values.len(),
            bundle.series.len(),
            bundle.dropped_rows
        ),
        (None, Some(dist)) => println!(
            "Distribution comparison complete. Sweep point: {} ({}) | Variants: {} | Dropped: {}",
            dist.sweep_token,
            dist.sweep_value,
            dist.samples.len(),
            dist.dropped_rows
        ),
        (None, None) => {}
    }
    println!("Run directory: {}", report.run_dir.display());
    println!("Figure: {}", report.figure_path.display());
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let mut cfg = match &cli.config {
        Some(path) => CompareConfig::from_toml_file(path)?,
        None => CompareConfig::default(),
    };
    if let Some(dir) = cli.base_dir {
        cfg.base_dir = dir;
    }
    if let Some(mode) = cli.mode {
        cfg.render_mode = mode.into();
    }
    if cli.log {
        cfg.use_log = true;
    }

    let report = run_comparison(&cfg, &cli.output).with_context(|| {
        format!("comparison of results in {} failed", cfg.base_dir.display())
    })?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
        println!("{json}");
    } else {
        print_summary(&report);
    }

    Ok(())
}
