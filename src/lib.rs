//! Sweep comparison of UCT/OLUCT planner variants.
//!
//! Locates per-configuration result files through a naming layout, loads the
//! per-run `score`, `computational_cost` and `nb_calls` samples, optionally
//! log-transforms them, reduces each (variant, metric) pair to mean and
//! standard deviation along the transition-failure-probability sweep, and
//! renders trend or distribution figures.

pub mod aggregate;
pub mod config;
pub mod histogram;
pub mod loader;
pub mod metric;
pub mod naming;
pub mod render;
pub mod stats;
pub mod transform;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

pub use aggregate::{
    aggregate_sweep, collect_distribution, ComparisonBundle, DistributionBundle, MetricSeries,
};
pub use config::{CompareConfig, RenderConfig, RenderMode, SweepPoint, VariantConfig};
pub use loader::{load_run_sample, MissingValuePolicy, RunSample};
pub use metric::Metric;
pub use naming::{LayoutPreset, NamingLayout, PathResolver};
pub use transform::{transform, Transform, TransformPolicy};

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("result file not found: {}", .path.display())]
    MissingFile { path: PathBuf },
    #[error("{}: missing required column `{column}`", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("{}:{line}: malformed value {value:?} in column `{column}`", .path.display())]
    MalformedRow {
        path: PathBuf,
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error(
        "{}: cannot take the log of {value} (`{metric}` sample {index})",
        .path.display()
    )]
    Domain {
        path: PathBuf,
        metric: Metric,
        index: usize,
        value: f64,
    },
    #[error("{}: no usable `{metric}` samples", .path.display())]
    EmptySample { path: PathBuf, metric: Metric },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("render error: {0}")]
    Render(String),
}

/// What one analysis run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub mode: RenderMode,
    pub run_dir: PathBuf,
    pub figure_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle: Option<ComparisonBundle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<DistributionBundle>,
}

/// Validates `config`, aggregates the result files and renders the figure
/// into a fresh timestamped directory under `output_dir`.
pub fn run_comparison(
    config: &CompareConfig,
    output_dir: &Path,
) -> Result<ComparisonReport, CompareError> {
    let render = config.resolve()?;
    info!(
        base_dir = %render.resolver.base_dir().display(),
        layout = %render.resolver.layout(),
        sweep_slots = render.resolver.layout().sweep_occurrences(),
        mode = ?render.render_mode,
        "starting comparison"
    );

    match render.render_mode {
        RenderMode::Trend => {
            let bundle = aggregate_sweep(
                &render.sweep,
                &render.variants,
                &render.resolver,
                &render.policy,
                render.missing_values,
            )?;
            let run_dir = create_timestamped_run_dir(output_dir)?;
            let figure_path = run_dir.join("trend.png");
            render::render_trend(&bundle, &render.variants, &render.policy, &figure_path)?;
            info!(figure = %figure_path.display(), "trend figure written");

            Ok(ComparisonReport {
                mode: RenderMode::Trend,
                run_dir,
                figure_path,
                bundle: Some(bundle),
                distribution: None,
            })
        }
        RenderMode::Distribution => {
            let point = &render.distribution_point;
            let dist = collect_distribution(
                point,
                &render.variants,
                &render.resolver,
                &render.policy,
                render.missing_values,
            )?;
            let run_dir = create_timestamped_run_dir(output_dir)?;
            let figure_path = run_dir.join(format!("distribution_{}.png", point.token));
            render::render_distribution(
                &dist,
                &render.variants,
                &render.policy,
                render.bins,
                &figure_path,
            )?;
            info!(figure = %figure_path.display(), "distribution figure written");

            Ok(ComparisonReport {
                mode: RenderMode::Distribution,
                run_dir,
                figure_path,
                bundle: None,
                distribution: Some(dist),
            })
        }
    }
}

pub fn create_timestamped_run_dir(base_dir: &Path) -> Result<PathBuf, CompareError> {
    fs::create_dir_all(base_dir)?;

    let timestamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
    let mut run_dir = base_dir.join(&timestamp);
    let mut counter: usize = 1;
    while run_dir.exists() {
        run_dir = base_dir.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&run_dir)?;
    Ok(run_dir)
}
