//! Trend and distribution figures drawn with the bitmap backend.

use std::fs;
use std::path::Path;

use anyhow::Context;
use plotters::prelude::*;

use crate::aggregate::{ComparisonBundle, DistributionBundle, MetricSeries};
use crate::config::{Rgb, VariantConfig};
use crate::histogram::{bin_range, Histogram};
use crate::metric::Metric;
use crate::transform::TransformPolicy;
use crate::CompareError;

/// Pixel size of a three-panel figure.
pub const FIGURE_SIZE: (u32, u32) = (1280, 1440);

const SWEEP_AXIS_LABEL: &str = "Transition failure probability";
const FREQUENCY_AXIS_LABEL: &str = "Frequency";
const BAND_OPACITY: f64 = 0.1;
const BAR_OPACITY: f64 = 0.5;

fn rgb(color: Rgb) -> RGBColor {
    RGBColor(color.0, color.1, color.2)
}

fn variant_for<'a>(variants: &'a [VariantConfig], id: &str) -> anyhow::Result<&'a VariantConfig> {
    variants
        .iter()
        .find(|v| v.id == id)
        .with_context(|| format!("no variant configured for series `{id}`"))
}

/// Finite `(min, max)` of `values` with 5% head-room on both sides.
pub(crate) fn padded_range(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    let pad = if span > 0.0 {
        span * 0.05
    } else {
        (hi.abs() * 0.05).max(0.5)
    };
    (lo - pad, hi + pad)
}

/// Closed outline of the `mean -/+ stddev` band: upper edge left to right,
/// then lower edge right to left.
pub(crate) fn band_outline(xs: &[f64], series: &MetricSeries) -> Vec<(f64, f64)> {
    let band = series.band();
    let mut outline: Vec<(f64, f64)> =
        xs.iter().zip(&band).map(|(&x, &(_, hi))| (x, hi)).collect();
    outline.extend(xs.iter().zip(&band).rev().map(|(&x, &(lo, _))| (x, lo)));
    outline
}

/// One panel per metric with mean lines, error bars and shaded deviation
/// bands for every variant.
pub fn render_trend(
    bundle: &ComparisonBundle,
    variants: &[VariantConfig],
    policy: &TransformPolicy,
    path: &Path,
) -> Result<(), CompareError> {
    draw_trend(bundle, variants, policy, path)
        .map_err(|e| CompareError::Render(format!("{}: {e:#}", path.display())))
}

fn draw_trend(
    bundle: &ComparisonBundle,
    variants: &[VariantConfig],
    policy: &TransformPolicy,
    path: &Path,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((Metric::ALL.len(), 1));

    let xs = &bundle.sweep_values;
    let (x_min, x_max) = padded_range(xs.iter().copied());

    for (panel, metric) in panels.iter().zip(Metric::ALL) {
        let series: Vec<&MetricSeries> = bundle.for_metric(metric).collect();
        let (y_min, y_max) = padded_range(
            series
                .iter()
                .flat_map(|s| s.band())
                .flat_map(|(lo, hi)| [lo, hi]),
        );

        let mut chart = ChartBuilder::on(panel)
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(80)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

        chart
            .configure_mesh()
            .x_desc(SWEEP_AXIS_LABEL)
            .y_desc(metric.axis_label(policy.get(metric).is_log()))
            .draw()?;

        for s in series {
            let variant = variant_for(variants, &s.variant_id)?;
            let color = rgb(variant.color);

            chart.draw_series(std::iter::once(Polygon::new(
                band_outline(xs, s),
                color.mix(BAND_OPACITY).filled(),
            )))?;

            chart.draw_series(xs.iter().zip(s.means.iter().zip(&s.stddevs)).map(
                |(&x, (&m, &sd))| {
                    ErrorBar::new_vertical(x, m - sd, m, m + sd, color.filled(), 10)
                },
            ))?;

            chart
                .draw_series(LineSeries::new(
                    xs.iter().copied().zip(s.means.iter().copied()),
                    color.stroke_width(2),
                ))?
                .label(variant.display_name.clone())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 25, y)], color.stroke_width(3))
                });

            chart.draw_series(
                xs.iter()
                    .zip(&s.means)
                    .map(|(&x, &m)| Circle::new((x, m), 4, color.filled())),
            )?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .border_style(BLACK)
            .background_style(WHITE.mix(0.7))
            .draw()?;
    }

    root.present()?;
    Ok(())
}

/// One panel per metric with semi-transparent histograms of every variant
/// drawn over a shared bin range.
pub fn render_distribution(
    dist: &DistributionBundle,
    variants: &[VariantConfig],
    policy: &TransformPolicy,
    bins: usize,
    path: &Path,
) -> Result<(), CompareError> {
    draw_distribution(dist, variants, policy, bins, path)
        .map_err(|e| CompareError::Render(format!("{}: {e:#}", path.display())))
}

/// Histograms of one metric for every variant, binned over the shared range.
pub fn metric_histograms(
    dist: &DistributionBundle,
    metric: Metric,
    policy: &TransformPolicy,
    bins: usize,
) -> Vec<Histogram> {
    let samples = dist.metric_samples(metric);
    // ln can push values below zero, so the clamp only holds for raw values.
    let clamp = metric.is_non_negative() && !policy.get(metric).is_log();
    let (lower, upper) = bin_range(&samples, clamp);
    samples
        .iter()
        .map(|s| Histogram::build(s, lower, upper, bins))
        .collect()
}

fn draw_distribution(
    dist: &DistributionBundle,
    variants: &[VariantConfig],
    policy: &TransformPolicy,
    bins: usize,
    path: &Path,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((Metric::ALL.len(), 1));

    for (panel, metric) in panels.iter().zip(Metric::ALL) {
        let histograms = metric_histograms(dist, metric, policy, bins);
        let (lower, upper) = histograms
            .first()
            .map(|h| (h.lower, h.upper))
            .unwrap_or((0.0, 1.0));
        let y_max = histograms
            .iter()
            .map(Histogram::max_count)
            .max()
            .unwrap_or(0)
            .max(1) as f64
            * 1.1;

        let mut chart = ChartBuilder::on(panel)
            .caption(
                format!("{SWEEP_AXIS_LABEL} {}", dist.sweep_value),
                ("sans-serif", 22).into_font(),
            )
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(70)
            .build_cartesian_2d(lower..upper, 0.0..y_max)?;

        chart
            .configure_mesh()
            .x_desc(metric.axis_label(policy.get(metric).is_log()))
            .y_desc(FREQUENCY_AXIS_LABEL)
            .draw()?;

        for (hist, samples) in histograms.iter().zip(&dist.samples) {
            let variant = variant_for(variants, &samples.variant_id)?;
            let color = rgb(variant.color);

            chart
                .draw_series(hist.bars().map(|(x0, x1, count)| {
                    Rectangle::new(
                        [(x0, 0.0), (x1, count as f64)],
                        color.mix(BAR_OPACITY).filled(),
                    )
                }))?
                .label(variant.display_name.clone())
                .legend(move |(x, y)| {
                    Rectangle::new(
                        [(x, y - 6), (x + 18, y + 6)],
                        color.mix(BAR_OPACITY).filled(),
                    )
                });
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .border_style(BLACK)
            .background_style(WHITE.mix(0.7))
            .draw()?;
    }

    root.present()?;
    Ok(())
}
