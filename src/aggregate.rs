//! Reduction of per-run samples into per-variant statistic series.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{SweepPoint, VariantConfig};
use crate::loader::{load_run_sample, MissingValuePolicy, RunSample};
use crate::metric::Metric;
use crate::naming::PathResolver;
use crate::stats::summarize;
use crate::transform::TransformPolicy;
use crate::CompareError;

/// Mean and standard deviation of one metric for one variant, one entry per
/// sweep point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub variant_id: String,
    pub metric: Metric,
    pub means: Vec<f64>,
    pub stddevs: Vec<f64>,
}

impl MetricSeries {
    fn new(variant_id: &str, metric: Metric, capacity: usize) -> Self {
        Self {
            variant_id: variant_id.to_string(),
            metric,
            means: Vec::with_capacity(capacity),
            stddevs: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    /// `(lower, upper)` = mean -/+ stddev at each sweep point.
    pub fn band(&self) -> Vec<(f64, f64)> {
        self.means
            .iter()
            .zip(&self.stddevs)
            .map(|(m, s)| (m - s, m + s))
            .collect()
    }
}

/// All statistic series of one sweep, aligned with `sweep_values`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonBundle {
    pub sweep_tokens: Vec<String>,
    pub sweep_values: Vec<f64>,
    pub series: Vec<MetricSeries>,
    /// Rows removed by the missing-value policy across all files.
    pub dropped_rows: usize,
}

impl ComparisonBundle {
    pub fn get(&self, variant_id: &str, metric: Metric) -> Option<&MetricSeries> {
        self.series
            .iter()
            .find(|s| s.variant_id == variant_id && s.metric == metric)
    }

    pub fn for_metric(&self, metric: Metric) -> impl Iterator<Item = &MetricSeries> {
        self.series.iter().filter(move |s| s.metric == metric)
    }
}

/// Transformed per-run samples of every variant at a single sweep point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionBundle {
    pub sweep_token: String,
    pub sweep_value: f64,
    pub samples: Vec<VariantSamples>,
    pub dropped_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantSamples {
    pub variant_id: String,
    pub score: Vec<f64>,
    pub computational_cost: Vec<f64>,
    pub nb_calls: Vec<f64>,
}

impl VariantSamples {
    pub fn metric(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Score => &self.score,
            Metric::ComputationalCost => &self.computational_cost,
            Metric::NbCalls => &self.nb_calls,
        }
    }
}

impl DistributionBundle {
    pub fn metric_samples(&self, metric: Metric) -> Vec<&[f64]> {
        self.samples.iter().map(|s| s.metric(metric)).collect()
    }
}

fn load_transformed(
    resolver: &PathResolver,
    variant: &VariantConfig,
    point: &SweepPoint,
    policy: &TransformPolicy,
    missing: MissingValuePolicy,
) -> Result<(RunSample, [Vec<f64>; 3]), CompareError> {
    let path = resolver.resolve(variant, point)?;
    let sample = load_run_sample(&path, missing)?;

    let mut transformed: [Vec<f64>; 3] = Default::default();
    for (slot, metric) in transformed.iter_mut().zip(Metric::ALL) {
        let values = sample.metric(metric);
        if values.is_empty() {
            return Err(CompareError::EmptySample {
                path: sample.path.clone(),
                metric,
            });
        }
        *slot = policy.apply(&sample.path, metric, values)?;
    }
    Ok((sample, transformed))
}

/// Walks the sweep in order and reduces every (variant, metric) pair into a
/// [`MetricSeries`]. Any failing file aborts the whole run; no partial bundle
/// is returned.
pub fn aggregate_sweep(
    sweep: &[SweepPoint],
    variants: &[VariantConfig],
    resolver: &PathResolver,
    policy: &TransformPolicy,
    missing: MissingValuePolicy,
) -> Result<ComparisonBundle, CompareError> {
    let mut series: Vec<MetricSeries> = variants
        .iter()
        .flat_map(|v| Metric::ALL.map(|m| MetricSeries::new(&v.id, m, sweep.len())))
        .collect();
    let mut dropped_rows = 0;

    for point in sweep {
        for (v_idx, variant) in variants.iter().enumerate() {
            let (sample, transformed) =
                load_transformed(resolver, variant, point, policy, missing)?;
            dropped_rows += sample.dropped_rows;

            for (m_idx, values) in transformed.iter().enumerate() {
                let summary = summarize(values).ok_or_else(|| CompareError::EmptySample {
                    path: sample.path.clone(),
                    metric: Metric::ALL[m_idx],
                })?;
                let target = &mut series[v_idx * Metric::ALL.len() + m_idx];
                target.means.push(summary.mean);
                target.stddevs.push(summary.stddev);
            }
            debug!(
                variant = %variant.id,
                sweep = %point.token,
                runs = sample.runs(),
                "aggregated result file"
            );
        }
    }

    debug_assert!(series.iter().all(|s| s.len() == sweep.len()));
    info!(
        points = sweep.len(),
        variants = variants.len(),
        dropped_rows,
        "sweep aggregated"
    );

    Ok(ComparisonBundle {
        sweep_tokens: sweep.iter().map(|p| p.token.clone()).collect(),
        sweep_values: sweep.iter().map(|p| p.value).collect(),
        series,
        dropped_rows,
    })
}

/// Loads every variant's samples at one sweep point for histogram display.
pub fn collect_distribution(
    point: &SweepPoint,
    variants: &[VariantConfig],
    resolver: &PathResolver,
    policy: &TransformPolicy,
    missing: MissingValuePolicy,
) -> Result<DistributionBundle, CompareError> {
    let mut samples = Vec::with_capacity(variants.len());
    let mut dropped_rows = 0;

    for variant in variants {
        let (sample, [score, computational_cost, nb_calls]) =
            load_transformed(resolver, variant, point, policy, missing)?;
        dropped_rows += sample.dropped_rows;
        samples.push(VariantSamples {
            variant_id: variant.id.clone(),
            score,
            computational_cost,
            nb_calls,
        });
    }

    info!(
        sweep = %point.token,
        variants = variants.len(),
        dropped_rows,
        "distribution samples collected"
    );

    Ok(DistributionBundle {
        sweep_token: point.token.clone(),
        sweep_value: point.value,
        samples,
        dropped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rgb;
    use crate::naming::NamingLayout;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const HEADER: &str = "score,computational_cost,nb_calls\n";

    fn variant(id: &str) -> VariantConfig {
        VariantConfig {
            id: id.to_string(),
            display_name: id.to_string(),
            color: Rgb(0, 0, 0),
            params: BTreeMap::new(),
        }
    }

    fn point(token: &str, value: f64) -> SweepPoint {
        SweepPoint {
            token: token.to_string(),
            value,
        }
    }

    fn resolver(dir: &Path) -> PathResolver {
        let layout = NamingLayout::parse("{variant}_25_{sweep}_40_{sweep}").unwrap();
        PathResolver::new(dir, layout, BTreeMap::new())
    }

    fn write_runs(dir: &Path, variant: &str, token: &str, rows: &[(f64, f64, f64)]) {
        let mut body = HEADER.to_string();
        for (s, c, n) in rows {
            body.push_str(&format!("{s},{c},{n}\n"));
        }
        fs::write(dir.join(format!("{variant}_25_{token}_40_{token}.csv")), body).unwrap();
    }

    #[test]
    fn series_are_aligned_with_the_sweep() {
        let dir = TempDir::new().unwrap();
        let sweep = [point("000", 0.0), point("050", 0.5), point("1", 1.0)];
        for (i, p) in sweep.iter().enumerate() {
            let base = 10.0 * (i as f64 + 1.0);
            write_runs(dir.path(), "A", &p.token, &[(base, 1.0, 100.0), (base, 3.0, 300.0)]);
            let rows = [(base + 1.0, 2.0, 5.0), (base + 3.0, 2.0, 7.0)];
            write_runs(dir.path(), "B", &p.token, &rows);
        }

        let bundle = aggregate_sweep(
            &sweep,
            &[variant("A"), variant("B")],
            &resolver(dir.path()),
            &TransformPolicy::uniform(false),
            MissingValuePolicy::Drop,
        )
        .unwrap();

        assert_eq!(bundle.series.len(), 6);
        assert_eq!(bundle.sweep_values, vec![0.0, 0.5, 1.0]);
        for s in &bundle.series {
            assert_eq!(s.means.len(), 3);
            assert_eq!(s.stddevs.len(), 3);
        }

        let a_score = bundle.get("A", Metric::Score).unwrap();
        assert_eq!(a_score.means, vec![10.0, 20.0, 30.0]);
        assert_eq!(a_score.stddevs, vec![0.0, 0.0, 0.0]);

        let b_score = bundle.get("B", Metric::Score).unwrap();
        assert_eq!(b_score.means, vec![12.0, 22.0, 32.0]);
        assert_relative_eq!(b_score.stddevs[0], 2.0_f64.sqrt(), max_relative = 1e-12);

        let a_cost = bundle.get("A", Metric::ComputationalCost).unwrap();
        assert_eq!(a_cost.band()[0], (2.0 - 2.0_f64.sqrt(), 2.0 + 2.0_f64.sqrt()));
        assert_eq!(bundle.for_metric(Metric::NbCalls).count(), 2);
    }

    #[test]
    fn single_gap_fails_the_whole_batch() {
        let dir = TempDir::new().unwrap();
        let sweep = [point("000", 0.0), point("050", 0.5), point("1", 1.0)];
        write_runs(dir.path(), "A", "000", &[(10.0, 1.0, 1.0), (10.0, 1.0, 1.0)]);
        write_runs(dir.path(), "B", "000", &[(20.0, 1.0, 1.0), (20.0, 1.0, 1.0)]);
        write_runs(dir.path(), "A", "050", &[(15.0, 1.0, 1.0)]);
        write_runs(dir.path(), "A", "1", &[(30.0, 1.0, 1.0)]);
        write_runs(dir.path(), "B", "1", &[(5.0, 1.0, 1.0), (15.0, 1.0, 1.0)]);

        let err = aggregate_sweep(
            &sweep,
            &[variant("A"), variant("B")],
            &resolver(dir.path()),
            &TransformPolicy::uniform(false),
            MissingValuePolicy::Drop,
        )
        .unwrap_err();

        match err {
            CompareError::MissingFile { path } => {
                assert_eq!(path, dir.path().join("B_25_050_40_050.csv"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_sample_is_an_error() {
        let dir = TempDir::new().unwrap();
        let sweep = [point("000", 0.0)];
        write_runs(dir.path(), "A", "000", &[]);

        let err = aggregate_sweep(
            &sweep,
            &[variant("A")],
            &resolver(dir.path()),
            &TransformPolicy::uniform(false),
            MissingValuePolicy::Drop,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CompareError::EmptySample {
                metric: Metric::Score,
                ..
            }
        ));
    }

    #[test]
    fn rows_dropped_to_nothing_are_an_empty_sample() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("A_25_000_40_000.csv"),
            format!("{HEADER}NA,1,2\n3,,4\n"),
        )
        .unwrap();

        let err = aggregate_sweep(
            &[point("000", 0.0)],
            &[variant("A")],
            &resolver(dir.path()),
            &TransformPolicy::uniform(false),
            MissingValuePolicy::Drop,
        )
        .unwrap_err();
        assert!(matches!(err, CompareError::EmptySample { .. }));
    }

    #[test]
    fn log_policy_is_applied_before_statistics() {
        let dir = TempDir::new().unwrap();
        let e = std::f64::consts::E;
        write_runs(dir.path(), "A", "000", &[(1.0, 1.0, 1.0), (e * e, 1.0, 1.0)]);

        let bundle = aggregate_sweep(
            &[point("000", 0.0)],
            &[variant("A")],
            &resolver(dir.path()),
            &TransformPolicy::uniform(true),
            MissingValuePolicy::Drop,
        )
        .unwrap();
        let score = bundle.get("A", Metric::Score).unwrap();
        assert_relative_eq!(score.means[0], 1.0, max_relative = 1e-12);
        assert_eq!(bundle.get("A", Metric::NbCalls).unwrap().means[0], 0.0);
    }

    #[test]
    fn log_of_zero_cost_aborts_aggregation() {
        let dir = TempDir::new().unwrap();
        write_runs(dir.path(), "A", "000", &[(3.0, 0.0, 1.0)]);

        let err = aggregate_sweep(
            &[point("000", 0.0)],
            &[variant("A")],
            &resolver(dir.path()),
            &TransformPolicy::uniform(true),
            MissingValuePolicy::Drop,
        )
        .unwrap_err();
        assert!(err.to_string().contains("A_25_000_40_000.csv"));
        match err {
            CompareError::Domain {
                path,
                metric,
                index,
                ..
            } => {
                assert_eq!(path, dir.path().join("A_25_000_40_000.csv"));
                assert_eq!(metric, Metric::ComputationalCost);
                assert_eq!(index, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn distribution_collects_every_variant() {
        let dir = TempDir::new().unwrap();
        write_runs(dir.path(), "A", "02", &[(3.0, 1.0, 10.0), (4.0, 2.0, 12.0)]);
        write_runs(dir.path(), "B", "02", &[(8.0, 5.0, 40.0)]);

        let dist = collect_distribution(
            &point("02", 0.2),
            &[variant("A"), variant("B")],
            &resolver(dir.path()),
            &TransformPolicy::uniform(false),
            MissingValuePolicy::Drop,
        )
        .unwrap();
        assert_eq!(dist.sweep_token, "02");
        assert_eq!(dist.samples.len(), 2);
        assert_eq!(dist.samples[1].nb_calls, vec![40.0]);
        let scores = dist.metric_samples(Metric::Score);
        assert_eq!(scores, vec![&[3.0, 4.0][..], &[8.0][..]]);
    }
}
