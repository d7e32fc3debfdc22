//! Reading per-run result files.
//!
//! Each file is a comma-separated table with a header row and one row per
//! simulation run. Only the `score`, `computational_cost` and `nb_calls`
//! columns are read; any other column is ignored.

use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::metric::Metric;
use crate::CompareError;

/// What to do with a row whose required field is empty or `NA`/`NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Remove the row and count it in [`RunSample::dropped_rows`].
    #[default]
    Drop,
    /// Fail with a malformed-row error.
    Reject,
}

/// Samples of the three metrics loaded from one result file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSample {
    pub path: PathBuf,
    pub score: Vec<f64>,
    pub computational_cost: Vec<f64>,
    pub nb_calls: Vec<f64>,
    pub dropped_rows: usize,
}

impl RunSample {
    pub fn metric(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Score => &self.score,
            Metric::ComputationalCost => &self.computational_cost,
            Metric::NbCalls => &self.nb_calls,
        }
    }

    pub fn runs(&self) -> usize {
        self.score.len()
    }
}

enum Field {
    Value(f64),
    Missing,
    Malformed,
}

fn parse_field(raw: Option<&str>) -> Field {
    let Some(raw) = raw else {
        return Field::Missing;
    };
    if raw.is_empty() || raw.eq_ignore_ascii_case("na") || raw.eq_ignore_ascii_case("nan") {
        return Field::Missing;
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Field::Value(v),
        _ => Field::Malformed,
    }
}

fn column_index(
    headers: &StringRecord,
    path: &Path,
    metric: Metric,
) -> Result<usize, CompareError> {
    headers
        .iter()
        .position(|h| h == metric.column())
        .ok_or_else(|| CompareError::MissingColumn {
            path: path.to_path_buf(),
            column: metric.column(),
        })
}

pub fn load_run_sample(
    path: &Path,
    missing: MissingValuePolicy,
) -> Result<RunSample, CompareError> {
    if !path.exists() {
        return Err(CompareError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let mut indices = [0_usize; 3];
    for (slot, metric) in indices.iter_mut().zip(Metric::ALL) {
        *slot = column_index(&headers, path, metric)?;
    }

    let mut sample = RunSample {
        path: path.to_path_buf(),
        score: Vec::new(),
        computational_cost: Vec::new(),
        nb_calls: Vec::new(),
        dropped_rows: 0,
    };

    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        // header is line 1
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(row_idx as u64 + 2);

        let mut row = [0.0_f64; 3];
        let mut has_missing = false;
        for ((value, &idx), metric) in row.iter_mut().zip(&indices).zip(Metric::ALL) {
            let raw = record.get(idx);
            match parse_field(raw) {
                Field::Value(v) => *value = v,
                Field::Missing if missing == MissingValuePolicy::Drop => has_missing = true,
                Field::Missing | Field::Malformed => {
                    return Err(CompareError::MalformedRow {
                        path: path.to_path_buf(),
                        line,
                        column: metric.column(),
                        value: raw.unwrap_or_default().to_string(),
                    });
                }
            }
        }

        if has_missing {
            sample.dropped_rows += 1;
            continue;
        }
        sample.score.push(row[0]);
        sample.computational_cost.push(row[1]);
        sample.nb_calls.push(row[2]);
    }

    if sample.dropped_rows > 0 {
        warn!(
            path = %path.display(),
            dropped = sample.dropped_rows,
            kept = sample.runs(),
            "dropped rows with missing values"
        );
    }
    debug!(path = %path.display(), runs = sample.runs(), "loaded run sample");

    Ok(sample)
}
