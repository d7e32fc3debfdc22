//! Monotonic transforms applied to samples before any statistic is taken.

use std::path::Path;

use serde::Serialize;

use crate::metric::Metric;
use crate::CompareError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    #[default]
    Identity,
    /// Natural logarithm; undefined for values <= 0.
    Ln,
}

impl Transform {
    pub fn from_flag(use_log: bool) -> Self {
        if use_log {
            Transform::Ln
        } else {
            Transform::Identity
        }
    }

    pub fn is_log(self) -> bool {
        self == Transform::Ln
    }

    /// Transforms the `metric` samples loaded from `path`.
    pub fn apply(
        self,
        path: &Path,
        metric: Metric,
        values: &[f64],
    ) -> Result<Vec<f64>, CompareError> {
        match self {
            Transform::Identity => Ok(values.to_vec()),
            Transform::Ln => values
                .iter()
                .enumerate()
                .map(|(index, &value)| {
                    if value > 0.0 {
                        Ok(value.ln())
                    } else {
                        Err(CompareError::Domain {
                            path: path.to_path_buf(),
                            metric,
                            index,
                            value,
                        })
                    }
                })
                .collect(),
        }
    }
}

/// Applies `ln` when `use_log` is set, otherwise returns the samples unchanged.
pub fn transform(
    path: &Path,
    metric: Metric,
    values: &[f64],
    use_log: bool,
) -> Result<Vec<f64>, CompareError> {
    Transform::from_flag(use_log).apply(path, metric, values)
}

/// Transform chosen for each metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TransformPolicy {
    pub score: Transform,
    pub computational_cost: Transform,
    pub nb_calls: Transform,
}

impl TransformPolicy {
    /// Same transform for all metrics.
    pub fn uniform(use_log: bool) -> Self {
        let t = Transform::from_flag(use_log);
        Self {
            score: t,
            computational_cost: t,
            nb_calls: t,
        }
    }

    pub fn get(&self, metric: Metric) -> Transform {
        match metric {
            Metric::Score => self.score,
            Metric::ComputationalCost => self.computational_cost,
            Metric::NbCalls => self.nb_calls,
        }
    }

    pub fn set(&mut self, metric: Metric, transform: Transform) {
        match metric {
            Metric::Score => self.score = transform,
            Metric::ComputationalCost => self.computational_cost = transform,
            Metric::NbCalls => self.nb_calls = transform,
        }
    }

    pub fn apply(
        &self,
        path: &Path,
        metric: Metric,
        values: &[f64],
    ) -> Result<Vec<f64>, CompareError> {
        self.get(metric).apply(path, metric, values)
    }
}
