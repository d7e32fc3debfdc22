use std::fmt;

use serde::{Deserialize, Serialize};

/// One measured quantity per simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Time steps needed to reach the goal (the loss).
    Score,
    /// Wall-clock planning cost [ms]
    ComputationalCost,
    /// Number of generative model calls
    NbCalls,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Score, Metric::ComputationalCost, Metric::NbCalls];

    /// Header of the CSV column holding this metric.
    pub fn column(self) -> &'static str {
        match self {
            Metric::Score => "score",
            Metric::ComputationalCost => "computational_cost",
            Metric::NbCalls => "nb_calls",
        }
    }

    pub fn axis_label(self, log: bool) -> &'static str {
        match (self, log) {
            (Metric::Score, false) => "Loss (time steps to the goal)",
            (Metric::Score, true) => "Log of the loss (time steps to the goal)",
            (Metric::ComputationalCost, false) => "Computational cost (ms)",
            (Metric::ComputationalCost, true) => "Log of the computational cost (ms)",
            (Metric::NbCalls, false) => "Number of call",
            (Metric::NbCalls, true) => "Log of the number of call",
        }
    }

    /// Scores are never negative, so their histogram range starts at zero.
    pub fn is_non_negative(self) -> bool {
        matches!(self, Metric::Score)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_match_csv_headers() {
        let columns: Vec<_> = Metric::ALL.iter().map(|m| m.column()).collect();
        assert_eq!(columns, ["score", "computational_cost", "nb_calls"]);
    }

    #[test]
    fn log_labels_differ_from_plain_labels() {
        for metric in Metric::ALL {
            assert_ne!(metric.axis_label(false), metric.axis_label(true));
            assert!(metric.axis_label(true).starts_with("Log of the"));
        }
    }
}
