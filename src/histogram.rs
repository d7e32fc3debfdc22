//! Shared binning for overlaid frequency histograms.

use serde::Serialize;

/// Range shared by every variant's histogram of one metric.
///
/// The lower bound is `min(0, smallest sample)`, or exactly 0 for metrics
/// known to be non-negative. The upper bound is the largest sample. Empty or
/// degenerate ranges are widened to a unit interval.
pub fn bin_range(samples: &[&[f64]], non_negative: bool) -> (f64, f64) {
    let (min, max) = samples
        .iter()
        .flat_map(|s| s.iter().copied())
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if !min.is_finite() {
        return (0.0, 1.0);
    }

    let lower = if non_negative { 0.0 } else { min.min(0.0) };
    let upper = if max > lower { max } else { lower + 1.0 };
    (lower, upper)
}

/// Frequency counts over `bins` equal-width bins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub lower: f64,
    pub upper: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Counts `values` into the bins. The last bin is closed on the right;
    /// values outside `[lower, upper]` are not counted.
    pub fn build(values: &[f64], lower: f64, upper: f64, bins: usize) -> Self {
        let bins = bins.max(1);
        let mut counts = vec![0; bins];
        let width = (upper - lower) / bins as f64;

        for &v in values {
            if !(lower..=upper).contains(&v) || width <= 0.0 {
                continue;
            }
            let idx = (((v - lower) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Self {
            lower,
            upper,
            counts,
        }
    }

    pub fn bin_width(&self) -> f64 {
        (self.upper - self.lower) / self.counts.len() as f64
    }

    /// `(left edge, right edge, count)` for every bin.
    pub fn bars(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        let width = self.bin_width();
        self.counts.iter().enumerate().map(move |(i, &c)| {
            let x0 = self.lower + i as f64 * width;
            (x0, x0 + width, c)
        })
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_negative_metrics_clamp_lower_bound_to_zero() {
        let a: &[f64] = &[-3.0, 4.0, 7.0];
        let b: &[f64] = &[1.0, 12.0];
        assert_eq!(bin_range(&[a, b], true), (0.0, 12.0));
        assert_eq!(bin_range(&[a, b], false), (-3.0, 12.0));
    }

    #[test]
    fn positive_samples_still_start_at_zero() {
        let a: &[f64] = &[5.0, 9.0];
        assert_eq!(bin_range(&[a], false), (0.0, 9.0));
    }

    #[test]
    fn degenerate_ranges_are_widened() {
        assert_eq!(bin_range(&[], true), (0.0, 1.0));
        let zeros: &[f64] = &[0.0, 0.0];
        assert_eq!(bin_range(&[zeros], true), (0.0, 1.0));
        let negative: &[f64] = &[-4.0, -2.0];
        assert_eq!(bin_range(&[negative], true), (0.0, 1.0));
    }

    #[test]
    fn counts_include_right_edge() {
        let h = Histogram::build(&[0.0, 0.5, 1.0, 9.99, 10.0, 10.5, -0.1], 0.0, 10.0, 10);
        assert_eq!(h.counts.len(), 10);
        assert_eq!(h.counts[0], 2);
        assert_eq!(h.counts[1], 1);
        assert_eq!(h.counts[9], 2);
        assert_eq!(h.counts.iter().sum::<usize>(), 5);
        assert_eq!(h.max_count(), 2);
    }

    #[test]
    fn bars_tile_the_range() {
        let h = Histogram::build(&[1.0, 2.0, 3.0], 0.0, 4.0, 4);
        let bars: Vec<_> = h.bars().collect();
        assert_eq!(bars.len(), 4);
        assert_eq!(bars[0], (0.0, 1.0, 0));
        assert_eq!(bars[3], (3.0, 4.0, 1));
    }
}
