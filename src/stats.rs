use serde::Serialize;

/// Mean and sample standard deviation of one group of runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub mean: f64,
    pub stddev: f64,
    pub count: usize,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Unbiased (N-1) standard deviation. A single sample has no spread and
/// yields 0.0.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if values.len() == 1 {
        return Some(0.0);
    }
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

pub fn summarize(values: &[f64]) -> Option<Summary> {
    Some(Summary {
        mean: mean(values)?,
        stddev: sample_std(values)?,
        count: values.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, Normal};

    fn random_samples(seed: u64, n: usize) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let normal = Normal::new(40.0, 12.0).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    #[test]
    fn matches_hand_computed_values() {
        let s = summarize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_relative_eq!(s.mean, 5.0);
        assert_relative_eq!(s.stddev, (32.0_f64 / 7.0).sqrt(), max_relative = 1e-12);
        assert_eq!(s.count, 8);
    }

    #[test]
    fn empty_input_has_no_summary() {
        assert!(mean(&[]).is_none());
        assert!(sample_std(&[]).is_none());
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn single_sample_has_zero_spread() {
        let s = summarize(&[12.0]).unwrap();
        assert_eq!(s.mean, 12.0);
        assert_eq!(s.stddev, 0.0);
    }

    #[test]
    fn std_is_translation_invariant() {
        for seed in 0..16 {
            let x = random_samples(seed, 64);
            let base = sample_std(&x).unwrap();
            for c in [-250.0, -1.5, 0.3, 1e3] {
                let shifted: Vec<f64> = x.iter().map(|v| v + c).collect();
                assert_relative_eq!(sample_std(&shifted).unwrap(), base, max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn std_scales_with_absolute_factor() {
        for seed in 0..16 {
            let x = random_samples(seed + 100, 64);
            let base = sample_std(&x).unwrap();
            for k in [-3.0_f64, -0.5, 0.25, 10.0] {
                let scaled: Vec<f64> = x.iter().map(|v| k * v).collect();
                assert_relative_eq!(
                    sample_std(&scaled).unwrap(),
                    k.abs() * base,
                    max_relative = 1e-9
                );
            }
        }
    }
}
