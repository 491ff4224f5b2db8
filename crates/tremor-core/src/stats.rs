// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Realization Statistics
// ─────────────────────────────────────────────────────────────────────
//! Weighted mean and quantiles across realizations, evaluated
//! independently at every fixed level.

use serde::{Deserialize, Serialize};

/// Which statistic of the realization ensemble a curve represents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Statistic {
    Realization(usize),
    Mean,
    Quantile(f64),
}

pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    values.iter().zip(weights).map(|(v, w)| v * w).sum()
}

/// Quantile of the weighted empirical distribution: values sorted,
/// weights accumulated, and `q` interpolated linearly on the cumulative
/// weights. Clamped to the smallest/largest value outside the range.
pub fn weighted_quantile(values: &[f64], weights: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut pairs: Vec<(f64, f64)> = values.iter().copied().zip(weights.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut cumulative = 0.0;
    let cum: Vec<f64> = pairs
        .iter()
        .map(|(_, w)| {
            cumulative += w;
            cumulative
        })
        .collect();
    if q <= cum[0] {
        return pairs[0].0;
    }
    for i in 1..pairs.len() {
        if q <= cum[i] {
            let span = cum[i] - cum[i - 1];
            if span <= 0.0 {
                return pairs[i].0;
            }
            let t = (q - cum[i - 1]) / span;
            return pairs[i - 1].0 + t * (pairs[i].0 - pairs[i - 1].0);
        }
    }
    pairs[pairs.len() - 1].0
}

/// Apply `stat` level by level to a set of equally shaped curves.
pub fn reduce_curves(curves: &[&[f64]], weights: &[f64], stat: Statistic) -> Vec<f64> {
    let Some(first) = curves.first() else {
        return Vec::new();
    };
    let mut column = vec![0.0; curves.len()];
    (0..first.len())
        .map(|l| {
            for (c, curve) in column.iter_mut().zip(curves) {
                *c = curve[l];
            }
            match stat {
                Statistic::Mean => weighted_mean(&column, weights),
                Statistic::Quantile(q) => weighted_quantile(&column, weights, q),
                Statistic::Realization(r) => column[r],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_weighted_mean() {
        assert!((weighted_mean(&[1.0, 3.0], &[0.25, 0.75]) - 2.5).abs() < 1e-15);
    }

    #[test]
    fn test_quantile_interpolation() {
        let v = [3.0, 1.0, 2.0];
        let w = [1.0 / 3.0; 3];
        assert_eq!(weighted_quantile(&v, &w, 0.0), 1.0);
        assert_eq!(weighted_quantile(&v, &w, 1.0), 3.0);
        // halfway between cumulative 1/3 and 2/3
        assert!((weighted_quantile(&v, &w, 0.5) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_single_value() {
        assert_eq!(weighted_quantile(&[0.2], &[1.0], 0.84), 0.2);
    }

    #[test]
    fn test_reduce_curves() {
        let a = [0.5, 0.1];
        let b = [0.3, 0.05];
        let curves: Vec<&[f64]> = vec![&a, &b];
        let mean = reduce_curves(&curves, &[0.5, 0.5], Statistic::Mean);
        assert!((mean[0] - 0.4).abs() < 1e-15);
        assert_eq!(reduce_curves(&curves, &[0.5, 0.5], Statistic::Realization(1)), b.to_vec());
    }

    proptest! {
        #[test]
        fn prop_statistics_keep_curves_monotonic(
            tops in prop::collection::vec(0.0f64..1.0, 1..8),
            q in 0.0f64..1.0,
        ) {
            // each curve decays geometrically from its top value
            let curves: Vec<Vec<f64>> = tops
                .iter()
                .enumerate()
                .map(|(i, t)| (0..6).map(|l| t * (0.5 + 0.05 * i as f64).powi(l)).collect())
                .collect();
            let refs: Vec<&[f64]> = curves.iter().map(|c| c.as_slice()).collect();
            let w = vec![1.0 / curves.len() as f64; curves.len()];
            for stat in [Statistic::Mean, Statistic::Quantile(q)] {
                let out = reduce_curves(&refs, &w, stat);
                prop_assert!(out.windows(2).all(|p| p[1] <= p[0] + 1e-15), "{:?}", out);
            }
        }
    }
}
