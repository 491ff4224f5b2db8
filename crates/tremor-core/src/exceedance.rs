// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Exceedance Integrator
// ─────────────────────────────────────────────────────────────────────
//! Probability that a log-normal ground motion exceeds a level, with
//! optional symmetric truncation of the residual, and the conversions
//! between annual rates and probabilities over an investigation time.
//!
//! All accumulation happens in rate space: Poisson ruptures add
//! `rate · poe`; non-parametric ruptures add the equivalent Poisson
//! rate of their probability of no exceedance.

use std::f64::consts::SQRT_2;

use serde::{Deserialize, Serialize};

use tremor_types::{HazardError, HazardResult};

/// Truncation of the ground-motion residual ε.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Truncation {
    /// Full normal distribution.
    Untruncated,
    /// Normal distribution truncated at ±T and renormalized.
    Symmetric(f64),
    /// Ground motion equals its median: poe is a step function.
    MeanOnly,
}

impl Truncation {
    /// Configuration level 0 means no truncation.
    pub fn from_level(level: f64) -> HazardResult<Self> {
        if !(level.is_finite() && level >= 0.0) {
            return Err(HazardError::config(format!(
                "truncation level must be >= 0, got {level}"
            )));
        }
        Ok(if level == 0.0 {
            Truncation::Untruncated
        } else {
            Truncation::Symmetric(level)
        })
    }

    /// Finite truncation bound, if any.
    pub fn level(&self) -> Option<f64> {
        match self {
            Truncation::Symmetric(t) => Some(*t),
            Truncation::MeanOnly => Some(0.0),
            Truncation::Untruncated => None,
        }
    }

    /// P(ε > eps) under this truncation.
    pub fn survival(&self, eps: f64) -> f64 {
        match *self {
            Truncation::Untruncated => normal_sf(eps),
            Truncation::MeanOnly => step(eps),
            Truncation::Symmetric(t) => {
                if eps >= t {
                    0.0
                } else if eps <= -t {
                    1.0
                } else {
                    let (lo, hi) = (normal_cdf(-t), normal_cdf(t));
                    ((hi - normal_cdf(eps)) / (hi - lo)).clamp(0.0, 1.0)
                }
            }
        }
    }

    /// P(lo < ε <= hi) under this truncation.
    pub fn mass(&self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return 0.0;
        }
        (self.survival(lo) - self.survival(hi)).max(0.0)
    }
}

fn step(eps: f64) -> f64 {
    if eps < 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Standard normal CDF.
#[inline]
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * libm::erfc(-x / SQRT_2)
}

/// Standard normal survival function, accurate in the upper tail.
#[inline]
pub fn normal_sf(x: f64) -> f64 {
    0.5 * libm::erfc(x / SQRT_2)
}

/// Normalized residual of `ln_iml` for a prediction.
#[inline]
pub fn epsilon(ln_iml: f64, mean: f64, sigma: f64) -> f64 {
    (ln_iml - mean) / sigma
}

/// Probability that ln(Y) ~ N(mean, sigma) exceeds `ln_iml`. A zero
/// sigma degenerates to the step function.
pub fn poe(ln_iml: f64, mean: f64, sigma: f64, truncation: Truncation) -> f64 {
    if sigma == 0.0 {
        return step(ln_iml - mean);
    }
    truncation.survival(epsilon(ln_iml, mean, sigma))
}

/// Probability of at least one exceedance in `time` years.
#[inline]
pub fn rate_to_poe(rate: f64, time: f64) -> f64 {
    -(-rate * time).exp_m1()
}

/// Annual rate equivalent to `poe` over `time` years.
pub fn poe_to_rate(poe: f64, time: f64) -> f64 {
    if poe >= 1.0 {
        return f64::INFINITY;
    }
    -(-poe).ln_1p() / time
}

/// Equivalent Poisson rate of a rupture with `probs_occur[k]` the
/// probability of k occurrences in `time` years and `poe` per
/// occurrence: `-ln(Σ p_k (1-poe)^k) / time`.
pub fn equivalent_rate(probs_occur: &[f64], poe: f64, time: f64) -> f64 {
    let q = 1.0 - poe;
    let mut q_k = 1.0;
    let mut p_none = 0.0;
    for p in probs_occur {
        p_none += p * q_k;
        q_k *= q;
    }
    -p_none.max(f64::MIN_POSITIVE).ln() / time
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_cdf_reference_values() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-15);
        assert!((normal_cdf(1.0) - 0.841_344_746_068_542_9).abs() < 1e-12);
        assert!((normal_cdf(-3.0) - 0.001_349_898_031_630_094_6).abs() < 1e-12);
        assert!((normal_sf(8.0) - 6.220_960_574_271_785e-16).abs() < 1e-25);
    }

    #[test]
    fn test_truncated_bounds() {
        let t = Truncation::Symmetric(3.0);
        assert_eq!(poe(10.0, 0.0, 1.0, t), 0.0);
        assert_eq!(poe(-10.0, 0.0, 1.0, t), 1.0);
        assert_eq!(poe(3.0, 0.0, 1.0, t), 0.0);
        assert!((poe(0.0, 0.0, 1.0, t) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_untruncated_exceeds_truncated_in_tails() {
        let trunc = Truncation::from_level(3.0).unwrap();
        let untrunc = Truncation::from_level(0.0).unwrap();
        assert_eq!(untrunc, Truncation::Untruncated);
        let high = 3.5;
        assert!(poe(high, 0.0, 1.0, untrunc) > poe(high, 0.0, 1.0, trunc));
        assert!(poe(2.9, 0.0, 1.0, untrunc) > poe(2.9, 0.0, 1.0, trunc));
    }

    #[test]
    fn test_mean_only_step() {
        assert_eq!(poe(-0.1, 0.0, 0.5, Truncation::MeanOnly), 1.0);
        assert_eq!(poe(0.1, 0.0, 0.5, Truncation::MeanOnly), 0.0);
        assert_eq!(poe(0.1, 0.2, 0.0, Truncation::Untruncated), 1.0);
    }

    #[test]
    fn test_mass_partitions_survival() {
        let t = Truncation::Symmetric(2.0);
        let edges = [-2.0, -1.0, 0.0, 1.0, 2.0];
        let total: f64 = edges.windows(2).map(|w| t.mass(w[0], w[1])).sum();
        assert!((total - 1.0).abs() < 1e-12, "total={total}");
        assert_eq!(t.mass(1.0, 0.5), 0.0);
    }

    #[test]
    fn test_rate_poe_conversion() {
        let p = rate_to_poe(0.01, 50.0);
        assert!((p - (1.0 - (-0.5f64).exp())).abs() < 1e-15);
        assert!((poe_to_rate(p, 50.0) - 0.01).abs() < 1e-15);
        assert_eq!(poe_to_rate(1.0, 1.0), f64::INFINITY);
    }

    #[test]
    fn test_equivalent_rate_matches_poisson() {
        // Poisson occurrence probabilities for rate r over time T
        let (r, time, p) = (0.02f64, 50.0, 0.3);
        let lambda = r * time;
        let mut probs = Vec::new();
        let mut term = (-lambda).exp();
        for k in 0..30 {
            probs.push(term);
            term *= lambda / (k + 1) as f64;
        }
        let eq = equivalent_rate(&probs, p, time);
        assert!((eq - r * p).abs() < 1e-12, "eq={eq}");
    }

    #[test]
    fn test_equivalent_rate_certain_event() {
        let eq = equivalent_rate(&[0.0, 1.0], 1.0, 1.0);
        assert!(eq.is_finite() && eq > 700.0);
    }
}
