// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Horizontal Component Conversion
// ─────────────────────────────────────────────────────────────────────
//! Models predict the geometric mean of the two horizontal components.
//! `MaxDirection` scales to the maximum over all orientations with a
//! period-dependent ratio and its own log-normal scatter.

use serde::{Deserialize, Serialize};

use tremor_types::Imt;

/// (period s, median max-direction / geometric-mean ratio). PGA is the
/// zero-period entry; ratios are held flat outside the table.
const MAX_DIRECTION_RATIOS: [(f64, f64); 9] = [
    (0.0, 1.19),
    (0.1, 1.19),
    (0.2, 1.21),
    (0.3, 1.22),
    (0.5, 1.23),
    (1.0, 1.24),
    (2.0, 1.24),
    (3.0, 1.25),
    (5.0, 1.26),
];

/// Log-standard deviation of the max-direction ratio.
const MAX_DIRECTION_SIGMA: f64 = 0.08;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalComponent {
    #[default]
    GeometricMean,
    MaxDirection,
}

impl HorizontalComponent {
    /// ln-ratio and its σ to apply for `imt`; zero for geometric mean and
    /// for PGV, which has no tabulated ratio.
    pub fn conversion(&self, imt: Imt) -> (f64, f64) {
        match (self, imt.period()) {
            (HorizontalComponent::MaxDirection, Some(period)) => {
                (max_direction_ratio(period).ln(), MAX_DIRECTION_SIGMA)
            }
            _ => (0.0, 0.0),
        }
    }
}

fn max_direction_ratio(period: f64) -> f64 {
    let table = &MAX_DIRECTION_RATIOS;
    if period <= table[1].0 {
        return table[1].1;
    }
    for w in table[1..].windows(2) {
        let ((t0, r0), (t1, r1)) = (w[0], w[1]);
        if period <= t1 {
            let f = (period.ln() - t0.ln()) / (t1.ln() - t0.ln());
            return r0 + f * (r1 - r0);
        }
    }
    table[table.len() - 1].1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometric_mean_is_identity() {
        assert_eq!(HorizontalComponent::GeometricMean.conversion(Imt::Sa(1.0)), (0.0, 0.0));
    }

    #[test]
    fn test_max_direction_tabulated() {
        let (ln_ratio, sigma) = HorizontalComponent::MaxDirection.conversion(Imt::Pga);
        assert!((ln_ratio - 1.19f64.ln()).abs() < 1e-12);
        assert_eq!(sigma, MAX_DIRECTION_SIGMA);
        let (one, _) = HorizontalComponent::MaxDirection.conversion(Imt::Sa(1.0));
        assert!((one - 1.24f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_max_direction_interpolates_and_clamps() {
        let r = max_direction_ratio(0.7);
        assert!(r > 1.23 && r < 1.24, "r={r}");
        assert_eq!(max_direction_ratio(10.0), 1.26);
        assert_eq!(HorizontalComponent::MaxDirection.conversion(Imt::Pgv), (0.0, 0.0));
    }
}
