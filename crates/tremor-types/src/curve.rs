// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Hazard Curve Types
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::imt::Imt;

/// Whether curve values are probabilities of exceedance within the
/// investigation time or annual rates of exceedance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    #[default]
    Probability,
    Rate,
}

/// Result of locating a value on a decreasing curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveLookup {
    /// Target lies within the curve's positive range at this IML.
    Found(f64),
    /// Target exceeds the largest curve value.
    AboveCurve { max: f64 },
    /// Target is below the smallest positive curve value.
    BelowCurve { min: f64 },
}

/// Exceedance curve for one site and IMT.
///
/// `values` is non-increasing in `imls`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardCurve {
    pub imt: Imt,
    pub imls: Vec<f64>,
    pub values: Vec<f64>,
}

impl HazardCurve {
    pub fn new(imt: Imt, imls: Vec<f64>, values: Vec<f64>) -> Self {
        debug_assert_eq!(imls.len(), values.len());
        Self { imt, imls, values }
    }

    /// Non-increasing within an absolute tolerance.
    pub fn is_monotonic(&self, tol: f64) -> bool {
        self.values.windows(2).all(|w| w[1] <= w[0] + tol)
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }

    /// Invert the curve at `value` by log-log interpolation.
    pub fn locate(&self, value: f64) -> CurveLookup {
        locate_on_curve(&self.imls, &self.values, value)
    }
}

/// Invert a decreasing curve: find the IML at which the curve equals
/// `target`, interpolating linearly in (ln value, ln iml).
///
/// Zero values carry no logarithm and bound the usable domain.
pub fn locate_on_curve(imls: &[f64], values: &[f64], target: f64) -> CurveLookup {
    let positive = values.iter().take_while(|&&v| v > 0.0).count();
    if positive == 0 {
        return CurveLookup::AboveCurve { max: 0.0 };
    }
    let max = values[0];
    let min = values[positive - 1];
    if target > max {
        return CurveLookup::AboveCurve { max };
    }
    if target < min {
        return CurveLookup::BelowCurve { min };
    }
    for i in 0..positive {
        if values[i] == target {
            return CurveLookup::Found(imls[i]);
        }
        if i + 1 < positive && values[i] > target && target > values[i + 1] {
            let (lp0, lp1) = (values[i].ln(), values[i + 1].ln());
            let (li0, li1) = (imls[i].ln(), imls[i + 1].ln());
            let t = (target.ln() - lp0) / (lp1 - lp0);
            return CurveLookup::Found((li0 + t * (li1 - li0)).exp());
        }
    }
    CurveLookup::BelowCurve { min }
}
