// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Ruptures
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use tremor_types::{HazardError, HazardResult, Point};

use crate::surface::Mesh;

/// How often a rupture occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemporalOccurrence {
    /// Time-independent Poisson process with an annual rate.
    Poisson { annual_rate: f64 },
    /// Probabilities of 0, 1, 2, … occurrences within the investigation
    /// time.
    NonParametric { probs_occur: Vec<f64> },
}

impl TemporalOccurrence {
    pub fn validate(&self) -> HazardResult<()> {
        match self {
            TemporalOccurrence::Poisson { annual_rate } => {
                if !(annual_rate.is_finite() && *annual_rate >= 0.0) {
                    return Err(HazardError::config(format!(
                        "annual rate must be >= 0, got {annual_rate}"
                    )));
                }
            }
            TemporalOccurrence::NonParametric { probs_occur } => {
                if probs_occur.is_empty() {
                    return Err(HazardError::config("probs_occur is empty"));
                }
                if probs_occur.iter().any(|p| !(0.0..=1.0).contains(p)) {
                    return Err(HazardError::config("probs_occur entries must be in [0, 1]"));
                }
                let sum: f64 = probs_occur.iter().sum();
                if (sum - 1.0).abs() > 1e-6 {
                    return Err(HazardError::config(format!(
                        "probs_occur must sum to 1, got {sum}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Annual Poisson rate, or `None` for non-parametric occurrence.
    pub fn annual_rate(&self) -> Option<f64> {
        match self {
            TemporalOccurrence::Poisson { annual_rate } => Some(*annual_rate),
            TemporalOccurrence::NonParametric { .. } => None,
        }
    }
}

/// A single earthquake rupture. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rupture {
    pub mag: f64,
    pub rake: f64,
    pub hypocenter: Point,
    pub surface: Mesh,
    pub occurrence: TemporalOccurrence,
}

impl Rupture {
    pub fn poisson(
        mag: f64,
        rake: f64,
        hypocenter: Point,
        surface: Mesh,
        annual_rate: f64,
    ) -> Self {
        Self {
            mag,
            rake,
            hypocenter,
            surface,
            occurrence: TemporalOccurrence::Poisson { annual_rate },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probs_occur_must_sum_to_one() {
        let ok = TemporalOccurrence::NonParametric {
            probs_occur: vec![0.7, 0.2, 0.1],
        };
        assert!(ok.validate().is_ok());
        let bad = TemporalOccurrence::NonParametric {
            probs_occur: vec![0.7, 0.2],
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_negative_rate_rejected() {
        let occ = TemporalOccurrence::Poisson { annual_rate: -1.0 };
        assert!(occ.validate().is_err());
        assert_eq!(occ.annual_rate(), Some(-1.0));
    }
}
