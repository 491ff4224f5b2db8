// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Magnitude-Frequency Distributions
// ─────────────────────────────────────────────────────────────────────
//! Magnitude-frequency distributions: annual occurrence rate per
//! magnitude bin.
//!
//! A truncated Gutenberg-Richter distribution is discretized at the
//! calculation's MFD bin width; the other kinds carry their own bins.

use serde::{Deserialize, Serialize};

use tremor_types::{HazardError, HazardResult};

/// Magnitude-frequency distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mfd {
    /// log10 N(≥M) = a − b·M between `min_mag` and `max_mag`.
    TruncatedGr {
        a_val: f64,
        b_val: f64,
        min_mag: f64,
        max_mag: f64,
    },
    /// Rates for bins centred at `min_mag + i·bin_width`.
    EvenlyDiscretized {
        min_mag: f64,
        bin_width: f64,
        occurrence_rates: Vec<f64>,
    },
    /// Explicit (magnitude, rate) pairs.
    Arbitrary {
        magnitudes: Vec<f64>,
        occurrence_rates: Vec<f64>,
    },
}

impl Mfd {
    pub fn validate(&self) -> HazardResult<()> {
        match self {
            Mfd::TruncatedGr {
                a_val,
                b_val,
                min_mag,
                max_mag,
            } => {
                if !a_val.is_finite() {
                    return Err(HazardError::config(format!(
                        "GR a value must be finite, got {a_val}"
                    )));
                }
                if !(b_val.is_finite() && *b_val > 0.0) {
                    return Err(HazardError::config(format!("GR b value must be > 0, got {b_val}")));
                }
                if !(min_mag.is_finite() && max_mag.is_finite() && min_mag < max_mag) {
                    return Err(HazardError::config(format!(
                        "GR requires min_mag < max_mag, got {min_mag} and {max_mag}"
                    )));
                }
            }
            Mfd::EvenlyDiscretized {
                min_mag,
                bin_width,
                occurrence_rates,
            } => {
                if !min_mag.is_finite() {
                    return Err(HazardError::config("MFD min_mag must be finite"));
                }
                if !(bin_width.is_finite() && *bin_width > 0.0) {
                    return Err(HazardError::config(format!(
                        "MFD bin_width must be > 0, got {bin_width}"
                    )));
                }
                check_rates(occurrence_rates)?;
            }
            Mfd::Arbitrary {
                magnitudes,
                occurrence_rates,
            } => {
                if magnitudes.len() != occurrence_rates.len() {
                    return Err(HazardError::config(format!(
                        "arbitrary MFD has {} magnitudes but {} rates",
                        magnitudes.len(),
                        occurrence_rates.len()
                    )));
                }
                if magnitudes.iter().any(|m| !m.is_finite()) {
                    return Err(HazardError::config("arbitrary MFD magnitudes must be finite"));
                }
                check_rates(occurrence_rates)?;
            }
        }
        Ok(())
    }

    /// (magnitude, annual rate) per bin, in increasing magnitude order
    /// for the discretized kinds.
    pub fn annual_occurrence_rates(&self, bin_width: f64) -> Vec<(f64, f64)> {
        match self {
            Mfd::TruncatedGr {
                a_val,
                b_val,
                min_mag,
                max_mag,
            } => {
                let (lo, n) = gr_bins(*min_mag, *max_mag, bin_width);
                (0..n)
                    .map(|i| {
                        let mag = lo + bin_width * (i as f64 + 0.5);
                        let lo_edge = mag - bin_width / 2.0;
                        let hi_edge = mag + bin_width / 2.0;
                        let rate = 10f64.powf(a_val - b_val * lo_edge)
                            - 10f64.powf(a_val - b_val * hi_edge);
                        (mag, rate)
                    })
                    .collect()
            }
            Mfd::EvenlyDiscretized {
                min_mag,
                bin_width,
                occurrence_rates,
            } => occurrence_rates
                .iter()
                .enumerate()
                .map(|(i, &r)| (min_mag + bin_width * i as f64, r))
                .collect(),
            Mfd::Arbitrary {
                magnitudes,
                occurrence_rates,
            } => magnitudes
                .iter()
                .copied()
                .zip(occurrence_rates.iter().copied())
                .collect(),
        }
    }

    /// Sum of all bin rates.
    pub fn total_rate(&self, bin_width: f64) -> f64 {
        self.annual_occurrence_rates(bin_width)
            .iter()
            .map(|(_, r)| r)
            .sum()
    }

    /// Smallest and largest bin magnitude.
    pub fn min_max_mag(&self, bin_width: f64) -> Option<(f64, f64)> {
        let bins = self.annual_occurrence_rates(bin_width);
        let lo = bins.iter().map(|(m, _)| *m).fold(f64::INFINITY, f64::min);
        let hi = bins.iter().map(|(m, _)| *m).fold(f64::NEG_INFINITY, f64::max);
        (lo <= hi).then_some((lo, hi))
    }

    pub fn set_max_mag(&mut self, value: f64) -> HazardResult<()> {
        match self {
            Mfd::TruncatedGr { max_mag, .. } => {
                *max_mag = value;
                self.validate()
            }
            _ => Err(unsupported("maximum magnitude", self)),
        }
    }

    pub fn increment_max_mag(&mut self, delta: f64) -> HazardResult<()> {
        match self {
            Mfd::TruncatedGr { max_mag, .. } => {
                *max_mag += delta;
                self.validate()
            }
            _ => Err(unsupported("maximum magnitude increment", self)),
        }
    }

    pub fn increment_b(&mut self, delta: f64) -> HazardResult<()> {
        match self {
            Mfd::TruncatedGr { b_val, .. } => {
                *b_val += delta;
                self.validate()
            }
            _ => Err(unsupported("relative b value", self)),
        }
    }

    pub fn set_ab(&mut self, a: f64, b: f64) -> HazardResult<()> {
        match self {
            Mfd::TruncatedGr { a_val, b_val, .. } => {
                *a_val = a;
                *b_val = b;
                self.validate()
            }
            _ => Err(unsupported("absolute a/b values", self)),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Mfd::TruncatedGr { .. } => "truncated_gr",
            Mfd::EvenlyDiscretized { .. } => "evenly_discretized",
            Mfd::Arbitrary { .. } => "arbitrary",
        }
    }
}

fn unsupported(what: &str, mfd: &Mfd) -> HazardError {
    HazardError::config(format!(
        "{what} uncertainty cannot be applied to a {} MFD",
        mfd.kind_name()
    ))
}

fn check_rates(rates: &[f64]) -> HazardResult<()> {
    if rates.is_empty() {
        return Err(HazardError::config("MFD has no bins"));
    }
    if let Some(r) = rates.iter().find(|r| !(r.is_finite() && **r >= 0.0)) {
        return Err(HazardError::config(format!(
            "MFD occurrence rates must be >= 0, got {r}"
        )));
    }
    Ok(())
}

/// Lower bin edge and number of bins of a truncated GR distribution:
/// both bounds are rounded to the bin width and bins are centred
/// between them.
fn gr_bins(min_mag: f64, max_mag: f64, bin_width: f64) -> (f64, usize) {
    let lo = (min_mag / bin_width).round() * bin_width;
    let hi = (max_mag / bin_width).round() * bin_width;
    let n = ((hi - lo) / bin_width).round();
    if n < 1.0 {
        (lo - bin_width / 2.0, 1)
    } else {
        (lo, n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gr() -> Mfd {
        Mfd::TruncatedGr {
            a_val: 4.0,
            b_val: 1.0,
            min_mag: 5.0,
            max_mag: 7.0,
        }
    }

    #[test]
    fn test_gr_bin_centres() {
        let bins = gr().annual_occurrence_rates(0.1);
        assert_eq!(bins.len(), 20);
        assert!((bins[0].0 - 5.05).abs() < 1e-9, "first={}", bins[0].0);
        assert!((bins[19].0 - 6.95).abs() < 1e-9, "last={}", bins[19].0);
    }

    #[test]
    fn test_gr_total_rate_telescopes() {
        let total = gr().total_rate(0.1);
        let expected = 10f64.powf(4.0 - 5.0) - 10f64.powf(4.0 - 7.0);
        assert!((total - expected).abs() < 1e-12, "total={total}");
    }

    #[test]
    fn test_gr_rates_decrease() {
        let bins = gr().annual_occurrence_rates(0.1);
        assert!(bins.windows(2).all(|w| w[1].1 < w[0].1));
    }

    #[test]
    fn test_evenly_discretized() {
        let mfd = Mfd::EvenlyDiscretized {
            min_mag: 6.0,
            bin_width: 0.5,
            occurrence_rates: vec![0.01, 0.005],
        };
        assert_eq!(mfd.annual_occurrence_rates(0.1), vec![(6.0, 0.01), (6.5, 0.005)]);
        assert_eq!(mfd.min_max_mag(0.1), Some((6.0, 6.5)));
    }

    #[test]
    fn test_validation() {
        let bad = Mfd::TruncatedGr {
            a_val: 4.0,
            b_val: 1.0,
            min_mag: 7.0,
            max_mag: 5.0,
        };
        assert!(bad.validate().is_err());
        let mismatched = Mfd::Arbitrary {
            magnitudes: vec![6.0],
            occurrence_rates: vec![],
        };
        assert!(mismatched.validate().is_err());
    }

    #[test]
    fn test_max_mag_increment() {
        let mut mfd = gr();
        mfd.increment_max_mag(0.5).unwrap();
        assert_eq!(mfd.min_max_mag(0.1).map(|(_, hi)| (hi * 100.0).round()), Some(745.0));
        mfd.increment_b(0.1).unwrap();
        assert!(matches!(mfd, Mfd::TruncatedGr { b_val, .. } if (b_val - 1.1).abs() < 1e-12));
    }

    #[test]
    fn test_uncertainty_on_discrete_mfd_fails() {
        let mut mfd = Mfd::Arbitrary {
            magnitudes: vec![6.0],
            occurrence_rates: vec![0.01],
        };
        assert!(mfd.set_max_mag(7.0).is_err());
    }
}
