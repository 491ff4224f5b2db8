// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Disaggregation
// ─────────────────────────────────────────────────────────────────────
//! Splits the exceedance rate at one target level into magnitude,
//! Joyner-Boore distance, epsilon and source bins.
//!
//! Every rupture's contribution lands in the matrix in full, so the
//! matrix total equals the rate of the hazard curve at the target level.

use serde::Serialize;

use tremor_types::{HazardError, HazardResult};

use crate::exceedance::{rate_to_poe, Truncation};

/// Bin edges shared by every matrix of one calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisaggBins {
    pub mag_edges: Vec<f64>,
    pub dist_edges: Vec<f64>,
    pub eps_edges: Vec<f64>,
    pub source_ids: Vec<String>,
    /// Tectonic region of each source, parallel to `source_ids`.
    pub source_trts: Vec<String>,
    /// Distinct tectonic regions, sorted.
    pub trts: Vec<String>,
}

impl DisaggBins {
    /// `sources` holds (source id, tectonic region) pairs; duplicates
    /// are merged.
    pub fn new(
        mag_range: (f64, f64),
        mag_bin_width: f64,
        max_distance: f64,
        distance_bin_width: f64,
        truncation_level: f64,
        num_epsilon_bins: usize,
        sources: impl IntoIterator<Item = (String, String)>,
    ) -> HazardResult<Self> {
        let (lo, hi) = mag_range;
        if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
            return Err(HazardError::config(format!(
                "invalid magnitude range [{lo}, {hi}] for disaggregation"
            )));
        }
        if !(truncation_level.is_finite() && truncation_level > 0.0) {
            return Err(HazardError::config(
                "disaggregation by epsilon requires a finite truncation level",
            ));
        }
        if num_epsilon_bins == 0 {
            return Err(HazardError::config("num_epsilon_bins must be >= 1"));
        }

        let first = (lo / mag_bin_width).floor();
        let last = (hi / mag_bin_width).floor() + 1.0;
        let mag_edges = (first as i64..=last as i64)
            .map(|i| i as f64 * mag_bin_width)
            .collect();

        let n_dist = ((max_distance / distance_bin_width).ceil() as usize).max(1);
        let dist_edges = (0..=n_dist).map(|i| i as f64 * distance_bin_width).collect();

        let step = 2.0 * truncation_level / num_epsilon_bins as f64;
        let eps_edges = (0..=num_epsilon_bins)
            .map(|i| -truncation_level + i as f64 * step)
            .collect();

        let mut pairs: Vec<(String, String)> = sources.into_iter().collect();
        pairs.sort();
        pairs.dedup_by(|a, b| a.0 == b.0);
        let (source_ids, source_trts): (Vec<String>, Vec<String>) = pairs.into_iter().unzip();
        let mut trts = source_trts.clone();
        trts.sort();
        trts.dedup();

        Ok(Self {
            mag_edges,
            dist_edges,
            eps_edges,
            source_ids,
            source_trts,
            trts,
        })
    }

    /// (magnitude, distance, epsilon, source) bin counts.
    pub fn shape(&self) -> [usize; 4] {
        [
            self.mag_edges.len() - 1,
            self.dist_edges.len() - 1,
            self.eps_edges.len() - 1,
            self.source_ids.len(),
        ]
    }

    pub fn mag_index(&self, mag: f64) -> usize {
        bin_index(&self.mag_edges, mag)
    }

    pub fn dist_index(&self, dist: f64) -> usize {
        bin_index(&self.dist_edges, dist)
    }

    pub fn eps_index(&self, eps: f64) -> usize {
        bin_index(&self.eps_edges, eps)
    }

    pub fn source_index(&self, id: &str) -> Option<usize> {
        self.source_ids.binary_search_by(|s| s.as_str().cmp(id)).ok()
    }

    pub fn truncation_level(&self) -> f64 {
        self.eps_edges.last().copied().unwrap_or(0.0)
    }
}

/// Index of the bin holding `value`, clamped to the outer bins.
fn bin_index(edges: &[f64], value: f64) -> usize {
    let n = edges.len() - 1;
    let width = edges[1] - edges[0];
    let i = ((value - edges[0]) / width).floor();
    if i.is_nan() || i < 0.0 {
        0
    } else {
        (i as usize).min(n - 1)
    }
}

/// One rupture's share of the rate at the target level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub mag: f64,
    pub rjb: f64,
    pub source: usize,
    /// Rate contributed at the target level.
    pub rate: f64,
    /// Epsilon of the target level; `None` for a zero-sigma prediction.
    pub epsilon: Option<f64>,
}

/// Exceedance rates binned by (magnitude, distance, epsilon, source).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisaggMatrix {
    shape: [usize; 4],
    data: Vec<f64>,
}

impl DisaggMatrix {
    pub fn new(shape: [usize; 4]) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.iter().product()],
        }
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    #[inline]
    fn offset(&self, m: usize, d: usize, e: usize, s: usize) -> usize {
        ((m * self.shape[1] + d) * self.shape[2] + e) * self.shape[3] + s
    }

    pub fn get(&self, m: usize, d: usize, e: usize, s: usize) -> f64 {
        self.data[self.offset(m, d, e, s)]
    }

    pub fn add(&mut self, m: usize, d: usize, e: usize, s: usize, rate: f64) {
        let i = self.offset(m, d, e, s);
        self.data[i] += rate;
    }

    /// Bin one contribution.
    ///
    /// By default the rate is spread over the epsilon bins in proportion
    /// to the probability mass of ε above the target epsilon in each
    /// bin. With `epsilon_star` it goes whole to the bin holding the
    /// target epsilon; a target below −T counts in the lowest bin.
    pub fn accumulate(
        &mut self,
        bins: &DisaggBins,
        truncation: Truncation,
        epsilon_star: bool,
        c: &Contribution,
    ) {
        if c.rate <= 0.0 {
            return;
        }
        let m = bins.mag_index(c.mag);
        let d = bins.dist_index(c.rjb);
        let Some(eps) = c.epsilon else {
            // zero sigma: the motion equals its median
            self.add(m, d, bins.eps_index(0.0), c.source, c.rate);
            return;
        };
        if epsilon_star {
            self.add(m, d, bins.eps_index(eps), c.source, c.rate);
            return;
        }
        let masses: Vec<f64> = bins
            .eps_edges
            .windows(2)
            .map(|w| truncation.mass(w[0].max(eps), w[1]))
            .collect();
        let total: f64 = masses.iter().sum();
        if total <= 0.0 {
            return;
        }
        for (e, mass) in masses.iter().enumerate() {
            if *mass > 0.0 {
                self.add(m, d, e, c.source, c.rate * mass / total);
            }
        }
    }

    pub fn merge_scaled(&mut self, other: &DisaggMatrix, weight: f64) {
        debug_assert_eq!(self.shape, other.shape);
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += weight * b;
        }
    }

    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Same matrix with every bin converted to a probability of
    /// exceedance over `investigation_time`.
    pub fn to_probability(&self, investigation_time: f64) -> DisaggMatrix {
        DisaggMatrix {
            shape: self.shape,
            data: self
                .data
                .iter()
                .map(|&r| rate_to_poe(r, investigation_time))
                .collect(),
        }
    }

    fn marginal(&self, axis: usize) -> Vec<f64> {
        let mut out = vec![0.0; self.shape[axis]];
        for m in 0..self.shape[0] {
            for d in 0..self.shape[1] {
                for e in 0..self.shape[2] {
                    for s in 0..self.shape[3] {
                        let idx = [m, d, e, s][axis];
                        out[idx] += self.get(m, d, e, s);
                    }
                }
            }
        }
        out
    }

    pub fn magnitude(&self) -> Vec<f64> {
        self.marginal(0)
    }

    pub fn distance(&self) -> Vec<f64> {
        self.marginal(1)
    }

    pub fn epsilon(&self) -> Vec<f64> {
        self.marginal(2)
    }

    pub fn source(&self) -> Vec<f64> {
        self.marginal(3)
    }

    /// Magnitude × distance table, indexed `[mag][dist]`.
    pub fn mag_dist(&self) -> Vec<Vec<f64>> {
        let mut out = vec![vec![0.0; self.shape[1]]; self.shape[0]];
        for (m, row) in out.iter_mut().enumerate() {
            for (d, cell) in row.iter_mut().enumerate() {
                for e in 0..self.shape[2] {
                    for s in 0..self.shape[3] {
                        *cell += self.get(m, d, e, s);
                    }
                }
            }
        }
        out
    }

    /// Rates summed by tectonic region, in the order of `bins.trts`.
    pub fn trt(&self, bins: &DisaggBins) -> Vec<f64> {
        let by_source = self.source();
        bins.trts
            .iter()
            .map(|trt| {
                by_source
                    .iter()
                    .zip(&bins.source_trts)
                    .filter(|(_, t)| *t == trt)
                    .map(|(r, _)| r)
                    .sum()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bins() -> DisaggBins {
        DisaggBins::new(
            (5.05, 6.95),
            0.5,
            95.0,
            20.0,
            3.0,
            6,
            vec![
                ("b".to_string(), "Stable".to_string()),
                ("a".to_string(), "Active".to_string()),
                ("c".to_string(), "Active".to_string()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_bin_edges() {
        let b = bins();
        assert_eq!(b.mag_edges, vec![5.0, 5.5, 6.0, 6.5, 7.0]);
        assert_eq!(b.dist_edges.len(), 6);
        assert_eq!(*b.dist_edges.last().unwrap(), 100.0);
        assert_eq!(b.eps_edges, vec![-3.0, -2.0, -1.0, 0.0, 1.0, 2.0, 3.0]);
        assert_eq!(b.shape(), [4, 5, 6, 3]);
        assert_eq!(b.source_index("c"), Some(2));
        assert_eq!(b.trts, vec!["Active".to_string(), "Stable".to_string()]);
    }

    #[test]
    fn test_indices_clamp() {
        let b = bins();
        assert_eq!(b.mag_index(4.0), 0);
        assert_eq!(b.mag_index(7.3), 3);
        assert_eq!(b.dist_index(130.0), 4);
        assert_eq!(b.eps_index(-5.0), 0);
        assert_eq!(b.eps_index(0.5), 3);
    }

    #[test]
    fn test_single_magnitude_gets_one_bin() {
        let b = DisaggBins::new((6.0, 6.0), 0.5, 10.0, 10.0, 2.0, 4, vec![]).unwrap();
        assert_eq!(b.mag_edges, vec![6.0, 6.5]);
        assert_eq!(b.mag_index(6.0), 0);
    }

    #[test]
    fn test_untruncated_rejected() {
        assert!(DisaggBins::new((6.0, 6.0), 0.5, 10.0, 10.0, 0.0, 4, vec![]).is_err());
    }

    #[test]
    fn test_contribution_conserved_across_epsilon() {
        let b = bins();
        let t = Truncation::Symmetric(3.0);
        let mut matrix = DisaggMatrix::new(b.shape());
        let c = Contribution {
            mag: 6.2,
            rjb: 35.0,
            source: 1,
            rate: 2.5e-3,
            epsilon: Some(-0.4),
        };
        matrix.accumulate(&b, t, false, &c);
        assert!((matrix.total() - 2.5e-3).abs() < 1e-15);
        let eps = matrix.epsilon();
        // nothing below the target epsilon's bin
        assert_eq!(eps[0], 0.0);
        assert_eq!(eps[1], 0.0);
        assert!(eps[2] > 0.0 && eps[3] > eps[4] && eps[4] > eps[5]);
        assert!((matrix.magnitude()[2] - 2.5e-3).abs() < 1e-15);
        assert!((matrix.distance()[1] - 2.5e-3).abs() < 1e-15);
    }

    #[test]
    fn test_epsilon_star_single_bin() {
        let b = bins();
        let t = Truncation::Symmetric(3.0);
        let mut matrix = DisaggMatrix::new(b.shape());
        for eps in [-4.0, 1.5] {
            let c = Contribution {
                mag: 5.2,
                rjb: 5.0,
                source: 0,
                rate: 1e-3,
                epsilon: Some(eps),
            };
            matrix.accumulate(&b, t, true, &c);
        }
        let e = matrix.epsilon();
        assert!((e[0] - 1e-3).abs() < 1e-18);
        assert!((e[4] - 1e-3).abs() < 1e-18);
        assert!((matrix.total() - 2e-3).abs() < 1e-18);
    }

    #[test]
    fn test_trt_and_mag_dist_marginals() {
        let b = bins();
        let t = Truncation::Symmetric(3.0);
        let mut matrix = DisaggMatrix::new(b.shape());
        for (source, rate) in [(0, 1e-3), (1, 2e-3), (2, 4e-3)] {
            let c = Contribution {
                mag: 6.7,
                rjb: 0.0,
                source,
                rate,
                epsilon: Some(0.0),
            };
            matrix.accumulate(&b, t, false, &c);
        }
        let by_trt = matrix.trt(&b);
        assert!((by_trt[0] - 5e-3).abs() < 1e-15, "{by_trt:?}");
        assert!((by_trt[1] - 2e-3).abs() < 1e-15);
        let md = matrix.mag_dist();
        assert!((md[3][0] - 7e-3).abs() < 1e-15);
        let prob = matrix.to_probability(1.0);
        assert!(prob.total() < matrix.total());
    }
}
