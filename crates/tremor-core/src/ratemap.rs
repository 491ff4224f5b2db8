// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Rate Maps
// ─────────────────────────────────────────────────────────────────────
//! Annual exceedance rates for every (site, IMT, level), stored as a
//! flat row-major `sites × total_levels` array. Merging is elementwise
//! addition, so partial maps from parallel work units combine in any
//! order.

use serde::Serialize;

use tremor_types::{CurveKind, HazardCurve, ImtLevels};

use crate::exceedance::rate_to_poe;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateMap {
    num_sites: usize,
    num_levels: usize,
    data: Vec<f64>,
}

impl RateMap {
    pub fn new(num_sites: usize, num_levels: usize) -> Self {
        Self {
            num_sites,
            num_levels,
            data: vec![0.0; num_sites * num_levels],
        }
    }

    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    /// Rates of one site over every IMT and level.
    pub fn row(&self, site: usize) -> &[f64] {
        &self.data[site * self.num_levels..(site + 1) * self.num_levels]
    }

    pub fn row_mut(&mut self, site: usize) -> &mut [f64] {
        &mut self.data[site * self.num_levels..(site + 1) * self.num_levels]
    }

    #[inline]
    pub fn add(&mut self, site: usize, level: usize, rate: f64) {
        self.data[site * self.num_levels + level] += rate;
    }

    /// Elementwise sum. Shapes must agree.
    pub fn merge(&mut self, other: &RateMap) {
        debug_assert_eq!(self.data.len(), other.data.len());
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += b;
        }
    }

    /// Elementwise sum, weighting `other` by `weight`.
    pub fn merge_scaled(&mut self, other: &RateMap, weight: f64) {
        debug_assert_eq!(self.data.len(), other.data.len());
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += weight * b;
        }
    }

    /// Add `other`, whose rows are sites `first_site..`, into this map.
    pub fn merge_rows(&mut self, other: &RateMap, first_site: usize) {
        debug_assert_eq!(self.num_levels, other.num_levels);
        let start = first_site * self.num_levels;
        let dst = &mut self.data[start..start + other.data.len()];
        for (a, b) in dst.iter_mut().zip(&other.data) {
            *a += b;
        }
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&v| v == 0.0)
    }

    /// Values of one site in the requested curve kind.
    pub fn site_values(&self, site: usize, kind: CurveKind, investigation_time: f64) -> Vec<f64> {
        let row = self.row(site);
        match kind {
            CurveKind::Rate => row.to_vec(),
            CurveKind::Probability => row
                .iter()
                .map(|&r| rate_to_poe(r, investigation_time))
                .collect(),
        }
    }

    /// Split one site's row into a curve per IMT.
    pub fn site_curves(
        &self,
        site: usize,
        imtls: &ImtLevels,
        kind: CurveKind,
        investigation_time: f64,
    ) -> Vec<HazardCurve> {
        split_curves(&self.site_values(site, kind, investigation_time), imtls)
    }
}

/// Cut a flat (IMT, level) row into per-IMT curves.
pub fn split_curves(values: &[f64], imtls: &ImtLevels) -> Vec<HazardCurve> {
    imtls
        .iter()
        .enumerate()
        .map(|(m, (imt, levels))| {
            let off = imtls.offset(m);
            HazardCurve::new(imt, levels.to_vec(), values[off..off + levels.len()].to_vec())
        })
        .collect()
}
