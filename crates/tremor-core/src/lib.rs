// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Classical Hazard Core
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Classical probabilistic seismic hazard: exceedance integration,
//! aggregation across logic-tree realizations, and disaggregation.
//!
//! - `exceedance`: truncated-normal poe and rate/probability conversion
//! - `ratemap`: site × level rate accumulation
//! - `stats`: weighted mean and quantiles per level
//! - `postproc`: hazard maps and uniform hazard spectra
//! - `disagg`: magnitude/distance/epsilon/source binning
//! - `output`: serializable results
//! - `calculator`: setup, parallel work units and the final reduction
//!
//! # Invariants
//!
//! 1. **Rates add**: every contribution is accumulated as an annual
//!    rate, so partial results merge in any order and probabilities are
//!    derived only after the reduction.
//!
//! 2. **Curves never increase**: each level's value is computed from
//!    the same ruptures with a poe that cannot grow with the level.
//!
//! 3. **Disaggregation conserves rate**: the bins of a matrix sum to
//!    the curve's rate at the target level.

pub mod calculator;
pub mod disagg;
pub mod exceedance;
pub mod output;
pub mod postproc;
pub mod ratemap;
pub mod stats;

pub use calculator::{CancellationToken, HazardCalculator, TrtSetup};
pub use disagg::{Contribution, DisaggBins, DisaggMatrix};
pub use exceedance::{poe, poe_to_rate, rate_to_poe, Truncation};
pub use output::{
    CurveSet, DisaggResult, HazardOutput, RealizationInfo, SiteCurves, SiteFailure,
};
pub use postproc::{HazardMap, UniformHazardSpectrum};
pub use ratemap::RateMap;
pub use stats::Statistic;
