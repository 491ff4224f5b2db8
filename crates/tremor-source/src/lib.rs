// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Sources
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Seismic sources and the rupture enumerator.
//!
//! - `mfd`: magnitude-frequency distributions
//! - `msr`: magnitude-scaling relationships
//! - `surface`: rupture surface meshes and distance metrics
//! - `rupture`: ruptures and temporal occurrence
//! - `point`: point and area sources
//! - `fault`: simple, complex, characteristic and non-parametric sources
//! - `source`: the source enum and lazy rupture iteration

pub mod fault;
pub mod mfd;
pub mod msr;
pub mod point;
pub mod rupture;
pub mod source;
pub mod surface;

pub use fault::{
    CharacteristicSource, FaultGeometry, FaultSource, FloatingParams, NonParametricRupture,
    NonParametricSource,
};
pub use mfd::Mfd;
pub use msr::MagScaling;
pub use point::{AreaSource, NodalPlane, PointParams, PointSource};
pub use rupture::{Rupture, TemporalOccurrence};
pub use source::{RuptureIter, SeismicSource, SourceKind};
pub use surface::Mesh;
