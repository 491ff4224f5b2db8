// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Ground Motion
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Ground-motion evaluation for the Tremor hazard kernel.
//!
//! - `distance`: Rrup, Rjb, Rhypo and Repi
//! - `component`: horizontal-component conversion
//! - `models`: the ground-motion model families
//! - `evaluator`: maximum-distance cutoff and per-IMT evaluation

pub mod component;
pub mod distance;
pub mod evaluator;
pub mod models;

pub use component::HorizontalComponent;
pub use distance::{DistanceMetric, Distances};
pub use evaluator::{Evaluation, GmEvaluator};
pub use models::{FixedMotion, GenericCoefficients, GmPrediction, GmmKind, GroundMotionModel};
