// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Shared value types, configuration, and error hierarchy for the
//! Tremor classical seismic hazard kernel.

pub mod config;
pub mod curve;
pub mod error;
pub mod geo;
pub mod imt;
pub mod site;

pub use config::{CalculationConfig, DiscretizationConfig, DisaggConfig, OutputConfig, TrtMap};
pub use curve::{locate_on_curve, CurveKind, CurveLookup, HazardCurve};
pub use error::{HazardError, HazardResult};
pub use geo::Point;
pub use imt::{Imt, ImtLevels};
pub use site::{Site, SiteParam};
