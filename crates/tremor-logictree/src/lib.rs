// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Logic Trees
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Epistemic uncertainty for the Tremor hazard kernel.
//!
//! - `branch`: weighted branches and branch sets
//! - `uncertainty`: source-model uncertainty levels
//! - `tree`: source-model and ground-motion logic trees
//! - `enumerator`: full enumeration and seeded sampling of realizations

pub mod branch;
pub mod enumerator;
pub mod tree;
pub mod uncertainty;

pub use branch::{Branch, BranchSet};
pub use enumerator::{EnumerationSettings, Realization, Realizations, ResolvedModel};
pub use tree::{GmmTree, LogicTree, SourceModel, SourceModelTree};
pub use uncertainty::{ApplyTo, SourceUncertainty, UncertaintyLevel};
