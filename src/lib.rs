// SPDX-License-Identifier: Apache-2.0

//! Maps extracted LUT functions onto a library of custom 8-input cells by
//! checking membership in each cell's input-permutation orbit.

pub mod catalog;
pub mod cell_formula;
pub mod liberty_emit;
pub mod lut_extract;
pub mod lut_match;
pub mod orbit;
pub mod perm8;
pub mod remap;
pub mod tt256;

pub use catalog::{BaseFunction, Catalog, CatalogError};
pub use lut_match::{match_candidate, CandidateLut, MatchError, MatchResult};
pub use orbit::{compute_orbit, OrbitSet};
pub use perm8::{apply_perm, Perm8, Placement};
pub use tt256::TruthTable256;
