//! Network module - two-port electrical network representation
//!
//! Provides the Network struct holding S-parameters over a frequency grid,
//! its Z/Y/ABCD views, property checks and operations.

mod core;
mod operators;
mod params;
mod properties;

pub use core::Network;
pub use properties::{
    diagonal_real_parts_nonnegative, point_reciprocity_error, reciprocity_error, s_matrix_passive,
};
