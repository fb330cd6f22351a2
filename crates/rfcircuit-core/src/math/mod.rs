//! Mathematical functions module
//!
//! Unit conversions, small-matrix helpers, dense linear algebra and the
//! network parameter transforms.

pub mod conversions;
pub mod linalg;
pub mod matrix_ops;
pub mod transforms;

pub use conversions::*;
pub use transforms::*;
