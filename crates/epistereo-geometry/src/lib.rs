#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the geometry module.
pub mod error;

/// Epipolar lines and correspondence distances.
pub mod epipolar;

/// Fundamental matrix type and the normalized eight-point solver.
pub mod fundamental;

/// 2D points and point correspondences.
pub mod point;

/// Robust fundamental matrix estimation with RANSAC.
pub mod ransac;

pub use crate::epipolar::{
    epipolar_distance, epipolar_line_in_a, epipolar_line_in_b, sampson_distance, EpipolarLine,
};
pub use crate::error::{FundamentalError, RansacError};
pub use crate::fundamental::{fundamental_8point, FundamentalMatrix};
pub use crate::point::{Correspondence, Point2D};
pub use crate::ransac::{ransac_fundamental, RansacParams, RansacResult};
