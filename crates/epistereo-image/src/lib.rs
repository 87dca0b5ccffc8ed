#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// image representation for computer vision purposes.
pub mod image;

/// Error types for the image module.
pub mod error;

/// Border-aware pixel windows shared by the detectors and the disparity search.
pub mod neighborhood;

/// module containing parallelization utilities.
pub mod parallel;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
pub use crate::neighborhood::{ClampedBand, ClampedNeighborhood};
pub use crate::parallel::{ExecutionStrategy, ParallelError};
