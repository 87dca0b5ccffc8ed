#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// color transformations module.
pub mod color;

/// dense disparity along epipolar lines.
pub mod disparity;

/// Error types for the imgproc module.
pub mod error;

/// feature detection module.
pub mod features;

/// patch based correspondence matching.
pub mod matching;

/// operations to normalize disparity fields for display.
pub mod normalize;

pub use crate::error::{DisparityError, FeatureError};
