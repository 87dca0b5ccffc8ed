use epistereo_image::{ImageError, ParallelError};

/// An error type for the dense disparity engine.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DisparityError {
    /// Every value of the field is undefined, so it cannot be normalized.
    #[error("Every value of the disparity field is undefined")]
    EmptyDisparityField,

    /// The images or the field are malformed or have different sizes.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The execution strategy could not be honored.
    #[error(transparent)]
    Parallel(#[from] ParallelError),
}

/// An error type for corner detection and patch matching.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FeatureError {
    /// The Gaussian smoothing scale must be positive and finite.
    #[error("Invalid Gaussian sigma {0}")]
    InvalidSigma(f32),

    /// The image is malformed or too small.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The execution strategy could not be honored.
    #[error(transparent)]
    Parallel(#[from] ParallelError),
}
