use epistereo_image::ParallelError;

/// An error type for the eight-point solver.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FundamentalError {
    /// Fewer correspondences than the solver needs.
    #[error("Need at least {required} correspondences, got {actual}")]
    InsufficientPoints {
        /// Minimum number of correspondences.
        required: usize,
        /// Number of correspondences supplied.
        actual: usize,
    },

    /// The sample does not constrain a unique matrix (collinear, repeated or
    /// otherwise rank-deficient points).
    #[error("Degenerate sample: the design matrix is rank deficient")]
    DegenerateSample,

    /// A coordinate or matrix entry is NaN or infinite.
    #[error("Non-finite coordinate or matrix entry")]
    NonFiniteCoordinates,
}

/// An error type for the RANSAC estimator.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RansacError {
    /// Not enough correspondences to draw a single minimal sample.
    #[error("Insufficient correspondences: required {required}, got {actual}")]
    InsufficientCorrespondences {
        /// Size of the minimal sample.
        required: usize,
        /// Number of correspondences supplied.
        actual: usize,
    },

    /// No iteration produced a model supported by a minimal sample worth of inliers.
    ///
    /// Besides runs where every sample was degenerate, this covers runs where
    /// samples were fitted but none of the models reached 8 inliers, e.g. with
    /// a threshold far below the noise level. `degenerate_samples` tells the
    /// two cases apart.
    #[error(
        "No consensus after {iterations} iterations ({degenerate_samples} degenerate samples)"
    )]
    NoConsensus {
        /// Iterations run.
        iterations: usize,
        /// Iterations whose sample could not be fitted.
        degenerate_samples: usize,
    },

    /// The inlier threshold must be a positive finite distance.
    #[error("Invalid inlier threshold {0}")]
    InvalidThreshold(f64),

    /// The execution strategy could not be honored.
    #[error(transparent)]
    Parallel(#[from] ParallelError),
}
