//! Robust two-view epipolar geometry and dense disparity along epipolar lines.
//!
//! The crates of the workspace are re-exported as modules:
//!
//! * [`image`]: the image container, its size and clamped pixel windows.
//! * [`geometry`]: correspondences, the eight-point solver and RANSAC.
//! * [`imgproc`]: grayscale conversion, corners, matching and dense disparity.
//! * [`io`]: PNG reading and writing.

#[doc(inline)]
pub use epistereo_image as image;

#[doc(inline)]
pub use epistereo_geometry as geometry;

#[doc(inline)]
pub use epistereo_imgproc as imgproc;

#[doc(inline)]
pub use epistereo_io as io;
