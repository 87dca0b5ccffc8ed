use std::ops::Range;

use crate::{ImageError, ImageSize};

/// A run of `2 * radius + 1` consecutive indices along one image axis.
///
/// The run is centered on the requested index whenever it fits. Close to the
/// borders it is shifted inwards so that it always covers valid indices: the
/// nearest valid band is reused instead of padding the image.
///
/// # Examples
///
/// ```
/// use epistereo_image::ClampedBand;
///
/// let band = ClampedBand::new(0, 1, 10).unwrap();
/// assert_eq!(band.range(), 0..3);
/// assert!(band.is_shifted());
///
/// let band = ClampedBand::new(5, 1, 10).unwrap();
/// assert_eq!(band.range(), 4..7);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClampedBand {
    start: usize,
    len: usize,
    center: usize,
}

impl ClampedBand {
    /// Build the band around `center` on an axis of length `extent`.
    ///
    /// # Errors
    ///
    /// * [`ImageError::AxisTooShort`] if the axis cannot hold the band.
    /// * [`ImageError::PixelIndexOutOfBounds`] if `center` is not on the axis.
    pub fn new(center: usize, radius: usize, extent: usize) -> Result<Self, ImageError> {
        let len = 2 * radius + 1;
        if extent < len {
            return Err(ImageError::AxisTooShort {
                required: len,
                actual: extent,
            });
        }
        if center >= extent {
            return Err(ImageError::PixelIndexOutOfBounds(center, 0, extent, 1));
        }

        let start = center.saturating_sub(radius).min(extent - len);
        Ok(Self { start, len, center })
    }

    /// First index of the band.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of indices in the band.
    pub fn len(&self) -> usize {
        self.len
    }

    /// A band always holds at least one index.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The indices covered by the band.
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }

    /// Middle index of the band. Equal to the requested center unless shifted.
    pub fn middle(&self) -> usize {
        self.start + self.len / 2
    }

    /// Whether the band had to be moved off its center to stay inside the axis.
    pub fn is_shifted(&self) -> bool {
        self.middle() != self.center
    }
}

/// A square window of pixels made of a column band and a row band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClampedNeighborhood {
    /// Columns covered by the window.
    pub cols: ClampedBand,
    /// Rows covered by the window.
    pub rows: ClampedBand,
}

impl ClampedNeighborhood {
    /// Build the clamped window of the given radius around `(x, y)`.
    pub fn new(x: usize, y: usize, radius: usize, size: ImageSize) -> Result<Self, ImageError> {
        if x >= size.width || y >= size.height {
            return Err(ImageError::PixelIndexOutOfBounds(
                x,
                y,
                size.width,
                size.height,
            ));
        }
        Ok(Self {
            cols: ClampedBand::new(x, radius, size.width)?,
            rows: ClampedBand::new(y, radius, size.height)?,
        })
    }

    /// Combine two independently built bands into a window.
    pub fn from_bands(cols: ClampedBand, rows: ClampedBand) -> Self {
        Self { cols, rows }
    }

    /// Whether either band had to be shifted, i.e. the window touches a border.
    pub fn is_shifted(&self) -> bool {
        self.cols.is_shifted() || self.rows.is_shifted()
    }
}
