//! Dense disparity by searching along epipolar lines.
//!
//! For every pixel `(x, y)` of the reference image A, the epipolar line
//! `(a, b, c) = F · [x, y, 1]` in the target image B gives a search anchor from
//! its axis intercepts:
//!
//! ```text
//! anchor_x = x - |c / a|
//! anchor_y = y - |c / b|
//! ```
//!
//! This is an approximation of where the line passes near the pixel, not an
//! exact intersection, and it is only accurate for roughly diagonal lines. Two
//! independent 1D searches then sweep `anchor ± n` (clipped to the image):
//!
//! * horizontally, comparing A's 3x3 window with B windows on A's row band,
//! * vertically, comparing with B windows on A's column band.
//!
//! Windows are compared with the sum of absolute differences. Windows touching
//! the border are shifted inwards (see [`ClampedBand`]) so border pixels still
//! get a lower confidence estimate. Positions are measured at window middles,
//! so a shifted window stands for the pixel it is centered on. A component is
//! left undefined (NaN) when the line has no usable intercept on that axis or
//! the clipped range is empty.

use std::ops::RangeInclusive;

use epistereo_geometry::{epipolar::LINE_EPSILON, epipolar_line_in_b, FundamentalMatrix, Point2D};
use epistereo_image::{
    parallel::fill_indexed, ClampedBand, ClampedNeighborhood, ExecutionStrategy, Image,
    ImageError, ImageSize,
};

use crate::normalize::normalize_min_max_display;
use crate::DisparityError;

/// Radius of the square window compared between the two images.
pub const WINDOW_RADIUS: usize = 1;

/// A grid of real valued disparities, NaN where undefined.
#[derive(Clone, Debug, PartialEq)]
pub struct DisparityField(Image<f32, 1>);

impl DisparityField {
    /// Create a field from row-major values.
    pub fn new(size: ImageSize, data: Vec<f32>) -> Result<Self, ImageError> {
        Ok(Self(Image::new(size, data)?))
    }

    /// Wrap a single channel image.
    pub fn from_image(image: Image<f32, 1>) -> Self {
        Self(image)
    }

    /// Size of the field.
    pub fn size(&self) -> ImageSize {
        self.0.size()
    }

    /// Row-major values.
    pub fn as_slice(&self) -> &[f32] {
        self.0.as_slice()
    }

    /// The field as an image.
    pub fn as_image(&self) -> &Image<f32, 1> {
        &self.0
    }

    /// Consume the field and return the underlying image.
    pub fn into_image(self) -> Image<f32, 1> {
        self.0
    }

    /// Value at `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Result<f32, ImageError> {
        self.0.at(x, y)
    }

    /// Number of finite values.
    pub fn count_defined(&self) -> usize {
        self.as_slice().iter().filter(|v| v.is_finite()).count()
    }

    /// Smallest and largest finite value, `None` if there is none.
    pub fn finite_range(&self) -> Option<(f32, f32)> {
        self.as_slice()
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Round to 8-bit gray levels, undefined values become 0.
    ///
    /// Meant for fields already normalized to `[0, 255]`.
    pub fn to_gray8(&self) -> Image<u8, 1> {
        self.0.map(|&v| {
            if v.is_finite() {
                v.round().clamp(0.0, 255.0) as u8
            } else {
                0
            }
        })
    }
}

/// The three disparity fields of a stereo pair.
#[derive(Clone, Debug, PartialEq)]
pub struct DisparityMaps {
    /// `x - best_x` for every pixel of A, in pixels.
    pub horizontal: DisparityField,
    /// `y - best_y` for every pixel of A, in pixels.
    pub vertical: DisparityField,
    /// Euclidean norm of the two components.
    pub magnitude: DisparityField,
}

impl DisparityMaps {
    /// Normalize each field independently to `[0, 255]`.
    ///
    /// # Errors
    ///
    /// [`DisparityError::EmptyDisparityField`] if one of the fields is entirely undefined.
    pub fn normalized(&self) -> Result<Self, DisparityError> {
        Ok(Self {
            horizontal: normalize_min_max_display(&self.horizontal)?,
            vertical: normalize_min_max_display(&self.vertical)?,
            magnitude: normalize_min_max_display(&self.magnitude)?,
        })
    }
}

/// Parameters of the dense disparity search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisparityParams {
    /// Half width `n` of the search interval around the anchor.
    pub search_radius: usize,
    /// How pixels are scheduled.
    pub strategy: ExecutionStrategy,
}

impl Default for DisparityParams {
    fn default() -> Self {
        Self {
            search_radius: 8,
            strategy: ExecutionStrategy::default(),
        }
    }
}

/// Compute the raw horizontal, vertical and magnitude disparity fields.
///
/// Every pixel is independent, so the strategy only changes the scheduling:
/// the output is the same for every strategy.
///
/// Disparities are differences of window middles. On the first and last row
/// and column the window is shifted inwards, so the value there can differ by
/// one pixel from `x - best_x` taken on the raw coordinates.
///
/// # Arguments
///
/// * `f` - Fundamental matrix mapping points of `a` to lines in `b`.
/// * `a` - Reference grayscale image.
/// * `b` - Target grayscale image, same size as `a`.
/// * `params` - Search radius and execution strategy.
///
/// # Errors
///
/// * [`ImageError::InvalidImageSize`] if the images differ in size.
/// * [`ImageError::AxisTooShort`] if an image is narrower or shorter than a window.
pub fn dense_disparity(
    f: &FundamentalMatrix,
    a: &Image<f32, 1>,
    b: &Image<f32, 1>,
    params: &DisparityParams,
) -> Result<DisparityMaps, DisparityError> {
    if a.size() != b.size() {
        return Err(ImageError::InvalidImageSize(a.cols(), a.rows(), b.cols(), b.rows()).into());
    }
    let size = a.size();
    a.clamped_neighborhood(0, 0, WINDOW_RADIUS)?;

    let cols = (0..size.width)
        .map(|x| ClampedBand::new(x, WINDOW_RADIUS, size.width))
        .collect::<Result<Vec<_>, _>>()?;
    let rows = (0..size.height)
        .map(|y| ClampedBand::new(y, WINDOW_RADIUS, size.height))
        .collect::<Result<Vec<_>, _>>()?;

    let search = EpipolarSearch {
        f,
        a: a.as_slice(),
        b: b.as_slice(),
        width: size.width,
        height: size.height,
        cols: &cols,
        rows: &rows,
        radius: params.search_radius as f64,
    };

    let mut pixels = vec![(f32::NAN, f32::NAN); size.num_pixels()];
    fill_indexed(params.strategy, &mut pixels, |idx| {
        search.pixel(idx % size.width, idx / size.width)
    })?;

    let horizontal: Vec<f32> = pixels.iter().map(|p| p.0).collect();
    let vertical: Vec<f32> = pixels.iter().map(|p| p.1).collect();
    let magnitude: Vec<f32> = pixels
        .iter()
        .map(|&(dx, dy)| (dx * dx + dy * dy).sqrt())
        .collect();

    let maps = DisparityMaps {
        horizontal: DisparityField::new(size, horizontal)?,
        vertical: DisparityField::new(size, vertical)?,
        magnitude: DisparityField::new(size, magnitude)?,
    };

    log::debug!(
        "disparity {}: {} horizontal, {} vertical of {} pixels defined",
        size,
        maps.horizontal.count_defined(),
        maps.vertical.count_defined(),
        size.num_pixels()
    );

    Ok(maps)
}

/// Compute the three disparity fields, each normalized to `[0, 255]`.
///
/// # Errors
///
/// Same as [`dense_disparity`], plus [`DisparityError::EmptyDisparityField`]
/// when a field has no defined value.
pub fn dense_disparity_display(
    f: &FundamentalMatrix,
    a: &Image<f32, 1>,
    b: &Image<f32, 1>,
    params: &DisparityParams,
) -> Result<DisparityMaps, DisparityError> {
    dense_disparity(f, a, b, params)?.normalized()
}

struct EpipolarSearch<'a> {
    f: &'a FundamentalMatrix,
    a: &'a [f32],
    b: &'a [f32],
    width: usize,
    height: usize,
    cols: &'a [ClampedBand],
    rows: &'a [ClampedBand],
    radius: f64,
}

impl EpipolarSearch<'_> {
    fn pixel(&self, x: usize, y: usize) -> (f32, f32) {
        let line = epipolar_line_in_b(self.f, &Point2D::new(x as f64, y as f64));
        let window = ClampedNeighborhood::from_bands(self.cols[x], self.rows[y]);

        let dx = anchor(line.a, line.c, x)
            .and_then(|ax| search_range(ax, self.radius, self.width))
            .and_then(|range| {
                self.best_match(&window, range, |cx| {
                    ClampedNeighborhood::from_bands(self.cols[cx], window.rows)
                })
            })
            .map_or(f32::NAN, |bx| {
                window.cols.middle() as f32 - self.cols[bx].middle() as f32
            });

        let dy = anchor(line.b, line.c, y)
            .and_then(|ay| search_range(ay, self.radius, self.height))
            .and_then(|range| {
                self.best_match(&window, range, |cy| {
                    ClampedNeighborhood::from_bands(window.cols, self.rows[cy])
                })
            })
            .map_or(f32::NAN, |by| {
                window.rows.middle() as f32 - self.rows[by].middle() as f32
            });

        if dx.is_nan() || dy.is_nan() {
            log::trace!("pixel ({x}, {y}) has an undefined disparity component");
        }

        (dx, dy)
    }

    /// First candidate with the smallest cost.
    fn best_match(
        &self,
        window: &ClampedNeighborhood,
        candidates: RangeInclusive<usize>,
        candidate_window: impl Fn(usize) -> ClampedNeighborhood,
    ) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for candidate in candidates {
            let cost = self.sad(window, &candidate_window(candidate));
            if best.map_or(!cost.is_nan(), |(_, best_cost)| cost < best_cost) {
                best = Some((candidate, cost));
            }
        }
        best.map(|(candidate, _)| candidate)
    }

    /// Sum of absolute differences between a window of A and a window of B.
    fn sad(&self, wa: &ClampedNeighborhood, wb: &ClampedNeighborhood) -> f32 {
        wa.rows
            .range()
            .zip(wb.rows.range())
            .map(|(ya, yb)| {
                let row_a = &self.a[ya * self.width..(ya + 1) * self.width];
                let row_b = &self.b[yb * self.width..(yb + 1) * self.width];
                wa.cols
                    .range()
                    .zip(wb.cols.range())
                    .map(|(xa, xb)| (row_a[xa] - row_b[xb]).abs())
                    .sum::<f32>()
            })
            .sum()
    }
}

/// Search anchor on one axis from the intercept `|c / coef|` of the line.
///
/// A vanishing coefficient has no intercept: the anchor falls back to the
/// pixel itself when the line passes through the origin, otherwise the axis
/// has no anchor.
fn anchor(coef: f64, c: f64, own: usize) -> Option<f64> {
    if coef.abs() < LINE_EPSILON {
        return (c.abs() < LINE_EPSILON).then_some(own as f64);
    }
    Some(own as f64 - (c / coef).abs())
}

/// `[round(anchor - n), round(anchor + n)]` clipped to `[0, extent - 1]`.
fn search_range(anchor: f64, radius: f64, extent: usize) -> Option<RangeInclusive<usize>> {
    // f64::max and f64::min would swallow a NaN bound
    if !anchor.is_finite() || !radius.is_finite() {
        return None;
    }
    let lo = (anchor - radius).round().max(0.0);
    let hi = (anchor + radius).round().min(extent as f64 - 1.0);
    if lo > hi {
        return None;
    }
    Some(lo as usize..=hi as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_image(size: ImageSize, seed: u64) -> Image<f32, 1> {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = (0..size.num_pixels()).map(|_| rng.random::<f32>()).collect();
        Image::new(size, data).unwrap()
    }

    fn same_row_and_column() -> FundamentalMatrix {
        FundamentalMatrix::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]]).unwrap()
    }

    #[test]
    fn test_anchor() {
        assert_eq!(anchor(2.0, -6.0, 10), Some(7.0));
        assert_eq!(anchor(-2.0, -6.0, 10), Some(7.0));
        assert_eq!(anchor(0.0, 0.0, 4), Some(4.0));
        assert_eq!(anchor(1e-14, 5.0, 4), None);
    }

    #[test]
    fn test_search_range() {
        assert_eq!(search_range(5.0, 2.0, 10), Some(3..=7));
        assert_eq!(search_range(0.6, 2.0, 10), Some(0..=3));
        assert_eq!(search_range(8.4, 2.0, 10), Some(6..=9));
        assert_eq!(search_range(-30.0, 2.0, 10), None);
        assert_eq!(search_range(42.0, 2.0, 10), None);
        assert_eq!(search_range(f64::NAN, 2.0, 10), None);
    }

    #[test]
    fn test_search_range_rejects_non_finite_anchor() {
        assert_eq!(search_range(f64::NAN, 0.0, 10), None);
        assert_eq!(search_range(f64::INFINITY, 2.0, 10), None);
        assert_eq!(search_range(f64::NEG_INFINITY, 2.0, 10), None);
        assert_eq!(search_range(4.0, f64::NAN, 10), None);
    }

    #[test]
    fn test_identical_images_have_zero_disparity() -> Result<(), DisparityError> {
        let size = ImageSize {
            width: 12,
            height: 9,
        };
        let a = random_image(size, 3);
        let maps = dense_disparity(&same_row_and_column(), &a, &a, &DisparityParams::default())?;

        for y in 0..size.height {
            for x in 0..size.width {
                assert_eq!(maps.horizontal.get(x, y)?, 0.0);
                assert_eq!(maps.vertical.get(x, y)?, 0.0);
                assert_eq!(maps.magnitude.get(x, y)?, 0.0);
            }
        }
        Ok(())
    }

    #[test]
    fn test_strategies_agree() -> Result<(), DisparityError> {
        let size = ImageSize {
            width: 16,
            height: 10,
        };
        let a = random_image(size, 5);
        let b = random_image(size, 6);
        let f = FundamentalMatrix::new([[0.0, -0.01, 0.3], [0.01, 0.0, -0.5], [-0.2, 0.4, 0.0]])
            .unwrap();

        let bits = |maps: &DisparityMaps| -> Vec<u32> {
            maps.horizontal
                .as_slice()
                .iter()
                .chain(maps.vertical.as_slice())
                .map(|v| v.to_bits())
                .collect()
        };

        let run = |strategy| {
            dense_disparity(
                &f,
                &a,
                &b,
                &DisparityParams {
                    search_radius: 3,
                    strategy,
                },
            )
        };
        let serial = run(ExecutionStrategy::Serial)?;
        assert_eq!(bits(&serial), bits(&run(ExecutionStrategy::Parallel)?));
        assert_eq!(bits(&serial), bits(&run(ExecutionStrategy::Fixed(2))?));
        Ok(())
    }

    #[test]
    fn test_size_mismatch() {
        let a = random_image([8, 8].into(), 0);
        let b = random_image([8, 7].into(), 0);
        let res = dense_disparity(&same_row_and_column(), &a, &b, &DisparityParams::default());
        assert_eq!(
            res,
            Err(DisparityError::Image(ImageError::InvalidImageSize(8, 8, 8, 7)))
        );
    }

    #[test]
    fn test_too_small() {
        let a = random_image([2, 8].into(), 0);
        let res = dense_disparity(&same_row_and_column(), &a, &a, &DisparityParams::default());
        assert_eq!(
            res,
            Err(DisparityError::Image(ImageError::AxisTooShort {
                required: 3,
                actual: 2
            }))
        );
    }

    #[test]
    fn test_to_gray8() -> Result<(), ImageError> {
        let field = DisparityField::new([4, 1].into(), vec![f32::NAN, 0.4, 127.5, 300.0])?;
        assert_eq!(field.to_gray8().as_slice(), &[0, 0, 128, 255]);
        assert_eq!(field.count_defined(), 3);
        assert_eq!(field.finite_range(), Some((0.4, 300.0)));
        Ok(())
    }
}
