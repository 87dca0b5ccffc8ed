use epistereo_image::{
    parallel::fill_indexed, ClampedNeighborhood, ExecutionStrategy, Image, ImageSize,
};

use crate::FeatureError;

const SOBEL_X: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_Y: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Parameters of the Harris corner detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarrisParams {
    /// Weight of the squared trace in `R = det - k * trace²`.
    pub k: f32,
    /// Standard deviation of the Gaussian smoothing the gradient products.
    pub sigma: f32,
    /// Radius of the window summing the structure tensor.
    pub window_radius: usize,
    /// Minimum separation in pixels between two corners, also excluded at the border.
    pub min_distance: usize,
    /// How rows are scheduled.
    pub strategy: ExecutionStrategy,
}

impl Default for HarrisParams {
    fn default() -> Self {
        Self {
            k: 0.05,
            sigma: 0.7,
            window_radius: 3,
            min_distance: 5,
            strategy: ExecutionStrategy::default(),
        }
    }
}

/// Compute the Harris response of a grayscale image.
///
/// Sobel gradients (zero padded) are multiplied into the structure tensor
/// entries, smoothed with a separable Gaussian and summed over a square
/// window. The response `R = det - k * trace²` is only computed where the
/// window fits, elsewhere it is 0.
pub fn harris_response(
    src: &Image<f32, 1>,
    params: &HarrisParams,
) -> Result<Image<f32, 1>, FeatureError> {
    if !params.sigma.is_finite() || params.sigma <= 0.0 {
        return Err(FeatureError::InvalidSigma(params.sigma));
    }

    let size = src.size();
    let ix = correlate3(src, &SOBEL_X);
    let iy = correlate3(src, &SOBEL_Y);

    let kernel = gaussian_kernel_1d(params.sigma);
    let ixx = Image::<f32, 1>::new(size, gaussian_blur(&mul(&ix, &ix), &kernel, size))?;
    let iyy = Image::<f32, 1>::new(size, gaussian_blur(&mul(&iy, &iy), &kernel, size))?;
    let ixy = Image::<f32, 1>::new(size, gaussian_blur(&mul(&ix, &iy), &kernel, size))?;

    let r = params.window_radius;
    let mut response = vec![0.0f32; size.num_pixels()];
    fill_indexed(params.strategy, &mut response, |idx| {
        let (x, y) = (idx % size.width, idx / size.width);
        if x < r || y < r || x + r >= size.width || y + r >= size.height {
            return 0.0;
        }
        let Ok(window) = ClampedNeighborhood::new(x, y, r, size) else {
            return 0.0;
        };

        let (mut sxx, mut syy, mut sxy) = (0.0f32, 0.0f32, 0.0f32);
        ixx.for_each_in(&window, |v| sxx += v);
        iyy.for_each_in(&window, |v| syy += v);
        ixy.for_each_in(&window, |v| sxy += v);

        let det = sxx * syy - sxy * sxy;
        let trace = sxx + syy;
        det - params.k * trace * trace
    })?;

    Ok(Image::new(size, response)?)
}

/// Detect Harris corners as `[x, y]` pixel coordinates.
///
/// A corner is a local maximum of the response within `min_distance`, above
/// `mean + std` of the whole response map and at least `min_distance` away
/// from the image border. Corners are returned by decreasing response, and a
/// weaker corner closer than `min_distance` (Chebyshev) to a stronger one is
/// dropped.
pub fn harris_corners(
    src: &Image<f32, 1>,
    params: &HarrisParams,
) -> Result<Vec<[usize; 2]>, FeatureError> {
    let response = harris_response(src, params)?;
    let size = response.size();
    let values = response.as_slice();

    let n = values.len().max(1) as f32;
    let mean = values.iter().sum::<f32>() / n;
    let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n).sqrt();
    let threshold = mean + std;

    let d = params.min_distance;
    let mut peaks: Vec<([usize; 2], f32)> = Vec::new();
    for y in d..size.height.saturating_sub(d) {
        for x in d..size.width.saturating_sub(d) {
            let v = values[y * size.width + x];
            if v > threshold && is_local_max(values, size, x, y, d) {
                peaks.push(([x, y], v));
            }
        }
    }

    // stable: equal responses keep raster order
    peaks.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut corners: Vec<[usize; 2]> = Vec::with_capacity(peaks.len());
    for (p, _) in peaks {
        let isolated = corners
            .iter()
            .all(|c| c[0].abs_diff(p[0]).max(c[1].abs_diff(p[1])) > d);
        if isolated {
            corners.push(p);
        }
    }

    log::debug!("harris: {} corners above {threshold}", corners.len());

    Ok(corners)
}

fn is_local_max(values: &[f32], size: ImageSize, x: usize, y: usize, d: usize) -> bool {
    let v = values[y * size.width + x];
    let (x0, x1) = (x.saturating_sub(d), (x + d).min(size.width - 1));
    let (y0, y1) = (y.saturating_sub(d), (y + d).min(size.height - 1));
    (y0..=y1).all(|yy| {
        values[yy * size.width + x0..=yy * size.width + x1]
            .iter()
            .all(|&w| w <= v)
    })
}

/// Normalized 1D Gaussian of size `ceil(5σ)` rounded up to odd.
pub fn gaussian_kernel_1d(sigma: f32) -> Vec<f32> {
    let mut size = (5.0 * sigma).ceil() as usize;
    if size % 2 == 0 {
        size += 1;
    }
    let half = (size / 2) as i32;

    let kernel: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.into_iter().map(|k| k / sum).collect()
}

/// 3x3 correlation with zero padding.
fn correlate3(src: &Image<f32, 1>, kernel: &[[f32; 3]; 3]) -> Vec<f32> {
    let (w, h) = (src.width() as isize, src.height() as isize);
    let data = src.as_slice();
    let mut out = vec![0.0f32; data.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (ky, krow) in kernel.iter().enumerate() {
                let yy = y + ky as isize - 1;
                if yy < 0 || yy >= h {
                    continue;
                }
                for (kx, k) in krow.iter().enumerate() {
                    let xx = x + kx as isize - 1;
                    if xx < 0 || xx >= w {
                        continue;
                    }
                    acc += k * data[(yy * w + xx) as usize];
                }
            }
            out[(y * w + x) as usize] = acc;
        }
    }
    out
}

fn mul(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter().zip(b).map(|(x, y)| x * y).collect()
}

/// Separable blur with zero padding: rows first, then columns.
fn gaussian_blur(src: &[f32], kernel: &[f32], size: ImageSize) -> Vec<f32> {
    let (w, h) = (size.width as isize, size.height as isize);
    let half = (kernel.len() / 2) as isize;

    let mut tmp = vec![0.0f32; src.len()];
    for y in 0..h {
        for x in 0..w {
            tmp[(y * w + x) as usize] = kernel
                .iter()
                .enumerate()
                .map(|(k, kv)| {
                    let xx = x + k as isize - half;
                    if xx < 0 || xx >= w {
                        0.0
                    } else {
                        kv * src[(y * w + xx) as usize]
                    }
                })
                .sum();
        }
    }

    let mut out = vec![0.0f32; src.len()];
    for y in 0..h {
        for x in 0..w {
            out[(y * w + x) as usize] = kernel
                .iter()
                .enumerate()
                .map(|(k, kv)| {
                    let yy = y + k as isize - half;
                    if yy < 0 || yy >= h {
                        0.0
                    } else {
                        kv * tmp[(yy * w + x) as usize]
                    }
                })
                .sum();
        }
    }
    out
}
