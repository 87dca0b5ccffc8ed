use epistereo_image::{Image, ImageError};
use rayon::prelude::*;

/// Define the RGB weights for the grayscale conversion.
const RW: f32 = 0.2989;
const GW: f32 = 0.5870;
const BW: f32 = 0.1140;

/// Convert an RGB8 image to a grayscale intensity image in `[0, 1]`.
///
/// Y = (0.2989 * R + 0.5870 * G + 0.1140 * B) / 255
///
/// # Example
///
/// ```
/// use epistereo_image::{Image, ImageSize};
/// use epistereo_imgproc::color::gray_from_rgb8;
///
/// let image = Image::<u8, 3>::new(
///     ImageSize {
///         width: 4,
///         height: 5,
///     },
///     vec![255u8; 4 * 5 * 3],
/// )
/// .unwrap();
///
/// let gray = gray_from_rgb8(&image).unwrap();
/// assert_eq!(gray.num_channels(), 1);
/// assert_eq!(gray.size().width, 4);
/// assert_eq!(gray.size().height, 5);
/// ```
pub fn gray_from_rgb8(src: &Image<u8, 3>) -> Result<Image<f32, 1>, ImageError> {
    let mut dst = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;

    src.as_slice()
        .par_chunks_exact(3)
        .zip(dst.as_slice_mut().par_iter_mut())
        .for_each(|(rgb, gray)| {
            let (r, g, b) = (rgb[0] as f32, rgb[1] as f32, rgb[2] as f32);
            *gray = (RW * r + GW * g + BW * b) / 255.0;
        });

    Ok(dst)
}

/// Convert a mono8 image to a grayscale intensity image in `[0, 1]`.
pub fn gray_from_mono8(src: &Image<u8, 1>) -> Result<Image<f32, 1>, ImageError> {
    src.cast_and_scale(1.0 / 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use epistereo_image::ImageSize;

    #[test]
    fn gray_from_rgb8_weights() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 3,
            height: 1,
        };
        let image = Image::<u8, 3>::new(size, vec![255, 0, 0, 0, 255, 0, 10, 20, 30])?;
        let gray = gray_from_rgb8(&image)?;
        let v = gray.as_slice();
        assert_relative_eq!(v[0], 0.2989, epsilon = 1e-6);
        assert_relative_eq!(v[1], 0.5870, epsilon = 1e-6);
        assert_relative_eq!(
            v[2],
            (0.2989 * 10.0 + 0.5870 * 20.0 + 0.1140 * 30.0) / 255.0,
            epsilon = 1e-6
        );
        Ok(())
    }

    #[test]
    fn gray_from_mono8_scale() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::new([3, 1].into(), vec![0, 51, 255])?;
        let gray = gray_from_mono8(&image)?;
        assert_relative_eq!(gray.as_slice()[1], 0.2, epsilon = 1e-6);
        assert_relative_eq!(gray.as_slice()[2], 1.0, epsilon = 1e-6);
        Ok(())
    }
}
