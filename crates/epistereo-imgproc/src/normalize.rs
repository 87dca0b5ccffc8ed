use crate::disparity::DisparityField;
use crate::DisparityError;

/// Rescale the finite values of a field to integer levels in `[0, 255]`.
///
/// Each finite value `v` maps to `round((v - min) / (max - min) * 255)`, where
/// `min` and `max` are taken over the finite values only. Undefined values
/// stay NaN and a constant field maps to 0. Normalizing an already normalized
/// field returns it unchanged.
///
/// # Errors
///
/// [`DisparityError::EmptyDisparityField`] if no value is finite.
///
/// # Example
///
/// ```
/// use epistereo_imgproc::disparity::DisparityField;
/// use epistereo_imgproc::normalize::normalize_min_max_display;
///
/// let field = DisparityField::new([3, 1].into(), vec![-2.0, f32::NAN, 2.0]).unwrap();
/// let normalized = normalize_min_max_display(&field).unwrap();
///
/// assert_eq!(normalized.as_slice()[0], 0.0);
/// assert!(normalized.as_slice()[1].is_nan());
/// assert_eq!(normalized.as_slice()[2], 255.0);
/// ```
pub fn normalize_min_max_display(field: &DisparityField) -> Result<DisparityField, DisparityError> {
    let (min, max) = field
        .finite_range()
        .ok_or(DisparityError::EmptyDisparityField)?;
    let range = max - min;

    let normalized = field.as_image().map(|&v| {
        if !v.is_finite() {
            f32::NAN
        } else if range > 0.0 {
            ((v - min) / range * 255.0).round()
        } else {
            0.0
        }
    });

    Ok(DisparityField::from_image(normalized))
}
