/// A 2D point in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2D {
    /// Horizontal coordinate (column).
    pub x: f64,
    /// Vertical coordinate (row).
    pub y: f64,
}

impl Point2D {
    /// Create a new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The point as a homogeneous 3-vector `[x, y, 1]`.
    pub fn homogeneous(&self) -> [f64; 3] {
        [self.x, self.y, 1.0]
    }

    /// Whether both coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Point2D {
    fn from(p: [f64; 2]) -> Self {
        Self::new(p[0], p[1])
    }
}

impl From<(usize, usize)> for Point2D {
    fn from((x, y): (usize, usize)) -> Self {
        Self::new(x as f64, y as f64)
    }
}

/// A putative match between a point of image A and a point of image B.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Correspondence {
    /// Observation in image A.
    pub a: Point2D,
    /// Observation in image B.
    pub b: Point2D,
}

impl Correspondence {
    /// Create a new correspondence.
    pub const fn new(a: Point2D, b: Point2D) -> Self {
        Self { a, b }
    }
}

impl From<([f64; 2], [f64; 2])> for Correspondence {
    fn from((a, b): ([f64; 2], [f64; 2])) -> Self {
        Self::new(a.into(), b.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_homogeneous() {
        let p = Point2D::new(3.0, -2.5);
        assert_eq!(p.homogeneous(), [3.0, -2.5, 1.0]);
        assert!(p.is_finite());
        assert!(!Point2D::new(f64::NAN, 0.0).is_finite());
    }

    #[test]
    fn test_correspondence_from_arrays() {
        let c: Correspondence = ([1.0, 2.0], [3.0, 4.0]).into();
        assert_eq!(c.a, Point2D::new(1.0, 2.0));
        assert_eq!(c.b, Point2D::new(3.0, 4.0));
    }
}
