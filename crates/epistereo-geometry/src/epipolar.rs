use crate::{Correspondence, FundamentalMatrix, Point2D};

/// Coefficient magnitude below which a line is treated as parallel to an axis.
pub const LINE_EPSILON: f64 = 1e-12;

/// A line `a·x + b·y + c = 0` in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpipolarLine {
    /// Coefficient of `x`.
    pub a: f64,
    /// Coefficient of `y`.
    pub b: f64,
    /// Constant term.
    pub c: f64,
}

impl EpipolarLine {
    /// Create a line from its coefficients.
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// The line coefficients as a 3-vector.
    pub fn coefficients(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }

    /// Algebraic value `a·x + b·y + c` at `p`.
    pub fn evaluate(&self, p: &Point2D) -> f64 {
        self.a * p.x + self.b * p.y + self.c
    }

    /// Whether `a` and `b` both vanish, in which case the line has no direction.
    pub fn is_degenerate(&self) -> bool {
        self.a.hypot(self.b) < LINE_EPSILON
    }

    /// Euclidean distance from `p` to the line.
    ///
    /// A degenerate line is infinitely far from every point.
    pub fn distance(&self, p: &Point2D) -> f64 {
        let norm = self.a.hypot(self.b);
        if norm < LINE_EPSILON {
            return f64::INFINITY;
        }
        self.evaluate(p).abs() / norm
    }

    /// Column of the line at row `y`, or `None` when the line is horizontal.
    pub fn x_at(&self, y: f64) -> Option<f64> {
        if self.a.abs() < LINE_EPSILON {
            return None;
        }
        Some(-(self.b * y + self.c) / self.a)
    }

    /// Row of the line at column `x`, or `None` when the line is vertical.
    pub fn y_at(&self, x: f64) -> Option<f64> {
        if self.b.abs() < LINE_EPSILON {
            return None;
        }
        Some(-(self.a * x + self.c) / self.b)
    }
}

impl From<[f64; 3]> for EpipolarLine {
    fn from(l: [f64; 3]) -> Self {
        Self::new(l[0], l[1], l[2])
    }
}

/// Line in image B on which the match of `p_a` must lie: `F · p_a`.
pub fn epipolar_line_in_b(f: &FundamentalMatrix, p_a: &Point2D) -> EpipolarLine {
    f.apply(p_a.homogeneous()).into()
}

/// Line in image A on which the match of `p_b` must lie: `Fᵀ · p_b`.
pub fn epipolar_line_in_a(f: &FundamentalMatrix, p_b: &Point2D) -> EpipolarLine {
    f.apply_transpose(p_b.homogeneous()).into()
}

/// Distance in pixels of `p_a` from the epipolar line of `p_b` in image A.
///
/// This is the inlier metric of [`crate::ransac_fundamental`].
pub fn epipolar_distance(f: &FundamentalMatrix, c: &Correspondence) -> f64 {
    epipolar_line_in_a(f, &c.b).distance(&c.a)
}

/// First-order geometric (Sampson) error of a correspondence, in squared pixels.
pub fn sampson_distance(f: &FundamentalMatrix, c: &Correspondence) -> f64 {
    let fa = f.apply(c.a.homogeneous());
    let ftb = f.apply_transpose(c.b.homogeneous());
    let pb = c.b.homogeneous();
    let num = pb[0] * fa[0] + pb[1] * fa[1] + pb[2] * fa[2];
    let den = fa[0] * fa[0] + fa[1] * fa[1] + ftb[0] * ftb[0] + ftb[1] * ftb[1];
    if den < LINE_EPSILON {
        return f64::INFINITY;
    }
    num * num / den
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_line_solve_and_distance() {
        // x - y + 2 = 0
        let line = EpipolarLine::new(1.0, -1.0, 2.0);
        assert_relative_eq!(line.x_at(5.0).unwrap_or(f64::NAN), 3.0);
        assert_relative_eq!(line.y_at(3.0).unwrap_or(f64::NAN), 5.0);
        assert_relative_eq!(
            line.distance(&Point2D::new(0.0, 0.0)),
            2.0 / 2f64.sqrt(),
            epsilon = 1e-12
        );
        assert_eq!(line.evaluate(&Point2D::new(3.0, 5.0)), 0.0);
    }

    #[test]
    fn test_axis_parallel_lines() {
        let horizontal = EpipolarLine::new(0.0, 1.0, -4.0);
        assert_eq!(horizontal.x_at(1.0), None);
        assert_eq!(horizontal.y_at(100.0), Some(4.0));

        let vertical = EpipolarLine::new(2.0, 0.0, -6.0);
        assert_eq!(vertical.y_at(1.0), None);
        assert_eq!(vertical.x_at(-7.0), Some(3.0));

        let degenerate = EpipolarLine::new(0.0, 0.0, 1.0);
        assert!(degenerate.is_degenerate());
        assert_eq!(degenerate.distance(&Point2D::new(1.0, 1.0)), f64::INFINITY);
    }

    #[test]
    fn test_line_orientation() -> Result<(), crate::FundamentalError> {
        // pure horizontal translation: matches share the same row
        let f = FundamentalMatrix::new([[0.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]])?;
        let c = Correspondence::new(Point2D::new(10.0, 7.0), Point2D::new(4.0, 7.0));

        let in_b = epipolar_line_in_b(&f, &c.a);
        assert_relative_eq!(in_b.y_at(123.0).unwrap_or(f64::NAN), 7.0, epsilon = 1e-12);
        let in_a = epipolar_line_in_a(&f, &c.b);
        assert_relative_eq!(in_a.y_at(-5.0).unwrap_or(f64::NAN), 7.0, epsilon = 1e-12);

        assert_relative_eq!(epipolar_distance(&f, &c), 0.0, epsilon = 1e-12);
        assert_relative_eq!(sampson_distance(&f, &c), 0.0, epsilon = 1e-12);

        let off = Correspondence::new(Point2D::new(10.0, 9.0), Point2D::new(4.0, 7.0));
        assert_relative_eq!(epipolar_distance(&f, &off), 2.0, epsilon = 1e-12);
        // both lines are one pixel off the other point
        assert_relative_eq!(sampson_distance(&f, &off), 2.0, epsilon = 1e-12);
        Ok(())
    }
}
