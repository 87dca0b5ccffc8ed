use faer::Mat;

use crate::{Correspondence, FundamentalError, Point2D};

/// Minimum number of correspondences accepted by [`fundamental_8point`].
pub const MIN_CORRESPONDENCES: usize = 8;

// Relative singular value below which a direction is treated as null.
const DEGENERACY_TOLERANCE: f64 = 1e-9;

/// A 3x3 rank-2 matrix relating two views: `p_bᵀ F p_a = 0`.
///
/// Entries are stored row-major. The matrix is only defined up to scale; the
/// eight-point solver returns it with unit Frobenius norm.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FundamentalMatrix {
    data: [[f64; 3]; 3],
}

impl FundamentalMatrix {
    /// Create a fundamental matrix from row-major entries.
    ///
    /// The entries are always replaced by the closest rank-2 matrix in
    /// Frobenius norm, so the smallest singular value is zero by construction.
    /// A matrix that is already rank 2 only changes by rounding.
    ///
    /// # Errors
    ///
    /// * [`FundamentalError::NonFiniteCoordinates`] if an entry is NaN or infinite.
    /// * [`FundamentalError::DegenerateSample`] if the matrix has rank below 2.
    pub fn new(data: [[f64; 3]; 3]) -> Result<Self, FundamentalError> {
        if data.iter().flatten().any(|v| !v.is_finite()) {
            return Err(FundamentalError::NonFiniteCoordinates);
        }

        let s = singular_values3(&data);
        if s[0] == 0.0 || s[1] <= DEGENERACY_TOLERANCE * s[0] {
            return Err(FundamentalError::DegenerateSample);
        }

        Ok(Self {
            data: project_rank2(&data),
        })
    }

    /// Row-major entries of the matrix.
    pub fn as_array(&self) -> &[[f64; 3]; 3] {
        &self.data
    }

    /// Row-major entries of `Fᵀ`.
    pub fn transpose(&self) -> [[f64; 3]; 3] {
        let m = &self.data;
        [
            [m[0][0], m[1][0], m[2][0]],
            [m[0][1], m[1][1], m[2][1]],
            [m[0][2], m[1][2], m[2][2]],
        ]
    }

    /// Compute `F · v`.
    pub fn apply(&self, v: [f64; 3]) -> [f64; 3] {
        let m = &self.data;
        [
            m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
            m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
            m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
        ]
    }

    /// Compute `Fᵀ · v`.
    pub fn apply_transpose(&self, v: [f64; 3]) -> [f64; 3] {
        let m = &self.data;
        [
            m[0][0] * v[0] + m[1][0] * v[1] + m[2][0] * v[2],
            m[0][1] * v[0] + m[1][1] * v[1] + m[2][1] * v[2],
            m[0][2] * v[0] + m[1][2] * v[1] + m[2][2] * v[2],
        ]
    }

    /// Singular values in non-increasing order. The last one is zero up to
    /// rounding.
    pub fn singular_values(&self) -> [f64; 3] {
        singular_values3(&self.data)
    }

    /// Frobenius norm of the matrix.
    pub fn frobenius_norm(&self) -> f64 {
        self.data.iter().flatten().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Cosine of the angle between the two matrices seen as 9-vectors.
    ///
    /// Since a fundamental matrix is defined up to scale, two estimates of the
    /// same geometry have a cosine of magnitude one.
    pub fn cosine_similarity(&self, other: &Self) -> f64 {
        let dot: f64 = self
            .data
            .iter()
            .flatten()
            .zip(other.data.iter().flatten())
            .map(|(a, b)| a * b)
            .sum();
        dot / (self.frobenius_norm() * other.frobenius_norm())
    }
}

/// Estimate the fundamental matrix using the normalized 8-point algorithm.
///
/// Each image's points are first conditioned with a similarity transform
/// (zero centroid, mean distance `√2`). The null vector of the design matrix is
/// taken from its SVD, projected to rank 2 and mapped back to pixel
/// coordinates. The result has unit Frobenius norm.
///
/// # Arguments
///
/// * `correspondences` - At least 8 point pairs. Exactly 8 gives the minimal
///   solution, more gives the least-squares one.
///
/// # Errors
///
/// * [`FundamentalError::InsufficientPoints`] for fewer than 8 pairs.
/// * [`FundamentalError::NonFiniteCoordinates`] for NaN or infinite input.
/// * [`FundamentalError::DegenerateSample`] when the points do not determine a
///   unique matrix, e.g. repeated or collinear points.
pub fn fundamental_8point(
    correspondences: &[Correspondence],
) -> Result<FundamentalMatrix, FundamentalError> {
    let n = correspondences.len();
    if n < MIN_CORRESPONDENCES {
        return Err(FundamentalError::InsufficientPoints {
            required: MIN_CORRESPONDENCES,
            actual: n,
        });
    }
    if correspondences
        .iter()
        .any(|c| !c.a.is_finite() || !c.b.is_finite())
    {
        return Err(FundamentalError::NonFiniteCoordinates);
    }

    let (xa, t_a) = normalize_points(correspondences.iter().map(|c| c.a))?;
    let (xb, t_b) = normalize_points(correspondences.iter().map(|c| c.b))?;

    // one row of p_bᵀ F p_a = 0 per correspondence
    let mut a = Mat::<f64>::zeros(n, 9);
    for (i, (pa, pb)) in xa.iter().zip(xb.iter()).enumerate() {
        let (x, y) = (pa.x, pa.y);
        let (xp, yp) = (pb.x, pb.y);
        a.write(i, 0, xp * x);
        a.write(i, 1, xp * y);
        a.write(i, 2, xp);
        a.write(i, 3, yp * x);
        a.write(i, 4, yp * y);
        a.write(i, 5, yp);
        a.write(i, 6, x);
        a.write(i, 7, y);
        a.write(i, 8, 1.0);
    }

    let svd = a.svd();
    let s = svd.s_diagonal();
    if s[0].is_nan() || s[0] <= 0.0 || s[7] <= DEGENERACY_TOLERANCE * s[0] {
        return Err(FundamentalError::DegenerateSample);
    }

    let fvec = svd.v().col(8);
    let f = [
        [fvec[0], fvec[1], fvec[2]],
        [fvec[3], fvec[4], fvec[5]],
        [fvec[6], fvec[7], fvec[8]],
    ];

    // F = T_bᵀ F̂ T_a
    let f_rank2 = to_faer_mat3(&project_rank2(&f));
    let f_denorm = t_b.transpose() * f_rank2 * t_a;
    let mut data = from_faer_mat3(&f_denorm);

    let norm = data.iter().flatten().map(|v| v * v).sum::<f64>().sqrt();
    if !norm.is_finite() || norm <= f64::EPSILON {
        return Err(FundamentalError::DegenerateSample);
    }
    data.iter_mut().flatten().for_each(|v| *v /= norm);

    Ok(FundamentalMatrix { data })
}

fn normalize_points(
    points: impl Iterator<Item = Point2D> + Clone,
) -> Result<(Vec<Point2D>, Mat<f64>), FundamentalError> {
    let n = points.clone().count() as f64;
    let (sx, sy) = points
        .clone()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let (mx, my) = (sx / n, sy / n);

    let mean_dist = points
        .clone()
        .map(|p| ((p.x - mx).powi(2) + (p.y - my).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist.is_nan() || mean_dist <= f64::EPSILON * (1.0 + mx.abs() + my.abs()) {
        return Err(FundamentalError::DegenerateSample);
    }
    let scale = std::f64::consts::SQRT_2 / mean_dist;

    let normalized = points
        .map(|p| Point2D::new((p.x - mx) * scale, (p.y - my) * scale))
        .collect();

    // similarity transform T = [[s,0,-s*mx],[0,s,-s*my],[0,0,1]]
    let t = faer::mat![
        [scale, 0.0, -scale * mx],
        [0.0, scale, -scale * my],
        [0.0, 0.0, 1.0]
    ];
    Ok((normalized, t))
}

/// Zero the smallest singular value and recompose.
fn project_rank2(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let svd = to_faer_mat3(m).svd();
    let s = svd.s_diagonal();
    let (u, v) = (svd.u(), svd.v());

    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = s[0] * u.read(i, 0) * v.read(j, 0) + s[1] * u.read(i, 1) * v.read(j, 1);
        }
    }
    out
}

fn singular_values3(m: &[[f64; 3]; 3]) -> [f64; 3] {
    let svd = to_faer_mat3(m).svd();
    let s = svd.s_diagonal();
    [s[0], s[1], s[2]]
}

fn to_faer_mat3(m: &[[f64; 3]; 3]) -> Mat<f64> {
    Mat::from_fn(3, 3, |i, j| m[i][j])
}

fn from_faer_mat3(m: &Mat<f64>) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = m.read(i, j);
        }
    }
    out
}
