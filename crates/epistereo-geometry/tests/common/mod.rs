#![allow(dead_code)]

use epistereo_geometry::{Correspondence, Point2D};
use rand::{rngs::StdRng, Rng, SeedableRng};

const FOCAL: f64 = 500.0;
const CX: f64 = 320.0;
const CY: f64 = 240.0;

/// Project a 3D point seen by the reference camera into both views.
///
/// Camera B is rotated about the y axis by 0.1 rad and shifted sideways.
pub fn project(p: [f64; 3]) -> Correspondence {
    let (s, c) = 0.1f64.sin_cos();
    let [x, y, z] = p;
    let (xb, yb, zb) = (c * x + s * z - 0.8, y + 0.1, -s * x + c * z + 0.2);
    Correspondence::new(
        Point2D::new(FOCAL * x / z + CX, FOCAL * y / z + CY),
        Point2D::new(FOCAL * xb / zb + CX, FOCAL * yb / zb + CY),
    )
}

/// Noise-free correspondences of random points in front of both cameras.
pub fn two_view_points(n: usize, seed: u64) -> Vec<Correspondence> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            project([
                rng.random_range(-2.0..2.0),
                rng.random_range(-1.5..1.5),
                rng.random_range(4.0..8.0),
            ])
        })
        .collect()
}

/// Replace the point in image B by a far away random location.
pub fn corrupt(c: &Correspondence, rng: &mut StdRng) -> Correspondence {
    let dx: f64 = rng.random_range(40.0..120.0) * if rng.random::<bool>() { 1.0 } else { -1.0 };
    let dy: f64 = rng.random_range(40.0..120.0) * if rng.random::<bool>() { 1.0 } else { -1.0 };
    Correspondence::new(c.a, Point2D::new(c.b.x + dx, c.b.y + dy))
}
