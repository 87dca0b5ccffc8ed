use epistereo_geometry::{Correspondence, Point2D};
use epistereo_image::{ExecutionStrategy, Image};
use rayon::prelude::*;

use crate::FeatureError;

/// Parameters of the NCC matcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherParams {
    /// Patches are `(2 * patch_radius + 1)` pixels wide.
    pub patch_radius: usize,
    /// Minimum correlation, exclusive, for a pair to be proposed.
    pub threshold: f32,
    /// How keypoints of the first image are scheduled.
    pub strategy: ExecutionStrategy,
}

impl Default for MatcherParams {
    fn default() -> Self {
        Self {
            patch_radius: 5,
            threshold: 0.8,
            strategy: ExecutionStrategy::default(),
        }
    }
}

/// A pair of keypoints and the correlation of their patches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NccMatch {
    /// Keypoint `[x, y]` in the first image.
    pub a: [usize; 2],
    /// Keypoint `[x, y]` in the second image.
    pub b: [usize; 2],
    /// Normalized cross-correlation in `[-1, 1]`.
    pub score: f32,
}

impl NccMatch {
    /// The match as a geometric correspondence.
    pub fn correspondence(&self) -> Correspondence {
        Correspondence::new(
            Point2D::new(self.a[0] as f64, self.a[1] as f64),
            Point2D::new(self.b[0] as f64, self.b[1] as f64),
        )
    }
}

/// Mean-subtracted patch values and their norm.
struct Patch {
    values: Vec<f32>,
    norm: f32,
}

impl Patch {
    /// `None` when the patch leaves the image.
    fn extract(image: &Image<f32, 1>, p: [usize; 2], r: usize) -> Option<Self> {
        let [x, y] = p;
        if x < r || y < r || x + r >= image.width() || y + r >= image.height() {
            return None;
        }

        let width = image.width();
        let data = image.as_slice();
        let mut values = Vec::with_capacity((2 * r + 1) * (2 * r + 1));
        for row in y - r..=y + r {
            values.extend_from_slice(&data[row * width + x - r..=row * width + x + r]);
        }

        let (lo, hi) = values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        // flatness is judged on the raw spread, the mean carries rounding error
        let flat = hi - lo <= f32::EPSILON * lo.abs().max(hi.abs()).max(1.0);

        let mean = values.iter().sum::<f32>() / values.len() as f32;
        values.iter_mut().for_each(|v| *v -= mean);
        let norm = if flat {
            0.0
        } else {
            values.iter().map(|v| v * v).sum::<f32>().sqrt()
        };
        Some(Self { values, norm })
    }

    /// `None` for a flat patch, whose correlation is undefined.
    fn ncc(&self, other: &Patch) -> Option<f32> {
        if self.norm == 0.0 || other.norm == 0.0 {
            return None;
        }
        let den = self.norm * other.norm;
        let dot: f32 = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| a * b)
            .sum();
        Some(dot / den)
    }
}

/// Normalized cross-correlation of the patches around `pa` in `a` and `pb` in `b`.
///
/// Returns `None` when a patch does not fit inside its image or is flat.
pub fn ncc(
    a: &Image<f32, 1>,
    b: &Image<f32, 1>,
    pa: [usize; 2],
    pb: [usize; 2],
    patch_radius: usize,
) -> Option<f32> {
    Patch::extract(a, pa, patch_radius)?.ncc(&Patch::extract(b, pb, patch_radius)?)
}

/// Propose correspondences between two keypoint sets by patch correlation.
///
/// Every pair whose correlation exceeds the threshold is proposed, in the
/// order of `keypoints_a` then `keypoints_b`. The proposals are then
/// deduplicated greedily: among proposals sharing a keypoint, the one with the
/// highest score survives (the earlier one on ties). Survivors keep their
/// proposal order.
pub fn match_ncc(
    a: &Image<f32, 1>,
    b: &Image<f32, 1>,
    keypoints_a: &[[usize; 2]],
    keypoints_b: &[[usize; 2]],
    params: &MatcherParams,
) -> Result<Vec<NccMatch>, FeatureError> {
    let r = params.patch_radius;
    let patches_b: Vec<Option<Patch>> = keypoints_b
        .iter()
        .map(|&p| Patch::extract(b, p, r))
        .collect();

    let propose = |pa: &[usize; 2]| -> Vec<NccMatch> {
        let Some(patch_a) = Patch::extract(a, *pa, r) else {
            return Vec::new();
        };
        keypoints_b
            .iter()
            .zip(&patches_b)
            .filter_map(|(pb, patch_b)| {
                let score = patch_a.ncc(patch_b.as_ref()?)?;
                (score > params.threshold).then_some(NccMatch {
                    a: *pa,
                    b: *pb,
                    score,
                })
            })
            .collect()
    };

    let proposals: Vec<NccMatch> = params.strategy.run(
        keypoints_a,
        |kps| kps.iter().flat_map(propose).collect(),
        |kps| kps.par_iter().flat_map_iter(propose).collect(),
    )?;

    let matches = deduplicate(&proposals);
    log::debug!(
        "ncc: {} proposals, {} after deduplication",
        proposals.len(),
        matches.len()
    );

    Ok(matches)
}

/// Greedy pass keeping the best scored proposal among those sharing an endpoint.
fn deduplicate(proposals: &[NccMatch]) -> Vec<NccMatch> {
    let mut removed = vec![false; proposals.len()];
    for i in 0..proposals.len() {
        if removed[i] {
            continue;
        }
        let current = &proposals[i];
        for j in i + 1..proposals.len() {
            if removed[j] {
                continue;
            }
            let other = &proposals[j];
            if current.a == other.a || current.b == other.b {
                if current.score < other.score {
                    removed[i] = true;
                    break;
                }
                removed[j] = true;
            }
        }
    }

    proposals
        .iter()
        .zip(removed)
        .filter_map(|(m, gone)| (!gone).then_some(*m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use epistereo_image::ImageSize;

    fn textured(size: ImageSize, shift: usize) -> Image<f32, 1> {
        Image::from_fn(size, |x, y| {
            let u = (x + shift) as f32;
            let v = y as f32;
            ((u * 0.7).sin() * (v * 0.45).cos() + (u * v * 0.013).sin()) * 0.5 + 0.5
        })
    }

    #[test]
    fn test_ncc_identity_and_bounds() {
        let size = [40, 30].into();
        let image = textured(size, 0);
        assert_relative_eq!(
            ncc(&image, &image, [20, 15], [20, 15], 5).unwrap_or(0.0),
            1.0,
            epsilon = 1e-5
        );
        assert_eq!(ncc(&image, &image, [4, 15], [20, 15], 5), None);
        assert_eq!(ncc(&image, &image, [20, 15], [35, 15], 5), None);

        let inverted = image.map(|v| 1.0 - v);
        assert_relative_eq!(
            ncc(&image, &inverted, [20, 15], [20, 15], 5).unwrap_or(0.0),
            -1.0,
            epsilon = 1e-5
        );

        let flat = Image::from_size_val(size, 0.3).unwrap();
        assert_eq!(ncc(&image, &flat, [20, 15], [20, 15], 5), None);
    }

    #[test]
    fn test_ncc_constant_patches_are_flat() -> Result<(), FeatureError> {
        let size = [40, 30].into();
        let image = textured(size, 0);
        for level in [0.0, 0.1, 0.3, 0.7, 1.0, 200.0] {
            let flat = Image::from_size_val(size, level)?;
            assert_eq!(ncc(&image, &flat, [20, 15], [20, 15], 5), None, "level {level}");
            assert_eq!(ncc(&flat, &image, [20, 15], [20, 15], 5), None, "level {level}");
        }
        Ok(())
    }

    #[test]
    fn test_match_shifted_keypoints() -> Result<(), FeatureError> {
        let size = [60, 40].into();
        let a = textured(size, 3);
        let b = textured(size, 0);
        // b(x + 3) == a(x)
        let kps_a = [[10, 10], [25, 20], [40, 30]];
        let kps_b = [[13, 10], [28, 20], [43, 30]];

        let matches = match_ncc(&a, &b, &kps_a, &kps_b, &MatcherParams::default())?;
        let pairs: Vec<_> = matches.iter().map(|m| (m.a, m.b)).collect();
        assert_eq!(
            pairs,
            vec![([10, 10], [13, 10]), ([25, 20], [28, 20]), ([40, 30], [43, 30])]
        );
        Ok(())
    }

    #[test]
    fn test_deduplicate_keeps_best_score() {
        let m = |a: [usize; 2], b: [usize; 2], score| NccMatch { a, b, score };
        let proposals = [
            m([1, 1], [5, 5], 0.85),
            m([1, 1], [6, 6], 0.95),
            m([2, 2], [6, 6], 0.90),
            m([3, 3], [7, 7], 0.81),
            m([4, 4], [7, 7], 0.81),
        ];
        let kept = deduplicate(&proposals);
        assert_eq!(kept, vec![proposals[1], proposals[3]]);
    }

    #[test]
    fn test_correspondence_conversion() {
        let m = NccMatch {
            a: [3, 4],
            b: [5, 6],
            score: 0.9,
        };
        let c = m.correspondence();
        assert_eq!(c.a, Point2D::new(3.0, 4.0));
        assert_eq!(c.b, Point2D::new(5.0, 6.0));
    }
}
