//! RANSAC-based robust estimation of the fundamental matrix.

use epistereo_image::ExecutionStrategy;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;

use crate::fundamental::MIN_CORRESPONDENCES;
use crate::{epipolar_distance, fundamental_8point, Correspondence, FundamentalMatrix, RansacError};

/// Iterations evaluated per worker thread before the batch is reduced.
const ITERATIONS_PER_THREAD: usize = 4;

/// Parameters for RANSAC over the eight-point solver.
#[derive(Debug, Clone, PartialEq)]
pub struct RansacParams {
    /// Maximum number of RANSAC iterations.
    pub max_iterations: usize,
    /// Point-to-epipolar-line distance in pixels (image A) below which a
    /// correspondence is an inlier.
    pub threshold: f64,
    /// Optional fixed seed for reproducible sampling.
    pub random_seed: Option<u64>,
    /// How candidate evaluation is scheduled.
    pub strategy: ExecutionStrategy,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            threshold: 1.0,
            random_seed: Some(0),
            strategy: ExecutionStrategy::default(),
        }
    }
}

/// RANSAC result for the fundamental matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct RansacResult {
    /// Matrix refitted on all inliers of the best candidate.
    pub model: FundamentalMatrix,
    /// Inlier correspondences of the best candidate, in input order.
    pub inliers: Vec<Correspondence>,
    /// Per-correspondence inlier flags.
    pub inlier_mask: Vec<bool>,
    /// Number of inliers.
    pub inlier_count: usize,
    /// Iterations run before stopping.
    pub iterations: usize,
    /// Whether the consensus stop condition fired. `false` means the iteration
    /// budget ran out and the result has low confidence.
    pub converged: bool,
    /// Inlier count of the best candidate after each improvement.
    pub history: Vec<usize>,
}

/// Outcome of a single iteration.
enum Candidate {
    /// The minimal sample could not be fitted.
    Degenerate,
    /// A fitted model and its support on the whole set.
    Scored {
        model: FundamentalMatrix,
        mask: Vec<bool>,
        count: usize,
    },
}

struct Best {
    model: FundamentalMatrix,
    mask: Vec<bool>,
    count: usize,
}

struct Search {
    best: Option<Best>,
    iterations: usize,
    degenerate_samples: usize,
    converged: bool,
    history: Vec<usize>,
}

/// Estimate a fundamental matrix robustly from noisy correspondences.
///
/// Every iteration fits the eight-point solver on 8 distinct correspondences
/// drawn uniformly at random, then counts the correspondences whose point in
/// image A lies within `threshold` pixels of the epipolar line of its match.
/// The candidate with the most inliers wins, ties keep the earlier one. A
/// candidate needs at least 8 inliers to be retained. The search stops early
/// once the best candidate is supported by more than 4/5 of the set (and by
/// more than 8 correspondences). The winner is refitted on all of its inliers.
///
/// Iteration `i` samples from its own random stream derived from the seed, so
/// the result only depends on the seed, never on the execution strategy.
///
/// # Errors
///
/// * [`RansacError::InsufficientCorrespondences`] for fewer than 8 correspondences.
/// * [`RansacError::InvalidThreshold`] for a non-positive or non-finite threshold.
/// * [`RansacError::NoConsensus`] when no iteration produced a retained candidate.
pub fn ransac_fundamental(
    correspondences: &[Correspondence],
    params: &RansacParams,
) -> Result<RansacResult, RansacError> {
    let n = correspondences.len();
    if n < MIN_CORRESPONDENCES {
        return Err(RansacError::InsufficientCorrespondences {
            required: MIN_CORRESPONDENCES,
            actual: n,
        });
    }
    if !params.threshold.is_finite() || params.threshold <= 0.0 {
        return Err(RansacError::InvalidThreshold(params.threshold));
    }

    let seed = params.random_seed.unwrap_or_else(|| rand::rng().random());

    let search = params.strategy.run(
        (),
        |_| search(correspondences, params, seed, 1, false),
        |_| {
            let batch = rayon::current_num_threads() * ITERATIONS_PER_THREAD;
            search(correspondences, params, seed, batch, true)
        },
    )?;

    let Some(best) = search.best else {
        return Err(RansacError::NoConsensus {
            iterations: search.iterations,
            degenerate_samples: search.degenerate_samples,
        });
    };

    if !search.converged {
        log::warn!(
            "RANSAC stopped after {} iterations without reaching consensus ({}/{} inliers)",
            search.iterations,
            best.count,
            n
        );
    }

    let inliers: Vec<Correspondence> = correspondences
        .iter()
        .zip(best.mask.iter())
        .filter_map(|(c, &inlier)| inlier.then_some(*c))
        .collect();

    let model = match fundamental_8point(&inliers) {
        Ok(refit) => refit,
        Err(e) => {
            log::warn!("Refit on {} inliers failed ({e}), keeping the sample model", inliers.len());
            best.model
        }
    };

    Ok(RansacResult {
        model,
        inliers,
        inlier_mask: best.mask,
        inlier_count: best.count,
        iterations: search.iterations,
        converged: search.converged,
        history: search.history,
    })
}

/// Run the iterations in batches and fold them in iteration order.
fn search(
    correspondences: &[Correspondence],
    params: &RansacParams,
    seed: u64,
    batch: usize,
    parallel: bool,
) -> Search {
    let n = correspondences.len();
    let mut seeds = StdRng::seed_from_u64(seed);
    let mut state = Search {
        best: None,
        iterations: 0,
        degenerate_samples: 0,
        converged: false,
        history: Vec::new(),
    };

    while state.iterations < params.max_iterations && !state.converged {
        let len = batch.max(1).min(params.max_iterations - state.iterations);
        let streams: Vec<u64> = (0..len).map(|_| seeds.random()).collect();

        let candidates: Vec<Candidate> = if parallel {
            streams
                .par_iter()
                .map(|&s| evaluate(correspondences, params.threshold, s))
                .collect()
        } else {
            streams
                .iter()
                .map(|&s| evaluate(correspondences, params.threshold, s))
                .collect()
        };

        for candidate in candidates {
            state.iterations += 1;
            match candidate {
                Candidate::Degenerate => state.degenerate_samples += 1,
                Candidate::Scored { model, mask, count } => {
                    let best_count = state.best.as_ref().map_or(0, |b| b.count);
                    if count >= MIN_CORRESPONDENCES && count > best_count {
                        log::debug!(
                            "RANSAC iteration {}: {} inliers (was {})",
                            state.iterations,
                            count,
                            best_count
                        );
                        state.history.push(count);
                        state.best = Some(Best { model, mask, count });
                    }
                }
            }

            if state.best.as_ref().is_some_and(|b| has_consensus(b.count, n)) {
                state.converged = true;
                break;
            }
        }
    }

    state
}

/// Draw a minimal sample, fit it and score it on the whole set.
fn evaluate(correspondences: &[Correspondence], threshold: f64, stream: u64) -> Candidate {
    let mut rng = StdRng::seed_from_u64(stream);
    let sample: Vec<Correspondence> = rand::seq::index::sample(
        &mut rng,
        correspondences.len(),
        MIN_CORRESPONDENCES,
    )
    .iter()
    .map(|idx| correspondences[idx])
    .collect();

    let model = match fundamental_8point(&sample) {
        Ok(f) => f,
        Err(_) => return Candidate::Degenerate,
    };

    let mask: Vec<bool> = correspondences
        .iter()
        .map(|c| epipolar_distance(&model, c) < threshold)
        .collect();
    let count = mask.iter().filter(|&&m| m).count();

    Candidate::Scored { model, mask, count }
}

/// More than `max(4n/5, 8)` inliers.
fn has_consensus(count: usize, n: usize) -> bool {
    count * 5 > n * 4 && count > MIN_CORRESPONDENCES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consensus_threshold() {
        assert!(!has_consensus(8, 10));
        assert!(has_consensus(9, 10));
        assert!(!has_consensus(80, 100));
        assert!(has_consensus(81, 100));
        // small sets need more than 8 inliers
        assert!(!has_consensus(8, 8));
    }

    #[test]
    fn test_default_params() {
        let params = RansacParams::default();
        assert_eq!(params.max_iterations, 100);
        assert_eq!(params.threshold, 1.0);
        assert_eq!(params.random_seed, Some(0));
        assert_eq!(params.strategy, ExecutionStrategy::Parallel);
    }

    #[test]
    fn test_insufficient_correspondences() {
        let corrs = vec![Correspondence::default(); 5];
        assert_eq!(
            ransac_fundamental(&corrs, &RansacParams::default()),
            Err(RansacError::InsufficientCorrespondences {
                required: 8,
                actual: 5
            })
        );
    }

    #[test]
    fn test_invalid_threshold() {
        let corrs = vec![Correspondence::default(); 10];
        let params = RansacParams {
            threshold: -1.0,
            ..Default::default()
        };
        assert_eq!(
            ransac_fundamental(&corrs, &params),
            Err(RansacError::InvalidThreshold(-1.0))
        );
    }

    #[test]
    fn test_all_samples_degenerate() {
        let corrs = vec![Correspondence::default(); 12];
        let params = RansacParams {
            max_iterations: 10,
            strategy: ExecutionStrategy::Serial,
            ..Default::default()
        };
        assert_eq!(
            ransac_fundamental(&corrs, &params),
            Err(RansacError::NoConsensus {
                iterations: 10,
                degenerate_samples: 10
            })
        );
    }
}
