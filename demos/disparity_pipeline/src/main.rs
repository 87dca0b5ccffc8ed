use argh::FromArgs;
use std::path::{Path, PathBuf};

use epistereo::{
    geometry::{ransac_fundamental, Correspondence, RansacParams},
    image::{ExecutionStrategy, Image},
    imgproc::{
        color::{gray_from_mono8, gray_from_rgb8},
        disparity::{dense_disparity_display, DisparityParams},
        features::{harris_corners, HarrisParams},
        matching::{match_ncc, MatcherParams},
    },
    io::{png as P, IoError},
};

#[derive(FromArgs)]
/// Estimate the epipolar geometry of two views and write their dense disparity maps
struct Args {
    /// path to the first image (png)
    #[argh(option, short = 'a')]
    image_a: PathBuf,

    /// path to the second image (png)
    #[argh(option, short = 'b')]
    image_b: PathBuf,

    /// directory receiving the disparity images
    #[argh(option, short = 'o', default = "PathBuf::from(\".\")")]
    output: PathBuf,

    /// half width of the disparity search interval
    #[argh(option, short = 'n', default = "8")]
    search_radius: usize,

    /// maximum number of RANSAC iterations
    #[argh(option, short = 'i', default = "100")]
    iterations: usize,

    /// inlier threshold in pixels
    #[argh(option, short = 't', default = "1.0")]
    threshold: f64,

    /// seed of the RANSAC sampler, random when omitted
    #[argh(option, short = 's')]
    seed: Option<u64>,

    /// number of worker threads, the global pool when omitted
    #[argh(option, short = 'j')]
    num_threads: Option<usize>,
}

/// Read a png as normalized gray, whether it is stored as rgb8 or mono8.
fn read_gray(path: &Path) -> Result<Image<f32, 1>, Box<dyn std::error::Error>> {
    match P::read_image_png_rgb8(path) {
        Ok(rgb) => Ok(gray_from_rgb8(&rgb)?),
        Err(IoError::UnsupportedFormat { .. }) => {
            Ok(gray_from_mono8(&P::read_image_png_mono8(path)?)?)
        }
        Err(e) => Err(e.into()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let strategy = match args.num_threads {
        Some(1) => ExecutionStrategy::Serial,
        Some(n) => ExecutionStrategy::Fixed(n),
        None => ExecutionStrategy::Parallel,
    };

    let gray_a = read_gray(&args.image_a)?;
    let gray_b = read_gray(&args.image_b)?;
    if gray_a.size() != gray_b.size() {
        return Err(format!(
            "images must have the same size: {} vs {}",
            gray_a.size(),
            gray_b.size()
        )
        .into());
    }
    log::info!("loaded two views of size {}", gray_a.size());

    let harris = HarrisParams {
        strategy,
        ..Default::default()
    };
    let corners_a = harris_corners(&gray_a, &harris)?;
    let corners_b = harris_corners(&gray_b, &harris)?;
    log::info!("corners: {} in A, {} in B", corners_a.len(), corners_b.len());

    let matcher = MatcherParams {
        strategy,
        ..Default::default()
    };
    let matches = match_ncc(&gray_a, &gray_b, &corners_a, &corners_b, &matcher)?;
    let correspondences: Vec<Correspondence> =
        matches.iter().map(|m| m.correspondence()).collect();
    log::info!("correspondences: {}", correspondences.len());

    let ransac = RansacParams {
        max_iterations: args.iterations,
        threshold: args.threshold,
        random_seed: args.seed,
        strategy,
    };
    let estimate = ransac_fundamental(&correspondences, &ransac)?;
    log::info!(
        "fundamental matrix: {} inliers after {} iterations (converged: {})",
        estimate.inlier_count,
        estimate.iterations,
        estimate.converged
    );
    log::debug!("F = {:?}", estimate.model.as_array());

    let disparity = DisparityParams {
        search_radius: args.search_radius,
        strategy,
    };
    let maps = dense_disparity_display(&estimate.model, &gray_a, &gray_b, &disparity)?;

    std::fs::create_dir_all(&args.output)?;
    for (name, field) in [
        ("horizontal_disparity.png", &maps.horizontal),
        ("vertical_disparity.png", &maps.vertical),
        ("disparity_magnitude.png", &maps.magnitude),
    ] {
        let path = args.output.join(name);
        P::write_image_png_gray8(&path, &field.to_gray8())?;
        log::info!(
            "wrote {} ({} defined pixels)",
            path.display(),
            field.count_defined()
        );
    }

    Ok(())
}
