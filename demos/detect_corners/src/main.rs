use argh::FromArgs;
use std::path::PathBuf;

use cornerkit::image::Image;
use cornerkit::imgproc::features::{
    FastConfig, FastDetector, HarrisConfig, HarrisDetector, ScanMargin,
};
use cornerkit::imgproc::parallel::ExecutionStrategy;

/// Detect corners on a grayscale image.
#[derive(FromArgs)]
struct Args {
    /// path to the image; a synthetic checkerboard is used when omitted
    #[argh(option)]
    image_path: Option<PathBuf>,

    /// detector to run: fast or harris
    #[argh(option, default = "String::from(\"fast\")")]
    detector: String,

    /// intensity difference threshold for the FAST detector
    #[argh(option, default = "50.0")]
    threshold: f32,

    /// sensitivity constant for the Harris detector
    #[argh(option, default = "0.04")]
    k: f32,

    /// fraction of the maximum Harris response to accept
    #[argh(option, default = "0.25")]
    fraction: f32,

    /// disable the non-maximal suppression
    #[argh(switch)]
    no_nms: bool,

    /// scan every pixel whose ring fits in the image
    #[argh(switch)]
    full_scan: bool,

    /// process the rows in parallel
    #[argh(switch)]
    parallel: bool,
}

fn checkerboard(side: usize, block: usize) -> Result<Image<u8, 1>, Box<dyn std::error::Error>> {
    let data = (0..side * side)
        .map(|i| {
            let (r, c) = (i / side, i % side);
            if (r / block + c / block) % 2 == 0 {
                0
            } else {
                255
            }
        })
        .collect();
    Ok(Image::new([side, side].into(), data)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let img = match &args.image_path {
        Some(path) => {
            let gray = image::open(path)?.to_luma8();
            let size = [gray.width() as usize, gray.height() as usize].into();
            Image::<u8, 1>::new(size, gray.into_raw())?
        }
        None => checkerboard(64, 8)?,
    };
    log::info!("loaded image {}", img.size());

    let strategy = if args.parallel {
        ExecutionStrategy::ParallelRows
    } else {
        ExecutionStrategy::Serial
    };

    let corners = match args.detector.as_str() {
        "fast" => {
            let detector = FastDetector::new(FastConfig {
                difference_threshold: args.threshold,
                nonmax_suppression: !args.no_nms,
                scan_margin: if args.full_scan {
                    ScanMargin::RingRadius
                } else {
                    ScanMargin::Quarter
                },
                strategy,
                ..Default::default()
            })?;
            let detection = detector.detect(&img)?;
            log::info!("suppressed {} candidates", detection.suppressed);
            detection.corners
        }
        "harris" => {
            let img_f32 = img.cast::<f32>()?;
            HarrisDetector::new(HarrisConfig {
                k: args.k,
                strategy,
                ..Default::default()
            })
            .detect(&img_f32, args.fraction)?
        }
        other => return Err(format!("unknown detector: {other}").into()),
    };

    println!("Found {} corners", corners.len());
    for c in &corners {
        println!("{} {} {}", c.row, c.col, c.score);
    }

    Ok(())
}
