use cornerkit_image::{Image, ImageDtype, ImageError, ImageSize};
use log::debug;

use super::fast::{fast_candidates, scan_region, Candidate, ScanMargin};
use super::harris::{harris_corners, harris_response, HarrisConfig};
use super::nms::fast_nonmax_suppression;
use crate::error::FeatureError;
use crate::parallel::ExecutionStrategy;

/// Parameters of the intensity corner detector.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FastConfig {
    /// A ring sample counts when it differs from the center by strictly more than this.
    pub difference_threshold: f32,
    /// Minimum length of a contiguous arc of differing ring samples.
    ///
    /// Accepted for compatibility but not applied: acceptance only uses the
    /// cardinal-sample count.
    pub contiguous_threshold: u8,
    /// Whether adjacent candidates are suppressed.
    pub nonmax_suppression: bool,
    /// Which border is excluded from the scan.
    pub scan_margin: ScanMargin,
    /// How the rows are scanned.
    pub strategy: ExecutionStrategy,
}

impl Default for FastConfig {
    fn default() -> Self {
        Self {
            difference_threshold: 50.0,
            contiguous_threshold: 12,
            nonmax_suppression: true,
            scan_margin: ScanMargin::Quarter,
            strategy: ExecutionStrategy::Serial,
        }
    }
}

impl FastConfig {
    /// Check the parameters.
    pub fn validate(&self) -> Result<(), FeatureError> {
        if !self.difference_threshold.is_finite() || self.difference_threshold < 0.0 {
            return Err(FeatureError::InvalidThreshold(self.difference_threshold));
        }
        Ok(())
    }
}

/// The result of a FAST run.
#[derive(Clone, Debug, PartialEq)]
pub struct FastDetection {
    /// `{0, 1}` map of every pixel that passed the corner test, before suppression.
    pub flags: Image<u8, 1>,
    /// The corners in raster order, after suppression when enabled.
    pub corners: Vec<Candidate>,
    /// How many candidates the suppression removed.
    pub suppressed: usize,
}

/// Intensity-comparison corner detector.
///
/// # Example
///
/// ```
/// use cornerkit_image::Image;
/// use cornerkit_imgproc::features::{FastConfig, FastDetector, ScanMargin};
///
/// let mut data = vec![20u8; 12 * 12];
/// data[6 * 12 + 6] = 220;
/// let img = Image::<u8, 1>::new([12, 12].into(), data).unwrap();
///
/// let detector = FastDetector::new(FastConfig {
///     scan_margin: ScanMargin::RingRadius,
///     ..Default::default()
/// })
/// .unwrap();
/// let detection = detector.detect(&img).unwrap();
///
/// assert_eq!(detection.corners.len(), 1);
/// assert_eq!((detection.corners[0].row, detection.corners[0].col), (6, 6));
/// ```
#[derive(Clone, Debug, Default)]
pub struct FastDetector {
    config: FastConfig,
}

impl FastDetector {
    /// Create a detector, rejecting invalid parameters.
    pub fn new(config: FastConfig) -> Result<Self, FeatureError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The detector parameters.
    pub fn config(&self) -> &FastConfig {
        &self.config
    }

    /// Detect corners in a single-band image.
    ///
    /// The scan visits the [scan region](super::scan_region) in raster order. When
    /// suppression is enabled, adjacent candidates are pruned with
    /// [`fast_nonmax_suppression`](super::fast_nonmax_suppression); the flag map
    /// always reflects the detections before suppression.
    pub fn detect<T: ImageDtype>(&self, src: &Image<T, 1>) -> Result<FastDetection, FeatureError> {
        if src.size().is_empty() {
            return Err(FeatureError::EmptyImage(src.size()));
        }

        let region = scan_region(src.size(), self.config.scan_margin);
        let mut corners = fast_candidates(
            src,
            self.config.difference_threshold,
            &region,
            self.config.strategy,
        )?;
        debug!(
            "fast: {} candidates in rows {:?} cols {:?}",
            corners.len(),
            region.rows,
            region.cols
        );

        let flags = flags_from_candidates(src.size(), &corners)?;

        let suppressed = if self.config.nonmax_suppression {
            let removed = fast_nonmax_suppression(src, &mut corners)?;
            debug!("fast: suppression removed {removed}, {} left", corners.len());
            removed
        } else {
            0
        };

        Ok(FastDetection {
            flags,
            corners,
            suppressed,
        })
    }
}

/// Structure-tensor corner detector.
#[derive(Clone, Debug, Default)]
pub struct HarrisDetector {
    config: HarrisConfig,
}

impl HarrisDetector {
    /// Create a detector with the given parameters.
    pub fn new(config: HarrisConfig) -> Self {
        Self { config }
    }

    /// The detector parameters.
    pub fn config(&self) -> &HarrisConfig {
        &self.config
    }

    /// Compute the response map of a single-band image.
    pub fn response<T: ImageDtype>(&self, src: &Image<T, 1>) -> Result<Image<f32, 1>, FeatureError> {
        let mut dst = Image::from_size_val(src.size(), 0.0)?;
        harris_response(src, &mut dst, &self.config)?;
        Ok(dst)
    }

    /// Compute the response map and keep the pixels above `fraction` of its maximum.
    pub fn detect<T: ImageDtype>(
        &self,
        src: &Image<T, 1>,
        fraction: f32,
    ) -> Result<Vec<Candidate>, FeatureError> {
        let response = self.response(src)?;
        let corners = harris_corners(&response, fraction)?;
        debug!("harris: {} corners above {fraction} of the maximum", corners.len());
        Ok(corners)
    }
}

/// Build a `{0, 1}` map of the given size with a 1 at every candidate.
///
/// # Errors
///
/// Returns an error if a candidate lies outside the image.
pub fn flags_from_candidates(
    size: ImageSize,
    candidates: &[Candidate],
) -> Result<Image<u8, 1>, FeatureError> {
    let mut flags = Image::from_size_val(size, 0u8)?;
    let cols = flags.cols();
    let data = flags.as_slice_mut();
    for c in candidates {
        if c.row >= size.height || c.col >= size.width {
            return Err(
                ImageError::PixelIndexOutOfBounds(c.col, c.row, size.width, size.height).into(),
            );
        }
        data[c.row * cols + c.col] = 1;
    }
    Ok(flags)
}

fn single_band<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
) -> Result<Image<T, 1>, FeatureError> {
    if C != 1 {
        return Err(FeatureError::InvalidChannels(C));
    }
    if src.size().is_empty() {
        return Err(FeatureError::EmptyImage(src.size()));
    }
    Ok(src.channel(0)?)
}

/// Detect intensity corners and return the `{0, 1}` corner map.
///
/// # Arguments
///
/// * `src` - A single-band image; band reduction must happen before the call.
/// * `difference_threshold` - Non-negative intensity difference threshold (default 50).
/// * `contiguous_threshold` - Contiguous-arc length (default 12), currently not applied.
/// * `suppress` - Whether to run non-maximal suppression (default true).
///
/// The map marks every pixel that passed the corner test; suppression prunes the
/// candidate list only. Use [`FastDetector`] to get the suppressed corners.
///
/// # Errors
///
/// A multi-band or empty image, or an invalid threshold, is rejected.
pub fn detect_fast<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    difference_threshold: f32,
    contiguous_threshold: u8,
    suppress: bool,
) -> Result<Image<u8, 1>, FeatureError> {
    let detector = FastDetector::new(FastConfig {
        difference_threshold,
        contiguous_threshold,
        nonmax_suppression: suppress,
        ..Default::default()
    })?;
    let src = single_band(src)?;
    Ok(detector.detect(&src)?.flags)
}

/// Compute the Harris response map of an image.
///
/// # Arguments
///
/// * `src` - A single-band image; band reduction must happen before the call.
/// * `sigma` - Positive smoothing scale (default 1), currently not applied.
/// * `k` - Sensitivity constant (default 0.04).
///
/// # Errors
///
/// A multi-band image is rejected before any gradient is computed, as are empty
/// images, images smaller than the window and invalid parameters.
pub fn detect_harris<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    sigma: f32,
    k: f32,
) -> Result<Image<f32, 1>, FeatureError> {
    let detector = HarrisDetector::new(HarrisConfig {
        sigma,
        k,
        ..Default::default()
    });
    let src = single_band(src)?;
    detector.response(&src)
}
