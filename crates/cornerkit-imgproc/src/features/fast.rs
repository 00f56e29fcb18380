//! Intensity-comparison corner scoring.
//!
//! A pixel is a corner candidate when at least three of the four cardinal samples
//! of the [sampling ring](super::RING_OFFSETS) differ from the center intensity by
//! strictly more than the difference threshold. This is a simplified FAST
//! high-speed test: there is no contiguous-arc search over the full ring.
//!
//! The [score](fast_score) of a candidate is the sum of absolute differences
//! between the center and all eight ring samples. It only ranks candidates during
//! suppression and never decides acceptance.
use std::ops::Range;

use cornerkit_image::{Image, ImageDtype, ImageError, ImageSize};

use super::ring::{ring_flat_offsets, CARDINAL_INDICES, RING_RADIUS};
use crate::error::FeatureError;
use crate::parallel::{self, ExecutionStrategy};

/// Minimum number of cardinal samples that must differ from the center.
pub const MIN_CARDINAL_MATCHES: u8 = 3;

/// A detected corner location with its aggregate dissimilarity score.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Candidate {
    /// The row of the corner in the image.
    pub row: usize,
    /// The column of the corner in the image.
    pub col: usize,
    /// A non-negative measure of the corner's sharpness.
    pub score: f32,
}

impl Candidate {
    /// Creates a new candidate with the specified coordinates and score.
    pub fn new(row: usize, col: usize, score: f32) -> Self {
        Candidate { row, col, score }
    }
}

/// Which border is excluded from the FAST scan.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScanMargin {
    /// Scan only `[H/4, 3H/4) x [W/4, 3W/4)`.
    #[default]
    Quarter,
    /// Scan every pixel whose ring stays inside the image.
    RingRadius,
}

/// The half-open rectangle of pixels visited by the FAST scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanRegion {
    /// The rows to visit.
    pub rows: Range<usize>,
    /// The columns to visit.
    pub cols: Range<usize>,
}

impl ScanRegion {
    /// Returns true if `(row, col)` is visited by the scan.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.rows.contains(&row) && self.cols.contains(&col)
    }

    /// Returns true if the scan visits no pixel.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.cols.is_empty()
    }
}

fn axis_range(len: usize, margin: ScanMargin) -> Range<usize> {
    let (start, end) = match margin {
        ScanMargin::Quarter => (len / 4, len * 3 / 4),
        ScanMargin::RingRadius => (0, len),
    };
    // the ring must never fall off the image, whatever the margin
    let start = start.max(RING_RADIUS);
    let end = end.min(len.saturating_sub(RING_RADIUS)).max(start);
    start..end
}

/// Compute the region of an image scanned for corners.
///
/// With [`ScanMargin::Quarter`] a quarter of each dimension is skipped on every
/// side. In both modes the region is also kept [`RING_RADIUS`] pixels away from
/// the border, so small images may yield an empty region.
///
/// # Example
///
/// ```
/// use cornerkit_imgproc::features::{scan_region, ScanMargin};
///
/// let region = scan_region([16, 8].into(), ScanMargin::Quarter);
/// assert_eq!(region.rows, 3..5);
/// assert_eq!(region.cols, 4..12);
/// ```
pub fn scan_region(size: ImageSize, margin: ScanMargin) -> ScanRegion {
    ScanRegion {
        rows: axis_range(size.height, margin),
        cols: axis_range(size.width, margin),
    }
}

/// Reads ring samples from a single-band image using precomputed flat offsets.
pub(crate) struct RingSampler<'a, T> {
    data: &'a [T],
    cols: usize,
    offsets: [isize; 8],
}

impl<'a, T: ImageDtype> RingSampler<'a, T> {
    pub(crate) fn new(src: &'a Image<T, 1>) -> Self {
        Self {
            data: src.as_slice(),
            cols: src.cols(),
            offsets: ring_flat_offsets(src.cols()),
        }
    }

    // PRECONDITION: the ring around (row, col) lies inside the image.
    #[inline]
    fn differences(&self, row: usize, col: usize) -> [f32; 8] {
        let idx = (row * self.cols + col) as isize;
        let center: f32 = self.data[idx as usize].into();
        self.offsets.map(|off| {
            let sample: f32 = self.data[(idx + off) as usize].into();
            (sample - center).abs()
        })
    }

    #[inline]
    pub(crate) fn cardinal_count(&self, row: usize, col: usize, threshold: f32) -> u8 {
        let diffs = self.differences(row, col);
        CARDINAL_INDICES
            .iter()
            .filter(|&&i| diffs[i] > threshold)
            .count() as u8
    }

    #[inline]
    pub(crate) fn score(&self, row: usize, col: usize) -> f32 {
        let diffs = self.differences(row, col);
        diffs.iter().sum()
    }
}

pub(crate) fn check_ring_bounds(
    size: ImageSize,
    row: usize,
    col: usize,
) -> Result<(), FeatureError> {
    let inside = |v: usize, len: usize| v >= RING_RADIUS && v + RING_RADIUS < len;
    if !inside(row, size.height) || !inside(col, size.width) {
        return Err(ImageError::PixelIndexOutOfBounds(col, row, size.width, size.height).into());
    }
    Ok(())
}

/// Count the cardinal ring samples that differ from the center by more than `threshold`.
///
/// # Errors
///
/// Returns an error if the ring around `(row, col)` does not fit in the image.
pub fn corner_count<T: ImageDtype>(
    src: &Image<T, 1>,
    row: usize,
    col: usize,
    threshold: f32,
) -> Result<u8, FeatureError> {
    check_ring_bounds(src.size(), row, col)?;
    Ok(RingSampler::new(src).cardinal_count(row, col, threshold))
}

/// Check whether `(row, col)` passes the intensity corner test at `threshold`.
///
/// The comparison is strict: a sample that differs by exactly `threshold` does not count.
pub fn is_fast_corner<T: ImageDtype>(
    src: &Image<T, 1>,
    row: usize,
    col: usize,
    threshold: f32,
) -> Result<bool, FeatureError> {
    Ok(corner_count(src, row, col, threshold)? >= MIN_CARDINAL_MATCHES)
}

/// Sum of absolute differences between the center and all eight ring samples.
///
/// # Example
///
/// ```
/// use cornerkit_image::Image;
/// use cornerkit_imgproc::features::fast_score;
///
/// let mut data = vec![10u8; 7 * 7];
/// data[3 * 7 + 3] = 30;
/// let img = Image::<u8, 1>::new([7, 7].into(), data).unwrap();
///
/// assert_eq!(fast_score(&img, 3, 3).unwrap(), 8.0 * 20.0);
/// ```
pub fn fast_score<T: ImageDtype>(
    src: &Image<T, 1>,
    row: usize,
    col: usize,
) -> Result<f32, FeatureError> {
    check_ring_bounds(src.size(), row, col)?;
    Ok(RingSampler::new(src).score(row, col))
}

/// Scan `region` in raster order and collect every pixel that passes the corner test.
///
/// The returned candidates carry a zero score; scores are only evaluated when
/// suppression needs them.
pub(crate) fn fast_candidates<T: ImageDtype>(
    src: &Image<T, 1>,
    threshold: f32,
    region: &ScanRegion,
    strategy: ExecutionStrategy,
) -> Result<Vec<Candidate>, FeatureError> {
    if region.is_empty() {
        return Ok(Vec::new());
    }

    let sampler = RingSampler::new(src);
    let cols = region.cols.clone();

    let candidates = parallel::collect_rows(strategy, region.rows.clone(), |row| {
        cols.clone()
            .filter(|&col| sampler.cardinal_count(row, col, threshold) >= MIN_CARDINAL_MATCHES)
            .map(|col| Candidate::new(row, col, 0.0))
            .collect::<Vec<_>>()
    })?;

    Ok(candidates)
}
