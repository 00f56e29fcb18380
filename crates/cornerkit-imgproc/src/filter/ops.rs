use cornerkit_image::{Image, ImageDtype, ImageError};

use crate::error::FeatureError;
use crate::parallel::{self, ExecutionStrategy};

/// Neighbour indices used by the difference operator: central inside the
/// range, one-sided at either end.
#[inline]
fn difference_neighbours(i: usize, n: usize) -> (usize, usize) {
    (i.saturating_sub(1), (i + 1).min(n - 1))
}

/// Compute the spatial gradient of an image with a central-difference operator.
///
/// Interior pixels use `(f[i + 1] - f[i - 1]) / 2`; the first and last row/column
/// use the one-sided difference `f[1] - f[0]` and `f[n - 1] - f[n - 2]`. An axis of
/// length one has a zero gradient.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W).
/// * `dx` - The destination horizontal gradient (along columns) with shape (H, W).
/// * `dy` - The destination vertical gradient (along rows) with shape (H, W).
/// * `strategy` - How the rows are processed.
///
/// PRECONDITION: `src`, `dx` and `dy` must have the same shape.
///
/// # Example
///
/// ```
/// use cornerkit_image::Image;
/// use cornerkit_imgproc::filter::spatial_gradient_central;
/// use cornerkit_imgproc::parallel::ExecutionStrategy;
///
/// let src = Image::<u8, 1>::new([3, 1].into(), vec![0, 2, 8]).unwrap();
/// let mut dx = Image::<f32, 1>::from_size_val(src.size(), 0.0).unwrap();
/// let mut dy = Image::<f32, 1>::from_size_val(src.size(), 0.0).unwrap();
///
/// spatial_gradient_central(&src, &mut dx, &mut dy, ExecutionStrategy::Serial).unwrap();
///
/// assert_eq!(dx.as_slice(), &[2.0, 4.0, 6.0]);
/// assert_eq!(dy.as_slice(), &[0.0, 0.0, 0.0]);
/// ```
pub fn spatial_gradient_central<T: ImageDtype>(
    src: &Image<T, 1>,
    dx: &mut Image<f32, 1>,
    dy: &mut Image<f32, 1>,
    strategy: ExecutionStrategy,
) -> Result<(), FeatureError> {
    for dst in [&*dx, &*dy] {
        if src.size() != dst.size() {
            return Err(ImageError::InvalidImageSize(
                src.cols(),
                src.rows(),
                dst.cols(),
                dst.rows(),
            )
            .into());
        }
    }

    let (rows, cols) = (src.rows(), src.cols());
    let src_data = src.as_slice();
    let at = |r: usize, c: usize| -> f32 { src_data[r * cols + c].into() };

    parallel::for_each_row_mut(strategy, dx.as_slice_mut(), cols, |r, dx_row| {
        for (c, out) in dx_row.iter_mut().enumerate() {
            let (prev, next) = difference_neighbours(c, cols);
            *out = if next == prev {
                0.0
            } else {
                (at(r, next) - at(r, prev)) / (next - prev) as f32
            };
        }
    })?;

    parallel::for_each_row_mut(strategy, dy.as_slice_mut(), cols, |r, dy_row| {
        let (prev, next) = difference_neighbours(r, rows);
        for (c, out) in dy_row.iter_mut().enumerate() {
            *out = if next == prev {
                0.0
            } else {
                (at(next, c) - at(prev, c)) / (next - prev) as f32
            };
        }
    })?;

    Ok(())
}

/// Sum an image over a flat square window centered at each pixel.
///
/// Pixels closer than `window_size / 2` to the border have no complete window
/// and are set to zero.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W).
/// * `dst` - The destination image with shape (H, W).
/// * `window_size` - The odd side length of the window.
/// * `strategy` - How the rows are processed.
///
/// # Errors
///
/// An even or zero window, or a window larger than the image, is rejected.
pub fn box_sum(
    src: &Image<f32, 1>,
    dst: &mut Image<f32, 1>,
    window_size: usize,
    strategy: ExecutionStrategy,
) -> Result<(), FeatureError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        )
        .into());
    }

    if window_size == 0 || window_size % 2 == 0 {
        return Err(FeatureError::InvalidWindowSize(window_size));
    }

    if window_size > src.rows() || window_size > src.cols() {
        return Err(FeatureError::WindowTooLarge {
            window: window_size,
            size: src.size(),
        });
    }

    let (rows, cols) = (src.rows(), src.cols());
    let half = window_size / 2;
    let src_data = src.as_slice();

    parallel::for_each_row_mut(strategy, dst.as_slice_mut(), cols, |r, dst_row| {
        if r < half || r + half >= rows {
            dst_row.fill(0.0);
            return;
        }

        for (c, out) in dst_row.iter_mut().enumerate() {
            if c < half || c + half >= cols {
                *out = 0.0;
                continue;
            }

            let mut sum = 0.0;
            for wr in r - half..=r + half {
                let row = &src_data[wr * cols..(wr + 1) * cols];
                sum += row[c - half..=c + half].iter().sum::<f32>();
            }
            *out = sum;
        }
    })?;

    Ok(())
}
