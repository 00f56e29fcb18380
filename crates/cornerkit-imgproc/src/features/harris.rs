use cornerkit_image::{Image, ImageDtype, ImageError, ImageSize};
use log::debug;

use super::fast::Candidate;
use crate::error::FeatureError;
use crate::filter::{box_sum, spatial_gradient_central};
use crate::parallel::{self, ExecutionStrategy};

/// Parameters of the structure-tensor corner response.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HarrisConfig {
    /// Smoothing scale of the tensor window.
    ///
    /// Validated but not applied: the tensor entries are summed over a flat window.
    pub sigma: f32,
    /// Sensitivity constant in `det - k * trace^2`.
    pub k: f32,
    /// Odd side length of the flat summation window.
    pub window_size: usize,
    /// How the rows are processed.
    pub strategy: ExecutionStrategy,
}

impl Default for HarrisConfig {
    fn default() -> Self {
        Self {
            sigma: 1.0,
            k: 0.04,
            window_size: 3,
            strategy: ExecutionStrategy::Serial,
        }
    }
}

impl HarrisConfig {
    /// Check the parameters against an image of the given size.
    pub fn validate(&self, size: ImageSize) -> Result<(), FeatureError> {
        if size.is_empty() {
            return Err(FeatureError::EmptyImage(size));
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(FeatureError::InvalidSigma(self.sigma));
        }
        if !self.k.is_finite() {
            return Err(FeatureError::InvalidSensitivity(self.k));
        }
        if self.window_size == 0 || self.window_size % 2 == 0 {
            return Err(FeatureError::InvalidWindowSize(self.window_size));
        }
        if self.window_size > size.width || self.window_size > size.height {
            return Err(FeatureError::WindowTooLarge {
                window: self.window_size,
                size,
            });
        }
        Ok(())
    }
}

/// Compute the Harris corner response of an image.
///
/// The gradients are central differences. At each pixel the products `dx^2`,
/// `dx*dy` and `dy^2` are summed over a flat `window_size` square to form the
/// structure tensor `[[Sxx, Sxy], [Sxy, Syy]]`, and the response is
/// `(Sxx * Syy - Sxy^2) - k * (Sxx + Syy)^2`.
///
/// Positive responses indicate corners, negative ones edges, and values near zero
/// flat regions. Pixels within `window_size / 2` of the border are set to zero.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W).
/// * `dst` - The destination response with shape (H, W).
/// * `config` - The response parameters.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn harris_response<T: ImageDtype>(
    src: &Image<T, 1>,
    dst: &mut Image<f32, 1>,
    config: &HarrisConfig,
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
    config.validate(src.size())?;

    let strategy = config.strategy;
    let mut dx = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    let mut dy = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    spatial_gradient_central(src, &mut dx, &mut dy, strategy)?;

    let product = |f: fn(f32, f32) -> f32| -> Result<Image<f32, 1>, FeatureError> {
        let data = dx
            .as_slice()
            .iter()
            .zip(dy.as_slice())
            .map(|(&gx, &gy)| f(gx, gy))
            .collect();
        Ok(Image::new(src.size(), data)?)
    };
    let xx = product(|gx, _| gx * gx)?;
    let xy = product(|gx, gy| gx * gy)?;
    let yy = product(|_, gy| gy * gy)?;

    let mut sxx = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    let mut sxy = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    let mut syy = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    box_sum(&xx, &mut sxx, config.window_size, strategy)?;
    box_sum(&xy, &mut sxy, config.window_size, strategy)?;
    box_sum(&yy, &mut syy, config.window_size, strategy)?;

    let (rows, cols) = (src.rows(), src.cols());
    let half = config.window_size / 2;
    let k = config.k;
    let (sxx, sxy, syy) = (sxx.as_slice(), sxy.as_slice(), syy.as_slice());

    parallel::for_each_row_mut(strategy, dst.as_slice_mut(), cols, |r, dst_row| {
        if r < half || r + half >= rows {
            dst_row.fill(0.0);
            return;
        }

        let offset = r * cols;
        for (c, out) in dst_row.iter_mut().enumerate() {
            if c < half || c + half >= cols {
                *out = 0.0;
                continue;
            }

            let idx = offset + c;
            let det = sxx[idx] * syy[idx] - sxy[idx] * sxy[idx];
            let trace = sxx[idx] + syy[idx];
            *out = det - k * trace * trace;
        }
    })?;

    Ok(())
}

/// Select the pixels whose response strictly exceeds `fraction` of the maximum.
///
/// A map whose maximum is not positive (e.g. a flat image) has no corners.
/// Candidates are returned in raster order and carry their response as score.
///
/// # Arguments
///
/// * `response` - A response map produced by [`harris_response`].
/// * `fraction` - The fraction of the maximum response, in `[0, 1]`.
///
/// # Example
///
/// ```
/// use cornerkit_image::Image;
/// use cornerkit_imgproc::features::harris_corners;
///
/// let response = Image::<f32, 1>::new([3, 1].into(), vec![-2.0, 4.0, 1.5]).unwrap();
/// let corners = harris_corners(&response, 0.25).unwrap();
///
/// assert_eq!(corners.len(), 2);
/// assert_eq!((corners[0].col, corners[1].col), (1, 2));
/// ```
pub fn harris_corners(
    response: &Image<f32, 1>,
    fraction: f32,
) -> Result<Vec<Candidate>, FeatureError> {
    if response.size().is_empty() {
        return Err(FeatureError::EmptyImage(response.size()));
    }
    if !(0.0..=1.0).contains(&fraction) {
        return Err(FeatureError::InvalidFraction(fraction));
    }

    let max = response
        .as_slice()
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    debug!("harris max response {max}, accepting above {}", fraction * max);

    if max <= 0.0 {
        return Ok(Vec::new());
    }

    let threshold = fraction * max;
    let cols = response.cols();
    let corners = response
        .as_slice()
        .iter()
        .enumerate()
        .filter(|(_, &v)| v > threshold)
        .map(|(idx, &v)| Candidate::new(idx / cols, idx % cols, v))
        .collect();

    Ok(corners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_harris_response_single_window() -> Result<(), FeatureError> {
        #[rustfmt::skip]
        let src = Image::<f32, 1>::new(
            [3, 3].into(),
            vec![
                0.0, 0.0, 0.0,
                0.0, 0.0, 0.0,
                0.0, 0.0, 4.0,
            ],
        )?;
        let mut dst = Image::from_size_val(src.size(), -1.0)?;
        harris_response(&src, &mut dst, &HarrisConfig::default())?;

        // Sxx = Syy = 20, Sxy = 16: det = 144, trace = 40
        assert_relative_eq!(dst.as_slice()[4], 144.0 - 0.04 * 1600.0, epsilon = 1e-3);
        for (idx, v) in dst.as_slice().iter().enumerate() {
            if idx != 4 {
                assert_eq!(*v, 0.0);
            }
        }
        Ok(())
    }

    #[test]
    fn test_harris_response_edge_is_negative_corner_is_positive() -> Result<(), FeatureError> {
        let (w, h) = (12, 12);
        let mut data = vec![0u8; w * h];
        // bright square occupying the bottom-right quadrant
        for r in 6..h {
            for c in 6..w {
                data[r * w + c] = 255;
            }
        }
        let src = Image::<u8, 1>::new([w, h].into(), data)?;
        let mut dst = Image::from_size_val(src.size(), 0.0)?;
        harris_response(&src, &mut dst, &HarrisConfig::default())?;

        let at = |r: usize, c: usize| dst.as_slice()[r * w + c];
        assert!(at(6, 6) > 0.0);
        assert!(at(9, 6) < 0.0);
        assert!(at(6, 9) < 0.0);
        assert_eq!(at(2, 2), 0.0);
        Ok(())
    }

    #[test]
    fn test_harris_response_strategies_agree() -> Result<(), FeatureError> {
        let data = (0..20 * 15).map(|i| ((i * 37) % 251) as u8).collect();
        let src = Image::<u8, 1>::new([20, 15].into(), data)?;

        let mut serial = Image::from_size_val(src.size(), 0.0)?;
        harris_response(&src, &mut serial, &HarrisConfig::default())?;

        let mut parallel = Image::from_size_val(src.size(), 0.0)?;
        let config = HarrisConfig {
            strategy: ExecutionStrategy::ParallelRows,
            ..Default::default()
        };
        harris_response(&src, &mut parallel, &config)?;

        assert_eq!(serial.as_slice(), parallel.as_slice());
        Ok(())
    }

    #[test]
    fn test_harris_config_validation() -> Result<(), FeatureError> {
        let src = Image::<u8, 1>::from_size_val([4, 4].into(), 0)?;
        let mut dst = Image::from_size_val(src.size(), 0.0)?;

        let cases = [
            (
                HarrisConfig {
                    sigma: 0.0,
                    ..Default::default()
                },
                FeatureError::InvalidSigma(0.0),
            ),
            (
                HarrisConfig {
                    window_size: 4,
                    ..Default::default()
                },
                FeatureError::InvalidWindowSize(4),
            ),
            (
                HarrisConfig {
                    window_size: 5,
                    ..Default::default()
                },
                FeatureError::WindowTooLarge {
                    window: 5,
                    size: src.size(),
                },
            ),
        ];

        for (config, expected) in cases {
            assert_eq!(harris_response(&src, &mut dst, &config), Err(expected));
        }

        let k_nan = HarrisConfig {
            k: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            harris_response(&src, &mut dst, &k_nan),
            Err(FeatureError::InvalidSensitivity(_))
        ));
        Ok(())
    }

    #[test]
    fn test_harris_corners_threshold() -> Result<(), FeatureError> {
        #[rustfmt::skip]
        let response = Image::<f32, 1>::new(
            [3, 3].into(),
            vec![
                0.0, 1.0, 0.0,
                -5.0, 8.0, 2.0,
                0.0, 2.5, 0.0,
            ],
        )?;
        let corners = harris_corners(&response, 0.25)?;
        assert_eq!(
            corners,
            vec![Candidate::new(1, 1, 8.0), Candidate::new(2, 1, 2.5)]
        );
        assert_eq!(
            harris_corners(&response, 1.5),
            Err(FeatureError::InvalidFraction(1.5))
        );
        Ok(())
    }

    #[test]
    fn test_harris_corners_flat_map() -> Result<(), FeatureError> {
        let response = Image::<f32, 1>::from_size_val([5, 5].into(), 0.0)?;
        assert!(harris_corners(&response, 0.0)?.is_empty());
        Ok(())
    }
}
