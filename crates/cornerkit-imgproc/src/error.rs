use cornerkit_image::{ImageError, ImageSize};

use crate::parallel::ParallelError;

/// An error type for the corner detectors.
///
/// Every variant except the wrapped ones is an input-contract violation detected
/// before any pixel is processed.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FeatureError {
    /// The image has more than one band.
    #[error("Expected a single-band image, got {0} channels")]
    InvalidChannels(usize),

    /// The image has no pixels.
    #[error("Image must not be empty, got {0}")]
    EmptyImage(ImageSize),

    /// The difference threshold is negative or not finite.
    #[error("Difference threshold must be finite and >= 0, got {0}")]
    InvalidThreshold(f32),

    /// The smoothing scale is not strictly positive.
    #[error("Sigma must be finite and > 0, got {0}")]
    InvalidSigma(f32),

    /// The Harris sensitivity constant is not finite.
    #[error("Sensitivity k must be finite, got {0}")]
    InvalidSensitivity(f32),

    /// The summation window is even or empty.
    #[error("Window size must be odd and > 0, got {0}")]
    InvalidWindowSize(usize),

    /// The summation window does not fit in the image.
    #[error("Window size {window} exceeds the image {size}")]
    WindowTooLarge {
        /// The side length of the window.
        window: usize,
        /// The size of the image.
        size: ImageSize,
    },

    /// The fraction of the maximum response is outside `[0, 1]`.
    #[error("Response fraction must be in [0, 1], got {0}")]
    InvalidFraction(f32),

    /// Error from the image crate.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error from the parallel execution layer.
    #[error(transparent)]
    Parallel(#[from] ParallelError),
}
