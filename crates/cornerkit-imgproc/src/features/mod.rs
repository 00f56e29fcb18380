//! Corner detection on single-band images.
//!
//! # Available Detectors
//!
//! - **FAST**: a cardinal-sample intensity test on a radius-3 ring, with an
//!   optional non-maximal suppression sweep ranked by the ring score.
//! - **Harris**: the structure-tensor response `det - k * trace^2` over central
//!   difference gradients.
//!
//! Both detectors expect images that are already reduced to one band; the free
//! functions [`detect_fast`] and [`detect_harris`] reject anything else.
//!
//! # Examples
//!
//! ```
//! use cornerkit_image::Image;
//! use cornerkit_imgproc::features::{detect_fast, detect_harris};
//!
//! let img = Image::<u8, 1>::from_size_val([32, 32].into(), 128).unwrap();
//!
//! let flags = detect_fast(&img, 50.0, 12, true).unwrap();
//! assert!(flags.as_slice().iter().all(|&v| v == 0));
//!
//! let response = detect_harris(&img, 1.0, 0.04).unwrap();
//! assert!(response.as_slice().iter().all(|&v| v == 0.0));
//! ```

mod ring;
pub use ring::*;

mod fast;
pub use fast::*;

mod nms;
pub use nms::*;

mod harris;
pub use harris::*;

mod detector;
pub use detector::*;
