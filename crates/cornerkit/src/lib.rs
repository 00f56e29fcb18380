#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use cornerkit_image as image;

#[doc(inline)]
pub use cornerkit_imgproc as imgproc;
