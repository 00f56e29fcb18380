//! Filter operations
//!
//! Gradient and windowed-sum primitives used by the structure-tensor detector.

mod ops;
pub use ops::*;
