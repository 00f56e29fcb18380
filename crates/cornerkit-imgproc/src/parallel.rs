use std::ops::Range;

use rayon::prelude::*;
use thiserror::Error;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),

    /// The row stride must be valid.
    #[error("row stride must be > 0, got {0}")]
    InvalidRowStride(usize),
}

/// Controls how the per-pixel detection phase is executed.
///
/// Every strategy produces the same output, in raster order. Only the detection
/// and response phases are row-partitioned; suppression always runs sequentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExecutionStrategy {
    /// Run sequentially on the current thread.
    #[default]
    Serial,

    /// Use the global Rayon thread pool to process rows in parallel.
    ParallelRows,

    /// Run on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, which has significant overhead.
    Fixed(usize),
}

impl ExecutionStrategy {
    fn install<R: Send>(self, op: impl FnOnce() -> R + Send) -> Result<R, ParallelError> {
        match self {
            ExecutionStrategy::Fixed(0) => Err(ParallelError::InvalidThreadCount(0)),
            ExecutionStrategy::Fixed(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| ParallelError::BuildError(e.to_string()))?;
                Ok(pool.install(op))
            }
            _ => Ok(op()),
        }
    }
}

/// Collect the items produced for each row of `rows`, concatenated in row order.
///
/// # Arguments
///
/// * `strategy` - The execution strategy.
/// * `rows` - The range of rows to visit.
/// * `f` - Produces the items of a single row, left to right.
pub fn collect_rows<T, F>(
    strategy: ExecutionStrategy,
    rows: Range<usize>,
    f: F,
) -> Result<Vec<T>, ParallelError>
where
    T: Send,
    F: Fn(usize) -> Vec<T> + Send + Sync,
{
    match strategy {
        ExecutionStrategy::Serial => Ok(rows.flat_map(f).collect()),
        _ => strategy.install(|| rows.into_par_iter().flat_map_iter(f).collect()),
    }
}

/// Apply a function to each row of a row-major buffer.
///
/// # Arguments
///
/// * `strategy` - The execution strategy.
/// * `dst` - The destination buffer, `stride` elements per row.
/// * `stride` - The number of elements in a row.
/// * `f` - Receives the row index and the mutable row.
pub fn for_each_row_mut<T, F>(
    strategy: ExecutionStrategy,
    dst: &mut [T],
    stride: usize,
    f: F,
) -> Result<(), ParallelError>
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if stride == 0 {
        return Err(ParallelError::InvalidRowStride(stride));
    }

    match strategy {
        ExecutionStrategy::Serial => {
            dst.chunks_exact_mut(stride)
                .enumerate()
                .for_each(|(row, chunk)| f(row, chunk));
            Ok(())
        }
        _ => strategy.install(|| {
            dst.par_chunks_exact_mut(stride)
                .enumerate()
                .for_each(|(row, chunk)| f(row, chunk));
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_rows_keeps_order() -> Result<(), ParallelError> {
        let f = |row: usize| (0..row % 3).map(|c| (row, c)).collect::<Vec<_>>();
        let serial = collect_rows(ExecutionStrategy::Serial, 0..64, f)?;
        let parallel = collect_rows(ExecutionStrategy::ParallelRows, 0..64, f)?;
        let fixed = collect_rows(ExecutionStrategy::Fixed(2), 0..64, f)?;
        assert_eq!(serial, parallel);
        assert_eq!(serial, fixed);
        assert_eq!(serial[..3], [(1, 0), (2, 0), (2, 1)]);
        Ok(())
    }

    #[test]
    fn test_for_each_row_mut() -> Result<(), ParallelError> {
        let mut dst = vec![0usize; 6];
        for_each_row_mut(ExecutionStrategy::ParallelRows, &mut dst, 3, |row, chunk| {
            chunk.iter_mut().for_each(|v| *v = row)
        })?;
        assert_eq!(dst, vec![0, 0, 0, 1, 1, 1]);
        Ok(())
    }

    #[test]
    fn test_invalid_row_stride() {
        let mut dst = vec![0u8; 4];
        let res = for_each_row_mut(ExecutionStrategy::Serial, &mut dst, 0, |_, _| {});
        assert_eq!(res, Err(ParallelError::InvalidRowStride(0)));
    }

    #[test]
    fn test_fixed_zero_threads() {
        let res = collect_rows(ExecutionStrategy::Fixed(0), 0..4, |r| vec![r]);
        assert_eq!(res, Err(ParallelError::InvalidThreadCount(0)));
    }
}
