/// Radius of the sampling ring, in pixels.
pub const RING_RADIUS: usize = 3;

/// The eight `(row, col)` offsets of the sampling ring around a center pixel.
///
/// A discrete, asymmetric approximation of a radius-3 circle. The entries at
/// [`CARDINAL_INDICES`] point down (`+row`), right, up and left; each odd entry
/// sits one pixel beside the cardinal sample before it.
pub const RING_OFFSETS: [(isize, isize); 8] = [
    (3, 0),
    (3, -1),
    (1, 3),
    (-1, 3),
    (-3, 0),
    (-3, -1),
    (1, -3),
    (-1, -3),
];

/// Ring indices of the four cardinal samples used by the acceptance test.
pub const CARDINAL_INDICES: [usize; 4] = [0, 2, 4, 6];

/// Returns the eight ring points around `(row, col)`, in ring order.
///
/// The pattern is translation invariant and defined for any integer center,
/// including centers whose ring falls outside an image.
///
/// # Example
///
/// ```
/// use cornerkit_imgproc::features::ring;
///
/// let points = ring(10, 20);
/// assert_eq!(points[0], (13, 20));
/// assert_eq!(points[6], (11, 17));
/// ```
pub fn ring(row: isize, col: isize) -> [(isize, isize); 8] {
    RING_OFFSETS.map(|(dr, dc)| (row + dr, col + dc))
}

/// Ring offsets flattened for a row-major buffer with `cols` samples per row.
pub(crate) fn ring_flat_offsets(cols: usize) -> [isize; 8] {
    RING_OFFSETS.map(|(dr, dc)| dr * cols as isize + dc)
}
