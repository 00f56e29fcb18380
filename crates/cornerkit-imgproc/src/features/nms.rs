use cornerkit_image::{Image, ImageDtype};
use log::trace;

use super::fast::{check_ring_bounds, Candidate, RingSampler};
use crate::error::FeatureError;

/// Two candidates closer than this (Euclidean, inclusive) are adjacent.
pub const ADJACENCY_RADIUS: usize = 4;

/// Returns true if the Euclidean distance between the two candidates is at most
/// [`ADJACENCY_RADIUS`].
pub fn is_adjacent(a: &Candidate, b: &Candidate) -> bool {
    let dr = a.row.abs_diff(b.row);
    let dc = a.col.abs_diff(b.col);
    if dr > ADJACENCY_RADIUS || dc > ADJACENCY_RADIUS {
        return false;
    }
    dr * dr + dc * dc <= ADJACENCY_RADIUS * ADJACENCY_RADIUS
}

/// Remove adjacent duplicates from a raster-ordered candidate list, in place.
///
/// A single left-to-right sweep compares each entry with the one before it. When
/// the two are adjacent the lower-scoring one is removed; on a tie the earlier
/// entry goes. The index never moves after a removal: the entry that slides into
/// position `i` is compared with whatever now sits at `i - 1`. Scores are
/// evaluated on demand through `score` at every comparison.
///
/// This is not a maximum independent set. Removing the earlier entry of a pair
/// brings `i - 2` and the survivor together without comparing them, so adjacent
/// survivors may remain and a second sweep can remove more.
///
/// # Arguments
///
/// * `candidates` - The raster-ordered candidates, pruned in place.
/// * `score` - The ranking function.
///
/// # Returns
///
/// The number of removed candidates.
///
/// # Example
///
/// ```
/// use cornerkit_imgproc::features::{suppress_adjacent, Candidate};
///
/// let mut corners = vec![
///     Candidate::new(10, 10, 1.0),
///     Candidate::new(10, 12, 3.0),
///     Candidate::new(10, 30, 2.0),
/// ];
///
/// let removed = suppress_adjacent(&mut corners, |c| c.score);
/// assert_eq!(removed, 1);
/// assert_eq!(corners, vec![Candidate::new(10, 12, 3.0), Candidate::new(10, 30, 2.0)]);
/// ```
pub fn suppress_adjacent<F>(candidates: &mut Vec<Candidate>, mut score: F) -> usize
where
    F: FnMut(&Candidate) -> f32,
{
    let mut removed = 0;
    let mut i = 1;

    while i < candidates.len() {
        let (prev, curr) = (candidates[i - 1], candidates[i]);
        if !is_adjacent(&prev, &curr) {
            i += 1;
            continue;
        }

        let (prev_score, curr_score) = (score(&prev), score(&curr));
        if curr_score >= prev_score {
            trace!(
                "suppress ({}, {}) score {prev_score} in favour of ({}, {}) score {curr_score}",
                prev.row,
                prev.col,
                curr.row,
                curr.col
            );
            candidates.remove(i - 1);
        } else {
            trace!(
                "suppress ({}, {}) score {curr_score} in favour of ({}, {}) score {prev_score}",
                curr.row,
                curr.col,
                prev.row,
                prev.col
            );
            candidates.remove(i);
        }
        removed += 1;
    }

    removed
}

/// Suppress adjacent FAST candidates ranked by their ring score.
///
/// Runs [`suppress_adjacent`] with [`fast_score`](super::fast_score) as the
/// ranking, then stores the ring score of every survivor in its `score` field.
///
/// # Errors
///
/// Returns an error if the ring of any candidate does not fit in `src`; the
/// list is left untouched in that case.
pub fn fast_nonmax_suppression<T: ImageDtype>(
    src: &Image<T, 1>,
    candidates: &mut Vec<Candidate>,
) -> Result<usize, FeatureError> {
    for c in candidates.iter() {
        check_ring_bounds(src.size(), c.row, c.col)?;
    }

    let sampler = RingSampler::new(src);
    let removed = suppress_adjacent(candidates, |c| sampler.score(c.row, c.col));

    candidates
        .iter_mut()
        .for_each(|c| c.score = sampler.score(c.row, c.col));

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn cand(row: usize, col: usize, score: f32) -> Candidate {
        Candidate::new(row, col, score)
    }

    fn coords(candidates: &[Candidate]) -> Vec<(usize, usize)> {
        candidates.iter().map(|c| (c.row, c.col)).collect()
    }

    #[test]
    fn test_adjacency_is_inclusive() {
        assert!(is_adjacent(&cand(5, 5, 0.0), &cand(5, 9, 0.0)));
        assert!(is_adjacent(&cand(5, 5, 0.0), &cand(9, 5, 0.0)));
        assert!(!is_adjacent(&cand(5, 5, 0.0), &cand(5, 10, 0.0)));
        assert!(!is_adjacent(&cand(0, 0, 0.0), &cand(3, 3, 0.0)));
        assert!(is_adjacent(&cand(2, 7, 0.0), &cand(0, 4, 0.0)));
    }

    #[test]
    fn test_lower_score_is_removed() {
        let mut corners = vec![cand(4, 4, 5.0), cand(4, 6, 2.0)];
        assert_eq!(suppress_adjacent(&mut corners, |c| c.score), 1);
        assert_eq!(coords(&corners), vec![(4, 4)]);
    }

    #[test]
    fn test_tie_removes_earlier() {
        let mut corners = vec![cand(4, 4, 7.0), cand(4, 6, 7.0)];
        assert_eq!(suppress_adjacent(&mut corners, |c| c.score), 1);
        assert_eq!(coords(&corners), vec![(4, 6)]);
    }

    #[test]
    fn test_chain_collapses_without_advancing() {
        // each entry beats the one before it, so the sweep keeps removing at index 1
        let mut corners = vec![
            cand(4, 4, 1.0),
            cand(4, 5, 2.0),
            cand(4, 6, 3.0),
            cand(4, 7, 4.0),
        ];
        assert_eq!(suppress_adjacent(&mut corners, |c| c.score), 3);
        assert_eq!(coords(&corners), vec![(4, 7)]);
    }

    #[test]
    fn test_pair_left_behind_is_not_compared() {
        // removing (1, 2) makes (0, 9) and (1, 6) consecutive, but the sweep has
        // already moved past index 1 and never compares them
        let mut corners = vec![cand(0, 9, 5.0), cand(1, 2, 1.0), cand(1, 6, 3.0)];
        assert_eq!(suppress_adjacent(&mut corners, |c| c.score), 1);
        assert_eq!(coords(&corners), vec![(0, 9), (1, 6)]);
        assert!(is_adjacent(&corners[0], &corners[1]));

        // a second sweep sees the pair
        assert_eq!(suppress_adjacent(&mut corners, |c| c.score), 1);
        assert_eq!(coords(&corners), vec![(0, 9)]);
    }

    #[test]
    fn test_removing_earlier_entry_keeps_index() {
        // (5, 5) loses to (6, 3); the weaker (6, 3) then sits next to (5, 0) but
        // the sweep carries on with (6, 3) - (6, 20)
        let mut corners = vec![
            cand(5, 0, 8.0),
            cand(5, 5, 2.0),
            cand(6, 3, 5.0),
            cand(6, 20, 1.0),
        ];
        assert_eq!(suppress_adjacent(&mut corners, |c| c.score), 1);
        assert_eq!(coords(&corners), vec![(5, 0), (6, 3), (6, 20)]);
    }

    #[test]
    fn test_distant_adjacent_entries_survive() {
        // (0, 0) and (1, 1) are adjacent but never consecutive
        let mut corners = vec![cand(0, 0, 1.0), cand(0, 20, 1.0), cand(1, 1, 1.0)];
        assert_eq!(suppress_adjacent(&mut corners, |c| c.score), 0);
        assert_eq!(corners.len(), 3);
    }

    #[test]
    fn test_empty_and_single() {
        let mut corners = vec![];
        assert_eq!(suppress_adjacent(&mut corners, |c| c.score), 0);
        let mut corners = vec![cand(1, 1, 1.0)];
        assert_eq!(suppress_adjacent(&mut corners, |c| c.score), 0);
        assert_eq!(corners.len(), 1);
    }

    fn random_candidates(rng: &mut StdRng) -> Vec<Candidate> {
        let mut corners = (0..rng.random_range(0..200))
            .map(|_| {
                cand(
                    rng.random_range(0..40),
                    rng.random_range(0..40),
                    rng.random_range(0..10) as f32,
                )
            })
            .collect::<Vec<_>>();
        corners.sort_by_key(|c| (c.row, c.col));
        corners.dedup_by_key(|c| (c.row, c.col));
        corners
    }

    #[test]
    fn test_random_monotone() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let mut corners = random_candidates(&mut rng);
            let input = corners.clone();
            let removed = suppress_adjacent(&mut corners, |c| c.score);

            assert_eq!(input.len() - removed, corners.len());
            assert!(corners.len() <= input.len());
            // survivors keep their raster order
            assert!(corners
                .windows(2)
                .all(|w| (w[0].row, w[0].col) < (w[1].row, w[1].col)));
            assert!(corners.iter().all(|c| input.contains(c)));
        }
    }

    #[test]
    fn test_random_decreasing_scores_idempotent() {
        // with scores falling in raster order only the later entry of a pair is
        // ever removed, so every consecutive pair of survivors was compared
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let mut corners = random_candidates(&mut rng);
            let n = corners.len();
            corners
                .iter_mut()
                .enumerate()
                .for_each(|(idx, c)| c.score = (n - idx) as f32);

            suppress_adjacent(&mut corners, |c| c.score);
            assert!(corners.windows(2).all(|w| !is_adjacent(&w[0], &w[1])));

            let once = corners.clone();
            assert_eq!(suppress_adjacent(&mut corners, |c| c.score), 0);
            assert_eq!(corners, once);
        }
    }

    #[test]
    fn test_adjacency_far_apart_coordinates() {
        let a = cand(usize::MAX, usize::MAX, 0.0);
        let b = cand(0, 0, 0.0);
        assert!(!is_adjacent(&a, &b));
        assert!(is_adjacent(&a, &cand(usize::MAX - 4, usize::MAX, 0.0)));

        let mut corners = vec![b, cand(0, usize::MAX, 1.0), a];
        assert_eq!(suppress_adjacent(&mut corners, |c| c.score), 0);
    }

    #[test]
    fn test_fast_nonmax_suppression_fills_scores() -> Result<(), FeatureError> {
        let mut data = vec![0u8; 12 * 12];
        data[5 * 12 + 5] = 100;
        data[5 * 12 + 6] = 200;
        let img = Image::<u8, 1>::new([12, 12].into(), data)?;

        let mut corners = vec![cand(5, 5, 0.0), cand(5, 6, 0.0)];
        assert_eq!(fast_nonmax_suppression(&img, &mut corners)?, 1);
        assert_eq!(corners, vec![cand(5, 6, 8.0 * 200.0)]);
        Ok(())
    }

    #[test]
    fn test_fast_nonmax_suppression_rejects_border_candidates() -> Result<(), FeatureError> {
        let img = Image::<u8, 1>::from_size_val([12, 12].into(), 0)?;
        let mut corners = vec![cand(5, 5, 0.0), cand(1, 6, 0.0)];
        assert!(fast_nonmax_suppression(&img, &mut corners).is_err());
        assert_eq!(corners.len(), 2);
        Ok(())
    }
}
