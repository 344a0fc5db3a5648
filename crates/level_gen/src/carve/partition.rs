//! Cluster connection point generation.
//!
//! Starting from the level's two opposite corners, every consecutive pair of points
//! whose axis distances both exceed the split threshold gets a midpoint drawn from a
//! small window around the arithmetic center. Passes repeat until no pair splits; each
//! consecutive pair of the final chain bounds one [`Cluster`].
use rand::RngCore;
use tracing::debug;

use super::Cluster;
use crate::error::{Error, Result};
use crate::grid::Point;
use crate::ids::IdSequence;
use crate::random::range_inclusive;

/// Draws one midpoint coordinate between `start` and `end` (`start < end`).
///
/// Even distances draw from `[center - 1, center + 1]`, odd ones from
/// `[center - 1, center + 2]`.
fn window_coord(start: i32, end: i32, rng: &mut dyn RngCore) -> i32 {
    let distance = end - start;
    let center = start + distance / 2;
    let upper = if distance % 2 == 0 {
        center + 1
    } else {
        center + 2
    };
    range_inclusive(rng, center - 1, upper)
}

/// Midpoint for a pair, or `None` if either axis distance is within `threshold`.
pub fn split_point(a: Point, b: Point, threshold: i32, rng: &mut dyn RngCore) -> Option<Point> {
    if (b.x - a.x).abs() <= threshold || (b.y - a.y).abs() <= threshold {
        return None;
    }
    let x = window_coord(a.x.min(b.x), a.x.max(b.x), rng);
    let y = window_coord(a.y.min(b.y), a.y.max(b.y), rng);
    Some(Point::new(x, y))
}

/// Ordered connection points from `(0, 0)` to `(grid_size - 1, grid_size - 1)`.
///
/// Fails with [`Error::PartitionDiverged`] if the chain still grows after
/// `max_passes` passes, and with [`Error::InvalidConfig`] for thresholds that cannot
/// keep midpoints strictly inside their pair.
pub fn connection_points(
    grid_size: usize,
    threshold: i32,
    max_passes: usize,
    rng: &mut dyn RngCore,
) -> Result<Vec<Point>> {
    if grid_size < 2 {
        return Err(Error::InvalidConfig("grid size must be >= 2".into()));
    }
    if threshold < 3 {
        return Err(Error::InvalidConfig("split_threshold must be >= 3".into()));
    }
    let far = grid_size as i32 - 1;
    let mut points = vec![Point::ORIGIN, Point::new(far, far)];

    for pass in 0..max_passes {
        let splits: Vec<(usize, Point)> = points
            .windows(2)
            .enumerate()
            .filter_map(|(i, pair)| split_point(pair[0], pair[1], threshold, rng).map(|p| (i + 1, p)))
            .collect();
        if splits.is_empty() {
            debug!(
                "Connection points settled after {} passes: {:?}.",
                pass + 1,
                points
            );
            return Ok(points);
        }
        for (at, p) in splits.into_iter().rev() {
            points.insert(at, p);
        }
    }

    Err(Error::PartitionDiverged { passes: max_passes })
}

/// One cluster per consecutive pair of connection points.
pub fn build_clusters(
    points: &[Point],
    small_side_threshold: i32,
    ids: &mut IdSequence,
) -> Vec<Cluster> {
    points
        .windows(2)
        .enumerate()
        .map(|(index, pair)| {
            Cluster::new(ids.next_id(), index, pair[0], pair[1], small_side_threshold)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::random::tests::FixedRng;

    #[test]
    fn small_grids_form_a_single_cluster() {
        let mut rng = StdRng::seed_from_u64(1);
        let points = connection_points(5, 4, 8, &mut rng).expect("valid");
        assert_eq!(points, vec![Point::new(0, 0), Point::new(4, 4)]);
    }

    #[test]
    fn window_stays_strictly_inside_pair() {
        let mut rng = StdRng::seed_from_u64(7);
        for distance in 4..12 {
            for _ in 0..200 {
                let c = window_coord(10, 10 + distance, &mut rng);
                assert!(c > 10 && c < 10 + distance, "distance {distance} gave {c}");
            }
        }
    }

    #[test]
    fn split_requires_both_axes_over_threshold() {
        let mut rng = FixedRng { value: 0 };
        assert!(split_point(Point::new(0, 0), Point::new(9, 4), 4, &mut rng).is_none());
        assert_eq!(
            split_point(Point::new(0, 0), Point::new(9, 9), 4, &mut rng),
            Some(Point::new(3, 3))
        );
    }

    #[test]
    fn chain_is_monotonic_and_fully_split() {
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let points = connection_points(24, 4, 32, &mut rng).expect("valid");
            assert_eq!(points.first(), Some(&Point::new(0, 0)));
            assert_eq!(points.last(), Some(&Point::new(23, 23)));
            for pair in points.windows(2) {
                assert!(pair[0].x < pair[1].x && pair[0].y < pair[1].y);
                let dx = pair[1].x - pair[0].x;
                let dy = pair[1].y - pair[0].y;
                assert!(dx <= 4 || dy <= 4, "pair {pair:?} should have been split");
            }
        }
    }

    #[test]
    fn too_few_passes_diverge() {
        let mut rng = StdRng::seed_from_u64(3);
        let err = connection_points(64, 4, 1, &mut rng).expect_err("needs more passes");
        assert!(matches!(err, Error::PartitionDiverged { passes: 1 }));
    }

    #[test]
    fn invalid_thresholds_are_rejected() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            connection_points(10, 2, 8, &mut rng),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            connection_points(1, 4, 8, &mut rng),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn clusters_pair_consecutive_points() {
        let points = [Point::new(0, 0), Point::new(4, 5), Point::new(9, 9)];
        let mut ids = IdSequence::default();
        let clusters = build_clusters(&points, 4, &mut ids);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].start, Point::new(0, 0));
        assert_eq!(clusters[0].end, Point::new(4, 5));
        assert_eq!(clusters[1].index, 1);
        assert_eq!(clusters[1].id, 2);
    }
}
