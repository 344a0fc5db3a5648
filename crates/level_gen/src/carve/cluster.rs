//! Clusters: rectangular sub-regions between two consecutive connection points.
use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::content::Weight;
use crate::grid::Point;

/// Shape class that decides how many carving walkers a cluster gets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ClusterShape {
    /// Both sides are small.
    Small,
    /// Exactly one side is small.
    SmallSided,
    Regular,
}

impl ClusterShape {
    pub fn classify(width: i32, height: i32, small_side_threshold: i32) -> Self {
        let narrow = width < small_side_threshold;
        let short = height < small_side_threshold;
        match (narrow, short) {
            (true, true) => ClusterShape::Small,
            (true, false) | (false, true) => ClusterShape::SmallSided,
            (false, false) => ClusterShape::Regular,
        }
    }
}

/// A sub-region of the grid bounded by two connection points.
///
/// `start` is the lower-left and `end` the upper-right corner of the cluster's
/// bounding rectangle. Interior cells are every cell of the rectangle except the two
/// connection points.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cluster {
    pub id: u64,
    /// Position of the cluster in the connection-point chain.
    pub index: usize,
    pub start: Point,
    pub end: Point,
    pub shape: ClusterShape,
    /// Number of carved interior cells.
    pub size: usize,
    /// Carved cells still holding a negative distance.
    pub negative_cells: usize,
    pub dead_ends: BTreeSet<Point>,
    /// Largest distance among carved cells bordering the end connection point.
    pub main_path_length: i32,
    pub expected_weight: Weight,
}

impl Cluster {
    pub fn new(id: u64, index: usize, start: Point, end: Point, small_side_threshold: i32) -> Self {
        let lo = Point::new(start.x.min(end.x), start.y.min(end.y));
        let hi = Point::new(start.x.max(end.x), start.y.max(end.y));
        debug_assert!(
            lo == start && hi == end,
            "cluster corners must be ordered lower-left to upper-right"
        );
        Self {
            id,
            index,
            start,
            end,
            shape: ClusterShape::classify(hi.x - lo.x, hi.y - lo.y, small_side_threshold),
            size: 0,
            negative_cells: 0,
            dead_ends: BTreeSet::new(),
            main_path_length: 0,
            expected_weight: Weight::ZERO,
        }
    }

    /// Axis distance between the connection points along X.
    pub fn width(&self) -> i32 {
        (self.end.x - self.start.x).abs()
    }

    /// Axis distance between the connection points along Y.
    pub fn height(&self) -> i32 {
        (self.end.y - self.start.y).abs()
    }

    /// Carved cells per unit of bounding area.
    pub fn density(&self) -> f64 {
        let area = (self.width() * self.height()) as f64;
        if area > 0.0 {
            self.size as f64 / area
        } else {
            0.0
        }
    }

    pub fn is_small(&self) -> bool {
        self.shape == ClusterShape::Small
    }

    pub fn has_small_side(&self) -> bool {
        self.shape != ClusterShape::Regular
    }

    /// True for any cell of the bounding rectangle, connection points included.
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.start.x && p.x <= self.end.x && p.y >= self.start.y && p.y <= self.end.y
    }

    /// True for cells of the bounding rectangle other than the two connection points.
    #[inline]
    pub fn contains_interior(&self, p: Point) -> bool {
        self.contains(p) && p != self.start && p != self.end
    }

    /// Number of interior cells.
    pub fn interior_area(&self) -> usize {
        let cells = (self.width() + 1) * (self.height() + 1);
        (cells - 2).max(0) as usize
    }

    /// Interior neighbors of `p`.
    pub fn interior_neighbors(&self, p: Point) -> impl Iterator<Item = Point> + '_ {
        p.neighbors()
            .map(|(_, n)| n)
            .filter(move |n| self.contains_interior(*n))
    }

    /// Number of `p`'s neighbors that fall outside the bounding rectangle.
    pub fn outside_neighbor_count(&self, p: Point) -> usize {
        p.neighbors().filter(|(_, n)| !self.contains(*n)).count()
    }

    /// Interior points in row-major order, south to north.
    pub fn interior_points(&self) -> impl Iterator<Item = Point> + '_ {
        (self.start.y..=self.end.y)
            .flat_map(move |y| (self.start.x..=self.end.x).map(move |x| Point::new(x, y)))
            .filter(move |p| self.contains_interior(*p))
    }
}
