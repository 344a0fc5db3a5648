//! A single grid cell and the carving state it tracks.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{Direction, Point};

/// One cell of the level grid.
///
/// `distance` is the signed distance from the owning cluster's start connection
/// point. Reversed walkers write negative values that reconciliation later turns
/// positive. Connection points always carry distance 0.
///
/// `passages` records which sides were carved through, indexed by
/// [`Direction::index`]. Two touching carved cells are only connected when one of
/// them has the shared side open.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridSection {
    pub point: Point,
    pub distance: i32,
    pub visited: bool,
    pub dead_end: bool,
    pub crossroad: bool,
    pub connection_point: bool,
    pub passages: [bool; 4],
}

impl GridSection {
    pub fn new(point: Point) -> Self {
        Self {
            point,
            distance: 0,
            visited: false,
            dead_end: false,
            crossroad: false,
            connection_point: false,
            passages: [false; 4],
        }
    }

    /// Marks the section as a connection point shared by two clusters.
    pub fn mark_connection_point(&mut self) {
        self.connection_point = true;
        self.visited = true;
        self.distance = 0;
    }

    /// Carves the section with the given distance.
    #[inline]
    pub fn carve(&mut self, distance: i32) {
        self.visited = true;
        self.distance = distance;
    }

    /// True for carved interior cells, excluding connection points.
    #[inline]
    pub fn is_carved(&self) -> bool {
        self.visited && !self.connection_point
    }

    #[inline]
    pub fn is_open(&self, dir: Direction) -> bool {
        self.passages[dir.index()]
    }

    /// Number of open sides.
    pub fn passage_count(&self) -> usize {
        self.passages.iter().filter(|open| **open).count()
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.is_carved() && self.distance < 0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.is_carved() && self.distance > 0
    }
}
