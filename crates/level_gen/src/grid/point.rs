//! Integer grid coordinates and the four cardinal directions.
use std::fmt;

use glam::IVec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Integer grid coordinate. North is `+y`, east is `+x`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Point = Point::new(0, 0);

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighboring point one cell away in `dir`.
    #[inline]
    pub fn step(self, dir: Direction) -> Self {
        self + dir.offset()
    }

    /// All four neighbors, tagged with the direction leading to them.
    pub fn neighbors(self) -> impl Iterator<Item = (Direction, Point)> {
        Direction::ALL.into_iter().map(move |d| (d, self.step(d)))
    }

    pub fn manhattan(self, other: Point) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// True when `other` shares an edge with `self`.
    #[inline]
    pub fn is_adjacent(self, other: Point) -> bool {
        self.manhattan(other) == 1
    }

    /// Direction from `self` to an adjacent `other`, or `None` if they do not share an edge.
    pub fn direction_to(self, other: Point) -> Option<Direction> {
        Direction::ALL.into_iter().find(|&d| self.step(d) == other)
    }
}

impl std::ops::Add<IVec2> for Point {
    type Output = Point;

    fn add(self, rhs: IVec2) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl From<IVec2> for Point {
    fn from(v: IVec2) -> Self {
        Point::new(v.x, v.y)
    }
}

impl From<Point> for IVec2 {
    fn from(p: Point) -> Self {
        IVec2::new(p.x, p.y)
    }
}

impl From<mint::Point2<i32>> for Point {
    fn from(p: mint::Point2<i32>) -> Self {
        Point::new(p.x, p.y)
    }
}

impl From<Point> for mint::Point2<i32> {
    fn from(p: Point) -> Self {
        mint::Point2 { x: p.x, y: p.y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal direction on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn offset(self) -> IVec2 {
        match self {
            Direction::North => IVec2::Y,
            Direction::East => IVec2::X,
            Direction::South => IVec2::NEG_Y,
            Direction::West => IVec2::NEG_X,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    pub fn turn_left(self) -> Direction {
        match self {
            Direction::North => Direction::West,
            Direction::East => Direction::North,
            Direction::South => Direction::East,
            Direction::West => Direction::South,
        }
    }

    pub fn turn_right(self) -> Direction {
        self.turn_left().opposite()
    }

    /// Stable slot index, used by per-direction tables.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }
}
