//! Level assembly: rooms, the finished [`Level`], configuration and the generator.
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::carve::Cluster;
use crate::content::{RoomContent, RoomType};
use crate::grid::{Direction, Grid, Point};

pub mod config;
pub mod generator;

pub use config::{GenerationConfig, LevelRequest};
pub use generator::LevelGenerator;

/// A room at a grid point.
///
/// Adjacency is stored as the neighbor's point per [`Direction`]; rooms never own each
/// other.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Room {
    pub id: u64,
    pub point: Point,
    /// Linked neighbor per direction, indexed by [`Direction::index`].
    pub adjacent: [Option<Point>; 4],
    pub content: RoomContent,
}

impl Room {
    pub fn new(id: u64, point: Point, content: RoomContent) -> Self {
        Self {
            id,
            point,
            adjacent: [None; 4],
            content,
        }
    }

    #[inline]
    pub fn room_type(&self) -> RoomType {
        self.content.room_type()
    }

    pub fn neighbor(&self, dir: Direction) -> Option<Point> {
        self.adjacent[dir.index()]
    }

    /// Linked neighbor points.
    pub fn neighbors(&self) -> impl Iterator<Item = Point> + '_ {
        self.adjacent.iter().flatten().copied()
    }

    pub fn is_linked_to(&self, other: Point) -> bool {
        self.adjacent.contains(&Some(other))
    }

    pub fn has_links(&self) -> bool {
        self.adjacent.iter().any(Option::is_some)
    }
}

/// Links two existing, orthogonally adjacent rooms in both directions.
///
/// Returns `false` if either room is missing or the points are not adjacent.
pub fn link_rooms(rooms: &mut BTreeMap<Point, Room>, a: Point, b: Point) -> bool {
    let Some(dir) = a.direction_to(b) else {
        return false;
    };
    if !rooms.contains_key(&a) || !rooms.contains_key(&b) {
        return false;
    }
    if let Some(room) = rooms.get_mut(&a) {
        room.adjacent[dir.index()] = Some(b);
    }
    if let Some(room) = rooms.get_mut(&b) {
        room.adjacent[dir.opposite().index()] = Some(a);
    }
    true
}

/// A generated level.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Level {
    pub number: u32,
    pub grid: Grid,
    pub rooms_by_point: BTreeMap<Point, Room>,
    pub start: Point,
    pub end: Point,
    /// Ordered connection points, `start` first.
    pub connection_points: Vec<Point>,
    pub clusters: Vec<Cluster>,
}

impl Level {
    pub fn room(&self, p: Point) -> Option<&Room> {
        self.rooms_by_point.get(&p)
    }

    pub fn room_count(&self) -> usize {
        self.rooms_by_point.len()
    }

    /// Carved cells per grid cell.
    pub fn density(&self) -> f64 {
        if self.grid.is_empty() {
            return 0.0;
        }
        self.grid.carved_count() as f64 / self.grid.len() as f64
    }

    /// Room types in point order.
    pub fn room_types(&self) -> Vec<RoomType> {
        self.rooms_by_point.values().map(Room::room_type).collect()
    }

    /// Number of rooms holding content of type `ty`.
    pub fn count_rooms(&self, ty: RoomType) -> usize {
        self.rooms_by_point
            .values()
            .filter(|r| r.room_type() == ty)
            .count()
    }

    /// Whether `to` can be reached from `from` over room links.
    pub fn is_reachable(&self, from: Point, to: Point) -> bool {
        if !self.rooms_by_point.contains_key(&from) {
            return false;
        }
        let mut seen = BTreeSet::from([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(p) = queue.pop_front() {
            if p == to {
                return true;
            }
            let Some(room) = self.rooms_by_point.get(&p) else {
                continue;
            };
            for n in room.neighbors() {
                if seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }
        false
    }

    /// Renders room glyphs, north up. Cells without a room are blank.
    pub fn render_rooms(&self) -> String {
        let mut out = String::with_capacity((self.grid.width + 1) * self.grid.height);
        for y in (0..self.grid.height as i32).rev() {
            for x in 0..self.grid.width as i32 {
                let p = Point::new(self.grid.origin.x + x, self.grid.origin.y + y);
                out.push(self.room(p).map_or(' ', |r| r.room_type().glyph()));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rooms(points: &[Point]) -> BTreeMap<Point, Room> {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| (*p, Room::new(i as u64 + 1, *p, RoomContent::Normal)))
            .collect()
    }

    #[test]
    fn link_sets_both_directions() {
        let a = Point::new(1, 1);
        let b = Point::new(1, 2);
        let mut map = rooms(&[a, b]);
        assert!(link_rooms(&mut map, a, b));
        assert_eq!(map[&a].neighbor(Direction::North), Some(b));
        assert_eq!(map[&b].neighbor(Direction::South), Some(a));
        assert!(map[&b].is_linked_to(a));
    }

    #[test]
    fn link_rejects_missing_or_distant_rooms() {
        let a = Point::new(0, 0);
        let mut map = rooms(&[a, Point::new(2, 0)]);
        assert!(!link_rooms(&mut map, a, Point::new(2, 0)));
        assert!(!link_rooms(&mut map, a, Point::new(1, 0)));
        assert!(!map[&a].has_links());
    }

    #[test]
    fn reachability_follows_links() {
        let pts = [Point::new(0, 0), Point::new(1, 0), Point::new(1, 1), Point::new(3, 3)];
        let mut map = rooms(&pts);
        link_rooms(&mut map, pts[0], pts[1]);
        link_rooms(&mut map, pts[1], pts[2]);
        let level = Level {
            number: 1,
            grid: Grid::square(4),
            rooms_by_point: map,
            start: pts[0],
            end: pts[2],
            connection_points: vec![pts[0], pts[2]],
            clusters: Vec::new(),
        };
        assert!(level.is_reachable(pts[0], pts[2]));
        assert!(level.is_reachable(pts[2], pts[0]));
        assert!(!level.is_reachable(pts[0], pts[3]));
        assert_eq!(level.render_rooms().lines().count(), 4);
        assert_eq!(level.count_rooms(RoomType::Normal), 4);
    }
}
