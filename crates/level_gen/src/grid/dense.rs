//! Dense rectangular grid of [`GridSection`]s.
//!
//! The same type backs the full level grid (origin at `(0, 0)`) and the cluster-local
//! grids walkers carve into before their cells are gathered back into the level.
use std::fmt::Write as _;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{GridSection, Point};

/// Defines a rectangular block of sections anchored at `origin` (lower-left corner).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Grid {
    /// Grid coordinate of the lower-left section.
    pub origin: Point,
    /// Number of sections along X.
    pub width: usize,
    /// Number of sections along Y.
    pub height: usize,
    sections: Vec<GridSection>,
}

impl Grid {
    pub fn new(origin: Point, width: usize, height: usize) -> Self {
        let mut sections = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                sections.push(GridSection::new(Point::new(
                    origin.x + x as i32,
                    origin.y + y as i32,
                )));
            }
        }
        Self {
            origin,
            width,
            height,
            sections,
        }
    }

    /// Square level grid with its origin at `(0, 0)`.
    pub fn square(size: usize) -> Self {
        Self::new(Point::ORIGIN, size, size)
    }

    /// Upper-right corner, inclusive.
    pub fn max_point(&self) -> Point {
        Point::new(
            self.origin.x + self.width as i32 - 1,
            self.origin.y + self.height as i32 - 1,
        )
    }

    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        let dx = p.x - self.origin.x;
        let dy = p.y - self.origin.y;
        dx >= 0 && dy >= 0 && (dx as usize) < self.width && (dy as usize) < self.height
    }

    #[inline]
    fn index(&self, p: Point) -> Option<usize> {
        self.contains(p).then(|| {
            (p.y - self.origin.y) as usize * self.width + (p.x - self.origin.x) as usize
        })
    }

    pub fn get(&self, p: Point) -> Option<&GridSection> {
        self.index(p).map(|i| &self.sections[i])
    }

    pub fn get_mut(&mut self, p: Point) -> Option<&mut GridSection> {
        let i = self.index(p)?;
        Some(&mut self.sections[i])
    }

    /// Distance stored at `p`, if `p` is inside the grid.
    #[inline]
    pub fn distance(&self, p: Point) -> Option<i32> {
        self.get(p).map(|s| s.distance)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GridSection> {
        self.sections.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GridSection> {
        self.sections.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Opens the passage between two adjacent sections on both sides present in
    /// this grid. Returns `false` when the points are not adjacent.
    pub fn open_passage(&mut self, a: Point, b: Point) -> bool {
        self.set_passage(a, b, true)
    }

    pub fn close_passage(&mut self, a: Point, b: Point) -> bool {
        self.set_passage(a, b, false)
    }

    fn set_passage(&mut self, a: Point, b: Point, open: bool) -> bool {
        let Some(dir) = a.direction_to(b) else {
            return false;
        };
        if let Some(s) = self.get_mut(a) {
            s.passages[dir.index()] = open;
        }
        if let Some(s) = self.get_mut(b) {
            s.passages[dir.opposite().index()] = open;
        }
        true
    }

    /// True when a passage joins `a` and `b`.
    ///
    /// Either side suffices, so a link recorded only on an interior cell still
    /// holds after the connection point it touches was rebuilt.
    pub fn is_linked(&self, a: Point, b: Point) -> bool {
        let Some(dir) = a.direction_to(b) else {
            return false;
        };
        self.get(a).is_some_and(|s| s.is_open(dir))
            || self.get(b).is_some_and(|s| s.is_open(dir.opposite()))
    }

    /// Number of carved interior sections.
    pub fn carved_count(&self) -> usize {
        self.sections.iter().filter(|s| s.is_carved()).count()
    }

    /// Copies every section of `other` accepted by `filter` into this grid.
    ///
    /// Points outside this grid are ignored.
    pub fn absorb(&mut self, other: &Grid, mut filter: impl FnMut(Point) -> bool) {
        for section in other.iter() {
            if !filter(section.point) {
                continue;
            }
            if let Some(slot) = self.get_mut(section.point) {
                *slot = section.clone();
            }
        }
    }

    /// Renders carving state as text, north up.
    ///
    /// `#` uncarved, `C` connection point, `x` dead end, `+` crossroad, `-` negative,
    /// `.` carved.
    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in (0..self.height).rev() {
            for col in 0..self.width {
                let s = &self.sections[row * self.width + col];
                let glyph = if s.connection_point {
                    'C'
                } else if !s.visited {
                    '#'
                } else if s.dead_end {
                    'x'
                } else if s.crossroad {
                    '+'
                } else if s.distance < 0 {
                    '-'
                } else {
                    '.'
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }

    /// Renders distances as a right-aligned table, north up.
    pub fn render_distances(&self) -> String {
        let mut out = String::new();
        for row in (0..self.height).rev() {
            for col in 0..self.width {
                let s = &self.sections[row * self.width + col];
                if s.visited {
                    let _ = write!(out, "{:>4}", s.distance);
                } else {
                    out.push_str("   #");
                }
            }
            out.push('\n');
        }
        out
    }
}
