//! Maze-carving walkers.
//!
//! A [`CarvingWalker`] advances one cell per [`CarvingWalker::step`] inside a single
//! cluster's local grid:
//!
//! - `Forward` walkers start at the start connection point and number cells `1, 2, ..`.
//! - `Reversed` walkers start at the end connection point and number cells `-1, -2, ..`.
//!   Touching the start point or a positively numbered cell turns them into
//!   `Overriding` walkers.
//! - `Overriding` walkers renumber their own reversed trail, tip first, continuing the
//!   positive count of the cell they merged into, then resume as `Forward`.
//! - `Stopped` walkers do nothing.
//!
//! Every step opens the passage it crosses, so the carved cells form a maze rather
//! than a solid block. Merges open the passage into the cell merged with.
use rand::RngCore;
use tracing::trace;

use super::Cluster;
use crate::grid::{Grid, Point};
use crate::random::index;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WalkerState {
    Forward,
    Reversed,
    Overriding,
    Stopped,
}

#[derive(Clone, Debug)]
pub struct CarvingWalker {
    pub id: u64,
    pub state: WalkerState,
    pub current: Point,
    pub previous: Option<Point>,
    /// Distance written to the last carved cell.
    pub path_from_start: i32,
    /// Hug the cluster border instead of spreading through the interior.
    pub prefer_longest_path: bool,
    /// Stop as soon as the walker borders the end connection point.
    pub stop_at_end: bool,
    /// Reversed cells owned by this walker, tip last.
    trail: Vec<Point>,
}

impl CarvingWalker {
    pub fn forward(id: u64, cluster: &Cluster, prefer_longest_path: bool) -> Self {
        Self::continuation(id, cluster.start, 0, prefer_longest_path, true)
    }

    pub fn reversed(id: u64, cluster: &Cluster, prefer_longest_path: bool) -> Self {
        Self {
            id,
            state: WalkerState::Reversed,
            current: cluster.end,
            previous: None,
            path_from_start: 0,
            prefer_longest_path,
            stop_at_end: true,
            trail: Vec::new(),
        }
    }

    /// Forward walker resuming from an already numbered cell.
    pub fn continuation(
        id: u64,
        origin: Point,
        distance: i32,
        prefer_longest_path: bool,
        stop_at_end: bool,
    ) -> Self {
        Self {
            id,
            state: WalkerState::Forward,
            current: origin,
            previous: None,
            path_from_start: distance,
            prefer_longest_path,
            stop_at_end,
            trail: Vec::new(),
        }
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.state == WalkerState::Stopped
    }

    /// Advances the walker by one step.
    pub fn step(&mut self, grid: &mut Grid, cluster: &mut Cluster, rng: &mut dyn RngCore) {
        match self.state {
            WalkerState::Forward => self.step_forward(grid, cluster, rng),
            WalkerState::Reversed => self.step_reversed(grid, cluster, rng),
            WalkerState::Overriding => self.step_override(grid, cluster),
            WalkerState::Stopped => {}
        }
    }

    fn step_forward(&mut self, grid: &mut Grid, cluster: &mut Cluster, rng: &mut dyn RngCore) {
        if self.stop_at_end && self.current.is_adjacent(cluster.end) {
            trace!("Walker {} reached the end of cluster {}.", self.id, cluster.id);
            grid.open_passage(self.current, cluster.end);
            self.state = WalkerState::Stopped;
            return;
        }
        match choose_unvisited(grid, cluster, self.current, self.prefer_longest_path, rng) {
            Some(next) => {
                self.path_from_start += 1;
                grid.open_passage(self.current, next);
                self.move_to(next);
                carve(grid, next, self.path_from_start);
                cluster.size += 1;
            }
            None => {
                if self.current != cluster.start && !self.current.is_adjacent(cluster.end) {
                    mark_dead_end(grid, cluster, self.current);
                }
                self.state = WalkerState::Stopped;
            }
        }
    }

    fn step_reversed(&mut self, grid: &mut Grid, cluster: &mut Cluster, rng: &mut dyn RngCore) {
        if !self.trail.is_empty() && self.current.is_adjacent(cluster.start) {
            grid.open_passage(self.current, cluster.start);
            self.begin_override(0, grid, cluster);
            return;
        }
        if let Some(anchor) = lowest_positive_neighbor(grid, cluster, self.current) {
            if self.trail.is_empty() {
                // Another walker already reached the end point.
                self.state = WalkerState::Stopped;
                return;
            }
            if let Some(s) = grid.get_mut(anchor) {
                s.dead_end = false;
            }
            cluster.dead_ends.remove(&anchor);
            grid.open_passage(self.current, anchor);
            let base = grid.distance(anchor).unwrap_or(0);
            trace!(
                "Walker {} merged into {} at distance {} in cluster {}.",
                self.id,
                anchor,
                base,
                cluster.id
            );
            self.begin_override(base, grid, cluster);
            return;
        }
        match choose_unvisited(grid, cluster, self.current, self.prefer_longest_path, rng) {
            Some(next) => {
                self.path_from_start -= 1;
                grid.open_passage(self.current, next);
                self.move_to(next);
                carve(grid, next, self.path_from_start);
                self.trail.push(next);
                cluster.size += 1;
                cluster.negative_cells += 1;
            }
            None => {
                if self.current != cluster.end && !self.current.is_adjacent(cluster.end) {
                    mark_dead_end(grid, cluster, self.current);
                }
                self.state = WalkerState::Stopped;
            }
        }
    }

    fn begin_override(&mut self, base: i32, grid: &mut Grid, cluster: &mut Cluster) {
        self.state = WalkerState::Overriding;
        self.path_from_start = base;
        self.step_override(grid, cluster);
    }

    fn step_override(&mut self, grid: &mut Grid, cluster: &mut Cluster) {
        match self.trail.pop() {
            Some(cell) => {
                self.path_from_start += 1;
                if let Some(s) = grid.get_mut(cell) {
                    s.distance = self.path_from_start;
                    s.dead_end = false;
                }
                cluster.dead_ends.remove(&cell);
                cluster.negative_cells = cluster.negative_cells.saturating_sub(1);
                self.move_to(cell);
            }
            None => self.state = WalkerState::Forward,
        }
    }

    fn move_to(&mut self, next: Point) {
        self.previous = Some(self.current);
        self.current = next;
    }
}

#[inline]
fn carve(grid: &mut Grid, p: Point, distance: i32) {
    if let Some(s) = grid.get_mut(p) {
        s.carve(distance);
    }
}

fn mark_dead_end(grid: &mut Grid, cluster: &mut Cluster, p: Point) {
    if let Some(s) = grid.get_mut(p) {
        s.dead_end = true;
    }
    cluster.dead_ends.insert(p);
}

fn is_unvisited(grid: &Grid, p: Point) -> bool {
    grid.get(p).is_some_and(|s| !s.visited)
}

/// Positively numbered interior neighbor of `p` with the smallest distance.
fn lowest_positive_neighbor(grid: &Grid, cluster: &Cluster, p: Point) -> Option<Point> {
    cluster
        .interior_neighbors(p)
        .filter_map(|n| grid.get(n).filter(|s| s.is_positive()).map(|s| (s.distance, n)))
        .min()
        .map(|(_, n)| n)
}

/// Picks the next cell among unvisited interior neighbors of `from`.
///
/// Border-hugging walkers maximize the number of outside neighbors; others minimize
/// the number of visited interior neighbors. Remaining ties are broken randomly.
fn choose_unvisited(
    grid: &Grid,
    cluster: &Cluster,
    from: Point,
    prefer_longest_path: bool,
    rng: &mut dyn RngCore,
) -> Option<Point> {
    let candidates: Vec<(i64, Point)> = cluster
        .interior_neighbors(from)
        .filter(|n| is_unvisited(grid, *n))
        .map(|n| {
            let score = if prefer_longest_path {
                cluster.outside_neighbor_count(n) as i64
            } else {
                let visited = cluster
                    .interior_neighbors(n)
                    .filter(|m| !is_unvisited(grid, *m))
                    .count();
                -(visited as i64)
            };
            (score, n)
        })
        .collect();

    let best = candidates.iter().map(|(score, _)| *score).max()?;
    let tied: Vec<Point> = candidates
        .into_iter()
        .filter(|(score, _)| *score == best)
        .map(|(_, n)| n)
        .collect();
    Some(tied[index(rng, tied.len())])
}
