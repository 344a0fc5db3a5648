//! Content distribution walkers.
//!
//! A [`DistributorWalker`] walks from a high-distance cell toward the cluster start, one
//! carved cell per step along the carved passages, and claims each unclaimed cell it
//! enters. At a fork it keeps to the branch with the fewest carved cells around it. The caller owns the
//! room map: a step only reports which cell to claim and which links to add, so several
//! walkers can share one map without aliasing.
use std::collections::BTreeMap;

use super::RouteSeed;
use crate::carve::reconcile::cluster_distance;
use crate::carve::Cluster;
use crate::grid::{Grid, Point};
use crate::level::Room;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WalkerStatus {
    Running,
    /// Out of steps but at least one child is still running.
    Waiting,
    Finished,
}

/// A cell claimed by a walker step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NextRoom {
    pub point: Point,
    /// Cell the walker came from; the new room is linked to it.
    pub previous: Point,
    pub distance: i32,
}

/// Outcome of one [`DistributorWalker::step`].
#[derive(Clone, Debug, Default)]
pub struct WalkerStep {
    pub claimed: Option<NextRoom>,
    pub links: Vec<(Point, Point)>,
    pub spawned: Vec<DistributorWalker>,
}

#[derive(Clone, Debug)]
pub struct DistributorWalker {
    pub id: u64,
    pub current: Point,
    pub previous: Option<Point>,
    /// Distance of `current`; the next claim targets `current_step - 1`.
    pub current_step: i32,
    /// Spawn a child for every extra branch instead of walking on alone.
    pub fork_enabled: bool,
    /// Move through cells claimed by other walkers without re-populating them.
    pub pass_through: bool,
    /// Sibling splits still allowed at two-way forks.
    pub split_budget: u8,
    /// Cell the first step must claim, if still free.
    pub forced_next: Option<Point>,
    /// Present for walkers populating the route back from a dead end.
    pub route: Option<RouteSeed>,
    /// Arena indices of spawned children.
    pub children: Vec<usize>,
    pub status: WalkerStatus,
}

impl DistributorWalker {
    /// The walker that populates a cluster's main path, starting at its end point.
    pub fn main(id: u64, cluster: &Cluster) -> Self {
        Self {
            id,
            current: cluster.end,
            previous: None,
            current_step: cluster.main_path_length + 1,
            fork_enabled: true,
            pass_through: true,
            split_budget: 0,
            forced_next: None,
            route: None,
            children: Vec::new(),
            status: WalkerStatus::Running,
        }
    }

    /// A walker heading back from a rewarded dead-end tip.
    pub fn dead_end_route(id: u64, tip: Point, seed: RouteSeed) -> Self {
        Self {
            id,
            current: tip,
            previous: None,
            current_step: seed.tip_distance,
            fork_enabled: false,
            pass_through: false,
            split_budget: 1,
            forced_next: None,
            route: Some(seed),
            children: Vec::new(),
            status: WalkerStatus::Running,
        }
    }

    fn branch(&self, id: u64, target: Point) -> Self {
        Self {
            id,
            current: self.current,
            previous: self.previous,
            current_step: self.current_step,
            fork_enabled: false,
            pass_through: false,
            split_budget: 0,
            forced_next: Some(target),
            route: self.route,
            children: Vec::new(),
            status: WalkerStatus::Running,
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.status == WalkerStatus::Running
    }

    fn finish(&mut self) {
        self.status = if self.children.is_empty() {
            WalkerStatus::Finished
        } else {
            WalkerStatus::Waiting
        };
    }

    /// Advances the walker by one cell.
    ///
    /// `next_id` hands out ids for spawned walkers.
    pub fn step(
        &mut self,
        grid: &Grid,
        cluster: &Cluster,
        rooms: &BTreeMap<Point, Room>,
        next_id: &mut dyn FnMut() -> u64,
    ) -> WalkerStep {
        let mut out = WalkerStep::default();
        if !self.is_running() {
            return out;
        }

        let target = self.current_step - 1;
        if target <= 0 {
            if grid.is_linked(self.current, cluster.start) {
                out.links.push((self.current, cluster.start));
            }
            self.finish();
            return out;
        }

        // A dead-end route ends at the crossroad where its branch meets the rest.
        if self.route.is_some()
            && self.previous.is_some()
            && grid.get(self.current).is_some_and(|s| s.crossroad)
        {
            self.finish();
            return out;
        }

        let current = self.current;
        let at_target = |p: &Point| {
            grid.is_linked(current, *p) && cluster_distance(grid, cluster, *p) == Some(target)
        };
        let forced = self
            .forced_next
            .take()
            .filter(|p| at_target(p) && !rooms.contains_key(p));
        let mut candidates: Vec<Point> = match forced {
            Some(p) => vec![p],
            None => cluster
                .interior_neighbors(current)
                .filter(|p| Some(*p) != self.previous && at_target(p) && !rooms.contains_key(p))
                .collect(),
        };

        if candidates.is_empty() {
            let claimed = cluster
                .interior_neighbors(current)
                .filter(|p| at_target(p) && rooms.contains_key(p))
                .min();
            match claimed {
                Some(p) if self.pass_through => {
                    out.links.push((self.current, p));
                    self.previous = Some(self.current);
                    self.current = p;
                    self.current_step = target;
                }
                Some(p) => {
                    out.links.push((self.current, p));
                    self.finish();
                }
                None => self.finish(),
            }
            return out;
        }

        candidates.sort_by_key(|p| (carved_around(grid, cluster, *p), *p));
        let next = candidates[0];
        let extras = &candidates[1..];
        if self.fork_enabled {
            for extra in extras {
                out.spawned.push(self.branch(next_id(), *extra));
            }
        } else if self.split_budget > 0 && !extras.is_empty() {
            self.split_budget -= 1;
            out.spawned.push(self.branch(next_id(), extras[0]));
        }

        out.claimed = Some(NextRoom {
            point: next,
            previous: self.current,
            distance: target,
        });
        self.previous = Some(self.current);
        self.current = next;
        self.current_step = target;
        out
    }
}

/// Carved cells touching `p` inside the cluster, start point included.
fn carved_around(grid: &Grid, cluster: &Cluster, p: Point) -> usize {
    p.neighbors()
        .filter(|(_, n)| cluster_distance(grid, cluster, *n).is_some())
        .count()
}
