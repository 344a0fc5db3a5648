//! Populates one carved cluster with rooms.
use std::collections::BTreeMap;

use rand::RngCore;
use tracing::{debug, warn};

use super::walker::{DistributorWalker, WalkerStatus};
use super::RouteSeed;
use crate::carve::reconcile::cluster_distance;
use crate::carve::Cluster;
use crate::content::{
    sample_room_type, ContentSource, ExpectedWeight, RoomContent, UsedItems, WeightContext,
};
use crate::error::{Error, Result};
use crate::events::{EventSink, GenerationEvent, GenerationEventKind};
use crate::grid::{Grid, Point};
use crate::ids::IdSequence;
use crate::level::{link_rooms, Room};

/// Collaborators and level-wide state shared by every cluster's distribution.
pub struct PopulateContext<'a> {
    pub weights: &'a dyn ExpectedWeight,
    pub content: &'a mut dyn ContentSource,
    pub used: &'a mut UsedItems,
    pub room_ids: &'a mut IdSequence,
    pub sink: &'a mut dyn EventSink,
    /// Norm of the player's weight.
    pub player_norm: f64,
    pub player_luck: f64,
    /// Extra attempts for a content source that reuses an item id.
    pub retry_limit: usize,
}

impl PopulateContext<'_> {
    /// Asks the content source for content until it grants no used item id.
    pub fn request_content(
        &mut self,
        context: &str,
        mut produce: impl FnMut(&mut dyn ContentSource, &UsedItems) -> RoomContent,
    ) -> Result<RoomContent> {
        let attempts = self.retry_limit + 1;
        let mut reused = String::new();
        for attempt in 1..=attempts {
            let content = produce(&mut *self.content, &*self.used);
            let Some(id) = self.used.conflict(&content) else {
                self.used.record(&content)?;
                return Ok(content);
            };
            warn!(
                "Content source reused item '{}' for {} (attempt {} of {}).",
                id, context, attempt, attempts
            );
            if self.sink.wants(GenerationEventKind::Warning) {
                self.sink.send(GenerationEvent::Warning {
                    context: context.to_owned(),
                    message: format!("content source reused item '{id}'"),
                });
            }
            reused = id.clone();
        }
        Err(Error::DuplicateItem {
            id: reused,
            attempts,
        })
    }

    /// Inserts a room and reports it.
    pub fn place_room(
        &mut self,
        rooms: &mut BTreeMap<Point, Room>,
        cluster: Option<u64>,
        point: Point,
        content: RoomContent,
    ) {
        let room_type = content.room_type();
        rooms.insert(point, Room::new(self.room_ids.next_id(), point, content));
        if self.sink.wants(GenerationEventKind::RoomPlaced) {
            self.sink.send(GenerationEvent::RoomPlaced {
                cluster,
                point,
                room_type,
            });
        }
    }
}

/// Room counts per distribution phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PopulationStats {
    /// Rewarded dead-end tips.
    pub dead_end_tips: usize,
    /// Rooms placed by dead-end route walkers.
    pub route_rooms: usize,
    /// Rooms placed by the main walker and its forks.
    pub main_rooms: usize,
    /// Rooms placed by the sweep.
    pub swept_rooms: usize,
}

impl PopulationStats {
    pub fn total(&self) -> usize {
        self.dead_end_tips + self.route_rooms + self.main_rooms + self.swept_rooms
    }
}

struct ClusterPopulator<'c, 'a, 'r> {
    grid: &'c Grid,
    cluster: &'c Cluster,
    ctx: &'c mut PopulateContext<'a>,
    rng: &'r mut dyn RngCore,
    walker_ids: IdSequence,
    /// Largest carved distance in the cluster.
    total_steps: u32,
}

impl ClusterPopulator<'_, '_, '_> {
    fn room_limit(&self) -> f64 {
        let density = self.cluster.density();
        if density > 0.0 {
            self.ctx.player_norm / density
        } else {
            self.ctx.player_norm
        }
    }

    fn sampled_content(&mut self, route: Option<RouteSeed>, distance: i32) -> Result<RoomContent> {
        let (weight_context, step, total) = match route {
            Some(seed) => {
                let to_seed = (seed.tip_distance - distance).max(0) as u32;
                let length = seed.tip_distance.max(1) as u32;
                let ctx = WeightContext::dead_end_route(seed.reward, seed.reward.norm(), to_seed, length);
                (ctx, to_seed, length)
            }
            None => {
                let step = distance.max(0) as u32;
                let ctx = WeightContext::room(
                    self.cluster.expected_weight,
                    self.room_limit(),
                    step,
                    self.total_steps,
                );
                (ctx, step, self.total_steps)
            }
        };
        let expected = self.ctx.weights.expected_weight(&weight_context);
        let room_type = sample_room_type(&expected, step, total, &mut *self.rng);
        let context = format!("cluster:{}", self.cluster.id);
        self.ctx.request_content(&context, |source, used| {
            source.next_room_content(&expected, room_type, used)
        })
    }

    /// Runs walkers until every one of them finished. Returns the number of rooms placed.
    fn run_walkers(
        &mut self,
        rooms: &mut BTreeMap<Point, Room>,
        mut arena: Vec<DistributorWalker>,
    ) -> Result<usize> {
        let mut placed = 0;
        let max_rounds = (self.cluster.interior_area() + 2) * 4 + 16;
        for _ in 0..max_rounds {
            let mut active = false;
            for i in 0..arena.len() {
                if arena[i].status == WalkerStatus::Waiting {
                    if arena[i]
                        .children
                        .iter()
                        .all(|c| arena[*c].status == WalkerStatus::Finished)
                    {
                        arena[i].status = WalkerStatus::Finished;
                    }
                    active = true;
                    continue;
                }
                if !arena[i].is_running() {
                    continue;
                }
                active = true;

                let ids = &mut self.walker_ids;
                let step = arena[i].step(self.grid, self.cluster, rooms, &mut || ids.next_id());
                if let Some(next) = step.claimed {
                    let content = self.sampled_content(arena[i].route, next.distance)?;
                    self.ctx
                        .place_room(rooms, Some(self.cluster.id), next.point, content);
                    link_rooms(rooms, next.previous, next.point);
                    placed += 1;
                }
                for (a, b) in step.links {
                    link_rooms(rooms, a, b);
                }
                for child in step.spawned {
                    let index = arena.len();
                    arena.push(child);
                    arena[i].children.push(index);
                }
            }
            if !active {
                return Ok(placed);
            }
        }
        Err(Error::inconsistent(
            self.cluster.id,
            format!("distribution walkers still active after {max_rounds} rounds"),
        ))
    }

    fn reward_dead_ends(&mut self, rooms: &mut BTreeMap<Point, Room>) -> Result<(usize, usize)> {
        let cluster = self.cluster;
        let mut tips = 0;
        let mut route_rooms = 0;
        for &tip in &cluster.dead_ends {
            if rooms.contains_key(&tip) {
                continue;
            }
            let Some(tip_distance) = cluster_distance(self.grid, cluster, tip) else {
                continue;
            };
            let luck = self.ctx.player_luck;
            let context = format!("dead-end:{tip}");
            let reward = self
                .ctx
                .request_content(&context, |source, used| source.special_treasure(luck, used))?;
            let seed = RouteSeed {
                tip_distance,
                reward: reward.weight(),
            };
            self.ctx.place_room(rooms, Some(cluster.id), tip, reward);
            tips += 1;

            let walker = DistributorWalker::dead_end_route(self.walker_ids.next_id(), tip, seed);
            route_rooms += self.run_walkers(rooms, vec![walker])?;
        }
        Ok((tips, route_rooms))
    }

    /// Gives every carved cell no walker reached a room, nearest to the start first.
    fn sweep(&mut self, rooms: &mut BTreeMap<Point, Room>) -> Result<usize> {
        let mut rest: Vec<(i32, Point)> = self
            .cluster
            .interior_points()
            .filter(|p| !rooms.contains_key(p))
            .filter_map(|p| cluster_distance(self.grid, self.cluster, p).map(|d| (d, p)))
            .collect();
        rest.sort_unstable();

        for &(distance, p) in &rest {
            let content = self.sampled_content(None, distance)?;
            self.ctx.place_room(rooms, Some(self.cluster.id), p, content);
            if let Some(lower) = self.lower_room(rooms, p, distance) {
                link_rooms(rooms, p, lower);
            }
        }
        Ok(rest.len())
    }

    fn lower_room(&self, rooms: &BTreeMap<Point, Room>, p: Point, distance: i32) -> Option<Point> {
        p.neighbors()
            .map(|(_, n)| n)
            .filter(|n| {
                rooms.contains_key(n)
                    && self.grid.is_linked(p, *n)
                    && cluster_distance(self.grid, self.cluster, *n) == Some(distance - 1)
            })
            .min()
    }

    /// Links every room to one a step closer to the start, and the end point inward.
    fn link_pass(&self, rooms: &mut BTreeMap<Point, Room>) {
        let points: Vec<Point> = self.cluster.interior_points().collect();
        for p in points {
            let Some(distance) = cluster_distance(self.grid, self.cluster, p) else {
                continue;
            };
            let Some(room) = rooms.get(&p) else {
                continue;
            };
            let linked = room.neighbors().any(|n| {
                self.grid.is_linked(p, n)
                    && cluster_distance(self.grid, self.cluster, n) == Some(distance - 1)
            });
            if !linked {
                if let Some(lower) = self.lower_room(rooms, p, distance) {
                    link_rooms(rooms, p, lower);
                }
            }
        }

        let end = self.cluster.end;
        let end_linked = rooms
            .get(&end)
            .is_some_and(|r| r.neighbors().any(|n| self.cluster.contains_interior(n)));
        if !end_linked {
            let inner = self
                .cluster
                .interior_neighbors(end)
                .filter(|n| self.grid.is_linked(*n, end))
                .filter_map(|n| cluster_distance(self.grid, self.cluster, n).map(|d| (d, n)))
                .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
            if let Some((_, n)) = inner {
                link_rooms(rooms, end, n);
            }
        }
    }
}

/// Populates every carved cell of `cluster` with a room.
///
/// Connection point rooms for the cluster's start and end must already be in `rooms`.
pub fn populate_cluster(
    grid: &Grid,
    cluster: &Cluster,
    rooms: &mut BTreeMap<Point, Room>,
    ctx: &mut PopulateContext<'_>,
    rng: &mut dyn RngCore,
) -> Result<PopulationStats> {
    let total_steps = cluster
        .interior_points()
        .filter_map(|p| cluster_distance(grid, cluster, p))
        .max()
        .unwrap_or(1)
        .max(1) as u32;
    let mut populator = ClusterPopulator {
        grid,
        cluster,
        ctx,
        rng,
        walker_ids: IdSequence::default(),
        total_steps,
    };

    let (dead_end_tips, route_rooms) = populator.reward_dead_ends(rooms)?;
    let main = DistributorWalker::main(populator.walker_ids.next_id(), cluster);
    let main_rooms = populator.run_walkers(rooms, vec![main])?;
    let swept_rooms = populator.sweep(rooms)?;
    populator.link_pass(rooms);

    let stats = PopulationStats {
        dead_end_tips,
        route_rooms,
        main_rooms,
        swept_rooms,
    };
    debug!(
        "Cluster {} populated: {} dead ends, {} route rooms, {} main rooms, {} swept.",
        cluster.id, dead_end_tips, route_rooms, main_rooms, swept_rooms
    );
    Ok(stats)
}
