//! High-level generator that builds a complete [`Level`].
use std::collections::BTreeMap;

use rand::RngCore;
use tracing::{debug, info, warn};

use super::{GenerationConfig, Level, LevelRequest, Room};
use crate::carve::reconcile::cluster_distance;
use crate::carve::{build_clusters, carve_clusters, connection_points, gather, Cluster};
use crate::content::{
    sample_room_type, ContentSource, ExpectedWeight, RoomContent, RoomStore, UsedItems, Weight,
    WeightContext,
};
use crate::distribute::{populate_cluster, PopulateContext};
use crate::error::{Error, Result};
use crate::events::{EventSink, GenerationEvent, GenerationEventKind};
use crate::grid::{Grid, Point};
use crate::ids::IdSequence;

pub struct LevelGenerator<'a> {
    /// Configuration applied to every generated level.
    pub config: GenerationConfig,
    /// Expected-weight model for connection points and rooms.
    pub weights: &'a dyn ExpectedWeight,
    /// Source of concrete room content.
    pub content: &'a mut dyn ContentSource,
}

impl<'a> LevelGenerator<'a> {
    pub fn try_new(
        config: GenerationConfig,
        weights: &'a dyn ExpectedWeight,
        content: &'a mut dyn ContentSource,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            weights,
            content,
        })
    }

    pub fn new(
        config: GenerationConfig,
        weights: &'a dyn ExpectedWeight,
        content: &'a mut dyn ContentSource,
    ) -> Self {
        debug_assert!(
            config.level_one_grid_size >= 2,
            "level_one_grid_size must be >= 2"
        );
        debug_assert!(config.increment_step > 0, "increment_step must be > 0");
        debug_assert!(config.split_threshold >= 3, "split_threshold must be >= 3");

        Self {
            config,
            weights,
            content,
        }
    }

    /// Generates the level described by `request`.
    pub fn generate(&mut self, request: &LevelRequest, rng: &mut impl RngCore) -> Result<Level> {
        generate_level(
            &self.config,
            self.weights,
            &mut *self.content,
            request,
            rng,
            &mut (),
            &mut (),
        )
    }

    /// Generates a level, reporting progress to `sink` and passing every room through
    /// `store`.
    pub fn generate_with_events(
        &mut self,
        request: &LevelRequest,
        rng: &mut impl RngCore,
        sink: &mut dyn EventSink,
        store: &mut dyn RoomStore,
    ) -> Result<Level> {
        generate_level(
            &self.config,
            self.weights,
            &mut *self.content,
            request,
            rng,
            sink,
            store,
        )
    }
}

/// Builds one level. The partially built level is discarded on any error.
pub fn generate_level(
    config: &GenerationConfig,
    weights: &dyn ExpectedWeight,
    content: &mut dyn ContentSource,
    request: &LevelRequest,
    rng: &mut dyn RngCore,
    sink: &mut dyn EventSink,
    store: &mut dyn RoomStore,
) -> Result<Level> {
    config.validate()?;
    request.validate()?;
    request.check_deadline()?;

    let grid_size = config.grid_size_for_level(request.level_number);
    info!(
        "Generating level {} on a {}x{} grid.",
        request.level_number, grid_size, grid_size
    );
    if sink.wants(GenerationEventKind::LevelStarted) {
        sink.send(GenerationEvent::LevelStarted {
            level_number: request.level_number,
            grid_size,
        });
    }

    let points = connection_points(
        grid_size,
        config.split_threshold,
        config.max_partition_passes,
        rng,
    )?;
    if sink.wants(GenerationEventKind::ConnectionPointsGenerated) {
        sink.send(GenerationEvent::ConnectionPointsGenerated {
            points: points.clone(),
        });
    }
    let mut clusters = build_clusters(&points, config.small_side_threshold, &mut IdSequence::default());

    let base_seed = rng.next_u64();
    request.check_deadline()?;
    let locals = carve_clusters(&mut clusters, base_seed)?;
    request.check_deadline()?;

    let mut grid = Grid::square(grid_size);
    gather(&mut grid, &clusters, &locals);
    for p in &points {
        if let Some(s) = grid.get_mut(*p) {
            s.mark_connection_point();
        }
    }
    for cluster in &clusters {
        report_cluster(sink, cluster);
    }
    debug!(
        "Carved level {}:\n{}",
        request.level_number,
        grid.render_ascii()
    );

    let mut rooms: BTreeMap<Point, Room> = BTreeMap::new();
    let mut used = UsedItems::new();
    let mut room_ids = IdSequence::default();
    let player_norm = request.player_weight.norm();
    let mut ctx = PopulateContext {
        weights,
        content,
        used: &mut used,
        room_ids: &mut room_ids,
        sink,
        player_norm,
        player_luck: request.player_luck,
        retry_limit: config.content_retry_limit,
    };

    let cp_weights = place_connection_rooms(&grid, &points, request, &mut rooms, &mut ctx, rng)?;
    assign_cluster_weights(&mut clusters, &rooms, &cp_weights);

    for cluster in &clusters {
        request.check_deadline()?;
        populate_cluster(&grid, cluster, &mut rooms, &mut ctx, rng)?;
    }

    let end = resolve_end(&grid, &clusters, &points, &mut rooms, ctx.sink)?;

    let rooms_by_point: BTreeMap<Point, Room> = rooms
        .into_iter()
        .map(|(p, room)| (p, store.save_room(room)))
        .collect();

    let sink = ctx.sink;
    info!(
        "Level {} finished: {} rooms in {} clusters.",
        request.level_number,
        rooms_by_point.len(),
        clusters.len()
    );
    if sink.wants(GenerationEventKind::LevelFinished) {
        sink.send(GenerationEvent::LevelFinished {
            level_number: request.level_number,
            rooms: rooms_by_point.len(),
            clusters: clusters.len(),
        });
    }

    Ok(Level {
        number: request.level_number,
        grid,
        rooms_by_point,
        start: points[0],
        end,
        connection_points: points,
        clusters,
    })
}

fn report_cluster(sink: &mut dyn EventSink, cluster: &Cluster) {
    debug!(
        "Cluster {} carved: {} cells, {} dead ends, main path {}.",
        cluster.id,
        cluster.size,
        cluster.dead_ends.len(),
        cluster.main_path_length
    );
    if sink.wants(GenerationEventKind::ClusterCarved) {
        sink.send(GenerationEvent::ClusterCarved {
            cluster: cluster.id,
            shape: cluster.shape,
            size: cluster.size,
        });
    }
    if sink.wants(GenerationEventKind::ClusterReconciled) {
        sink.send(GenerationEvent::ClusterReconciled {
            cluster: cluster.id,
            dead_ends: cluster.dead_ends.len(),
            main_path_length: cluster.main_path_length,
        });
    }
}

/// Places Start, End and sampled intermediate rooms on the connection points.
///
/// Returns the expected weight computed for every connection point.
fn place_connection_rooms(
    grid: &Grid,
    points: &[Point],
    request: &LevelRequest,
    rooms: &mut BTreeMap<Point, Room>,
    ctx: &mut PopulateContext<'_>,
    rng: &mut dyn RngCore,
) -> Result<Vec<Weight>> {
    let density = if grid.is_empty() {
        0.0
    } else {
        grid.carved_count() as f64 / grid.len() as f64
    };
    let limit = if density > 0.0 {
        ctx.player_norm / density
    } else {
        ctx.player_norm
    };
    let count = points.len() as u32;
    let last = points.len() - 1;

    let mut expected = Vec::with_capacity(points.len());
    for (i, &p) in points.iter().enumerate() {
        let weight_context =
            WeightContext::connection_point(request.player_weight, limit, i as u32, count);
        let weight = ctx.weights.expected_weight(&weight_context);
        expected.push(weight);

        let content = if i == 0 {
            RoomContent::Start
        } else if i == last {
            RoomContent::End
        } else {
            let room_type = sample_room_type(&weight, i as u32, count - 1, rng);
            let context = format!("connection-point:{p}");
            ctx.request_content(&context, |source, used| {
                source.next_room_content(&weight, room_type, used)
            })?
        };
        ctx.place_room(rooms, None, p, content);
    }
    Ok(expected)
}

/// Each cluster takes the weight of the room at its end point, or the computed
/// expected weight where that room weighs nothing.
fn assign_cluster_weights(
    clusters: &mut [Cluster],
    rooms: &BTreeMap<Point, Room>,
    cp_weights: &[Weight],
) {
    for cluster in clusters.iter_mut() {
        let computed = cp_weights
            .get(cluster.index + 1)
            .copied()
            .unwrap_or(Weight::ZERO);
        let placed = rooms
            .get(&cluster.end)
            .map(|r| r.content.weight())
            .unwrap_or(Weight::ZERO);
        cluster.expected_weight = if placed.is_zero() { computed } else { placed };
    }
}

/// Keeps the End room reachable, promoting the farthest dead end of the last cluster
/// if the End connection room was never linked.
fn resolve_end(
    grid: &Grid,
    clusters: &[Cluster],
    points: &[Point],
    rooms: &mut BTreeMap<Point, Room>,
    sink: &mut dyn EventSink,
) -> Result<Point> {
    let end = points[points.len() - 1];
    if rooms.get(&end).is_some_and(Room::has_links) {
        return Ok(end);
    }

    let Some(last) = clusters.last() else {
        return Ok(end);
    };
    let promoted = last
        .dead_ends
        .iter()
        .filter_map(|p| cluster_distance(grid, last, *p).map(|d| (d, *p)))
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, p)| p)
        .ok_or_else(|| Error::inconsistent(last.id, "end room is unlinked and no dead end exists"))?;

    if let Some(room) = rooms.get_mut(&end) {
        room.content = RoomContent::Normal;
    }
    if let Some(room) = rooms.get_mut(&promoted) {
        room.content = RoomContent::End;
    }
    warn!(
        "End room at {} is unreachable; promoting dead end {} to End.",
        end, promoted
    );
    if sink.wants(GenerationEventKind::EndPromoted) {
        sink.send(GenerationEvent::EndPromoted {
            from: end,
            to: promoted,
        });
    }
    Ok(promoted)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::{Duration, Instant};

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::carve::reconcile::linked_distances;
    use crate::content::{BasicContentSource, LimitNormalized, RoomType, VecRoomStore};
    use crate::events::VecSink;
    use crate::level::link_rooms;

    fn player() -> Weight {
        Weight {
            hp: 80.0,
            max_hp: 100.0,
            mana: 30.0,
            max_mana: 50.0,
            armor: 5.0,
            max_armor: 10.0,
            gold_bonus: 1.5,
            attack: 12.0,
            arcane_magic: 0.3,
            divine_magic: 0.6,
            ..Weight::default()
        }
    }

    fn generate(seed: u64, level_number: u32) -> Level {
        let mut source = BasicContentSource::new();
        let mut generator =
            LevelGenerator::try_new(GenerationConfig::default(), &LimitNormalized, &mut source)
                .expect("valid config");
        let request = LevelRequest::new(level_number, player()).with_luck(0.25);
        generator
            .generate(&request, &mut StdRng::seed_from_u64(seed))
            .expect("generates")
    }

    fn check_level(level: &Level) {
        for (p, room) in &level.rooms_by_point {
            assert!(level.grid.contains(*p), "room {p} outside the grid");
            assert_eq!(room.point, *p);
        }

        assert_eq!(level.clusters.len(), level.connection_points.len() - 1);
        assert_eq!(
            level.room_count(),
            level.grid.carved_count() + level.connection_points.len()
        );
        assert_eq!(level.count_rooms(RoomType::Start), 1);
        assert_eq!(level.count_rooms(RoomType::End), 1);
        assert!(level.is_reachable(level.start, level.end));
        assert!(level.is_reachable(level.end, level.start));

        for cluster in &level.clusters {
            let distances: BTreeSet<i32> = cluster
                .interior_points()
                .filter_map(|p| level.grid.get(p).filter(|s| s.is_carved()))
                .map(|s| s.distance)
                .collect();
            let expected: BTreeSet<i32> = (1..=distances.len() as i32).collect();
            assert_eq!(distances, expected, "cluster {} is not contiguous", cluster.id);

            for p in &cluster.dead_ends {
                let d = cluster_distance(&level.grid, cluster, *p).expect("carved");
                let around: Vec<i32> = linked_distances(&level.grid, cluster, *p)
                    .into_iter()
                    .map(|(_, nd)| nd)
                    .collect();
                assert_eq!(around, vec![d - 1], "dead end {p} is not a tip");
                assert!(level.grid.get(*p).expect("inside").dead_end);
            }
        }
    }

    #[test]
    fn generated_levels_hold_structural_properties() {
        for seed in 0..12 {
            for level_number in [1, 4, 9] {
                check_level(&generate(seed, level_number));
            }
        }
    }

    #[test]
    fn dead_end_tips_hold_special_treasure() {
        let mut tips = 0;
        for seed in 0..12 {
            for level_number in [4, 9] {
                let level = generate(seed, level_number);
                for p in level.clusters.iter().flat_map(|c| &c.dead_ends) {
                    if *p == level.end {
                        continue;
                    }
                    assert_eq!(level.rooms_by_point[p].room_type(), RoomType::Treasure);
                    tips += 1;
                }
            }
        }
        assert!(tips > 0, "generated levels have no dead ends");
    }

    #[test]
    fn level_one_uses_base_grid_size() {
        let level = generate(1, 1);
        assert_eq!(level.grid.width, 10);
        assert_eq!(level.grid.height, 10);
        assert_eq!(level.start, Point::new(0, 0));
        assert_eq!(level.connection_points.last(), Some(&Point::new(9, 9)));
    }

    #[test]
    fn identical_inputs_generate_identical_levels() {
        for seed in [3, 42] {
            let a = generate(seed, 5);
            let b = generate(seed, 5);
            assert_eq!(a.grid, b.grid);
            assert_eq!(a.room_types(), b.room_types());
            assert_eq!(a, b);
        }
    }

    #[test]
    fn events_and_store_see_every_room() {
        let mut source = BasicContentSource::new();
        let mut generator =
            LevelGenerator::new(GenerationConfig::default(), &LimitNormalized, &mut source);
        let mut sink = VecSink::new();
        let mut store = VecRoomStore::new();
        let request = LevelRequest::new(2, player());
        let level = generator
            .generate_with_events(&request, &mut StdRng::seed_from_u64(8), &mut sink, &mut store)
            .expect("generates");

        assert_eq!(store.len(), level.room_count());
        assert_eq!(sink.count(GenerationEventKind::LevelStarted), 1);
        assert_eq!(sink.count(GenerationEventKind::LevelFinished), 1);
        assert_eq!(sink.count(GenerationEventKind::RoomPlaced), level.room_count());
        assert_eq!(
            sink.count(GenerationEventKind::ClusterCarved),
            level.clusters.len()
        );
    }

    #[test]
    fn closures_drive_expected_weights() {
        let flat = |ctx: &WeightContext| ctx.base * 0.5;
        let mut source = BasicContentSource::new();
        let mut generator = LevelGenerator::new(GenerationConfig::default(), &flat, &mut source);
        let level = generator
            .generate(&LevelRequest::new(1, player()), &mut StdRng::seed_from_u64(5))
            .expect("generates");
        check_level(&level);
    }

    #[test]
    fn expired_deadline_aborts() {
        let mut source = BasicContentSource::new();
        let mut generator =
            LevelGenerator::new(GenerationConfig::default(), &LimitNormalized, &mut source);
        let past = Instant::now() - Duration::from_millis(5);
        let request = LevelRequest::new(3, player()).with_deadline(past);
        let err = generator
            .generate(&request, &mut StdRng::seed_from_u64(1))
            .expect_err("deadline passed");
        assert!(matches!(err, Error::DeadlineExceeded));
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let mut source = BasicContentSource::new();
        let mut generator =
            LevelGenerator::new(GenerationConfig::default(), &LimitNormalized, &mut source);
        let err = generator
            .generate(&LevelRequest::new(0, player()), &mut StdRng::seed_from_u64(1))
            .expect_err("level 0");
        assert!(matches!(err, Error::InvalidConfig(_)));

        let bad = GenerationConfig::default().with_split_threshold(1);
        assert!(LevelGenerator::try_new(bad, &LimitNormalized, &mut source).is_err());
    }

    /// Grants the same item for every request.
    struct RepeatingSource;

    impl ContentSource for RepeatingSource {
        fn next_room_content(&mut self, _: &Weight, _: RoomType, _: &UsedItems) -> RoomContent {
            RoomContent::Merchant {
                items: vec!["lamp".into()],
                weight: Weight::ZERO,
            }
        }

        fn special_treasure(&mut self, _: f64, _: &UsedItems) -> RoomContent {
            RoomContent::Treasure {
                gold: 5,
                items: vec!["lamp".into()],
                weight: Weight::ZERO,
            }
        }
    }

    #[test]
    fn reused_items_are_rejected() {
        let mut source = RepeatingSource;
        let mut generator =
            LevelGenerator::new(GenerationConfig::default(), &LimitNormalized, &mut source);
        let err = generator
            .generate(&LevelRequest::new(1, player()), &mut StdRng::seed_from_u64(2))
            .expect_err("lamp granted twice");
        assert!(matches!(err, Error::DuplicateItem { ref id, attempts: 4 } if id == "lamp"));
    }

    /// One cluster from (0,0) to (3,2) with dead ends at (2,1) (distance 3) and
    /// (0,2) (distance 2). No room is linked to the End room.
    fn promotion_fixture() -> (Grid, Vec<Cluster>, Vec<Point>, BTreeMap<Point, Room>) {
        let points = vec![Point::new(0, 0), Point::new(3, 2)];
        let mut grid = Grid::square(4);
        let mut rooms = BTreeMap::new();
        for (p, content) in points.iter().zip([RoomContent::Start, RoomContent::End]) {
            grid.get_mut(*p).expect("inside").mark_connection_point();
            rooms.insert(*p, Room::new(rooms.len() as u64, *p, content));
        }
        let mut cluster = Cluster::new(1, 0, points[0], points[1], 4);
        for (x, y, d) in [(1, 0, 1), (2, 0, 2), (2, 1, 3), (0, 1, 1), (0, 2, 2)] {
            let p = Point::new(x, y);
            grid.get_mut(p).expect("inside").carve(d);
            rooms.insert(p, Room::new(rooms.len() as u64, p, RoomContent::Normal));
            cluster.size += 1;
        }
        cluster.dead_ends = BTreeSet::from([Point::new(2, 1), Point::new(0, 2)]);
        (grid, vec![cluster], points, rooms)
    }

    #[test]
    fn unlinked_end_promotes_farthest_dead_end() {
        let (grid, clusters, points, mut rooms) = promotion_fixture();
        let mut sink = VecSink::new();
        let promoted =
            resolve_end(&grid, &clusters, &points, &mut rooms, &mut sink).expect("promotes");
        assert_eq!(promoted, Point::new(2, 1));
        assert_eq!(rooms[&promoted].room_type(), RoomType::End);
        assert_eq!(rooms[&points[1]].room_type(), RoomType::Normal);
        assert_eq!(sink.count(GenerationEventKind::EndPromoted), 1);
    }

    #[test]
    fn linked_end_stays_in_place() {
        let (grid, clusters, points, mut rooms) = promotion_fixture();
        let inner = Point::new(3, 1);
        rooms.insert(inner, Room::new(99, inner, RoomContent::Normal));
        assert!(link_rooms(&mut rooms, inner, points[1]));
        let mut sink = VecSink::new();
        let end = resolve_end(&grid, &clusters, &points, &mut rooms, &mut sink).expect("linked");
        assert_eq!(end, points[1]);
        assert_eq!(rooms[&end].room_type(), RoomType::End);
        assert!(sink.is_empty());
    }

    #[test]
    fn unlinked_end_without_dead_ends_is_inconsistent() {
        let (grid, mut clusters, points, mut rooms) = promotion_fixture();
        clusters[0].dead_ends.clear();
        let err = resolve_end(&grid, &clusters, &points, &mut rooms, &mut ())
            .expect_err("nothing to promote");
        assert!(matches!(err, Error::Inconsistent { cluster: 1, .. }));
    }
}
