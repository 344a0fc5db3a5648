//! Collaborator contracts consumed by the generator, with simple default implementations.
//!
//! - [`ExpectedWeight`] turns a positional/progress context into a target [`Weight`].
//! - [`ContentSource`] turns an expected weight and a [`RoomType`] into [`RoomContent`].
//! - [`RoomStore`] is the persistence hook every finished room passes through.
use super::{ItemId, MonsterClass, RoomContent, RoomType, UsedItems, Weight};
use crate::ids::IdSequence;
use crate::level::Room;

/// Where in the level an expected weight is requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WeightContextKind {
    /// A connection point between two clusters.
    ConnectionPoint,
    /// A room on a cluster's main path or one of its forks.
    Room,
    /// A room on the way back from a rewarded dead end.
    DeadEndRoute,
}

/// Input to [`ExpectedWeight::expected_weight`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightContext {
    pub kind: WeightContextKind,
    /// Weight the request starts from (player, cluster or reward weight).
    pub base: Weight,
    /// Absolute norm limit for the request.
    pub limit: f64,
    pub current_step: u32,
    pub total_steps: u32,
}

impl WeightContext {
    pub fn connection_point(base: Weight, limit: f64, index: u32, count: u32) -> Self {
        Self {
            kind: WeightContextKind::ConnectionPoint,
            base,
            limit,
            current_step: index,
            total_steps: count,
        }
    }

    pub fn room(base: Weight, limit: f64, current_step: u32, total_steps: u32) -> Self {
        Self {
            kind: WeightContextKind::Room,
            base,
            limit,
            current_step,
            total_steps,
        }
    }

    /// `distance_to_seed` is the number of steps between the room and the dead-end tip.
    pub fn dead_end_route(base: Weight, limit: f64, distance_to_seed: u32, route_length: u32) -> Self {
        Self {
            kind: WeightContextKind::DeadEndRoute,
            base,
            limit,
            current_step: distance_to_seed,
            total_steps: route_length,
        }
    }
}

/// Pure function from context to a target balance vector.
pub trait ExpectedWeight {
    fn expected_weight(&self, context: &WeightContext) -> Weight;
}

impl<F> ExpectedWeight for F
where
    F: Fn(&WeightContext) -> Weight,
{
    fn expected_weight(&self, context: &WeightContext) -> Weight {
        self(context)
    }
}

/// Default expected-weight model.
///
/// Connection points and rooms are scaled down when their norm exceeds
/// `total * limit * (1 - sqrt(step / (total + 1)))`; dead-end routes decay with
/// `1 / (1 + distance_to_seed)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LimitNormalized;

impl LimitNormalized {
    pub fn step_limit(limit: f64, step: u32, total: u32) -> f64 {
        let total = total as f64;
        total * limit * (1.0 - (step as f64 / (total + 1.0)).sqrt())
    }
}

impl ExpectedWeight for LimitNormalized {
    fn expected_weight(&self, context: &WeightContext) -> Weight {
        match context.kind {
            WeightContextKind::ConnectionPoint | WeightContextKind::Room => {
                let limit =
                    Self::step_limit(context.limit, context.current_step, context.total_steps);
                context.base.clamp_norm(limit)
            }
            WeightContextKind::DeadEndRoute => {
                context.base * (1.0 / (1.0 + context.current_step as f64))
            }
        }
    }
}

/// Produces concrete room content. Implementations must not hand out an id in `excluded`.
pub trait ContentSource {
    fn next_room_content(
        &mut self,
        expected: &Weight,
        room_type: RoomType,
        excluded: &UsedItems,
    ) -> RoomContent;

    /// High-value reward placed at the tip of a dead end.
    fn special_treasure(&mut self, luck: f64, excluded: &UsedItems) -> RoomContent;
}

/// Minimal content source that derives payloads directly from the expected weight.
#[derive(Clone, Debug)]
pub struct BasicContentSource {
    ids: IdSequence,
    pub merchant_stock: usize,
}

impl BasicContentSource {
    pub fn new() -> Self {
        Self {
            ids: IdSequence::default(),
            merchant_stock: 3,
        }
    }

    pub fn with_merchant_stock(mut self, merchant_stock: usize) -> Self {
        self.merchant_stock = merchant_stock;
        self
    }

    fn fresh_item(&mut self, excluded: &UsedItems) -> ItemId {
        loop {
            let id = format!("item-{}", self.ids.next_id());
            if !excluded.contains(&id) {
                return id;
            }
        }
    }

    fn fresh_items(&mut self, count: usize, excluded: &UsedItems) -> Vec<ItemId> {
        (0..count).map(|_| self.fresh_item(excluded)).collect()
    }
}

impl Default for BasicContentSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentSource for BasicContentSource {
    fn next_room_content(
        &mut self,
        expected: &Weight,
        room_type: RoomType,
        excluded: &UsedItems,
    ) -> RoomContent {
        match room_type {
            RoomType::Normal => RoomContent::Normal,
            RoomType::Start => RoomContent::Start,
            RoomType::End => RoomContent::End,
            RoomType::Monster(class) => RoomContent::Monster {
                class,
                level: monster_level(class, expected),
                weight: -*expected,
            },
            RoomType::Treasure => RoomContent::Treasure {
                gold: (expected.gold_bonus.max(0.0) * 10.0).round() as u32,
                items: self.fresh_items(1, excluded),
                weight: *expected,
            },
            RoomType::Merchant => RoomContent::Merchant {
                items: self.fresh_items(self.merchant_stock, excluded),
                weight: *expected,
            },
            RoomType::HealthShrine => RoomContent::HealthShrine { weight: *expected },
            RoomType::ManaShrine => RoomContent::ManaShrine { weight: *expected },
            RoomType::Anvil => RoomContent::Anvil { weight: *expected },
        }
    }

    fn special_treasure(&mut self, luck: f64, excluded: &UsedItems) -> RoomContent {
        let luck = luck.max(0.0);
        RoomContent::Treasure {
            gold: (100.0 * (1.0 + luck)).round() as u32,
            items: self.fresh_items(2, excluded),
            weight: Weight {
                gold_bonus: 1.0 + luck,
                xp_bonus: 1.0 + luck,
                ..Weight::default()
            },
        }
    }
}

fn monster_level(class: MonsterClass, expected: &Weight) -> u32 {
    let base = match class {
        MonsterClass::Zombie => 1,
        MonsterClass::Werewolf | MonsterClass::SwampBeast => 2,
        MonsterClass::Vampire => 3,
        MonsterClass::Dragon => 4,
    };
    base + (expected.norm() / 10.0) as u32
}

/// Persistence hook for finished rooms.
pub trait RoomStore {
    fn save_room(&mut self, room: Room) -> Room;
}

/// Stores nothing and returns rooms unchanged.
impl RoomStore for () {
    #[inline]
    fn save_room(&mut self, room: Room) -> Room {
        room
    }
}

/// Keeps a copy of every saved room.
#[derive(Debug, Default)]
pub struct VecRoomStore {
    rooms: Vec<Room>,
}

impl VecRoomStore {
    pub fn new() -> Self {
        Self { rooms: Vec::new() }
    }

    pub fn as_slice(&self) -> &[Room] {
        &self.rooms
    }

    pub fn into_inner(self) -> Vec<Room> {
        self.rooms
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl RoomStore for VecRoomStore {
    fn save_room(&mut self, room: Room) -> Room {
        self.rooms.push(room.clone());
        room
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Point;

    #[test]
    fn step_limit_shrinks_with_progress() {
        let first = LimitNormalized::step_limit(2.0, 0, 8);
        let last = LimitNormalized::step_limit(2.0, 8, 8);
        assert!((first - 16.0).abs() < 1e-12);
        assert!(last < first);
        assert!(last > 0.0);
    }

    #[test]
    fn limit_normalized_caps_room_weight() {
        let base = Weight {
            hp: 300.0,
            max_hp: 400.0,
            ..Weight::default()
        };
        let ctx = WeightContext::room(base, 1.0, 4, 4);
        let w = LimitNormalized.expected_weight(&ctx);
        let limit = LimitNormalized::step_limit(1.0, 4, 4);
        assert!((w.norm() - limit).abs() < 1e-9);
    }

    #[test]
    fn dead_end_route_decays_with_distance() {
        let base = Weight {
            gold_bonus: 4.0,
            ..Weight::default()
        };
        let near = LimitNormalized.expected_weight(&WeightContext::dead_end_route(base, 4.0, 0, 5));
        let far = LimitNormalized.expected_weight(&WeightContext::dead_end_route(base, 4.0, 3, 5));
        assert_eq!(near.gold_bonus, 4.0);
        assert_eq!(far.gold_bonus, 1.0);
    }

    #[test]
    fn closures_are_expected_weight_models() {
        let model = |ctx: &WeightContext| ctx.base * 2.0;
        let ctx = WeightContext::connection_point(
            Weight {
                attack: 1.5,
                ..Weight::default()
            },
            1.0,
            0,
            3,
        );
        assert_eq!(model.expected_weight(&ctx).attack, 3.0);
    }

    #[test]
    fn basic_source_skips_excluded_ids() {
        let mut used = UsedItems::new();
        used.record(&RoomContent::Merchant {
            items: vec!["item-1".into(), "item-2".into()],
            weight: Weight::ZERO,
        })
        .expect("fresh");

        let mut source = BasicContentSource::new();
        let content = source.next_room_content(&Weight::ZERO, RoomType::Treasure, &used);
        assert_eq!(content.item_ids(), ["item-3".to_string()]);
    }

    #[test]
    fn basic_source_matches_requested_type() {
        let mut source = BasicContentSource::new().with_merchant_stock(2);
        let used = UsedItems::new();
        for ty in [
            RoomType::Normal,
            RoomType::Monster(MonsterClass::Vampire),
            RoomType::Merchant,
            RoomType::HealthShrine,
            RoomType::ManaShrine,
            RoomType::Anvil,
        ] {
            let content = source.next_room_content(&Weight::ZERO, ty, &used);
            assert_eq!(content.room_type(), ty);
        }
        let special = source.special_treasure(0.5, &used);
        assert_eq!(special.room_type(), RoomType::Treasure);
        assert_eq!(special.item_ids().len(), 2);
    }

    #[test]
    fn vec_room_store_collects_rooms() {
        let mut store = VecRoomStore::new();
        let room = Room::new(1, Point::new(2, 3), RoomContent::Normal);
        let returned = store.save_room(room.clone());
        assert_eq!(returned, room);
        assert_eq!(store.len(), 1);
        assert_eq!(store.as_slice()[0].point, Point::new(2, 3));
    }
}
