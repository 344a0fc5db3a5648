//! Room content model and the weighted room-type sampler.
//!
//! Room content is a sum type ([`RoomContent`]) with an explicit [`RoomType`]
//! discriminant. Concrete content comes from a [`source::ContentSource`]; the
//! [`sampler`] only decides which type to ask for.
use std::collections::BTreeSet;
use std::f64::consts::TAU;

use glam::DVec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub mod sampler;
pub mod selection;
pub mod source;
pub mod weight;

pub use sampler::{sample_room_type, RoomCategory};
pub use source::{
    BasicContentSource, ContentSource, ExpectedWeight, LimitNormalized, RoomStore, VecRoomStore,
    WeightContext, WeightContextKind,
};
pub use weight::Weight;

pub type ItemId = String;

/// The five monster classes a deficiency room can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MonsterClass {
    Werewolf,
    SwampBeast,
    Vampire,
    Dragon,
    Zombie,
}

impl MonsterClass {
    pub const ALL: [MonsterClass; 5] = [
        MonsterClass::Werewolf,
        MonsterClass::SwampBeast,
        MonsterClass::Vampire,
        MonsterClass::Dragon,
        MonsterClass::Zombie,
    ];

    /// Canonical (arcane, divine) affinity point on the unit circle.
    ///
    /// The classes sit at equal angular spacing starting from `(1, 0)`.
    pub fn affinity(self) -> DVec2 {
        let slot = match self {
            MonsterClass::Werewolf => 0.0,
            MonsterClass::SwampBeast => 1.0,
            MonsterClass::Vampire => 2.0,
            MonsterClass::Dragon => 3.0,
            MonsterClass::Zombie => 4.0,
        };
        DVec2::from_angle(TAU * slot / 5.0)
    }
}

/// Discriminant of [`RoomContent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RoomType {
    Normal,
    Start,
    End,
    Monster(MonsterClass),
    Treasure,
    Merchant,
    HealthShrine,
    ManaShrine,
    Anvil,
}

impl RoomType {
    /// Single-character glyph used by debug maps.
    pub fn glyph(self) -> char {
        match self {
            RoomType::Normal => '.',
            RoomType::Start => 'S',
            RoomType::End => 'E',
            RoomType::Monster(MonsterClass::Werewolf) => 'w',
            RoomType::Monster(MonsterClass::SwampBeast) => 'b',
            RoomType::Monster(MonsterClass::Vampire) => 'v',
            RoomType::Monster(MonsterClass::Dragon) => 'd',
            RoomType::Monster(MonsterClass::Zombie) => 'z',
            RoomType::Treasure => '$',
            RoomType::Merchant => '@',
            RoomType::HealthShrine => 'h',
            RoomType::ManaShrine => 'm',
            RoomType::Anvil => 'A',
        }
    }
}

/// Concrete content attached to a room.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RoomContent {
    Normal,
    Start,
    End,
    Monster {
        class: MonsterClass,
        level: u32,
        weight: Weight,
    },
    Treasure {
        gold: u32,
        items: Vec<ItemId>,
        weight: Weight,
    },
    Merchant {
        items: Vec<ItemId>,
        weight: Weight,
    },
    HealthShrine {
        weight: Weight,
    },
    ManaShrine {
        weight: Weight,
    },
    Anvil {
        weight: Weight,
    },
}

impl RoomContent {
    pub fn room_type(&self) -> RoomType {
        match self {
            RoomContent::Normal => RoomType::Normal,
            RoomContent::Start => RoomType::Start,
            RoomContent::End => RoomType::End,
            RoomContent::Monster { class, .. } => RoomType::Monster(*class),
            RoomContent::Treasure { .. } => RoomType::Treasure,
            RoomContent::Merchant { .. } => RoomType::Merchant,
            RoomContent::HealthShrine { .. } => RoomType::HealthShrine,
            RoomContent::ManaShrine { .. } => RoomType::ManaShrine,
            RoomContent::Anvil { .. } => RoomType::Anvil,
        }
    }

    /// Balance weight the content contributes. Empty rooms weigh nothing.
    pub fn weight(&self) -> Weight {
        match self {
            RoomContent::Normal | RoomContent::Start | RoomContent::End => Weight::ZERO,
            RoomContent::Monster { weight, .. }
            | RoomContent::Treasure { weight, .. }
            | RoomContent::Merchant { weight, .. }
            | RoomContent::HealthShrine { weight }
            | RoomContent::ManaShrine { weight }
            | RoomContent::Anvil { weight } => *weight,
        }
    }

    /// Unique item ids granted by this content.
    pub fn item_ids(&self) -> &[ItemId] {
        match self {
            RoomContent::Treasure { items, .. } | RoomContent::Merchant { items, .. } => items,
            _ => &[],
        }
    }
}

/// Item ids already granted during a generation run.
///
/// The set only grows; [`UsedItems::record`] rejects content that would grant an id twice.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UsedItems {
    ids: BTreeSet<ItemId>,
}

impl UsedItems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemId> {
        self.ids.iter()
    }

    /// First id in `content` that is already used or repeated within the content itself.
    pub fn conflict<'c>(&self, content: &'c RoomContent) -> Option<&'c ItemId> {
        let mut seen = BTreeSet::new();
        content
            .item_ids()
            .iter()
            .find(|id| self.contains(id) || !seen.insert(id.as_str()))
    }

    /// Records every id granted by `content`, failing without change on a conflict.
    pub fn record(&mut self, content: &RoomContent) -> Result<()> {
        if let Some(id) = self.conflict(content) {
            return Err(Error::DuplicateItem {
                id: id.clone(),
                attempts: 1,
            });
        }
        self.ids.extend(content.item_ids().iter().cloned());
        Ok(())
    }
}
