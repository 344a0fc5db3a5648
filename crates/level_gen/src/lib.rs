#![forbid(unsafe_code)]
//! level_gen: Procedural dungeon levels from cluster partitioning, maze-carving walkers
//! and weighted content distribution.
//!
//! Modules:
//! - grid: points, directions and the dense section grid (incl. ASCII rendering)
//! - carve: connection points, clusters, carving walkers and dead-end reconciliation
//! - content: balance weights, room content, the room-type sampler and collaborator traits
//! - distribute: walkers that populate carved clusters with rooms
//! - level: rooms, levels, configuration and the generator
//! - events: observation hooks for generation runs
//!
//! For a runnable tour, see the level_gen_examples crate.
pub mod carve;
pub mod content;
pub mod distribute;
pub mod error;
pub mod events;
pub mod grid;
pub mod ids;
pub mod level;
pub mod random;

/// Convenient re-exports for common types. Import with `use level_gen::prelude::*;`.
pub mod prelude {
    pub use crate::carve::{
        build_clusters, carve_cluster, carve_clusters, connection_points, CarvingWalker, Cluster,
        ClusterShape, WalkerState,
    };
    pub use crate::content::{
        sample_room_type, BasicContentSource, ContentSource, ExpectedWeight, ItemId,
        LimitNormalized, MonsterClass, RoomCategory, RoomContent, RoomStore, RoomType, UsedItems,
        VecRoomStore, Weight, WeightContext, WeightContextKind,
    };
    pub use crate::distribute::{populate_cluster, PopulateContext, PopulationStats};
    pub use crate::error::{Error, Result};
    pub use crate::events::{
        AsEventSink, EventSink, FnSink, GenerationEvent, GenerationEventKind, MultiSink, VecSink,
    };
    pub use crate::grid::{Direction, Grid, GridSection, Point};
    pub use crate::ids::IdSequence;
    pub use crate::level::{
        link_rooms, GenerationConfig, Level, LevelGenerator, LevelRequest, Room,
    };
    pub use crate::random::seed_for_cluster;
}
