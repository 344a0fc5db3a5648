//! Weighted content distribution over carved clusters.
//!
//! Dead-end tips are rewarded first and the routes back from them populated with
//! decaying content. A main walker then populates the path from the cluster's end point
//! to its start, forking at branches. Whatever no walker reached is swept afterwards,
//! so every carved cell ends up with a room linked one step closer to the start.
use crate::content::Weight;

pub mod populate;
pub mod walker;

pub use populate::{populate_cluster, PopulateContext, PopulationStats};
pub use walker::{DistributorWalker, NextRoom, WalkerStatus, WalkerStep};

/// Reward a dead-end route walker decays from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteSeed {
    /// Distance of the rewarded tip.
    pub tip_distance: i32,
    /// Balance weight of the tip's reward.
    pub reward: Weight,
}
