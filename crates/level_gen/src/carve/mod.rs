//! Cluster partitioning and maze carving.
//!
//! - [`partition`] splits the level into [`Cluster`]s between connection points.
//! - [`walker`] holds the carving state machine.
//! - [`reconcile`] repairs numbering left inconsistent by concurrent walkers.
//! - [`runner`] drives walkers per cluster and gathers the local grids.
pub mod cluster;
pub mod partition;
pub mod reconcile;
pub mod runner;
pub mod walker;

pub use cluster::{Cluster, ClusterShape};
pub use partition::{build_clusters, connection_points, split_point};
pub use reconcile::reconcile;
pub use runner::{carve_cluster, carve_clusters, gather, spawn_walkers};
pub use walker::{CarvingWalker, WalkerState};
