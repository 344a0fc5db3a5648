//! Drives carving walkers over each cluster and gathers the results.
//!
//! Every cluster is carved on its own local grid with its own RNG seeded from the level
//! seed and the cluster index, so clusters can be carved in any order (or in parallel
//! with the `parallel` feature) and still produce the same maze.
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use super::reconcile::{cluster_distance, reconcile, repair_negative_sections};
use super::{CarvingWalker, Cluster, ClusterShape};
use crate::error::{Error, Result};
use crate::grid::{Grid, Point};
use crate::ids::IdSequence;
use crate::random::{range_inclusive, seed_for_cluster};

/// Spawns the initial walkers for a cluster according to its shape.
///
/// - `Small`: two border-hugging forward walkers.
/// - `SmallSided`: one spreading forward walker and one border-hugging reversed walker.
/// - `Regular`: one or two forward and one or two reversed walkers, three at most.
pub fn spawn_walkers(
    cluster: &Cluster,
    rng: &mut dyn RngCore,
    ids: &mut IdSequence,
) -> Vec<CarvingWalker> {
    match cluster.shape {
        ClusterShape::Small => vec![
            CarvingWalker::forward(ids.next_id(), cluster, true),
            CarvingWalker::forward(ids.next_id(), cluster, true),
        ],
        ClusterShape::SmallSided => vec![
            CarvingWalker::forward(ids.next_id(), cluster, false),
            CarvingWalker::reversed(ids.next_id(), cluster, true),
        ],
        ClusterShape::Regular => {
            let from_start = range_inclusive(rng, 1, 2);
            let from_end = range_inclusive(rng, 1, 3 - from_start);
            let mut walkers = Vec::with_capacity((from_start + from_end) as usize);
            for i in 0..from_start {
                let prefer = from_start == 2 && i == 0;
                walkers.push(CarvingWalker::forward(ids.next_id(), cluster, prefer));
            }
            for i in 0..from_end {
                let prefer = from_end == 1 || i == 1;
                walkers.push(CarvingWalker::reversed(ids.next_id(), cluster, prefer));
            }
            walkers
        }
    }
}

/// Fresh cluster-local grid with both connection points marked.
pub fn local_grid(cluster: &Cluster) -> Grid {
    let mut grid = Grid::new(
        cluster.start,
        (cluster.width() + 1) as usize,
        (cluster.height() + 1) as usize,
    );
    for p in [cluster.start, cluster.end] {
        if let Some(s) = grid.get_mut(p) {
            s.mark_connection_point();
        }
    }
    grid
}

fn run_walkers(
    walkers: &mut [CarvingWalker],
    grid: &mut Grid,
    cluster: &mut Cluster,
    rng: &mut dyn RngCore,
) -> Result<()> {
    // Every productive step carves or renumbers a cell, so this bounds any live run.
    let max_rounds = cluster.interior_area() * 8 + 64;
    for _ in 0..max_rounds {
        if walkers.iter().all(CarvingWalker::is_stopped) {
            return Ok(());
        }
        for walker in walkers.iter_mut() {
            walker.step(grid, cluster, rng);
        }
    }
    Err(Error::inconsistent(
        cluster.id,
        format!("walkers still active after {max_rounds} rounds"),
    ))
}

/// True once a positively numbered cell has a passage into the end point.
fn end_reached(grid: &Grid, cluster: &Cluster) -> bool {
    cluster
        .interior_neighbors(cluster.end)
        .any(|n| grid.is_linked(n, cluster.end) && grid.get(n).is_some_and(|s| s.is_positive()))
}

/// Farthest numbered cell (or the start point) that still has an unvisited neighbor.
fn continuation_origin(grid: &Grid, cluster: &Cluster) -> Option<(Point, i32)> {
    std::iter::once(cluster.start)
        .chain(cluster.interior_points())
        .filter_map(|p| {
            let d = cluster_distance(grid, cluster, p).filter(|d| *d >= 0)?;
            let open = cluster
                .interior_neighbors(p)
                .any(|n| grid.get(n).is_some_and(|s| !s.visited));
            open.then_some((d, p))
        })
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(d, p)| (p, d))
}

/// Carves one cluster on a local grid and reconciles its numbering.
///
/// Walkers run until all stop. If orphaned reversed branches remain, or no path
/// reaches the end point, a forward walker resumes from the farthest open numbered
/// cell and the round repeats.
pub fn carve_cluster(
    cluster: &mut Cluster,
    rng: &mut dyn RngCore,
    ids: &mut IdSequence,
) -> Result<Grid> {
    let mut grid = local_grid(cluster);
    let mut walkers = spawn_walkers(cluster, rng, ids);
    debug!(
        "Carving cluster {} ({:?}, {}x{}) with {} walkers.",
        cluster.id,
        cluster.shape,
        cluster.width(),
        cluster.height(),
        walkers.len()
    );

    for _ in 0..=cluster.interior_area() {
        run_walkers(&mut walkers, &mut grid, cluster, rng)?;
        repair_negative_sections(&mut grid, cluster);
        let reached = end_reached(&grid, cluster);
        if cluster.negative_cells == 0 && reached {
            reconcile(&mut grid, cluster)?;
            return Ok(grid);
        }

        let Some((origin, distance)) = continuation_origin(&grid, cluster) else {
            return Err(Error::inconsistent(
                cluster.id,
                "no open cell left to continue carving from",
            ));
        };
        debug!(
            "Cluster {}: continuing from {} at distance {} ({} negative cells).",
            cluster.id, origin, distance, cluster.negative_cells
        );
        walkers = vec![CarvingWalker::continuation(
            ids.next_id(),
            origin,
            distance,
            false,
            !reached,
        )];
    }

    Err(Error::inconsistent(
        cluster.id,
        "carving did not connect the connection points",
    ))
}

fn carve_with_seed(cluster: &mut Cluster, base_seed: u64) -> Result<Grid> {
    let mut rng = StdRng::seed_from_u64(seed_for_cluster(base_seed, cluster.index));
    let mut ids = IdSequence::default();
    carve_cluster(cluster, &mut rng, &mut ids)
}

/// Carves every cluster and returns their local grids in cluster order.
pub fn carve_clusters(clusters: &mut [Cluster], base_seed: u64) -> Result<Vec<Grid>> {
    #[cfg(feature = "parallel")]
    let grids = clusters
        .par_iter_mut()
        .map(|cluster| carve_with_seed(cluster, base_seed))
        .collect::<Result<Vec<_>>>();

    #[cfg(not(feature = "parallel"))]
    let grids = clusters
        .iter_mut()
        .map(|cluster| carve_with_seed(cluster, base_seed))
        .collect::<Result<Vec<_>>>();

    grids
}

/// Copies each cluster's interior cells from its local grid into the level grid.
pub fn gather(level_grid: &mut Grid, clusters: &[Cluster], locals: &[Grid]) {
    for (cluster, local) in clusters.iter().zip(locals) {
        level_grid.absorb(local, |p| cluster.contains_interior(p));
    }
}
