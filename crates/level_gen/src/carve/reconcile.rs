//! Dead-end and negative-path reconciliation.
//!
//! Concurrent walkers leave a cluster with orphaned reversed branches (negative
//! distances) and with dead-end flags that may no longer hold. [`reconcile`] runs the
//! repair passes in order:
//!
//! 1. [`repair_negative_sections`]: renumber negative branches from the positive cells
//!    they touch.
//! 2. [`consolidate_dead_ends`]: drop spurious flags and re-root dead-end branches that
//!    have a closer anchor.
//! 3. [`settle_distances`]: breadth-first distances from the start connection point.
//! 4. [`finalize_flags`]: re-derive dead-end and crossroad flags from the settled metric.
//!
//! Every pass follows the passages the walkers opened. Touching carved cells without
//! a passage between them are separate corridors.
use std::cmp::Reverse;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BinaryHeap, VecDeque};

use tracing::debug;

use super::Cluster;
use crate::error::{Error, Result};
use crate::grid::{Grid, Point};

/// Distance of `p` as seen from inside `cluster`: carved interior cells and the start
/// connection point (distance 0). Everything else is `None`.
pub(crate) fn cluster_distance(grid: &Grid, cluster: &Cluster, p: Point) -> Option<i32> {
    if p == cluster.start {
        return Some(0);
    }
    if !cluster.contains_interior(p) {
        return None;
    }
    grid.get(p).filter(|s| s.is_carved()).map(|s| s.distance)
}

/// Cells joined to `p` by a passage, with their distances.
pub(crate) fn linked_distances(grid: &Grid, cluster: &Cluster, p: Point) -> Vec<(Point, i32)> {
    p.neighbors()
        .filter(|(_, n)| grid.is_linked(p, *n))
        .filter_map(|(_, n)| cluster_distance(grid, cluster, n).map(|d| (n, d)))
        .collect()
}

fn adjacent_distances(grid: &Grid, cluster: &Cluster, p: Point) -> Vec<(Point, i32)> {
    p.neighbors()
        .filter_map(|(_, n)| cluster_distance(grid, cluster, n).map(|d| (n, d)))
        .collect()
}

fn set_dead_end(grid: &mut Grid, cluster: &mut Cluster, p: Point, flag: bool) {
    if let Some(s) = grid.get_mut(p) {
        s.dead_end = flag;
    }
    if flag {
        cluster.dead_ends.insert(p);
    } else {
        cluster.dead_ends.remove(&p);
    }
}

/// Renumbers every negative cell reachable from a non-negative anchor.
///
/// A negative cell touching a non-negative one is joined to it by a new passage;
/// the rest of its branch is renumbered outward along the branch's own passages, so
/// every renumbered cell continues a cell one step closer to the start. Branch
/// terminals become dead ends. Returns the number of cells fixed; branches with no
/// anchor keep their negative values.
pub fn repair_negative_sections(grid: &mut Grid, cluster: &mut Cluster) -> usize {
    if cluster.negative_cells == 0 {
        return 0;
    }

    let mut fixed: Vec<(Point, i32)> = Vec::new();
    loop {
        let mut heap: BinaryHeap<Reverse<(i32, Point, Point)>> = BinaryHeap::new();
        for p in cluster.interior_points() {
            if !grid.get(p).is_some_and(|s| s.is_negative()) {
                continue;
            }
            let anchor = adjacent_distances(grid, cluster, p)
                .into_iter()
                .filter(|(_, d)| *d >= 0)
                .min_by_key(|(n, d)| (*d, *n));
            if let Some((n, d)) = anchor {
                heap.push(Reverse((d + 1, p, n)));
            }
        }
        if heap.is_empty() {
            break;
        }

        while let Some(Reverse((distance, p, parent))) = heap.pop() {
            let Some(section) = grid.get_mut(p) else {
                continue;
            };
            if !section.is_negative() {
                continue;
            }
            section.distance = distance;
            section.dead_end = false;
            grid.open_passage(parent, p);
            fixed.push((p, distance));
            for n in cluster.interior_neighbors(p) {
                if grid.is_linked(p, n) && grid.get(n).is_some_and(|s| s.is_negative()) {
                    heap.push(Reverse((distance + 1, n, p)));
                }
            }
        }
    }

    for &(p, distance) in &fixed {
        cluster.dead_ends.remove(&p);
        let continues = linked_distances(grid, cluster, p)
            .iter()
            .any(|(_, d)| *d == distance + 1);
        if !continues && !p.is_adjacent(cluster.end) {
            set_dead_end(grid, cluster, p, true);
        }
    }

    cluster.negative_cells = cluster.negative_cells.saturating_sub(fixed.len());
    if !fixed.is_empty() {
        debug!(
            "Cluster {}: renumbered {} negative cells, {} left.",
            cluster.id,
            fixed.len(),
            cluster.negative_cells
        );
    }
    fixed.len()
}

/// Hangs the branch ending at `tip` from `anchor` instead of its old root.
///
/// Cells are renumbered from `anchor` outward while that shortens them. The passage
/// where renumbering stops is closed unless that would strand carved cells, so the
/// branch keeps a single far end, which is returned.
fn reroot(grid: &mut Grid, cluster: &Cluster, tip: Point, anchor: Point, target: i32) -> Point {
    grid.open_passage(anchor, tip);
    let mut current = tip;
    let mut old = cluster_distance(grid, cluster, tip).unwrap_or(target + 1);
    let mut new = target + 1;
    loop {
        let parent = linked_distances(grid, cluster, current)
            .into_iter()
            .filter(|(n, d)| *d == old - 1 && *n != anchor)
            .map(|(n, _)| n)
            .min();
        if let Some(s) = grid.get_mut(current) {
            s.distance = new;
        }
        let Some(parent) = parent else {
            return current;
        };
        if new + 1 >= old - 1 {
            grid.close_passage(current, parent);
            if !fully_connected(grid, cluster) {
                grid.open_passage(current, parent);
            }
            return current;
        }
        current = parent;
        old -= 1;
        new += 1;
    }
}

/// Re-examines every flagged dead end.
///
/// - A passage to a cell one higher and one to a cell one lower makes the flag
///   spurious.
/// - A neighbor pair two apart whose larger value is one above the dead end keeps it.
/// - Otherwise a touching cell more than one step closer to the start is a shorter
///   anchor. The dead-end branch is re-rooted there: it is opened into the anchor,
///   renumbered down from it, and cut from its old root where that stops paying off.
///   The cut end is flagged in place of the old tip when nothing hangs from it.
/// - With no such anchor the dead end is confirmed.
pub fn consolidate_dead_ends(grid: &mut Grid, cluster: &mut Cluster) {
    let flagged: Vec<Point> = cluster.dead_ends.iter().copied().collect();
    for p in flagged {
        let Some(d) = cluster_distance(grid, cluster, p) else {
            set_dead_end(grid, cluster, p, false);
            continue;
        };
        let linked = linked_distances(grid, cluster, p);
        let has_higher = linked.iter().any(|(_, nd)| *nd == d + 1);
        let has_lower = linked.iter().any(|(_, nd)| *nd == d - 1);
        if has_higher && has_lower {
            set_dead_end(grid, cluster, p, false);
            continue;
        }

        let around = adjacent_distances(grid, cluster, p);
        let mut pair_maxima = Vec::new();
        for (i, (_, a)) in around.iter().enumerate() {
            for (_, b) in &around[i + 1..] {
                if (a - b).abs() == 2 {
                    pair_maxima.push(*a.max(b));
                }
            }
        }
        if pair_maxima.contains(&(d + 1)) {
            continue;
        }

        let target = if pair_maxima.is_empty() {
            around.iter().map(|(_, nd)| *nd).filter(|nd| *nd < d - 1).max()
        } else {
            pair_maxima.into_iter().filter(|m| *m < d - 1).max()
        };
        let Some(target) = target else {
            continue;
        };
        let Some(anchor) = around
            .iter()
            .filter(|(n, nd)| *nd == target && !grid.is_linked(p, *n))
            .map(|(n, _)| *n)
            .min()
        else {
            continue;
        };

        let far_end = reroot(grid, cluster, p, anchor, target);
        set_dead_end(grid, cluster, p, false);
        let leaf = far_end != p && linked_distances(grid, cluster, far_end).len() == 1;
        if leaf && !far_end.is_adjacent(cluster.end) {
            set_dead_end(grid, cluster, far_end, true);
        }
        debug!(
            "Cluster {}: dead end {} re-rooted at {}, branch now ends at {}.",
            cluster.id, p, anchor, far_end
        );
    }
}

/// Breadth-first distances from the start over passages, for every reachable carved
/// interior cell.
fn passage_distances(grid: &Grid, cluster: &Cluster) -> BTreeMap<Point, i32> {
    let mut settled = BTreeMap::new();
    let mut queue = VecDeque::from([(cluster.start, 0)]);
    while let Some((p, d)) = queue.pop_front() {
        for n in cluster.interior_neighbors(p) {
            if !grid.is_linked(p, n) || !grid.get(n).is_some_and(|s| s.is_carved()) {
                continue;
            }
            if let Entry::Vacant(slot) = settled.entry(n) {
                slot.insert(d + 1);
                queue.push_back((n, d + 1));
            }
        }
    }
    settled
}

fn fully_connected(grid: &Grid, cluster: &Cluster) -> bool {
    let reached = passage_distances(grid, cluster);
    cluster
        .interior_points()
        .filter(|p| grid.get(*p).is_some_and(|s| s.is_carved()))
        .all(|p| reached.contains_key(&p))
}

/// Replaces every carved distance with its breadth-first distance from the start.
///
/// Fails if a carved cell cannot be reached from the start through passages.
pub fn settle_distances(grid: &mut Grid, cluster: &mut Cluster) -> Result<()> {
    let settled = passage_distances(grid, cluster);

    let mut size = 0;
    let points: Vec<Point> = cluster.interior_points().collect();
    for p in points {
        let Some(section) = grid.get_mut(p) else {
            continue;
        };
        if !section.is_carved() {
            continue;
        }
        match settled.get(&p) {
            Some(&d) => {
                section.distance = d;
                size += 1;
            }
            None => {
                return Err(Error::inconsistent(
                    cluster.id,
                    format!("carved cell {p} is unreachable from the start"),
                ))
            }
        }
    }

    let settled_grid: &Grid = grid;
    let main_path_length = cluster
        .interior_neighbors(cluster.end)
        .filter(|n| settled_grid.is_linked(*n, cluster.end))
        .filter_map(|n| cluster_distance(settled_grid, cluster, n))
        .max()
        .unwrap_or(0);
    cluster.size = size;
    cluster.negative_cells = 0;
    cluster.main_path_length = main_path_length;
    Ok(())
}

/// Re-derives dead-end and crossroad flags from the settled distances.
///
/// Only passages count. A dead end has no linked cell one step farther, exactly one
/// linked cell one step closer, and does not border the end connection point. A
/// crossroad has more than two passages, connection points included.
pub fn finalize_flags(grid: &mut Grid, cluster: &mut Cluster) {
    cluster.dead_ends.clear();
    let points: Vec<Point> = cluster.interior_points().collect();
    for p in points {
        let Some(d) = cluster_distance(grid, cluster, p) else {
            continue;
        };
        let linked = linked_distances(grid, cluster, p);
        let higher = linked.iter().filter(|(_, nd)| *nd == d + 1).count();
        let lower = linked.iter().filter(|(_, nd)| *nd == d - 1).count();
        let borders_end = p.is_adjacent(cluster.end);
        let degree = linked.len() + usize::from(grid.is_linked(p, cluster.end));

        let dead_end = higher == 0 && lower == 1 && !borders_end;
        if let Some(s) = grid.get_mut(p) {
            s.dead_end = dead_end;
            s.crossroad = degree > 2;
        }
        if dead_end {
            cluster.dead_ends.insert(p);
        }
    }
}

/// Runs all reconciliation passes on a cluster whose walkers have stopped.
///
/// Negative cells that cannot be anchored to a positive neighbor are an internal
/// consistency error.
pub fn reconcile(grid: &mut Grid, cluster: &mut Cluster) -> Result<usize> {
    let repaired = repair_negative_sections(grid, cluster);
    if cluster.negative_cells > 0 {
        return Err(Error::inconsistent(
            cluster.id,
            format!(
                "{} negative cells have no positively numbered neighbor",
                cluster.negative_cells
            ),
        ));
    }
    consolidate_dead_ends(grid, cluster);
    settle_distances(grid, cluster)?;
    finalize_flags(grid, cluster);
    Ok(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Whether two fixture cells are joined: consecutive values of one sign, `S`
    /// with `1`, or `E` with `-1`.
    fn consecutive(a: &str, b: &str) -> bool {
        match (a, b) {
            ("S", v) | (v, "S") => v == "1",
            ("E", v) | (v, "E") => v == "-1",
            ("#", _) | (_, "#") => false,
            (a, b) => {
                let a: i32 = a.parse().expect("distance");
                let b: i32 = b.parse().expect("distance");
                a.signum() == b.signum() && (a - b).abs() == 1
            }
        }
    }

    /// Builds a cluster-local grid from rows given north to south.
    ///
    /// `S`/`E` are the connection points, `#` uncarved, digits or `-n` distances.
    /// Touching cells are linked when [`consecutive`] holds.
    fn grid_from(rows: &[&[&str]]) -> (Grid, Cluster) {
        let height = rows.len();
        let width = rows[0].len();
        let cluster = Cluster::new(
            1,
            0,
            Point::new(0, 0),
            Point::new(width as i32 - 1, height as i32 - 1),
            4,
        );
        let mut grid = Grid::new(Point::ORIGIN, width, height);
        let mut c = cluster;
        let at = |x: usize, row_idx: usize| Point::new(x as i32, (height - 1 - row_idx) as i32);
        for (row_idx, row) in rows.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                let s = grid.get_mut(at(x, row_idx)).expect("inside");
                match *cell {
                    "S" | "E" => s.mark_connection_point(),
                    "#" => {}
                    v => {
                        let d: i32 = v.parse().expect("distance");
                        s.carve(d);
                        c.size += 1;
                        if d < 0 {
                            c.negative_cells += 1;
                        }
                    }
                }
            }
        }
        for (row_idx, row) in rows.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                if x + 1 < width && consecutive(cell, row[x + 1]) {
                    grid.open_passage(at(x, row_idx), at(x + 1, row_idx));
                }
                if row_idx + 1 < height && consecutive(cell, rows[row_idx + 1][x]) {
                    grid.open_passage(at(x, row_idx), at(x, row_idx + 1));
                }
            }
        }
        (grid, c)
    }

    fn distances(grid: &Grid, rows: usize, cols: usize) -> Vec<Vec<i32>> {
        (0..rows)
            .rev()
            .map(|y| {
                (0..cols)
                    .map(|x| grid.distance(Point::new(x as i32, y as i32)).unwrap_or(0))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn negative_branch_is_renumbered_from_anchor() {
        let (mut grid, mut cluster) = grid_from(&[
            &["-2", "-1", "E"],
            &["#", "#", "#"],
            &["S", "1", "2"],
        ]);
        // Extend the branch down to the start through the middle row.
        grid.get_mut(Point::new(0, 1)).expect("inside").carve(-3);
        grid.open_passage(Point::new(0, 1), Point::new(0, 2));
        cluster.size += 1;
        cluster.negative_cells += 1;

        let fixed = repair_negative_sections(&mut grid, &mut cluster);
        assert_eq!(fixed, 3);
        assert_eq!(cluster.negative_cells, 0);
        assert_eq!(grid.distance(Point::new(0, 1)), Some(1));
        assert_eq!(grid.distance(Point::new(0, 2)), Some(2));
        assert_eq!(grid.distance(Point::new(1, 2)), Some(3));
        assert!(grid.is_linked(cluster.start, Point::new(0, 1)));
        assert!(!cluster.dead_ends.contains(&Point::new(1, 2)));
    }

    #[test]
    fn repair_marks_terminal_dead_end() {
        let (mut grid, mut cluster) = grid_from(&[
            &["#", "#", "#", "E"],
            &["#", "-2", "-1", "#"],
            &["S", "1", "#", "#"],
        ]);
        repair_negative_sections(&mut grid, &mut cluster);
        assert_eq!(grid.distance(Point::new(1, 1)), Some(2));
        assert_eq!(grid.distance(Point::new(2, 1)), Some(3));
        assert!(grid.is_linked(Point::new(1, 0), Point::new(1, 1)));
        assert!(cluster.dead_ends.contains(&Point::new(2, 1)));
    }

    #[test]
    fn repair_anchors_branches_touching_renumbered_cells() {
        // Two reversed trails from the end; only the lower one reaches the start side.
        let (mut grid, mut cluster) = grid_from(&[
            &["#", "-1", "E"],
            &["-3", "-2", "-1"],
            &["S", "#", "#"],
        ]);
        grid.close_passage(Point::new(1, 1), Point::new(1, 2));

        let fixed = repair_negative_sections(&mut grid, &mut cluster);
        assert_eq!(fixed, 4);
        assert_eq!(cluster.negative_cells, 0);
        assert_eq!(
            distances(&grid, 3, 3),
            vec![vec![0, 3, 0], vec![1, 2, 3], vec![0, 0, 0]]
        );
        assert!(grid.is_linked(Point::new(1, 1), Point::new(1, 2)));
        assert!(cluster.dead_ends.is_empty());
    }

    #[test]
    fn unanchored_negative_branch_is_inconsistent() {
        let (mut grid, mut cluster) = grid_from(&[
            &["#", "-1", "E"],
            &["#", "#", "#"],
            &["S", "1", "#"],
        ]);
        let err = reconcile(&mut grid, &mut cluster).expect_err("orphaned branch");
        assert!(matches!(err, Error::Inconsistent { cluster: 1, .. }));
    }

    #[test]
    fn spurious_dead_end_flag_is_cleared() {
        let (mut grid, mut cluster) = grid_from(&[
            &["#", "#", "E"],
            &["#", "#", "3"],
            &["S", "1", "2"],
        ]);
        cluster.dead_ends.insert(Point::new(2, 0));
        consolidate_dead_ends(&mut grid, &mut cluster);
        assert!(cluster.dead_ends.is_empty());
    }

    /// A corridor that winds around the cluster and ends next to the start.
    fn winding_corridor() -> (Grid, Cluster) {
        let (mut grid, mut cluster) = grid_from(&[
            &["6", "5", "4", "E"],
            &["7", "#", "3", "#"],
            &["S", "1", "2", "#"],
        ]);
        grid.open_passage(Point::new(2, 2), cluster.end);
        set_dead_end(&mut grid, &mut cluster, Point::new(0, 1), true);
        (grid, cluster)
    }

    #[test]
    fn dead_end_with_closer_anchor_is_rerooted() {
        let (mut grid, mut cluster) = winding_corridor();
        consolidate_dead_ends(&mut grid, &mut cluster);

        assert_eq!(grid.distance(Point::new(0, 1)), Some(1));
        assert_eq!(grid.distance(Point::new(0, 2)), Some(2));
        assert_eq!(grid.distance(Point::new(1, 2)), Some(3));
        assert!(grid.is_linked(cluster.start, Point::new(0, 1)));
        assert!(!grid.is_linked(Point::new(1, 2), Point::new(2, 2)));
        assert_eq!(
            cluster.dead_ends.iter().copied().collect::<Vec<_>>(),
            vec![Point::new(1, 2)]
        );
        assert!(!grid.get(Point::new(0, 1)).expect("inside").dead_end);
    }

    #[test]
    fn rerooted_branch_survives_reconcile() {
        let (mut grid, mut cluster) = winding_corridor();
        reconcile(&mut grid, &mut cluster).expect("consistent");

        assert_eq!(
            distances(&grid, 3, 4),
            vec![vec![2, 3, 4, 0], vec![1, 0, 3, 0], vec![0, 1, 2, 0]]
        );
        assert_eq!(
            cluster.dead_ends.iter().copied().collect::<Vec<_>>(),
            vec![Point::new(1, 2)]
        );
        assert_eq!(cluster.main_path_length, 4);
        assert_eq!(cluster.size, 7);
    }

    #[test]
    fn winding_corridor_without_consolidation_keeps_long_tip() {
        let (mut grid, mut cluster) = winding_corridor();
        settle_distances(&mut grid, &mut cluster).expect("consistent");
        finalize_flags(&mut grid, &mut cluster);
        assert_eq!(grid.distance(Point::new(0, 1)), Some(7));
        assert_eq!(
            cluster.dead_ends.iter().copied().collect::<Vec<_>>(),
            vec![Point::new(0, 1)]
        );
    }

    #[test]
    fn reconcile_yields_contiguous_distances_and_valid_dead_ends() {
        let (mut grid, mut cluster) = grid_from(&[
            &["4", "5", "-2", "-1", "E"],
            &["3", "#", "-3", "#", "#"],
            &["2", "#", "#", "#", "#"],
            &["1", "#", "#", "#", "#"],
            &["S", "1", "#", "#", "#"],
        ]);
        let repaired = reconcile(&mut grid, &mut cluster).expect("consistent");
        assert_eq!(repaired, 3);

        let d = distances(&grid, 5, 5);
        assert_eq!(d[0], vec![4, 5, 6, 7, 0]);
        let mut values: Vec<i32> = grid
            .iter()
            .filter(|s| s.is_carved())
            .map(|s| s.distance)
            .collect();
        values.sort_unstable();
        values.dedup();
        assert_eq!(values, (1..=7).collect::<Vec<_>>());

        for p in &cluster.dead_ends {
            let dp = cluster_distance(&grid, &cluster, *p).expect("carved");
            let around = linked_distances(&grid, &cluster, *p);
            assert_eq!(around.iter().filter(|(_, nd)| *nd == dp - 1).count(), 1);
            assert_eq!(around.iter().filter(|(_, nd)| *nd == dp + 1).count(), 0);
        }
        assert_eq!(
            cluster.dead_ends.iter().copied().collect::<Vec<_>>(),
            vec![Point::new(1, 0), Point::new(2, 3)]
        );
        assert!(grid.get(Point::new(2, 4)).expect("inside").crossroad);
        assert_eq!(cluster.main_path_length, 7);
        assert_eq!(cluster.size, 9);
        assert_eq!(cluster.negative_cells, 0);
    }

    #[test]
    fn settle_rejects_disconnected_cells() {
        let (mut grid, mut cluster) = grid_from(&[
            &["#", "#", "E"],
            &["#", "#", "#"],
            &["S", "1", "#"],
        ]);
        grid.get_mut(Point::new(0, 2)).expect("inside").carve(4);
        let err = settle_distances(&mut grid, &mut cluster).expect_err("isolated cell");
        assert!(matches!(err, Error::Inconsistent { .. }));
    }

    #[test]
    fn touching_corridors_keep_their_dead_end() {
        // Two corridors from the start run side by side; only passages join cells.
        let (mut grid, mut cluster) = grid_from(&[
            &["2", "3", "E"],
            &["1", "2", "#"],
            &["S", "1", "#"],
        ]);
        grid.close_passage(Point::new(1, 1), Point::new(0, 1));
        grid.close_passage(Point::new(1, 1), Point::new(1, 2));
        grid.open_passage(Point::new(1, 2), cluster.end);

        reconcile(&mut grid, &mut cluster).expect("consistent");
        assert_eq!(
            cluster.dead_ends.iter().copied().collect::<Vec<_>>(),
            vec![Point::new(1, 1)]
        );
        assert!(grid.get(Point::new(1, 1)).expect("inside").dead_end);
        assert!(!grid.get(Point::new(0, 1)).expect("inside").crossroad);
        assert_eq!(cluster.main_path_length, 3);
    }

    #[test]
    fn crossroads_need_three_connections() {
        let (mut grid, mut cluster) = grid_from(&[
            &["#", "3", "E"],
            &["1", "2", "3"],
            &["S", "1", "#"],
        ]);
        grid.open_passage(Point::new(2, 1), cluster.end);
        reconcile(&mut grid, &mut cluster).expect("consistent");
        assert!(grid.get(Point::new(1, 1)).expect("inside").crossroad);
        assert!(!grid.get(Point::new(0, 1)).expect("inside").crossroad);
    }
}
