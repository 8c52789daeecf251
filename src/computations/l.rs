//! L — top 10 routes by total distance, grounded on
//! `computation_l_ex.c`.
//!
//! Ranking uses a threshold-pruning optimisation: once the rank tree holds
//! 10 entries, the 10th-largest value
//! becomes a threshold, and routes whose running total can no longer beat
//! it are skipped rather than inserted. `findThresholdSortAVL` is ported
//! verbatim as [`kth_largest`]. The two-BST shape (rank by distance, then
//! re-sort the winning 10 by id) is also kept from the original: L's
//! output must be in route-id order, not distance order.
//!
//! `RouteSortInfo` is a plain `Copy` value, so unlike `DriverSortAVL`'s
//! `memAlloc(&routeSortAVLMem, ...)` node allocation, rank-tree nodes here
//! need no separate arena — `Avl<T>`'s own `Box`-per-node allocation
//! already is the idiomatic Rust analogue of that arena.

use std::cmp::Ordering;
use std::io::Write;

use crate::avl::{self, Avl};
use crate::error::IoError;
use crate::logging::timed_phase;
use crate::map::Map;
use crate::partition::Partitioner;
use crate::stream::{fields, RouteStream};

use super::{finish, write_line};

const TOP_K: usize = 10;
const NUM_PARTITIONS: u32 = 64;
const PARTITION_BLOCK: usize = 65536;

#[derive(Clone, Default)]
struct RouteDistEntry {
    occupied: bool,
    route_id: u32,
    dist: f32,
}

#[derive(Clone, Copy)]
struct RouteSortInfo {
    route_id: u32,
    dist: f32,
}

#[derive(Clone, Copy)]
struct StepPart {
    route_id: u32,
    distance: f32,
}

fn hash_u32(key: &u32, capacity: u32) -> u32 {
    key.wrapping_mul(2_654_435_769) >> (32 - capacity.trailing_zeros())
}
fn occupied(e: &RouteDistEntry) -> bool {
    e.occupied
}
fn key_equal(e: &RouteDistEntry, key: &u32) -> bool {
    e.occupied && e.route_id == *key
}
fn mark_occupied(e: &mut RouteDistEntry, key: &u32) {
    e.occupied = true;
    e.route_id = *key;
    e.dist = 0.0;
}
fn get_key(e: &RouteDistEntry) -> u32 {
    e.route_id
}

fn cmp_by_dist(a: &RouteSortInfo, query: &RouteSortInfo) -> Ordering {
    a.dist
        .partial_cmp(&query.dist)
        .expect("distances are always finite")
        .then_with(|| a.route_id.cmp(&query.route_id))
}

fn cmp_by_id(a: &RouteSortInfo, query: &RouteSortInfo) -> Ordering {
    a.route_id.cmp(&query.route_id)
}

/// Bounded reverse-in-order walk that also records the K largest values
/// visited, returning the K-th one (or `0.0` if fewer than `k` nodes
/// exist) — a direct port of `findThresholdSortAVL`.
fn kth_largest(tree: &Avl<RouteSortInfo>, k: usize) -> f32 {
    let mut seen = Vec::with_capacity(k);
    avl::reverse_in_order_take(tree, k, |info| seen.push(info.dist));
    seen.last().copied().unwrap_or(0.0)
}

/// Runs the L pipeline, writing `<route_id>;<total_distance>\n` for the
/// top 10 routes by total distance, ordered by route id ascending.
pub fn run(stream: &mut RouteStream, out: &mut impl Write) -> Result<(), IoError> {
    let mut map: Map<RouteDistEntry> = Map::new(1 << 16, 0.7);
    let mut partitioner: Partitioner<StepPart> = Partitioner::new(NUM_PARTITIONS, PARTITION_BLOCK);

    timed_phase("l::ingest", || {
        while let Some(step) = stream.read(fields::ROUTE_ID | fields::DISTANCE) {
            partitioner.add(step.route_id, StepPart { route_id: step.route_id, distance: step.distance });
        }

        for part in partitioner.iter_all() {
            if map.lookup(&part.route_id, hash_u32, occupied, key_equal).is_none() {
                map.insert(&part.route_id, hash_u32, occupied, key_equal, mark_occupied, get_key);
            }
            let entry = map
                .lookup_mut(&part.route_id, hash_u32, occupied, key_equal)
                .expect("just inserted or already present");
            entry.dist += part.distance;
        }
    });

    let mut by_id: Avl<RouteSortInfo> = Avl::new();
    timed_phase("l::rank", || {
        let dist_sorted = rank_by_distance(&map, TOP_K);
        avl::reverse_in_order_take(&dist_sorted, TOP_K, |info| {
            by_id.insert(cmp_by_id, info, |_| *info);
        });
    });

    timed_phase("l::extract", || {
        avl::in_order(&by_id, |info| {
            let _ = write_line(out, &format!("{};{:.6}", info.route_id, info.dist));
        });
    });

    finish(stream)
}

/// Phase 2/3: transfers every occupied route into a BST ordered by
/// `(total_distance, route_id)` descending, pruning candidates once the
/// current K-th-largest threshold makes them unable to place.
fn rank_by_distance(map: &Map<RouteDistEntry>, k: usize) -> Avl<RouteSortInfo> {
    let mut sorted: Avl<RouteSortInfo> = Avl::new();
    let mut threshold = 0.0f32;
    let mut count = 0usize;

    for entry in map.iter().filter(|e| e.occupied) {
        if entry.dist < threshold {
            continue;
        }
        let info = RouteSortInfo { route_id: entry.route_id, dist: entry.dist };
        sorted.insert(cmp_by_dist, &info, |q| *q);
        count += 1;
        if count >= k {
            threshold = kth_largest(&sorted, k);
        }
    }
    sorted
}
