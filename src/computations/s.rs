//! S — top 50 routes by leg-distance range, grounded on
//! `computation_s_ex.c`, using the same threshold-pruning rank pass as L
//! but over `max - min` instead of a plain sum.
//!
//! Source revisions of this computation disagree on whether the mean is
//! over all steps or distinct leg lengths; the arithmetic implemented
//! below (sum of all step distances divided by step count) is the resolved
//! choice — see DESIGN.md.

use std::cmp::Ordering;
use std::io::Write;

use crate::avl::{self, Avl};
use crate::error::IoError;
use crate::logging::timed_phase;
use crate::map::Map;
use crate::partition::Partitioner;
use crate::stream::{fields, RouteStream};

use super::{finish, write_line};

const TOP_K: usize = 50;
const NUM_PARTITIONS: u32 = 64;
const PARTITION_BLOCK: usize = 10_000;

#[derive(Clone, Default)]
struct TravelEntry {
    occupied: bool,
    route_id: u32,
    min: f32,
    max: f32,
    /// Sum of all step distances during ingest; divided by `n_steps` in
    /// place once ingest finishes, becoming the average (`sumOrAvg`'s
    /// dual role in the original, kept here to avoid a redundant field).
    sum_or_avg: f32,
    n_steps: u32,
}

#[derive(Clone, Copy)]
struct TravelSortInfo {
    route_id: u32,
    min: f32,
    max: f32,
    avg: f32,
}

impl TravelSortInfo {
    fn range(&self) -> f32 {
        self.max - self.min
    }
}

#[derive(Clone, Copy)]
struct StepPart {
    route_id: u32,
    distance: f32,
}

fn hash_u32(key: &u32, capacity: u32) -> u32 {
    key.wrapping_mul(2_654_435_769) >> (32 - capacity.trailing_zeros())
}
fn occupied(e: &TravelEntry) -> bool {
    e.occupied
}
fn key_equal(e: &TravelEntry, key: &u32) -> bool {
    e.occupied && e.route_id == *key
}
fn mark_occupied(e: &mut TravelEntry, key: &u32) {
    e.occupied = true;
    e.route_id = *key;
}
fn get_key(e: &TravelEntry) -> u32 {
    e.route_id
}

fn cmp_by_range(a: &TravelSortInfo, query: &TravelSortInfo) -> Ordering {
    a.range()
        .partial_cmp(&query.range())
        .expect("ranges are always finite")
        .then_with(|| a.route_id.cmp(&query.route_id))
}

fn kth_largest_range(tree: &Avl<TravelSortInfo>, k: usize) -> f32 {
    let mut seen = Vec::with_capacity(k);
    avl::reverse_in_order_take(tree, k, |info| seen.push(info.range()));
    seen.last().copied().unwrap_or(-1.0)
}

/// Runs the S pipeline, writing `<rank>;<route_id>;<min>;<avg>;<max>;<range>`
/// for the top 50 routes by leg-distance range, in descending range order.
pub fn run(stream: &mut RouteStream, out: &mut impl Write) -> Result<(), IoError> {
    let mut map: Map<TravelEntry> = Map::new(1024, 0.7);
    let mut partitioner: Partitioner<StepPart> = Partitioner::new(NUM_PARTITIONS, PARTITION_BLOCK);

    timed_phase("s::ingest", || {
        while let Some(step) = stream.read(fields::ROUTE_ID | fields::DISTANCE) {
            partitioner.add(step.route_id, StepPart { route_id: step.route_id, distance: step.distance });
        }

        for part in partitioner.iter_all() {
            if map.lookup(&part.route_id, hash_u32, occupied, key_equal).is_none() {
                let entry = map.insert(&part.route_id, hash_u32, occupied, key_equal, mark_occupied, get_key);
                entry.min = part.distance;
                entry.max = part.distance;
                entry.sum_or_avg = part.distance;
                entry.n_steps = 1;
            } else {
                let entry = map
                    .lookup_mut(&part.route_id, hash_u32, occupied, key_equal)
                    .expect("just checked present");
                entry.max = entry.max.max(part.distance);
                entry.min = entry.min.min(part.distance);
                entry.sum_or_avg += part.distance;
                entry.n_steps += 1;
            }
        }
    });

    let sorted = timed_phase("s::rank", || rank_by_range(&map, TOP_K));

    timed_phase("s::extract", || {
        let mut rank = 0u32;
        avl::reverse_in_order_take(&sorted, TOP_K, |info| {
            rank += 1;
            let _ = write_line(
                out,
                &format!("{};{};{:.6};{:.6};{:.6};{:.6}", rank, info.route_id, info.min, info.avg, info.max, info.range()),
            );
        });
    });

    finish(stream)
}

/// Divides every occupied entry's accumulated sum by its step count
/// (turning it into an average, `calcAvgAndSort`'s first job) and ranks by
/// `(max-min, route_id)` descending with the same threshold-pruning used
/// by [`super::l`].
fn rank_by_range(map: &Map<TravelEntry>, k: usize) -> Avl<TravelSortInfo> {
    let mut sorted: Avl<TravelSortInfo> = Avl::new();
    let mut threshold = -1.0f32;
    let mut count = 0usize;

    for entry in map.iter().filter(|e| e.occupied) {
        let range = entry.max - entry.min;
        if range < threshold {
            continue;
        }
        let info = TravelSortInfo {
            route_id: entry.route_id,
            min: entry.min,
            max: entry.max,
            avg: entry.sum_or_avg / entry.n_steps as f32,
        };
        sorted.insert(cmp_by_range, &info, |q| *q);
        count += 1;
        if count >= k {
            threshold = kth_largest_range(&sorted, k);
        }
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn stream_from(csv: &str) -> RouteStream {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(csv.as_bytes()).unwrap();
        RouteStream::open(f.path()).unwrap()
    }

    #[test]
    fn ranks_by_leg_range_descending_with_mean_over_all_steps() {
        let mut s = stream_from(
            "a;b;c;d;e;f\n1;1;X;Y;10;A\n1;2;Y;Z;4;A\n1;3;Z;W;6;A\n2;1;X;Y;5;B\n",
        );
        let mut out = Vec::new();
        run(&mut s, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1;1;4.000000;6.666667;10.000000;6.000000\n2;2;5.000000;5.000000;5.000000;0.000000\n"
        );
    }

    fn reference_top_k(map: &Map<TravelEntry>, k: usize) -> Vec<(u32, f32)> {
        let mut all: Vec<(u32, f32)> = map
            .iter()
            .filter(|e| e.occupied)
            .map(|e| (e.route_id, e.max - e.min))
            .collect();
        all.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then_with(|| b.0.cmp(&a.0)));
        all.truncate(k);
        all
    }

    proptest::proptest! {
        #[test]
        fn pruned_ranking_matches_sort_then_take(
            legs in proptest::collection::vec((0u32..200, 0.0f32..100.0), 0..400),
        ) {
            let mut map: Map<TravelEntry> = Map::new(64, 0.7);
            for &(id, dist) in &legs {
                if map.lookup(&id, hash_u32, occupied, key_equal).is_none() {
                    let entry = map.insert(&id, hash_u32, occupied, key_equal, mark_occupied, get_key);
                    entry.min = dist;
                    entry.max = dist;
                    entry.sum_or_avg = dist;
                    entry.n_steps = 1;
                } else {
                    let entry = map.lookup_mut(&id, hash_u32, occupied, key_equal).unwrap();
                    entry.max = entry.max.max(dist);
                    entry.min = entry.min.min(dist);
                    entry.sum_or_avg += dist;
                    entry.n_steps += 1;
                }
            }

            let sorted = rank_by_range(&map, TOP_K);
            let mut got = Vec::new();
            avl::reverse_in_order_take(&sorted, TOP_K, |info| got.push((info.route_id, info.range())));

            proptest::prop_assert_eq!(got, reference_top_k(&map, TOP_K));
        }
    }
}
