//! D1 — top 10 drivers by distinct routes driven, grounded on
//! `computation_d1_ex.c`.
//!
//! The original tracks "has this driver already been counted for this
//! route" with a per-route linked list of driver-name pointers, compared by
//! pointer identity against the single copy held in the driver map. Here
//! every driver is assigned a small dense `u32` id the first time it's
//! seen (the same "dense id + side array" idiom `computation_t_ex.c` uses
//! for towns), so the per-route "already counted" check becomes a linear
//! scan over a `Vec<u32>` of ids — just as small and just as linear as the
//! original's list, but comparing plain integers instead of leaning on
//! pointer-identity of interned strings. This is the redesign recorded in
//! DESIGN.md for the per-route driver-set representation (linear list vs.
//! hash set): a small inline vector, since typical routes have only a
//! handful of distinct drivers.

use std::io::Write;

use crate::arena::Arena;
use crate::avl::{self, Avl};
use crate::error::IoError;
use crate::map::{fnv1a, Map};
use crate::logging::timed_phase;
use crate::partition::Partitioner;
use crate::stream::{fields, RouteStream};

use super::{finish, write_line};

const TOP_K: usize = 10;
const NUM_PARTITIONS: u32 = 64;
const PARTITION_BLOCK: usize = 8192;

#[derive(Clone, Default)]
struct DriverNameEntry<'a> {
    occupied: bool,
    name: Option<&'a str>,
    id: u32,
}

#[derive(Clone, Default)]
struct RouteEntry {
    occupied: bool,
    route_id: u32,
    seen_drivers: Vec<u32>,
}

struct DriverStat<'a> {
    name: &'a str,
    route_count: u32,
}

#[derive(Clone, Copy)]
struct StepPart {
    route_id: u32,
    driver_id: u32,
}

fn hash_u32(key: &u32, capacity: u32) -> u32 {
    key.wrapping_mul(2_654_435_769) >> (32 - capacity.trailing_zeros())
}

fn hash_str(key: &&str, _capacity: u32) -> u32 {
    fnv1a(key.as_bytes())
}

fn name_occupied(e: &DriverNameEntry) -> bool {
    e.occupied
}
fn name_equal(e: &DriverNameEntry, key: &&str) -> bool {
    e.occupied && e.name == Some(*key)
}
fn name_mark<'a>(e: &mut DriverNameEntry<'a>, key: &&'a str) {
    e.occupied = true;
    e.name = Some(*key);
}
fn name_get_key<'a>(e: &DriverNameEntry<'a>) -> &'a str {
    e.name.expect("rehashing only visits occupied entries")
}

fn route_occupied(e: &RouteEntry) -> bool {
    e.occupied
}
fn route_equal(e: &RouteEntry, key: &u32) -> bool {
    e.occupied && e.route_id == *key
}
fn route_mark(e: &mut RouteEntry, key: &u32) {
    e.occupied = true;
    e.route_id = *key;
    e.seen_drivers.clear();
}
fn route_get_key(e: &RouteEntry) -> u32 {
    e.route_id
}

fn cmp_driver_stat(a: &DriverStat, query: &(u32, &str)) -> std::cmp::Ordering {
    a.route_count.cmp(&query.0).then_with(|| a.name.cmp(query.1))
}

/// Runs the D1 pipeline over `stream`, writing `<driver>;<route_count>\n`
/// for the top 10 drivers to `out`.
pub fn run(stream: &mut RouteStream, out: &mut impl Write) -> Result<(), IoError> {
    let names_arena = Arena::with_block_size(256 * 1024);
    let sort_arena = Arena::with_block_size(128 * 1024);

    let mut driver_names: Map<DriverNameEntry> = Map::new(4096, 0.75);
    let mut driver_stats: Vec<DriverStat> = Vec::new();
    let mut partitioner: Partitioner<StepPart> = Partitioner::new(NUM_PARTITIONS, PARTITION_BLOCK);

    // Phase 1: register every driver under a dense id, and shuffle compact
    // (route_id, driver_id) pairs into partitions for cache-local Phase 2.
    timed_phase("d1::ingest", || {
        while let Some(step) = stream.read(fields::ROUTE_ID | fields::DRIVER_NAME) {
            let driver_id = match driver_names.lookup(&step.driver_name, hash_str, name_occupied, name_equal) {
                Some(entry) => entry.id,
                None => {
                    let interned = names_arena.alloc_str(step.driver_name);
                    let id = driver_stats.len() as u32;
                    driver_stats.push(DriverStat {
                        name: interned,
                        route_count: 0,
                    });
                    let entry = driver_names.insert(&interned, hash_str, name_occupied, name_equal, name_mark, name_get_key);
                    entry.id = id;
                    id
                }
            };
            partitioner.add(step.route_id, StepPart { route_id: step.route_id, driver_id });
        }

        // Phase 2: walk each partition, crediting a driver's route_count the
        // first time it's seen for a given route_id, then clearing the route
        // map so memory stays bounded by one partition's worth of routes.
        let mut routes: Map<RouteEntry> = Map::new(8192, 0.25);
        for p in 0..partitioner.num_partitions() {
            for part in partitioner.partition(p) {
                if routes.lookup(&part.route_id, hash_u32, route_occupied, route_equal).is_none() {
                    routes.insert(&part.route_id, hash_u32, route_occupied, route_equal, route_mark, route_get_key);
                }
                let route = routes
                    .lookup_mut(&part.route_id, hash_u32, route_occupied, route_equal)
                    .expect("just inserted or already present");
                if !route.seen_drivers.contains(&part.driver_id) {
                    route.seen_drivers.push(part.driver_id);
                    driver_stats[part.driver_id as usize].route_count += 1;
                }
            }
            routes.clear(None);
        }
    });

    // Phase 3: rank by (route_count desc, name asc) and extract the top 10.
    let mut sorted: Avl<DriverStat> = Avl::new();
    timed_phase("d1::rank", || {
        for stat in &driver_stats {
            sorted.insert(
                cmp_driver_stat,
                &(stat.route_count, stat.name),
                |_| DriverStat {
                    name: sort_arena.alloc_str(stat.name),
                    route_count: stat.route_count,
                },
            );
        }
    });

    timed_phase("d1::extract", || {
        avl::reverse_in_order_take(&sorted, TOP_K, |stat| {
            let _ = write_line(out, &format!("{};{}", stat.name, stat.route_count));
        });
    });

    finish(stream)
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
    fn counts_distinct_routes_per_driver() {
        let mut s = stream_from(
            "a;b;c;d;e;f\n1;1;X;Y;10;A\n1;2;Y;Z;5;A\n2;1;X;Y;2;B\n2;2;Y;X;2;A\n",
        );
        let mut out = Vec::new();
        run(&mut s, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "A;2\nB;1\n");
    }

    #[test]
    fn same_driver_twice_on_one_route_counts_once() {
        let mut s = stream_from("a;b;c;d;e;f\n1;1;X;Y;1;A\n1;2;Y;Z;1;A\n1;3;Z;W;1;A\n");
        let mut out = Vec::new();
        run(&mut s, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "A;1\n");
    }
}
