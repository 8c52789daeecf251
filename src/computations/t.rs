//! T — top 10 towns by distinct-route passage count, grounded
//! on `computation_t_ex.c`.
//!
//! Towns get a dense `u32` id the first time they're seen (`registerTown`),
//! backed by a side array of stats indexed by that id (`TownStatsArray`).
//! Per-route "have we already counted this town" tracking uses a small
//! `Vec<u32>` of town ids per route (`TownNodeList`'s role), cleared
//! between partitions exactly like D1's route map.

use std::cmp::Ordering;
use std::io::Write;

use crate::arena::Arena;
use crate::avl::{self, Avl};
use crate::error::IoError;
use crate::logging::timed_phase;
use crate::map::{fnv1a, Map};
use crate::partition::Partitioner;
use crate::stream::{fields, RouteStream};

use super::{finish, write_line};

const TOP_K: usize = 10;
const NUM_PARTITIONS: u32 = 128;
const PARTITION_BLOCK: usize = 65536;

#[derive(Clone, Default)]
struct TownNameEntry<'a> {
    occupied: bool,
    name: Option<&'a str>,
    id: u32,
}

#[derive(Clone, Default)]
struct RouteEntry {
    occupied: bool,
    route_id: u32,
    seen_towns: Vec<u32>,
}

struct TownStat<'a> {
    name: &'a str,
    passed: u32,
    first_town: u32,
}

struct TownSort<'a> {
    name: &'a str,
    passed: u32,
}

#[derive(Clone, Copy)]
struct StepPart {
    route_id: u32,
    town_a: u32,
    town_b: u32,
}

fn hash_u32(key: &u32, capacity: u32) -> u32 {
    key.wrapping_mul(2_654_435_769) >> (32 - capacity.trailing_zeros())
}
fn hash_str(key: &&str, _capacity: u32) -> u32 {
    fnv1a(key.as_bytes())
}

fn name_occupied(e: &TownNameEntry) -> bool {
    e.occupied
}
fn name_equal(e: &TownNameEntry, key: &&str) -> bool {
    e.occupied && e.name == Some(*key)
}
fn name_mark<'a>(e: &mut TownNameEntry<'a>, key: &&'a str) {
    e.occupied = true;
    e.name = Some(*key);
}
fn name_get_key<'a>(e: &TownNameEntry<'a>) -> &'a str {
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
    e.seen_towns.clear();
}
fn route_get_key(e: &RouteEntry) -> u32 {
    e.route_id
}

/// Orders by `(passed, name)` ascending-on-name, descending-on-passed —
/// `townSortAVLComparePassed`'s tie-break.
fn cmp_by_passed(a: &TownSort, query: &(u32, &str)) -> Ordering {
    a.passed.cmp(&query.0).then_with(|| a.name.cmp(query.1))
}

fn cmp_by_name<'a>(a: &&'a str, query: &&'a str) -> Ordering {
    a.cmp(query)
}

/// Registers `name` under a dense id if unseen, returning its id.
fn register_town<'a>(
    names: &mut Map<TownNameEntry<'a>>,
    stats: &mut Vec<TownStat<'a>>,
    names_arena: &'a Arena,
    name: &str,
) -> u32 {
    if let Some(entry) = names.lookup(&name, hash_str, name_occupied, name_equal) {
        return entry.id;
    }
    let interned = names_arena.alloc_str(name);
    let id = stats.len() as u32;
    stats.push(TownStat { name: interned, passed: 0, first_town: 0 });
    let entry = names.insert(&interned, hash_str, name_occupied, name_equal, name_mark, name_get_key);
    entry.id = id;
    id
}

/// Runs the T pipeline, writing `<town>;<passed>;<first_town>\n` for the
/// top 10 towns by distinct-route passage count, printed in town-name
/// order.
pub fn run(stream: &mut RouteStream, out: &mut impl Write) -> Result<(), IoError> {
    let names_arena = Arena::with_block_size(512 * 1024);
    let sort_arena = Arena::with_block_size(256 * 1024);

    let mut town_names: Map<TownNameEntry> = Map::new(8192, 0.5);
    let mut town_stats: Vec<TownStat> = Vec::new();
    let mut partitioner: Partitioner<StepPart> = Partitioner::new(NUM_PARTITIONS, PARTITION_BLOCK);

    timed_phase("t::ingest", || {
        while let Some(step) =
            stream.read(fields::ROUTE_ID | fields::STEP_ID | fields::TOWN_A | fields::TOWN_B)
        {
            let town_a = register_town(&mut town_names, &mut town_stats, &names_arena, step.town_a);
            let town_b = register_town(&mut town_names, &mut town_stats, &names_arena, step.town_b);
            if step.step_id == 1 {
                town_stats[town_a as usize].first_town += 1;
            }
            partitioner.add(step.route_id, StepPart { route_id: step.route_id, town_a, town_b });
        }

        let mut routes: Map<RouteEntry> = Map::new(8192, 0.25);
        for p in 0..partitioner.num_partitions() {
            for part in partitioner.partition(p) {
                if routes.lookup(&part.route_id, hash_u32, route_occupied, route_equal).is_none() {
                    routes.insert(&part.route_id, hash_u32, route_occupied, route_equal, route_mark, route_get_key);
                }
                let route = routes
                    .lookup_mut(&part.route_id, hash_u32, route_occupied, route_equal)
                    .expect("just inserted or already present");

                for &town_id in &[part.town_a, part.town_b] {
                    if !route.seen_towns.contains(&town_id) {
                        route.seen_towns.push(town_id);
                        town_stats[town_id as usize].passed += 1;
                    }
                }
            }
            routes.clear(None);
        }
    });

    let mut by_name: Avl<&str> = Avl::new();
    timed_phase("t::rank", || {
        let mut by_passed: Avl<TownSort> = Avl::new();
        for stat in &town_stats {
            by_passed.insert(cmp_by_passed, &(stat.passed, stat.name), |_| TownSort {
                name: stat.name,
                passed: stat.passed,
            });
        }

        avl::reverse_in_order_take(&by_passed, TOP_K, |sort| {
            by_name.insert(cmp_by_name, &sort.name, |name| sort_arena.alloc_str(name));
        });
    });

    timed_phase("t::extract", || {
        avl::in_order(&by_name, |name| {
            let stat = town_stats.iter().find(|s| s.name == *name).expect("name came from town_stats");
            let _ = write_line(out, &format!("{};{};{}", stat.name, stat.passed, stat.first_town));
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
    fn counts_distinct_route_passages_and_first_towns() {
        let mut s = stream_from("a;b;c;d;e;f\n1;1;X;Y;3;A\n1;2;Y;Z;3;A\n2;1;Y;W;4;B\n");
        let mut out = Vec::new();
        run(&mut s, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Y;2;1\nW;1;0\nX;1;1\nZ;1;0\n");
    }

    #[test]
    fn town_seen_twice_in_one_route_counts_once() {
        let mut s = stream_from("a;b;c;d;e;f\n1;1;X;Y;1;A\n1;2;Y;X;1;A\n");
        let mut out = Vec::new();
        run(&mut s, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "X;1;1\nY;1;0\n");
    }
}
