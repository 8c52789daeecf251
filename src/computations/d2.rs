//! D2 — top 10 drivers by total distance driven, grounded on
//! `computation_d2_ex.c`. No partitioning: driver cardinality is low
//! enough that a single open-addressed map absorbs the whole ingest pass.

use std::io::Write;

use crate::arena::Arena;
use crate::avl::{self, Avl};
use crate::error::IoError;
use crate::logging::timed_phase;
use crate::map::{fnv1a, Map};
use crate::stream::{fields, RouteStream};

use super::{finish, write_line};

const TOP_K: usize = 10;

#[derive(Clone, Default)]
struct DriverEntry<'a> {
    occupied: bool,
    name: Option<&'a str>,
    dist: f32,
}

struct DriverSort<'a> {
    name: &'a str,
    dist: f32,
}

fn hash_str(key: &&str, _capacity: u32) -> u32 {
    fnv1a(key.as_bytes())
}
fn occupied(e: &DriverEntry) -> bool {
    e.occupied
}
fn key_equal(e: &DriverEntry, key: &&str) -> bool {
    e.occupied && e.name == Some(*key)
}
fn mark_occupied<'a>(e: &mut DriverEntry<'a>, key: &&'a str) {
    e.occupied = true;
    e.name = Some(*key);
    e.dist = 0.0;
}
fn get_key<'a>(e: &DriverEntry<'a>) -> &'a str {
    e.name.expect("rehashing only visits occupied entries")
}

/// Orders by `(total_distance, name)` descending, matching
/// `driverSortAVLCompare`'s `dist` then `strcmp(name)` tie-break.
fn cmp_driver_sort(a: &DriverSort, query: &(f32, &str)) -> std::cmp::Ordering {
    a.dist
        .partial_cmp(&query.0)
        .expect("distances are always finite")
        .then_with(|| a.name.cmp(query.1))
}

/// Runs the D2 pipeline, writing `<driver>;<total_distance>\n` for the top
/// 10 drivers by total distance to `out`, float fields formatted to six
/// decimal places, matching the original's `%f` convention.
pub fn run(stream: &mut RouteStream, out: &mut impl Write) -> Result<(), IoError> {
    let names_arena = Arena::with_block_size(256 * 1024);
    let sort_arena = Arena::with_block_size(128 * 1024);

    let mut drivers: Map<DriverEntry> = Map::new(4096, 0.75);

    timed_phase("d2::ingest", || {
        while let Some(step) = stream.read(fields::DRIVER_NAME | fields::DISTANCE) {
            if drivers.lookup(&step.driver_name, hash_str, occupied, key_equal).is_none() {
                let interned = names_arena.alloc_str(step.driver_name);
                drivers.insert(&interned, hash_str, occupied, key_equal, mark_occupied, get_key);
            }
            let entry = drivers
                .lookup_mut(&step.driver_name, hash_str, occupied, key_equal)
                .expect("just inserted or already present");
            entry.dist += step.distance;
        }
    });

    let mut sorted: Avl<DriverSort> = Avl::new();
    timed_phase("d2::rank", || {
        for entry in drivers.iter().filter(|e| e.occupied) {
            let name = entry.name.expect("occupied entry always has a name");
            sorted.insert(cmp_driver_sort, &(entry.dist, name), |_| DriverSort {
                name: sort_arena.alloc_str(name),
                dist: entry.dist,
            });
        }
    });

    timed_phase("d2::extract", || {
        avl::reverse_in_order_take(&sorted, TOP_K, |stat| {
            let _ = write_line(out, &format!("{};{:.6}", stat.name, stat.dist));
        });
    });

    finish(stream)
}
