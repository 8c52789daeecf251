//! The partitioner: buckets copied elements by `key & (num_partitions - 1)`
//! into append-only, block-chunked lists, so a later full scan of one
//! partition only ever touches items sharing that bucket.
//!
//! `original_source/progc/src/partition.h` implements each partition as a
//! linked list of fixed-size raw byte blocks (`PartDataList`), appended to
//! with `memcpy`, and iterated with a macro pair that walks the block list
//! and then the elements within each block. Rust already gives us a typed,
//! growable contiguous block (`Vec<T>`) with none of the raw-pointer
//! bookkeeping the C macros need for the "does this element fit before the
//! end of this block" check, so a partition here is simply a list of
//! bounded `Vec<T>` blocks — same chunking, same cache-locality intent, no
//! `unsafe`.
//!
//! Same key always lands in the same partition: bucketing is a pure
//! function of `key`, independent of insertion order or history.

/// One bucket: a sequence of element blocks, each holding up to
/// `block_capacity` elements. Appending pushes to the last block while it
/// has room, otherwise starts a new one.
struct Partition<T> {
    blocks: Vec<Vec<T>>,
}

impl<T> Partition<T> {
    fn new(block_capacity: usize) -> Self {
        Partition {
            blocks: vec![Vec::with_capacity(block_capacity)],
        }
    }

    fn push(&mut self, block_capacity: usize, value: T) {
        let last = self.blocks.last_mut().expect("partition always has at least one block");
        if last.len() == block_capacity {
            self.blocks.push(Vec::with_capacity(block_capacity));
        }
        self.blocks
            .last_mut()
            .expect("just ensured room")
            .push(value);
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        self.blocks.iter().flat_map(|block| block.iter())
    }
}

/// Buckets elements of type `T` by an integer key, trading the up-front
/// cost of copying every element out of the stream for much better cache
/// locality on the later per-key aggregation pass.
pub struct Partitioner<T> {
    partitions: Vec<Partition<T>>,
    block_capacity: usize,
    num_steps: u64,
}

impl<T> Partitioner<T> {
    /// Creates a partitioner with `num_partitions` buckets (must be a power
    /// of two) and `block_capacity` elements per allocated block.
    pub fn new(num_partitions: u32, block_capacity: usize) -> Self {
        assert!(
            num_partitions > 0 && (num_partitions & (num_partitions - 1)) == 0,
            "number of partitions must be a power of two"
        );
        assert!(block_capacity > 0, "block capacity must be positive");

        Partitioner {
            partitions: (0..num_partitions).map(|_| Partition::new(block_capacity)).collect(),
            block_capacity,
            num_steps: 0,
        }
    }

    /// Copies `value` into the partition selected by `key`.
    pub fn add(&mut self, key: u32, value: T) {
        let mask = self.partitions.len() as u32 - 1;
        let idx = (key & mask) as usize;
        self.partitions[idx].push(self.block_capacity, value);
        self.num_steps += 1;
    }

    pub fn num_partitions(&self) -> u32 {
        self.partitions.len() as u32
    }

    pub fn num_steps(&self) -> u64 {
        self.num_steps
    }

    /// Iterates one partition's elements, in insertion order within that
    /// partition.
    pub fn partition(&self, index: u32) -> impl Iterator<Item = &T> {
        self.partitions[index as usize].iter()
    }

    /// Iterates every element across every partition (bucket by bucket),
    /// for the common "run one pass over everything, partition by
    /// partition" aggregation shape every computation uses.
    pub fn iter_all(&self) -> impl Iterator<Item = &T> {
        self.partitions.iter().flat_map(|p| p.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_always_lands_in_same_partition() {
        let mut p: Partitioner<u32> = Partitioner::new(8, 4);
        for round in 0..5u32 {
            p.add(17, round);
        }
        let bucket = 17 & 7;
        let others: u32 = (0..8).filter(|&i| i != bucket).map(|i| p.partition(i).count() as u32).sum();
        assert_eq!(others, 0);
        assert_eq!(p.partition(bucket).count(), 5);
    }

    #[test]
    fn spills_across_multiple_blocks() {
        let mut p: Partitioner<u32> = Partitioner::new(1, 4);
        for v in 0..50u32 {
            p.add(0, v);
        }
        let collected: Vec<u32> = p.partition(0).copied().collect();
        assert_eq!(collected, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn iter_all_visits_every_element_exactly_once() {
        let mut p: Partitioner<u32> = Partitioner::new(16, 8);
        for v in 0..1000u32 {
            p.add(v.wrapping_mul(2654435761), v);
        }
        let mut seen: Vec<u32> = p.iter_all().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..1000).collect::<Vec<_>>());
        assert_eq!(p.num_steps(), 1000);
    }

    proptest::proptest! {
        #[test]
        fn bucketing_is_a_pure_function_of_key(keys in proptest::collection::vec(0u32..10_000, 0..500)) {
            let mut p: Partitioner<u32> = Partitioner::new(32, 16);
            for &k in &keys {
                p.add(k, k);
            }
            let mask = p.num_partitions() - 1;
            for i in 0..p.num_partitions() {
                for &v in p.partition(i).collect::<Vec<_>>() {
                    proptest::prop_assert_eq!(v & mask, i);
                }
            }
        }
    }
}
