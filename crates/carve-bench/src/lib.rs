//! Workload generation for benchmarking Carve heaps.
//!
//! - [`churn_trace`]: a seeded, reproducible mix of allocate / free /
//!   resize operations described by a [`ChurnProfile`].
//! - [`replay`]: run a trace against any heap and tally the outcome.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use carve_core::{BlockPtr, HeapError};
use carve_heap::{Heap, HeapStats};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// One step of a workload. Slots index the live allocations at replay
/// time, modulo their count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Allocate `size` bytes.
    Allocate {
        /// Requested bytes.
        size: u64,
    },
    /// Free a live allocation.
    Free {
        /// Live-allocation index.
        slot: usize,
    },
    /// Resize a live allocation to `size` bytes.
    Resize {
        /// Live-allocation index.
        slot: usize,
        /// New requested bytes.
        size: u64,
    },
}

/// Shape of a generated workload.
#[derive(Clone, Debug)]
pub struct ChurnProfile {
    /// Number of operations.
    pub ops: usize,
    /// Smallest request size.
    pub min_size: u64,
    /// Largest request size.
    pub max_size: u64,
    /// Percentage of operations that free.
    pub free_percent: u64,
    /// Percentage of operations that resize.
    pub resize_percent: u64,
}

impl ChurnProfile {
    /// Small requests, mostly allocate/free, some resizes.
    pub fn small_objects(ops: usize) -> Self {
        Self {
            ops,
            min_size: 8,
            max_size: 256,
            free_percent: 40,
            resize_percent: 10,
        }
    }

    /// Wide size spread that fragments the arena quickly.
    pub fn mixed(ops: usize) -> Self {
        Self {
            ops,
            min_size: 8,
            max_size: 4096,
            free_percent: 45,
            resize_percent: 15,
        }
    }
}

/// Generate a reproducible trace for `profile` from `seed`.
pub fn churn_trace(profile: &ChurnProfile, seed: u64) -> Vec<Op> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let span = profile.max_size.saturating_sub(profile.min_size) + 1;
    let size = |rng: &mut ChaCha8Rng| profile.min_size + rng.next_u64() % span;

    (0..profile.ops)
        .map(|_| {
            let roll = rng.next_u64() % 100;
            let slot = rng.next_u64() as usize;
            if roll < profile.free_percent {
                Op::Free { slot }
            } else if roll < profile.free_percent + profile.resize_percent {
                Op::Resize {
                    slot,
                    size: size(&mut rng),
                }
            } else {
                Op::Allocate {
                    size: size(&mut rng),
                }
            }
        })
        .collect()
}

/// Tally of a [`replay`] run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayOutcome {
    /// Successful allocations.
    pub allocated: usize,
    /// Successful frees.
    pub freed: usize,
    /// Successful resizes.
    pub resized: usize,
    /// Allocations and resizes rejected for lack of space.
    pub exhausted: usize,
    /// Occupancy after the last operation.
    pub stats: HeapStats,
}

/// Run `trace` against `heap`. Allocations still live at the end are
/// left in place.
///
/// # Errors
///
/// Any error other than [`HeapError::CapacityExhausted`], which would
/// mean the heap itself misbehaved.
pub fn replay<B: AsRef<[u8]> + AsMut<[u8]>>(
    heap: &mut Heap<B>,
    trace: &[Op],
) -> Result<ReplayOutcome, HeapError> {
    let mut live: Vec<BlockPtr> = Vec::new();
    let mut outcome = ReplayOutcome::default();

    for op in trace {
        match *op {
            Op::Allocate { size } => match heap.allocate(size) {
                Ok(ptr) => {
                    live.push(ptr);
                    outcome.allocated += 1;
                }
                Err(HeapError::CapacityExhausted { .. }) => outcome.exhausted += 1,
                Err(e) => return Err(e),
            },
            Op::Free { slot } if !live.is_empty() => {
                let ptr = live.swap_remove(slot % live.len());
                heap.free(ptr)?;
                outcome.freed += 1;
            }
            Op::Resize { slot, size } if !live.is_empty() => {
                let slot = slot % live.len();
                match heap.resize(live[slot], size) {
                    Ok(ptr) => {
                        live[slot] = ptr;
                        outcome.resized += 1;
                    }
                    Err(HeapError::CapacityExhausted { .. }) => outcome.exhausted += 1,
                    Err(e) => return Err(e),
                }
            }
            Op::Free { .. } | Op::Resize { .. } => {}
        }
    }
    outcome.stats = heap.stats();
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carve_core::FitStrategy;
    use carve_heap::HeapConfig;
    use carve_test_utils::assert_invariants;

    #[test]
    fn traces_are_reproducible() {
        let profile = ChurnProfile::mixed(500);
        assert_eq!(churn_trace(&profile, 7), churn_trace(&profile, 7));
        assert_ne!(churn_trace(&profile, 7), churn_trace(&profile, 8));
    }

    #[test]
    fn sizes_stay_in_range() {
        let profile = ChurnProfile::small_objects(2000);
        for op in churn_trace(&profile, 1) {
            if let Op::Allocate { size } | Op::Resize { size, .. } = op {
                assert!((8..=256).contains(&size), "{size}");
            }
        }
    }

    #[test]
    fn replay_leaves_a_consistent_heap() {
        let trace = churn_trace(&ChurnProfile::mixed(2000), 42);
        for strategy in FitStrategy::ALL {
            let config = HeapConfig::new().with_strategy(strategy);
            let mut heap = Heap::init(vec![0u8; 64 * 1024], config).unwrap();
            let outcome = replay(&mut heap, &trace).unwrap();
            assert!(outcome.allocated > 0);
            assert_eq!(assert_invariants(&heap), outcome.stats);
            assert_eq!(
                outcome.stats.occupied_blocks,
                outcome.allocated - outcome.freed
            );
        }
    }
}
