//! Reusable arenas for scenario tests.
//!
//! - [`scenario_heap`] is the 2 KiB arena most scenarios start from.
//! - [`four_block_heap`] carves it into 256/512/128/1024-byte blocks,
//!   leaving a 56-byte free tail.

use carve_core::{BlockPtr, FitStrategy};
use carve_heap::{Heap, HeapConfig};

/// Region length used by the scenario suite.
pub const SCENARIO_TOTAL: usize = 2048;

/// A fresh 2 KiB arena using `strategy`.
pub fn scenario_heap(strategy: FitStrategy) -> Heap<Vec<u8>> {
    Heap::init(
        vec![0u8; SCENARIO_TOTAL],
        HeapConfig::new().with_strategy(strategy),
    )
    .expect("2 KiB region is valid")
}

/// A first-fit arena holding four allocations of 256, 512, 128 and
/// 1024 bytes, at payload offsets 32, 296, 816 and 952.
pub fn four_block_heap() -> (Heap<Vec<u8>>, [BlockPtr; 4]) {
    let mut heap = scenario_heap(FitStrategy::FirstFit);
    let ptrs = [256, 512, 128, 1024].map(|size| {
        heap.allocate(size)
            .expect("four blocks fit in the scenario arena")
    });
    (heap, ptrs)
}
