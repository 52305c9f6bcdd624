//! Walk-through of the classic allocator scenarios.
//!
//! Runs each scenario on a fresh 2 KiB arena and prints the resulting
//! block listing. Set `RUST_LOG=carve_heap=trace` to watch every
//! allocate, free and resize as it happens.

use carve_dump::{Dump, DumpOptions};
use carve_heap::{FitStrategy, Heap, HeapConfig, HeapError};
use tracing::info;
use tracing_subscriber::EnvFilter;

const ARENA_BYTES: usize = 2048;

type Scenario = fn(&mut Heap<Vec<u8>>) -> Result<(), HeapError>;

fn four_blocks(heap: &mut Heap<Vec<u8>>) -> Result<[carve_heap::BlockPtr; 4], HeapError> {
    Ok([
        heap.allocate(256)?,
        heap.allocate(512)?,
        heap.allocate(128)?,
        heap.allocate(1024)?,
    ])
}

fn four_allocations(heap: &mut Heap<Vec<u8>>) -> Result<(), HeapError> {
    four_blocks(heap).map(drop)
}

fn free_second(heap: &mut Heap<Vec<u8>>) -> Result<(), HeapError> {
    let p = four_blocks(heap)?;
    heap.free(p[1])
}

fn free_adjacent_middle(heap: &mut Heap<Vec<u8>>) -> Result<(), HeapError> {
    let p = four_blocks(heap)?;
    heap.free(p[1])?;
    heap.free(p[2])
}

fn free_first_two(heap: &mut Heap<Vec<u8>>) -> Result<(), HeapError> {
    let p = four_blocks(heap)?;
    heap.free(p[0])?;
    heap.free(p[1])
}

fn free_last_two(heap: &mut Heap<Vec<u8>>) -> Result<(), HeapError> {
    let p = four_blocks(heap)?;
    heap.free(p[2])?;
    heap.free(p[3])
}

fn free_all_in_order(heap: &mut Heap<Vec<u8>>) -> Result<(), HeapError> {
    four_blocks(heap)?
        .into_iter()
        .try_for_each(|ptr| heap.free(ptr))
}

fn free_all_out_of_order(heap: &mut Heap<Vec<u8>>) -> Result<(), HeapError> {
    let p = four_blocks(heap)?;
    [p[2], p[0], p[1], p[3]]
        .into_iter()
        .try_for_each(|ptr| heap.free(ptr))
}

fn reuse_freed_block(heap: &mut Heap<Vec<u8>>) -> Result<(), HeapError> {
    let first = heap.allocate(1024)?;
    heap.allocate(256)?;
    heap.free(first)?;
    heap.allocate(512).map(drop)
}

fn refill_freed_block(heap: &mut Heap<Vec<u8>>) -> Result<(), HeapError> {
    let first = heap.allocate(1024)?;
    heap.allocate(256)?;
    heap.free(first)?;
    heap.allocate(1016).map(drop)
}

fn oversized_request(heap: &mut Heap<Vec<u8>>) -> Result<(), HeapError> {
    heap.allocate(2048).map(drop)
}

const SCENARIOS: [(&str, Scenario); 10] = [
    ("four allocations", four_allocations),
    ("free the second block", free_second),
    ("free two adjacent middle blocks", free_adjacent_middle),
    ("free the first two blocks", free_first_two),
    ("free the last two blocks", free_last_two),
    ("free everything in order", free_all_in_order),
    ("free everything out of order", free_all_out_of_order),
    ("reuse a freed block for a smaller request", reuse_freed_block),
    ("refill a freed block to capacity", refill_freed_block),
    ("request more than the arena holds", oversized_request),
];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Carve Allocator Scenarios ===\n");

    for (i, (name, run)) in SCENARIOS.into_iter().enumerate() {
        let mut heap = Heap::init(
            vec![0u8; ARENA_BYTES],
            HeapConfig::new().with_strategy(FitStrategy::FirstFit),
        )
        .expect("2 KiB region is valid");

        println!("Scenario {i:02}: {name}");
        match run(&mut heap) {
            Ok(()) => info!(scenario = i, "completed"),
            Err(e) => println!("  rejected: {e}"),
        }
        let options = DumpOptions::new().with_map(64);
        println!("{}", Dump::with_options(&heap, options));
    }

    println!("=== Done ===");
}
