//! Free-list allocator engine for Carve.
//!
//! A [`Heap`] manages one caller-provided byte region. All bookkeeping
//! lives inside that region: a fixed header at offset 0 followed by a
//! tiling of free and occupied blocks, each self-described by the words
//! in front of its payload. Free blocks are chained in ascending address
//! order; occupied blocks are tracked only by the caller's [`BlockPtr`].
//!
//! # Architecture
//!
//! ```text
//! Heap<B: AsRef<[u8]> + AsMut<[u8]>>
//! ├── header    ArenaHeader (total_size, strategy tag, free-list head)
//! ├── block     BlockHeader codec (tagged size word, optional next link)
//! ├── walk      Blocks (every block) + FreeChain (free list only)
//! ├── strategy  first/best/worst fit over the free chain
//! ├── alloc     allocate (fit + split), free (coalesce), resize
//! └── check     structural validation + HeapStats
//! ```
//!
//! Addresses are byte offsets, never raw pointers, and every traversal
//! is bounds-checked against the region length. This crate contains no
//! `unsafe` code.
//!
//! # Example
//!
//! ```
//! use carve_heap::{FitStrategy, Heap};
//!
//! let mut heap = Heap::new(vec![0u8; 2048]).unwrap();
//! heap.set_strategy(FitStrategy::BestFit);
//!
//! let ptr = heap.allocate(256).unwrap();
//! heap.bytes_mut(ptr).unwrap()[..5].copy_from_slice(b"carve");
//! let ptr = heap.resize(ptr, 512).unwrap();
//! assert_eq!(&heap.bytes(ptr).unwrap()[..5], b"carve");
//! heap.free(ptr).unwrap();
//! assert_eq!(heap.stats().free_blocks, 1);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod alloc;
mod block;
mod check;
pub mod config;
mod header;
pub mod heap;
mod raw;
pub mod stats;
mod strategy;
pub mod walk;

pub use carve_core::{BlockInfo, BlockPtr, BlockState, BlockWalk, FitStrategy, HeapError};
pub use config::HeapConfig;
pub use heap::Heap;
pub use stats::HeapStats;
pub use walk::Blocks;
