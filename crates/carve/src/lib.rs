//! Carve: a free-list arena allocator over one caller-provided byte region.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Carve sub-crates. For most users, adding `carve` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use carve::prelude::*;
//!
//! // Any byte buffer works; the heap keeps all metadata inside it.
//! let config = HeapConfig::new().with_strategy(FitStrategy::BestFit);
//! let mut heap = Heap::init(vec![0u8; 4096], config).unwrap();
//!
//! let a = heap.allocate(100).unwrap();
//! let b = heap.allocate(300).unwrap();
//! heap.bytes_mut(a).unwrap()[..5].copy_from_slice(b"hello");
//! heap.free(b).unwrap();
//!
//! let a = heap.resize(a, 200).unwrap();
//! assert_eq!(&heap.bytes(a).unwrap()[..5], b"hello");
//! assert!(heap.block_size(a).unwrap() >= 200);
//!
//! for block in heap.blocks() {
//!     println!("{:#06x} {:>5} {}", block.offset, block.size, block.state);
//! }
//! println!("{}", carve::dump::render(&heap));
//! assert_eq!(heap.check().unwrap().occupied_blocks, 1);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `carve-core` | Layout constants, pointers, block descriptors, errors, `BlockWalk` |
//! | [`heap`] | `carve-heap` | The `Heap` engine, configuration and statistics |
//! | [`dump`] | `carve-dump` | Text listings and occupancy maps |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, layout constants and traits (`carve-core`).
///
/// The on-arena layout lives in [`types::layout`]; the
/// [`types::BlockWalk`] trait is what debug tooling consumes.
pub use carve_core as types;

/// The allocator engine (`carve-heap`).
///
/// [`heap::Heap`] manages a region; [`heap::HeapConfig`] picks the fit
/// strategy and split floor; [`heap::HeapStats`] summarizes occupancy.
pub use carve_heap as heap;

/// Debug rendering (`carve-dump`).
///
/// [`dump::render`] lists every block; [`dump::render_map`] draws an
/// occupancy map.
pub use carve_dump as dump;

/// Common imports for typical Carve usage.
///
/// ```rust
/// use carve::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use carve_core::{BlockInfo, BlockPtr, BlockState, BlockWalk, FitStrategy, HeapError};

    // Engine
    pub use carve_heap::{Blocks, Heap, HeapConfig, HeapStats};
}
