//! Core types and traits for the Carve arena allocator.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the engine, the debug dump, and the C ABI:
//! block pointers, the on-arena layout constants, fit strategies, block
//! descriptors, error types, and the block-walking trait.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod error;
pub mod id;
pub mod layout;
pub mod strategy;
pub mod traits;

pub use block::{BlockInfo, BlockState};
pub use error::HeapError;
pub use id::BlockPtr;
pub use strategy::FitStrategy;
pub use traits::BlockWalk;
