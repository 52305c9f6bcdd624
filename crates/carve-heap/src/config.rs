//! Heap configuration parameters.

use carve_core::layout::{ALIGN, FREE_METADATA};
use carve_core::FitStrategy;

/// Configuration for a [`Heap`](crate::Heap).
///
/// Plain values with no cross-field constraints; any combination is
/// accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
    /// Search policy for `allocate`. Can be changed later with
    /// [`Heap::set_strategy`](crate::Heap::set_strategy).
    ///
    /// Default: [`FitStrategy::FirstFit`].
    pub strategy: FitStrategy,

    /// Smallest usable size a free remainder must have for `allocate`
    /// (or an in-place `resize`) to split it off as its own block.
    /// Smaller remainders are granted to the occupied block instead.
    /// Values below one alignment unit act as one alignment unit, so a
    /// split never leaves a free block with no usable bytes.
    ///
    /// Default: 8 bytes (one alignment unit).
    pub min_split_payload: u64,
}

impl HeapConfig {
    /// Default fit strategy.
    pub const DEFAULT_STRATEGY: FitStrategy = FitStrategy::FirstFit;

    /// Default minimum payload for a split-off free block.
    pub const DEFAULT_MIN_SPLIT_PAYLOAD: u64 = ALIGN;

    /// Create a config with default values.
    pub fn new() -> Self {
        Self {
            strategy: Self::DEFAULT_STRATEGY,
            min_split_payload: Self::DEFAULT_MIN_SPLIT_PAYLOAD,
        }
    }

    /// Use `strategy` for allocations.
    pub fn with_strategy(mut self, strategy: FitStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the split floor.
    pub fn with_min_split_payload(mut self, bytes: u64) -> Self {
        self.min_split_payload = bytes;
        self
    }

    /// Smallest leftover span (metadata included) worth turning into a
    /// free block.
    pub fn split_threshold(&self) -> u64 {
        FREE_METADATA.saturating_add(self.min_split_payload.max(ALIGN))
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::new()
    }
}
