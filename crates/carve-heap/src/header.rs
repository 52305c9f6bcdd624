//! The arena header stored at offset 0.
//!
//! Three words: the region length fixed at initialization, the active
//! fit strategy's tag, and the offset of the first free block (`0` when
//! the arena is fully occupied). The region is always at least
//! [`MIN_REGION_SIZE`](carve_core::layout::MIN_REGION_SIZE) bytes once a
//! heap exists, so the header words themselves are always in bounds.

use carve_core::layout::{is_aligned, HEADER_SIZE, WORD};
use carve_core::{FitStrategy, HeapError};

use crate::raw::{read_word, write_word};

pub(crate) const TOTAL_SIZE_AT: u64 = 0;
pub(crate) const STRATEGY_AT: u64 = WORD;
pub(crate) const FREE_HEAD_AT: u64 = 2 * WORD;

/// Encode an optional link as a stored word; `0` is null.
pub(crate) fn link_to_word(link: Option<u64>) -> u64 {
    link.unwrap_or(0)
}

/// Decode a stored link word.
pub(crate) fn link_from_word(word: u64) -> Option<u64> {
    (word != 0).then_some(word)
}

/// Decoded form of the header words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ArenaHeader {
    pub total_size: u64,
    pub strategy: FitStrategy,
    pub free_head: Option<u64>,
}

impl ArenaHeader {
    /// Decode and sanity-check the header of `bytes`.
    pub fn load(bytes: &[u8]) -> Result<Self, HeapError> {
        let total_size = read_word(bytes, TOTAL_SIZE_AT)?;
        let tag = read_word(bytes, STRATEGY_AT)?;
        let strategy = FitStrategy::from_tag(tag)
            .ok_or_else(|| HeapError::corrupted(STRATEGY_AT, format!("unknown strategy tag {tag}")))?;
        let free_head = free_head(bytes)?;
        Ok(Self {
            total_size,
            strategy,
            free_head,
        })
    }

    pub fn store(&self, bytes: &mut [u8]) -> Result<(), HeapError> {
        write_word(bytes, TOTAL_SIZE_AT, self.total_size)?;
        write_word(bytes, STRATEGY_AT, self.strategy.tag())?;
        write_word(bytes, FREE_HEAD_AT, link_to_word(self.free_head))
    }
}

/// Offset of the first free block, validated to be a plausible block offset.
pub(crate) fn free_head(bytes: &[u8]) -> Result<Option<u64>, HeapError> {
    let head = link_from_word(read_word(bytes, FREE_HEAD_AT)?);
    match head {
        Some(offset) if offset < HEADER_SIZE || !is_aligned(offset) => Err(HeapError::corrupted(
            FREE_HEAD_AT,
            format!("free-list head {offset:#x} is not a block offset"),
        )),
        _ => Ok(head),
    }
}

pub(crate) fn set_free_head(bytes: &mut [u8], head: Option<u64>) -> Result<(), HeapError> {
    write_word(bytes, FREE_HEAD_AT, link_to_word(head))
}

pub(crate) fn set_strategy(bytes: &mut [u8], strategy: FitStrategy) -> Result<(), HeapError> {
    write_word(bytes, STRATEGY_AT, strategy.tag())
}
