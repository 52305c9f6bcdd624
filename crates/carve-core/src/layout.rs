//! On-arena layout constants and alignment helpers.
//!
//! The arena is a flat byte region. Every metadata word is an 8-byte
//! little-endian `u64` and every stored address is a byte offset from the
//! start of the region. Offset `0` is always the arena header, so `0`
//! doubles as the null link in the free list.
//!
//! ```text
//! offset 0                24
//! ┌──────────────────────┬──────────────┬─────────┬──────────────┬─────
//! │ header               │ size         │ payload │ size|FREE    │ next
//! │ total|strategy|head  │ (occupied)   │  ...    │ (free)       │ ...
//! └──────────────────────┴──────────────┴─────────┴──────────────┴─────
//! ```

/// Size of one metadata word in bytes.
pub const WORD: u64 = 8;

/// Alignment unit for region lengths, block offsets and payload sizes.
pub const ALIGN: u64 = WORD;

/// Size of the arena header: `total_size`, strategy tag, free-list head.
pub const HEADER_SIZE: u64 = 3 * WORD;

/// Metadata carried by an occupied block: its size word.
pub const OCCUPIED_METADATA: u64 = WORD;

/// Metadata carried by a free block: its size word and the `next` link.
pub const FREE_METADATA: u64 = 2 * WORD;

/// Bytes reclaimed as payload when a free block turns occupied.
pub const METADATA_GAP: u64 = FREE_METADATA - OCCUPIED_METADATA;

/// State bit in a block's size word; set for free blocks.
pub const FREE_FLAG: u64 = 1 << 63;

/// Largest payload size representable in a size word.
pub const MAX_BLOCK_SIZE: u64 = FREE_FLAG - 1;

/// Smallest region that can hold the header plus one (empty) free block.
pub const MIN_REGION_SIZE: u64 = HEADER_SIZE + FREE_METADATA;

/// Round `value` up to the next multiple of [`ALIGN`].
///
/// Returns `None` on overflow.
pub fn align_up(value: u64) -> Option<u64> {
    value.checked_add(ALIGN - 1).map(|v| v & !(ALIGN - 1))
}

/// Whether `value` is a multiple of [`ALIGN`].
pub fn is_aligned(value: u64) -> bool {
    value % ALIGN == 0
}
