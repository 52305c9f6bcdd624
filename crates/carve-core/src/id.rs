//! Strongly-typed block pointers.

use std::fmt;

use crate::layout::OCCUPIED_METADATA;

/// Address of an allocation's payload, as a byte offset into the arena.
///
/// Returned by `allocate` and `resize`; the caller hands it back to
/// `free`, `resize` and `block_size`. The block's own metadata sits
/// [`OCCUPIED_METADATA`] bytes before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPtr(pub u64);

impl BlockPtr {
    /// Byte offset of the payload within the arena.
    pub fn offset(self) -> u64 {
        self.0
    }

    /// Offset of the owning block's metadata, if the pointer is not
    /// too close to the start of the arena to have any.
    pub fn block_offset(self) -> Option<u64> {
        self.0.checked_sub(OCCUPIED_METADATA)
    }
}

impl fmt::Display for BlockPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

impl From<u64> for BlockPtr {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_offset_steps_back_over_metadata() {
        assert_eq!(BlockPtr(32).block_offset(), Some(24));
        assert_eq!(BlockPtr(4).block_offset(), None);
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(BlockPtr(32).to_string(), "0x0020");
    }
}
