//! Block descriptors reported by arena walks.

use std::fmt;

use crate::id::BlockPtr;
use crate::layout::{FREE_METADATA, OCCUPIED_METADATA};

/// Whether a block is available for allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockState {
    /// On the free list; carries a size word and a `next` link.
    Free,
    /// Held by a caller; carries only a size word.
    Occupied,
}

impl BlockState {
    /// Bytes of metadata a block in this state carries.
    pub fn metadata_size(self) -> u64 {
        match self {
            Self::Free => FREE_METADATA,
            Self::Occupied => OCCUPIED_METADATA,
        }
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => f.write_str("free"),
            Self::Occupied => f.write_str("occupied"),
        }
    }
}

/// One block of the arena as seen by a walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Offset of the block's metadata within the arena.
    pub offset: u64,
    /// Usable bytes, excluding the block's own metadata.
    pub size: u64,
    /// Free or occupied.
    pub state: BlockState,
}

impl BlockInfo {
    /// Describe a free block.
    pub fn free(offset: u64, size: u64) -> Self {
        Self {
            offset,
            size,
            state: BlockState::Free,
        }
    }

    /// Describe an occupied block.
    pub fn occupied(offset: u64, size: u64) -> Self {
        Self {
            offset,
            size,
            state: BlockState::Occupied,
        }
    }

    /// Whether the block is on the free list.
    pub fn is_free(&self) -> bool {
        self.state == BlockState::Free
    }

    /// Bytes of metadata in front of the payload.
    pub fn metadata_size(&self) -> u64 {
        self.state.metadata_size()
    }

    /// Metadata plus payload: the bytes this block covers.
    pub fn span(&self) -> u64 {
        self.metadata_size() + self.size
    }

    /// Offset one past the block's last byte.
    pub fn end(&self) -> u64 {
        self.offset + self.span()
    }

    /// Address a caller would hold for this block, if it is occupied.
    pub fn ptr(&self) -> Option<BlockPtr> {
        match self.state {
            BlockState::Occupied => Some(BlockPtr(self.offset + OCCUPIED_METADATA)),
            BlockState::Free => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_includes_state_metadata() {
        let free = BlockInfo::free(24, 100);
        let used = BlockInfo::occupied(24, 100);
        assert_eq!(free.span(), 116);
        assert_eq!(used.span(), 108);
        assert_eq!(used.end(), 132);
    }

    #[test]
    fn only_occupied_blocks_have_a_pointer() {
        assert_eq!(BlockInfo::occupied(24, 8).ptr(), Some(BlockPtr(32)));
        assert_eq!(BlockInfo::free(24, 8).ptr(), None);
    }
}
