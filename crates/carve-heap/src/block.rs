//! Tagged block headers persisted in front of every payload.
//!
//! The first word of a block holds its usable size, with [`FREE_FLAG`]
//! set for free blocks. Free blocks carry a second word, the offset of
//! the next free block. Decoding validates the block against the region
//! bounds so a bad word can never send a traversal outside the arena or
//! backwards.

use carve_core::layout::{is_aligned, FREE_FLAG, HEADER_SIZE, MAX_BLOCK_SIZE, WORD};
use carve_core::{BlockInfo, BlockState, HeapError};

use crate::header::{link_from_word, link_to_word};
use crate::raw::{read_word, write_word};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BlockHeader {
    Free { size: u64, next: Option<u64> },
    Occupied { size: u64 },
}

impl BlockHeader {
    pub fn size(&self) -> u64 {
        match *self {
            Self::Free { size, .. } | Self::Occupied { size } => size,
        }
    }

    pub fn state(&self) -> BlockState {
        match self {
            Self::Free { .. } => BlockState::Free,
            Self::Occupied { .. } => BlockState::Occupied,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, Self::Free { .. })
    }

    /// Metadata plus payload.
    pub fn span(&self) -> u64 {
        self.state().metadata_size() + self.size()
    }

    pub fn info(&self, offset: u64) -> BlockInfo {
        BlockInfo {
            offset,
            size: self.size(),
            state: self.state(),
        }
    }

    /// Decode the block at `offset` and check it fits inside `bytes`.
    pub fn load(bytes: &[u8], offset: u64) -> Result<Self, HeapError> {
        let total = bytes.len() as u64;
        if offset < HEADER_SIZE || offset >= total || !is_aligned(offset) {
            return Err(HeapError::corrupted(offset, "not a block offset"));
        }
        let word = read_word(bytes, offset)?;
        let size = word & MAX_BLOCK_SIZE;
        let header = if word & FREE_FLAG != 0 {
            let next = link_from_word(read_word(bytes, offset + WORD)?);
            Self::Free { size, next }
        } else {
            Self::Occupied { size }
        };
        if !is_aligned(size) {
            return Err(HeapError::corrupted(offset, format!("unaligned block size {size}")));
        }
        let end = offset
            .checked_add(header.span())
            .filter(|&end| end <= total)
            .ok_or_else(|| HeapError::corrupted(offset, format!("block of size {size} overruns the arena")))?;
        if let Self::Free { next: Some(next), .. } = header {
            if next < end {
                return Err(HeapError::corrupted(
                    offset + WORD,
                    format!("free link {next:#x} does not point past its block"),
                ));
            }
        }
        Ok(header)
    }

    /// Write this header at `offset`.
    pub fn store(&self, bytes: &mut [u8], offset: u64) -> Result<(), HeapError> {
        match *self {
            Self::Free { size, next } => {
                write_word(bytes, offset, size | FREE_FLAG)?;
                write_word(bytes, offset + WORD, link_to_word(next))
            }
            Self::Occupied { size } => write_word(bytes, offset, size),
        }
    }
}

/// Rewrite only the `next` link of the free block at `offset`.
pub(crate) fn set_next(bytes: &mut [u8], offset: u64, next: Option<u64>) -> Result<(), HeapError> {
    write_word(bytes, offset + WORD, link_to_word(next))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_header_sets_flag_and_link() {
        let mut bytes = vec![0u8; 128];
        BlockHeader::Free {
            size: 40,
            next: Some(88),
        }
        .store(&mut bytes, 24)
        .unwrap();
        assert_eq!(read_word(&bytes, 24).unwrap(), 40 | FREE_FLAG);
        assert_eq!(read_word(&bytes, 32).unwrap(), 88);
        assert_eq!(
            BlockHeader::load(&bytes, 24).unwrap(),
            BlockHeader::Free {
                size: 40,
                next: Some(88)
            }
        );
    }

    #[test]
    fn occupied_header_is_a_single_word() {
        let mut bytes = vec![0xFFu8; 64];
        BlockHeader::Occupied { size: 16 }.store(&mut bytes, 24).unwrap();
        let header = BlockHeader::load(&bytes, 24).unwrap();
        assert_eq!(header, BlockHeader::Occupied { size: 16 });
        assert_eq!(header.span(), 24);
        // The payload word after the size is untouched.
        assert_eq!(read_word(&bytes, 32).unwrap(), u64::MAX);
    }

    #[test]
    fn block_overrunning_arena_is_rejected() {
        let mut bytes = vec![0u8; 64];
        BlockHeader::Occupied { size: 40 }.store(&mut bytes, 24).unwrap();
        assert!(BlockHeader::load(&bytes, 24).is_err());
    }

    #[test]
    fn backwards_link_is_rejected() {
        let mut bytes = vec![0u8; 128];
        BlockHeader::Free {
            size: 8,
            next: Some(24),
        }
        .store(&mut bytes, 48)
        .unwrap();
        assert!(BlockHeader::load(&bytes, 48).is_err());
    }

    #[test]
    fn offsets_inside_the_header_are_not_blocks() {
        let bytes = vec![0u8; 64];
        assert!(BlockHeader::load(&bytes, 8).is_err());
        assert!(BlockHeader::load(&bytes, 28).is_err());
    }

    #[test]
    fn set_next_rewrites_link_only() {
        let mut bytes = vec![0u8; 128];
        BlockHeader::Free { size: 8, next: None }.store(&mut bytes, 24).unwrap();
        set_next(&mut bytes, 24, Some(64)).unwrap();
        assert_eq!(
            BlockHeader::load(&bytes, 24).unwrap(),
            BlockHeader::Free {
                size: 8,
                next: Some(64)
            }
        );
    }
}
