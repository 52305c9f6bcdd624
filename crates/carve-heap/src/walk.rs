//! Iteration over the arena: every block, or just the free chain.

use std::iter::FusedIterator;

use carve_core::layout::{FREE_METADATA, HEADER_SIZE};
use carve_core::{BlockInfo, HeapError};

use crate::block::BlockHeader;
use crate::header;

/// Iterator over every block of an arena in ascending offset order.
///
/// Starts right after the header and stops at the end of the region.
/// A block whose metadata fails validation ends the iteration early;
/// use [`Heap::check`](crate::Heap::check) to surface the error itself.
#[derive(Clone, Debug)]
pub struct Blocks<'a> {
    bytes: &'a [u8],
    cursor: u64,
}

impl<'a> Blocks<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            cursor: HEADER_SIZE,
        }
    }
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        if self.cursor >= self.bytes.len() as u64 {
            return None;
        }
        match BlockHeader::load(self.bytes, self.cursor) {
            Ok(header) => {
                let info = header.info(self.cursor);
                self.cursor += header.span();
                Some(info)
            }
            Err(_) => {
                self.cursor = u64::MAX;
                None
            }
        }
    }
}

impl FusedIterator for Blocks<'_> {}

/// A free-list entry together with its list neighbours.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FreeEntry {
    pub offset: u64,
    pub size: u64,
    pub next: Option<u64>,
    /// The free block linking to this one; `None` for the list head.
    pub prev: Option<u64>,
}

impl FreeEntry {
    pub fn end(&self) -> u64 {
        self.offset + FREE_METADATA + self.size
    }

    pub fn info(&self) -> BlockInfo {
        BlockInfo::free(self.offset, self.size)
    }
}

/// Validating traversal of the free list from the header's head link.
///
/// Links are checked to stay inside the arena, to land on free blocks
/// and to move strictly forward, so the walk always terminates. The
/// first violation is yielded as an error and ends the chain.
pub(crate) struct FreeChain<'a> {
    bytes: &'a [u8],
    next: Option<u64>,
    prev: Option<u64>,
}

impl<'a> FreeChain<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self, HeapError> {
        Ok(Self {
            bytes,
            next: header::free_head(bytes)?,
            prev: None,
        })
    }
}

impl Iterator for FreeChain<'_> {
    type Item = Result<FreeEntry, HeapError>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.next.take()?;
        let entry = match BlockHeader::load(self.bytes, offset) {
            Ok(BlockHeader::Free { size, next }) => FreeEntry {
                offset,
                size,
                next,
                prev: self.prev,
            },
            Ok(BlockHeader::Occupied { .. }) => {
                return Some(Err(HeapError::corrupted(
                    offset,
                    "free list links to an occupied block",
                )))
            }
            Err(e) => return Some(Err(e)),
        };
        self.prev = Some(offset);
        self.next = entry.next;
        Some(Ok(entry))
    }
}

impl FusedIterator for FreeChain<'_> {}
