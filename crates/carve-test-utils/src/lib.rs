//! Test utilities and mock types for Carve development.
//!
//! Provides [`assert_invariants`] for whole-arena checks after every
//! step of a scenario, a [`MockWalk`] implementation of [`BlockWalk`]
//! for testing consumers without a real arena, and a [`LiveModel`] that
//! mirrors the expected contents of every live allocation.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use carve_core::layout::HEADER_SIZE;
use carve_core::{BlockInfo, BlockPtr, BlockWalk, HeapError};
use carve_heap::{Heap, HeapStats};
use indexmap::IndexMap;

/// Assert every structural invariant of `heap` and return its stats.
///
/// Runs [`Heap::check`] and then re-derives the same properties from
/// the public iterators, so a bug in either side shows up.
///
/// # Panics
///
/// On the first violated invariant, with the offending block layout.
pub fn assert_invariants<B: AsRef<[u8]> + AsMut<[u8]>>(heap: &Heap<B>) -> HeapStats {
    let stats = match heap.check() {
        Ok(stats) => stats,
        Err(e) => panic!("arena check failed: {e}\nlayout: {:?}", heap.blocks().collect::<Vec<_>>()),
    };
    let blocks: Vec<BlockInfo> = heap.blocks().collect();

    let mut cursor = HEADER_SIZE;
    for pair in blocks.windows(2) {
        assert!(
            !(pair[0].is_free() && pair[1].is_free()),
            "adjacent free blocks at {} and {}",
            pair[0].offset,
            pair[1].offset
        );
    }
    for block in &blocks {
        assert_eq!(block.offset, cursor, "gap or overlap before block {block:?}");
        assert_eq!(block.offset % 8, 0, "misaligned block {block:?}");
        assert_eq!(block.size % 8, 0, "misaligned size {block:?}");
        cursor = block.end();
    }
    assert_eq!(cursor, heap.total_size(), "blocks do not reach the end of the arena");

    let walked_free: Vec<BlockInfo> = blocks.iter().copied().filter(BlockInfo::is_free).collect();
    let listed_free: Vec<BlockInfo> = heap.free_blocks().collect();
    assert_eq!(listed_free, walked_free, "free list disagrees with the block walk");

    assert_eq!(stats, HeapStats::from_blocks(heap.total_size(), blocks));
    assert_eq!(
        stats.free_bytes + stats.occupied_bytes + stats.metadata_bytes,
        stats.total_size
    );
    stats
}

/// Fixed block list implementing [`BlockWalk`].
///
/// Blocks are reported exactly as given; nothing checks that they tile.
#[derive(Clone, Debug)]
pub struct MockWalk {
    pub total_size: u64,
    pub blocks: Vec<BlockInfo>,
}

impl MockWalk {
    pub fn new(total_size: u64) -> Self {
        Self {
            total_size,
            blocks: Vec::new(),
        }
    }

    /// Append a block directly after the previous one.
    pub fn push(mut self, size: u64, free: bool) -> Self {
        let offset = self.blocks.last().map_or(HEADER_SIZE, BlockInfo::end);
        self.blocks.push(if free {
            BlockInfo::free(offset, size)
        } else {
            BlockInfo::occupied(offset, size)
        });
        self
    }
}

impl BlockWalk for MockWalk {
    fn total_size(&self) -> u64 {
        self.total_size
    }

    fn header_size(&self) -> u64 {
        HEADER_SIZE
    }

    fn walk(&self, visitor: &mut dyn FnMut(BlockInfo)) {
        for block in &self.blocks {
            visitor(*block);
        }
    }
}

/// Expected contents of every live allocation.
///
/// Each allocation is filled with its own tag byte over the requested
/// length; [`verify`](LiveModel::verify) checks nothing has been
/// overwritten. Insertion order is kept so tests can address
/// allocations by index.
#[derive(Debug, Default)]
pub struct LiveModel {
    live: IndexMap<BlockPtr, (u64, u8)>,
    next_tag: u8,
}

impl LiveModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Pointer of the `index`-th live allocation, wrapping around.
    pub fn pick(&self, index: usize) -> Option<BlockPtr> {
        if self.live.is_empty() {
            return None;
        }
        self.live
            .get_index(index % self.live.len())
            .map(|(ptr, _)| *ptr)
    }

    fn tag(&mut self) -> u8 {
        self.next_tag = self.next_tag.wrapping_add(1).max(1);
        self.next_tag
    }

    /// Allocate `len` bytes and fill them with a fresh tag.
    pub fn allocate<B: AsRef<[u8]> + AsMut<[u8]>>(
        &mut self,
        heap: &mut Heap<B>,
        len: u64,
    ) -> Result<BlockPtr, HeapError> {
        let ptr = heap.allocate(len)?;
        let tag = self.tag();
        heap.bytes_mut(ptr)?[..len as usize].fill(tag);
        self.live.insert(ptr, (len, tag));
        Ok(ptr)
    }

    /// Free a tracked allocation.
    pub fn free<B: AsRef<[u8]> + AsMut<[u8]>>(
        &mut self,
        heap: &mut Heap<B>,
        ptr: BlockPtr,
    ) -> Result<(), HeapError> {
        heap.free(ptr)?;
        self.live.shift_remove(&ptr);
        Ok(())
    }

    /// Resize a tracked allocation, then refill it to its new length.
    pub fn resize<B: AsRef<[u8]> + AsMut<[u8]>>(
        &mut self,
        heap: &mut Heap<B>,
        ptr: BlockPtr,
        len: u64,
    ) -> Result<BlockPtr, HeapError> {
        let new_ptr = heap.resize(ptr, len)?;
        let (old_len, tag) = self.live.shift_remove(&ptr).unwrap_or((0, 0));
        let kept = old_len.min(len) as usize;
        let bytes = heap.bytes_mut(new_ptr)?;
        assert!(
            bytes[..kept].iter().all(|&b| b == tag),
            "resize of {ptr} to {len} bytes lost contents"
        );
        bytes[..len as usize].fill(tag);
        self.live.insert(new_ptr, (len, tag));
        Ok(new_ptr)
    }

    /// Assert that every live allocation still holds its tag.
    pub fn verify<B: AsRef<[u8]> + AsMut<[u8]>>(&self, heap: &Heap<B>) {
        for (&ptr, &(len, tag)) in &self.live {
            let bytes = heap
                .bytes(ptr)
                .unwrap_or_else(|e| panic!("live allocation {ptr} lost: {e}"));
            assert!(bytes.len() as u64 >= len, "{ptr} shrank below {len} bytes");
            assert!(
                bytes[..len as usize].iter().all(|&b| b == tag),
                "{ptr} was overwritten"
            );
        }
    }

    /// Free everything still live.
    pub fn drain<B: AsRef<[u8]> + AsMut<[u8]>>(&mut self, heap: &mut Heap<B>) -> Result<(), HeapError> {
        for (ptr, _) in std::mem::take(&mut self.live) {
            heap.free(ptr)?;
        }
        Ok(())
    }
}
