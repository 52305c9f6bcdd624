//! The [`Heap`] handle: initialization, attachment and read access.
//!
//! Mutating operations (`allocate`, `free`, `resize`) live in the
//! private `alloc` module; validation and statistics in `check`.

use std::fmt;
use std::ops::Range;

use carve_core::layout::{
    is_aligned, ALIGN, FREE_METADATA, HEADER_SIZE, MAX_BLOCK_SIZE, MIN_REGION_SIZE,
    OCCUPIED_METADATA,
};
use carve_core::{BlockInfo, BlockPtr, BlockWalk, FitStrategy, HeapError};
use tracing::debug;

use crate::block::BlockHeader;
use crate::config::HeapConfig;
use crate::header::{self, ArenaHeader};
use crate::walk::{Blocks, FreeChain, FreeEntry};

/// A free-list allocator over one caller-provided byte region.
///
/// The region can be anything that derefs to a byte slice: an owned
/// `Vec<u8>` or `Box<[u8]>`, or a borrowed `&mut [u8]` / `&mut Vec<u8>`
/// when the caller wants the bytes back afterwards. All metadata is
/// stored inside the region itself; the `Heap` value only caches the
/// configuration.
///
/// Single-threaded by construction: every mutating method takes
/// `&mut self`. Sharing a heap across threads requires wrapping it in a
/// lock; one coarse lock around every call is sufficient.
pub struct Heap<B> {
    region: B,
    config: HeapConfig,
}

/// A live allocation resolved from its pointer, with the free blocks
/// bracketing it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Located {
    pub offset: u64,
    pub size: u64,
    pub before: Option<FreeEntry>,
    pub after: Option<FreeEntry>,
}

impl Located {
    pub fn payload(&self) -> u64 {
        self.offset + OCCUPIED_METADATA
    }

    pub fn end(&self) -> u64 {
        self.payload() + self.size
    }
}

/// Check that a region of `len` bytes can host an arena.
fn validate_region_len(len: usize) -> Result<u64, HeapError> {
    let total = len as u64;
    if total < ALIGN || !is_aligned(total) {
        return Err(HeapError::InvalidConfiguration {
            reason: format!("region length {total} is not a positive multiple of {ALIGN}"),
        });
    }
    if total < MIN_REGION_SIZE {
        return Err(HeapError::InvalidConfiguration {
            reason: format!("region length {total} is below the {MIN_REGION_SIZE}-byte minimum"),
        });
    }
    if total > MAX_BLOCK_SIZE {
        return Err(HeapError::InvalidConfiguration {
            reason: format!("region length {total} exceeds the {MAX_BLOCK_SIZE}-byte maximum"),
        });
    }
    Ok(total)
}

/// Write a fresh header and one free block spanning the rest of `bytes`.
fn format_region(bytes: &mut [u8], strategy: FitStrategy) -> Result<u64, HeapError> {
    let total = validate_region_len(bytes.len())?;
    ArenaHeader {
        total_size: total,
        strategy,
        free_head: Some(HEADER_SIZE),
    }
    .store(bytes)?;
    BlockHeader::Free {
        size: total - HEADER_SIZE - FREE_METADATA,
        next: None,
    }
    .store(bytes, HEADER_SIZE)?;
    Ok(total)
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Heap<B> {
    /// Initialize an arena over `region` with the default configuration.
    pub fn new(region: B) -> Result<Self, HeapError> {
        Self::init(region, HeapConfig::default())
    }

    /// Initialize an arena over `region`.
    ///
    /// Writes the header and a single free block covering everything
    /// after it. Whatever the region held before is discarded, including
    /// any earlier arena.
    ///
    /// # Errors
    ///
    /// [`HeapError::InvalidConfiguration`] if the region length is not a
    /// multiple of [`ALIGN`], is too short to hold the header and one
    /// free block, or is too long for a size word. The region is not
    /// written in that case.
    pub fn init(mut region: B, config: HeapConfig) -> Result<Self, HeapError> {
        let total = format_region(region.as_mut(), config.strategy)?;
        debug!(total_size = total, strategy = %config.strategy, "heap initialized");
        Ok(Self { region, config })
    }

    /// Reopen a region that already holds an arena.
    ///
    /// The header and the full block structure are validated first. The
    /// strategy recorded in the header takes precedence over
    /// `config.strategy`.
    ///
    /// # Errors
    ///
    /// [`HeapError::InvalidConfiguration`] for an unusable region length,
    /// [`HeapError::Corrupted`] if the stored metadata is inconsistent.
    pub fn attach(region: B, config: HeapConfig) -> Result<Self, HeapError> {
        let bytes = region.as_ref();
        let total = validate_region_len(bytes.len())?;
        let stored = ArenaHeader::load(bytes)?;
        if stored.total_size != total {
            return Err(HeapError::corrupted(
                header::TOTAL_SIZE_AT,
                format!(
                    "header records {} bytes but the region has {total}",
                    stored.total_size
                ),
            ));
        }
        let heap = Self {
            region,
            config: HeapConfig {
                strategy: stored.strategy,
                ..config
            },
        };
        let stats = heap.check()?;
        debug!(
            total_size = total,
            strategy = %stored.strategy,
            occupied_blocks = stats.occupied_blocks,
            free_blocks = stats.free_blocks,
            "heap attached"
        );
        Ok(heap)
    }

    /// Re-initialize the arena in place, dropping every allocation.
    pub fn reset(&mut self) -> Result<(), HeapError> {
        let total = format_region(self.region.as_mut(), self.config.strategy)?;
        debug!(total_size = total, "heap reset");
        Ok(())
    }

    /// Give the underlying region back.
    pub fn into_inner(self) -> B {
        self.region
    }

    /// The underlying region.
    pub fn region(&self) -> &B {
        &self.region
    }

    /// The active configuration.
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// The strategy used by the next `allocate`.
    pub fn strategy(&self) -> FitStrategy {
        self.config.strategy
    }

    /// Switch the fit strategy for subsequent allocations.
    ///
    /// Existing blocks are untouched; the choice is also recorded in the
    /// arena header so [`attach`](Self::attach) restores it.
    pub fn set_strategy(&mut self, strategy: FitStrategy) {
        // The header always lies inside a validated region.
        if header::set_strategy(self.region.as_mut(), strategy).is_ok() {
            debug!(from = %self.config.strategy, to = %strategy, "fit strategy changed");
            self.config.strategy = strategy;
        }
    }

    /// Length of the managed region, header included.
    pub fn total_size(&self) -> u64 {
        self.region.as_ref().len() as u64
    }

    /// Usable size of a live allocation.
    ///
    /// May exceed the size originally requested: small remainders that
    /// cannot host a block of their own are granted to the allocation.
    /// Callers must not rely on that surplus.
    ///
    /// # Errors
    ///
    /// [`HeapError::InvalidPointer`] if `ptr` is not a live allocation.
    pub fn block_size(&self, ptr: BlockPtr) -> Result<u64, HeapError> {
        Ok(self.locate(ptr)?.size)
    }

    /// The payload bytes of a live allocation.
    pub fn bytes(&self, ptr: BlockPtr) -> Result<&[u8], HeapError> {
        let at = self.locate(ptr)?;
        Ok(&self.region.as_ref()[payload_range(&at)])
    }

    /// The payload bytes of a live allocation, mutably.
    pub fn bytes_mut(&mut self, ptr: BlockPtr) -> Result<&mut [u8], HeapError> {
        let at = self.locate(ptr)?;
        Ok(&mut self.region.as_mut()[payload_range(&at)])
    }

    /// Every block, in ascending offset order.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks::new(self.region.as_ref())
    }

    /// The free list, in ascending offset order.
    pub fn free_blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
        FreeChain::new(self.region.as_ref())
            .into_iter()
            .flatten()
            .map_while(Result::ok)
            .map(|entry| entry.info())
    }

    /// Invoke `visitor(offset, size, is_free)` once per block, in
    /// ascending offset order. Never mutates the arena.
    pub fn for_each_block<F>(&self, mut visitor: F)
    where
        F: FnMut(u64, u64, bool),
    {
        for block in self.blocks() {
            visitor(block.offset, block.size, block.is_free());
        }
    }

    /// Usable size of the largest free block, `0` if none.
    pub fn largest_free(&self) -> u64 {
        self.free_blocks().map(|b| b.size).max().unwrap_or(0)
    }

    /// Wrap a region without validating it.
    #[cfg(test)]
    pub(crate) fn from_parts_unchecked(region: B, config: HeapConfig) -> Self {
        Self { region, config }
    }

    pub(crate) fn bytes_raw(&self) -> &[u8] {
        self.region.as_ref()
    }

    pub(crate) fn bytes_raw_mut(&mut self) -> &mut [u8] {
        self.region.as_mut()
    }

    /// Resolve `ptr` to a live occupied block.
    ///
    /// Finds the nearest free blocks on either side, then walks the
    /// occupied run between them; `ptr` must land exactly on the start of
    /// one of those blocks' payloads.
    pub(crate) fn locate(&self, ptr: BlockPtr) -> Result<Located, HeapError> {
        let bytes = self.region.as_ref();
        let invalid = || HeapError::InvalidPointer { ptr };
        let offset = ptr
            .block_offset()
            .filter(|&o| o >= HEADER_SIZE && o < bytes.len() as u64 && is_aligned(o))
            .ok_or_else(invalid)?;

        let mut before = None;
        let mut after = None;
        for entry in FreeChain::new(bytes)? {
            let entry = entry?;
            if entry.offset < offset {
                before = Some(entry);
            } else {
                after = Some(entry);
                break;
            }
        }
        if after.is_some_and(|a| a.offset == offset) {
            return Err(invalid());
        }

        let mut cursor = before.map_or(HEADER_SIZE, |b| b.end());
        while cursor < offset {
            let block = BlockHeader::load(bytes, cursor)?;
            if block.is_free() {
                return Err(HeapError::corrupted(cursor, "free block missing from the free list"));
            }
            cursor += block.span();
        }
        if cursor != offset {
            return Err(invalid());
        }
        match BlockHeader::load(bytes, offset)? {
            BlockHeader::Occupied { size } => Ok(Located {
                offset,
                size,
                before,
                after,
            }),
            BlockHeader::Free { .. } => Err(HeapError::corrupted(
                offset,
                "free block missing from the free list",
            )),
        }
    }
}

fn payload_range(at: &Located) -> Range<usize> {
    at.payload() as usize..at.end() as usize
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> BlockWalk for Heap<B> {
    fn total_size(&self) -> u64 {
        Heap::total_size(self)
    }

    fn header_size(&self) -> u64 {
        HEADER_SIZE
    }

    fn walk(&self, visitor: &mut dyn FnMut(BlockInfo)) {
        for block in self.blocks() {
            visitor(block);
        }
    }
}

impl<B: AsRef<[u8]>> fmt::Debug for Heap<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("total_size", &self.region.as_ref().len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot<B: AsRef<[u8]> + AsMut<[u8]>>(heap: &Heap<B>) -> Vec<BlockInfo> {
        heap.blocks().collect()
    }

    #[test]
    fn init_leaves_one_free_block() {
        let heap = Heap::new(vec![0u8; 2048]).unwrap();
        assert_eq!(snapshot(&heap), vec![BlockInfo::free(24, 2008)]);
        assert_eq!(heap.total_size(), 2048);
        assert_eq!(heap.largest_free(), 2008);
    }

    #[test]
    fn init_rejects_unusable_lengths() {
        for len in [0usize, 7, 2047, 32] {
            let err = Heap::new(vec![0u8; len]).unwrap_err();
            assert!(
                matches!(err, HeapError::InvalidConfiguration { .. }),
                "len {len}: {err}"
            );
        }
    }

    #[test]
    fn smallest_region_holds_an_empty_free_block() {
        let heap = Heap::new(vec![0u8; MIN_REGION_SIZE as usize]).unwrap();
        assert_eq!(snapshot(&heap), vec![BlockInfo::free(24, 0)]);
    }

    #[test]
    fn init_records_strategy_in_header() {
        let config = HeapConfig::new().with_strategy(FitStrategy::WorstFit);
        let heap = Heap::init(vec![0u8; 256], config).unwrap();
        let stored = ArenaHeader::load(&heap.into_inner()).unwrap();
        assert_eq!(stored.strategy, FitStrategy::WorstFit);
        assert_eq!(stored.total_size, 256);
        assert_eq!(stored.free_head, Some(HEADER_SIZE));
    }

    #[test]
    fn borrowed_region_is_usable() {
        let mut region = [0u8; 512];
        {
            let mut heap = Heap::new(&mut region[..]).unwrap();
            heap.allocate(64).unwrap();
        }
        assert_eq!(&region[..8], &512u64.to_le_bytes());
    }

    #[test]
    fn attach_restores_allocations_and_strategy() {
        let mut heap = Heap::new(vec![0u8; 1024]).unwrap();
        heap.set_strategy(FitStrategy::BestFit);
        let ptr = heap.allocate(100).unwrap();
        heap.bytes_mut(ptr).unwrap()[..4].copy_from_slice(b"keep");
        let before = snapshot(&heap);

        let heap = Heap::attach(heap.into_inner(), HeapConfig::default()).unwrap();
        assert_eq!(heap.strategy(), FitStrategy::BestFit);
        assert_eq!(snapshot(&heap), before);
        assert_eq!(&heap.bytes(ptr).unwrap()[..4], b"keep");
    }

    #[test]
    fn attach_rejects_foreign_bytes() {
        let err = Heap::attach(vec![0xABu8; 1024], HeapConfig::default()).unwrap_err();
        assert!(matches!(err, HeapError::Corrupted { .. }), "{err}");
    }

    #[test]
    fn attach_rejects_truncated_region() {
        let heap = Heap::new(vec![0u8; 1024]).unwrap();
        let mut region = heap.into_inner();
        region.truncate(512);
        let err = Heap::attach(region, HeapConfig::default()).unwrap_err();
        assert!(
            matches!(
                err,
                HeapError::Corrupted {
                    offset: header::TOTAL_SIZE_AT,
                    ..
                }
            ),
            "{err}"
        );
    }

    #[test]
    fn reset_drops_every_allocation() {
        let mut heap = Heap::new(vec![0u8; 2048]).unwrap();
        let ptr = heap.allocate(256).unwrap();
        heap.allocate(512).unwrap();
        heap.reset().unwrap();
        assert_eq!(snapshot(&heap), vec![BlockInfo::free(24, 2008)]);
        assert!(matches!(
            heap.block_size(ptr),
            Err(HeapError::InvalidPointer { .. })
        ));
    }

    #[test]
    fn set_strategy_is_persisted() {
        let mut heap = Heap::new(vec![0u8; 256]).unwrap();
        heap.set_strategy(FitStrategy::WorstFit);
        assert_eq!(heap.strategy(), FitStrategy::WorstFit);
        assert_eq!(
            ArenaHeader::load(heap.bytes_raw()).unwrap().strategy,
            FitStrategy::WorstFit
        );
        heap.check().unwrap();
    }

    #[test]
    fn locate_rejects_pointers_that_are_not_payloads() {
        let mut heap = Heap::new(vec![0u8; 2048]).unwrap();
        let ptr = heap.allocate(256).unwrap();
        assert_eq!(ptr, BlockPtr(32));
        for bad in [0, 8, 24, 33, 40, 288, 296, 4096, u64::MAX] {
            assert!(
                matches!(
                    heap.block_size(BlockPtr(bad)),
                    Err(HeapError::InvalidPointer { .. })
                ),
                "{bad} accepted"
            );
        }
        assert_eq!(heap.block_size(ptr).unwrap(), 256);
    }

    #[test]
    fn freed_pointer_is_no_longer_located() {
        let mut heap = Heap::new(vec![0u8; 2048]).unwrap();
        let a = heap.allocate(64).unwrap();
        let b = heap.allocate(64).unwrap();
        heap.free(a).unwrap();
        assert!(matches!(
            heap.bytes(a),
            Err(HeapError::InvalidPointer { ptr }) if ptr == a
        ));
        assert_eq!(heap.bytes(b).unwrap().len(), 64);
    }

    #[test]
    fn located_block_reports_its_free_neighbours() {
        let mut heap = Heap::new(vec![0u8; 2048]).unwrap();
        let a = heap.allocate(64).unwrap();
        let b = heap.allocate(64).unwrap();
        heap.allocate(64).unwrap();
        heap.free(a).unwrap();
        let at = heap.locate(b).unwrap();
        assert_eq!(at.offset, 96);
        assert_eq!(at.before.map(|e| e.offset), Some(24));
        assert_eq!(at.after.map(|e| e.offset), Some(240));
    }

    #[test]
    fn for_each_block_matches_blocks() {
        let mut heap = Heap::new(vec![0u8; 512]).unwrap();
        heap.allocate(32).unwrap();
        let mut seen = Vec::new();
        heap.for_each_block(|offset, size, free| seen.push((offset, size, free)));
        assert_eq!(seen, vec![(24, 32, false), (64, 432, true)]);
    }

    #[test]
    fn walk_visits_every_block() {
        let mut heap = Heap::new(vec![0u8; 512]).unwrap();
        heap.allocate(32).unwrap();
        let mut count = 0;
        BlockWalk::walk(&heap, &mut |_| count += 1);
        assert_eq!(count, 2);
        assert_eq!(BlockWalk::header_size(&heap), HEADER_SIZE);
    }
}
