//! Structural validation of a whole arena.

use carve_core::layout::HEADER_SIZE;
use carve_core::HeapError;
use smallvec::SmallVec;

use crate::block::BlockHeader;
use crate::header::{self, ArenaHeader};
use crate::heap::Heap;
use crate::stats::HeapStats;
use crate::walk::FreeChain;

impl<B: AsRef<[u8]> + AsMut<[u8]>> Heap<B> {
    /// Verify every structural invariant of the arena.
    ///
    /// Checks that the header agrees with the region and the active
    /// strategy, that blocks tile the region exactly, that no two free
    /// blocks are adjacent, and that the free list holds exactly the free
    /// blocks in ascending order. Returns the occupancy on success.
    ///
    /// # Errors
    ///
    /// [`HeapError::Corrupted`] naming the first offending offset.
    pub fn check(&self) -> Result<HeapStats, HeapError> {
        let bytes = self.bytes_raw();
        let total = self.total_size();
        let stored = ArenaHeader::load(bytes)?;
        if stored.total_size != total {
            return Err(HeapError::corrupted(
                header::TOTAL_SIZE_AT,
                format!("header records {} bytes, region has {total}", stored.total_size),
            ));
        }
        if stored.strategy != self.strategy() {
            return Err(HeapError::corrupted(
                header::STRATEGY_AT,
                format!("header records {}, heap uses {}", stored.strategy, self.strategy()),
            ));
        }

        let mut stats = HeapStats {
            total_size: total,
            metadata_bytes: HEADER_SIZE,
            ..HeapStats::default()
        };
        let mut walked: SmallVec<[u64; 16]> = SmallVec::new();
        let mut previous_free = false;
        let mut cursor = HEADER_SIZE;
        while cursor < total {
            let block = BlockHeader::load(bytes, cursor)?;
            if block.is_free() {
                if previous_free {
                    return Err(HeapError::corrupted(cursor, "adjacent free blocks"));
                }
                walked.push(cursor);
            }
            previous_free = block.is_free();
            stats.record(block.info(cursor));
            cursor += block.span();
        }

        let mut listed: SmallVec<[u64; 16]> = SmallVec::new();
        for entry in FreeChain::new(bytes)? {
            listed.push(entry?.offset);
        }
        if listed != walked {
            let offset = listed
                .iter()
                .zip(&walked)
                .find(|(l, w)| l != w)
                .map_or(header::FREE_HEAD_AT, |(&l, &w)| l.min(w));
            return Err(HeapError::corrupted(
                offset,
                format!(
                    "free list holds {} blocks, arena has {} free blocks",
                    listed.len(),
                    walked.len()
                ),
            ));
        }
        Ok(stats)
    }
}
