//! Occupancy statistics derived from a block walk.

use carve_core::layout::HEADER_SIZE;
use carve_core::BlockInfo;

use crate::heap::Heap;

/// A snapshot of how an arena's bytes are divided.
///
/// `free_bytes + occupied_bytes + metadata_bytes == total_size` for any
/// consistent arena; `metadata_bytes` includes the arena header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Region length, header included.
    pub total_size: u64,
    /// Number of free blocks.
    pub free_blocks: usize,
    /// Number of live allocations.
    pub occupied_blocks: usize,
    /// Usable bytes across all free blocks.
    pub free_bytes: u64,
    /// Usable bytes across all live allocations.
    pub occupied_bytes: u64,
    /// Header plus per-block metadata.
    pub metadata_bytes: u64,
    /// Usable size of the largest free block.
    pub largest_free: u64,
}

impl HeapStats {
    /// Tally `blocks` for an arena of `total_size` bytes.
    pub fn from_blocks<I>(total_size: u64, blocks: I) -> Self
    where
        I: IntoIterator<Item = BlockInfo>,
    {
        let mut stats = Self {
            total_size,
            metadata_bytes: HEADER_SIZE,
            ..Self::default()
        };
        for block in blocks {
            stats.record(block);
        }
        stats
    }

    pub(crate) fn record(&mut self, block: BlockInfo) {
        self.metadata_bytes += block.metadata_size();
        if block.is_free() {
            self.free_blocks += 1;
            self.free_bytes += block.size;
            self.largest_free = self.largest_free.max(block.size);
        } else {
            self.occupied_blocks += 1;
            self.occupied_bytes += block.size;
        }
    }

    /// Total number of blocks.
    pub fn blocks(&self) -> usize {
        self.free_blocks + self.occupied_blocks
    }

    /// External fragmentation in `[0, 1]`: the share of free bytes that
    /// lie outside the largest free block. `0.0` when nothing is free.
    pub fn fragmentation(&self) -> f64 {
        if self.free_bytes == 0 {
            return 0.0;
        }
        1.0 - self.largest_free as f64 / self.free_bytes as f64
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Heap<B> {
    /// Current occupancy. Walks every block.
    pub fn stats(&self) -> HeapStats {
        HeapStats::from_blocks(self.total_size(), self.blocks())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_free_and_occupied_blocks() {
        let stats = HeapStats::from_blocks(
            2048,
            [
                BlockInfo::occupied(24, 256),
                BlockInfo::free(288, 640),
                BlockInfo::occupied(944, 1024),
                BlockInfo::free(1976, 56),
            ],
        );
        assert_eq!(stats.free_blocks, 2);
        assert_eq!(stats.occupied_blocks, 2);
        assert_eq!(stats.blocks(), 4);
        assert_eq!(stats.free_bytes, 696);
        assert_eq!(stats.occupied_bytes, 1280);
        assert_eq!(stats.largest_free, 640);
        assert_eq!(stats.metadata_bytes, 24 + 8 + 16 + 8 + 16);
        assert_eq!(
            stats.free_bytes + stats.occupied_bytes + stats.metadata_bytes,
            2048
        );
    }

    #[test]
    fn fragmentation_is_zero_without_free_bytes() {
        let stats = HeapStats::from_blocks(64, [BlockInfo::occupied(24, 32)]);
        assert_eq!(stats.fragmentation(), 0.0);
    }

    #[test]
    fn fragmentation_of_single_free_block_is_zero() {
        let stats = HeapStats::from_blocks(2048, [BlockInfo::free(24, 2008)]);
        assert_eq!(stats.fragmentation(), 0.0);
    }

    #[test]
    fn fragmentation_grows_with_scattered_free_space() {
        let stats = HeapStats::from_blocks(
            128,
            [
                BlockInfo::free(24, 16),
                BlockInfo::occupied(56, 16),
                BlockInfo::free(80, 32),
            ],
        );
        assert_eq!(stats.largest_free, 32);
        assert!((stats.fragmentation() - 1.0 / 3.0).abs() < 1e-9);
    }
}
