//! Allocate, free and resize.

use carve_core::layout::{
    align_up, FREE_METADATA, MAX_BLOCK_SIZE, METADATA_GAP, OCCUPIED_METADATA, WORD,
};
use carve_core::{BlockPtr, HeapError};
use tracing::{debug, trace};

use crate::block::{self, BlockHeader};
use crate::header;
use crate::heap::{Heap, Located};
use crate::strategy::find_fit;
use crate::walk::FreeChain;

/// Point `prev`'s link, or the list head when `prev` is `None`, at `target`.
fn relink(bytes: &mut [u8], prev: Option<u64>, target: Option<u64>) -> Result<(), HeapError> {
    match prev {
        Some(prev) => block::set_next(bytes, prev, target),
        None => header::set_free_head(bytes, target),
    }
}

/// Payload size actually reserved for a request.
fn payload_size(requested: u64) -> Option<u64> {
    align_up(requested).filter(|&size| size <= MAX_BLOCK_SIZE)
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Heap<B> {
    /// Reserve at least `requested` bytes and return the payload address.
    ///
    /// The request is rounded up to the alignment unit. The active
    /// [`FitStrategy`](carve_core::FitStrategy) picks a free block; if
    /// what remains after the request can host a free block of at least
    /// [`min_split_payload`](crate::HeapConfig::min_split_payload) bytes
    /// it is split off in place, otherwise the whole block is granted.
    ///
    /// # Errors
    ///
    /// - [`HeapError::InvalidArgument`] for a zero-byte request.
    /// - [`HeapError::CapacityExhausted`] if no free block is large
    ///   enough. The arena is unchanged.
    pub fn allocate(&mut self, requested: u64) -> Result<BlockPtr, HeapError> {
        if requested == 0 {
            return Err(HeapError::InvalidArgument {
                reason: "cannot allocate zero bytes".into(),
            });
        }
        let Some(size) = payload_size(requested) else {
            return Err(self.exhausted(requested));
        };
        let Some(chosen) = find_fit(self.strategy(), FreeChain::new(self.bytes_raw())?, size)? else {
            debug!(requested, strategy = %self.strategy(), "allocation rejected: no free block fits");
            return Err(self.exhausted(requested));
        };

        let threshold = self.config().split_threshold();
        let bytes = self.bytes_raw_mut();
        // Turning occupied frees the link word for payload.
        let capacity = chosen.size + METADATA_GAP;
        let leftover = capacity - size;
        let split = leftover >= threshold;
        if split {
            let rest = chosen.offset + OCCUPIED_METADATA + size;
            BlockHeader::Free {
                size: leftover - FREE_METADATA,
                next: chosen.next,
            }
            .store(bytes, rest)?;
            BlockHeader::Occupied { size }.store(bytes, chosen.offset)?;
            relink(bytes, chosen.prev, Some(rest))?;
        } else {
            BlockHeader::Occupied { size: capacity }.store(bytes, chosen.offset)?;
            relink(bytes, chosen.prev, chosen.next)?;
        }

        let ptr = BlockPtr(chosen.offset + OCCUPIED_METADATA);
        trace!(%ptr, requested, split, "allocated");
        Ok(ptr)
    }

    /// Return a live allocation to the free list.
    ///
    /// The block is coalesced with a free neighbour directly after it,
    /// then with one directly before it, so no two free blocks are ever
    /// adjacent.
    ///
    /// # Errors
    ///
    /// [`HeapError::InvalidPointer`] if `ptr` was never returned by
    /// `allocate`/`resize` or has already been freed. Nothing is
    /// modified in that case.
    pub fn free(&mut self, ptr: BlockPtr) -> Result<(), HeapError> {
        let at = self.locate(ptr)?;
        self.release(at)?;
        trace!(%ptr, "freed");
        Ok(())
    }

    /// Change the size of a live allocation, keeping its contents.
    ///
    /// Shrinks and grows in place when possible (growing absorbs a free
    /// block directly after the allocation). Otherwise the payload is
    /// moved to a new block and the old one freed; the first
    /// `min(old, new)` bytes are preserved either way.
    ///
    /// # Errors
    ///
    /// - [`HeapError::InvalidArgument`] for a zero `new_size`.
    /// - [`HeapError::InvalidPointer`] if `ptr` is not a live allocation.
    /// - [`HeapError::CapacityExhausted`] if no room can be found; the
    ///   original allocation is left intact.
    pub fn resize(&mut self, ptr: BlockPtr, new_size: u64) -> Result<BlockPtr, HeapError> {
        if new_size == 0 {
            return Err(HeapError::InvalidArgument {
                reason: "cannot resize to zero bytes".into(),
            });
        }
        let Some(want) = payload_size(new_size) else {
            return Err(self.exhausted(new_size));
        };
        let at = self.locate(ptr)?;
        let threshold = self.config().split_threshold();

        if want <= at.size {
            let tail = at.size - want;
            if tail >= threshold {
                let bytes = self.bytes_raw_mut();
                let tail_at = at.payload() + want;
                BlockHeader::Occupied { size: want }.store(bytes, at.offset)?;
                BlockHeader::Occupied {
                    size: tail - OCCUPIED_METADATA,
                }
                .store(bytes, tail_at)?;
                self.free(BlockPtr(tail_at + OCCUPIED_METADATA))?;
            }
            trace!(%ptr, new_size, "shrunk in place");
            return Ok(ptr);
        }

        if let Some(after) = at.after.filter(|a| a.offset == at.end()) {
            let combined = at.size + FREE_METADATA + after.size;
            if combined >= want {
                let leftover = combined - want;
                let bytes = self.bytes_raw_mut();
                if leftover >= threshold {
                    let rest = at.payload() + want;
                    BlockHeader::Free {
                        size: leftover - FREE_METADATA,
                        next: after.next,
                    }
                    .store(bytes, rest)?;
                    BlockHeader::Occupied { size: want }.store(bytes, at.offset)?;
                    relink(bytes, after.prev, Some(rest))?;
                } else {
                    BlockHeader::Occupied { size: combined }.store(bytes, at.offset)?;
                    relink(bytes, after.prev, after.next)?;
                }
                trace!(%ptr, new_size, "grown in place");
                return Ok(ptr);
            }
        }

        self.relocate(at, new_size, want)
    }

    /// Move a live allocation into a block of `want` bytes.
    fn relocate(&mut self, at: Located, new_size: u64, want: u64) -> Result<BlockPtr, HeapError> {
        let old = BlockPtr(at.payload());
        let keep = at.size.min(want) as usize;
        let src = at.payload() as usize;

        match self.allocate(new_size) {
            Ok(ptr) => {
                self.bytes_raw_mut()
                    .copy_within(src..src + keep, ptr.offset() as usize);
                self.free(old)?;
                trace!(from = %old, to = %ptr, new_size, "moved");
                Ok(ptr)
            }
            Err(HeapError::CapacityExhausted { .. }) => {
                // Only the span the old block coalesces into can have grown.
                let start = match at.before {
                    Some(b) if b.end() == at.offset => b.offset,
                    _ => at.offset,
                };
                let end = match at.after {
                    Some(a) if a.offset == at.end() => a.end(),
                    _ => at.end(),
                };
                if end - start - FREE_METADATA < want {
                    debug!(%old, new_size, "resize rejected: no room even after coalescing");
                    return Err(self.exhausted(new_size));
                }
                // Nothing else fits, so the coalesced block at `start` is
                // the one `allocate` picks. Slide the payload there first.
                let dst = (start + OCCUPIED_METADATA) as usize;
                self.bytes_raw_mut().copy_within(src..src + keep, dst);

                // The merged block's link word lands on the first moved word.
                let mut head = [0u8; WORD as usize];
                let head_len = keep.min(head.len());
                head[..head_len].copy_from_slice(&self.bytes_raw()[dst..dst + head_len]);

                self.release(at)?;
                let ptr = self.allocate(new_size)?;
                if ptr.offset() as usize != dst {
                    return Err(HeapError::corrupted(
                        start,
                        "coalesced span was not chosen for the moved block",
                    ));
                }
                self.bytes_raw_mut()[dst..dst + head_len].copy_from_slice(&head[..head_len]);
                trace!(from = %old, to = %ptr, new_size, "moved through its own freed span");
                Ok(ptr)
            }
            Err(e) => Err(e),
        }
    }

    /// Turn a located occupied block into a free one and coalesce it.
    fn release(&mut self, at: Located) -> Result<(), HeapError> {
        let bytes = self.bytes_raw_mut();
        let mut size = at.size.checked_sub(METADATA_GAP).ok_or_else(|| {
            HeapError::corrupted(at.offset, "occupied block too small to hold free metadata")
        })?;
        let mut next = at.after.map(|a| a.offset);

        if let Some(after) = at.after.filter(|a| a.offset == at.end()) {
            size += FREE_METADATA + after.size;
            next = after.next;
        }

        match at.before {
            Some(before) if before.end() == at.offset => BlockHeader::Free {
                size: before.size + FREE_METADATA + size,
                next,
            }
            .store(bytes, before.offset),
            _ => {
                BlockHeader::Free { size, next }.store(bytes, at.offset)?;
                relink(bytes, at.before.map(|b| b.offset), Some(at.offset))
            }
        }
    }

    fn exhausted(&self, requested: u64) -> HeapError {
        HeapError::CapacityExhausted {
            requested,
            largest_free: self.largest_free(),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use carve_core::FitStrategy;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Op {
        Allocate(u64),
        Free(usize),
        Resize(usize, u64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u64..300).prop_map(Op::Allocate),
            any::<usize>().prop_map(Op::Free),
            (any::<usize>(), 1u64..400).prop_map(|(i, n)| Op::Resize(i, n)),
        ]
    }

    fn strategy() -> impl Strategy<Value = FitStrategy> {
        prop_oneof![
            Just(FitStrategy::FirstFit),
            Just(FitStrategy::BestFit),
            Just(FitStrategy::WorstFit),
        ]
    }

    proptest! {
        #[test]
        fn random_ops_keep_the_arena_consistent(
            strategy in strategy(),
            ops in prop::collection::vec(op(), 1..80),
        ) {
            let mut heap = Heap::init(
                vec![0u8; 4096],
                crate::HeapConfig::new().with_strategy(strategy),
            ).unwrap();
            // Each live allocation is filled with its own tag byte.
            let mut live: Vec<(BlockPtr, u64, u8)> = Vec::new();
            let mut tag = 0u8;

            for op in ops {
                match op {
                    Op::Allocate(n) => {
                        if let Ok(ptr) = heap.allocate(n) {
                            tag = tag.wrapping_add(1);
                            prop_assert!(heap.block_size(ptr).unwrap() >= n);
                            heap.bytes_mut(ptr).unwrap()[..n as usize].fill(tag);
                            live.push((ptr, n, tag));
                        }
                    }
                    Op::Free(i) if !live.is_empty() => {
                        let (ptr, _, _) = live.swap_remove(i % live.len());
                        heap.free(ptr).unwrap();
                    }
                    Op::Resize(i, n) if !live.is_empty() => {
                        let i = i % live.len();
                        let (ptr, len, t) = live[i];
                        match heap.resize(ptr, n) {
                            Ok(new_ptr) => {
                                let kept = len.min(n) as usize;
                                prop_assert!(heap.bytes(new_ptr).unwrap()[..kept].iter().all(|&b| b == t));
                                heap.bytes_mut(new_ptr).unwrap()[..n as usize].fill(t);
                                live[i] = (new_ptr, n, t);
                            }
                            Err(HeapError::CapacityExhausted { .. }) => {
                                prop_assert!(heap.block_size(ptr).is_ok());
                            }
                            Err(e) => return Err(TestCaseError::fail(e.to_string())),
                        }
                    }
                    _ => {}
                }

                let stats = heap.check().map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert_eq!(stats.occupied_blocks, live.len());
                prop_assert_eq!(stats.free_bytes + stats.occupied_bytes + stats.metadata_bytes, 4096);
                for &(ptr, len, t) in &live {
                    prop_assert!(heap.bytes(ptr).unwrap()[..len as usize].iter().all(|&b| b == t));
                }
            }

            for (ptr, _, _) in live {
                heap.free(ptr).unwrap();
            }
            prop_assert_eq!(heap.stats().blocks(), 1);
            prop_assert_eq!(heap.largest_free(), 4096 - 40);
        }
    }
}
