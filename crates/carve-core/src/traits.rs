//! Abstraction over anything that can enumerate an arena's blocks.

use crate::block::BlockInfo;

/// Read-only, in-order enumeration of an arena's blocks.
///
/// This is the only surface debug tooling consumes. Implementations must
/// visit every block exactly once in ascending offset order, covering
/// the arena from the end of its header to `total_size`, and must not
/// mutate anything.
pub trait BlockWalk {
    /// Length of the managed region in bytes, header included.
    fn total_size(&self) -> u64;

    /// Bytes reserved in front of the first block.
    fn header_size(&self) -> u64;

    /// Invoke `visitor` once per block, in ascending offset order.
    fn walk(&self, visitor: &mut dyn FnMut(BlockInfo));
}
