//! Error types for the Carve allocator.
//!
//! Every failure is local and synchronous: operations return a
//! [`HeapError`] to their immediate caller and leave the arena exactly
//! as it was before the call.

use std::error::Error;
use std::fmt;

use crate::id::BlockPtr;

/// Errors reported by heap operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeapError {
    /// The region cannot host an arena (too small, misaligned, too large).
    /// No arena is created.
    InvalidConfiguration {
        /// Why the region was rejected.
        reason: String,
    },
    /// No free block is large enough for the request. The caller may
    /// retry after freeing other blocks.
    CapacityExhausted {
        /// Bytes requested, before alignment.
        requested: u64,
        /// Usable size of the largest free block at the time of the call.
        largest_free: u64,
    },
    /// A size or strategy argument was rejected (e.g. a zero-byte request).
    InvalidArgument {
        /// Human-readable description of the rejected argument.
        reason: String,
    },
    /// The pointer does not name a live allocation: it was never
    /// returned by `allocate`, or it has already been freed.
    InvalidPointer {
        /// The offending pointer.
        ptr: BlockPtr,
    },
    /// Arena metadata failed validation while being traversed.
    Corrupted {
        /// Offset of the metadata that failed validation.
        offset: u64,
        /// What was wrong with it.
        reason: String,
    },
}

impl HeapError {
    /// Shorthand for [`HeapError::Corrupted`].
    pub fn corrupted(offset: u64, reason: impl Into<String>) -> Self {
        Self::Corrupted {
            offset,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfiguration { reason } => {
                write!(f, "invalid arena configuration: {reason}")
            }
            Self::CapacityExhausted {
                requested,
                largest_free,
            } => {
                write!(
                    f,
                    "arena capacity exhausted: requested {requested} bytes, largest free block {largest_free} bytes"
                )
            }
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            Self::InvalidPointer { ptr } => {
                write!(f, "pointer {ptr} does not name a live allocation")
            }
            Self::Corrupted { offset, reason } => {
                write!(f, "arena metadata corrupted at offset {offset:#x}: {reason}")
            }
        }
    }
}

impl Error for HeapError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_the_numbers() {
        let e = HeapError::CapacityExhausted {
            requested: 2048,
            largest_free: 2008,
        };
        let msg = e.to_string();
        assert!(msg.contains("2048"));
        assert!(msg.contains("2008"));
    }

    #[test]
    fn invalid_pointer_shows_hex_address() {
        let e = HeapError::InvalidPointer { ptr: BlockPtr(48) };
        assert_eq!(e.to_string(), "pointer 0x0030 does not name a live allocation");
    }

    #[test]
    fn corrupted_helper() {
        let e = HeapError::corrupted(24, "bad link");
        assert!(matches!(e, HeapError::Corrupted { offset: 24, .. }));
    }
}
