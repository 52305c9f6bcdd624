//! C-compatible status codes.
//!
//! [`CarveStatus`] is a `repr(i32)` enum; `Ok` is 0 and every error is
//! negative. Values are ABI-stable.

use carve_core::HeapError;

/// Status code returned by every FFI function.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CarveStatus {
    /// Success.
    Ok = 0,
    /// Heap handle is invalid or was already destroyed.
    InvalidHandle = -1,
    /// A null out-pointer, zero size, unaligned region or unknown strategy.
    InvalidArgument = -2,
    /// The region cannot host an arena (too short, too long, or not a
    /// multiple of the alignment unit).
    InvalidConfiguration = -3,
    /// No free block can satisfy the request.
    CapacityExhausted = -4,
    /// The pointer is not a live allocation of this heap.
    InvalidPointer = -5,
    /// The arena's metadata is inconsistent.
    Corrupted = -6,
    /// Internal error (e.g. poisoned mutex after a prior panic).
    InternalError = -7,
    /// A Rust panic was caught at the FFI boundary.
    Panicked = -128,
}

impl From<&HeapError> for CarveStatus {
    fn from(e: &HeapError) -> Self {
        match e {
            HeapError::InvalidConfiguration { .. } => CarveStatus::InvalidConfiguration,
            HeapError::CapacityExhausted { .. } => CarveStatus::CapacityExhausted,
            HeapError::InvalidArgument { .. } => CarveStatus::InvalidArgument,
            HeapError::InvalidPointer { .. } => CarveStatus::InvalidPointer,
            HeapError::Corrupted { .. } => CarveStatus::Corrupted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carve_core::BlockPtr;

    #[test]
    fn status_code_values_are_stable() {
        assert_eq!(CarveStatus::Ok as i32, 0);
        assert_eq!(CarveStatus::InvalidHandle as i32, -1);
        assert_eq!(CarveStatus::InvalidArgument as i32, -2);
        assert_eq!(CarveStatus::InvalidConfiguration as i32, -3);
        assert_eq!(CarveStatus::CapacityExhausted as i32, -4);
        assert_eq!(CarveStatus::InvalidPointer as i32, -5);
        assert_eq!(CarveStatus::Corrupted as i32, -6);
        assert_eq!(CarveStatus::InternalError as i32, -7);
        assert_eq!(CarveStatus::Panicked as i32, -128);
    }

    #[test]
    fn heap_error_to_status() {
        assert_eq!(
            CarveStatus::from(&HeapError::CapacityExhausted {
                requested: 64,
                largest_free: 0
            }),
            CarveStatus::CapacityExhausted
        );
        assert_eq!(
            CarveStatus::from(&HeapError::InvalidPointer { ptr: BlockPtr(8) }),
            CarveStatus::InvalidPointer
        );
        assert_eq!(
            CarveStatus::from(&HeapError::InvalidConfiguration { reason: "x".into() }),
            CarveStatus::InvalidConfiguration
        );
        assert_eq!(
            CarveStatus::from(&HeapError::InvalidArgument { reason: "x".into() }),
            CarveStatus::InvalidArgument
        );
        assert_eq!(
            CarveStatus::from(&HeapError::corrupted(0, "x")),
            CarveStatus::Corrupted
        );
    }
}
