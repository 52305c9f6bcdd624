//! Caller-owned memory viewed as a byte slice.

use std::ptr::NonNull;
use std::slice;

/// A region of `len` bytes at `base`, handed over by a C caller.
///
/// The caller guarantees the memory stays valid, and is touched by
/// nobody else, until the heap built on it is destroyed.
pub(crate) struct RawRegion {
    base: NonNull<u8>,
    len: usize,
}

impl RawRegion {
    /// # Safety
    ///
    /// `base` must be valid for reads and writes of `len` bytes for the
    /// whole lifetime of the returned value, with no other access.
    #[allow(unsafe_code)]
    pub unsafe fn new(base: NonNull<u8>, len: usize) -> Self {
        Self { base, len }
    }

    /// Offset of `ptr` from the region start, if it lies inside.
    pub fn offset_of(&self, ptr: *const u8) -> Option<u64> {
        let offset = (ptr as usize).checked_sub(self.base.as_ptr() as usize)?;
        (offset < self.len).then_some(offset as u64)
    }

    /// Address of the byte at `offset`.
    pub fn address_of(&self, offset: u64) -> *mut u8 {
        self.base.as_ptr().wrapping_add(offset as usize)
    }
}

// SAFETY: the region is exclusively owned by the heap wrapping it, and
// that heap is only reached through the global table's mutex.
#[allow(unsafe_code)]
unsafe impl Send for RawRegion {}

impl AsRef<[u8]> for RawRegion {
    #[allow(unsafe_code)]
    fn as_ref(&self) -> &[u8] {
        // SAFETY: valid for `len` bytes per the constructor contract.
        unsafe { slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }
}

impl AsMut<[u8]> for RawRegion {
    #[allow(unsafe_code)]
    fn as_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above; `&mut self` rules out aliasing through us.
        unsafe { slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
    }
}
