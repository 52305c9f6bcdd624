//! Heap lifecycle and allocation entry points.
//!
//! Payload addresses cross the boundary as real pointers into the
//! caller's region; they are translated to and from arena offsets here.

use std::ffi::c_void;
use std::ptr::NonNull;
use std::sync::Mutex;

use carve_core::layout::ALIGN;
use carve_core::{BlockPtr, FitStrategy};
use carve_heap::{Heap, HeapConfig};

use crate::handle::HandleTable;
use crate::region::RawRegion;
use crate::status::CarveStatus;

type RegionHeap = Heap<RawRegion>;

static HEAPS: Mutex<HandleTable<RegionHeap>> = Mutex::new(HandleTable::new());

/// Fit strategy codes accepted by [`carve_set_strategy`].
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CarveStrategy {
    /// Lowest-addressed free block that fits.
    FirstFit = 0,
    /// Smallest free block that fits.
    BestFit = 1,
    /// Largest free block.
    WorstFit = 2,
}

impl From<CarveStrategy> for FitStrategy {
    fn from(s: CarveStrategy) -> Self {
        match s {
            CarveStrategy::FirstFit => FitStrategy::FirstFit,
            CarveStrategy::BestFit => FitStrategy::BestFit,
            CarveStrategy::WorstFit => FitStrategy::WorstFit,
        }
    }
}

impl CarveStrategy {
    fn from_raw(raw: i32) -> Option<Self> {
        [Self::FirstFit, Self::BestFit, Self::WorstFit]
            .into_iter()
            .find(|s| *s as i32 == raw)
    }
}

/// Callback for [`carve_iterate`]: block address, usable size, `1` if
/// free, and the caller's `user_data`.
pub type CarveBlockVisitor =
    extern "C" fn(block: *mut u8, size: u64, is_free: u8, user_data: *mut c_void);

/// Run `f` on the heap behind `handle` with the table locked.
fn with_heap(handle: u64, f: impl FnOnce(&mut RegionHeap) -> i32) -> i32 {
    let mut heaps = ffi_lock!(HEAPS);
    match heaps.get_mut(handle) {
        Some(heap) => f(heap),
        None => CarveStatus::InvalidHandle as i32,
    }
}

/// Translate a caller pointer into the heap's payload pointer type.
///
/// Pointers outside the region map to `BlockPtr(0)`, which no live
/// allocation can have.
fn block_ptr(heap: &RegionHeap, ptr: *const u8) -> BlockPtr {
    BlockPtr(heap.region().offset_of(ptr).unwrap_or(0))
}

/// Initialize an arena over `len` bytes at `region`.
///
/// `region` must be 8-byte aligned and stay valid, untouched by the
/// caller, until [`carve_heap_destroy`]. The heap starts with the
/// first-fit strategy. On success the handle is written to `heap_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn carve_heap_init(region: *mut u8, len: usize, heap_out: *mut u64) -> i32 {
    ffi_guard!({
        if heap_out.is_null() {
            return CarveStatus::InvalidArgument as i32;
        }
        let base = match NonNull::new(region) {
            Some(base) => base,
            None => return CarveStatus::InvalidArgument as i32,
        };
        if (base.as_ptr() as usize) % ALIGN as usize != 0 {
            return CarveStatus::InvalidArgument as i32;
        }
        // SAFETY: the caller lends `len` bytes at `region` until destroy.
        let region = unsafe { RawRegion::new(base, len) };
        let heap = match Heap::init(region, HeapConfig::default()) {
            Ok(heap) => heap,
            Err(e) => return CarveStatus::from(&e) as i32,
        };
        let handle = ffi_lock!(HEAPS).insert(heap);
        // SAFETY: heap_out is valid per caller contract.
        unsafe { *heap_out = handle };
        CarveStatus::Ok as i32
    })
}

/// Destroy a heap. The region goes back to the caller; its contents
/// are left as they are.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn carve_heap_destroy(heap: u64) -> i32 {
    ffi_guard!({
        match ffi_lock!(HEAPS).remove(heap) {
            Some(_) => CarveStatus::Ok as i32,
            None => CarveStatus::InvalidHandle as i32,
        }
    })
}

/// Allocate `size` bytes; the payload address is written to `ptr_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn carve_alloc(heap: u64, size: u64, ptr_out: *mut *mut u8) -> i32 {
    ffi_guard!({
        if ptr_out.is_null() {
            return CarveStatus::InvalidArgument as i32;
        }
        with_heap(heap, |heap| match heap.allocate(size) {
            Ok(ptr) => {
                // SAFETY: ptr_out is valid per caller contract.
                unsafe { *ptr_out = heap.region().address_of(ptr.offset()) };
                CarveStatus::Ok as i32
            }
            Err(e) => CarveStatus::from(&e) as i32,
        })
    })
}

/// Free an allocation made by [`carve_alloc`] or [`carve_resize`].
///
/// Null, foreign and already-freed pointers are rejected with
/// `CARVE_STATUS_INVALID_POINTER`; the heap is left unchanged.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn carve_free(heap: u64, ptr: *mut u8) -> i32 {
    ffi_guard!({
        with_heap(heap, |heap| match heap.free(block_ptr(heap, ptr)) {
            Ok(()) => CarveStatus::Ok as i32,
            Err(e) => CarveStatus::from(&e) as i32,
        })
    })
}

/// Resize an allocation to `new_size` bytes, preserving its contents up
/// to the smaller of the two sizes. The (possibly moved) address is
/// written to `ptr_out`; on failure the original allocation is intact.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn carve_resize(
    heap: u64,
    ptr: *mut u8,
    new_size: u64,
    ptr_out: *mut *mut u8,
) -> i32 {
    ffi_guard!({
        if ptr_out.is_null() {
            return CarveStatus::InvalidArgument as i32;
        }
        with_heap(heap, |heap| match heap.resize(block_ptr(heap, ptr), new_size) {
            Ok(moved) => {
                // SAFETY: ptr_out is valid per caller contract.
                unsafe { *ptr_out = heap.region().address_of(moved.offset()) };
                CarveStatus::Ok as i32
            }
            Err(e) => CarveStatus::from(&e) as i32,
        })
    })
}

/// Select the fit strategy (a [`CarveStrategy`] code) for later
/// allocations.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn carve_set_strategy(heap: u64, strategy: i32) -> i32 {
    ffi_guard!({
        let strategy = match CarveStrategy::from_raw(strategy) {
            Some(s) => FitStrategy::from(s),
            None => return CarveStatus::InvalidArgument as i32,
        };
        with_heap(heap, |heap| {
            heap.set_strategy(strategy);
            CarveStatus::Ok as i32
        })
    })
}

/// Write the usable size of a live allocation to `size_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn carve_block_size(heap: u64, ptr: *const u8, size_out: *mut u64) -> i32 {
    ffi_guard!({
        if size_out.is_null() {
            return CarveStatus::InvalidArgument as i32;
        }
        with_heap(heap, |heap| match heap.block_size(block_ptr(heap, ptr)) {
            Ok(size) => {
                // SAFETY: size_out is valid per caller contract.
                unsafe { *size_out = size };
                CarveStatus::Ok as i32
            }
            Err(e) => CarveStatus::from(&e) as i32,
        })
    })
}

/// Call `visitor` once per block in address order.
///
/// The block list is captured first and the heap table released before
/// the first callback, so `visitor` may call back into this API.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn carve_iterate(
    heap: u64,
    visitor: Option<CarveBlockVisitor>,
    user_data: *mut c_void,
) -> i32 {
    ffi_guard!({
        let visitor = match visitor {
            Some(v) => v,
            None => return CarveStatus::InvalidArgument as i32,
        };
        let mut blocks = Vec::new();
        let status = with_heap(heap, |heap| {
            blocks.extend(
                heap.blocks()
                    .map(|b| (heap.region().address_of(b.offset), b.size, b.is_free())),
            );
            CarveStatus::Ok as i32
        });
        if status != CarveStatus::Ok as i32 {
            return status;
        }
        for (block, size, free) in blocks {
            visitor(block, size, u8::from(free), user_data);
        }
        CarveStatus::Ok as i32
    })
}
