//! C ABI for the Carve arena allocator.
//!
//! Mirrors the classic `mem_init` / `mem_alloc` / `mem_free` surface
//! over caller-owned memory. Heaps are addressed by generation-checked
//! `u64` handles; every entry point returns a [`CarveStatus`] code and
//! writes results through out-pointers. The generated header lands in
//! `include/carve.h`.
//!
//! All heaps live in one process-wide table behind a single mutex, so
//! calls from different threads are serialized.
//!
//! This is the only crate in the workspace that contains `unsafe` code.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

/// Run an FFI body, converting a panic into [`CarveStatus::Panicked`].
///
/// The body is a closure, so `return` inside it yields the status code.
macro_rules! ffi_guard {
    ($body:block) => {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| -> i32 { $body })) {
            Ok(code) => code,
            Err(_) => $crate::status::CarveStatus::Panicked as i32,
        }
    };
}

/// Lock a mutex inside [`ffi_guard!`], returning
/// [`CarveStatus::InternalError`] if an earlier panic poisoned it.
macro_rules! ffi_lock {
    ($mutex:expr) => {
        match $mutex.lock() {
            Ok(guard) => guard,
            Err(_) => return $crate::status::CarveStatus::InternalError as i32,
        }
    };
}

mod handle;
pub mod heap;
mod region;
pub mod status;

pub use heap::{
    carve_alloc, carve_block_size, carve_free, carve_heap_destroy, carve_heap_init,
    carve_iterate, carve_resize, carve_set_strategy, CarveBlockVisitor, CarveStrategy,
};
pub use status::CarveStatus;
