//! Raw byte-buffer allocator contract.
//!
//! The table stores references into caller-owned memory and only touches
//! an allocator on the opt-in release paths (`remove_free`/`clear_free`).
//! The contract mirrors the fail-fast discipline of the surrounding
//! system: exhaustion is fatal, never a returned error, so callers do not
//! null-check. Implementations signal exhaustion through
//! [`std::alloc::handle_alloc_error`], which aborts the process.
//!
//! Raw-pointer handling is confined to this module and to the table's two
//! `unsafe` release methods.

use core::ptr::NonNull;
use std::alloc::{self, handle_alloc_error, Layout};

/// Allocator for plain byte buffers (align 1).
///
/// All sizes must be non-zero. `free` and `realloc` require a pointer
/// previously returned by this allocator with the matching size.
pub trait BufferAlloc {
    /// Allocate `size` uninitialized bytes. Fatal on exhaustion.
    fn alloc(&self, size: usize) -> NonNull<u8>;

    /// Allocate `count * size` zeroed bytes. Fatal on exhaustion or
    /// arithmetic overflow.
    fn calloc(&self, count: usize, size: usize) -> NonNull<u8>;

    /// Resize a buffer, preserving the prefix. Fatal on exhaustion.
    ///
    /// # Safety
    /// `ptr` must come from this allocator with size `old_size`, and must
    /// not be used again after the call.
    unsafe fn realloc(&self, ptr: NonNull<u8>, old_size: usize, new_size: usize) -> NonNull<u8>;

    /// Release a buffer.
    ///
    /// # Safety
    /// `ptr` must come from this allocator with size `size` and must not
    /// have been released already.
    unsafe fn free(&self, ptr: NonNull<u8>, size: usize);
}

fn byte_layout(size: usize) -> Layout {
    assert!(size > 0, "zero-sized buffer request");
    // A request beyond isize::MAX takes the same fatal path as exhaustion.
    Layout::array::<u8>(size).unwrap_or_else(|_| handle_alloc_error(Layout::new::<u8>()))
}

/// Process-heap implementation of [`BufferAlloc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Heap;

impl BufferAlloc for Heap {
    fn alloc(&self, size: usize) -> NonNull<u8> {
        let layout = byte_layout(size);
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc::alloc(layout) };
        NonNull::new(ptr).unwrap_or_else(|| handle_alloc_error(layout))
    }

    fn calloc(&self, count: usize, size: usize) -> NonNull<u8> {
        let total = count
            .checked_mul(size)
            .unwrap_or_else(|| handle_alloc_error(Layout::new::<u8>()));
        let layout = byte_layout(total);
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        NonNull::new(ptr).unwrap_or_else(|| handle_alloc_error(layout))
    }

    unsafe fn realloc(&self, ptr: NonNull<u8>, old_size: usize, new_size: usize) -> NonNull<u8> {
        let old_layout = byte_layout(old_size);
        let new_layout = byte_layout(new_size);
        let grown = alloc::realloc(ptr.as_ptr(), old_layout, new_layout.size());
        NonNull::new(grown).unwrap_or_else(|| handle_alloc_error(new_layout))
    }

    unsafe fn free(&self, ptr: NonNull<u8>, size: usize) {
        alloc::dealloc(ptr.as_ptr(), byte_layout(size));
    }
}
