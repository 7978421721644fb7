//! Segregated free-list allocator for freestanding, `no_std` embedded targets.
//!
//! This crate provides [`Allocator`], which implements
//! [`core::alloc::GlobalAlloc`], the trait required to use the
//! [`alloc`-crate][alloc] on `#![no_std]` targets. Unlike a general-purpose
//! allocator, every request is rounded up to one of 13 fixed size classes and
//! served either from a per-class free list or by carving fresh memory off the top
//! of the heap. There is no coalescing and no splitting: this keeps every
//! operation O(1) (aside from a linear scan over at most 14 classes), at the cost
//! of some internal fragmentation.
//!
//! # Usage
//! On real hardware the heap bounds come from the linker script, via the symbols
//! `__heap_start` and `__heap_end`:
//! ```no_run
//! #[global_allocator]
//! static ALLOCATOR: segalloc::Allocator = segalloc::Allocator::new();
//!
//! extern crate alloc;
//! ```
//! Your linker script must define `__heap_start` and `__heap_end` somewhere in
//! unused RAM, and the final binary must supply `fast_fill`/`fast_copy` as
//! `extern "C"` symbols, typically hand-tuned routines for the target — see
//! [`fill`] and [`copy`], the safe wrappers built on top of them.
//!
//! For hosted use (tests, simulation, anything without a linker script), use
//! [`heap_bounds::OwnedHeap`] instead:
//! ```
//! use segalloc::{Allocator, heap_bounds::OwnedHeap};
//!
//! static ALLOCATOR: Allocator<OwnedHeap<4096>> = Allocator::with_region(OwnedHeap::new());
//! let ptr = ALLOCATOR.allocate(64);
//! assert!(!ptr.is_null());
//! ALLOCATOR.free(ptr);
//! ```
//!
//! # Implementation
//! Every block is a header (exactly 32 bytes on every target) followed by a
//! payload. On `allocate(n)`:
//! 1.  `n` is rounded up (with the header) to the smallest size class that fits.
//! 2.  If that class's free list is non-empty, the most recently freed block
//!     (LIFO) is popped and reused.
//! 3.  Otherwise a fresh block is carved from the frontier, the never-yet-used
//!     portion of the heap.
//!
//! ```text
//! heap:  [ header | payload ][ header | payload ][            unused            ]
//!        ^-- class 0, live  ^-- class 1, live    ^-- frontier
//! ```
//! `free(ptr)` reads the header immediately before `ptr`, checks its magic
//! sentinel, and either:
//! - rewinds the frontier, if the block sits at the very top of the heap, or
//! - pushes the block onto its class's free list for later reuse.
//!
//! A pointer that fails the magic check (a double free, a foreign pointer, a
//! corrupted header) is silently ignored rather than causing undefined behavior.
//!
//! Requests wider than the largest size class (256 MiB) are still served — carved
//! at their raw rounded size — but are never placed on a free list, since a
//! same-sized future request is not guaranteed and reusing the slot for a
//! differently-sized request would corrupt the free-list chain of whichever class
//! that request belongs to.
//!
//! [alloc]: https://doc.rust-lang.org/alloc/index.html
#![cfg_attr(not(test), no_std)]

mod aligned;
mod bulk;
pub mod heap_bounds;
mod raw_allocator;

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::NonNull;

use heap_bounds::{HeapRegion, LinkerHeap, OwnedHeap};
use raw_allocator::RawAllocator;

pub use bulk::{compare, copy, fill};

/// Payload alignment every plain allocation already satisfies, below which
/// [`Allocator::allocate`] is used directly instead of [`Allocator::allocate_aligned`].
const MIN_GUARANTEED_ALIGN: usize = 32;

/// The memory allocator.
///
/// Generic over where its backing memory lives: [`heap_bounds::LinkerHeap`] (the
/// default) reads linker-provided symbols for real hardware;
/// [`heap_bounds::OwnedHeap`] owns an in-process buffer for hosted use.
///
/// Usage: assign to a `static` and apply `#[global_allocator]`. See the
/// [crate-level documentation](crate) for details.
pub struct Allocator<R: HeapRegion = LinkerHeap> {
    region: R,
    raw: spin::Mutex<RawAllocator>,
}

impl Allocator<LinkerHeap> {
    /// Creates a new allocator reading its heap bounds from the linker-provided
    /// `__heap_start`/`__heap_end` symbols.
    #[must_use = "assign the allocator to a static variable and apply the `#[global_allocator]`-attribute to make it the global allocator"]
    pub const fn new() -> Self {
        Self::with_region(LinkerHeap::new())
    }
}

impl<const N: usize> Allocator<OwnedHeap<N>> {
    /// Creates a new allocator backed by an owned, `N`-byte in-process buffer.
    ///
    /// # Panics
    /// Panics (at construction) if `N` is smaller than 32 or not a multiple of 32.
    #[must_use = "assign the allocator to a static variable and apply the `#[global_allocator]`-attribute to make it the global allocator"]
    pub const fn new() -> Self {
        Self::with_region(OwnedHeap::new())
    }
}

impl<R: HeapRegion> Allocator<R> {
    /// Creates a new allocator over an explicit [`HeapRegion`].
    pub const fn with_region(region: R) -> Self {
        Self { region, raw: spin::Mutex::new(RawAllocator::new()) }
    }

    /// Address of the first byte of the managed heap.
    pub fn heap_start_addr(&self) -> usize {
        self.region.start()
    }

    /// Address one past the last byte of the managed heap.
    pub fn heap_end_addr(&self) -> usize {
        self.region.end()
    }

    /// Total size of the managed heap, in bytes.
    pub fn heap_size(&self) -> usize {
        self.heap_end_addr() - self.heap_start_addr()
    }

    /// Bytes currently accounted as live (sum of physical footprints of all
    /// outstanding allocations). Exposed for diagnostics and tests.
    pub fn used(&self) -> usize {
        self.raw.lock().used()
    }

    /// Allocates `size` bytes, aligned to the allocator's minimum guarantee (32
    /// bytes). Returns a null pointer on out-of-memory.
    pub fn allocate(&self, size: usize) -> *mut u8 {
        let (start, end) = (self.region.start(), self.region.end());
        // SAFETY: `region` guarantees `[start, end)` is valid, writable, and
        // exclusively ours for the lifetime of `self`.
        unsafe {
            self.raw
                .lock()
                .allocate(start, end, size)
                .map_or(core::ptr::null_mut(), NonNull::as_ptr)
        }
    }

    /// Releases a block previously returned by [`Allocator::allocate`]. A null
    /// pointer or one that fails validation is silently ignored.
    pub fn free(&self, ptr: *mut u8) {
        if let Some(ptr) = NonNull::new(ptr) {
            // SAFETY: caller guarantees `ptr` either came from this allocator or
            // points at arbitrary readable memory; the magic check inside makes
            // the latter harmless.
            let _ = unsafe { self.raw.lock().free(ptr) };
        }
    }

    /// Allocates `size` bytes at an address aligned to `1 << align_shift`.
    pub fn allocate_aligned(&self, size: usize, align_shift: u8) -> *mut u8 {
        let (start, end) = (self.region.start(), self.region.end());
        // SAFETY: same reasoning as `allocate`.
        unsafe {
            aligned::allocate_aligned(&mut self.raw.lock(), start, end, size, align_shift)
                .map_or(core::ptr::null_mut(), NonNull::as_ptr)
        }
    }

    /// Releases a block previously returned by [`Allocator::allocate_aligned`].
    pub fn free_aligned(&self, ptr: *mut u8) {
        if let Some(ptr) = NonNull::new(ptr) {
            // SAFETY: caller guarantees `ptr` came from `allocate_aligned` on this
            // allocator and has not yet been freed.
            unsafe { aligned::free_aligned(&mut self.raw.lock(), ptr) };
        }
    }
}

// SAFETY: `region` is read-only after construction and `raw` is guarded by a
// `spin::Mutex`; concurrent callers only ever observe a consistent allocator
// state, never torn writes.
unsafe impl<R: HeapRegion> GlobalAlloc for Allocator<R> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() <= MIN_GUARANTEED_ALIGN {
            self.allocate(layout.size())
        } else {
            self.allocate_aligned(layout.size(), layout.align().trailing_zeros() as u8)
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if layout.align() <= MIN_GUARANTEED_ALIGN {
            self.free(ptr);
        } else {
            self.free_aligned(ptr);
        }
    }
}
