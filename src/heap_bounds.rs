//! Abstraction over where the managed heap's bytes physically live.
//!
//! On real hardware the two bounds come from the linker script (`__heap_start` /
//! `__heap_end`); under test there is no linker script, so the test binaries use
//! [`OwnedHeap`] instead, an in-process buffer that reports its own address range.

use core::mem::MaybeUninit;

/// Supplies the inclusive-exclusive `[start, end)` byte range the allocator may use.
///
/// # Safety
/// Implementors must guarantee that `[start(), end())` is a valid range of readable and
/// writable memory for as long as the implementing value is alive, that `end() >=
/// start()`, and that no other code writes into that range while the allocator is in
/// use.
pub unsafe trait HeapRegion {
    /// Address of the first byte the allocator may use.
    fn start(&self) -> usize;
    /// Address one past the last byte the allocator may use.
    fn end(&self) -> usize;
}

extern "C" {
    // Defined by the linker script; only their addresses are meaningful, never their
    // contents, hence the `u8` placeholder type.
    static __heap_start: u8;
    static __heap_end: u8;
}

/// The production [`HeapRegion`]: reads the heap bounds the linker placed in the
/// binary's address space.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkerHeap;

impl LinkerHeap {
    /// Creates a handle onto the linker-provided heap region.
    pub const fn new() -> Self {
        Self
    }
}

// SAFETY: `__heap_start`/`__heap_end` are provided by the linker script and are
// expected to bound a region reserved exclusively for this allocator.
unsafe impl HeapRegion for LinkerHeap {
    fn start(&self) -> usize {
        // SAFETY: only the address of the symbol is taken, never dereferenced.
        unsafe { &__heap_start as *const u8 as usize }
    }

    fn end(&self) -> usize {
        // SAFETY: only the address of the symbol is taken, never dereferenced.
        unsafe { &__heap_end as *const u8 as usize }
    }
}

/// A self-contained, host-testable [`HeapRegion`] that owns its backing bytes.
///
/// This is the hosted stand-in for real RAM used by this crate's own test suite and
/// available to any downstream user who wants to simulate a heap without a linker
/// script (fuzzing, property tests, playground examples).
#[repr(align(32))]
pub struct OwnedHeap<const N: usize>(MaybeUninit<[u8; N]>);

impl<const N: usize> OwnedHeap<N> {
    /// Creates a new, uninitialized heap of `N` bytes.
    pub const fn new() -> Self {
        assert!(N >= 32, "heap must be large enough for at least one block");
        assert!(N % 32 == 0, "heap size must be a multiple of the block alignment");
        Self(MaybeUninit::uninit())
    }
}

impl<const N: usize> Default for OwnedHeap<N> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: the buffer is exclusively owned by this value; `start`/`end` bound exactly
// the `N` bytes backing it.
unsafe impl<const N: usize> HeapRegion for OwnedHeap<N> {
    fn start(&self) -> usize {
        self.0.as_ptr() as usize
    }

    fn end(&self) -> usize {
        self.0.as_ptr() as usize + N
    }
}
