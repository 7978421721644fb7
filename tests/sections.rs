//! Exercises invariants of [`segalloc::heap_bounds::OwnedHeap`] that only show up
//! once the allocator is placed in a real binary's memory layout: that its backing
//! bytes end up in `.bss` rather than `.data`, and that the address range handed
//! out to the allocator core is exactly the 32-byte-aligned range the header
//! format and size-class rounding (invariants 3 and 4 of the block header) assume.
//!
//! The `.data`-section typically contains the non-zero-initialized global
//! variables, so your `static X: u32 = 42` will show up there. Crucially, this is
//! also the home of partly-initialized memory (i.e. if not all bytes are zeroed).
//! This, however, needs not just the actually used RAM but also flash (on most
//! micro-controllers and embedded devices): the initialization data for the
//! variables in `.data` (hence the name). So: every variable in `.data` also
//! shows up in the non-volatile flash. This is fine and expected.
//!
//! This is bad for an allocator that owns its backing bytes directly
//! (`OwnedHeap`): if it were located in `.data`, the whole initial heap would be
//! stored in non-volatile flash, despite starting out entirely uninitialized.
//! `LinkerHeap`-backed allocators carry no buffer of their own (they only store
//! the addresses of linker-provided symbols), so this concern is specific to
//! `OwnedHeap` and does not apply to them.

use std::alloc::{GlobalAlloc, Layout};
use std::ptr;

use segalloc::heap_bounds::OwnedHeap;

const HEAP_BYTES: usize = 128 * 1024 * 1024;

static ALLOCATOR: segalloc::Allocator<OwnedHeap<HEAP_BYTES>> =
    segalloc::Allocator::<OwnedHeap<HEAP_BYTES>>::new();

#[cfg(all(target_arch = "x86_64", target_os = "linux"))] // this is only tested on Linux
#[test]
fn owned_heap_is_not_placed_in_data() {
    // Just use the allocator in order to make sure that it will actually remain
    // in the binary.
    // SAFETY: we just use the allocator as intended.
    unsafe {
        let layout = Layout::new::<u64>();
        let ptr = ALLOCATOR.alloc(layout);
        ALLOCATOR.dealloc(ptr, layout);
    }

    let memory_map = MemoryMap::new();
    let bss_start = memory_map.bss_start;
    let data_end = memory_map.data_end;
    assert_eq!(bss_start, data_end, "test assumes bss directly after data");

    let addr_allocator = ptr::addr_of!(ALLOCATOR) as usize;
    assert!(addr_allocator >= bss_start, "allocator is placed in .data");
}

#[test]
fn owned_heap_bounds_satisfy_header_alignment_invariant() {
    // Block footprints are always a multiple of 32 (invariant 3), which only
    // holds structurally if the region they're carved from starts 32-aligned.
    assert_eq!(ALLOCATOR.heap_start_addr() % 32, 0, "OwnedHeap is not 32-byte aligned");
    assert_eq!(ALLOCATOR.heap_size(), HEAP_BYTES);
    assert_eq!(ALLOCATOR.heap_end_addr() - ALLOCATOR.heap_start_addr(), HEAP_BYTES);
}

#[test]
fn allocations_stay_within_the_declared_heap_bounds() {
    // Invariant 4: every byte of every live block lies within [heap_start, heap_end).
    let layout = Layout::new::<[u8; 4096]>();
    let ptr = unsafe { ALLOCATOR.alloc(layout) };
    assert!(!ptr.is_null());

    let addr = ptr as usize;
    assert!(addr >= ALLOCATOR.heap_start_addr());
    assert!(addr + layout.size() <= ALLOCATOR.heap_end_addr());

    unsafe { ALLOCATOR.dealloc(ptr, layout) };
}

/// The (at runtime) reconstructed memory map containing addresses of sections.
struct MemoryMap {
    /// The end of the `.data`-section.
    data_end: usize,
    /// The start address of the `.bss`-section.
    bss_start: usize,
}
impl MemoryMap {
    pub fn new() -> Self {
        // The symbols defined in the (default) linker script
        extern "C" {
            static __bss_start: usize;
            static _edata: usize;
        }

        Self {
            data_end: unsafe { ptr::addr_of!(__bss_start) } as usize,
            bss_start: unsafe { ptr::addr_of!(_edata) } as usize,
        }
    }
}
