//! The fixed 64 KiB memory map.
//!
//! Addresses range over `$0000..=$FFFF`. The zero page is reserved (the
//! word at `$0000` is pinned to zero so null pointers never dereference),
//! globals allocated by the `@rs` directive follow, then the heap, the
//! input buffer, the two downward-growing stacks, the program image and
//! the argument area. Both stacks grow toward lower addresses.

/// Total bytes addressable by the VM.
pub const MEMORY_SIZE: usize = 0x10000;

/// First address of the `@rs` global-static region.
pub const RS_START: u16 = 0x0100;
/// One past the last `@rs` address.
pub const RS_END: u16 = 0x0400;

/// First address available to the heap allocator.
pub const HEAP_START: u16 = 0x0400;
/// One past the last heap address.
pub const HEAP_MAX: u16 = 0x1400;

/// Input buffer filled by the read-input syscall.
pub const BUFFER_START: u16 = 0x1400;
pub const BUFFER_END: u16 = 0x1800;

/// Data stack: grows downward from [`STACK_TOP`].
pub const STACK_TOP: u16 = 0x23FF;
pub const STACK_BOTTOM: u16 = 0x1800;

/// Call stack: grows downward from [`CALL_STACK_TOP`].
pub const CALL_STACK_TOP: u16 = 0x25FF;
pub const CALL_STACK_BOTTOM: u16 = 0x2400;

/// Program image (`.text` + `.data`) load region.
pub const PRG_BOTTOM: u16 = 0x2600;
pub const PRG_TOP: u16 = 0xF000;

/// Command-line / environment area.
pub const ARG_START: u16 = 0xF000;
