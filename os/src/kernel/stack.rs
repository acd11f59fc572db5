//! Boot processor stacks
//!
//! Live in .bss, which the bootloader maps with the rest of the image.

use bringup::config::STACK_SIZE;

/// Stacks grow down, so the TSS gets the top, not the base.
#[repr(align(16))]
pub struct Stack([u8; STACK_SIZE]);

impl Stack {
    const fn new() -> Self {
        Self([0; STACK_SIZE])
    }
}

// `static mut` keeps them writable; only the CPU touches the bytes.
static mut PRIVILEGE_STACK: Stack = Stack::new();
static mut DOUBLE_FAULT_STACK: Stack = Stack::new();

/// `(base, top)` of a stack, by address only.
fn bounds(stack: *const Stack) -> (u64, u64) {
    let base = stack as u64;
    (base, base + STACK_SIZE as u64)
}

/// Ring-0 stack the CPU switches to on entry from ring 3 (rsp0).
pub fn privilege_stack_top() -> u64 {
    bounds(&raw const PRIVILEGE_STACK).1
}

/// Known-good stack for #DF (IST1), so a kernel stack overflow still reports.
pub fn double_fault_stack_top() -> u64 {
    bounds(&raw const DOUBLE_FAULT_STACK).1
}

pub fn log_layout() {
    let (rsp0_base, rsp0_top) = bounds(&raw const PRIVILEGE_STACK);
    let (ist_base, ist_top) = bounds(&raw const DOUBLE_FAULT_STACK);
    log::debug!(
        "stacks: rsp0 {:#x}..{:#x}, ist1 {:#x}..{:#x}",
        rsp0_base,
        rsp0_top,
        ist_base,
        ist_top
    );
}
