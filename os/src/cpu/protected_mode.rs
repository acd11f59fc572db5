//! Protected-mode (i386) CPU access

use core::arch::asm;

use bit_field::BitField;
use x86_64::structures::gdt::SegmentSelector;

use super::DescriptorHardware;
use crate::descriptor::Legacy32;
use crate::table::{TableKind, TablePointer};

const EFLAGS_IF: usize = 9;

/// The executing i386 core.
pub struct ProtectedModeCpu {
    _private: (),
}

impl ProtectedModeCpu {
    /// # Safety
    /// Must run at CPL 0, and only one handle may drive a core at a time.
    pub const unsafe fn current() -> Self {
        Self { _private: () }
    }
}

impl DescriptorHardware for ProtectedModeCpu {
    type Width = Legacy32;

    unsafe fn install_table(&mut self, kind: TableKind, pointer: &TablePointer<Legacy32>) {
        let raw = pointer.to_bytes();
        match kind {
            TableKind::Gdt => asm!("lgdt [{}]", in(reg) raw.as_ptr(), options(readonly, nostack, preserves_flags)),
            TableKind::Idt => asm!("lidt [{}]", in(reg) raw.as_ptr(), options(readonly, nostack, preserves_flags)),
        }
    }

    unsafe fn select_task(&mut self, selector: SegmentSelector) {
        asm!("ltr {0:x}", in(reg) selector.0, options(nostack, preserves_flags));
    }

    unsafe fn reload_segments(&mut self, code: SegmentSelector, data: SegmentSelector) {
        asm!(
            "mov ss, {data:x}",
            "mov ds, {data:x}",
            "mov es, {data:x}",
            "mov fs, {data:x}",
            "mov gs, {data:x}",
            "push {code:e}",
            "lea {target:e}, [2f]",
            "push {target:e}",
            "retf",
            "2:",
            data = in(reg) data.0,
            code = in(reg) u32::from(code.0),
            target = out(reg) _,
            options(preserves_flags),
        );
    }

    fn interrupts_enabled(&self) -> bool {
        let flags: usize;
        // SAFETY: pushes and pops one word; reads EFLAGS only.
        unsafe {
            asm!("pushfd", "pop {}", out(reg) flags, options(nomem, preserves_flags));
        }
        flags.get_bit(EFLAGS_IF)
    }

    fn disable_interrupts(&mut self) {
        // SAFETY: masking interrupts cannot break memory safety.
        unsafe {
            asm!("cli", options(nomem, nostack));
        }
    }

    unsafe fn enable_interrupts(&mut self) {
        asm!("sti", options(nomem, nostack));
    }
}
