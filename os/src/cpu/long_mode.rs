//! Long-mode CPU access
//!
//! `lgdt`, `lidt`, `ltr` and the interrupt flag go through the `x86_64`
//! crate. The reload trampoline is hand-written: a far return is the one
//! control transfer that reloads CS the same way in every mode.

use core::arch::asm;

use x86_64::instructions::interrupts;
use x86_64::instructions::tables::{lgdt, lidt, load_tss, sgdt, sidt};
use x86_64::registers::segmentation::{Segment, CS, DS, ES, FS, GS, SS};
use x86_64::structures::gdt::SegmentSelector;
use x86_64::structures::DescriptorTablePointer;
use x86_64::VirtAddr;

use super::DescriptorHardware;
use crate::descriptor::Long64;
use crate::table::{TableKind, TablePointer};

/// The executing x86-64 core.
pub struct LongModeCpu {
    _private: (),
}

impl LongModeCpu {
    /// # Safety
    /// Must run at CPL 0, and only one handle may drive a core at a time.
    pub const unsafe fn current() -> Self {
        Self { _private: () }
    }

    /// Reads GDTR back.
    pub fn gdtr(&self) -> TablePointer<Long64> {
        to_table_pointer(sgdt())
    }

    /// Reads IDTR back.
    pub fn idtr(&self) -> TablePointer<Long64> {
        to_table_pointer(sidt())
    }

    /// Reads TR back.
    pub fn task_register(&self) -> SegmentSelector {
        let selector: u16;
        // SAFETY: `str` only reads the task register.
        unsafe {
            asm!("str {0:x}", out(reg) selector, options(nomem, nostack, preserves_flags));
        }
        SegmentSelector(selector)
    }

    /// Current `[cs, ss, ds, es, fs, gs]`.
    pub fn segments(&self) -> [SegmentSelector; 6] {
        [
            CS::get_reg(),
            SS::get_reg(),
            DS::get_reg(),
            ES::get_reg(),
            FS::get_reg(),
            GS::get_reg(),
        ]
    }
}

fn to_table_pointer(raw: DescriptorTablePointer) -> TablePointer<Long64> {
    crate::table::build_table_pointer(raw.base.as_u64(), usize::from(raw.limit) + 1, 1)
}

impl DescriptorHardware for LongModeCpu {
    type Width = Long64;

    unsafe fn install_table(&mut self, kind: TableKind, pointer: &TablePointer<Long64>) {
        let raw = DescriptorTablePointer {
            limit: pointer.limit,
            base: VirtAddr::new_truncate(pointer.base),
        };
        match kind {
            TableKind::Gdt => lgdt(&raw),
            TableKind::Idt => lidt(&raw),
        }
    }

    unsafe fn select_task(&mut self, selector: SegmentSelector) {
        load_tss(selector);
    }

    unsafe fn reload_segments(&mut self, code: SegmentSelector, data: SegmentSelector) {
        asm!(
            "mov ss, {data:x}",
            "mov ds, {data:x}",
            "mov es, {data:x}",
            "mov fs, {data:x}",
            "mov gs, {data:x}",
            "push {code}",
            "lea {target}, [rip + 2f]",
            "push {target}",
            "retfq",
            "2:",
            data = in(reg) data.0,
            code = in(reg) u64::from(code.0),
            target = out(reg) _,
            options(preserves_flags),
        );
    }

    fn interrupts_enabled(&self) -> bool {
        interrupts::are_enabled()
    }

    fn disable_interrupts(&mut self) {
        interrupts::disable();
    }

    unsafe fn enable_interrupts(&mut self) {
        interrupts::enable();
    }
}
