//! Boot self-check
//!
//! Reads the descriptor state back from the CPU and compares it with what
//! bring-up meant to install.

use core::fmt;

use bringup::config::{IDT_VECTORS, KERNEL_CODE_SELECTOR, KERNEL_DATA_SELECTOR, TSS_SELECTOR};
use bringup::cpu::long_mode::LongModeCpu;
use bringup::descriptor::{Long64, SystemType, TaskState};
use bringup::table::{InterruptTable, TablePointer};

use super::gdt::Gdt;
use super::stack;

/// First value that did not match.
#[derive(Debug, Clone, Copy)]
pub struct Mismatch {
    pub what: &'static str,
    pub expected: u64,
    pub found: u64,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {:#x}, found {:#x}",
            self.what, self.expected, self.found
        )
    }
}

fn check(what: &'static str, expected: u64, found: u64) -> Result<(), Mismatch> {
    if expected == found {
        log::trace!("verify: {} = {:#x}", what, found);
        Ok(())
    } else {
        Err(Mismatch {
            what,
            expected,
            found,
        })
    }
}

fn check_pointer(what: &'static str, expected: TablePointer<Long64>, found: TablePointer<Long64>) -> Result<(), Mismatch> {
    check(what, expected.base, found.base)?;
    check(what, u64::from(expected.limit), u64::from(found.limit))
}

pub fn run(
    cpu: &LongModeCpu,
    gdt: &Gdt,
    idt: &InterruptTable<Long64, IDT_VECTORS>,
) -> Result<(), Mismatch> {
    let selectors = gdt.selectors;
    check("code selector", KERNEL_CODE_SELECTOR.0.into(), selectors.code.0.into())?;
    check("data selector", KERNEL_DATA_SELECTOR.0.into(), selectors.data.0.into())?;
    check("tss selector", TSS_SELECTOR.0.into(), selectors.tss.0.into())?;

    let [cs, ss, ds, es, fs, gs] = cpu.segments();
    check("cs", selectors.code.0.into(), cs.0.into())?;
    for (name, reg) in [("ss", ss), ("ds", ds), ("es", es), ("fs", fs), ("gs", gs)] {
        check(name, selectors.data.0.into(), reg.0.into())?;
    }

    check_pointer("gdtr", gdt.table.pointer(), cpu.gdtr())?;
    check_pointer("idtr", idt.pointer(), cpu.idtr())?;
    check("tr", selectors.tss.0.into(), cpu.task_register().0.into())?;

    let tss = super::gdt::task_state();
    let descriptor = gdt
        .table
        .tss_descriptor(selectors.tss)
        .ok_or(Mismatch {
            what: "tss descriptor",
            expected: u64::from(selectors.tss.0),
            found: gdt.table.len() as u64,
        })?;
    check("tss base", tss.address(), descriptor.address())?;
    // ltr marks the descriptor busy.
    check(
        "tss type",
        SystemType::TssBusy as u64,
        descriptor.system_type().map_or(0, |kind| kind as u64),
    )?;
    check("rsp0", stack::privilege_stack_top(), tss.privilege_stack(0))?;

    log::info!("verify: descriptor state matches");
    Ok(())
}

/// Exit codes for QEMU's `isa-debug-exit` device.
#[cfg(feature = "qemu-exit")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum QemuExitCode {
    Success = 0x10,
    Failed = 0x11,
}

#[cfg(feature = "qemu-exit")]
pub fn exit_qemu(code: QemuExitCode) {
    // SAFETY: only meaningful under QEMU with isa-debug-exit on this port;
    // elsewhere the write goes nowhere.
    unsafe { bringup::arch::port::outl(bringup::config::QEMU_EXIT_PORT, code as u32) }
}
