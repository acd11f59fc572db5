//! Boot processor GDT and TSS

use bringup::config::{DOUBLE_FAULT_IST_INDEX, GDT_SLOTS};
use bringup::cpu::long_mode::LongModeCpu;
use bringup::cpu::{Bringup, LifecycleState};
use bringup::descriptor::{GdtEntry, Long64, TaskState, TaskState64, TssDescriptor};
use bringup::table::GlobalTable;
use bringup::TableResult;
use spin::Once;
use x86_64::structures::gdt::SegmentSelector;

use super::stack;

#[derive(Debug, Clone, Copy)]
pub struct Selectors {
    pub code: SegmentSelector,
    pub data: SegmentSelector,
    pub tss: SegmentSelector,
}

pub struct Gdt {
    pub table: GlobalTable<Long64, GDT_SLOTS>,
    pub selectors: Selectors,
}

static TSS: Once<TaskState64> = Once::new();
static GDT: Once<Gdt> = Once::new();

/// The boot processor's TSS, at its final address.
pub fn task_state() -> &'static TaskState64 {
    TSS.call_once(|| {
        let mut tss = TaskState64::new();
        tss.set_privilege_stack(0, stack::privilege_stack_top());
        tss.set_interrupt_stack(DOUBLE_FAULT_IST_INDEX, stack::double_fault_stack_top());
        tss
    })
}

/// null, kernel code, kernel data, TSS.
pub fn build() -> TableResult<&'static Gdt> {
    GDT.try_call_once(|| {
        let task = task_state();
        let mut table = GlobalTable::new();
        let code = table.push(GdtEntry::kernel_code::<Long64>())?;
        let data = table.push(GdtEntry::kernel_data())?;
        let tss = table.push_tss(&TssDescriptor::<Long64>::for_task_state(task))?;
        Ok(Gdt {
            table,
            selectors: Selectors { code, data, tss },
        })
    })
}

/// Fills and installs the GDT and the IDT, reloads every segment register
/// and loads TR, all with interrupts masked.
///
/// # Safety
/// Ring 0, boot processor, before any other core can observe the tables.
pub unsafe fn init(cpu: &mut LongModeCpu) -> TableResult<(LifecycleState, Selectors)> {
    let bringup = Bringup::new(cpu);
    let gdt = build()?;
    let selectors = gdt.selectors;
    let idt = super::idt::build(selectors.code)?;
    let state = bringup
        .build(&gdt.table)
        .load()
        .reload(selectors.code, selectors.data)
        .select_task(selectors.tss)
        .install_interrupt_table(idt)
        .finish();
    Ok((state, selectors))
}
