//! Boot-time configuration
//!
//! Everything the bring-up sequence needs to agree on lives here: the GDT
//! layout (and therefore the selector values), table capacities, stack sizes
//! and the diagnostics channel.

use log::LevelFilter;
use x86_64::structures::gdt::SegmentSelector;
use x86_64::PrivilegeLevel;

/// GDT index of the kernel code segment.
pub const KERNEL_CODE_INDEX: u16 = 1;

/// GDT index of the kernel data segment.
pub const KERNEL_DATA_INDEX: u16 = 2;

/// GDT index of the boot processor's TSS descriptor (two slots in long mode).
pub const TSS_INDEX: u16 = 3;

/// Kernel code selector (0x08).
pub const KERNEL_CODE_SELECTOR: SegmentSelector =
    SegmentSelector::new(KERNEL_CODE_INDEX, PrivilegeLevel::Ring0);

/// Kernel data selector (0x10).
pub const KERNEL_DATA_SELECTOR: SegmentSelector =
    SegmentSelector::new(KERNEL_DATA_INDEX, PrivilegeLevel::Ring0);

/// Boot processor TSS selector (0x18).
pub const TSS_SELECTOR: SegmentSelector = SegmentSelector::new(TSS_INDEX, PrivilegeLevel::Ring0);

/// 8-byte slots reserved for the GDT.
///
/// null + code + data + one 16-byte TSS per core for up to 4 cores.
pub const GDT_SLOTS: usize = 3 + 2 * 4;

/// Vectors in the IDT (the full architectural range).
pub const IDT_VECTORS: usize = 256;

/// Number of CPU exception vectors.
pub const EXCEPTION_VECTORS: usize = 32;

/// Size of each kernel stack (32 KiB).
pub const STACK_SIZE: usize = 32 * 1024;

/// IST slot used by the double-fault gate.
pub const DOUBLE_FAULT_IST_INDEX: u8 = 1;

/// First vector used by the remapped legacy PICs.
pub const PIC_VECTOR_BASE: u8 = 0x20;

/// COM1 base port.
pub const COM1: u16 = 0x3F8;

/// QEMU `isa-debug-exit` port.
pub const QEMU_EXIT_PORT: u16 = 0xF4;

/// Most verbose level that reaches the serial log.
pub const LOG_LEVEL: LevelFilter = LevelFilter::Debug;
