//! Boot IDT
//!
//! Every exception vector gets a fatal stub that logs the frame and halts.
//! Vectors 32 and up stay not-present; the PICs are masked.

use bringup::config::{DOUBLE_FAULT_IST_INDEX, EXCEPTION_VECTORS, IDT_VECTORS};
use bringup::descriptor::{encode_idt_gate, type_attr, GateType, Long64};
use bringup::table::InterruptTable;
use bringup::TableResult;
use spin::Once;
use x86_64::structures::gdt::SegmentSelector;
use x86_64::structures::idt::InterruptStackFrame;
use x86_64::PrivilegeLevel;

const DOUBLE_FAULT_VECTOR: usize = 8;

const EXCEPTION_NAMES: [&str; EXCEPTION_VECTORS] = [
    "divide error",
    "debug",
    "non-maskable interrupt",
    "breakpoint",
    "overflow",
    "bound range exceeded",
    "invalid opcode",
    "device not available",
    "double fault",
    "coprocessor segment overrun",
    "invalid TSS",
    "segment not present",
    "stack-segment fault",
    "general protection fault",
    "page fault",
    "reserved",
    "x87 floating-point",
    "alignment check",
    "machine check",
    "SIMD floating-point",
    "virtualization",
    "control protection",
    "reserved",
    "reserved",
    "reserved",
    "reserved",
    "reserved",
    "reserved",
    "hypervisor injection",
    "VMM communication",
    "security",
    "reserved",
];

fn fatal_exception(vector: usize, error_code: Option<u64>, frame: &InterruptStackFrame) -> ! {
    log::error!(
        "exception {} ({}), error code {:?}",
        vector,
        EXCEPTION_NAMES[vector],
        error_code
    );
    log::error!("{:#?}", frame);
    super::halt()
}

macro_rules! fatal_stub {
    ($name:ident, $vector:expr) => {
        extern "x86-interrupt" fn $name(frame: InterruptStackFrame) -> ! {
            fatal_exception($vector, None, &frame)
        }
    };
    ($name:ident, $vector:expr, error_code) => {
        extern "x86-interrupt" fn $name(frame: InterruptStackFrame, code: u64) -> ! {
            fatal_exception($vector, Some(code), &frame)
        }
    };
}

fatal_stub!(vector_0, 0);
fatal_stub!(vector_1, 1);
fatal_stub!(vector_2, 2);
fatal_stub!(vector_3, 3);
fatal_stub!(vector_4, 4);
fatal_stub!(vector_5, 5);
fatal_stub!(vector_6, 6);
fatal_stub!(vector_7, 7);
fatal_stub!(vector_8, 8, error_code);
fatal_stub!(vector_9, 9);
fatal_stub!(vector_10, 10, error_code);
fatal_stub!(vector_11, 11, error_code);
fatal_stub!(vector_12, 12, error_code);
fatal_stub!(vector_13, 13, error_code);
fatal_stub!(vector_14, 14, error_code);
fatal_stub!(vector_15, 15);
fatal_stub!(vector_16, 16);
fatal_stub!(vector_17, 17, error_code);
fatal_stub!(vector_18, 18);
fatal_stub!(vector_19, 19);
fatal_stub!(vector_20, 20);
fatal_stub!(vector_21, 21, error_code);
fatal_stub!(vector_22, 22);
fatal_stub!(vector_23, 23);
fatal_stub!(vector_24, 24);
fatal_stub!(vector_25, 25);
fatal_stub!(vector_26, 26);
fatal_stub!(vector_27, 27);
fatal_stub!(vector_28, 28);
fatal_stub!(vector_29, 29, error_code);
fatal_stub!(vector_30, 30, error_code);
fatal_stub!(vector_31, 31);

fn stubs() -> [u64; EXCEPTION_VECTORS] {
    [
        vector_0 as usize as u64,
        vector_1 as usize as u64,
        vector_2 as usize as u64,
        vector_3 as usize as u64,
        vector_4 as usize as u64,
        vector_5 as usize as u64,
        vector_6 as usize as u64,
        vector_7 as usize as u64,
        vector_8 as usize as u64,
        vector_9 as usize as u64,
        vector_10 as usize as u64,
        vector_11 as usize as u64,
        vector_12 as usize as u64,
        vector_13 as usize as u64,
        vector_14 as usize as u64,
        vector_15 as usize as u64,
        vector_16 as usize as u64,
        vector_17 as usize as u64,
        vector_18 as usize as u64,
        vector_19 as usize as u64,
        vector_20 as usize as u64,
        vector_21 as usize as u64,
        vector_22 as usize as u64,
        vector_23 as usize as u64,
        vector_24 as usize as u64,
        vector_25 as usize as u64,
        vector_26 as usize as u64,
        vector_27 as usize as u64,
        vector_28 as usize as u64,
        vector_29 as usize as u64,
        vector_30 as usize as u64,
        vector_31 as usize as u64,
    ]
}

static IDT: Once<InterruptTable<Long64, IDT_VECTORS>> = Once::new();

/// Builds the boot IDT once. Gates use `code` as their segment.
pub fn build(code: SegmentSelector) -> TableResult<&'static InterruptTable<Long64, IDT_VECTORS>> {
    IDT.try_call_once(|| {
        let mut idt = InterruptTable::new();
        let attr = type_attr(GateType::Interrupt, PrivilegeLevel::Ring0);
        for (vector, handler) in stubs().into_iter().enumerate() {
            let ist = if vector == DOUBLE_FAULT_VECTOR {
                DOUBLE_FAULT_IST_INDEX
            } else {
                0
            };
            idt.set_gate(vector, encode_idt_gate(handler, code, ist, attr))?;
        }
        Ok(idt)
    })
}
