//! Table and pointer tests

use x86_64::PrivilegeLevel;

use super::*;
use crate::descriptor::{
    encode_idt_gate, encode_tss_descriptor, type_attr, GateType, GdtEntry, Legacy32, Long64, SystemType,
    TaskState64, TssDescriptor,
};
use crate::error::TableError;

#[test]
fn pointer_limit_is_count_times_size_minus_one() {
    for count in 1..=8191usize {
        let pointer = build_table_pointer::<Long64>(0x1000, count, 8);
        assert_eq!(usize::from(pointer.limit), count * 8 - 1);
    }
    for count in 1..=4095usize {
        let pointer = build_table_pointer::<Long64>(0x1000, count, 16);
        assert_eq!(usize::from(pointer.limit), count * 16 - 1);
    }
}

#[test]
fn pointer_serialization_per_width() {
    let long = build_table_pointer::<Long64>(0xFFFF_8000_0012_3450, 3, 8);
    assert_eq!(
        long.to_bytes(),
        [23, 0, 0x50, 0x34, 0x12, 0x00, 0x00, 0x80, 0xFF, 0xFF]
    );
    assert_eq!(TablePointer::<Long64>::from_bytes(&long.to_bytes()), long);

    let legacy = build_table_pointer::<Legacy32>(0x0012_3450, 256, 8);
    assert_eq!(legacy.to_bytes(), [0xFF, 0x07, 0x50, 0x34, 0x12, 0x00]);
    assert_eq!(TablePointer::<Legacy32>::from_bytes(&legacy.to_bytes()), legacy);
}

#[test]
fn pointer_bounds() {
    let pointer = build_table_pointer::<Long64>(0, 3, 8);
    assert_eq!(pointer.span(), 24);
    assert!(pointer.covers(16, 8));
    assert!(!pointer.covers(24, 8));
    assert!(!pointer.covers(16, 16));
}

#[test]
fn three_entry_gdt_has_limit_23() {
    let mut gdt = GlobalTable::<Long64, 8>::new();
    let code = gdt.push(GdtEntry::kernel_code::<Long64>()).unwrap();
    let data = gdt.push(GdtEntry::kernel_data()).unwrap();

    assert_eq!(code.0, 0x08);
    assert_eq!(data.0, 0x10);
    assert_eq!(gdt.len(), 3);

    let pointer = gdt.pointer();
    assert_eq!(pointer.limit, 23);
    assert_eq!(pointer.base, gdt.address());
    let mut bytes = [0xAAu8; 32];
    assert_eq!(gdt.to_bytes(&mut bytes), 24);
    assert_eq!(&bytes[..8], &[0; 8]);
    assert_eq!(&bytes[8..16], &GdtEntry::kernel_code::<Long64>().to_bytes());
    assert_eq!(&bytes[24..], &[0xAA; 8]);
}

#[test]
fn long_mode_tss_takes_two_slots() {
    let tss = TaskState64::new();
    let mut gdt = GlobalTable::<Long64, 8>::new();
    gdt.push(GdtEntry::kernel_code::<Long64>()).unwrap();
    gdt.push(GdtEntry::kernel_data()).unwrap();
    let descriptor = TssDescriptor::<Long64>::for_task_state(&tss);
    let selector = gdt.push_tss(&descriptor).unwrap();
    let next = gdt.push(GdtEntry::user_data()).unwrap();

    assert_eq!(selector.0, 0x18);
    assert_eq!(gdt.len(), 6);
    assert_eq!(next.index(), 5);
    assert_eq!(gdt.pointer().limit, 47);
    assert_eq!(gdt.tss_descriptor(selector), Some(descriptor));
    let mut bytes = [0u8; 48];
    gdt.to_bytes(&mut bytes);
    assert_eq!(&bytes[24..40], &descriptor.to_bytes());
}

#[test]
fn protected_mode_tss_takes_one_slot() {
    let mut gdt = GlobalTable::<Legacy32, 4>::new();
    let descriptor = encode_tss_descriptor(0x0010_0000, SystemType::Tss);
    let selector = gdt.push_tss(&descriptor).unwrap();

    assert_eq!(selector.index(), 1);
    assert_eq!(gdt.len(), 2);
    assert_eq!(gdt.tss_descriptor(selector), Some(descriptor));
    assert_eq!(gdt.pointer().to_bytes().len(), 6);
    assert_eq!(gdt.pointer().limit, 15);
}

#[test]
fn selector_rpl_follows_descriptor_dpl() {
    let mut gdt = GlobalTable::<Long64, 8>::new();
    gdt.push(GdtEntry::kernel_code::<Long64>()).unwrap();
    gdt.push(GdtEntry::kernel_data()).unwrap();
    let user_data = gdt.push(GdtEntry::user_data()).unwrap();
    let user_code = gdt.push(GdtEntry::user_code::<Long64>()).unwrap();

    assert_eq!(user_data.0, 0x1B);
    assert_eq!(user_code.0, 0x23);
    assert_eq!(user_code.rpl(), PrivilegeLevel::Ring3);
}

#[test]
fn full_gdt_reports_capacity() {
    let mut gdt = GlobalTable::<Long64, 3>::new();
    gdt.push(GdtEntry::kernel_code::<Long64>()).unwrap();
    let tss = encode_tss_descriptor(0x1000, SystemType::Tss);

    assert_eq!(
        gdt.push_tss(&tss),
        Err(TableError::Full {
            capacity: 3,
            required: 4
        })
    );
    assert_eq!(gdt.len(), 2);
    assert!(gdt.push(GdtEntry::kernel_data()).is_ok());
    assert!(gdt.push(GdtEntry::kernel_data()).is_err());
}

#[test]
fn entries_read_back() {
    let mut gdt = GlobalTable::<Long64, 4>::new();
    gdt.push(GdtEntry::kernel_data()).unwrap();

    assert_eq!(gdt.entry(0), Some(GdtEntry::null()));
    assert_eq!(gdt.entry(1), Some(GdtEntry::kernel_data()));
    assert_eq!(gdt.entry(2), None);
}

#[test]
fn idt_covers_every_vector() {
    let idt = InterruptTable::<Long64, 256>::new();
    assert_eq!(idt.pointer().limit, 4095);
    assert_eq!(idt.as_bytes().len(), 4096);
    assert!(idt.as_bytes().iter().all(|&b| b == 0));

    let legacy = InterruptTable::<Legacy32, 256>::new();
    assert_eq!(legacy.pointer().limit, 2047);
}

#[test]
fn idt_gates_land_at_vector_offsets() {
    let mut idt = InterruptTable::<Long64, 64>::new();
    let gate = encode_idt_gate::<Long64>(
        0xFFFF_FFFF_8000_1234,
        crate::config::KERNEL_CODE_SELECTOR,
        1,
        type_attr(GateType::Interrupt, PrivilegeLevel::Ring0),
    );
    idt.set_gate(8, gate).unwrap();

    assert_eq!(idt.gate(8), Some(gate));
    assert!(!idt.gate(7).unwrap().is_present());
    assert_eq!(&idt.as_bytes()[8 * 16..9 * 16], &gate.to_bytes());
    assert_eq!(
        idt.set_gate(64, gate),
        Err(TableError::VectorOutOfRange {
            vector: 64,
            vectors: 64
        })
    );
}
