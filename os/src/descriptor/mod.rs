//! Descriptor encoding
//!
//! Pure functions that pack logical fields into the byte records the CPU
//! reads out of the GDT and IDT. Nothing here touches hardware.
//!
//! Every record is serialized field by field at fixed little-endian offsets
//! (`to_bytes` / `from_bytes`), so no layout depends on struct packing.
//!
//! None of the encoders validate their input. An oversized limit, a code
//! segment flagged both 32-bit and 64-bit, or a bogus selector encodes fine
//! and only faults once the CPU uses the entry.

pub mod access;
pub mod gate;
pub mod segment;
pub mod tss;
pub mod width;


pub use access::{type_attr, Access, GateType, SegmentFlags, SystemType};
pub use gate::{encode_idt_gate, IdtGate};
pub use segment::{encode_gdt_entry, GdtEntry, MAX_LIMIT};
pub use tss::{encode_tss_descriptor, Register32, TaskState, TaskState32, TaskState64, TssDescriptor};
pub use width::{Legacy32, Long64, Native, WordWidth};

fn write_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn write_u64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(word)
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(word)
}
