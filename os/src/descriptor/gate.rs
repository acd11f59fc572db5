//! IDT interrupt and trap gates

use core::marker::PhantomData;

use bit_field::BitField;
use x86_64::structures::gdt::SegmentSelector;

use super::access::{Access, GateType};
use super::width::WordWidth;
use super::{read_u16, read_u32, write_u16, write_u32};

/// One IDT entry.
///
/// 32-bit: `offset_low:u16 | selector:u16 | zero:u8 | type_attr:u8 | offset_mid:u16`.
/// 64-bit: `offset_low:u16 | selector:u16 | ist:u8 | type_attr:u8 | offset_mid:u16 |
/// offset_high:u32 | reserved:u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdtGate<W: WordWidth> {
    pub offset_low: u16,
    pub selector: u16,
    /// IST slot (1..=7) or 0 for "stay on the current stack". Zero on 32-bit.
    pub ist: u8,
    pub type_attr: u8,
    pub offset_mid: u16,
    /// Handler bits 32..64; zero and not serialized on 32-bit.
    pub offset_high: u32,
    pub reserved: u32,
    width: PhantomData<W>,
}

/// Builds a gate to `handler` through code segment `selector`.
///
/// `stack_table_index` only exists in long mode and is ignored on 32-bit.
pub fn encode_idt_gate<W: WordWidth>(
    handler: u64,
    selector: SegmentSelector,
    stack_table_index: u8,
    type_attr: u8,
) -> IdtGate<W> {
    let handler = handler & W::ADDRESS_MASK;
    let long_mode = W::SYSTEM_ENTRY_SIZE == 16;
    IdtGate {
        offset_low: handler.get_bits(0..16) as u16,
        selector: selector.0,
        ist: if long_mode { stack_table_index } else { 0 },
        type_attr,
        offset_mid: handler.get_bits(16..32) as u16,
        offset_high: handler.get_bits(32..64) as u32,
        reserved: 0,
        width: PhantomData,
    }
}

impl<W: WordWidth> IdtGate<W> {
    /// A non-present gate; any vector pointing at it raises #NP.
    pub fn missing() -> Self {
        Self::from_bytes(&W::ZERO)
    }

    pub fn handler(&self) -> u64 {
        u64::from(self.offset_low) | u64::from(self.offset_mid) << 16 | u64::from(self.offset_high) << 32
    }

    pub fn selector(&self) -> SegmentSelector {
        SegmentSelector(self.selector)
    }

    pub fn is_present(&self) -> bool {
        self.type_attr & Access::PRESENT.bits() != 0
    }

    pub fn gate_type(&self) -> Option<GateType> {
        match self.type_attr & 0x0F {
            0x0E => Some(GateType::Interrupt),
            0x0F => Some(GateType::Trap),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> W::Raw {
        let mut raw = W::ZERO;
        let out = raw.as_mut();
        write_u16(out, 0, self.offset_low);
        write_u16(out, 2, self.selector);
        out[4] = self.ist;
        out[5] = self.type_attr;
        write_u16(out, 6, self.offset_mid);
        if out.len() == 16 {
            write_u32(out, 8, self.offset_high);
            write_u32(out, 12, self.reserved);
        }
        raw
    }

    pub fn from_bytes(raw: &W::Raw) -> Self {
        let bytes = raw.as_ref();
        let (offset_high, reserved) = if bytes.len() == 16 {
            (read_u32(bytes, 8), read_u32(bytes, 12))
        } else {
            (0, 0)
        };
        Self {
            offset_low: read_u16(bytes, 0),
            selector: read_u16(bytes, 2),
            ist: bytes[4],
            type_attr: bytes[5],
            offset_mid: read_u16(bytes, 6),
            offset_high,
            reserved,
            width: PhantomData,
        }
    }
}
