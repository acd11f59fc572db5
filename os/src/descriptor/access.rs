//! Access byte, flags nibble and gate attribute encodings

use bitflags::bitflags;
use x86_64::PrivilegeLevel;

use super::width::WordWidth;

bitflags! {
    /// Access byte shared by code/data and system descriptors.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Access: u8 {
        const PRESENT = 1 << 7;
        /// Two-bit DPL field; use [`Access::with_dpl`] to set a ring.
        const DPL = 0b11 << 5;
        /// Set for code/data segments, clear for system descriptors.
        const DESCRIPTOR_TYPE = 1 << 4;
        const EXECUTABLE = 1 << 3;
        /// Expand-down for data, conforming for code.
        const DIRECTION_CONFORMING = 1 << 2;
        /// Writable for data, readable for code.
        const READ_WRITE = 1 << 1;
        const ACCESSED = 1 << 0;
    }
}

impl Access {
    /// Present, readable, executable code segment at ring 0.
    pub const CODE: Self = Self::PRESENT
        .union(Self::DESCRIPTOR_TYPE)
        .union(Self::EXECUTABLE)
        .union(Self::READ_WRITE);

    /// Present, writable, expand-up data segment at ring 0.
    pub const DATA: Self = Self::PRESENT
        .union(Self::DESCRIPTOR_TYPE)
        .union(Self::READ_WRITE);

    /// Replaces the DPL field.
    pub const fn with_dpl(self, dpl: PrivilegeLevel) -> Self {
        Self::from_bits_retain((self.bits() & !Self::DPL.bits()) | ((dpl as u8) << 5))
    }

    /// Reads the DPL field.
    pub fn dpl(self) -> PrivilegeLevel {
        PrivilegeLevel::from_u16(u16::from((self.bits() & Self::DPL.bits()) >> 5))
    }

    /// Access byte of a present ring-0 system descriptor of the given type.
    pub const fn system(kind: SystemType) -> Self {
        Self::from_bits_retain(Self::PRESENT.bits() | kind as u8)
    }
}

bitflags! {
    /// Upper nibble of the `flags_and_limit_high` byte, kept at its byte position.
    ///
    /// `DEFAULT_32` and `LONG_MODE` must not both be set. The encoder does not
    /// enforce this.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SegmentFlags: u8 {
        /// Limit counts 4 KiB pages instead of bytes.
        const GRANULARITY = 1 << 7;
        /// 32-bit default operand size.
        const DEFAULT_32 = 1 << 6;
        /// 64-bit code segment.
        const LONG_MODE = 1 << 5;
        /// Available for system software.
        const AVAILABLE = 1 << 4;
    }
}

/// Type field of a system descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemType {
    Tss16 = 0x1,
    Ldt = 0x2,
    Tss16Busy = 0x3,
    /// Available 32-bit TSS in protected mode, 64-bit TSS in long mode.
    Tss = 0x9,
    TssBusy = 0xB,
}

impl SystemType {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0x0F {
            0x1 => Some(Self::Tss16),
            0x2 => Some(Self::Ldt),
            0x3 => Some(Self::Tss16Busy),
            0x9 => Some(Self::Tss),
            0xB => Some(Self::TssBusy),
            _ => None,
        }
    }

    /// Available (not busy) TSS of either size.
    pub fn is_task_state(self) -> bool {
        matches!(self, Self::Tss16 | Self::Tss)
    }

    /// Whether `ltr` accepts a descriptor of this type at width `W`.
    ///
    /// Long mode only knows the 64-bit TSS; 16-bit TSS types are invalid there.
    pub fn is_loadable_task<W: WordWidth>(self) -> bool {
        match W::SYSTEM_ENTRY_SIZE {
            16 => self == Self::Tss,
            _ => self.is_task_state(),
        }
    }

    /// The type `ltr` leaves behind in the descriptor.
    pub fn busy(self) -> Self {
        match self {
            Self::Tss16 => Self::Tss16Busy,
            Self::Tss => Self::TssBusy,
            other => other,
        }
    }
}

/// Gate type nibble of an IDT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GateType {
    /// Clears IF on entry.
    Interrupt = 0x0E,
    /// Leaves IF untouched.
    Trap = 0x0F,
}

/// Builds a gate `type_attr` byte: present, `dpl`, `gate`.
pub const fn type_attr(gate: GateType, dpl: PrivilegeLevel) -> u8 {
    Access::PRESENT.bits() | ((dpl as u8) << 5) | gate as u8
}
