//! Code/data segment descriptors (8-byte GDT entries)

use bit_field::BitField;
use x86_64::PrivilegeLevel;

use super::access::{Access, SegmentFlags};
use super::width::WordWidth;
use super::{read_u16, write_u16};

/// Largest limit a descriptor can hold (20 bits).
pub const MAX_LIMIT: u32 = 0xF_FFFF;

/// One GDT entry, field for field.
///
/// Byte layout: `limit_low:u16 | base_low:u16 | base_middle:u8 | access:u8 |
/// flags_limit:u8 | base_high:u8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GdtEntry {
    pub limit_low: u16,
    pub base_low: u16,
    pub base_middle: u8,
    pub access: u8,
    /// Low nibble: limit bits 16..20. High nibble: [`SegmentFlags`].
    pub flags_limit: u8,
    pub base_high: u8,
}

/// Packs `base`, `limit`, `access` and `flags` into a GDT entry.
///
/// `limit` must fit in 20 bits; higher bits are dropped. Pick
/// [`SegmentFlags::GRANULARITY`] to describe regions above 1 MiB.
pub fn encode_gdt_entry(base: u32, limit: u32, access: Access, flags: SegmentFlags) -> GdtEntry {
    GdtEntry {
        limit_low: limit.get_bits(0..16) as u16,
        base_low: base.get_bits(0..16) as u16,
        base_middle: base.get_bits(16..24) as u8,
        access: access.bits(),
        flags_limit: (flags.bits() & 0xF0) | limit.get_bits(16..20) as u8,
        base_high: base.get_bits(24..32) as u8,
    }
}

impl GdtEntry {
    pub const SIZE: usize = 8;

    /// The mandatory first entry.
    pub const fn null() -> Self {
        Self {
            limit_low: 0,
            base_low: 0,
            base_middle: 0,
            access: 0,
            flags_limit: 0,
            base_high: 0,
        }
    }

    /// Flat 4 GiB ring-0 code segment for width `W`.
    pub fn kernel_code<W: WordWidth>() -> Self {
        Self::flat(Access::CODE, W::CODE_FLAGS)
    }

    /// Flat 4 GiB ring-0 data segment.
    pub fn kernel_data() -> Self {
        Self::flat(Access::DATA, SegmentFlags::GRANULARITY | SegmentFlags::DEFAULT_32)
    }

    /// Flat ring-3 code segment for width `W`.
    pub fn user_code<W: WordWidth>() -> Self {
        Self::flat(Access::CODE.with_dpl(PrivilegeLevel::Ring3), W::CODE_FLAGS)
    }

    /// Flat ring-3 data segment.
    pub fn user_data() -> Self {
        Self::flat(
            Access::DATA.with_dpl(PrivilegeLevel::Ring3),
            SegmentFlags::GRANULARITY | SegmentFlags::DEFAULT_32,
        )
    }

    fn flat(access: Access, flags: SegmentFlags) -> Self {
        encode_gdt_entry(0, MAX_LIMIT, access, flags)
    }

    pub fn base(&self) -> u32 {
        let mut base = 0u32;
        base.set_bits(0..16, u32::from(self.base_low));
        base.set_bits(16..24, u32::from(self.base_middle));
        base.set_bits(24..32, u32::from(self.base_high));
        base
    }

    pub fn limit(&self) -> u32 {
        u32::from(self.limit_low) | u32::from(self.flags_limit & 0x0F) << 16
    }

    pub fn access(&self) -> Access {
        Access::from_bits_retain(self.access)
    }

    pub fn flags(&self) -> SegmentFlags {
        SegmentFlags::from_bits_retain(self.flags_limit & 0xF0)
    }

    pub fn is_present(&self) -> bool {
        self.access().contains(Access::PRESENT)
    }

    pub fn to_bytes(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        write_u16(&mut out, 0, self.limit_low);
        write_u16(&mut out, 2, self.base_low);
        out[4] = self.base_middle;
        out[5] = self.access;
        out[6] = self.flags_limit;
        out[7] = self.base_high;
        out
    }

    pub fn from_bytes(bytes: &[u8; 8]) -> Self {
        Self {
            limit_low: read_u16(bytes, 0),
            base_low: read_u16(bytes, 2),
            base_middle: bytes[4],
            access: bytes[5],
            flags_limit: bytes[6],
            base_high: bytes[7],
        }
    }

    /// The entry as the little-endian quadword stored in a table slot.
    pub fn as_u64(&self) -> u64 {
        u64::from_le_bytes(self.to_bytes())
    }

    pub fn from_u64(raw: u64) -> Self {
        Self::from_bytes(&raw.to_le_bytes())
    }
}
