//! Descriptor tables and the pointers that describe them
//!
//! A table pointer is the `(limit, base)` pair `lgdt`/`lidt` consume. The CPU
//! only reads `limit + 1` bytes starting at `base` and keeps no other
//! reference to the table, so the entry array must stay put for as long as
//! any core may use it.

mod gdt;
mod idt;

#[cfg(test)]
mod tests;

use core::marker::PhantomData;

use crate::descriptor::WordWidth;

pub use gdt::GlobalTable;
pub use idt::InterruptTable;

/// Most 8-byte entries a 16-bit limit can describe.
pub const MAX_GDT_ENTRIES: usize = 8192;

/// Which descriptor-table register a pointer is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Gdt,
    Idt,
}

/// `(limit, base)` of an in-memory table.
///
/// Serialized as `limit:u16` followed by a base of `W::ADDRESS_BYTES` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TablePointer<W: WordWidth> {
    pub limit: u16,
    pub base: u64,
    width: PhantomData<W>,
}

/// Describes `count` entries of `entry_size` bytes starting at `address`.
///
/// `limit` is `count * entry_size - 1`. Callers keep the table within 8192
/// eight-byte or 4096 sixteen-byte entries; beyond that the limit wraps.
pub fn build_table_pointer<W: WordWidth>(address: u64, count: usize, entry_size: usize) -> TablePointer<W> {
    TablePointer {
        limit: count.wrapping_mul(entry_size).wrapping_sub(1) as u16,
        base: address & W::ADDRESS_MASK,
        width: PhantomData,
    }
}

impl<W: WordWidth> TablePointer<W> {
    /// Bytes of table reachable through this pointer.
    pub fn span(&self) -> usize {
        usize::from(self.limit) + 1
    }

    /// Whether `len` bytes at `offset` lie inside the limit.
    pub fn covers(&self, offset: usize, len: usize) -> bool {
        len > 0 && offset + len <= self.span()
    }

    pub fn to_bytes(&self) -> W::PointerRaw {
        let mut raw = W::ZERO_POINTER;
        let out = raw.as_mut();
        out[..2].copy_from_slice(&self.limit.to_le_bytes());
        out[2..].copy_from_slice(&self.base.to_le_bytes()[..W::ADDRESS_BYTES]);
        raw
    }

    pub fn from_bytes(raw: &W::PointerRaw) -> Self {
        let bytes = raw.as_ref();
        let mut base = [0u8; 8];
        base[..W::ADDRESS_BYTES].copy_from_slice(&bytes[2..2 + W::ADDRESS_BYTES]);
        Self {
            limit: u16::from_le_bytes([bytes[0], bytes[1]]),
            base: u64::from_le_bytes(base),
            width: PhantomData,
        }
    }
}
