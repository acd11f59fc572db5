//! GDT storage

use core::marker::PhantomData;
use core::sync::atomic::{AtomicU64, Ordering};

use x86_64::structures::gdt::SegmentSelector;
use x86_64::PrivilegeLevel;

use super::{build_table_pointer, TablePointer, MAX_GDT_ENTRIES};
use crate::descriptor::{GdtEntry, TssDescriptor, WordWidth};
use crate::error::{TableError, TableResult};

/// Fixed-capacity GDT of width `W`, made of 8-byte slots.
///
/// Slot 0 is always the null descriptor. A long-mode TSS descriptor takes two
/// consecutive slots. Only the slots pushed so far are covered by
/// [`GlobalTable::pointer`].
///
/// The CPU itself writes into an installed table (`ltr` sets the TSS busy
/// bit, segment loads set accessed bits), so slots are atomics.
#[repr(C, align(16))]
pub struct GlobalTable<W: WordWidth, const SLOTS: usize> {
    slots: [AtomicU64; SLOTS],
    len: usize,
    width: PhantomData<W>,
}

impl<W: WordWidth, const SLOTS: usize> GlobalTable<W, SLOTS> {
    const FITS: () = assert!(
        SLOTS >= 1 && SLOTS <= MAX_GDT_ENTRIES,
        "a GDT holds between 1 and 8192 slots"
    );

    /// A table holding only the null descriptor.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::FITS;
        Self {
            slots: [const { AtomicU64::new(0) }; SLOTS],
            len: 1,
            width: PhantomData,
        }
    }

    /// Appends a code/data descriptor. The selector's RPL is the entry's DPL.
    pub fn push(&mut self, entry: GdtEntry) -> TableResult<SegmentSelector> {
        let index = self.reserve(1)?;
        *self.slots[index].get_mut() = entry.as_u64();
        log::trace!("gdt[{}] = {:#018x}", index, entry.as_u64());
        Ok(SegmentSelector::new(index as u16, entry.access().dpl()))
    }

    /// Appends a TSS descriptor (one slot on 32-bit, two on 64-bit).
    pub fn push_tss(&mut self, descriptor: &TssDescriptor<W>) -> TableResult<SegmentSelector> {
        let index = self.reserve(TssDescriptor::<W>::SLOTS)?;
        let raw = descriptor.to_bytes();
        for (offset, chunk) in raw.as_ref().chunks_exact(GdtEntry::SIZE).enumerate() {
            let mut slot = [0u8; 8];
            slot.copy_from_slice(chunk);
            *self.slots[index + offset].get_mut() = u64::from_le_bytes(slot);
        }
        log::trace!("gdt[{}] = {} TSS at {:#x}", index, W::NAME, descriptor.address());
        Ok(SegmentSelector::new(index as u16, PrivilegeLevel::Ring0))
    }

    fn reserve(&mut self, count: usize) -> TableResult<usize> {
        let required = self.len + count;
        if required > SLOTS {
            return Err(TableError::Full {
                capacity: SLOTS,
                required,
            });
        }
        let index = self.len;
        self.len = required;
        Ok(index)
    }

    fn slot(&self, index: usize) -> Option<u64> {
        self.slots[..self.len].get(index).map(|slot| slot.load(Ordering::Acquire))
    }

    /// Decodes slot `index` as a code/data descriptor.
    pub fn entry(&self, index: usize) -> Option<GdtEntry> {
        self.slot(index).map(GdtEntry::from_u64)
    }

    /// Decodes the TSS descriptor that `selector` points at, as currently
    /// stored (the CPU may have marked it busy).
    pub fn tss_descriptor(&self, selector: SegmentSelector) -> Option<TssDescriptor<W>> {
        let first = usize::from(selector.index());
        let mut raw = W::ZERO;
        for (offset, chunk) in raw.as_mut().chunks_exact_mut(GdtEntry::SIZE).enumerate() {
            chunk.copy_from_slice(&self.slot(first + offset)?.to_le_bytes());
        }
        Some(TssDescriptor::from_bytes(&raw))
    }

    /// Slots in use, including the null descriptor.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn capacity(&self) -> usize {
        SLOTS
    }

    /// Linear address of slot 0.
    pub fn address(&self) -> u64 {
        self.slots.as_ptr() as usize as u64
    }

    /// Snapshot of the used part of the table as the CPU sees it.
    pub fn to_bytes(&self, out: &mut [u8]) -> usize {
        let len = (self.len * GdtEntry::SIZE).min(out.len());
        for (index, chunk) in out[..len].chunks_mut(GdtEntry::SIZE).enumerate() {
            let bytes = self.slots[index].load(Ordering::Acquire).to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
        len
    }

    /// Pointer covering the slots pushed so far.
    pub fn pointer(&self) -> TablePointer<W> {
        build_table_pointer(self.address(), self.len, GdtEntry::SIZE)
    }
}

impl<W: WordWidth, const SLOTS: usize> Default for GlobalTable<W, SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}
