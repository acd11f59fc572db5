//! Simulated CPU for host tests
//!
//! Models the parts of the descriptor machinery the bring-up sequence
//! touches: GDTR/IDTR, the visible segment registers, TR, the interrupt flag
//! and the ring-3 -> ring-0 stack switch. Descriptors are decoded straight out
//! of the installed table memory, so the tests check the bytes the real CPU
//! would read. Bad selectors produce a recorded fault instead of a state
//! change, like a #GP would.

use core::sync::atomic::{AtomicU64, Ordering};

use x86_64::structures::gdt::SegmentSelector;

use super::DescriptorHardware;
use crate::descriptor::{Access, GdtEntry, IdtGate, SystemType, TaskState, TssDescriptor, WordWidth};
use crate::table::{TableKind, TablePointer};

/// Bit position of the access byte inside a descriptor quadword.
const ACCESS_SHIFT: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Cli,
    Sti,
    Install(TableKind),
    Reload { code: u16, data: u16 },
    Ltr(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// #GP: selector outside the limit, or the wrong kind of descriptor.
    GeneralProtection(u16),
    /// #NP: descriptor or gate not present.
    NotPresent(u16),
    /// #TS: TR does not lead to a usable TSS.
    InvalidTss(u16),
}

pub struct SimulatedCpu<W: WordWidth> {
    pub gdtr: Option<TablePointer<W>>,
    pub idtr: Option<TablePointer<W>>,
    pub cs: u16,
    pub ss: u16,
    pub ds: u16,
    pub es: u16,
    pub fs: u16,
    pub gs: u16,
    pub tr: u16,
    pub rsp: u64,
    pub interrupts: bool,
    pub events: Vec<Event>,
    pub faults: Vec<Fault>,
}

impl<W: WordWidth> SimulatedCpu<W> {
    /// A core as left by the bootloader: its own CS/DS values, no TR.
    pub fn new(interrupts: bool) -> Self {
        Self {
            gdtr: None,
            idtr: None,
            cs: 0x28,
            ss: 0x30,
            ds: 0x30,
            es: 0x30,
            fs: 0x30,
            gs: 0x30,
            tr: 0,
            rsp: 0x7_0000,
            interrupts,
            events: Vec::new(),
            faults: Vec::new(),
        }
    }

    pub fn data_segments(&self) -> [u16; 5] {
        [self.ss, self.ds, self.es, self.fs, self.gs]
    }

    /// `len` bytes of the table behind `pointer` at `offset`, if within its limit.
    fn table_bytes(pointer: &TablePointer<W>, offset: usize, len: usize) -> Option<&'static [u8]> {
        if !pointer.covers(offset, len) {
            return None;
        }
        // SAFETY: tests only install tables leaked to `'static`, and the
        // range was checked against the limit they were built with.
        Some(unsafe { core::slice::from_raw_parts((pointer.base as usize + offset) as *const u8, len) })
    }

    fn gdt_bytes(&self, selector: u16, len: usize) -> Option<&'static [u8]> {
        let pointer = self.gdtr.as_ref()?;
        Self::table_bytes(pointer, usize::from(selector >> 3) * GdtEntry::SIZE, len)
    }

    fn segment(&self, selector: u16) -> Result<GdtEntry, Fault> {
        if selector >> 3 == 0 {
            return Err(Fault::GeneralProtection(selector));
        }
        let bytes = self
            .gdt_bytes(selector, GdtEntry::SIZE)
            .ok_or(Fault::GeneralProtection(selector))?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        let entry = GdtEntry::from_bytes(&raw);
        if !entry.access().contains(Access::DESCRIPTOR_TYPE) {
            return Err(Fault::GeneralProtection(selector));
        }
        if !entry.is_present() {
            return Err(Fault::NotPresent(selector));
        }
        Ok(entry)
    }

    fn task_descriptor(&self, selector: u16) -> Option<TssDescriptor<W>> {
        let bytes = self.gdt_bytes(selector, W::SYSTEM_ENTRY_SIZE)?;
        let mut raw = W::ZERO;
        raw.as_mut().copy_from_slice(bytes);
        Some(TssDescriptor::from_bytes(&raw))
    }

    /// `ltr` rewrites the descriptor's type to busy with a locked RMW on
    /// the first slot, in the installed table itself.
    fn mark_busy(&self, selector: u16, kind: SystemType) {
        let Some(pointer) = self.gdtr.as_ref() else {
            return;
        };
        let offset = usize::from(selector >> 3) * GdtEntry::SIZE;
        let busy_bits = u64::from((kind as u8) ^ (kind.busy() as u8)) << ACCESS_SHIFT;
        // SAFETY: `task_descriptor` just read this slot within the limit of a
        // leaked `GlobalTable`, whose slots are `AtomicU64`s.
        let slot = unsafe { &*((pointer.base as usize + offset) as *const AtomicU64) };
        slot.fetch_or(busy_bits, Ordering::SeqCst);
    }

    /// An interrupt arriving while the core runs at ring 3: the CPU switches
    /// to the ring-0 stack named in the current TSS. Returns the new RSP.
    pub fn ring_transition(&mut self) -> Result<u64, Fault> {
        let descriptor = self.task_descriptor(self.tr).ok_or(Fault::InvalidTss(self.tr))?;
        let usable = matches!(descriptor.system_type(), Some(SystemType::Tss | SystemType::TssBusy));
        if self.tr >> 3 == 0 || !usable {
            return Err(Fault::InvalidTss(self.tr));
        }
        // SAFETY: the descriptor was written from a live `W::TaskState` that
        // the test keeps alive for the whole run.
        let tss = unsafe { &*(descriptor.address() as usize as *const W::TaskState) };
        self.rsp = tss.privilege_stack(0);
        Ok(self.rsp)
    }

    /// Looks up the gate for `vector` the way interrupt delivery does.
    pub fn gate(&self, vector: u8) -> Result<IdtGate<W>, Fault> {
        let error_code = u16::from(vector) << 3 | 0b10;
        let pointer = self.idtr.as_ref().ok_or(Fault::GeneralProtection(error_code))?;
        let bytes = Self::table_bytes(pointer, usize::from(vector) * W::SYSTEM_ENTRY_SIZE, W::SYSTEM_ENTRY_SIZE)
            .ok_or(Fault::GeneralProtection(error_code))?;
        let mut raw = W::ZERO;
        raw.as_mut().copy_from_slice(bytes);
        let gate = IdtGate::from_bytes(&raw);
        if !gate.is_present() {
            return Err(Fault::NotPresent(error_code));
        }
        self.segment(gate.selector)?;
        Ok(gate)
    }
}

impl<W: WordWidth> DescriptorHardware for SimulatedCpu<W> {
    type Width = W;

    unsafe fn install_table(&mut self, kind: TableKind, pointer: &TablePointer<W>) {
        self.events.push(Event::Install(kind));
        match kind {
            TableKind::Gdt => self.gdtr = Some(*pointer),
            TableKind::Idt => self.idtr = Some(*pointer),
        }
    }

    unsafe fn select_task(&mut self, selector: SegmentSelector) {
        self.events.push(Event::Ltr(selector.0));
        let Some(descriptor) = self.task_descriptor(selector.0) else {
            self.faults.push(Fault::GeneralProtection(selector.0));
            return;
        };
        let kind = match descriptor.system_type() {
            Some(kind) if selector.index() != 0 && kind.is_loadable_task::<W>() => kind,
            _ => {
                self.faults.push(Fault::GeneralProtection(selector.0));
                return;
            }
        };
        if !descriptor.access().contains(Access::PRESENT) {
            self.faults.push(Fault::NotPresent(selector.0));
            return;
        }
        self.mark_busy(selector.0, kind);
        self.tr = selector.0;
    }

    unsafe fn reload_segments(&mut self, code: SegmentSelector, data: SegmentSelector) {
        self.events.push(Event::Reload {
            code: code.0,
            data: data.0,
        });
        match self.segment(data.0) {
            Ok(entry) if !entry.access().contains(Access::EXECUTABLE) => {
                self.ss = data.0;
                self.ds = data.0;
                self.es = data.0;
                self.fs = data.0;
                self.gs = data.0;
            }
            Ok(_) => {
                self.faults.push(Fault::GeneralProtection(data.0));
                return;
            }
            Err(fault) => {
                self.faults.push(fault);
                return;
            }
        }
        match self.segment(code.0) {
            Ok(entry) if entry.access().contains(Access::EXECUTABLE) => self.cs = code.0,
            Ok(_) => self.faults.push(Fault::GeneralProtection(code.0)),
            Err(fault) => self.faults.push(fault),
        }
    }

    fn interrupts_enabled(&self) -> bool {
        self.interrupts
    }

    fn disable_interrupts(&mut self) {
        self.events.push(Event::Cli);
        self.interrupts = false;
    }

    unsafe fn enable_interrupts(&mut self) {
        self.events.push(Event::Sti);
        self.interrupts = true;
    }
}
