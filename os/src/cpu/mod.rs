//! Installing descriptor tables on a CPU
//!
//! [`DescriptorHardware`] is the narrow seam to the privileged instructions:
//! `lgdt`/`lidt`, `ltr`, the segment reload trampoline, and interrupt
//! masking. Everything above it is plain Rust that runs on any host.
//!
//! A core goes through
//!
//! ```text
//! Unconfigured -> TableBuilt -> TableLoaded -> SegmentsReloaded -> TaskRegisterLoaded
//! ```
//!
//! in that order, once. [`Bringup`] encodes the order in its type parameter,
//! so skipping the reload after `lgdt` or loading TR before the GDT does not
//! compile. Interrupts stay masked from [`Bringup::new`] until
//! [`Bringup::finish`]; the IDT goes in through
//! [`Bringup::install_interrupt_table`] inside that window.

#[cfg(target_arch = "x86_64")]
pub mod long_mode;
#[cfg(target_arch = "x86")]
pub mod protected_mode;

#[cfg(test)]
pub(crate) mod mock;

use core::fmt;

use x86_64::structures::gdt::SegmentSelector;

use crate::descriptor::WordWidth;
use crate::table::{GlobalTable, InterruptTable, TableKind, TablePointer};

/// Privileged operations the bring-up sequence needs.
///
/// Implementations are thin wrappers over single instructions (or, for the
/// reload, one fixed instruction sequence). They do not validate anything;
/// a bad pointer or selector faults inside the CPU.
pub trait DescriptorHardware {
    /// Layout family of the tables this CPU consumes.
    type Width: WordWidth;

    /// `lgdt` / `lidt`.
    ///
    /// # Safety
    /// Ring 0 only. The memory behind `pointer` must hold a valid table and
    /// must not move or be freed while it is installed.
    unsafe fn install_table(&mut self, kind: TableKind, pointer: &TablePointer<Self::Width>);

    /// `ltr`.
    ///
    /// # Safety
    /// `selector` must name a present, available TSS descriptor in the
    /// installed GDT.
    unsafe fn select_task(&mut self, selector: SegmentSelector);

    /// Loads `data` into SS, DS, ES, FS and GS, then far-returns into `code`.
    ///
    /// # Safety
    /// Both selectors must reference suitable descriptors in the installed
    /// GDT; `code` must describe the code segment execution continues in.
    unsafe fn reload_segments(&mut self, code: SegmentSelector, data: SegmentSelector);

    fn interrupts_enabled(&self) -> bool;

    /// `cli`.
    fn disable_interrupts(&mut self);

    /// `sti`.
    ///
    /// # Safety
    /// An IDT able to dispatch every unmasked source must be installed.
    unsafe fn enable_interrupts(&mut self);
}

/// Where a core is in the descriptor lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Unconfigured,
    TableBuilt,
    TableLoaded,
    SegmentsReloaded,
    TaskRegisterLoaded,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unconfigured => "unconfigured",
            Self::TableBuilt => "table built",
            Self::TableLoaded => "table loaded",
            Self::SegmentsReloaded => "segments reloaded",
            Self::TaskRegisterLoaded => "task register loaded",
        };
        f.write_str(name)
    }
}

/// Type-level lifecycle stage.
pub trait Stage: private::Sealed {
    const STATE: LifecycleState;
}

/// Stage reached after [`Bringup::build`]: the GDT pointer is known.
pub trait Built: Stage {
    type Width: WordWidth;

    fn gdt(&self) -> TablePointer<Self::Width>;
}

/// Stage that may end the sequence.
pub trait Terminal: Built {}

pub struct Unconfigured;

pub struct TableBuilt<W: WordWidth> {
    gdt: TablePointer<W>,
}

pub struct TableLoaded<W: WordWidth> {
    gdt: TablePointer<W>,
}

pub struct SegmentsReloaded<W: WordWidth> {
    gdt: TablePointer<W>,
}

pub struct TaskRegisterLoaded<W: WordWidth> {
    gdt: TablePointer<W>,
}

mod private {
    use crate::descriptor::WordWidth;

    pub trait Sealed {}
    impl Sealed for super::Unconfigured {}
    impl<W: WordWidth> Sealed for super::TableBuilt<W> {}
    impl<W: WordWidth> Sealed for super::TableLoaded<W> {}
    impl<W: WordWidth> Sealed for super::SegmentsReloaded<W> {}
    impl<W: WordWidth> Sealed for super::TaskRegisterLoaded<W> {}
}

impl Stage for Unconfigured {
    const STATE: LifecycleState = LifecycleState::Unconfigured;
}

macro_rules! built_stage {
    ($stage:ident, $state:ident) => {
        impl<W: WordWidth> Stage for $stage<W> {
            const STATE: LifecycleState = LifecycleState::$state;
        }

        impl<W: WordWidth> Built for $stage<W> {
            type Width = W;

            fn gdt(&self) -> TablePointer<W> {
                self.gdt
            }
        }
    };
}

built_stage!(TableBuilt, TableBuilt);
built_stage!(TableLoaded, TableLoaded);
built_stage!(SegmentsReloaded, SegmentsReloaded);
built_stage!(TaskRegisterLoaded, TaskRegisterLoaded);

impl<W: WordWidth> Terminal for SegmentsReloaded<W> {}
impl<W: WordWidth> Terminal for TaskRegisterLoaded<W> {}

/// One core's build -> load -> reload sequence.
///
/// Dropping a `Bringup` before [`Bringup::finish`] leaves interrupts masked.
pub struct Bringup<'h, H: DescriptorHardware, S: Stage> {
    hw: &'h mut H,
    restore_interrupts: bool,
    stage: S,
}

impl<'h, H: DescriptorHardware, S: Stage> Bringup<'h, H, S> {
    pub fn state(&self) -> LifecycleState {
        S::STATE
    }

    fn advance<T: Stage>(self, next: T) -> Bringup<'h, H, T> {
        log::debug!("descriptors: {} -> {}", S::STATE, T::STATE);
        Bringup {
            hw: self.hw,
            restore_interrupts: self.restore_interrupts,
            stage: next,
        }
    }
}

impl<'h, H: DescriptorHardware, S: Built<Width = H::Width>> Bringup<'h, H, S> {
    /// The GDT pointer handed to the CPU.
    pub fn gdt_pointer(&self) -> TablePointer<H::Width> {
        self.stage.gdt()
    }
}

impl<'h, H: DescriptorHardware> Bringup<'h, H, Unconfigured> {
    /// Masks interrupts and starts the sequence.
    ///
    /// Call this before filling the tables: the whole build -> load -> reload
    /// sequence runs masked. The previous interrupt state comes back in
    /// [`Bringup::finish`].
    pub fn new(hw: &'h mut H) -> Self {
        let restore_interrupts = hw.interrupts_enabled();
        hw.disable_interrupts();
        Self {
            hw,
            restore_interrupts,
            stage: Unconfigured,
        }
    }

    /// Takes the finished GDT and computes its pointer.
    ///
    /// The `'static` borrow keeps the table at a fixed address for as long as
    /// the CPU may read it.
    pub fn build<const SLOTS: usize>(
        self,
        gdt: &'static GlobalTable<H::Width, SLOTS>,
    ) -> Bringup<'h, H, TableBuilt<H::Width>> {
        let pointer = gdt.pointer();
        log::debug!(
            "gdt: {} slots at {:#x}, limit {}",
            gdt.len(),
            pointer.base,
            pointer.limit
        );
        self.advance(TableBuilt { gdt: pointer })
    }
}

impl<'h, H: DescriptorHardware> Bringup<'h, H, TableBuilt<H::Width>> {
    /// `lgdt`. Segment registers keep their cached descriptors until
    /// [`Bringup::reload`].
    ///
    /// # Safety
    /// Ring 0 only; the table must contain the descriptors later passed to
    /// `reload` and `select_task`.
    pub unsafe fn load(self) -> Bringup<'h, H, TableLoaded<H::Width>> {
        let gdt = self.stage.gdt;
        self.hw.install_table(TableKind::Gdt, &gdt);
        self.advance(TableLoaded { gdt })
    }
}

impl<'h, H: DescriptorHardware> Bringup<'h, H, TableLoaded<H::Width>> {
    /// Runs the reload trampoline so CS and the data segments come from the
    /// new table.
    ///
    /// # Safety
    /// `code` must be an executable segment matching the current mode and
    /// `data` a writable data segment, both present in the loaded GDT.
    pub unsafe fn reload(
        self,
        code: SegmentSelector,
        data: SegmentSelector,
    ) -> Bringup<'h, H, SegmentsReloaded<H::Width>> {
        log::debug!("reload: cs={:#x} ds/es/fs/gs/ss={:#x}", code.0, data.0);
        self.hw.reload_segments(code, data);
        let gdt = self.stage.gdt;
        self.advance(SegmentsReloaded { gdt })
    }
}

impl<'h, H: DescriptorHardware> Bringup<'h, H, SegmentsReloaded<H::Width>> {
    /// `ltr`.
    ///
    /// # Safety
    /// `tss` must name an available TSS descriptor in the loaded GDT whose
    /// task state outlives its use by this core.
    pub unsafe fn select_task(self, tss: SegmentSelector) -> Bringup<'h, H, TaskRegisterLoaded<H::Width>> {
        log::debug!("ltr {:#x}", tss.0);
        self.hw.select_task(tss);
        let gdt = self.stage.gdt;
        self.advance(TaskRegisterLoaded { gdt })
    }
}

impl<'h, H: DescriptorHardware, S: Terminal<Width = H::Width>> Bringup<'h, H, S> {
    /// `lidt`, still inside the masked window, so IF only comes back once an
    /// IDT matching the new GDT is in place.
    ///
    /// # Safety
    /// Every present gate must point at a handler reachable through a code
    /// selector in the loaded GDT.
    pub unsafe fn install_interrupt_table<const VECTORS: usize>(
        self,
        idt: &'static InterruptTable<H::Width, VECTORS>,
    ) -> Self {
        let pointer = idt.pointer();
        self.hw.install_table(TableKind::Idt, &pointer);
        log::debug!("idt: {} vectors at {:#x}, limit {}", VECTORS, pointer.base, pointer.limit);
        self
    }

    /// Ends the sequence and restores the interrupt flag seen by `new`.
    ///
    /// # Safety
    /// If interrupts were enabled before, the installed IDT must be able to
    /// dispatch them.
    pub unsafe fn finish(self) -> LifecycleState {
        log::info!("descriptors: {} ({})", S::STATE, <H::Width as WordWidth>::NAME);
        if self.restore_interrupts {
            self.hw.enable_interrupts();
        }
        S::STATE
    }
}
