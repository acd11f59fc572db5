//! Word-width selection
//!
//! Several records (TSS descriptor, IDT gate, table pointer, TSS body) come in
//! a 32-bit and a 64-bit shape. Both shapes sit behind [`WordWidth`]; the
//! width the kernel is built for is [`Native`].

use core::fmt;

use super::access::SegmentFlags;
use super::tss::{TaskState, TaskState32, TaskState64};

/// Compile-time description of one descriptor layout family.
pub trait WordWidth: Copy + Default + fmt::Debug + 'static {
    /// Human-readable name, used in diagnostics.
    const NAME: &'static str;

    /// Width of a linear address in bytes.
    const ADDRESS_BYTES: usize;

    /// Mask applied to linear addresses before they are split into fields.
    const ADDRESS_MASK: u64;

    /// Size in bytes of a system descriptor (TSS/LDT) and of an IDT gate.
    const SYSTEM_ENTRY_SIZE: usize;

    /// Flags nibble used by flat code segments of this width.
    const CODE_FLAGS: SegmentFlags;

    /// Serialized system descriptor or gate (`[u8; 8]` or `[u8; 16]`).
    type Raw: Copy + fmt::Debug + PartialEq + AsRef<[u8]> + AsMut<[u8]>;

    /// All-zero value of [`Self::Raw`].
    const ZERO: Self::Raw;

    /// Serialized table pointer (`[u8; 6]` or `[u8; 10]`).
    type PointerRaw: Copy + fmt::Debug + AsRef<[u8]> + AsMut<[u8]>;

    /// All-zero value of [`Self::PointerRaw`].
    const ZERO_POINTER: Self::PointerRaw;

    /// The task-state structure the CPU expects at this width.
    type TaskState: TaskState;
}

/// Protected-mode (i386) layouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Legacy32;

/// Long-mode (x86-64) layouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Long64;

impl WordWidth for Legacy32 {
    const NAME: &'static str = "32-bit";
    const ADDRESS_BYTES: usize = 4;
    const ADDRESS_MASK: u64 = 0xFFFF_FFFF;
    const SYSTEM_ENTRY_SIZE: usize = 8;
    const CODE_FLAGS: SegmentFlags = SegmentFlags::GRANULARITY.union(SegmentFlags::DEFAULT_32);

    type Raw = [u8; 8];
    const ZERO: [u8; 8] = [0; 8];

    type PointerRaw = [u8; 6];
    const ZERO_POINTER: [u8; 6] = [0; 6];

    type TaskState = TaskState32;
}

impl WordWidth for Long64 {
    const NAME: &'static str = "64-bit";
    const ADDRESS_BYTES: usize = 8;
    const ADDRESS_MASK: u64 = u64::MAX;
    const SYSTEM_ENTRY_SIZE: usize = 16;
    const CODE_FLAGS: SegmentFlags = SegmentFlags::GRANULARITY.union(SegmentFlags::LONG_MODE);

    type Raw = [u8; 16];
    const ZERO: [u8; 16] = [0; 16];

    type PointerRaw = [u8; 10];
    const ZERO_POINTER: [u8; 10] = [0; 10];

    type TaskState = TaskState64;
}

/// Layout family of the build target.
#[cfg(target_pointer_width = "64")]
pub type Native = Long64;

/// Layout family of the build target.
#[cfg(target_pointer_width = "32")]
pub type Native = Legacy32;
