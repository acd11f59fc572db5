//! Task-state segments and their GDT descriptors
//!
//! The TSS bodies are plain byte records with accessors at the offsets the CPU
//! uses. On x86-64 only the privilege stacks (rsp0-2), the interrupt stack
//! table (IST1-7) and the I/O-map base matter. The 32-bit body additionally
//! carries the hardware task-switch register snapshot.

use core::marker::PhantomData;

use bit_field::BitField;

use super::access::{Access, SystemType};
use super::segment::GdtEntry;
use super::width::WordWidth;
use super::{read_u16, read_u32, read_u64, write_u16, write_u32, write_u64};

/// Common view over the 32-bit and 64-bit TSS bodies.
pub trait TaskState {
    /// Size of the structure as seen by the CPU.
    const SIZE: usize;

    /// Stack pointer loaded when entering ring `ring` (0..=2) from an outer ring.
    ///
    /// # Panics
    /// If `ring > 2`. Ring 3 has no entry in the TSS.
    fn privilege_stack(&self, ring: usize) -> u64;

    /// # Panics
    /// If `ring > 2`.
    fn set_privilege_stack(&mut self, ring: usize, top: u64);

    /// Offset of the I/O permission bitmap. Values `>= SIZE` mean "no bitmap".
    fn io_map_base(&self) -> u16;

    fn set_io_map_base(&mut self, offset: u16);

    fn as_bytes(&self) -> &[u8];

    /// Linear address of this structure, as stored in its descriptor.
    fn address(&self) -> u64 {
        self as *const Self as *const u8 as usize as u64
    }
}

// === 64-bit body ===

const RSP0: usize = 4;
const IST1: usize = 36;
const IOMAP_64: usize = 102;

/// Long-mode task-state segment.
#[derive(Clone)]
#[repr(C, align(8))]
pub struct TaskState64 {
    bytes: [u8; 104],
}

impl TaskState64 {
    /// Number of interrupt-stack-table slots (IST1..=IST7).
    pub const IST_SLOTS: usize = 7;

    /// Zeroed TSS without an I/O permission bitmap.
    pub const fn new() -> Self {
        let mut bytes = [0u8; 104];
        let iomap = (104u16).to_le_bytes();
        bytes[IOMAP_64] = iomap[0];
        bytes[IOMAP_64 + 1] = iomap[1];
        Self { bytes }
    }

    /// Stack top for IST slot `index` (1..=7, as written into an IDT gate).
    ///
    /// # Panics
    /// If `index` is 0 or above 7. Index 0 in a gate means "no IST", so it
    /// has no slot.
    pub fn interrupt_stack(&self, index: u8) -> u64 {
        read_u64(&self.bytes, Self::ist_offset(index))
    }

    /// # Panics
    /// If `index` is 0 or above 7.
    pub fn set_interrupt_stack(&mut self, index: u8, top: u64) {
        write_u64(&mut self.bytes, Self::ist_offset(index), top);
    }

    fn ist_offset(index: u8) -> usize {
        assert!(
            (1..=Self::IST_SLOTS as u8).contains(&index),
            "IST index must be 1..=7"
        );
        IST1 + (usize::from(index) - 1) * 8
    }
}

impl Default for TaskState64 {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskState for TaskState64 {
    const SIZE: usize = 104;

    fn privilege_stack(&self, ring: usize) -> u64 {
        assert!(ring < 3, "privilege stacks exist for rings 0..=2");
        read_u64(&self.bytes, RSP0 + ring * 8)
    }

    fn set_privilege_stack(&mut self, ring: usize, top: u64) {
        assert!(ring < 3, "privilege stacks exist for rings 0..=2");
        write_u64(&mut self.bytes, RSP0 + ring * 8, top);
    }

    fn io_map_base(&self) -> u16 {
        read_u16(&self.bytes, IOMAP_64)
    }

    fn set_io_map_base(&mut self, offset: u16) {
        write_u16(&mut self.bytes, IOMAP_64, offset);
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// === 32-bit body ===

/// Fields of the legacy task-switch snapshot, by byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Register32 {
    Link = 0,
    Esp0 = 4,
    Ss0 = 8,
    Esp1 = 12,
    Ss1 = 16,
    Esp2 = 20,
    Ss2 = 24,
    Cr3 = 28,
    Eip = 32,
    Eflags = 36,
    Eax = 40,
    Ecx = 44,
    Edx = 48,
    Ebx = 52,
    Esp = 56,
    Ebp = 60,
    Esi = 64,
    Edi = 68,
    Es = 72,
    Cs = 76,
    Ss = 80,
    Ds = 84,
    Fs = 88,
    Gs = 92,
    Ldtr = 96,
    Ssp = 104,
}

impl Register32 {
    /// Selector-valued fields are 16 bits wide followed by 16 reserved bits.
    fn is_selector(self) -> bool {
        matches!(
            self,
            Self::Link
                | Self::Ss0
                | Self::Ss1
                | Self::Ss2
                | Self::Es
                | Self::Cs
                | Self::Ss
                | Self::Ds
                | Self::Fs
                | Self::Gs
                | Self::Ldtr
        )
    }
}

const TRAP_32: usize = 100;
const IOMAP_32: usize = 102;

/// Protected-mode task-state segment, including the shadow-stack pointer slot.
#[derive(Clone)]
#[repr(C, align(4))]
pub struct TaskState32 {
    bytes: [u8; 108],
}

impl TaskState32 {
    pub const fn new() -> Self {
        let mut bytes = [0u8; 108];
        let iomap = (108u16).to_le_bytes();
        bytes[IOMAP_32] = iomap[0];
        bytes[IOMAP_32 + 1] = iomap[1];
        Self { bytes }
    }

    pub fn register(&self, reg: Register32) -> u32 {
        let value = read_u32(&self.bytes, reg as usize);
        if reg.is_selector() {
            value & 0xFFFF
        } else {
            value
        }
    }

    pub fn set_register(&mut self, reg: Register32, value: u32) {
        if reg.is_selector() {
            write_u16(&mut self.bytes, reg as usize, value as u16);
        } else {
            write_u32(&mut self.bytes, reg as usize, value);
        }
    }

    /// Sets both halves of a ring's stack: `ss:esp`.
    ///
    /// # Panics
    /// If `ring > 2`.
    pub fn set_privilege_stack_segment(&mut self, ring: usize, ss: u16, esp: u32) {
        let (esp_reg, ss_reg) = match ring {
            0 => (Register32::Esp0, Register32::Ss0),
            1 => (Register32::Esp1, Register32::Ss1),
            2 => (Register32::Esp2, Register32::Ss2),
            _ => panic!("privilege stacks exist for rings 0..=2"),
        };
        self.set_register(ss_reg, u32::from(ss));
        self.set_register(esp_reg, esp);
    }

    /// Debug trap on task switch (T flag).
    pub fn trap_on_switch(&self) -> bool {
        read_u16(&self.bytes, TRAP_32).get_bit(0)
    }

    pub fn set_trap_on_switch(&mut self, trap: bool) {
        let mut word = read_u16(&self.bytes, TRAP_32);
        word.set_bit(0, trap);
        write_u16(&mut self.bytes, TRAP_32, word);
    }
}

impl Default for TaskState32 {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskState for TaskState32 {
    const SIZE: usize = 108;

    fn privilege_stack(&self, ring: usize) -> u64 {
        let reg = match ring {
            0 => Register32::Esp0,
            1 => Register32::Esp1,
            2 => Register32::Esp2,
            _ => panic!("privilege stacks exist for rings 0..=2"),
        };
        u64::from(self.register(reg))
    }

    fn set_privilege_stack(&mut self, ring: usize, top: u64) {
        let reg = match ring {
            0 => Register32::Esp0,
            1 => Register32::Esp1,
            2 => Register32::Esp2,
            _ => panic!("privilege stacks exist for rings 0..=2"),
        };
        self.set_register(reg, top as u32);
    }

    fn io_map_base(&self) -> u16 {
        read_u16(&self.bytes, IOMAP_32)
    }

    fn set_io_map_base(&mut self, offset: u16) {
        write_u16(&mut self.bytes, IOMAP_32, offset);
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// === Descriptor ===

/// GDT descriptor pointing at a TSS.
///
/// 8 bytes on 32-bit (plain GDT shape). 16 bytes on 64-bit: the GDT shape
/// followed by `base_high:u32` and `reserved:u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TssDescriptor<W: WordWidth> {
    pub limit_low: u16,
    pub base_low: u16,
    pub base_middle: u8,
    pub access: u8,
    pub flags_limit: u8,
    /// Address bits 24..32 (the `base_high` byte of a plain GDT entry).
    pub base_mid: u8,
    /// Address bits 32..64. Always zero, and not serialized, on 32-bit.
    pub base_high: u32,
    pub reserved: u32,
    width: PhantomData<W>,
}

/// Builds the descriptor for the TSS at `tss_address`.
///
/// The limit covers exactly one `W::TaskState`; the descriptor is present,
/// DPL 0, and has the descriptor-type bit clear (system descriptor).
pub fn encode_tss_descriptor<W: WordWidth>(tss_address: u64, kind: SystemType) -> TssDescriptor<W> {
    let address = tss_address & W::ADDRESS_MASK;
    let limit = (<W::TaskState as TaskState>::SIZE - 1) as u32;
    TssDescriptor {
        limit_low: limit.get_bits(0..16) as u16,
        base_low: address.get_bits(0..16) as u16,
        base_middle: address.get_bits(16..24) as u8,
        access: Access::system(kind).bits(),
        flags_limit: limit.get_bits(16..20) as u8,
        base_mid: address.get_bits(24..32) as u8,
        base_high: address.get_bits(32..64) as u32,
        reserved: 0,
        width: PhantomData,
    }
}

impl<W: WordWidth> TssDescriptor<W> {
    /// Number of 8-byte GDT slots the descriptor occupies.
    pub const SLOTS: usize = W::SYSTEM_ENTRY_SIZE / GdtEntry::SIZE;

    /// Available-TSS descriptor for `tss`.
    pub fn for_task_state(tss: &W::TaskState) -> Self {
        encode_tss_descriptor(tss.address(), SystemType::Tss)
    }

    pub fn address(&self) -> u64 {
        let mut address = 0u64;
        address.set_bits(0..16, u64::from(self.base_low));
        address.set_bits(16..24, u64::from(self.base_middle));
        address.set_bits(24..32, u64::from(self.base_mid));
        address.set_bits(32..64, u64::from(self.base_high));
        address
    }

    pub fn limit(&self) -> u32 {
        u32::from(self.limit_low) | u32::from(self.flags_limit & 0x0F) << 16
    }

    pub fn access(&self) -> Access {
        Access::from_bits_retain(self.access)
    }

    /// `None` for code/data descriptors and unknown system types.
    pub fn system_type(&self) -> Option<SystemType> {
        if self.access().contains(Access::DESCRIPTOR_TYPE) {
            return None;
        }
        SystemType::from_bits(self.access)
    }

    /// The first (GDT-shaped) eight bytes.
    pub fn low(&self) -> GdtEntry {
        GdtEntry {
            limit_low: self.limit_low,
            base_low: self.base_low,
            base_middle: self.base_middle,
            access: self.access,
            flags_limit: self.flags_limit,
            base_high: self.base_mid,
        }
    }

    pub fn to_bytes(&self) -> W::Raw {
        let mut raw = W::ZERO;
        let out = raw.as_mut();
        out[..8].copy_from_slice(&self.low().to_bytes());
        if out.len() == 16 {
            write_u32(out, 8, self.base_high);
            write_u32(out, 12, self.reserved);
        }
        raw
    }

    pub fn from_bytes(raw: &W::Raw) -> Self {
        let bytes = raw.as_ref();
        let mut low = [0u8; 8];
        low.copy_from_slice(&bytes[..8]);
        let low = GdtEntry::from_bytes(&low);
        let (base_high, reserved) = if bytes.len() == 16 {
            (read_u32(bytes, 8), read_u32(bytes, 12))
        } else {
            (0, 0)
        };
        Self {
            limit_low: low.limit_low,
            base_low: low.base_low,
            base_middle: low.base_middle,
            access: low.access,
            flags_limit: low.flags_limit,
            base_mid: low.base_high,
            base_high,
            reserved,
            width: PhantomData,
        }
    }
}
