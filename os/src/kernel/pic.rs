//! 8259 PIC pair
//!
//! Remapped away from the exception vectors and fully masked: no IRQ may
//! arrive through the boot IDT.

use bringup::arch::port::{inb, io_wait, outb};
use bringup::config::PIC_VECTOR_BASE;

const MASTER_CMD: u16 = 0x20;
const MASTER_DATA: u16 = 0x21;
const SLAVE_CMD: u16 = 0xA0;
const SLAVE_DATA: u16 = 0xA1;

const ICW1_INIT: u8 = 0x11;
const ICW4_8086: u8 = 0x01;
const MASTER_CASCADE: u8 = 0x04; // slave on IR2
const SLAVE_CASCADE: u8 = 0x02;
const MASK_ALL: u8 = 0xFF;

/// Remaps IRQ 0-15 to `PIC_VECTOR_BASE..PIC_VECTOR_BASE + 16` and masks all of them.
pub fn remap_and_mask() {
    // SAFETY: the standard ICW1-4 sequence on the fixed PIC ports; interrupts
    // are masked at the CPU until bring-up completes.
    unsafe {
        outb(MASTER_CMD, ICW1_INIT);
        io_wait();
        outb(SLAVE_CMD, ICW1_INIT);
        io_wait();

        outb(MASTER_DATA, PIC_VECTOR_BASE);
        io_wait();
        outb(SLAVE_DATA, PIC_VECTOR_BASE + 8);
        io_wait();

        outb(MASTER_DATA, MASTER_CASCADE);
        io_wait();
        outb(SLAVE_DATA, SLAVE_CASCADE);
        io_wait();

        outb(MASTER_DATA, ICW4_8086);
        io_wait();
        outb(SLAVE_DATA, ICW4_8086);
        io_wait();

        outb(MASTER_DATA, MASK_ALL);
        outb(SLAVE_DATA, MASK_ALL);

        log::debug!(
            "pic: vectors {:#x}..{:#x}, masks {:#04x}/{:#04x}",
            PIC_VECTOR_BASE,
            PIC_VECTOR_BASE + 16,
            inb(MASTER_DATA),
            inb(SLAVE_DATA)
        );
    }
}
