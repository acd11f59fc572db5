//! Raw x86 port I/O
//!
//! Byte, word and dword accessors plus a short bus-settle delay. Callers own
//! the device protocol; nothing here knows what sits behind a port.

use core::arch::asm;

/// Port written by [`io_wait`]. POST codes go here; nothing listens at runtime.
const POST_PORT: u16 = 0x80;

/// Write byte to port
///
/// # Safety
/// Port writes can reconfigure arbitrary hardware.
#[inline(always)]
pub unsafe fn outb(port: u16, value: u8) {
    asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
}

/// Read byte from port
///
/// # Safety
/// Reads can have side effects on the device.
#[inline(always)]
pub unsafe fn inb(port: u16) -> u8 {
    let value: u8;
    asm!("in al, dx", in("dx") port, out("al") value, options(nomem, nostack, preserves_flags));
    value
}

/// # Safety
/// See [`outb`].
#[inline(always)]
pub unsafe fn outw(port: u16, value: u16) {
    asm!("out dx, ax", in("dx") port, in("ax") value, options(nomem, nostack, preserves_flags));
}

/// # Safety
/// See [`inb`].
#[inline(always)]
pub unsafe fn inw(port: u16) -> u16 {
    let value: u16;
    asm!("in ax, dx", in("dx") port, out("ax") value, options(nomem, nostack, preserves_flags));
    value
}

/// # Safety
/// See [`outb`].
#[inline(always)]
pub unsafe fn outl(port: u16, value: u32) {
    asm!("out dx, eax", in("dx") port, in("eax") value, options(nomem, nostack, preserves_flags));
}

/// # Safety
/// See [`inb`].
#[inline(always)]
pub unsafe fn inl(port: u16) -> u32 {
    let value: u32;
    asm!("in eax, dx", in("dx") port, out("eax") value, options(nomem, nostack, preserves_flags));
    value
}

/// Gives slow ISA devices (the 8259 pair) time to settle between writes.
#[inline(always)]
pub fn io_wait() {
    // SAFETY: port 0x80 is the POST diagnostic port; writing it has no effect
    // on a running system.
    unsafe { outb(POST_PORT, 0) }
}
