//! Serial port (COM1) diagnostics
//!
//! Formatted output through `serial_print!`/`serial_println!` and a
//! [`log`] backend, both writing to the same 16550 UART.

use core::fmt::Write;

use lazy_static::lazy_static;
use log::{Metadata, Record, SetLoggerError};
use spin::Mutex;
use uart_16550::SerialPort;
use x86_64::instructions::interrupts;

use crate::config::{COM1, LOG_LEVEL};

lazy_static! {
    pub static ref SERIAL1: Mutex<SerialPort> = {
        // SAFETY: COM1 is the standard PC UART and nothing else drives it.
        let mut port = unsafe { SerialPort::new(COM1) };
        port.init();
        Mutex::new(port)
    };
}

#[doc(hidden)]
pub fn _print(args: core::fmt::Arguments) {
    // Interrupts off so a handler that prints cannot deadlock on the lock.
    interrupts::without_interrupts(|| {
        let _ = SERIAL1.lock().write_fmt(args);
    });
}

/// Prints to COM1.
#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::serial::_print(format_args!($($arg)*))
    };
}

/// Prints to COM1, with a newline.
#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($fmt:expr) => ($crate::serial_print!(concat!($fmt, "\n")));
    ($fmt:expr, $($arg:tt)*) => ($crate::serial_print!(concat!($fmt, "\n"), $($arg)*));
}

/// `log` backend writing `[LEVEL] target: message` lines to COM1.
pub struct SerialLogger;

static LOGGER: SerialLogger = SerialLogger;

impl log::Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= LOG_LEVEL
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            _print(format_args!(
                "[{:<5}] {}: {}\n",
                record.level(),
                record.target(),
                record.args()
            ));
        }
    }

    fn flush(&self) {}
}

/// Installs [`SerialLogger`] as the global logger. Call once, early.
pub fn init_logger() -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(LOG_LEVEL);
    Ok(())
}
