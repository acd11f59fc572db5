#![no_std]
#![no_main]
#![feature(abi_x86_interrupt)]

mod kernel;

use core::panic::PanicInfo;

use bringup::serial_println;

bootloader_api::entry_point!(kernel_main);

fn kernel_main(_boot_info: &'static mut bootloader_api::BootInfo) -> ! {
    match kernel::early_init() {
        Ok(state) => kernel::kernel_loop(state),
        Err(err) => {
            serial_println!("bring-up failed: {}", err);
            #[cfg(feature = "qemu-exit")]
            kernel::verify::exit_qemu(kernel::verify::QemuExitCode::Failed);
            kernel::halt()
        }
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    serial_println!("panic: {}", info);
    kernel::halt()
}
