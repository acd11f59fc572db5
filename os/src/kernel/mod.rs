use core::fmt;

use bringup::cpu::long_mode::LongModeCpu;
use bringup::cpu::LifecycleState;
use bringup::TableError;

pub mod gdt;
pub mod idt;
pub mod pic;
pub mod stack;
pub mod verify;

#[derive(Debug)]
pub enum KernelInitError {
    Logger,
    DescriptorTable(TableError),
    SelfCheck(verify::Mismatch),
}

impl From<TableError> for KernelInitError {
    fn from(err: TableError) -> Self {
        Self::DescriptorTable(err)
    }
}

impl From<verify::Mismatch> for KernelInitError {
    fn from(err: verify::Mismatch) -> Self {
        Self::SelfCheck(err)
    }
}

impl fmt::Display for KernelInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logger => f.write_str("logger already installed"),
            Self::DescriptorTable(err) => write!(f, "descriptor table: {}", err),
            Self::SelfCheck(err) => write!(f, "self-check: {}", err),
        }
    }
}

pub struct KernelState {
    pub descriptors: LifecycleState,
    pub selectors: gdt::Selectors,
}

pub fn early_init() -> Result<KernelState, KernelInitError> {
    bringup::serial::init_logger().map_err(|_| KernelInitError::Logger)?;
    log::info!("kernel running");
    stack::log_layout();

    // SAFETY: the bootloader enters at CPL 0 on the only running core, and
    // this is the only handle.
    let mut cpu = unsafe { LongModeCpu::current() };

    pic::remap_and_mask();

    // SAFETY: single core, tables live in statics for the rest of the boot,
    // and every gate points at a stub behind the kernel code selector.
    let (descriptors, selectors) = unsafe { gdt::init(&mut cpu)? };

    verify::run(&cpu, gdt::build()?, idt::build(selectors.code)?)?;

    Ok(KernelState {
        descriptors,
        selectors,
    })
}

pub fn kernel_loop(state: KernelState) -> ! {
    log::info!(
        "bring-up done ({}): cs={:#x} ds={:#x} tr={:#x}",
        state.descriptors,
        state.selectors.code.0,
        state.selectors.data.0,
        state.selectors.tss.0
    );
    #[cfg(feature = "qemu-exit")]
    verify::exit_qemu(verify::QemuExitCode::Success);
    halt()
}

pub fn halt() -> ! {
    loop {
        x86_64::instructions::interrupts::disable();
        x86_64::instructions::hlt();
    }
}
