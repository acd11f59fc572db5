//! x86 descriptor-table bring-up
//!
//! Builds the GDT (with its TSS descriptors) and the IDT in the exact byte
//! layouts the CPU reads, installs them and reloads the segment registers.
//!
//! The crate is `no_std`; only [`cpu::long_mode`] / [`cpu::protected_mode`],
//! [`arch`] and [`serial`] execute privileged instructions. Everything else
//! builds and tests on the host.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod cpu;
pub mod descriptor;
pub mod error;
pub mod table;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod arch;
#[cfg(target_arch = "x86_64")]
pub mod serial;

pub use error::{TableError, TableResult};

#[cfg(test)]
pub(crate) mod testing {
    /// Deterministic LCG for randomized properties.
    pub struct Lcg(u64);

    impl Lcg {
        pub fn new(seed: u64) -> Self {
            Self(seed)
        }

        pub fn next_u64(&mut self) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            self.0
        }
    }
}
