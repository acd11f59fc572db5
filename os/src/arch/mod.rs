//! Architecture-level helpers shared by the kernel binary

pub mod port;
