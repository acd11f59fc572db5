use std::error::Error;
use std::path::{Path, PathBuf};

use bootloader::{BiosBoot, UefiBoot};

const KERNEL_NAME: &str = "bringup";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../os");

    let workspace_root = match PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap_or_default()).parent() {
        Some(root) => root.to_path_buf(),
        None => {
            println!("cargo:warning=cannot locate the workspace root");
            return;
        }
    };

    let kernel_path = workspace_root
        .join("target")
        .join("x86_64-unknown-none")
        .join("debug")
        .join(KERNEL_NAME);

    if !kernel_path.exists() {
        println!(
            "cargo:warning=kernel binary not found at {}; build it first with \
             `cargo build -p bringup --target x86_64-unknown-none`",
            kernel_path.display()
        );
        return;
    }

    let bios = workspace_root.join(format!("{KERNEL_NAME}-bios.img"));
    let uefi = workspace_root.join(format!("{KERNEL_NAME}-uefi.img"));
    match create_images(&kernel_path, &bios, &uefi) {
        Ok(()) => {
            println!("cargo:rustc-env=BIOS_IMAGE={}", bios.display());
            println!("cargo:rustc-env=UEFI_IMAGE={}", uefi.display());
        }
        Err(err) => println!("cargo:warning=disk image creation failed: {err}"),
    }
}

fn create_images(kernel: &Path, bios: &Path, uefi: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
    eprintln!("  [boot] BIOS image: {}", bios.display());
    BiosBoot::new(kernel).create_disk_image(bios)?;
    eprintln!("  [boot] UEFI image: {}", uefi.display());
    UefiBoot::new(kernel).create_disk_image(uefi)?;
    Ok(())
}
