//! Prints where the build script put the disk images.

fn main() {
    match (option_env!("BIOS_IMAGE"), option_env!("UEFI_IMAGE")) {
        (Some(bios), Some(uefi)) => {
            println!("BIOS: {bios}");
            println!("UEFI: {uefi}");
        }
        _ => {
            eprintln!("no disk images; build the kernel for x86_64-unknown-none, then rebuild this crate");
            std::process::exit(1);
        }
    }
}
