//! Boot menu entries and the upgrade initramfs.

mod grubby;
mod initramfs;

pub use self::grubby::Grubby;

use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const MDADM_CONF: &str = "/etc/mdadm.conf";
pub const CRYPTTAB: &str = "/etc/crypttab";

/// Kernel arguments which boot into the upgrade target.
pub const UPGRADE_ARGS: &str = "upgrade systemd.unit=system-upgrade.target";

#[derive(Debug, Error)]
pub enum BootError {
    #[error("failed to spawn {}", command)]
    Spawn { command: &'static str, source: io::Error },

    #[error("{} failed: {}", command, output)]
    Command { command: &'static str, output: String },

    #[error("failed to append to initramfs at {:?}", path)]
    Initrd { path: PathBuf, source: io::Error },

    #[error("failed to read initramfs image at {:?}", path)]
    Image { path: PathBuf, source: io::Error },
}

/// Everything the core needs from the bootloader and initramfs tooling.
pub trait BootManager {
    /// Installs a boot menu entry for the kernel and initrd pair.
    fn add_entry(&self, kernel: &Path, initrd: &Path, banner: &str) -> Result<(), BootError>;

    /// Removes the boot menu entry for the kernel, if there is one.
    fn remove_entry(&self, kernel: &Path) -> Result<(), BootError>;

    /// Whether RAID arrays must be assembled from the mdadm config at early boot.
    fn need_mdadmconf(&self) -> bool;

    /// Whether encrypted devices must be mapped from the crypttab at early boot.
    fn need_crypttab(&self) -> bool;

    /// Appends the given files, at their own paths, to the initramfs.
    fn initramfs_append_files(&self, initrd: &Path, files: &[&Path]) -> Result<(), BootError>;

    /// Appends prebuilt initramfs images to the initramfs.
    fn initramfs_append_images(&self, initrd: &Path, images: &[PathBuf])
        -> Result<(), BootError>;
}
