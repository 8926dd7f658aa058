//! Discovery and mounting of installation media.

mod system;
mod systemd;

pub use self::{
    system::SystemMedia,
    systemd::{mount_unit, unit_name},
};

use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to create mount point at {:?}", path)]
    MountPoint { path: PathBuf, source: io::Error },

    #[error("failed to spawn mount for {:?}", iso)]
    MountSpawn { iso: PathBuf, source: io::Error },

    #[error("failed to mount {:?}: {}", iso, output)]
    Mount { iso: PathBuf, output: String },

    #[error("failed to write systemd unit at {:?}", path)]
    Unit { path: PathBuf, source: io::Error },
}

impl MediaError {
    /// Diagnostic output captured from the failed command, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            MediaError::Mount { output, .. } => Some(output.as_str()),
            _ => None,
        }
    }
}

/// A mounted (or mountable) device holding installation media.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaReference {
    pub dev:    PathBuf,
    pub mnt:    PathBuf,
    pub fstype: String,
}

impl MediaReference {
    pub fn new<D, M, F>(dev: D, mnt: M, fstype: F) -> Self
    where
        D: Into<PathBuf>,
        M: Into<PathBuf>,
        F: Into<String>,
    {
        MediaReference { dev: dev.into(), mnt: mnt.into(), fstype: fstype.into() }
    }

    /// The same device, mounted somewhere else.
    pub fn remounted<M: Into<PathBuf>>(&self, mnt: M) -> Self {
        MediaReference { mnt: mnt.into(), ..self.clone() }
    }
}

/// Everything the core needs to know about devices, mounts and images.
pub trait MediaProbe {
    /// Mounted filesystems which contain installation media.
    fn find(&self) -> Vec<MediaReference>;

    /// Whether the file is an ISO 9660 image.
    fn isiso(&self, path: &Path) -> bool;

    /// Removable block devices, including their partitions.
    fn removable(&self) -> Vec<MediaReference>;

    /// Whether the file resides on the given block device.
    fn fileondev(&self, path: &Path, dev: &Path) -> bool;

    /// Mounts an image read-only through a loop device at `target`.
    fn loopmount(&self, iso: &Path, target: &Path) -> Result<MediaReference, MediaError>;

    /// Writes a mount unit for `media` into `dir`, returning the unit's path.
    fn write_systemd_unit(&self, media: &MediaReference, dir: &Path)
        -> Result<PathBuf, MediaError>;
}
