//! In-memory collaborators for exercising the engines without a real system.

use crate::{
    boot::{BootError, BootManager},
    media::{mount_unit, unit_name, MediaError, MediaProbe, MediaReference},
};
use std::{
    cell::RefCell,
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Default)]
pub struct FakeMedia {
    /// Mounted install media returned by `find`.
    pub media:         Vec<MediaReference>,
    /// Files which are considered ISO images.
    pub isos:          Vec<PathBuf>,
    pub removable:     Vec<MediaReference>,
    /// Files which reside on any removable device.
    pub on_removable:  Vec<PathBuf>,
    /// When set, `loopmount` fails with this output.
    pub mount_failure: Option<String>,
    pub mounted:       RefCell<Vec<(PathBuf, PathBuf)>>,
}

impl FakeMedia {
    pub fn with_media(media: Vec<MediaReference>) -> Self { FakeMedia { media, ..Self::default() } }
}

impl MediaProbe for FakeMedia {
    fn find(&self) -> Vec<MediaReference> { self.media.clone() }

    fn isiso(&self, path: &Path) -> bool { self.isos.iter().any(|iso| iso == path) }

    fn removable(&self) -> Vec<MediaReference> { self.removable.clone() }

    fn fileondev(&self, path: &Path, _dev: &Path) -> bool {
        self.on_removable.iter().any(|file| file == path)
    }

    fn loopmount(&self, iso: &Path, target: &Path) -> Result<MediaReference, MediaError> {
        if let Some(ref output) = self.mount_failure {
            return Err(MediaError::Mount { iso: iso.to_path_buf(), output: output.clone() });
        }

        self.mounted.borrow_mut().push((iso.to_path_buf(), target.to_path_buf()));
        Ok(MediaReference::new(iso, target, "iso9660"))
    }

    fn write_systemd_unit(
        &self,
        media: &MediaReference,
        dir: &Path,
    ) -> Result<PathBuf, MediaError> {
        let path = dir.join(unit_name(&media.mnt, "mount"));
        fs::write(&path, mount_unit(media, "ro"))
            .map_err(|source| MediaError::Unit { path: path.clone(), source })?;
        Ok(path)
    }
}

#[derive(Debug, Default)]
pub struct FakeBoot {
    pub mdadm:       bool,
    pub crypttab:    bool,
    /// When set, `remove_entry` fails.
    pub fail_remove: bool,
    pub calls:       RefCell<Vec<String>>,
}

impl FakeBoot {
    pub fn calls(&self) -> Vec<String> { self.calls.borrow().clone() }

    fn record(&self, call: String) { self.calls.borrow_mut().push(call); }
}

impl BootManager for FakeBoot {
    fn add_entry(&self, kernel: &Path, initrd: &Path, banner: &str) -> Result<(), BootError> {
        self.record(format!("add {} {} {}", kernel.display(), initrd.display(), banner));
        Ok(())
    }

    fn remove_entry(&self, kernel: &Path) -> Result<(), BootError> {
        if self.fail_remove {
            return Err(BootError::Command { command: "grubby", output: "no such entry".into() });
        }

        self.record(format!("remove {}", kernel.display()));
        Ok(())
    }

    fn need_mdadmconf(&self) -> bool { self.mdadm }

    fn need_crypttab(&self) -> bool { self.crypttab }

    fn initramfs_append_files(&self, initrd: &Path, files: &[&Path]) -> Result<(), BootError> {
        let files = files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>();
        self.record(format!("files {} {}", initrd.display(), files.join(" ")));
        Ok(())
    }

    fn initramfs_append_images(
        &self,
        initrd: &Path,
        images: &[PathBuf],
    ) -> Result<(), BootError> {
        let names = images
            .iter()
            .filter_map(|image| image.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        self.record(format!("images {} {}", initrd.display(), names.join(" ")));
        Ok(())
    }
}

/// A kernel image carrying just enough of a boot header to report `version`.
pub fn fake_kernel(version: &str) -> Vec<u8> {
    let mut image = vec![0u8; 0x1000];
    image[0x202..0x206].copy_from_slice(b"HdrS");
    let pointer: u16 = 0x300;
    image[0x20E..0x210].copy_from_slice(&pointer.to_le_bytes());
    let start = 0x500;
    image[start..start + version.len()].copy_from_slice(version.as_bytes());
    image
}
