//! Packages that make up an upgrade, and where to find their boot images.

use crate::{layout::PathLayout, source::ResolvedSource};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Prefix of the package list entries which are read from mounted media.
pub const MEDIA_PREFIX: &str = "media";

const RPM_EXTENSION: &str = "rpm";
const PXEBOOT: &str = "images/pxeboot";
const PXEBOOT_KERNEL: &str = "vmlinuz";
const PXEBOOT_INITRD: &str = "initrd.img";

#[derive(Debug, Error)]
#[error("failed to list packages in {:?}", path)]
pub struct PackageError {
    path:   PathBuf,
    source: io::Error,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PackageLocation {
    /// A file on the local disk, which is linked into the package dir.
    Local(PathBuf),
    /// A file on the media, relative to its mount point; never copied.
    Media(PathBuf),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PackageRecord {
    pub name:     String,
    pub location: PackageLocation,
}

impl PackageRecord {
    pub fn local<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        PackageRecord { name: package_name(&path), location: PackageLocation::Local(path) }
    }

    pub fn media<P: Into<PathBuf>>(relative: P) -> Self {
        let relative = relative.into();
        PackageRecord { name: package_name(&relative), location: PackageLocation::Media(relative) }
    }

    /// The name under which the package is recorded in the package list.
    pub fn list_entry(&self) -> Option<String> {
        match self.location {
            PackageLocation::Local(ref path) => {
                path.file_name().map(|name| name.to_string_lossy().into_owned())
            }
            PackageLocation::Media(ref relative) => {
                Some(Path::new(MEDIA_PREFIX).join(relative).to_string_lossy().into_owned())
            }
        }
    }
}

fn package_name(path: &Path) -> String {
    path.file_stem().map_or_else(String::new, |stem| stem.to_string_lossy().into_owned())
}

pub fn is_rpm(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == RPM_EXTENSION)
}

/// Every package offered by the source, sorted by path.
pub fn enumerate(
    source: &ResolvedSource,
    layout: &PathLayout,
) -> Result<Vec<PackageRecord>, PackageError> {
    let mut packages = match source {
        ResolvedSource::Media(media) => {
            let mut found = Vec::new();
            find_rpms(&media.mnt, &media.mnt, &mut found)?;
            found.into_iter().map(PackageRecord::media).collect::<Vec<_>>()
        }
        ResolvedSource::Network(_) => {
            let dir = layout.download_packages();
            match fs::read_dir(&dir) {
                Ok(entries) => entries
                    .filter_map(Result::ok)
                    .map(|entry| entry.path())
                    .filter(|path| is_rpm(path) && path.is_file())
                    .map(PackageRecord::local)
                    .collect(),
                Err(why) if why.kind() == io::ErrorKind::NotFound => {
                    warn!("no downloaded packages at {}", dir.display());
                    Vec::new()
                }
                Err(source) => return Err(PackageError { path: dir, source }),
            }
        }
    };

    packages.sort_by(|a, b| a.list_entry().cmp(&b.list_entry()));
    Ok(packages)
}

fn find_rpms(root: &Path, dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), PackageError> {
    let entries =
        fs::read_dir(dir).map_err(|source| PackageError { path: dir.to_path_buf(), source })?;

    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(_) => continue,
        };

        if file_type.is_dir() {
            find_rpms(root, &path, found)?;
        } else if is_rpm(&path) {
            if let Ok(relative) = path.strip_prefix(root) {
                found.push(relative.to_path_buf());
            }
        }
    }

    Ok(())
}

/// The kernel and initrd which boot into the upgrade environment.
#[derive(Clone, Debug, PartialEq)]
pub struct BootImages {
    pub kernel: PathBuf,
    pub initrd: PathBuf,
}

impl BootImages {
    /// The pxeboot images shipped by the source.
    pub fn from_source(source: &ResolvedSource, layout: &PathLayout) -> Self {
        let root = source.mount_path().unwrap_or_else(|| layout.cachedir.as_path()).join(PXEBOOT);
        BootImages { kernel: root.join(PXEBOOT_KERNEL), initrd: root.join(PXEBOOT_INITRD) }
    }
}
