use super::{mount_unit, unit_name, MediaError, MediaProbe, MediaReference};
use crate::{status::captured, util::mkdir_p};
use proc_mounts::{MountInfo, MountIter};
use std::{
    fs::{self, File},
    io::{Read, Seek, SeekFrom},
    os::unix::fs::MetadataExt,
    path::{Path, PathBuf},
    process::Command,
};

const SYS_BLOCK: &str = "/sys/block";

/// Install media carry a `.treeinfo` describing the tree.
const TREEINFO: &str = ".treeinfo";

/// The ISO 9660 primary volume descriptor begins at sector 16.
const ISO9660_MAGIC_OFFSET: u64 = 0x8001;
const ISO9660_MAGIC: &[u8; 5] = b"CD001";

/// Probes the running system through `/proc/mounts`, `/sys/block`, and `mount`.
#[derive(Debug, Default)]
pub struct SystemMedia;

impl SystemMedia {
    fn mounts() -> Vec<MountInfo> {
        match MountIter::new() {
            Ok(mounts) => mounts.filter_map(Result::ok).collect(),
            Err(why) => {
                warn!("failed to read mounts: {}", why);
                Vec::new()
            }
        }
    }

    fn reference(mount: &MountInfo) -> MediaReference {
        MediaReference::new(&mount.source, &mount.dest, mount.fstype.as_str())
    }
}

impl MediaProbe for SystemMedia {
    fn find(&self) -> Vec<MediaReference> {
        Self::mounts()
            .iter()
            .filter(|mount| mount.dest.join(TREEINFO).is_file())
            .map(Self::reference)
            .collect()
    }

    fn isiso(&self, path: &Path) -> bool {
        let mut magic = [0u8; 5];
        File::open(path)
            .and_then(|mut file| {
                file.seek(SeekFrom::Start(ISO9660_MAGIC_OFFSET))?;
                file.read_exact(&mut magic)
            })
            .map_or(false, |_| &magic == ISO9660_MAGIC)
    }

    fn removable(&self) -> Vec<MediaReference> {
        let mounts = Self::mounts();
        let mut devices = Vec::new();

        let entries = match fs::read_dir(SYS_BLOCK) {
            Ok(entries) => entries,
            Err(why) => {
                warn!("failed to read {}: {}", SYS_BLOCK, why);
                return devices;
            }
        };

        for entry in entries.filter_map(Result::ok) {
            let sysfs = entry.path();
            let is_removable = fs::read_to_string(sysfs.join("removable"))
                .map_or(false, |value| value.trim() == "1");

            if !is_removable {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let mut names = vec![name.clone()];

            // Partitions appear as subdirectories named after the parent.
            if let Ok(children) = fs::read_dir(&sysfs) {
                for child in children.filter_map(Result::ok) {
                    let child_name = child.file_name().to_string_lossy().into_owned();
                    if child_name.starts_with(&name) && child.path().join("partition").exists() {
                        names.push(child_name);
                    }
                }
            }

            for name in names {
                let dev = Path::new("/dev").join(&name);
                let reference = mounts
                    .iter()
                    .find(|mount| mount.source == dev)
                    .map(Self::reference)
                    .unwrap_or_else(|| MediaReference::new(&dev, PathBuf::new(), ""));
                devices.push(reference);
            }
        }

        devices
    }

    fn fileondev(&self, path: &Path, dev: &Path) -> bool {
        match (fs::metadata(path), fs::metadata(dev)) {
            (Ok(file), Ok(device)) => file.dev() == device.rdev(),
            _ => false,
        }
    }

    fn loopmount(&self, iso: &Path, target: &Path) -> Result<MediaReference, MediaError> {
        if let Some(mount) = Self::mounts().iter().find(|mount| mount.dest == target) {
            info!("{} is already mounted at {}", mount.source.display(), target.display());
            return Ok(MediaReference::new(iso, target, mount.fstype.as_str()));
        }

        mkdir_p(target)
            .map_err(|source| MediaError::MountPoint { path: target.to_path_buf(), source })?;

        info!("loop-mounting {} at {}", iso.display(), target.display());
        let mut cmd = cascade! {
            Command::new("mount");
            ..args(&["-t", "iso9660", "-o", "loop,ro"]);
            ..arg(iso);
            ..arg(target);
        };

        let output = cmd
            .output()
            .map_err(|source| MediaError::MountSpawn { iso: iso.to_path_buf(), source })?;

        if !output.status.success() {
            return Err(MediaError::Mount { iso: iso.to_path_buf(), output: captured(&output) });
        }

        Ok(MediaReference::new(iso, target, "iso9660"))
    }

    fn write_systemd_unit(
        &self,
        media: &MediaReference,
        dir: &Path,
    ) -> Result<PathBuf, MediaError> {
        // Images are mounted from the file itself at boot, through a loop device.
        let options = if media.dev.is_file() { "loop,ro" } else { "ro" };
        let path = dir.join(unit_name(&media.mnt, "mount"));

        fs::write(&path, mount_unit(media, options).as_bytes())
            .map_err(|source| MediaError::Unit { path: path.clone(), source })?;

        Ok(path)
    }
}
