//! Every filesystem location that staging writes to or cleanup removes.

use std::path::{Path, PathBuf};

const CACHEDIR: &str = "/var/tmp/system-upgrade";
const PACKAGEDIR: &str = "/var/lib/system-upgrade";
const UPDATE_IMG_DIR: &str = "/etc/system-upgrade/update.img.d";
const UPGRADELINK: &str = "/system-upgrade";
const UPGRADEROOT: &str = "/system-upgrade-root";
const BOOTDIR: &str = "/boot";
const MODULES_DIR: &str = "/lib/modules";
const TARGET_REQUIRES: &str = "/lib/systemd/system/system-upgrade.target.requires";
const ISOMOUNT: &str = "/run/system-upgrade/iso";

const PACKAGELIST: &str = "package.list";
const UPGRADECONF: &str = "upgrade.conf";
const KERNEL: &str = "vmlinuz-system-upgrade";
const INITRD: &str = "initramfs-system-upgrade.img";

/// Locations used by the stage and cleanup engines.
///
/// Constructed once at startup and passed by reference, so that tests may
/// relocate the whole tree beneath a temporary directory.
#[derive(Clone, Debug, PartialEq)]
pub struct PathLayout {
    /// Package manager cache, removed on cleanup.
    pub cachedir:        PathBuf,
    /// Holds the staged package files, the package list, and the upgrade conf.
    pub packagedir:      PathBuf,
    pub packagelist:     PathBuf,
    pub upgradeconf:     PathBuf,
    /// Symlink which always points to `packagedir`.
    pub upgradelink:     PathBuf,
    /// Placeholder directory for the upgrade environment.
    pub upgraderoot:     PathBuf,
    /// Supplemental initramfs images to append to the upgrade initrd.
    pub update_img_dir:  PathBuf,
    pub bootdir:         PathBuf,
    pub kernel:          PathBuf,
    pub initrd:          PathBuf,
    pub modules_dir:     PathBuf,
    /// Units in here are pulled in by `system-upgrade.target`.
    pub target_requires: PathBuf,
    /// Mount point for loop-mounted images.
    pub isomount:        PathBuf,
}

impl Default for PathLayout {
    fn default() -> Self { Self::rooted("/") }
}

impl PathLayout {
    /// Places every path of the default layout beneath `root`.
    pub fn rooted<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        let at = |path: &str| root.join(path.trim_start_matches('/'));

        let packagedir = at(PACKAGEDIR);
        let bootdir = at(BOOTDIR);

        PathLayout {
            cachedir: at(CACHEDIR),
            packagelist: packagedir.join(PACKAGELIST),
            upgradeconf: packagedir.join(UPGRADECONF),
            packagedir,
            upgradelink: at(UPGRADELINK),
            upgraderoot: at(UPGRADEROOT),
            update_img_dir: at(UPDATE_IMG_DIR),
            kernel: bootdir.join(KERNEL),
            initrd: bootdir.join(INITRD),
            bootdir,
            modules_dir: at(MODULES_DIR),
            target_requires: at(TARGET_REQUIRES),
            isomount: at(ISOMOUNT),
        }
    }

    /// Directories that a full cleanup removes when nothing else was recorded.
    ///
    /// `packagedir` comes last, since it also holds the upgrade conf.
    pub fn default_cleanup_dirs(&self) -> Vec<PathBuf> {
        vec![self.cachedir.clone(), self.packagedir.clone()]
    }

    /// Where the media device is mounted at during the upgrade boot.
    pub fn media_mount(&self) -> PathBuf { self.upgradelink.join("media") }

    /// Packages fetched from the network are expected here.
    pub fn download_packages(&self) -> PathBuf { self.cachedir.join("packages") }
}
