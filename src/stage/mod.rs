//! Staging: the filesystem and bootloader changes which set up the upgrade
//! for the next boot. Each step converges to the same state when re-run.

mod errors;
mod link;

pub use self::{
    errors::{StageError, StageResult},
    link::{copy_preserving, link_or_copy, same_identity},
};

use crate::{
    boot::{BootManager, CRYPTTAB, MDADM_CONF},
    conf::{self, UpgradeConf},
    layout::PathLayout,
    media::{MediaProbe, MediaReference},
    packages::{is_rpm, BootImages, PackageLocation, PackageRecord},
    status::StatusExt,
    util::{is_selinux_enabled, kernelver, listdir, mkdir_p, rm_f, rm_rf},
    BOOT_BANNER,
};
use std::{
    collections::BTreeSet,
    env,
    fs::{self, DirBuilder},
    os::unix::fs::{symlink, DirBuilderExt},
    path::{Path, PathBuf},
    process::Command,
};

pub struct Stager<'a> {
    layout: &'a PathLayout,
    boot:   &'a dyn BootManager,
    media:  &'a dyn MediaProbe,
}

impl<'a> Stager<'a> {
    pub fn new(layout: &'a PathLayout, boot: &'a dyn BootManager, media: &'a dyn MediaProbe) -> Self {
        Stager { layout, boot, media }
    }

    /// Stages the packages, then the boot entry for the given kernel and initrd.
    pub fn prepare(&self, packages: &[PackageRecord], kernel: &Path, initrd: &Path) -> StageResult<()> {
        self.prep_upgrade(packages)?;
        self.prep_boot(kernel, initrd)
    }

    pub fn prep_upgrade(&self, packages: &[PackageRecord]) -> StageResult<()> {
        self.link_pkgs(packages)?;
        self.setup_upgradelink()?;
        self.setup_upgraderoot()
    }

    /// Links every package into the package dir, replacing what was staged before.
    ///
    /// Writes the package list, and records the directories which a full
    /// cleanup has to remove.
    pub fn link_pkgs(&self, packages: &[PackageRecord]) -> StageResult<()> {
        let packagedir = &self.layout.packagedir;
        info!("linking required packages into {}", packagedir.display());
        mkdir_p(packagedir)
            .map_err(|source| StageError::CreateDir { path: packagedir.clone(), source })?;

        let mut staged = BTreeSet::new();

        for package in packages {
            let entry = match package.list_entry() {
                Some(entry) => entry,
                None => continue,
            };

            let source = match package.location {
                PackageLocation::Media(_) => {
                    staged.insert(entry);
                    continue;
                }
                PackageLocation::Local(ref source) => source,
            };

            if !source.exists() {
                warn!("{} missing", source.display());
                continue;
            }

            let target = packagedir.join(&entry);
            staged.insert(entry);

            if same_identity(source, &target) {
                debug!("{} already in package dir", package.name);
                continue;
            }

            if target.is_dir() {
                info!("removing directory in place of {}", target.display());
            }

            rm_rf(&target).map_err(|source| StageError::Remove { path: target.clone(), source })?;
            link_or_copy(source, &target)?;
        }

        self.remove_leftovers(&staged)?;

        let mut list = String::new();
        for entry in &staged {
            list.push_str(entry);
            list.push('\n');
        }

        let packagelist = &self.layout.packagelist;
        fs::write(packagelist, list)
            .map_err(|source| StageError::PackageList { path: packagelist.clone(), source })?;

        UpgradeConf::edit(&self.layout.upgradeconf, |store| {
            conf::set_cleanup_dirs(store, &self.layout.default_cleanup_dirs());
            Ok::<_, StageError>(())
        })
    }

    /// Removes packages from an earlier staging which are no longer wanted.
    fn remove_leftovers(&self, staged: &BTreeSet<String>) -> StageResult<()> {
        let packagedir = &self.layout.packagedir;
        let entries = listdir(packagedir)
            .map_err(|source| StageError::ListPackageDir { path: packagedir.clone(), source })?;

        for path in entries.filter(|path| is_rpm(path)) {
            let name = match path.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };

            if !staged.contains(&name) {
                debug!("removing leftover package {}", name);
                rm_rf(&path).map_err(|source| StageError::Remove { path: path.clone(), source })?;
            }
        }

        Ok(())
    }

    /// Points the upgrade link at the package dir.
    pub fn setup_upgradelink(&self) -> StageResult<()> {
        let link = &self.layout.upgradelink;
        let packagedir = &self.layout.packagedir;
        info!("setting up upgrade symlink: {} -> {}", link.display(), packagedir.display());

        let map_err = |source| StageError::UpgradeLink { path: link.clone(), source };
        rm_f(link).map_err(map_err)?;
        symlink(packagedir, link).map_err(map_err)
    }

    pub fn setup_upgraderoot(&self) -> StageResult<()> {
        let root = &self.layout.upgraderoot;
        if root.is_dir() {
            info!("upgrade root dir {} already exists", root.display());
            return Ok(());
        }

        info!("creating upgrade root dir: {}", root.display());
        DirBuilder::new()
            .recursive(true)
            .mode(0o755)
            .create(root)
            .map_err(|source| StageError::CreateDir { path: root.clone(), source })?;

        if is_selinux_enabled() {
            let result = Command::new("restorecon").arg(root).status().and_then(StatusExt::as_result);
            if let Err(why) = result {
                warn!("failed to restore security context of {}: {}", root.display(), why);
            }
        }

        Ok(())
    }

    /// Arranges for the media to be mounted inside the upgrade link at boot.
    pub fn setup_media_mount(&self, media: &MediaReference) -> StageResult<PathBuf> {
        let mountpath = self.layout.media_mount();
        let requires = &self.layout.target_requires;
        info!("setting up mount for {} at {}", media.dev.display(), mountpath.display());

        mkdir_p(&mountpath)
            .map_err(|source| StageError::CreateDir { path: mountpath.clone(), source })?;
        mkdir_p(requires)
            .map_err(|source| StageError::CreateDir { path: requires.clone(), source })?;

        let unit = self.media.write_systemd_unit(&media.remounted(&mountpath), requires)?;
        info!("wrote {}", unit.display());
        Ok(unit)
    }

    /// Copies the source's boot images to where the boot entry expects them.
    pub fn copy_boot_images(&self, images: &BootImages) -> StageResult<()> {
        let bootdir = &self.layout.bootdir;
        mkdir_p(bootdir).map_err(|source| StageError::CreateDir { path: bootdir.clone(), source })?;

        for (from, to) in &[(&images.kernel, &self.layout.kernel), (&images.initrd, &self.layout.initrd)] {
            info!("copying {} to {}", from.display(), to.display());
            fs::copy(from, to).map_err(|source| StageError::Copy {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source,
            })?;
        }

        Ok(())
    }

    /// Extends the initrd with what early boot needs, and installs the boot entry.
    pub fn prep_boot(&self, kernel: &Path, initrd: &Path) -> StageResult<()> {
        if self.boot.need_mdadmconf() {
            info!("appending {} to initrd", MDADM_CONF);
            self.boot.initramfs_append_files(initrd, &[Path::new(MDADM_CONF)])?;
        }

        if self.boot.need_crypttab() {
            info!("appending {} to initrd", CRYPTTAB);
            self.boot.initramfs_append_files(initrd, &[Path::new(CRYPTTAB)])?;
        }

        let update_dir = &self.layout.update_img_dir;
        let mut updates = match listdir(update_dir) {
            Ok(entries) => entries.collect::<Vec<_>>(),
            Err(why) => {
                info!("can't list update img dir {}: {}", update_dir.display(), why);
                Vec::new()
            }
        };

        if !updates.is_empty() {
            updates.sort();
            info!("found updates in {}, appending to initrd", update_dir.display());
            self.boot.initramfs_append_images(initrd, &updates)?;
        }

        // The initramfs places the new kernel's modules here on reboot.
        match kernelver(kernel) {
            Some(version) => {
                let moddir = self.layout.modules_dir.join(&version);
                info!("creating module dir {}", moddir.display());
                mkdir_p(&moddir)
                    .map_err(|source| StageError::CreateDir { path: moddir.clone(), source })?;
            }
            None => warn!("can't determine version of kernel image {}", kernel.display()),
        }

        info!("adding new boot entry");
        self.boot.add_entry(kernel, initrd, BOOT_BANNER)?;

        let (kernel, initrd) = (absolute(kernel), absolute(initrd));
        UpgradeConf::edit(&self.layout.upgradeconf, |store| {
            conf::set_boot_images(store, &kernel, &initrd);
            Ok::<_, StageError>(())
        })
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        conf::StagedState,
        testing::{fake_kernel, FakeBoot, FakeMedia},
    };
    use tempfile::TempDir;

    struct Fixture {
        _root:  TempDir,
        layout: PathLayout,
        boot:   FakeBoot,
        media:  FakeMedia,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let layout = PathLayout::rooted(root.path());
            Fixture { _root: root, layout, boot: FakeBoot::default(), media: FakeMedia::default() }
        }

        fn stager(&self) -> Stager { Stager::new(&self.layout, &self.boot, &self.media) }

        /// Places a downloaded package, returning its record.
        fn download(&self, name: &str) -> PackageRecord {
            let dir = self.layout.download_packages();
            fs::create_dir_all(&dir).unwrap();
            let path = dir.join(name);
            fs::write(&path, name.as_bytes()).unwrap();
            PackageRecord::local(path)
        }

        fn packagedir(&self) -> Vec<String> {
            let mut names = fs::read_dir(&self.layout.packagedir)
                .unwrap()
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .collect::<Vec<_>>();
            names.sort();
            names
        }

        fn state(&self) -> StagedState {
            StagedState::load(&UpgradeConf::open(&self.layout.upgradeconf).unwrap())
        }
    }

    #[test]
    fn link_packages() {
        let fixture = Fixture::new();
        let packages = vec![fixture.download("bash-4.2.rpm"), fixture.download("zsh-5.0.rpm")];

        fixture.stager().link_pkgs(&packages).unwrap();

        assert_eq!(fixture.packagedir(), ["bash-4.2.rpm", "package.list", "upgrade.conf", "zsh-5.0.rpm"]);
        assert!(same_identity(
            &fixture.layout.download_packages().join("bash-4.2.rpm"),
            &fixture.layout.packagedir.join("bash-4.2.rpm")
        ));
        assert_eq!(
            fs::read_to_string(&fixture.layout.packagelist).unwrap(),
            "bash-4.2.rpm\nzsh-5.0.rpm\n"
        );
        assert_eq!(fixture.state().cleanup_dirs, Some(fixture.layout.default_cleanup_dirs()));
    }

    #[test]
    fn link_is_idempotent() {
        let fixture = Fixture::new();
        let packages = vec![fixture.download("bash-4.2.rpm"), PackageRecord::media("Packages/zsh-5.0.rpm")];

        let (kernel, initrd) = (&fixture.layout.kernel, &fixture.layout.initrd);

        fixture.stager().prepare(&packages, kernel, initrd).unwrap();
        let (files, list, state) =
            (fixture.packagedir(), fs::read(&fixture.layout.packagelist).unwrap(), fixture.state());

        fixture.stager().prepare(&packages, kernel, initrd).unwrap();
        assert_eq!(fixture.packagedir(), files);
        assert_eq!(fs::read(&fixture.layout.packagelist).unwrap(), list);
        assert_eq!(fixture.state(), state);
    }

    #[test]
    fn leftovers_removed() {
        let fixture = Fixture::new();
        fs::create_dir_all(&fixture.layout.packagedir).unwrap();
        fs::write(fixture.layout.packagedir.join("old-1.0.rpm"), b"").unwrap();
        fs::write(fixture.layout.packagedir.join("bash-4.2.rpm"), b"stale").unwrap();
        fs::write(fixture.layout.packagedir.join("notes.txt"), b"").unwrap();
        fs::create_dir(fixture.layout.packagedir.join("zsh-5.0.rpm")).unwrap();

        let packages = vec![fixture.download("bash-4.2.rpm"), fixture.download("zsh-5.0.rpm")];
        fixture.stager().link_pkgs(&packages).unwrap();

        assert_eq!(
            fixture.packagedir(),
            ["bash-4.2.rpm", "notes.txt", "package.list", "upgrade.conf", "zsh-5.0.rpm"]
        );
        assert_eq!(fs::read(fixture.layout.packagedir.join("bash-4.2.rpm")).unwrap(), b"bash-4.2.rpm");
        assert!(fixture.layout.packagedir.join("zsh-5.0.rpm").is_file());
    }

    #[test]
    fn media_and_missing_packages() {
        let fixture = Fixture::new();
        let packages = vec![
            PackageRecord::media("Packages/b/bash-4.2.rpm"),
            PackageRecord::local(fixture.layout.download_packages().join("missing-1.0.rpm")),
        ];

        fixture.stager().link_pkgs(&packages).unwrap();

        assert_eq!(fixture.packagedir(), ["package.list", "upgrade.conf"]);
        assert_eq!(
            fs::read_to_string(&fixture.layout.packagelist).unwrap(),
            "media/Packages/b/bash-4.2.rpm\n"
        );
    }

    #[test]
    fn upgrade_link_and_root() {
        let fixture = Fixture::new();
        fs::create_dir_all(&fixture.layout.packagedir).unwrap();

        for _ in 0..2 {
            fixture.stager().setup_upgradelink().unwrap();
            fixture.stager().setup_upgraderoot().unwrap();
        }

        assert_eq!(fs::read_link(&fixture.layout.upgradelink).unwrap(), fixture.layout.packagedir);
        assert!(fixture.layout.upgraderoot.is_dir());
    }

    #[test]
    fn media_mount_unit() {
        let fixture = Fixture::new();
        fixture.stager().prep_upgrade(&[]).unwrap();

        let dvd = MediaReference::new("/dev/sr0", "/run/media/dvd", "iso9660");
        let unit = fixture.stager().setup_media_mount(&dvd).unwrap();

        assert!(unit.starts_with(&fixture.layout.target_requires));
        assert!(fixture.layout.packagedir.join("media").is_dir());

        let contents = fs::read_to_string(&unit).unwrap();
        assert!(contents.contains("What=/dev/sr0\n"));
        assert!(contents.contains(&format!("Where={}\n", fixture.layout.media_mount().display())));
    }

    #[test]
    fn boot_preparation() {
        let mut fixture = Fixture::new();
        fixture.boot.mdadm = true;
        fixture.boot.crypttab = true;

        fs::create_dir_all(&fixture.layout.update_img_dir).unwrap();
        fs::write(fixture.layout.update_img_dir.join("b.img"), b"").unwrap();
        fs::write(fixture.layout.update_img_dir.join("a.img"), b"").unwrap();

        let (kernel, initrd) = (fixture.layout.kernel.clone(), fixture.layout.initrd.clone());
        fs::create_dir_all(&fixture.layout.bootdir).unwrap();
        fs::write(&kernel, fake_kernel("3.11.10-301.fc20.x86_64 #1 SMP")).unwrap();
        fs::write(&initrd, b"").unwrap();

        fixture.stager().prep_boot(&kernel, &initrd).unwrap();

        let initrd_name = initrd.display();
        assert_eq!(
            fixture.boot.calls(),
            vec![
                format!("files {} /etc/mdadm.conf", initrd_name),
                format!("files {} /etc/crypttab", initrd_name),
                format!("images {} a.img b.img", initrd_name),
                format!("add {} {} System Upgrade", kernel.display(), initrd_name),
            ]
        );
        assert!(fixture.layout.modules_dir.join("3.11.10-301.fc20.x86_64").is_dir());

        let state = fixture.state();
        assert_eq!(state.kernel, Some(kernel));
        assert_eq!(state.initrd, Some(initrd));
    }

    #[test]
    fn boot_without_kernel_version() {
        let fixture = Fixture::new();
        let (kernel, initrd) = (fixture.layout.kernel.clone(), fixture.layout.initrd.clone());

        fixture.stager().prep_boot(&kernel, &initrd).unwrap();

        assert!(!fixture.layout.modules_dir.exists());
        assert_eq!(fixture.boot.calls().len(), 1);
        assert_eq!(fixture.state().kernel, Some(kernel));
    }

    #[test]
    fn boot_images_copied() {
        let fixture = Fixture::new();
        let pxeboot = fixture.layout.cachedir.join("images/pxeboot");
        fs::create_dir_all(&pxeboot).unwrap();
        fs::write(pxeboot.join("vmlinuz"), b"kernel").unwrap();
        fs::write(pxeboot.join("initrd.img"), b"initrd").unwrap();

        let images = BootImages { kernel: pxeboot.join("vmlinuz"), initrd: pxeboot.join("initrd.img") };
        fixture.stager().copy_boot_images(&images).unwrap();

        assert_eq!(fs::read(&fixture.layout.kernel).unwrap(), b"kernel");
        assert_eq!(fs::read(&fixture.layout.initrd).unwrap(), b"initrd");
    }
}
