use super::{initramfs, BootError, BootManager, CRYPTTAB, MDADM_CONF, UPGRADE_ARGS};
use crate::status::captured;
use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

const GRUBBY: &str = "grubby";

/// Manages boot entries through `grubby`, and the initramfs through `cpio`.
#[derive(Debug)]
pub struct Grubby {
    mdadm_conf: PathBuf,
    crypttab:   PathBuf,
}

impl Default for Grubby {
    fn default() -> Self {
        Grubby { mdadm_conf: PathBuf::from(MDADM_CONF), crypttab: PathBuf::from(CRYPTTAB) }
    }
}

impl Grubby {
    fn grubby(args: &[String]) -> Result<(), BootError> {
        debug!("running grubby {}", args.join(" "));
        let output = Command::new(GRUBBY)
            .args(args)
            .output()
            .map_err(|source| BootError::Spawn { command: GRUBBY, source })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(BootError::Command { command: GRUBBY, output: captured(&output) })
        }
    }
}

impl BootManager for Grubby {
    fn add_entry(&self, kernel: &Path, initrd: &Path, banner: &str) -> Result<(), BootError> {
        // An entry from a previous run is replaced rather than duplicated.
        self.remove_entry(kernel)?;

        Self::grubby(&[
            format!("--add-kernel={}", kernel.display()),
            format!("--initrd={}", initrd.display()),
            format!("--title={}", banner),
            "--copy-default".into(),
            format!("--args={}", UPGRADE_ARGS),
        ])
    }

    fn remove_entry(&self, kernel: &Path) -> Result<(), BootError> {
        Self::grubby(&[format!("--remove-kernel={}", kernel.display())])
    }

    fn need_mdadmconf(&self) -> bool {
        fs::read_to_string(&self.mdadm_conf).map_or(false, |conf| declares_arrays(&conf))
    }

    fn need_crypttab(&self) -> bool {
        fs::read_to_string(&self.crypttab).map_or(false, |tab| has_entries(&tab))
    }

    fn initramfs_append_files(&self, initrd: &Path, files: &[&Path]) -> Result<(), BootError> {
        initramfs::append_files(initrd, files)
    }

    fn initramfs_append_images(
        &self,
        initrd: &Path,
        images: &[PathBuf],
    ) -> Result<(), BootError> {
        initramfs::append_images(initrd, images)
    }
}

fn declares_arrays(conf: &str) -> bool {
    conf.lines().any(|line| line.trim_start().starts_with("ARRAY"))
}

fn has_entries(tab: &str) -> bool {
    tab.lines().map(str::trim).any(|line| !line.is_empty() && !line.starts_with('#'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mdadm_arrays() {
        assert!(declares_arrays("MAILADDR root\nARRAY /dev/md0 UUID=3aaa0122:29827cfa\n"));
        assert!(!declares_arrays("# ARRAY /dev/md0\nMAILADDR root\n"));
    }

    #[test]
    fn crypttab_entries() {
        assert!(has_entries("# comment\nluks-1234 UUID=1234 none discard\n"));
        assert!(!has_entries("# comment\n\n   \n"));
    }

    #[test]
    fn missing_configs() {
        let dir = tempfile::tempdir().unwrap();
        let grubby = Grubby {
            mdadm_conf: dir.path().join("mdadm.conf"),
            crypttab:   dir.path().join("crypttab"),
        };

        assert!(!grubby.need_mdadmconf());
        assert!(!grubby.need_crypttab());

        fs::write(dir.path().join("crypttab"), "luks-1234 UUID=1234 none\n").unwrap();
        assert!(grubby.need_crypttab());
    }
}
