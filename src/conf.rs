//! The persisted record of what staging created, consumed by cleanup.

use envfile::EnvFile;
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const SECTION_CLEANUP: &str = "cleanup";
pub const SECTION_BOOT: &str = "boot";

pub const KEY_DIRS: &str = "dirs";
pub const KEY_KERNEL: &str = "kernel";
pub const KEY_INITRD: &str = "initrd";

const DIR_SEPARATOR: &str = ";";

#[derive(Debug, Error)]
pub enum ConfError {
    #[error("failed to read upgrade conf at {:?}", path)]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write upgrade conf at {:?}", path)]
    Write { path: PathBuf, source: io::Error },
}

/// A key/value store grouped by section, backed by a single file.
#[derive(Debug, Default)]
pub struct UpgradeConf {
    path:  PathBuf,
    store: BTreeMap<String, String>,
}

impl UpgradeConf {
    /// Opens the store for reading. A missing file is an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ConfError> {
        let path = path.as_ref().to_path_buf();

        // envfile reports every open failure as `Other`, so absence is checked first.
        let store = match fs::symlink_metadata(&path) {
            Err(why) if why.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            _ => match EnvFile::new(&path) {
                Ok(env) => env.store,
                Err(source) => return Err(ConfError::Read { path, source }),
            },
        };

        Ok(UpgradeConf { path, store })
    }

    /// Opens the store, applies `func`, and writes the store back.
    ///
    /// The write happens whether or not `func` succeeds, so that every value
    /// set before a failure is persisted. An error from `func` takes
    /// precedence over an error from the write.
    pub fn edit<P, T, E, F>(path: P, func: F) -> Result<T, E>
    where
        P: AsRef<Path>,
        E: From<ConfError>,
        F: FnOnce(&mut UpgradeConf) -> Result<T, E>,
    {
        let mut conf = UpgradeConf::open(path)?;
        let result = func(&mut conf);
        let written = conf.write();

        let value = result?;
        written?;
        Ok(value)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.store.get(&store_key(section, key)).map(String::as_str)
    }

    pub fn set(&mut self, section: &str, key: &str, value: &str) -> &mut Self {
        self.store.insert(store_key(section, key), value.to_owned());
        self
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Replaces the file atomically with the contents of the store.
    fn write(&self) -> Result<(), ConfError> {
        let map_err = |source| ConfError::Write { path: self.path.clone(), source };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(map_err)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        File::create(&tmp).map_err(map_err)?;
        let mut env = EnvFile::new(&tmp).map_err(map_err)?;
        env.store = self.store.clone();
        env.write().map_err(map_err)?;

        fs::rename(&tmp, &self.path).map_err(map_err)
    }
}

fn store_key(section: &str, key: &str) -> String { [section, "_", key].concat().to_uppercase() }

/// Everything that staging recorded for cleanup.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StagedState {
    pub cleanup_dirs: Option<Vec<PathBuf>>,
    pub kernel:       Option<PathBuf>,
    pub initrd:       Option<PathBuf>,
}

impl StagedState {
    pub fn load(conf: &UpgradeConf) -> Self {
        let path = |section: &str, key: &str| {
            conf.get(section, key).filter(|v| !v.is_empty()).map(PathBuf::from)
        };

        let cleanup_dirs = conf.get(SECTION_CLEANUP, KEY_DIRS).map(|dirs| {
            dirs.split(DIR_SEPARATOR).filter(|d| !d.is_empty()).map(PathBuf::from).collect()
        });

        StagedState {
            cleanup_dirs,
            kernel: path(SECTION_BOOT, KEY_KERNEL),
            initrd: path(SECTION_BOOT, KEY_INITRD),
        }
    }
}

pub fn set_cleanup_dirs(conf: &mut UpgradeConf, dirs: &[PathBuf]) {
    let joined = dirs
        .iter()
        .map(|d| d.to_string_lossy())
        .collect::<Vec<_>>()
        .join(DIR_SEPARATOR);

    conf.set(SECTION_CLEANUP, KEY_DIRS, &joined);
}

pub fn set_boot_images(conf: &mut UpgradeConf, kernel: &Path, initrd: &Path) {
    conf.set(SECTION_BOOT, KEY_KERNEL, &kernel.to_string_lossy())
        .set(SECTION_BOOT, KEY_INITRD, &initrd.to_string_lossy());
}
