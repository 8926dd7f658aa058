use crate::{boot::BootError, conf::ConfError, media::MediaError};
use std::{io, path::PathBuf};
use thiserror::Error;

pub type StageResult<T> = Result<T, StageError>;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to create directory at {:?}", path)]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to remove {:?} from the package dir", path)]
    Remove { path: PathBuf, source: io::Error },

    #[error("failed to link {:?} to {:?}", from, to)]
    Link { from: PathBuf, to: PathBuf, source: io::Error },

    #[error("failed to copy {:?} to {:?}", from, to)]
    Copy { from: PathBuf, to: PathBuf, source: io::Error },

    #[error("failed to list the package dir at {:?}", path)]
    ListPackageDir { path: PathBuf, source: io::Error },

    #[error("failed to write the package list at {:?}", path)]
    PackageList { path: PathBuf, source: io::Error },

    #[error("failed to link {:?} to the package dir", path)]
    UpgradeLink { path: PathBuf, source: io::Error },

    #[error("failed to set up media mount")]
    MediaMount(#[from] MediaError),

    #[error("failed to prepare the boot images")]
    Boot(#[from] BootError),

    #[error("failed to record staged state")]
    Conf(#[from] ConfError),
}
