use super::{StageError, StageResult};
use std::{
    fs::{self, FileTimes, OpenOptions},
    io,
    os::unix::fs::MetadataExt,
    path::Path,
};

/// Whether both paths refer to the same file on the same device.
pub fn same_identity(a: &Path, b: &Path) -> bool {
    match (fs::symlink_metadata(a), fs::symlink_metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

/// Hard links `from` to `to`, copying instead when they are on different devices.
pub fn link_or_copy(from: &Path, to: &Path) -> StageResult<()> {
    link_with(from, to, |from, to| fs::hard_link(from, to))
}

fn link_with<F>(from: &Path, to: &Path, link: F) -> StageResult<()>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    match link(from, to) {
        Ok(()) => Ok(()),
        Err(ref why) if is_cross_device(why) => {
            debug!("{} is on another device, copying", from.display());
            copy_preserving(from, to).map_err(|source| StageError::Copy {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source,
            })
        }
        Err(source) => {
            Err(StageError::Link { from: from.to_path_buf(), to: to.to_path_buf(), source })
        }
    }
}

fn is_cross_device(why: &io::Error) -> bool { why.raw_os_error() == Some(libc::EXDEV) }

/// Copies the contents, permissions, and timestamps of a file.
pub fn copy_preserving(from: &Path, to: &Path) -> io::Result<()> {
    // Permissions are carried over by the copy itself.
    fs::copy(from, to)?;

    let metadata = fs::metadata(from)?;
    let times = FileTimes::new().set_accessed(metadata.accessed()?).set_modified(metadata.modified()?);

    OpenOptions::new().write(true).open(to)?.set_times(times)
}
