//! Filesystem helpers shared by the stage and cleanup engines.

use std::{
    fs::{self, File, ReadDir},
    io::{self, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

const SELINUX_ENFORCE: &str = "/sys/fs/selinux/enforce";

/// Creates `path` and all of its parents, succeeding if it already exists.
pub fn mkdir_p<P: AsRef<Path>>(path: P) -> io::Result<()> { fs::create_dir_all(path) }

/// Removes a file or symlink; absence is not an error.
pub fn rm_f<P: AsRef<Path>>(path: P) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(why) if why.kind() == io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}

/// Removes a directory tree, or a single file; absence is not an error.
pub fn rm_rf<P: AsRef<Path>>(path: P) -> io::Result<()> {
    let path = path.as_ref();
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(why) if why.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(why) => return Err(why),
    };

    let result = if metadata.is_dir() { fs::remove_dir_all(path) } else { fs::remove_file(path) };

    match result {
        Err(why) if why.kind() == io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}

/// Lazily yields the full path of every entry in a directory.
///
/// Entries which fail to be read are skipped. Calling `listdir` again
/// restarts the listing from the beginning.
pub fn listdir<P: AsRef<Path>>(path: P) -> io::Result<ListDir> {
    fs::read_dir(path).map(|inner| ListDir { inner })
}

pub struct ListDir {
    inner: ReadDir,
}

impl Iterator for ListDir {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            match self.inner.next()? {
                Ok(entry) => return Some(entry.path()),
                Err(why) => debug!("skipping unreadable directory entry: {}", why),
            }
        }
    }
}

pub fn is_selinux_enabled() -> bool { Path::new(SELINUX_ENFORCE).exists() }

/// Determines the version string of a kernel image from its boot header.
///
/// Returns `None` when the image cannot be read, or carries no version.
pub fn kernelver<P: AsRef<Path>>(kernel: P) -> Option<String> {
    let mut file = File::open(kernel).ok()?;
    kernelver_from(&mut file)
}

fn kernelver_from<R: Read + Seek>(image: &mut R) -> Option<String> {
    // x86 boot protocol: "HdrS" at 0x202, version string offset at 0x20E.
    const MAGIC_OFFSET: u64 = 0x202;
    const VERSION_PTR_OFFSET: u64 = 0x20E;
    const SETUP_OFFSET: u64 = 0x200;

    let mut magic = [0u8; 4];
    image.seek(SeekFrom::Start(MAGIC_OFFSET)).ok()?;
    image.read_exact(&mut magic).ok()?;
    if &magic != b"HdrS" {
        return None;
    }

    let mut pointer = [0u8; 2];
    image.seek(SeekFrom::Start(VERSION_PTR_OFFSET)).ok()?;
    image.read_exact(&mut pointer).ok()?;
    let pointer = u16::from_le_bytes(pointer);
    if pointer == 0 {
        return None;
    }

    let mut buffer = [0u8; 256];
    image.seek(SeekFrom::Start(u64::from(pointer) + SETUP_OFFSET)).ok()?;
    let read = image.read(&mut buffer).ok()?;
    let buffer = &buffer[..read];
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());

    std::str::from_utf8(&buffer[..end])
        .ok()?
        .split_whitespace()
        .next()
        .map(String::from)
}
