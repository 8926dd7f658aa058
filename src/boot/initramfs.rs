//! Appending to an initramfs: the kernel unpacks concatenated cpio archives
//! in order, so later archives add to, or replace, earlier contents.

use super::BootError;
use crate::status::captured;
use std::{
    collections::BTreeSet,
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

const CPIO: &str = "cpio";

/// Names to archive, relative to `/`, with every parent directory listed first.
fn archive_names(files: &[&Path]) -> Vec<String> {
    let mut names = BTreeSet::new();

    for &file in files {
        let relative = file.strip_prefix("/").unwrap_or(file);
        for ancestor in relative.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                names.insert(ancestor.to_string_lossy().into_owned());
            }
        }
    }

    // Sorting places every directory before its children.
    names.into_iter().collect()
}

pub(super) fn append_files(initrd: &Path, files: &[&Path]) -> Result<(), BootError> {
    let mut list = archive_names(files).join("\n");
    list.push('\n');

    let mut cmd = cascade! {
        Command::new(CPIO);
        ..args(&["--create", "--format=newc", "--quiet"]);
        ..current_dir("/");
        ..stdin(Stdio::piped());
        ..stdout(Stdio::piped());
        ..stderr(Stdio::piped());
    };

    let mut child = cmd.spawn().map_err(|source| BootError::Spawn { command: CPIO, source })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(list.as_bytes())
            .map_err(|source| BootError::Spawn { command: CPIO, source })?;
    }

    let output =
        child.wait_with_output().map_err(|source| BootError::Spawn { command: CPIO, source })?;

    if !output.status.success() {
        return Err(BootError::Command { command: CPIO, output: captured(&output) });
    }

    open_append(initrd)?
        .write_all(&output.stdout)
        .map_err(|source| BootError::Initrd { path: initrd.to_path_buf(), source })
}

pub(super) fn append_images(initrd: &Path, images: &[PathBuf]) -> Result<(), BootError> {
    let mut target = open_append(initrd)?;

    for image in images {
        info!("appending {} to {}", image.display(), initrd.display());
        let mut source = File::open(image)
            .map_err(|source| BootError::Image { path: image.clone(), source })?;

        io::copy(&mut source, &mut target)
            .map_err(|source| BootError::Initrd { path: initrd.to_path_buf(), source })?;
    }

    Ok(())
}

fn open_append(initrd: &Path) -> Result<File, BootError> {
    OpenOptions::new()
        .append(true)
        .open(initrd)
        .map_err(|source| BootError::Initrd { path: initrd.to_path_buf(), source })
}
