//! Validation of individual option values.

use super::ValidationError;
use crate::{
    media::{MediaProbe, MediaReference},
    release::{parse_version, InstalledSystem},
};
use std::{
    env,
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
};

const GPG_HEADER: &[u8] = b"-----BEGIN PGP PUBLIC KEY BLOCK-----";
const FILE_SCHEME: &str = "file://";

pub const RAWHIDE: &str = "rawhide";

/// Resolves `--device` to exactly one mounted install media.
///
/// `auto` considers every install media found; anything else is
/// canonicalized and matched against each media's device and mount point.
pub fn device_or_mnt(arg: &str, media: &dyn MediaProbe) -> Result<MediaReference, ValidationError> {
    let (mut found, explicit) = if arg == "auto" {
        (media.find(), None)
    } else {
        let path = fs::canonicalize(arg).unwrap_or_else(|_| PathBuf::from(arg));
        let found = media.find().into_iter().filter(|m| m.dev == path || m.mnt == path).collect::<Vec<_>>();
        (found, Some(path))
    };

    match found.len() {
        1 => Ok(found.remove(0)),
        0 => Err(ValidationError::NoMedia { arg: explicit }),
        _ => {
            let devs = found.iter().map(|m| m.dev.display().to_string()).collect::<Vec<_>>();
            Err(ValidationError::MultipleDevices(devs.join(", ")))
        }
    }
}

/// Ensures that `--iso` names an image which can be loop-mounted from disk.
pub fn isofile(arg: &str, media: &dyn MediaProbe) -> Result<PathBuf, ValidationError> {
    let path = PathBuf::from(arg);

    if !path.exists() {
        return Err(ValidationError::IsoNotFound(path));
    }

    if !path.is_file() {
        return Err(ValidationError::IsoNotFile(path));
    }

    if !media.isiso(&path) {
        return Err(ValidationError::NotIso(path));
    }

    if media.removable().iter().any(|device| media.fileondev(&path, &device.dev)) {
        return Err(ValidationError::IsoOnRemovable(path));
    }

    Ok(fs::canonicalize(&path).unwrap_or(path))
}

/// Accepts `rawhide`, or a version newer than the installed one.
pub fn network_version(arg: &str, installed: &InstalledSystem) -> Result<String, ValidationError> {
    if arg.eq_ignore_ascii_case(RAWHIDE) {
        return Ok(RAWHIDE.to_owned());
    }

    let target = parse_version(arg).ok_or_else(|| ValidationError::VersionNaN(arg.to_owned()))?;

    let current = installed
        .version_number()
        .ok_or_else(|| ValidationError::InstalledVersion(installed.version.clone()))?;

    if target > current {
        Ok(arg.trim().to_owned())
    } else {
        Err(ValidationError::VersionTooLow(installed.version.clone()))
    }
}

/// Checks that the file is an armored GPG public key, returning its `file://` URI.
pub fn gpgkeyfile(arg: &str) -> Result<String, ValidationError> {
    let path = Path::new(arg.strip_prefix(FILE_SCHEME).unwrap_or(arg));
    let read_error = |why| ValidationError::GpgKeyRead { path: path.to_path_buf(), why };

    let mut head = Vec::with_capacity(GPG_HEADER.len());
    File::open(path)
        .and_then(|file| file.take(GPG_HEADER.len() as u64).read_to_end(&mut head))
        .map_err(read_error)?;

    if head != GPG_HEADER {
        return Err(ValidationError::NotGpgKey(path.to_path_buf()));
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_err(read_error)?.join(path)
    };

    Ok([FILE_SCHEME, &absolute.to_string_lossy()].concat())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeMedia;
    use test_case::test_case;

    const KEY: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----\nVersion: GnuPG v1\n\nmQINBFH...\n";

    fn fedora(version: &str) -> InstalledSystem { InstalledSystem::new("fedora", version) }

    #[test_case("rawhide", "20" => Ok("rawhide".to_owned()) ; "accepts rawhide")]
    #[test_case("RawHide", "20" => Ok("rawhide".to_owned()) ; "rawhide is case insensitive")]
    #[test_case("25", "20" => Ok("25".to_owned()) ; "accepts a newer version")]
    #[test_case("18", "20" => Err("version must be greater than 20".to_owned()) ; "rejects an older version")]
    #[test_case("20", "20" => Err("version must be greater than 20".to_owned()) ; "rejects the same version")]
    #[test_case("next", "20" => Err("version must be a number or \"rawhide\": found next".to_owned()) ; "rejects words")]
    #[test_case("21", "rawhide" => Err("cannot compare against installed version \"rawhide\"".to_owned()) ; "rejects unknown installed version")]
    fn version(arg: &str, installed: &str) -> Result<String, String> {
        network_version(arg, &fedora(installed)).map_err(|why| why.to_string())
    }

    #[test]
    fn auto_device_single() {
        let media = FakeMedia::with_media(vec![MediaReference::new("/dev/sr0", "/run/media/dvd", "iso9660")]);
        assert_eq!(device_or_mnt("auto", &media).unwrap().dev, Path::new("/dev/sr0"));
    }

    #[test]
    fn auto_device_none() {
        let media = FakeMedia::default();
        assert_eq!(
            device_or_mnt("auto", &media).unwrap_err().to_string(),
            "no install media found - please mount install media first"
        );
    }

    #[test]
    fn auto_device_multiple() {
        let media = FakeMedia::with_media(vec![
            MediaReference::new("/dev/sr0", "/run/media/dvd", "iso9660"),
            MediaReference::new("/dev/sdb1", "/run/media/usb", "vfat"),
        ]);
        assert_eq!(
            device_or_mnt("auto", &media).unwrap_err().to_string(),
            "multiple devices found. please choose one of (/dev/sr0, /dev/sdb1)"
        );
    }

    #[test]
    fn explicit_mount_point() {
        let dir = tempfile::tempdir().unwrap();
        let mnt = fs::canonicalize(dir.path()).unwrap();
        let media = FakeMedia::with_media(vec![
            MediaReference::new("/dev/sr0", "/run/media/dvd", "iso9660"),
            MediaReference::new("/dev/sdb1", &mnt, "vfat"),
        ]);

        // A trailing component which resolves back to the mount point.
        let arg = mnt.join("sub/..");
        fs::create_dir(mnt.join("sub")).unwrap();
        let found = device_or_mnt(&arg.to_string_lossy(), &media).unwrap();
        assert_eq!(found.dev, Path::new("/dev/sdb1"));

        let missing = device_or_mnt("/dev/sdz", &media).unwrap_err().to_string();
        assert_eq!(missing, "/dev/sdz: no install media found - please mount install media first");
    }

    #[test]
    fn iso_checks() {
        let dir = tempfile::tempdir().unwrap();
        let iso = dir.path().join("upgrade.iso");
        let text = dir.path().join("notes.txt");
        fs::write(&iso, b"image").unwrap();
        fs::write(&text, b"text").unwrap();

        let mut media = FakeMedia::default();
        media.isos.push(iso.clone());

        let check = |arg: &Path, media: &FakeMedia| {
            isofile(&arg.to_string_lossy(), media).map_err(|why| why.to_string())
        };

        assert!(check(&dir.path().join("missing.iso"), &media).unwrap_err().starts_with("File not found"));
        assert!(check(dir.path(), &media).unwrap_err().starts_with("Not a regular file"));
        assert!(check(&text, &media).unwrap_err().starts_with("Not an ISO 9660 image"));
        assert_eq!(check(&iso, &media).unwrap(), fs::canonicalize(&iso).unwrap());

        media.removable.push(MediaReference::new("/dev/sdb1", "/run/media/usb", "vfat"));
        media.on_removable.push(iso.clone());
        assert!(check(&iso, &media).unwrap_err().starts_with("ISO image on removable media"));
    }

    #[test]
    fn gpg_key_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("RPM-GPG-KEY");
        fs::write(&key, KEY).unwrap();

        let expected = ["file://", &key.to_string_lossy()].concat();
        assert_eq!(gpgkeyfile(&key.to_string_lossy()).unwrap(), expected);
        assert_eq!(gpgkeyfile(&expected).unwrap(), expected);
    }

    #[test]
    fn gpg_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("not-a-key");
        fs::write(&key, "-----BEGIN PGP SIGNATURE-----\n").unwrap();

        let why = gpgkeyfile(&key.to_string_lossy()).unwrap_err();
        assert!(matches!(why, ValidationError::NotGpgKey(_)));
        assert!(why.to_string().contains("not a GPG key"));

        let missing = gpgkeyfile(&dir.path().join("missing").to_string_lossy()).unwrap_err();
        assert!(matches!(missing, ValidationError::GpgKeyRead { .. }));
    }
}
