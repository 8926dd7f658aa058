//! Identity of the currently installed system.

use os_release::OsRelease;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("failed to fetch /etc/os-release")]
    OsRelease(#[source] io::Error),
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstalledSystem {
    /// Lowercase distribution id, such as `fedora`.
    pub distro:  String,
    pub version: String,
}

impl InstalledSystem {
    pub fn new<D: Into<String>, V: Into<String>>(distro: D, version: V) -> Self {
        InstalledSystem { distro: distro.into().to_lowercase(), version: version.into() }
    }

    pub fn detect() -> Result<Self, ReleaseError> {
        let release = OsRelease::new().map_err(ReleaseError::OsRelease)?;
        Ok(InstalledSystem::new(release.id, release.version_id))
    }

    /// The installed version as a number, if it is one.
    pub fn version_number(&self) -> Option<f64> { parse_version(&self.version) }

    pub fn is_fedora(&self) -> bool { self.distro == "fedora" }
}

/// Parses a numeric release version, such as `20` or `20.1`.
pub fn parse_version(version: &str) -> Option<f64> {
    version.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
