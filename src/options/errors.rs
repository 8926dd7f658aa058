use std::{io, path::PathBuf};
use thiserror::Error;

pub const PRODUCT_GUIDANCE: &str = "This installation of Fedora does not belong to a product, so you
must provide the --product=PRODUCTNAME option to specify what product
you want to upgrade to. PRODUCTNAME should be one of:

 workstation: the default Fedora experience for laptops and desktops
 server: the default Fedora experience for servers
 cloud: a base image for use on public and private clouds
 nonproduct: choose this if none of the above apply; in particular,
   choose this if you are using an alternate-desktop spin of Fedora

See https://fedoraproject.org/wiki/Upgrading for more information.";

/// Incoherent or unusable command-line input, raised before any mutation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("SOURCE is required (--network, --device, --iso)")]
    SourceRequired,

    #[error("only one SOURCE may be given (--network, --device, --iso)")]
    MultipleSources,

    #[error("cleanup commands cannot be combined with a SOURCE")]
    SourceWithClean,

    #[error("{}no install media found - please mount install media first", arg_prefix(arg))]
    NoMedia { arg: Option<PathBuf> },

    #[error("multiple devices found. please choose one of ({})", _0)]
    MultipleDevices(String),

    #[error("File not found: {}", _0.display())]
    IsoNotFound(PathBuf),

    #[error("Not a regular file: {}", _0.display())]
    IsoNotFile(PathBuf),

    #[error("Not an ISO 9660 image: {}", _0.display())]
    NotIso(PathBuf),

    #[error(
        "ISO image on removable media\nSorry, but this isn't supported yet.\nCopy the image to \
         your hard drive or burn it to a disk."
    )]
    IsoOnRemovable(PathBuf),

    #[error("version must be a number or \"rawhide\": found {}", _0)]
    VersionNaN(String),

    #[error("version must be greater than {}", _0)]
    VersionTooLow(String),

    #[error("cannot compare against installed version {:?}", _0)]
    InstalledVersion(String),

    #[error("{}: {}", path.display(), why)]
    GpgKeyRead { path: PathBuf, why: io::Error },

    #[error("File is not a GPG key: {}", _0.display())]
    NotGpgKey(PathBuf),

    #[error("PRODUCTNAME must be one of: {}", super::Product::names())]
    InvalidProduct(String),

    #[error("--addrepo {}: value should be REPOID=[@]URL", _0)]
    InvalidRepo(String),

    #[error("{}", PRODUCT_GUIDANCE)]
    ProductRequired,
}

fn arg_prefix(arg: &Option<PathBuf>) -> String {
    arg.as_ref().map_or_else(String::new, |arg| format!("{}: ", arg.display()))
}
