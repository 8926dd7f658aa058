#![deny(clippy::all)]

#[macro_use]
extern crate cascade;
#[macro_use]
extern crate fomat_macros;
#[macro_use]
extern crate log;

pub mod boot;
pub mod cleanup;
pub mod conf;
pub mod layout;
pub mod media;
pub mod misc;
pub mod options;
pub mod packages;
pub mod release;
pub mod source;
pub mod stage;
pub mod status;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

/// Label of the boot menu entry that starts the upgrade.
pub const BOOT_BANNER: &str = "System Upgrade";

/// Repo id under which an explicit `--instrepo` URL is added.
pub const INSTREPO_ID: &str = "instrepo";

/// Repo id under which a `--device` mount point is added.
pub const DEVICE_REPO_ID: &str = "upgradedevice";

/// Repo id under which a loop-mounted `--iso` is added.
pub const ISO_REPO_ID: &str = "upgradeiso";

/// Returns true when the process runs with an effective uid of root.
pub fn is_root() -> bool { unsafe { libc::geteuid() == 0 } }
