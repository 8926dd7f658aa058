#[macro_use]
extern crate log;

mod cli;
mod logging;

use crate::logging::setup_logging;
use anyhow::Context;
use std::process::{exit, Command};
use system_upgrade::{
    boot::Grubby,
    cleanup::Cleaner,
    is_root,
    layout::PathLayout,
    media::{MediaProbe, SystemMedia},
    options::{CleanMode, UpgradeRequest},
    packages::{self, BootImages},
    release::InstalledSystem,
    source::resolve,
    stage::Stager,
    status::StatusExt,
};

use self::error::Error;

pub mod error {
    use system_upgrade::{
        cleanup::CleanupError, packages::PackageError, stage::StageError,
    };
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum Error {
        #[error("root is required for this action: rerun with `sudo`")]
        NotRoot,
        #[error("cannot continue: the upgrade source could not be mounted")]
        NoSource,
        #[error("failed to find the packages to upgrade")]
        Packages(#[from] PackageError),
        #[error("failed to prepare the upgrade")]
        Stage(#[from] StageError),
        #[error(transparent)]
        Cleanup(#[from] CleanupError),
        #[error(transparent)]
        Reboot(#[from] anyhow::Error),
    }
}

pub fn main() {
    let raw = cli::raw_options(&cli::command().get_matches());

    if let Err(why) = setup_logging(raw.loglevel, raw.debuglog.as_deref()) {
        eprintln!("system-upgrade: failed to set up logging: {}", why);
    }

    let installed = InstalledSystem::detect().unwrap_or_else(|why| {
        warn!("{}: assuming an unknown system", why);
        InstalledSystem::new("", "")
    });

    debug!("installed system: {} {}", installed.distro, installed.version);

    let media = SystemMedia;
    let mut request = match UpgradeRequest::validate(raw, &media, &installed) {
        Ok(request) => request,
        Err(why) => {
            cli::report_invalid(&why);
            exit(2);
        }
    };

    if let Err(why) = main_(&mut request, &media) {
        cli::report_error(&why);
        exit(1);
    }
}

fn main_(request: &mut UpgradeRequest, media: &dyn MediaProbe) -> Result<(), Error> {
    if !is_root() {
        return Err(Error::NotRoot);
    }

    let layout = PathLayout::default();
    let boot = Grubby::default();

    if request.clean != CleanMode::None {
        Cleaner::new(&layout, &boot).cleanup(request.skip, request.clean)?;
        cli::report_cleaned(request.clean);
        return Ok(());
    }

    let source = resolve(request, media, &layout).ok_or(Error::NoSource)?;

    for action in &request.repos {
        info!("repo: {}", action);
    }

    if let Some(ref instrepo) = request.instrepo {
        info!("boot images come from {}", instrepo);
    }

    let stager = Stager::new(&layout, &boot, media);

    if request.skip.packages {
        stager.setup_upgradelink()?;
        stager.setup_upgraderoot()?;
    } else {
        let packages = packages::enumerate(&source, &layout)?;
        info!("staging {} packages", packages.len());
        stager.prep_upgrade(&packages)?;
    }

    if let Some(media) = source.media() {
        stager.setup_media_mount(media)?;
    }

    if !request.skip.kernel {
        stager.copy_boot_images(&BootImages::from_source(&source, &layout))?;
    }

    if !request.skip.bootloader {
        stager.prep_boot(&layout.kernel, &layout.initrd)?;
    }

    cli::report_prepared(&source, request.reboot);

    if request.reboot {
        reboot()?;
    }

    Ok(())
}

fn reboot() -> anyhow::Result<()> {
    Command::new("systemctl")
        .arg("reboot")
        .status()
        .context("failed to spawn systemctl")?
        .as_result()
        .context("systemctl reboot failed")
}
