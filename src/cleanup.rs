//! Reverses staging, driven by the state that staging persisted.

use crate::{
    boot::BootManager,
    conf::{StagedState, UpgradeConf},
    layout::PathLayout,
    misc::format_error,
    options::{CleanMode, SkipFlags},
    util::{rm_f, rm_rf},
};
use std::{error::Error as StdError, io, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("cleanup was incomplete:\n  {}", _0.join("\n  "))]
    Incomplete(Vec<String>),
}

/// Steps which may be skipped, mirroring the staging skip flags.
pub type CleanupFlags = SkipFlags;

pub struct Cleaner<'a> {
    layout:   &'a PathLayout,
    boot:     &'a dyn BootManager,
    failures: Vec<String>,
}

impl<'a> Cleaner<'a> {
    pub fn new(layout: &'a PathLayout, boot: &'a dyn BootManager) -> Self {
        Cleaner { layout, boot, failures: Vec::new() }
    }

    /// Removes everything staging created, as far as `mode` asks for.
    ///
    /// Every step is attempted even when an earlier one fails; the failures
    /// are then returned together.
    pub fn cleanup(mut self, skip: CleanupFlags, mode: CleanMode) -> Result<(), CleanupError> {
        let state = match UpgradeConf::open(&self.layout.upgradeconf) {
            Ok(conf) => StagedState::load(&conf),
            Err(why) => {
                self.failed(&why);
                StagedState::default()
            }
        };

        if mode == CleanMode::None {
            return self.finish();
        }

        if !skip.bootloader {
            self.reset_boot(&state);
        }

        if mode == CleanMode::Bootloader {
            return self.finish();
        }

        if !skip.kernel {
            self.remove_boot(&state);
        }

        if !skip.packages {
            self.remove_cache(&state);
        }

        self.misc_cleanup();
        self.finish()
    }

    /// Removes the boot entry for the staged kernel.
    pub fn reset_boot(&mut self, state: &StagedState) {
        if let Some(ref kernel) = state.kernel {
            info!("removing boot entry for {}", kernel.display());
            if let Err(why) = self.boot.remove_entry(kernel) {
                self.failed(&why);
            }
        }
    }

    /// Removes the staged kernel and initrd.
    pub fn remove_boot(&mut self, state: &StagedState) {
        for image in state.kernel.iter().chain(state.initrd.iter()) {
            info!("removing {}", image.display());
            self.check(image, rm_f(image));
        }
    }

    /// Removes the cache and package dirs.
    pub fn remove_cache(&mut self, state: &StagedState) {
        let mut dirs = state.cleanup_dirs.clone().unwrap_or_default();

        // Anything staging could have created is removed, whatever was recorded.
        for dir in self.layout.default_cleanup_dirs() {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }

        for dir in dirs {
            info!("removing {}", dir.display());
            self.check(&dir, rm_rf(&dir));
        }
    }

    pub fn misc_cleanup(&mut self) {
        let layout = self.layout;

        info!("removing symlink {}", layout.upgradelink.display());
        self.check(&layout.upgradelink, rm_f(&layout.upgradelink));

        for dir in &[&layout.upgraderoot, &layout.target_requires] {
            info!("removing {}", dir.display());
            self.check(dir, rm_rf(dir));
        }
    }

    fn check(&mut self, path: &Path, removed: io::Result<()>) {
        if let Err(why) = removed {
            let message = format!("failed to remove {}: {}", path.display(), why);
            error!("{}", message);
            self.failures.push(message);
        }
    }

    fn failed(&mut self, why: &(dyn StdError + 'static)) {
        let message = format_error(why);
        error!("{}", message);
        self.failures.push(message);
    }

    fn finish(self) -> Result<(), CleanupError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(CleanupError::Incomplete(self.failures))
        }
    }
}
