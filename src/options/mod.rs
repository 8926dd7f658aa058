//! Turns raw command-line values into one coherent upgrade request.

mod checks;
mod errors;
mod product;
mod repo;

pub use self::{
    checks::{device_or_mnt, gpgkeyfile, isofile, network_version, RAWHIDE},
    errors::{ValidationError, PRODUCT_GUIDANCE},
    product::Product,
    repo::{RepoAction, RepoActionKind, RepoActions},
};

use crate::{
    media::{MediaProbe, MediaReference},
    release::{parse_version, InstalledSystem},
    INSTREPO_ID,
};
use log::LevelFilter;
use std::path::PathBuf;

/// The first release which is split into products.
const PRODUCT_GENERATION: f64 = 21.0;

/// The last release which predates products.
const LAST_UNIFIED_RELEASE: f64 = 20.0;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CleanMode {
    #[default]
    None,
    /// Only revert the bootloader changes.
    Bootloader,
    /// Remove everything that was staged.
    All,
}

/// Debugging switches which skip parts of the prepare or cleanup sequences.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SkipFlags {
    pub packages:   bool,
    pub kernel:     bool,
    pub bootloader: bool,
}

/// Where the upgrade packages come from.
#[derive(Clone, Debug, PartialEq)]
pub enum Source {
    Device(MediaReference),
    Iso(PathBuf),
    Network(String),
}

/// Option values exactly as given on the command line.
#[derive(Clone, Debug)]
pub struct RawOptions {
    pub loglevel:        LevelFilter,
    pub debuglog:        Option<PathBuf>,
    pub reboot:          bool,
    pub product:         Option<String>,
    pub device:          Option<String>,
    pub iso:             Option<String>,
    pub network:         Option<String>,
    /// Repo flags in the order they were given.
    pub repos:           Vec<(RepoActionKind, String)>,
    pub instrepo:        Option<String>,
    pub instrepokey:     Option<String>,
    pub clean:           bool,
    pub resetbootloader: bool,
    pub skip:            SkipFlags,
}

impl Default for RawOptions {
    fn default() -> Self {
        RawOptions {
            loglevel:        LevelFilter::Warn,
            debuglog:        None,
            reboot:          false,
            product:         None,
            device:          None,
            iso:             None,
            network:         None,
            repos:           Vec::new(),
            instrepo:        None,
            instrepokey:     None,
            clean:           false,
            resetbootloader: false,
            skip:            SkipFlags::default(),
        }
    }
}

/// A validated, internally consistent upgrade request.
#[derive(Clone, Debug, PartialEq)]
pub struct UpgradeRequest {
    pub loglevel:        LevelFilter,
    pub debuglog:        Option<PathBuf>,
    pub reboot:          bool,
    pub product:         Option<Product>,
    /// Always set unless `clean` is requested.
    pub source:          Option<Source>,
    pub repos:           Vec<RepoAction>,
    pub instrepo:        Option<String>,
    /// A `file://` URI to the key which signs the instrepo.
    pub instrepokey:     Option<String>,
    pub skip:            SkipFlags,
    pub clean:           CleanMode,
    pub resetbootloader: bool,
}

impl UpgradeRequest {
    pub fn validate(
        raw: RawOptions,
        media: &dyn MediaProbe,
        installed: &InstalledSystem,
    ) -> Result<Self, ValidationError> {
        let product = raw.product.as_deref().map(str::parse::<Product>).transpose()?;

        let mut actions = RepoActions::new();
        for (kind, value) in &raw.repos {
            actions.push(*kind, value)?;
        }

        let clean = if raw.clean {
            CleanMode::All
        } else if raw.resetbootloader {
            CleanMode::Bootloader
        } else {
            CleanMode::None
        };

        let given = [raw.device.is_some(), raw.iso.is_some(), raw.network.is_some()]
            .iter()
            .filter(|&&given| given)
            .count();

        match (clean, given) {
            (CleanMode::None, 0) => return Err(ValidationError::SourceRequired),
            (CleanMode::None, 1) => (),
            (CleanMode::None, _) => return Err(ValidationError::MultipleSources),
            (_, 0) => (),
            (_, _) => return Err(ValidationError::SourceWithClean),
        }

        let source = if let Some(ref device) = raw.device {
            Some(Source::Device(device_or_mnt(device, media)?))
        } else if let Some(ref iso) = raw.iso {
            Some(Source::Iso(isofile(iso, media)?))
        } else if let Some(ref version) = raw.network {
            Some(Source::Network(network_version(version, installed)?))
        } else {
            None
        };

        let instrepokey = raw.instrepokey.as_deref().map(gpgkeyfile).transpose()?;

        let mut repos = actions.build();
        let mut instrepo = raw.instrepo;

        // An instrepo URL is added as a repo of its own.
        if instrepo.as_ref().map_or(false, |repo| repo.contains("://")) {
            if let Some(url) = instrepo.replace(INSTREPO_ID.to_owned()) {
                repos.push(RepoAction::add(INSTREPO_ID, &url));
            }
        }

        if let (Some(repo), Some(key)) = (instrepo.as_ref(), instrepokey.as_ref()) {
            repos.push(RepoAction::gpgkey(repo, key));
        }

        if let Some(Source::Network(ref target)) = source {
            if product.is_none() && requires_product(installed, target) {
                return Err(ValidationError::ProductRequired);
            }
        }

        Ok(UpgradeRequest {
            loglevel: raw.loglevel,
            debuglog: raw.debuglog,
            reboot: raw.reboot,
            product,
            source,
            repos,
            instrepo,
            instrepokey,
            skip: raw.skip,
            clean,
            resetbootloader: clean != CleanMode::None,
        })
    }
}

/// Whether upgrading to `target` crosses into the product-based generation.
///
/// Only installs of the last unified release or older are affected; an installed
/// version which is not a number never requires a product.
pub fn requires_product(installed: &InstalledSystem, target: &str) -> bool {
    if !installed.is_fedora() {
        return false;
    }

    let below_cutoff =
        installed.version_number().map_or(false, |version| version <= LAST_UNIFIED_RELEASE);

    let crosses = target.eq_ignore_ascii_case(RAWHIDE)
        || parse_version(target).map_or(false, |version| version >= PRODUCT_GENERATION);

    below_cutoff && crosses
}
