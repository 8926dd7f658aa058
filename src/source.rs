//! Resolves a validated request into one concrete, usable source.

use crate::{
    layout::PathLayout,
    media::{MediaProbe, MediaReference},
    misc::format_error,
    options::{RepoAction, Source, UpgradeRequest},
    DEVICE_REPO_ID, ISO_REPO_ID,
};
use std::path::Path;

#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedSource {
    /// Packages are read from a mounted device or image.
    Media(MediaReference),
    /// Packages are fetched for the given release version.
    Network(String),
}

impl ResolvedSource {
    /// Where the source is mounted, if it is mounted at all.
    pub fn mount_path(&self) -> Option<&Path> {
        match self {
            ResolvedSource::Media(media) => Some(&media.mnt),
            ResolvedSource::Network(_) => None,
        }
    }

    pub fn media(&self) -> Option<&MediaReference> {
        match self {
            ResolvedSource::Media(media) => Some(media),
            ResolvedSource::Network(_) => None,
        }
    }
}

/// Resolves the request's source, adding a repo for mounted media.
///
/// Returns `None` when the source could not be mounted, in which case the
/// caller must not continue with staging.
pub fn resolve(
    request: &mut UpgradeRequest,
    media: &dyn MediaProbe,
    layout: &PathLayout,
) -> Option<ResolvedSource> {
    let (repoid, reference) = match request.source.clone()? {
        Source::Network(version) => return Some(ResolvedSource::Network(version)),
        Source::Device(reference) => (DEVICE_REPO_ID, reference),
        Source::Iso(iso) => match media.loopmount(&iso, &layout.isomount) {
            Ok(reference) => (ISO_REPO_ID, reference),
            Err(why) => {
                error!("{}", format_error(&why));
                if let Some(output) = why.output() {
                    info!("mount output:\n{}", output);
                }
                return None;
            }
        },
    };

    let url = ["file://", &reference.mnt.to_string_lossy()].concat();
    request.repos.push(RepoAction::add(repoid, &url));

    if request.instrepo.is_none() {
        request.instrepo = Some(repoid.to_owned());
    }

    Some(ResolvedSource::Media(reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        options::{CleanMode, RepoActionKind, SkipFlags},
        testing::FakeMedia,
    };
    use log::LevelFilter;
    use std::path::PathBuf;

    fn request(source: Source) -> UpgradeRequest {
        UpgradeRequest {
            loglevel:        LevelFilter::Warn,
            debuglog:        None,
            reboot:          false,
            product:         None,
            source:          Some(source),
            repos:           Vec::new(),
            instrepo:        None,
            instrepokey:     None,
            skip:            SkipFlags::default(),
            clean:           CleanMode::None,
            resetbootloader: false,
        }
    }

    #[test]
    fn device_adds_repo() {
        let dvd = MediaReference::new("/dev/sr0", "/run/media/dvd", "iso9660");
        let mut request = request(Source::Device(dvd.clone()));

        let resolved = resolve(&mut request, &FakeMedia::default(), &PathLayout::default());

        assert_eq!(resolved, Some(ResolvedSource::Media(dvd)));
        assert_eq!(
            request.repos,
            vec![RepoAction::new(RepoActionKind::Add, "upgradedevice=file:///run/media/dvd")]
        );
        assert_eq!(request.instrepo.as_deref(), Some(DEVICE_REPO_ID));
    }

    #[test]
    fn iso_is_loop_mounted() {
        let layout = PathLayout::rooted("/tmp/root");
        let media = FakeMedia::default();
        let mut request = request(Source::Iso(PathBuf::from("/srv/upgrade.iso")));
        request.instrepo = Some("updates".into());

        let resolved = resolve(&mut request, &media, &layout).unwrap();

        assert_eq!(resolved.mount_path(), Some(layout.isomount.as_path()));
        assert_eq!(
            *media.mounted.borrow(),
            vec![(PathBuf::from("/srv/upgrade.iso"), layout.isomount.clone())]
        );
        assert_eq!(request.repos[0].payload, "upgradeiso=file:///tmp/root/run/system-upgrade/iso");
        assert_eq!(request.instrepo.as_deref(), Some("updates"));
    }

    #[test]
    fn iso_mount_failure() {
        let media = FakeMedia { mount_failure: Some("wrong fs type".into()), ..FakeMedia::default() };
        let mut request = request(Source::Iso(PathBuf::from("/srv/upgrade.iso")));

        assert_eq!(resolve(&mut request, &media, &PathLayout::default()), None);
        assert!(request.repos.is_empty());
        assert_eq!(request.instrepo, None);
    }

    #[test]
    fn network_mounts_nothing() {
        let mut request = request(Source::Network("21".into()));
        let resolved = resolve(&mut request, &FakeMedia::default(), &PathLayout::default());

        assert_eq!(resolved, Some(ResolvedSource::Network("21".into())));
        assert_eq!(resolved.unwrap().mount_path(), None);
        assert!(request.repos.is_empty());
    }
}
