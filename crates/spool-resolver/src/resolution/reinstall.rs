use tracing::debug;

use spool_configuration::{ResolverSettings, UpgradeStrategy};
use spool_types::{DirectUrl, InstalledDist};

use crate::candidate::{LinkCandidate, Origin};

/// What to do with a resolved distribution that is not satisfied by an installed candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InstallAction {
    /// The installed distribution is the one we resolved to.
    Skip,
    /// Nothing is installed; install the distribution.
    Install,
    /// Replace the installed distribution.
    Reinstall,
}

/// Decide whether the distribution behind the link replaces what is installed.
pub(crate) fn decide(
    candidate: &LinkCandidate,
    installed: Option<&InstalledDist>,
    settings: &ResolverSettings,
) -> InstallAction {
    let Some(installed) = installed else {
        return InstallAction::Install;
    };

    if settings.force_reinstall(&installed.name) {
        debug!("Reinstalling {installed} as requested");
        return InstallAction::Reinstall;
    }

    match (candidate.origin(), &installed.direct_url) {
        (Origin::Index, _) => {
            if installed.version == candidate.version {
                debug!("Requirement already satisfied: {installed}");
                InstallAction::Skip
            } else {
                debug!(
                    "Replacing {installed} with {}=={}",
                    candidate.name, candidate.version
                );
                InstallAction::Reinstall
            }
        }
        (Origin::Direct, None) => {
            debug!("Replacing {installed}, which was installed from an index");
            InstallAction::Reinstall
        }
        (Origin::Direct, Some(direct_url)) => {
            let link = candidate.link();
            // Local files may have changed in place; anything but the most conservative strategy
            // re-fetches direct URLs.
            if link.is_file()
                || settings.upgrade_strategy != UpgradeStrategy::ToSatisfyOnly
                || !DirectUrl::from_link(link).matches(direct_url)
                || link.is_editable() != installed.editable
            {
                debug!("Replacing {installed} with {link}");
                InstallAction::Reinstall
            } else {
                debug!("Requirement already satisfied: {installed} (from {link})");
                InstallAction::Skip
            }
        }
    }
}
