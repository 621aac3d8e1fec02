use anyhow::Result;
use pep440_rs::{Version, VersionSpecifiers};
use pep508_rs::PackageName;

use crate::{HashDigest, InstalledDist, Link, Metadata};

//  ┌────────────────┐
//  │spool-resolver  │
//  └───┬────┬────┬──┘
//      │    │    │
//      ▼    │    ▼
//  ┌──────┐ │ ┌──────────────────┐
//  │index │ │ │installed packages│
//  └──────┘ │ └──────────────────┘
//           ▼
//      ┌─────────┐
//      │preparer │
//      └─────────┘
//
// The resolver only sees these traits. Fetching and caching index pages, downloading and building
// distributions, and scanning `site-packages` live behind them.

/// A file offered by the index for a version of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexCandidate {
    pub version: Version,
    pub link: Link,
}

/// A package index (e.g., PyPI, or a set of `--find-links` directories).
pub trait PackageIndex {
    /// Return the files available for the package that satisfy the specifiers (and, if any are
    /// given, carry one of the hashes), best first.
    ///
    /// The order reflects the index's own preferences (e.g., newer versions first, wheels before
    /// source distributions, pre-releases only when requested); the resolver respects it as-is.
    fn find_best_candidates(
        &self,
        name: &PackageName,
        specifiers: &VersionSpecifiers,
        hashes: &[HashDigest],
    ) -> Result<Vec<IndexCandidate>>;

    /// Returns `true` if the wheel behind the link is compatible with the target platform.
    fn is_supported_wheel(&self, link: &Link) -> bool {
        let _ = link;
        true
    }
}

/// Produces the metadata of a distribution, downloading or building it as needed.
pub trait Preparer {
    fn prepare_metadata(&self, link: &Link) -> Result<Metadata>;
}

/// The distributions already installed in the target environment.
pub trait InstalledPackages {
    fn get_package(&self, name: &PackageName) -> Option<&InstalledDist>;
}
