use pep440_rs::{Version, VersionSpecifiers};
use pep508_rs::{ExtraName, PackageName, Requirement};

/// The subset of the core metadata fields the resolver relies on.
///
/// See: <https://packaging.python.org/en/latest/specifications/core-metadata/>
#[derive(Debug, Clone)]
pub struct Metadata {
    pub name: PackageName,
    pub version: Version,
    pub requires_dist: Vec<Requirement>,
    pub requires_python: Option<VersionSpecifiers>,
    pub provides_extras: Vec<ExtraName>,
}

impl Metadata {
    /// Returns `true` if the distribution declares the given extra in `Provides-Extra`.
    pub fn provides_extra(&self, extra: &ExtraName) -> bool {
        self.provides_extras.contains(extra)
    }
}
