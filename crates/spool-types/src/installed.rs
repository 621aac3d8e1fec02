use std::fmt::{Display, Formatter};

use pep440_rs::Version;
use pep508_rs::{ExtraName, PackageName, Requirement};

use crate::DirectUrl;

/// A distribution present in the target environment.
#[derive(Debug, Clone)]
pub struct InstalledDist {
    pub name: PackageName,
    pub version: Version,
    /// The `Requires-Dist` entries recorded in the installed `METADATA`.
    pub requires_dist: Vec<Requirement>,
    pub provides_extras: Vec<ExtraName>,
    /// The `direct_url.json` record, if the distribution was installed from a direct URL.
    pub direct_url: Option<DirectUrl>,
    pub editable: bool,
}

impl InstalledDist {
    /// Returns `true` if the distribution was installed from a direct URL rather than an index.
    pub fn is_direct_url(&self) -> bool {
        self.direct_url.is_some()
    }
}

impl Display for InstalledDist {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}=={}", self.name, self.version)
    }
}
