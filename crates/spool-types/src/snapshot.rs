//! An in-memory index, preparer and environment, read from a JSON snapshot.
//!
//! ```json
//! {
//!   "packages": {
//!     "foo": [
//!       {"version": "1.0", "requires-dist": ["bar<2.0"], "requires-python": ">=3.8"},
//!       {"version": "2.0", "requires-dist": ["bar>=2.0"], "yanked": "broken metadata"}
//!     ]
//!   },
//!   "direct": [
//!     {"url": "https://example.com/baz-0.1.tar.gz", "name": "baz", "version": "0.1"}
//!   ],
//!   "installed": [
//!     {"name": "foo", "version": "1.0"}
//!   ]
//! }
//! ```
use std::path::{Path, PathBuf};
use std::str::FromStr;

use pep440_rs::{Version, VersionParseError, VersionSpecifiers, VersionSpecifiersParseError};
use pep508_rs::{ExtraName, PackageName, Pep508Error, Requirement};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use url::Url;

use crate::{
    DirectUrl, HashDigest, IndexCandidate, InstalledDist, InstalledPackages, Link, Metadata,
    PackageIndex, Preparer, Yanked,
};

/// An index, preparer and installed environment backed entirely by memory.
#[derive(Debug, Default, Clone)]
pub struct IndexSnapshot {
    /// The files of each package, newest version first.
    releases: FxHashMap<PackageName, Vec<IndexCandidate>>,
    /// The metadata of every known file, keyed by URL without fragment.
    metadata: FxHashMap<Url, Metadata>,
    installed: FxHashMap<PackageName, InstalledDist>,
    unsupported_wheels: FxHashSet<Url>,
}

impl IndexSnapshot {
    /// Read a snapshot from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let content = fs_err::read_to_string(path)?;
        let raw = serde_json::from_str::<RawSnapshot>(&content)
            .map_err(|err| SnapshotError::Json(path.to_path_buf(), err))?;
        let snapshot = Self::try_from(raw)?;
        tracing::debug!(
            "Loaded snapshot with {} packages from `{}`",
            snapshot.releases.len(),
            path.display()
        );
        Ok(snapshot)
    }

    /// Read a snapshot from a JSON value.
    pub fn from_json(value: serde_json::Value) -> Result<Self, SnapshotError> {
        let raw = serde_json::from_value::<RawSnapshot>(value)
            .map_err(|err| SnapshotError::Json(PathBuf::from("<memory>"), err))?;
        Self::try_from(raw)
    }

    /// Return a copy of this snapshot with the installed environment replaced.
    #[must_use]
    pub fn with_installed(mut self, installed: impl IntoIterator<Item = InstalledDist>) -> Self {
        self.installed = installed
            .into_iter()
            .map(|dist| (dist.name.clone(), dist))
            .collect();
        self
    }

    /// All files of the package, newest first, regardless of specifiers.
    pub fn releases(&self, name: &PackageName) -> &[IndexCandidate] {
        self.releases.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

impl PackageIndex for IndexSnapshot {
    fn find_best_candidates(
        &self,
        name: &PackageName,
        specifiers: &VersionSpecifiers,
        hashes: &[HashDigest],
    ) -> anyhow::Result<Vec<IndexCandidate>> {
        let matching = self
            .releases(name)
            .iter()
            .filter(|candidate| specifiers.contains(&candidate.version))
            .filter(|candidate| candidate.link.matches_hashes(hashes))
            .collect::<Vec<_>>();

        // Pre-releases are only offered when requested explicitly, or when nothing else matches.
        let explicit = specifiers
            .iter()
            .any(|specifier| specifier.version().any_prerelease());
        let any_final = matching
            .iter()
            .any(|candidate| !candidate.version.any_prerelease());

        Ok(matching
            .into_iter()
            .filter(|candidate| explicit || !any_final || !candidate.version.any_prerelease())
            .cloned()
            .collect())
    }

    fn is_supported_wheel(&self, link: &Link) -> bool {
        !self.unsupported_wheels.contains(&link.url_without_fragment())
    }
}

impl Preparer for IndexSnapshot {
    fn prepare_metadata(&self, link: &Link) -> anyhow::Result<Metadata> {
        self.metadata
            .get(&link.url_without_fragment())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No metadata available for: {link}"))
    }
}

impl InstalledPackages for IndexSnapshot {
    fn get_package(&self, name: &PackageName) -> Option<&InstalledDist> {
        self.installed.get(name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawSnapshot {
    #[serde(default)]
    packages: FxHashMap<PackageName, Vec<RawRelease>>,
    #[serde(default)]
    direct: Vec<RawDirect>,
    #[serde(default)]
    installed: Vec<RawInstalled>,
    #[serde(default)]
    unsupported_wheels: Vec<Url>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawRelease {
    version: String,
    #[serde(default)]
    requires_dist: Vec<String>,
    requires_python: Option<String>,
    #[serde(default)]
    provides_extras: Vec<ExtraName>,
    yanked: Option<Yanked>,
    #[serde(default)]
    hashes: Vec<HashDigest>,
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawDirect {
    url: Url,
    name: PackageName,
    version: String,
    #[serde(default)]
    requires_dist: Vec<String>,
    requires_python: Option<String>,
    #[serde(default)]
    provides_extras: Vec<ExtraName>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawInstalled {
    name: PackageName,
    version: String,
    direct_url: Option<DirectUrl>,
    #[serde(default)]
    editable: bool,
    #[serde(default)]
    requires_dist: Vec<String>,
    #[serde(default)]
    provides_extras: Vec<ExtraName>,
}

impl TryFrom<RawSnapshot> for IndexSnapshot {
    type Error = SnapshotError;

    fn try_from(raw: RawSnapshot) -> Result<Self, Self::Error> {
        let mut snapshot = Self::default();

        for (name, raw_releases) in raw.packages {
            let mut releases = Vec::with_capacity(raw_releases.len());
            for raw_release in raw_releases {
                let version = parse_version(&raw_release.version)?;
                let filename = raw_release.filename.unwrap_or_else(|| {
                    format!(
                        "{}-{version}-py3-none-any.whl",
                        name.as_ref().replace('-', "_")
                    )
                });
                let url = Url::parse(&format!("https://files.example.com/{name}/{filename}"))
                    .map_err(|err| SnapshotError::Url(filename.clone(), err))?;
                let link = Link::new(url)
                    .with_hashes(raw_release.hashes)
                    .with_yanked(raw_release.yanked);

                snapshot.metadata.insert(
                    link.url_without_fragment(),
                    Metadata {
                        name: name.clone(),
                        version: version.clone(),
                        requires_dist: parse_requirements(&raw_release.requires_dist)?,
                        requires_python: parse_specifiers(raw_release.requires_python.as_deref())?,
                        provides_extras: raw_release.provides_extras,
                    },
                );
                releases.push(IndexCandidate { version, link });
            }
            // Best first.
            releases.sort_by(|a, b| b.version.cmp(&a.version));
            snapshot.releases.insert(name, releases);
        }

        for raw_direct in raw.direct {
            let link = Link::new(raw_direct.url);
            snapshot.metadata.insert(
                link.url_without_fragment(),
                Metadata {
                    name: raw_direct.name,
                    version: parse_version(&raw_direct.version)?,
                    requires_dist: parse_requirements(&raw_direct.requires_dist)?,
                    requires_python: parse_specifiers(raw_direct.requires_python.as_deref())?,
                    provides_extras: raw_direct.provides_extras,
                },
            );
        }

        for raw_installed in raw.installed {
            let dist = InstalledDist {
                name: raw_installed.name,
                version: parse_version(&raw_installed.version)?,
                requires_dist: parse_requirements(&raw_installed.requires_dist)?,
                provides_extras: raw_installed.provides_extras,
                direct_url: raw_installed.direct_url,
                editable: raw_installed.editable,
            };
            snapshot.installed.insert(dist.name.clone(), dist);
        }

        snapshot.unsupported_wheels = raw
            .unsupported_wheels
            .into_iter()
            .map(|mut url| {
                url.set_fragment(None);
                url
            })
            .collect();

        Ok(snapshot)
    }
}

fn parse_version(version: &str) -> Result<Version, SnapshotError> {
    Version::from_str(version).map_err(|err| SnapshotError::Version(version.to_string(), err))
}

fn parse_specifiers(specifiers: Option<&str>) -> Result<Option<VersionSpecifiers>, SnapshotError> {
    specifiers
        .map(|specifiers| {
            VersionSpecifiers::from_str(specifiers)
                .map_err(|err| SnapshotError::Specifiers(specifiers.to_string(), err))
        })
        .transpose()
}

fn parse_requirements(requirements: &[String]) -> Result<Vec<Requirement>, SnapshotError> {
    requirements
        .iter()
        .map(|requirement| {
            Requirement::from_str(requirement)
                .map_err(|err| SnapshotError::Requirement(requirement.clone(), Box::new(err)))
        })
        .collect()
}

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to parse snapshot: `{}`", _0.display())]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("Invalid version in snapshot: `{0}`")]
    Version(String, #[source] VersionParseError),

    #[error("Invalid `Requires-Python` in snapshot: `{0}`")]
    Specifiers(String, #[source] VersionSpecifiersParseError),

    #[error("Invalid requirement in snapshot: `{0}`")]
    Requirement(String, #[source] Box<Pep508Error>),

    #[error("Invalid filename in snapshot: `{0}`")]
    Url(String, #[source] url::ParseError),
}
