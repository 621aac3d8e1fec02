use std::cell::OnceCell;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

use itertools::Itertools;
use pep440_rs::Version;
use pep508_rs::{ExtraName, PackageName};

use spool_types::{InstalledDist, Link, Metadata, Preparer};

use crate::error::ResolveError;
use crate::identifier::Identifier;
use crate::requirement::Requirement;

/// A concrete choice for an identifier.
///
/// Candidates are created once per distinct source and shared, so two candidates are equal only
/// if they are the same instance.
#[derive(Clone)]
pub enum Candidate {
    /// A distribution already present in the environment.
    Installed(Rc<InstalledCandidate>),
    /// A distribution file, found on the index or given as a direct URL.
    Link(Rc<LinkCandidate>),
    /// A base candidate with extras enabled.
    Extras(Rc<ExtrasCandidate>),
    /// The target interpreter.
    Python(Rc<PythonCandidate>),
}

impl Candidate {
    pub fn identifier(&self) -> Identifier {
        match self {
            Self::Installed(installed) => Identifier::base(installed.dist.name.clone()),
            Self::Link(link) => Identifier::base(link.name.clone()),
            Self::Extras(extras) => {
                Identifier::package(extras.name.clone(), extras.extras.iter().cloned())
            }
            Self::Python(_) => Identifier::Python,
        }
    }

    /// The name of the package, or `None` for the interpreter.
    pub fn name(&self) -> Option<&PackageName> {
        match self {
            Self::Installed(installed) => Some(&installed.dist.name),
            Self::Link(link) => Some(&link.name),
            Self::Extras(extras) => Some(&extras.name),
            Self::Python(_) => None,
        }
    }

    pub fn version(&self) -> &Version {
        match self {
            Self::Installed(installed) => &installed.dist.version,
            Self::Link(link) => &link.version,
            Self::Extras(extras) => extras.base.version(),
            Self::Python(python) => &python.version,
        }
    }

    /// The link the candidate would be installed from, if it is not already installed.
    pub fn link(&self) -> Option<&Link> {
        match self {
            Self::Link(link) => Some(&link.link),
            Self::Extras(extras) => extras.base.link(),
            Self::Installed(_) | Self::Python(_) => None,
        }
    }

    pub fn is_editable(&self) -> bool {
        match self {
            Self::Installed(installed) => installed.dist.editable,
            Self::Link(link) => link.link.is_editable(),
            Self::Extras(extras) => extras.base.is_editable(),
            Self::Python(_) => false,
        }
    }

    /// The base candidate, for a candidate with extras.
    pub fn base(&self) -> Option<&Candidate> {
        match self {
            Self::Extras(extras) => Some(&extras.base),
            _ => None,
        }
    }

    /// Describe the candidate in a conflict report.
    pub fn format_for_error(&self) -> String {
        match self {
            Self::Installed(installed) => {
                format!("{} {} (Installed)", installed.dist.name, installed.dist.version)
            }
            Self::Link(link) => {
                let source = if link.link.is_file() {
                    link.link
                        .url()
                        .to_file_path()
                        .map(|path| path.display().to_string())
                        .unwrap_or_else(|()| link.link.url_without_fragment().to_string())
                } else {
                    link.link.url_without_fragment().to_string()
                };
                format!("{} {} (from {source})", link.name, link.version)
            }
            Self::Extras(extras) => format!(
                "{} [{}]",
                extras.base.format_for_error(),
                extras.extras.iter().join(", ")
            ),
            Self::Python(python) => format!("Python {}", python.version),
        }
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Installed(a), Self::Installed(b)) => Rc::ptr_eq(a, b),
            (Self::Link(a), Self::Link(b)) => Rc::ptr_eq(a, b),
            (Self::Extras(a), Self::Extras(b)) => Rc::ptr_eq(a, b),
            (Self::Python(a), Self::Python(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Candidate {}

impl Display for Candidate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Python(python) => write!(f, "Python {}", python.version),
            _ => write!(f, "{}=={}", self.identifier(), self.version()),
        }
    }
}

impl Debug for Candidate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Installed(_) => write!(f, "{self} (installed)"),
            Self::Link(link) => write!(f, "{self} ({})", link.link),
            Self::Extras(_) | Self::Python(_) => write!(f, "{self}"),
        }
    }
}

/// Where a [`LinkCandidate`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Found by querying the index.
    Index,
    /// Given explicitly as a direct URL (e.g., `foo @ https://...`).
    Direct,
}

pub struct InstalledCandidate {
    pub(crate) dist: InstalledDist,
    pub(crate) dependencies: OnceCell<Rc<[Requirement]>>,
}

impl InstalledCandidate {
    pub(crate) fn new(dist: InstalledDist) -> Self {
        Self {
            dist,
            dependencies: OnceCell::new(),
        }
    }

    pub fn dist(&self) -> &InstalledDist {
        &self.dist
    }
}

pub struct LinkCandidate {
    pub(crate) name: PackageName,
    pub(crate) version: Version,
    pub(crate) link: Link,
    pub(crate) origin: Origin,
    metadata: OnceCell<Metadata>,
    pub(crate) dependencies: OnceCell<Rc<[Requirement]>>,
}

impl LinkCandidate {
    /// A candidate found on the index; its metadata is fetched on first use.
    pub(crate) fn from_index(name: PackageName, version: Version, link: Link) -> Self {
        Self {
            name,
            version,
            link,
            origin: Origin::Index,
            metadata: OnceCell::new(),
            dependencies: OnceCell::new(),
        }
    }

    /// A candidate for a direct URL, whose version is only known from its metadata.
    pub(crate) fn from_direct(link: Link, metadata: Metadata) -> Self {
        Self {
            name: metadata.name.clone(),
            version: metadata.version.clone(),
            link,
            origin: Origin::Direct,
            metadata: OnceCell::from(metadata),
            dependencies: OnceCell::new(),
        }
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Return the metadata of the distribution, preparing it on first use.
    pub(crate) fn metadata(&self, preparer: &dyn Preparer) -> Result<&Metadata, ResolveError> {
        if let Some(metadata) = self.metadata.get() {
            return Ok(metadata);
        }
        let metadata = prepare_metadata(preparer, &self.link)?;
        check_metadata_consistency(&self.link, &self.name, Some(&self.version), &metadata)?;
        Ok(self.metadata.get_or_init(|| metadata))
    }
}

pub struct ExtrasCandidate {
    pub(crate) name: PackageName,
    pub(crate) base: Candidate,
    /// Sorted and deduplicated.
    pub(crate) extras: Vec<ExtraName>,
    pub(crate) dependencies: OnceCell<Rc<[Requirement]>>,
}

impl ExtrasCandidate {
    pub(crate) fn new(name: PackageName, base: Candidate, extras: Vec<ExtraName>) -> Self {
        Self {
            name,
            base,
            extras,
            dependencies: OnceCell::new(),
        }
    }
}

pub struct PythonCandidate {
    pub(crate) version: Version,
}

impl PythonCandidate {
    pub(crate) fn new(version: Version) -> Self {
        Self { version }
    }
}

pub(crate) fn prepare_metadata(preparer: &dyn Preparer, link: &Link) -> Result<Metadata, ResolveError> {
    tracing::debug!("Preparing metadata for: {link}");
    preparer
        .prepare_metadata(link)
        .map_err(|err| ResolveError::Metadata(Box::new(link.clone()), err))
}

/// Ensure the prepared metadata describes the distribution we expected.
pub(crate) fn check_metadata_consistency(
    link: &Link,
    name: &PackageName,
    version: Option<&Version>,
    metadata: &Metadata,
) -> Result<(), ResolveError> {
    if metadata.name != *name {
        return Err(ResolveError::InconsistentMetadata {
            link: Box::new(link.clone()),
            field: "name",
            expected: name.to_string(),
            actual: metadata.name.to_string(),
        });
    }
    if let Some(version) = version {
        if metadata.version != *version {
            return Err(ResolveError::InconsistentMetadata {
                link: Box::new(link.clone()),
                field: "version",
                expected: version.to_string(),
                actual: metadata.version.to_string(),
            });
        }
    }
    Ok(())
}
