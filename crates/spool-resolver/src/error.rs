use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use itertools::Itertools;
use pep440_rs::{Version, VersionSpecifiers};
use pep508_rs::{PackageName, Pep508Error};

use spool_types::Link;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Failed to parse requirement: `{0}`")]
    InvalidRequirement(String, #[source] Box<Pep508Error>),

    #[error("Constraints must be version specifiers, but `{0}` is a direct URL")]
    UnsupportedConstraint(String),

    #[error(transparent)]
    RequiresPython(Box<RequiresPythonError>),

    #[error(transparent)]
    NoSolution(Box<NoSolutionError>),

    #[error(transparent)]
    NoMatchingDistribution(Box<NoMatchingDistributionError>),

    #[error("Failed to prepare metadata for: {0}")]
    Metadata(Box<Link>, #[source] anyhow::Error),

    #[error("Failed to query the index for: {0}")]
    Index(PackageName, #[source] anyhow::Error),

    #[error(
        "Distribution {link} has inconsistent {field}: expected `{expected}`, but metadata has `{actual}`"
    )]
    InconsistentMetadata {
        link: Box<Link>,
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("{0} is not a supported wheel on this platform")]
    UnsupportedWheel(String),

    #[error(transparent)]
    TooDeep(Box<TooDeepError>),
}

/// A requirement that took part in a conflict, and the package that introduced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictCause {
    /// The requirement, as shown to the user.
    pub requirement: String,
    /// The package the requirement applies to; `None` for `Requires-Python`.
    pub package: Option<PackageName>,
    /// The candidate that declared the requirement; `None` if the user requested it directly.
    pub parent: Option<ConflictParent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictParent {
    /// The identifier of the parent, e.g., `foo` or `foo[bar]`.
    pub name: String,
    pub version: Version,
}

impl Display for ConflictParent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}=={}", self.name, self.version)
    }
}

/// The requirements cannot all be satisfied at once.
#[derive(Debug)]
pub struct NoSolutionError {
    pub(crate) causes: Vec<ConflictCause>,
    /// The user's constraints on the packages involved in the conflict.
    pub(crate) constraints: Vec<(PackageName, VersionSpecifiers)>,
}

impl NoSolutionError {
    pub fn causes(&self) -> &[ConflictCause] {
        &self.causes
    }

    /// The packages whose requirements conflict.
    pub fn packages(&self) -> BTreeSet<&PackageName> {
        self.causes
            .iter()
            .filter_map(|cause| cause.package.as_ref())
            .collect()
    }
}

impl std::error::Error for NoSolutionError {}

impl Display for NoSolutionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let triggers = self
            .causes
            .iter()
            .map(|cause| match &cause.parent {
                None => cause.requirement.clone(),
                Some(parent) => parent.to_string(),
            })
            .collect::<BTreeSet<_>>();
        let triggers = triggers.into_iter().collect::<Vec<_>>();
        let info = match triggers.as_slice() {
            [] => "the requested packages".to_string(),
            [trigger] => trigger.clone(),
            [init @ .., last] => format!("{} and {last}", init.join(", ")),
        };
        writeln!(
            f,
            "Cannot install {info} because these package versions have conflicting dependencies."
        )?;
        writeln!(f)?;
        writeln!(f, "The conflict is caused by:")?;

        let mut lines = cause_lines(&self.causes);
        for (name, specifiers) in &self.constraints {
            lines.push(format!("The user requested (constraint) {name}{specifiers}"));
        }
        write!(f, "{}", textwrap::indent(&lines.join("\n"), "    "))?;

        writeln!(f)?;
        writeln!(f)?;
        writeln!(f, "To fix this you could try to:")?;
        writeln!(f, "1. loosen the range of package versions you've specified")?;
        write!(
            f,
            "2. remove package versions to allow spool to attempt to solve the dependency conflict"
        )
    }
}

/// Describe each cause on its own line, as `parent version depends on requirement`.
fn cause_lines(causes: &[ConflictCause]) -> Vec<String> {
    causes
        .iter()
        .map(|cause| match &cause.parent {
            Some(parent) => format!(
                "{} {} depends on {}",
                parent.name, parent.version, cause.requirement
            ),
            None => format!("The user requested {}", cause.requirement),
        })
        .collect()
}

/// The resolver ran out of rounds before every requirement was satisfied.
#[derive(Debug)]
pub struct TooDeepError {
    pub(crate) rounds: usize,
    /// The most recent conflict, or the requirements that were still unsatisfied.
    pub(crate) causes: Vec<ConflictCause>,
}

impl TooDeepError {
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn causes(&self) -> &[ConflictCause] {
        &self.causes
    }
}

impl std::error::Error for TooDeepError {}

impl Display for TooDeepError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Resolution did not complete within {} rounds",
            self.rounds
        )?;
        if self.causes.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        writeln!(f)?;
        writeln!(f, "The resolver was still working on:")?;
        write!(
            f,
            "{}",
            textwrap::indent(&cause_lines(&self.causes).join("\n"), "    ")
        )
    }
}

/// A single requirement that no available version satisfies.
#[derive(Debug)]
pub struct NoMatchingDistributionError {
    /// The requirement, with the package that introduced it if any.
    pub(crate) requirement: String,
    pub(crate) package: Option<PackageName>,
    pub(crate) parent: Option<String>,
    /// The versions the index offers, oldest first.
    pub(crate) versions: Vec<Version>,
    pub(crate) yanked: Vec<Version>,
}

impl NoMatchingDistributionError {
    pub fn package(&self) -> Option<&PackageName> {
        self.package.as_ref()
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }
}

impl std::error::Error for NoMatchingDistributionError {}

impl Display for NoMatchingDistributionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let requirement = match &self.parent {
            Some(parent) => format!("{} (from {parent})", self.requirement),
            None => self.requirement.clone(),
        };
        let versions = if self.versions.is_empty() {
            "none".to_string()
        } else {
            self.versions.iter().join(", ")
        };
        writeln!(
            f,
            "Could not find a version that satisfies the requirement {requirement} (from versions: {versions})"
        )?;
        if !self.yanked.is_empty() {
            writeln!(
                f,
                "Ignored the following yanked versions: {}",
                self.yanked.iter().join(", ")
            )?;
        }
        write!(f, "No matching distribution found for {}", self.requirement)
    }
}

/// The target interpreter does not satisfy the `Requires-Python` of one or more packages.
#[derive(Debug)]
pub struct RequiresPythonError {
    pub(crate) version: Version,
    /// The specifier, and the package that declared it.
    pub(crate) causes: Vec<(VersionSpecifiers, String)>,
}

impl std::error::Error for RequiresPythonError {}

impl Display for RequiresPythonError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let [(specifiers, package)] = self.causes.as_slice() {
            return write!(
                f,
                "Package '{package}' requires a different Python: {} not in '{specifiers}'",
                self.version
            );
        }
        write!(
            f,
            "Packages require a different Python. {} not in:",
            self.version
        )?;
        for (specifiers, package) in &self.causes {
            write!(f, "\n'{specifiers}' (required by {package})")?;
        }
        Ok(())
    }
}
