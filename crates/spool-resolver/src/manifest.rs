use std::str::FromStr;

use pep440_rs::VersionSpecifiers;
use pep508_rs::{MarkerEnvironment, PackageName, Requirement, VersionOrUrl};
use rustc_hash::FxHashMap;
use tracing::debug;

use spool_types::HashDigest;

use crate::error::ResolveError;
use crate::factory::Constraint;

/// A requirement requested directly by the user.
#[derive(Debug, Clone)]
pub struct RootRequirement {
    pub requirement: Requirement,
    /// If non-empty, the distribution must match one of these hashes.
    pub hashes: Vec<HashDigest>,
    pub editable: bool,
}

impl RootRequirement {
    pub fn new(requirement: Requirement) -> Self {
        Self {
            requirement,
            hashes: Vec::new(),
            editable: false,
        }
    }

    #[must_use]
    pub fn with_hashes(mut self, hashes: impl IntoIterator<Item = HashDigest>) -> Self {
        self.hashes.extend(hashes);
        self
    }

    #[must_use]
    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }
}

impl FromStr for RootRequirement {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_requirement(s).map(Self::new)
    }
}

/// A manifest of requirements and constraints.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    /// The requirements to install.
    pub(crate) requirements: Vec<RootRequirement>,

    /// Requirements that narrow the versions a package may resolve to, without requiring the
    /// package to be installed.
    pub(crate) constraints: Vec<Requirement>,
}

impl Manifest {
    pub fn new(requirements: Vec<RootRequirement>, constraints: Vec<Requirement>) -> Self {
        Self {
            requirements,
            constraints,
        }
    }

    pub fn simple(requirements: Vec<RootRequirement>) -> Self {
        Self {
            requirements,
            constraints: Vec::new(),
        }
    }

    /// Parse a manifest from PEP 508 requirement and constraint strings.
    pub fn from_strings<S: AsRef<str>>(
        requirements: &[S],
        constraints: &[S],
    ) -> Result<Self, ResolveError> {
        Ok(Self {
            requirements: requirements
                .iter()
                .map(|requirement| RootRequirement::from_str(requirement.as_ref()))
                .collect::<Result<_, _>>()?,
            constraints: constraints
                .iter()
                .map(|constraint| parse_requirement(constraint.as_ref()))
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn requirements(&self) -> &[RootRequirement] {
        &self.requirements
    }

    pub fn constraints(&self) -> &[Requirement] {
        &self.constraints
    }

    /// The root requirements whose markers apply to the environment.
    pub(crate) fn applicable_requirements<'a>(
        &'a self,
        markers: &'a MarkerEnvironment,
    ) -> impl Iterator<Item = &'a RootRequirement> + 'a {
        self.requirements.iter().filter(move |root| {
            let applies = root.requirement.evaluate_markers(markers, &[]);
            if !applies {
                debug!(
                    "Ignoring `{}`: markers do not match the environment",
                    root.requirement
                );
            }
            applies
        })
    }

    /// Merge the applicable constraints by package name.
    pub(crate) fn constraints_by_name(
        &self,
        markers: &MarkerEnvironment,
    ) -> Result<FxHashMap<PackageName, Constraint>, ResolveError> {
        let mut specifiers: FxHashMap<PackageName, Vec<_>> = FxHashMap::default();
        for constraint in &self.constraints {
            if !constraint.evaluate_markers(markers, &[]) {
                debug!("Ignoring constraint `{constraint}`: markers do not match the environment");
                continue;
            }
            let entry = specifiers.entry(constraint.name.clone()).or_default();
            match &constraint.version_or_url {
                Some(VersionOrUrl::VersionSpecifier(version_specifiers)) => {
                    entry.extend(version_specifiers.iter().cloned());
                }
                Some(VersionOrUrl::Url(_)) => {
                    return Err(ResolveError::UnsupportedConstraint(constraint.to_string()));
                }
                None => {}
            }
        }
        Ok(specifiers
            .into_iter()
            .map(|(name, specifiers)| {
                let specifiers = specifiers.into_iter().collect::<VersionSpecifiers>();
                (name, Constraint { specifiers })
            })
            .collect())
    }
}

fn parse_requirement(s: &str) -> Result<Requirement, ResolveError> {
    Requirement::from_str(s)
        .map_err(|err| ResolveError::InvalidRequirement(s.to_string(), Box::new(err)))
}
