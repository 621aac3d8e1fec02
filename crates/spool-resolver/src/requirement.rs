use std::fmt::{Display, Formatter};
use std::rc::Rc;

use pep440_rs::{Operator, VersionSpecifiers};
use pep508_rs::{ExtraName, PackageName};

use spool_types::HashDigest;

use crate::candidate::Candidate;
use crate::identifier::Identifier;

/// A constraint the resolver must satisfy for one identifier.
#[derive(Debug, Clone)]
pub enum Requirement {
    /// Requires exactly the given candidate, as for a direct URL (`foo @ https://...`).
    Explicit(Candidate),
    /// Requires exactly the base candidate of a candidate with extras, keeping `foo` and
    /// `foo[bar]` at the same version.
    ExtrasBase(Candidate),
    /// A named requirement with version specifiers, and optionally extras and hashes.
    Specifier(Rc<SpecifierRequirement>),
    /// The target interpreter must satisfy the package's `Requires-Python`.
    RequiresPython(Rc<VersionSpecifiers>),
}

#[derive(Debug, Clone)]
pub struct SpecifierRequirement {
    pub name: PackageName,
    /// Sorted and deduplicated.
    pub extras: Vec<ExtraName>,
    pub specifiers: VersionSpecifiers,
    /// If non-empty, a candidate's link must carry one of these hashes.
    pub hashes: Vec<HashDigest>,
}

impl Requirement {
    pub fn identifier(&self) -> Identifier {
        match self {
            Self::Explicit(candidate) | Self::ExtrasBase(candidate) => candidate.identifier(),
            Self::Specifier(requirement) => {
                Identifier::package(requirement.name.clone(), requirement.extras.iter().cloned())
            }
            Self::RequiresPython(_) => Identifier::Python,
        }
    }

    /// The name of the package the requirement applies to, or `None` for `Requires-Python`.
    pub fn name(&self) -> Option<&PackageName> {
        match self {
            Self::Explicit(candidate) | Self::ExtrasBase(candidate) => candidate.name(),
            Self::Specifier(requirement) => Some(&requirement.name),
            Self::RequiresPython(_) => None,
        }
    }

    /// The candidate the requirement asks for, if it asks for exactly one.
    pub fn explicit_candidate(&self) -> Option<&Candidate> {
        match self {
            Self::Explicit(candidate) | Self::ExtrasBase(candidate) => Some(candidate),
            Self::Specifier(_) | Self::RequiresPython(_) => None,
        }
    }

    pub fn is_satisfied_by(&self, candidate: &Candidate) -> bool {
        match self {
            Self::Explicit(expected) | Self::ExtrasBase(expected) => expected == candidate,
            Self::Specifier(requirement) => {
                candidate.name() == Some(&requirement.name)
                    && requirement.specifiers.contains(candidate.version())
                    && candidate
                        .link()
                        .is_none_or(|link| link.matches_hashes(&requirement.hashes))
            }
            Self::RequiresPython(specifiers) => {
                matches!(candidate, Candidate::Python(_))
                    && specifiers.contains(candidate.version())
            }
        }
    }

    /// Returns `true` if the requirement can be satisfied by at most one candidate.
    pub(crate) fn is_pinned(&self) -> bool {
        match self {
            Self::Explicit(_) | Self::ExtrasBase(_) | Self::RequiresPython(_) => true,
            Self::Specifier(requirement) => is_exact_pin(&requirement.specifiers),
        }
    }

    /// Describe the requirement in a conflict report.
    pub fn format_for_error(&self) -> String {
        match self {
            Self::Explicit(candidate) | Self::ExtrasBase(candidate) => candidate.format_for_error(),
            Self::Specifier(requirement) => requirement.to_string(),
            Self::RequiresPython(specifiers) => format!("Python {specifiers}"),
        }
    }
}

/// Returns `true` if the specifiers include an `===` or a non-wildcard `==`.
pub(crate) fn is_exact_pin(specifiers: &VersionSpecifiers) -> bool {
    specifiers.iter().any(|specifier| {
        matches!(
            specifier.operator(),
            Operator::Equal | Operator::ExactEqual
        )
    })
}

impl Display for Requirement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit(candidate) | Self::ExtrasBase(candidate) => {
                match candidate.link() {
                    Some(link) => write!(f, "{} @ {link}", candidate.identifier()),
                    None => write!(f, "{}=={}", candidate.identifier(), candidate.version()),
                }
            }
            Self::Specifier(requirement) => write!(f, "{requirement}"),
            Self::RequiresPython(specifiers) => write!(f, "Requires-Python {specifiers}"),
        }
    }
}

impl Display for SpecifierRequirement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}",
            Identifier::package(self.name.clone(), self.extras.iter().cloned()),
            self.specifiers
        )
    }
}
