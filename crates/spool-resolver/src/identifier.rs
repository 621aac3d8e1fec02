use std::fmt::{Display, Formatter};

use pep508_rs::{ExtraName, PackageName};

/// The key under which requirements and candidates are grouped during resolution.
///
/// A package requested with extras (`foo[bar]`) is resolved under its own identifier, distinct
/// from the bare package; the two are kept at the same version by an explicit requirement on the
/// base candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identifier {
    /// The target interpreter, constrained by `Requires-Python`.
    Python,
    Package {
        name: PackageName,
        /// Sorted and deduplicated.
        extras: Vec<ExtraName>,
    },
}

impl Identifier {
    /// Create an identifier for the package with the given extras.
    pub fn package(name: PackageName, extras: impl IntoIterator<Item = ExtraName>) -> Self {
        let mut extras = extras.into_iter().collect::<Vec<_>>();
        extras.sort_unstable();
        extras.dedup();
        Self::Package { name, extras }
    }

    /// The identifier of the package without any extras.
    pub fn base(name: PackageName) -> Self {
        Self::Package {
            name,
            extras: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&PackageName> {
        match self {
            Self::Python => None,
            Self::Package { name, .. } => Some(name),
        }
    }

    pub fn extras(&self) -> &[ExtraName] {
        match self {
            Self::Python => &[],
            Self::Package { extras, .. } => extras,
        }
    }

    /// The identifier with its extras stripped, if it has any.
    pub fn without_extras(&self) -> Option<Self> {
        match self {
            Self::Package { name, extras } if !extras.is_empty() => Some(Self::base(name.clone())),
            _ => None,
        }
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Python => write!(f, "<Python from Requires-Python>"),
            Self::Package { name, extras } if extras.is_empty() => write!(f, "{name}"),
            Self::Package { name, extras } => {
                write!(f, "{name}[")?;
                for (index, extra) in extras.iter().enumerate() {
                    if index > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{extra}")?;
                }
                write!(f, "]")
            }
        }
    }
}
