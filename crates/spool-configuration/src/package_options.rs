use pep508_rs::PackageName;

/// Whether to reinstall packages.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub enum Reinstall {
    /// Don't reinstall any packages; respect the existing installation.
    #[default]
    None,

    /// Reinstall all packages in the plan.
    All,

    /// Reinstall only the specified packages.
    Packages(Vec<PackageName>),
}

impl Reinstall {
    /// Determine the reinstall strategy to use.
    pub fn from_args(reinstall: Option<bool>, reinstall_package: Vec<PackageName>) -> Option<Self> {
        match reinstall {
            Some(true) => Some(Self::All),
            Some(false) => Some(Self::None),
            None if reinstall_package.is_empty() => None,
            None => Some(Self::Packages(reinstall_package)),
        }
    }

    /// Returns `true` if no packages should be reinstalled.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns `true` if all packages should be reinstalled.
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Returns `true` if the specified package should be reinstalled.
    pub fn contains_package(&self, package_name: &PackageName) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Packages(packages) => packages.contains(package_name),
        }
    }

    /// Combine a set of [`Reinstall`] values.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        match self {
            // `--reinstall` and `--no-reinstall` clear any per-package selection.
            Self::All | Self::None => self,
            Self::Packages(mut packages) => match other {
                Self::All => other,
                Self::None => Self::Packages(packages),
                Self::Packages(other_packages) => {
                    packages.extend(other_packages);
                    Self::Packages(packages)
                }
            },
        }
    }
}

/// Strategy for deciding when an already-installed distribution is replaced by a newer one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum UpgradeStrategy {
    /// Keep installed distributions whenever they satisfy the requirements, and only touch
    /// what is requested.
    #[default]
    ToSatisfyOnly,

    /// Keep installed distributions whenever they satisfy the requirements.
    OnlyIfNeeded,

    /// Always prefer the newest versions available from the index.
    Eager,
}

impl UpgradeStrategy {
    /// Whether an installed distribution should be tried before index candidates.
    pub fn prefers_installed(self) -> bool {
        !matches!(self, Self::Eager)
    }
}

/// Whether transitive dependencies are followed during resolution.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum DependencyMode {
    /// Include all dependencies, whether direct or transitive.
    #[default]
    Transitive,

    /// Exclude transitive dependencies, only resolving the root requirements.
    Direct,
}

impl DependencyMode {
    /// Returns `true` if transitive dependencies should be included.
    pub fn is_transitive(self) -> bool {
        matches!(self, Self::Transitive)
    }
}
