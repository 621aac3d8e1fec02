use std::ops::Deref;
use std::path::{Path, PathBuf};

use pep508_rs::PackageName;
use serde::{Deserialize, Serialize};

use crate::{DependencyMode, Reinstall, UpgradeStrategy};

/// The name of the settings file searched for by [`FilesystemOptions::find`].
pub const SETTINGS_FILE: &str = "spool.toml";

/// The ceiling on resolver rounds unless configured otherwise.
pub const DEFAULT_MAX_ROUNDS: usize = 2_000_000;

/// The options that can be set in a `spool.toml` file.
///
/// Every field is optional; unset fields fall back to the [`ResolverSettings`] defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Options {
    /// The strategy used when deciding whether installed distributions are upgraded.
    pub upgrade_strategy: Option<UpgradeStrategy>,
    /// Reinstall all packages, regardless of whether they're already installed.
    pub reinstall: Option<bool>,
    /// Reinstall a specific package, regardless of whether it's already installed.
    pub reinstall_package: Option<Vec<PackageName>>,
    /// Ignore the installed environment entirely.
    pub ignore_installed: Option<bool>,
    /// Ignore the `Requires-Python` metadata of candidate distributions.
    pub ignore_requires_python: Option<bool>,
    /// Only resolve the root requirements, without their dependencies.
    pub no_deps: Option<bool>,
    /// The maximum number of rounds the resolver may run before giving up.
    pub max_rounds: Option<usize>,
}

impl Options {
    /// Combine two [`Options`], preferring the values set in `self`.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        Self {
            upgrade_strategy: self.upgrade_strategy.or(other.upgrade_strategy),
            reinstall: self.reinstall.or(other.reinstall),
            reinstall_package: self.reinstall_package.or(other.reinstall_package),
            ignore_installed: self.ignore_installed.or(other.ignore_installed),
            ignore_requires_python: self.ignore_requires_python.or(other.ignore_requires_python),
            no_deps: self.no_deps.or(other.no_deps),
            max_rounds: self.max_rounds.or(other.max_rounds),
        }
    }
}

/// The resolved settings consumed by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    pub upgrade_strategy: UpgradeStrategy,
    pub reinstall: Reinstall,
    pub dependency_mode: DependencyMode,
    pub ignore_installed: bool,
    pub ignore_requires_python: bool,
    pub max_rounds: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            upgrade_strategy: UpgradeStrategy::default(),
            reinstall: Reinstall::default(),
            dependency_mode: DependencyMode::default(),
            ignore_installed: false,
            ignore_requires_python: false,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl ResolverSettings {
    /// Resolve the [`ResolverSettings`] from a set of (possibly partial) [`Options`].
    pub fn from_options(options: Options) -> Self {
        let Options {
            upgrade_strategy,
            reinstall,
            reinstall_package,
            ignore_installed,
            ignore_requires_python,
            no_deps,
            max_rounds,
        } = options;

        Self {
            upgrade_strategy: upgrade_strategy.unwrap_or_default(),
            reinstall: Reinstall::from_args(reinstall, reinstall_package.unwrap_or_default())
                .unwrap_or_default(),
            dependency_mode: if no_deps.unwrap_or(false) {
                DependencyMode::Direct
            } else {
                DependencyMode::Transitive
            },
            ignore_installed: ignore_installed.unwrap_or(false),
            ignore_requires_python: ignore_requires_python.unwrap_or(false),
            max_rounds: max_rounds.unwrap_or(DEFAULT_MAX_ROUNDS),
        }
    }

    /// Returns `true` if the installed distribution of the given package must be replaced.
    pub fn force_reinstall(&self, package_name: &PackageName) -> bool {
        self.reinstall.contains_package(package_name)
    }
}

/// The [`Options`] as loaded from a configuration file on disk.
#[derive(Debug, Clone)]
pub struct FilesystemOptions(Options);

impl FilesystemOptions {
    /// Convert the [`FilesystemOptions`] into [`Options`].
    pub fn into_options(self) -> Options {
        self.0
    }

    /// Find the [`FilesystemOptions`] for the given path.
    ///
    /// The search starts at the given path and goes up the directory tree until a `spool.toml`
    /// file is found.
    pub fn find(path: &Path) -> Result<Option<Self>, Error> {
        for ancestor in path.ancestors() {
            if let Some(options) = Self::from_directory(ancestor)? {
                return Ok(Some(options));
            }
        }
        Ok(None)
    }

    /// Load a [`FilesystemOptions`] from a `spool.toml` file in the given directory, if any.
    pub fn from_directory(dir: &Path) -> Result<Option<Self>, Error> {
        let path = dir.join(SETTINGS_FILE);
        match fs_err::read_to_string(&path) {
            Ok(content) => {
                let options = toml::from_str::<Options>(&content)
                    .map_err(|err| Error::SpoolToml(path.clone(), Box::new(err)))?;
                tracing::debug!("Found configuration at `{}`", path.display());
                validate(&path, &options)?;
                Ok(Some(Self(options)))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Load a [`FilesystemOptions`] from a `spool.toml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        tracing::debug!("Reading configuration from: `{}`", path.display());

        let content = fs_err::read_to_string(path)?;
        let options = toml::from_str::<Options>(&content)
            .map_err(|err| Error::SpoolToml(path.to_path_buf(), Box::new(err)))?;
        validate(path, &options)?;
        Ok(Self(options))
    }
}

impl Deref for FilesystemOptions {
    type Target = Options;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Options> for FilesystemOptions {
    fn from(options: Options) -> Self {
        Self(options)
    }
}

fn validate(path: &Path, options: &Options) -> Result<(), Error> {
    if options.max_rounds == Some(0) {
        return Err(Error::ZeroRounds(path.to_path_buf()));
    }
    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to parse: `{}`", _0.display())]
    SpoolToml(PathBuf, #[source] Box<toml::de::Error>),

    #[error("Failed to parse: `{}`. The `max-rounds` field must be greater than zero.", _0.display())]
    ZeroRounds(PathBuf),
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn defaults() {
        let settings = ResolverSettings::from_options(Options::default());
        assert_eq!(settings, ResolverSettings::default());
        assert_eq!(settings.max_rounds, 2_000_000);
        assert_eq!(settings.upgrade_strategy, UpgradeStrategy::ToSatisfyOnly);
        assert!(settings.dependency_mode.is_transitive());
    }

    #[test]
    fn parse_options() {
        let options: Options = toml::from_str(
            r#"
            upgrade-strategy = "eager"
            reinstall-package = ["Foo_Bar"]
            ignore-requires-python = true
            no-deps = true
            max-rounds = 100
            "#,
        )
        .unwrap();

        let settings = ResolverSettings::from_options(options);
        assert_eq!(settings.upgrade_strategy, UpgradeStrategy::Eager);
        assert!(settings.force_reinstall(&PackageName::from_str("foo-bar").unwrap()));
        assert!(!settings.force_reinstall(&PackageName::from_str("baz").unwrap()));
        assert!(settings.ignore_requires_python);
        assert!(!settings.ignore_installed);
        assert_eq!(settings.dependency_mode, DependencyMode::Direct);
        assert_eq!(settings.max_rounds, 100);
    }

    #[test]
    fn reject_unknown_fields() {
        let result = toml::from_str::<Options>("upgrade = true");
        assert!(result.is_err());
    }

    #[test]
    fn combine_prefers_self() {
        let cli = Options {
            upgrade_strategy: Some(UpgradeStrategy::Eager),
            ..Options::default()
        };
        let file = Options {
            upgrade_strategy: Some(UpgradeStrategy::OnlyIfNeeded),
            reinstall: Some(true),
            ..Options::default()
        };
        let combined = cli.combine(file);
        assert_eq!(combined.upgrade_strategy, Some(UpgradeStrategy::Eager));
        assert_eq!(combined.reinstall, Some(true));
    }

    #[test]
    fn find_in_ancestors() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        fs_err::create_dir_all(&nested).unwrap();
        fs_err::write(
            root.path().join(SETTINGS_FILE),
            "upgrade-strategy = \"only-if-needed\"\n",
        )
        .unwrap();

        let options = FilesystemOptions::find(&nested).unwrap().unwrap();
        assert_eq!(options.upgrade_strategy, Some(UpgradeStrategy::OnlyIfNeeded));
    }

    #[test]
    fn missing_file() {
        let root = tempfile::tempdir().unwrap();
        assert!(FilesystemOptions::from_directory(root.path()).unwrap().is_none());
        assert!(FilesystemOptions::from_file(root.path().join(SETTINGS_FILE)).is_err());
    }

    #[test]
    fn zero_rounds() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join(SETTINGS_FILE);
        fs_err::write(&path, "max-rounds = 0\n").unwrap();

        let err = FilesystemOptions::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::ZeroRounds(_)));
    }
}
