use std::str::FromStr;

use pep440_rs::{Version, VersionParseError};
use pep508_rs::{MarkerEnvironment, MarkerEnvironmentBuilder};

/// The target Python interpreter: its marker environment and its full version.
#[derive(Debug, Clone)]
pub struct Interpreter {
    markers: MarkerEnvironment,
    python_full_version: Version,
}

impl Interpreter {
    pub fn new(markers: MarkerEnvironment, python_full_version: Version) -> Self {
        Self {
            markers,
            python_full_version,
        }
    }

    /// Create an interpreter for a CPython on Linux with the given version, for use in
    /// development and testing where no real interpreter is queried.
    pub fn artificial(python_full_version: &str) -> Result<Self, VersionParseError> {
        let version = Version::from_str(python_full_version)?;
        let python_version = match version.release() {
            [major, minor, ..] => format!("{major}.{minor}"),
            [major] => format!("{major}.0"),
            [] => python_full_version.to_string(),
        };
        let markers = MarkerEnvironment::try_from(MarkerEnvironmentBuilder {
            implementation_name: "cpython",
            implementation_version: python_full_version,
            os_name: "posix",
            platform_machine: "x86_64",
            platform_python_implementation: "CPython",
            platform_release: "",
            platform_system: "Linux",
            platform_version: "",
            python_full_version,
            python_version: &python_version,
            sys_platform: "linux",
        })?;
        Ok(Self::new(markers, version))
    }

    /// The marker environment used to evaluate dependency markers.
    pub fn markers(&self) -> &MarkerEnvironment {
        &self.markers
    }

    /// The version checked against `Requires-Python`.
    pub fn python_full_version(&self) -> &Version {
        &self.python_full_version
    }
}
