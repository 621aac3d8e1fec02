pub use candidate::{
    Candidate, ExtrasCandidate, InstalledCandidate, LinkCandidate, Origin, PythonCandidate,
};
pub use error::{
    ConflictCause, ConflictParent, NoMatchingDistributionError, NoSolutionError,
    RequiresPythonError, ResolveError, TooDeepError,
};
pub use identifier::Identifier;
pub use manifest::{Manifest, RootRequirement};
pub use requirement::{Requirement, SpecifierRequirement};
pub use resolution::{Diagnostic, InstallRequest, PinSource, RequirementSet, ResolvedPackage};
pub use resolver::Resolver;

mod candidate;
pub mod engine;
mod error;
mod factory;
mod identifier;
mod index;
mod manifest;
mod provider;
mod requirement;
mod resolution;
mod resolver;
