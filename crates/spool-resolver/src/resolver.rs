use std::time::Instant;

use rustc_hash::FxHashMap;
use tracing::{debug, instrument, warn};

use spool_configuration::ResolverSettings;
use spool_types::{InstalledPackages, Interpreter, PackageIndex, Preparer};

use crate::candidate::Candidate;
use crate::engine::{self, EngineError, RequirementInformation};
use crate::error::{
    ConflictCause, ConflictParent, NoMatchingDistributionError, NoSolutionError, ResolveError,
    RequiresPythonError, TooDeepError,
};
use crate::factory::Factory;
use crate::index::CachedIndex;
use crate::manifest::Manifest;
use crate::provider::SpoolProvider;
use crate::requirement::Requirement;
use crate::resolution::{InstallRequest, RequirementSet};

/// Resolves a [`Manifest`] against a package index and an installed environment.
pub struct Resolver<'a> {
    settings: &'a ResolverSettings,
    interpreter: &'a Interpreter,
    index: &'a dyn PackageIndex,
    preparer: &'a dyn Preparer,
    installed: &'a dyn InstalledPackages,
}

impl<'a> Resolver<'a> {
    pub fn new(
        settings: &'a ResolverSettings,
        interpreter: &'a Interpreter,
        index: &'a dyn PackageIndex,
        preparer: &'a dyn Preparer,
        installed: &'a dyn InstalledPackages,
    ) -> Self {
        Self {
            settings,
            interpreter,
            index,
            preparer,
            installed,
        }
    }

    /// Resolve the manifest into the set of distributions to install.
    ///
    /// With `check_supported_wheels`, a direct URL to a wheel that cannot be installed on the
    /// target platform is an error.
    #[instrument(skip_all, fields(requirements = manifest.requirements.len()))]
    pub fn resolve(
        &self,
        manifest: &Manifest,
        check_supported_wheels: bool,
    ) -> Result<RequirementSet, ResolveError> {
        let start = Instant::now();
        let markers = self.interpreter.markers();

        let factory = Factory::new(
            CachedIndex::new(self.index),
            self.preparer,
            self.installed,
            self.interpreter,
            self.settings,
        );
        let constraints = manifest.constraints_by_name(markers)?;

        let mut user_requested = FxHashMap::default();
        let mut requirements = Vec::new();
        for (position, root) in manifest.applicable_requirements(markers).enumerate() {
            user_requested
                .entry(root.requirement.name.clone())
                .or_insert(position);
            requirements.extend(factory.make_requirements(
                &root.requirement,
                &root.hashes,
                root.editable,
            )?);
        }

        let provider = SpoolProvider::new(
            factory,
            constraints,
            user_requested,
            self.settings.upgrade_strategy.prefers_installed(),
            self.settings.dependency_mode.is_transitive(),
        );

        let resolution = match engine::resolve(&provider, requirements, self.settings.max_rounds) {
            Ok(resolution) => resolution,
            Err(EngineError::Provider(err)) => return Err(err),
            Err(EngineError::TooDeep(rounds, causes)) => {
                return Err(too_deep_error(&provider, rounds, &causes));
            }
            Err(EngineError::Impossible(causes)) => {
                return Err(conflict_error(&provider, &causes));
            }
        };
        debug!(
            "Resolved {} identifiers in {:.3}s",
            resolution.mapping.len(),
            start.elapsed().as_secs_f32()
        );

        RequirementSet::from_resolution(
            resolution,
            provider.factory(),
            self.settings,
            check_supported_wheels,
        )
    }

    /// Order the distributions to install such that dependencies come before their dependents.
    pub fn installation_order<'set>(
        &self,
        requirement_set: &'set RequirementSet,
    ) -> Vec<&'set InstallRequest> {
        requirement_set.installation_order()
    }
}

/// Convert the causes of an impossible resolution into the most specific error.
fn conflict_error(
    provider: &SpoolProvider<'_>,
    causes: &[RequirementInformation<Requirement, Candidate>],
) -> ResolveError {
    // An interpreter mismatch can't be fixed by picking other versions; report it first.
    if let Some(err) = requires_python_error(provider, causes) {
        return err;
    }

    // A single requirement that nothing on the index satisfies.
    if let [cause] = causes {
        if let Some(name) = cause
            .requirement
            .name()
            .filter(|name| !provider.constraints().contains_key(*name))
        {
            let mut versions = Vec::new();
            let mut yanked = Vec::new();
            let candidates = match provider.factory().index().find_all_candidates(name) {
                Ok(candidates) => candidates.to_vec(),
                Err(err) => {
                    warn!("Failed to list the available versions of {name}: {err}");
                    Vec::new()
                }
            };
            for candidate in candidates {
                if candidate.link.is_yanked() {
                    yanked.push(candidate.version);
                } else {
                    versions.push(candidate.version);
                }
            }
            versions.sort();
            versions.dedup();
            yanked.sort();
            yanked.dedup();

            return ResolveError::NoMatchingDistribution(Box::new(NoMatchingDistributionError {
                requirement: cause.requirement.to_string(),
                package: Some(name.clone()),
                parent: cause
                    .parent
                    .as_ref()
                    .map(|parent| parent.identifier().to_string()),
                versions,
                yanked,
            }));
        }
    }

    let mut constrained = causes
        .iter()
        .filter_map(|cause| cause.requirement.name())
        .filter_map(|name| {
            provider
                .constraints()
                .get(name)
                .map(|constraint| (name.clone(), constraint.specifiers.clone()))
        })
        .collect::<Vec<_>>();
    constrained.sort_by(|(a, _), (b, _)| a.cmp(b));
    constrained.dedup_by(|(a, _), (b, _)| a == b);

    ResolveError::NoSolution(Box::new(NoSolutionError {
        causes: conflict_causes(causes),
        constraints: constrained,
    }))
}

/// Report a resolution that ran out of rounds, unless an interpreter mismatch explains it.
fn too_deep_error(
    provider: &SpoolProvider<'_>,
    rounds: usize,
    causes: &[RequirementInformation<Requirement, Candidate>],
) -> ResolveError {
    if let Some(err) = requires_python_error(provider, causes) {
        return err;
    }
    ResolveError::TooDeep(Box::new(TooDeepError {
        rounds,
        causes: conflict_causes(causes),
    }))
}

/// The `Requires-Python` error for the causes the target interpreter does not satisfy, if any.
fn requires_python_error(
    provider: &SpoolProvider<'_>,
    causes: &[RequirementInformation<Requirement, Candidate>],
) -> Option<ResolveError> {
    let python = provider.factory().python_candidate();
    let requires_python = causes
        .iter()
        .filter(|cause| !cause.requirement.is_satisfied_by(python))
        .filter_map(|cause| match (&cause.requirement, &cause.parent) {
            (Requirement::RequiresPython(specifiers), Some(parent)) => {
                Some(((**specifiers).clone(), parent.identifier().to_string()))
            }
            _ => None,
        })
        .collect::<Vec<_>>();
    if requires_python.is_empty() {
        return None;
    }
    Some(ResolveError::RequiresPython(Box::new(RequiresPythonError {
        version: python.version().clone(),
        causes: requires_python,
    })))
}

fn conflict_causes(
    causes: &[RequirementInformation<Requirement, Candidate>],
) -> Vec<ConflictCause> {
    causes
        .iter()
        .map(|cause| ConflictCause {
            requirement: cause.requirement.format_for_error(),
            package: cause.requirement.name().cloned(),
            parent: cause.parent.as_ref().map(|parent| ConflictParent {
                name: parent.identifier().to_string(),
                version: parent.version().clone(),
            }),
        })
        .collect()
}
