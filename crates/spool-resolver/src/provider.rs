use pep508_rs::PackageName;
use rustc_hash::FxHashMap;

use crate::candidate::Candidate;
use crate::engine::{Criterion, FoundCandidates, Information, MatchContext, Provider};
use crate::error::ResolveError;
use crate::factory::{Constraint, Factory};
use crate::identifier::Identifier;
use crate::requirement::Requirement;

/// The order in which unpinned identifiers are resolved; smaller is earlier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Preference {
    /// `false` if the identifier took part in the most recent conflict.
    not_backtrack_cause: bool,
    /// An estimate of the number of candidates left.
    candidates: usize,
    /// The position of the root requirement that requested the identifier, if any.
    requested_order: usize,
    identifier: Identifier,
}

/// Bridges the generic engine and the package domain.
pub(crate) struct SpoolProvider<'a> {
    factory: Factory<'a>,
    constraints: FxHashMap<PackageName, Constraint>,
    user_requested: FxHashMap<PackageName, usize>,
    prefers_installed: bool,
    with_requires: bool,
}

impl<'a> SpoolProvider<'a> {
    pub(crate) fn new(
        factory: Factory<'a>,
        constraints: FxHashMap<PackageName, Constraint>,
        user_requested: FxHashMap<PackageName, usize>,
        prefers_installed: bool,
        with_requires: bool,
    ) -> Self {
        Self {
            factory,
            constraints,
            user_requested,
            prefers_installed,
            with_requires,
        }
    }

    pub(crate) fn factory(&self) -> &Factory<'a> {
        &self.factory
    }

    pub(crate) fn constraints(&self) -> &FxHashMap<PackageName, Constraint> {
        &self.constraints
    }
}

impl<'a> Provider for SpoolProvider<'a> {
    type Identifier = Identifier;
    type Requirement = Requirement;
    type Candidate = Candidate;
    type Preference = Preference;
    type Error = ResolveError;

    fn identify_requirement(&self, requirement: &Requirement) -> Identifier {
        requirement.identifier()
    }

    fn identify_candidate(&self, candidate: &Candidate) -> Identifier {
        candidate.identifier()
    }

    fn get_preference(
        &self,
        identifier: &Identifier,
        criterion: &Criterion<'_, Self>,
        backtrack_causes: &[Information<Self>],
    ) -> Preference {
        let is_backtrack_cause = backtrack_causes.iter().any(|cause| {
            cause.requirement.identifier() == *identifier
                || cause
                    .parent
                    .as_ref()
                    .is_some_and(|parent| parent.identifier() == *identifier)
        });

        // Ranking never pulls from the index: a sequence that is not yet exhausted counts as
        // unbounded and sorts after every exhausted one.
        let candidates = if criterion.iter_requirement().any(Requirement::is_pinned) {
            1
        } else {
            criterion.candidates().exhausted_len().unwrap_or(usize::MAX)
        };

        let requested_order = identifier
            .name()
            .and_then(|name| self.user_requested.get(name))
            .copied()
            .unwrap_or(usize::MAX);

        Preference {
            not_backtrack_cause: !is_backtrack_cause,
            candidates,
            requested_order,
            identifier: identifier.clone(),
        }
    }

    fn find_matches<'p>(
        &'p self,
        identifier: &Identifier,
        context: &MatchContext<'_, 'p, Self>,
    ) -> Result<FoundCandidates<'p, Candidate, ResolveError>, ResolveError> {
        let requirements = context.requirements(identifier).collect::<Vec<_>>();
        let base_requirements = identifier
            .without_extras()
            .map(|base| context.requirements(&base).collect::<Vec<_>>())
            .unwrap_or_default();
        let incompatibilities = context.incompatibilities(identifier).collect::<Vec<_>>();
        let constraint = identifier
            .name()
            .and_then(|name| self.constraints.get(name));

        self.factory.find_candidates(
            identifier,
            &requirements,
            &base_requirements,
            &incompatibilities,
            constraint,
            self.prefers_installed,
        )
    }

    fn is_satisfied_by(&self, requirement: &Requirement, candidate: &Candidate) -> bool {
        requirement.is_satisfied_by(candidate)
    }

    fn get_dependencies(&self, candidate: &Candidate) -> Result<Vec<Requirement>, ResolveError> {
        Ok(self
            .factory
            .dependencies(candidate, self.with_requires)?
            .to_vec())
    }
}
