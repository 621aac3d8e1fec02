use std::fmt::{Debug, Display};
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::engine::{Criterion, FoundCandidates, Information};

/// The domain-specific half of the resolver.
///
/// The engine knows nothing about packages or versions: it asks the provider how to identify
/// requirements and candidates, which candidates match a set of requirements, and what a candidate
/// depends on.
pub trait Provider: Sized {
    /// The key under which requirements and candidates are grouped.
    type Identifier: Clone + Eq + Hash + Ord + Debug + Display;
    type Requirement: Clone + Debug;
    /// Candidates are compared for identity (e.g., to detect a known incompatibility), so
    /// equality must be cheap.
    type Candidate: Clone + PartialEq + Debug;
    /// The key used to pick the next identifier to pin; the smallest key wins.
    type Preference: Ord;
    type Error;

    fn identify_requirement(&self, requirement: &Self::Requirement) -> Self::Identifier;

    fn identify_candidate(&self, candidate: &Self::Candidate) -> Self::Identifier;

    /// Produce a sort key for an unpinned identifier.
    fn get_preference(
        &self,
        identifier: &Self::Identifier,
        criterion: &Criterion<'_, Self>,
        backtrack_causes: &[Information<Self>],
    ) -> Self::Preference;

    /// Find all candidates for the identifier that satisfy the requirements in the context and
    /// are not among its known incompatibilities, most preferred first.
    fn find_matches<'p>(
        &'p self,
        identifier: &Self::Identifier,
        context: &MatchContext<'_, 'p, Self>,
    ) -> Result<FoundCandidates<'p, Self::Candidate, Self::Error>, Self::Error>;

    fn is_satisfied_by(&self, requirement: &Self::Requirement, candidate: &Self::Candidate) -> bool;

    fn get_dependencies(
        &self,
        candidate: &Self::Candidate,
    ) -> Result<Vec<Self::Requirement>, Self::Error>;
}

/// A read-only view of the requirements and incompatibilities the engine knows about, including
/// those it is about to add for the identifier being matched.
pub struct MatchContext<'c, 'p, P: Provider> {
    pub(crate) criteria: &'c FxHashMap<P::Identifier, Criterion<'p, P>>,
    /// Criteria computed in the current step, which shadow `criteria`.
    pub(crate) pending: &'c FxHashMap<P::Identifier, Criterion<'p, P>>,
    pub(crate) identifier: &'c P::Identifier,
    pub(crate) requirements: &'c [P::Requirement],
    pub(crate) incompatibilities: &'c [P::Candidate],
}

impl<'c, 'p, P: Provider> MatchContext<'c, 'p, P> {
    fn criterion(&self, identifier: &P::Identifier) -> Option<&'c Criterion<'p, P>> {
        self.pending
            .get(identifier)
            .or_else(|| self.criteria.get(identifier))
    }

    /// The requirements that apply to the identifier.
    pub fn requirements(
        &self,
        identifier: &P::Identifier,
    ) -> impl Iterator<Item = &'c P::Requirement> + use<'c, 'p, P> {
        let extra = if identifier == self.identifier {
            self.requirements
        } else {
            &[]
        };
        self.criterion(identifier)
            .into_iter()
            .flat_map(|criterion| criterion.information.iter())
            .map(|information| &information.requirement)
            .chain(extra)
    }

    /// The candidates known not to work for the identifier.
    pub fn incompatibilities(
        &self,
        identifier: &P::Identifier,
    ) -> impl Iterator<Item = &'c P::Candidate> + use<'c, 'p, P> {
        let extra = if identifier == self.identifier {
            self.incompatibilities
        } else {
            &[]
        };
        self.criterion(identifier)
            .into_iter()
            .flat_map(|criterion| criterion.incompatibilities.iter())
            .chain(extra)
    }
}
