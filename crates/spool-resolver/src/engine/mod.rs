//! A generic backtracking resolver.
//!
//! The engine repeatedly picks an unsatisfied identifier, pins the first of its candidates whose
//! dependencies can be merged without emptying any criterion, and, when no candidate works,
//! backjumps to the most recent pin that contributed to the conflict. Domain knowledge lives
//! entirely behind [`Provider`].

use std::collections::VecDeque;
use std::fmt::{Display, Formatter};

use itertools::Itertools;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

pub use criterion::{Criterion, Information, RequirementInformation};
pub use found_candidates::{FoundCandidates, Iter};
pub use provider::{MatchContext, Provider};

use state::State;

mod criterion;
mod found_candidates;
mod provider;
mod state;

/// A node in the resolution graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GraphNode<I> {
    /// The synthetic parent of every root requirement.
    Root,
    Identifier(I),
}

impl<I: Display> Display for GraphNode<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "<root>"),
            Self::Identifier(identifier) => write!(f, "{identifier}"),
        }
    }
}

/// A successful resolution.
pub struct Resolution<'p, P: Provider> {
    /// The pinned candidate of every identifier reachable from the root requirements.
    pub mapping: FxHashMap<P::Identifier, P::Candidate>,
    /// Edges point from a parent to the identifiers it depends on.
    pub graph: DiGraph<GraphNode<P::Identifier>, ()>,
    /// The index of [`GraphNode::Root`] in the graph.
    pub root: NodeIndex,
    pub criteria: FxHashMap<P::Identifier, Criterion<'p, P>>,
}

#[derive(Debug)]
pub enum EngineError<R, C, E> {
    /// The provider failed (e.g., an index or metadata lookup).
    Provider(E),
    /// No assignment satisfies the requirements. Holds the causes of the final conflict.
    Impossible(Vec<RequirementInformation<R, C>>),
    /// The resolution did not converge within the given number of rounds. Holds the causes of
    /// the most recent conflict or, failing that, the requirements that were still unsatisfied.
    TooDeep(usize, Vec<RequirementInformation<R, C>>),
}

/// The [`EngineError`] type of a [`Provider`].
pub type ProviderError<P> =
    EngineError<<P as Provider>::Requirement, <P as Provider>::Candidate, <P as Provider>::Error>;

impl<R, C, E> From<E> for EngineError<R, C, E> {
    fn from(err: E) -> Self {
        Self::Provider(err)
    }
}

/// Resolve the root requirements, giving up after `max_rounds` rounds.
pub fn resolve<'p, P: Provider>(
    provider: &'p P,
    requirements: impl IntoIterator<Item = P::Requirement>,
    max_rounds: usize,
) -> Result<Resolution<'p, P>, ProviderError<P>> {
    let mut resolver = Resolver {
        provider,
        state: State::new(),
    };
    resolver.resolve(requirements, max_rounds)?;
    Ok(resolver.into_resolution())
}

/// The outcome of merging a requirement into a criterion: either the updated criterion, or the
/// criterion that ran out of candidates.
type Merge<'p, P> = Result<(), Criterion<'p, P>>;

struct Resolver<'p, P: Provider> {
    provider: &'p P,
    state: State<'p, P>,
}

impl<'p, P: Provider> Resolver<'p, P> {
    fn resolve(
        &mut self,
        requirements: impl IntoIterator<Item = P::Requirement>,
        max_rounds: usize,
    ) -> Result<(), ProviderError<P>> {
        // Root requirements are recorded in the root frame, which is never reverted.
        let mut pending = FxHashMap::default();
        for requirement in requirements {
            if let Err(conflict) = self.add_to_criteria(&mut pending, requirement, None)? {
                return Err(EngineError::Impossible(conflict.information));
            }
        }
        for (identifier, criterion) in pending {
            self.state.set_criterion(identifier, criterion);
        }
        self.state.push_frame();

        for round in 0..max_rounds {
            trace!("Starting round {round}");

            let mut unsatisfied = Vec::new();
            let mut satisfied = FxHashSet::default();
            for (identifier, criterion) in &self.state.criteria {
                if self.is_current_pin_satisfying(identifier, criterion) {
                    satisfied.insert(identifier.clone());
                } else {
                    unsatisfied.push((identifier, criterion));
                }
            }

            let Some(identifier) = self.select(&unsatisfied) else {
                debug!(
                    "Resolved {} identifiers in {round} rounds",
                    self.state.mapping.len()
                );
                return Ok(());
            };

            match self.attempt_to_pin(&identifier)? {
                Ok(()) => {
                    // Pins whose candidate no longer satisfies the updated criteria will be
                    // re-pinned; drop what they contributed in the meantime.
                    let newly_unsatisfied = satisfied
                        .into_iter()
                        .filter(|identifier| {
                            self.state.criteria.get(identifier).is_some_and(|criterion| {
                                !self.is_current_pin_satisfying(identifier, criterion)
                            })
                        })
                        .collect::<FxHashSet<_>>();
                    self.remove_information_from_criteria(&newly_unsatisfied);
                    self.state.push_frame();
                }
                Err(conflicts) => {
                    let causes = conflicts
                        .into_iter()
                        .flat_map(|criterion| criterion.information)
                        .collect::<Vec<_>>();
                    debug!(
                        "Failed to pin {identifier}; backtracking over {} causes",
                        causes.len()
                    );
                    let success = self.backjump(&causes)?;
                    self.state.backtrack_causes = causes;
                    if !success {
                        return Err(EngineError::Impossible(self.state.backtrack_causes.clone()));
                    }
                }
            }
        }

        Err(EngineError::TooDeep(max_rounds, self.open_causes()))
    }

    /// The causes of the most recent conflict, or the requirements on every identifier that is
    /// not yet pinned to a satisfying candidate, ordered by identifier.
    fn open_causes(&self) -> Vec<Information<P>> {
        if !self.state.backtrack_causes.is_empty() {
            return self.state.backtrack_causes.clone();
        }
        self.state
            .criteria
            .iter()
            .filter(|(identifier, criterion)| {
                !self.is_current_pin_satisfying(identifier, criterion)
            })
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
            .flat_map(|(_, criterion)| criterion.information.iter().cloned())
            .collect()
    }

    /// Pick the unsatisfied identifier with the smallest preference, or `None` if every
    /// identifier is satisfied.
    fn select(
        &self,
        unsatisfied: &[(&P::Identifier, &Criterion<'p, P>)],
    ) -> Option<P::Identifier> {
        if let [(identifier, _)] = unsatisfied {
            return Some((*identifier).clone());
        }
        unsatisfied
            .iter()
            .map(|(identifier, criterion)| {
                let preference = self.provider.get_preference(
                    identifier,
                    criterion,
                    &self.state.backtrack_causes,
                );
                (preference, *identifier)
            })
            .min()
            .map(|(_, identifier)| identifier.clone())
    }

    fn is_current_pin_satisfying(
        &self,
        identifier: &P::Identifier,
        criterion: &Criterion<'p, P>,
    ) -> bool {
        let Some(candidate) = self.state.mapping.get(identifier) else {
            return false;
        };
        criterion
            .iter_requirement()
            .all(|requirement| self.provider.is_satisfied_by(requirement, candidate))
    }

    /// Merge a requirement into the criterion for its identifier, looking in `pending` before the
    /// current state.
    fn add_to_criteria(
        &self,
        pending: &mut FxHashMap<P::Identifier, Criterion<'p, P>>,
        requirement: P::Requirement,
        parent: Option<P::Candidate>,
    ) -> Result<Merge<'p, P>, P::Error> {
        let identifier = self.provider.identify_requirement(&requirement);
        let existing = pending
            .get(&identifier)
            .or_else(|| self.state.criteria.get(&identifier));

        let (mut information, incompatibilities) = existing
            .map(|criterion| {
                (
                    criterion.information.clone(),
                    criterion.incompatibilities.clone(),
                )
            })
            .unwrap_or_default();

        let candidates = {
            let context = MatchContext {
                criteria: &self.state.criteria,
                pending,
                identifier: &identifier,
                requirements: std::slice::from_ref(&requirement),
                incompatibilities: &[],
            };
            self.provider.find_matches(&identifier, &context)?
        };

        information.push(RequirementInformation {
            requirement,
            parent,
        });
        let criterion = Criterion {
            candidates,
            information,
            incompatibilities,
        };
        if criterion.candidates.is_empty()? {
            trace!("No candidates left for {identifier}");
            return Ok(Err(criterion));
        }
        pending.insert(identifier, criterion);
        Ok(Ok(()))
    }

    /// Compute the criteria that would result from pinning the candidate.
    fn get_updated_criteria(
        &self,
        candidate: &P::Candidate,
    ) -> Result<Result<FxHashMap<P::Identifier, Criterion<'p, P>>, Criterion<'p, P>>, P::Error>
    {
        let mut pending = FxHashMap::default();
        for requirement in self.provider.get_dependencies(candidate)? {
            if let Err(conflict) =
                self.add_to_criteria(&mut pending, requirement, Some(candidate.clone()))?
            {
                return Ok(Err(conflict));
            }
        }
        Ok(Ok(pending))
    }

    /// Try each candidate of the identifier in order, pinning the first one whose dependencies
    /// merge cleanly. On failure, returns the criteria that conflicted.
    fn attempt_to_pin(
        &mut self,
        identifier: &P::Identifier,
    ) -> Result<Result<(), Vec<Criterion<'p, P>>>, P::Error> {
        let Some(criterion) = self.state.criteria.get(identifier).cloned() else {
            return Ok(Err(Vec::new()));
        };

        let mut causes = Vec::new();
        for candidate in criterion.candidates.iter() {
            let candidate = candidate?;

            if !criterion
                .iter_requirement()
                .all(|requirement| self.provider.is_satisfied_by(requirement, &candidate))
            {
                trace!("Skipping {candidate:?}, which does not satisfy {identifier}");
                continue;
            }

            match self.get_updated_criteria(&candidate)? {
                Ok(pending) => {
                    for (identifier, criterion) in pending {
                        self.state.set_criterion(identifier, criterion);
                    }
                    debug!("Pinning {identifier} to {candidate:?}");
                    self.state.pin(identifier.clone(), candidate);
                    return Ok(Ok(()));
                }
                Err(conflict) => {
                    debug!("Rejecting {candidate:?} for {identifier}");
                    causes.push(conflict);
                }
            }
        }

        // Every candidate was skipped: the criterion itself is the conflict.
        if causes.is_empty() {
            causes.push(criterion);
        }
        Ok(Err(causes))
    }

    /// Drop requirement information contributed by the given (now unsatisfying) pins.
    fn remove_information_from_criteria(&mut self, parents: &FxHashSet<P::Identifier>) {
        if parents.is_empty() {
            return;
        }
        let mut updates = Vec::new();
        for (identifier, criterion) in &self.state.criteria {
            let keep = |information: &Information<P>| {
                information.parent.as_ref().is_none_or(|parent| {
                    !parents.contains(&self.provider.identify_candidate(parent))
                })
            };
            if criterion.information.iter().all(keep) {
                continue;
            }
            updates.push((
                identifier.clone(),
                Criterion {
                    candidates: criterion.candidates.clone(),
                    information: criterion
                        .information
                        .iter()
                        .filter(|&information| keep(information))
                        .cloned()
                        .collect(),
                    incompatibilities: criterion.incompatibilities.clone(),
                },
            ));
        }
        for (identifier, criterion) in updates {
            self.state.set_criterion(identifier, criterion);
        }
    }

    /// Revert pins until reaching one whose candidate contributed to the conflict, mark that
    /// candidate as incompatible, and continue from the state just before it was pinned.
    ///
    /// Returns `false` if there is nothing left to revert.
    fn backjump(&mut self, causes: &[Information<P>]) -> Result<bool, P::Error> {
        let incompatible_deps = causes
            .iter()
            .filter_map(|cause| cause.parent.as_ref())
            .map(|parent| self.provider.identify_candidate(parent))
            .chain(
                causes
                    .iter()
                    .map(|cause| self.provider.identify_requirement(&cause.requirement)),
            )
            .collect::<FxHashSet<_>>();

        // The root frame, a frame closed by a pin, and the open frame.
        while self.state.depth() >= 3 {
            // Discard the frame in which the conflict was found.
            self.state.revert_frame();

            let (identifier, candidate, mut incompatibilities_from_broken) = loop {
                let Some((identifier, candidate)) = self.state.last_pin().cloned() else {
                    return Ok(false);
                };
                let dependencies = self.provider.get_dependencies(&candidate)?;
                let contributed = dependencies.iter().any(|dependency| {
                    incompatible_deps.contains(&self.provider.identify_requirement(dependency))
                });
                if contributed {
                    let incompatibilities = self
                        .state
                        .criteria
                        .iter()
                        .map(|(identifier, criterion)| {
                            (identifier.clone(), criterion.incompatibilities.clone())
                        })
                        .collect::<Vec<_>>();
                    self.state.revert_frame();
                    break (identifier, candidate, incompatibilities);
                }
                trace!("Reverting {identifier}, which is unrelated to the conflict");
                self.state.revert_frame();
            };

            debug!("Backjumping: marking {candidate:?} as incompatible for {identifier}");
            incompatibilities_from_broken.push((identifier, vec![candidate]));

            self.state.push_frame();
            if self.patch_criteria(incompatibilities_from_broken)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Re-filter the candidates of each criterion against the gathered incompatibilities.
    /// Returns `false` if any criterion runs out of candidates.
    fn patch_criteria(
        &mut self,
        incompatibilities_from_broken: Vec<(P::Identifier, Vec<P::Candidate>)>,
    ) -> Result<bool, P::Error> {
        let empty = FxHashMap::default();
        for (identifier, incompatibilities) in incompatibilities_from_broken {
            if incompatibilities.is_empty() {
                continue;
            }
            let Some(criterion) = self.state.criteria.get(&identifier) else {
                continue;
            };

            let candidates = {
                let context = MatchContext {
                    criteria: &self.state.criteria,
                    pending: &empty,
                    identifier: &identifier,
                    requirements: &[],
                    incompatibilities: &incompatibilities,
                };
                self.provider.find_matches(&identifier, &context)?
            };
            if candidates.is_empty()? {
                return Ok(false);
            }

            let mut merged = incompatibilities;
            for candidate in &criterion.incompatibilities {
                if !merged.contains(candidate) {
                    merged.push(candidate.clone());
                }
            }
            let patched = Criterion {
                candidates,
                information: criterion.information.clone(),
                incompatibilities: merged,
            };
            self.state.set_criterion(identifier, patched);
        }
        Ok(true)
    }

    /// Keep only the pins reachable from the root requirements, and connect them in a graph.
    fn into_resolution(self) -> Resolution<'p, P> {
        let Self { provider, state } = self;

        // Resolve each parent candidate to the identifier it is currently pinned under. Parents
        // that were since replaced are stale and contribute no edge.
        let mut edges: FxHashMap<Option<P::Identifier>, Vec<P::Identifier>> = FxHashMap::default();
        let mut identifiers = state.criteria.keys().cloned().collect::<Vec<_>>();
        identifiers.sort_unstable();
        for identifier in &identifiers {
            let criterion = &state.criteria[identifier];
            for parent in criterion.iter_parent() {
                let parent = match parent {
                    None => None,
                    Some(candidate) => {
                        let parent = provider.identify_candidate(candidate);
                        if state.mapping.get(&parent) != Some(candidate) {
                            continue;
                        }
                        Some(parent)
                    }
                };
                let children = edges.entry(parent).or_default();
                if !children.contains(identifier) {
                    children.push(identifier.clone());
                }
            }
        }

        // Breadth-first from the root.
        let mut connected = FxHashSet::default();
        let mut queue = VecDeque::from([None]);
        while let Some(parent) = queue.pop_front() {
            for child in edges.get(&parent).into_iter().flatten() {
                if state.mapping.contains_key(child) && connected.insert(child.clone()) {
                    queue.push_back(Some(child.clone()));
                }
            }
        }

        let mut graph = DiGraph::new();
        let root = graph.add_node(GraphNode::Root);
        let mut nodes = FxHashMap::default();
        for identifier in identifiers.iter().filter(|id| connected.contains(*id)) {
            let index = graph.add_node(GraphNode::Identifier(identifier.clone()));
            nodes.insert(identifier.clone(), index);
        }
        for (parent, children) in &edges {
            let source = match parent {
                None => root,
                Some(parent) => match nodes.get(parent) {
                    Some(index) => *index,
                    None => continue,
                },
            };
            for child in children {
                if let Some(target) = nodes.get(child) {
                    graph.update_edge(source, *target, ());
                }
            }
        }

        let mapping = state
            .mapping
            .into_iter()
            .filter(|(identifier, _)| connected.contains(identifier))
            .collect();

        Resolution {
            mapping,
            graph,
            root,
            criteria: state.criteria,
        }
    }
}

#[cfg(test)]
mod tests;
