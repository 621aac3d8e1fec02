use std::fmt::{Debug, Formatter};

use crate::engine::{FoundCandidates, Provider};

/// A requirement, together with the candidate that introduced it (`None` for a root requirement).
#[derive(Debug, Clone)]
pub struct RequirementInformation<R, C> {
    pub requirement: R,
    pub parent: Option<C>,
}

/// The [`RequirementInformation`] type of a [`Provider`].
pub type Information<P> =
    RequirementInformation<<P as Provider>::Requirement, <P as Provider>::Candidate>;

/// Everything known about a single identifier: the candidates that may still be chosen, the
/// requirements that apply to it, and the candidates known not to work.
///
/// A criterion is never stored with an empty candidate sequence.
pub struct Criterion<'a, P: Provider> {
    pub(crate) candidates: FoundCandidates<'a, P::Candidate, P::Error>,
    pub(crate) information: Vec<Information<P>>,
    pub(crate) incompatibilities: Vec<P::Candidate>,
}

impl<'a, P: Provider> Criterion<'a, P> {
    pub fn candidates(&self) -> &FoundCandidates<'a, P::Candidate, P::Error> {
        &self.candidates
    }

    pub fn information(&self) -> &[Information<P>] {
        &self.information
    }

    pub fn incompatibilities(&self) -> &[P::Candidate] {
        &self.incompatibilities
    }

    pub fn iter_requirement(&self) -> impl Iterator<Item = &P::Requirement> {
        self.information.iter().map(|info| &info.requirement)
    }

    pub fn iter_parent(&self) -> impl Iterator<Item = Option<&P::Candidate>> {
        self.information.iter().map(|info| info.parent.as_ref())
    }
}

impl<P: Provider> Clone for Criterion<'_, P> {
    fn clone(&self) -> Self {
        Self {
            candidates: self.candidates.clone(),
            information: self.information.clone(),
            incompatibilities: self.incompatibilities.clone(),
        }
    }
}

impl<P: Provider> Debug for Criterion<'_, P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Criterion")
            .field("candidates", &self.candidates)
            .field("information", &self.information)
            .field("incompatibilities", &self.incompatibilities)
            .finish()
    }
}
