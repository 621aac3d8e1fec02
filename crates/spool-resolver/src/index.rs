use std::cell::RefCell;
use std::rc::Rc;

use pep440_rs::VersionSpecifiers;
use pep508_rs::PackageName;
use rustc_hash::FxHashMap;
use tracing::debug;

use spool_types::{HashDigest, IndexCandidate, PackageIndex};

use crate::error::ResolveError;
use crate::requirement::is_exact_pin;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Query {
    name: PackageName,
    specifiers: String,
    hashes: Vec<HashDigest>,
}

/// A [`PackageIndex`] wrapper that asks the index at most once per distinct query.
pub(crate) struct CachedIndex<'a> {
    index: &'a dyn PackageIndex,
    responses: RefCell<FxHashMap<Query, Rc<[IndexCandidate]>>>,
}

impl<'a> CachedIndex<'a> {
    pub(crate) fn new(index: &'a dyn PackageIndex) -> Self {
        Self {
            index,
            responses: RefCell::default(),
        }
    }

    pub(crate) fn inner(&self) -> &'a dyn PackageIndex {
        self.index
    }

    /// Return the files matching the specifiers and hashes, best first.
    pub(crate) fn find_best_candidates(
        &self,
        name: &PackageName,
        specifiers: &VersionSpecifiers,
        hashes: &[HashDigest],
    ) -> Result<Rc<[IndexCandidate]>, ResolveError> {
        let mut hashes = hashes.to_vec();
        hashes.sort_unstable();
        hashes.dedup();
        let query = Query {
            name: name.clone(),
            specifiers: specifiers.to_string(),
            hashes,
        };
        if let Some(response) = self.responses.borrow().get(&query) {
            return Ok(Rc::clone(response));
        }

        debug!("Querying the index for: {name}{specifiers}");
        let response: Rc<[IndexCandidate]> = self
            .index
            .find_best_candidates(name, specifiers, &query.hashes)
            .map_err(|err| ResolveError::Index(name.clone(), err))?
            .into();
        self.responses
            .borrow_mut()
            .insert(query, Rc::clone(&response));
        Ok(response)
    }

    /// Return every file of the package, regardless of version.
    pub(crate) fn find_all_candidates(
        &self,
        name: &PackageName,
    ) -> Result<Rc<[IndexCandidate]>, ResolveError> {
        self.find_best_candidates(name, &VersionSpecifiers::from_iter(std::iter::empty()), &[])
    }
}

/// Drop yanked files, unless every file is yanked and the specifiers pin an exact version.
///
/// See: <https://peps.python.org/pep-0592/>
pub(crate) fn filter_yanked(
    candidates: &[IndexCandidate],
    specifiers: &VersionSpecifiers,
) -> Vec<IndexCandidate> {
    let all_yanked = candidates
        .iter()
        .all(|candidate| candidate.link.is_yanked());
    let keep_yanked = all_yanked && is_exact_pin(specifiers);
    candidates
        .iter()
        .filter(|candidate| keep_yanked || !candidate.link.is_yanked())
        .cloned()
        .collect()
}
