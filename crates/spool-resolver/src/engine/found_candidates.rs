use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

type Source<'a, C, E> = Box<dyn Iterator<Item = Result<C, E>> + 'a>;

/// A lazily-evaluated, memoized sequence of candidates for a single identifier.
///
/// Candidates are pulled from the underlying source on demand and cached, so the sequence can be
/// walked from the start any number of times while the source itself is consumed at most once.
/// Clones share the same cache.
pub struct FoundCandidates<'a, C, E> {
    inner: Rc<RefCell<Inner<'a, C, E>>>,
}

struct Inner<'a, C, E> {
    materialized: Vec<C>,
    source: Option<Source<'a, C, E>>,
}

impl<'a, C: Clone, E> FoundCandidates<'a, C, E> {
    /// Create a sequence that pulls from the given iterator on demand.
    pub fn new(source: impl Iterator<Item = Result<C, E>> + 'a) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                materialized: Vec::new(),
                source: Some(Box::new(source)),
            })),
        }
    }

    /// Create a sequence over candidates that are already known.
    pub fn from_vec(candidates: Vec<C>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                materialized: candidates,
                source: None,
            })),
        }
    }

    /// Create a sequence with no candidates.
    pub fn empty() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Return the candidate at the given position, pulling from the source as needed.
    pub fn get(&self, index: usize) -> Result<Option<C>, E> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        while inner.materialized.len() <= index {
            let Some(source) = inner.source.as_mut() else {
                return Ok(None);
            };
            match source.next() {
                Some(Ok(candidate)) => inner.materialized.push(candidate),
                Some(Err(err)) => return Err(err),
                None => inner.source = None,
            }
        }
        Ok(inner.materialized.get(index).cloned())
    }

    /// Returns `true` if the sequence yields no candidates at all.
    ///
    /// At most one candidate is pulled from the source.
    pub fn is_empty(&self) -> Result<bool, E> {
        Ok(self.get(0)?.is_none())
    }

    /// The number of candidates, if the source has been exhausted.
    pub fn exhausted_len(&self) -> Option<usize> {
        let inner = self.inner.borrow();
        inner.source.is_none().then_some(inner.materialized.len())
    }

    /// Iterate over the candidates from the start.
    pub fn iter(&self) -> Iter<'_, 'a, C, E> {
        Iter {
            candidates: self,
            index: Some(0),
        }
    }
}

impl<C, E> Clone for FoundCandidates<'_, C, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<C: Debug, E> Debug for FoundCandidates<'_, C, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("FoundCandidates")
            .field("materialized", &inner.materialized)
            .field("exhausted", &inner.source.is_none())
            .finish()
    }
}

/// An iterator over a [`FoundCandidates`], yielding an error at most once.
pub struct Iter<'s, 'a, C, E> {
    candidates: &'s FoundCandidates<'a, C, E>,
    /// The next position to read, or `None` once the source has failed.
    index: Option<usize>,
}

impl<C: Clone, E> Iterator for Iter<'_, '_, C, E> {
    type Item = Result<C, E>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.index?;
        match self.candidates.get(index) {
            Ok(Some(candidate)) => {
                self.index = Some(index + 1);
                Some(Ok(candidate))
            }
            Ok(None) => None,
            Err(err) => {
                self.index = None;
                Some(Err(err))
            }
        }
    }
}
