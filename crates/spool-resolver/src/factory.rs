use std::cell::RefCell;
use std::iter::Peekable;
use std::rc::Rc;

use pep440_rs::{Version, VersionSpecifiers};
use pep508_rs::{ExtraName, PackageName, VersionOrUrl};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{trace, warn};
use url::Url;

use spool_configuration::ResolverSettings;
use spool_types::{
    HashDigest, IndexCandidate, InstalledDist, InstalledPackages, Interpreter, Link, Preparer,
};

use crate::candidate::{
    check_metadata_consistency, prepare_metadata, Candidate, ExtrasCandidate, InstalledCandidate,
    LinkCandidate, Origin, PythonCandidate,
};
use crate::engine::FoundCandidates;
use crate::error::ResolveError;
use crate::identifier::Identifier;
use crate::index::{filter_yanked, CachedIndex};
use crate::requirement::{Requirement, SpecifierRequirement};

/// A user-supplied constraint: it narrows the versions a package may resolve to, but does not
/// cause the package to be installed.
#[derive(Debug, Clone)]
pub(crate) struct Constraint {
    pub(crate) specifiers: VersionSpecifiers,
}

impl Constraint {
    fn is_satisfied_by(&self, candidate: &Candidate) -> bool {
        self.specifiers.contains(candidate.version())
    }
}

/// The identity of a base candidate, for caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CandidateKey {
    Installed(PackageName),
    Index(Url),
    Direct(Url, bool),
}

impl CandidateKey {
    fn of(candidate: &Candidate) -> Option<Self> {
        match candidate {
            Candidate::Installed(installed) => Some(Self::Installed(installed.dist.name.clone())),
            Candidate::Link(link) => match link.origin {
                Origin::Index => Some(Self::Index(link.link.url().clone())),
                Origin::Direct => Some(Self::Direct(
                    link.link.url().clone(),
                    link.link.is_editable(),
                )),
            },
            Candidate::Extras(_) | Candidate::Python(_) => None,
        }
    }
}

/// Creates requirements and candidates, and finds the candidates matching a set of requirements.
///
/// Every candidate is created once and shared, so that candidates can be compared by identity.
pub(crate) struct Factory<'a> {
    index: CachedIndex<'a>,
    preparer: &'a dyn Preparer,
    installed: &'a dyn InstalledPackages,
    interpreter: &'a Interpreter,
    settings: &'a ResolverSettings,
    python: Candidate,
    candidates: RefCell<FxHashMap<CandidateKey, Candidate>>,
    extras_candidates: RefCell<FxHashMap<(CandidateKey, Vec<ExtraName>), Candidate>>,
}

impl<'a> Factory<'a> {
    pub(crate) fn new(
        index: CachedIndex<'a>,
        preparer: &'a dyn Preparer,
        installed: &'a dyn InstalledPackages,
        interpreter: &'a Interpreter,
        settings: &'a ResolverSettings,
    ) -> Self {
        let python = Candidate::Python(Rc::new(PythonCandidate::new(
            interpreter.python_full_version().clone(),
        )));
        Self {
            index,
            preparer,
            installed,
            interpreter,
            settings,
            python,
            candidates: RefCell::default(),
            extras_candidates: RefCell::default(),
        }
    }

    pub(crate) fn index(&self) -> &CachedIndex<'a> {
        &self.index
    }

    pub(crate) fn interpreter(&self) -> &'a Interpreter {
        self.interpreter
    }

    pub(crate) fn python_candidate(&self) -> &Candidate {
        &self.python
    }

    /// The installed distribution of the package, unless installed packages are ignored.
    pub(crate) fn installed_dist(&self, name: &PackageName) -> Option<&'a InstalledDist> {
        if self.settings.ignore_installed {
            return None;
        }
        self.installed.get_package(name)
    }

    fn cached(&self, key: CandidateKey, create: impl FnOnce() -> Candidate) -> Candidate {
        if let Some(candidate) = self.candidates.borrow().get(&key) {
            return candidate.clone();
        }
        let candidate = create();
        self.candidates.borrow_mut().insert(key, candidate.clone());
        candidate
    }

    fn installed_candidate(&self, dist: &InstalledDist) -> Candidate {
        self.cached(CandidateKey::Installed(dist.name.clone()), || {
            Candidate::Installed(Rc::new(InstalledCandidate::new(dist.clone())))
        })
    }

    fn index_candidate(&self, name: &PackageName, version: Version, link: Link) -> Candidate {
        self.cached(CandidateKey::Index(link.url().clone()), || {
            Candidate::Link(Rc::new(LinkCandidate::from_index(
                name.clone(),
                version,
                link,
            )))
        })
    }

    /// Create the candidate for a direct URL, preparing its metadata to learn its version.
    pub(crate) fn direct_candidate(
        &self,
        link: Link,
        name: &PackageName,
    ) -> Result<Candidate, ResolveError> {
        let key = CandidateKey::Direct(link.url().clone(), link.is_editable());
        if let Some(candidate) = self.candidates.borrow().get(&key) {
            return Ok(candidate.clone());
        }
        let metadata = prepare_metadata(self.preparer, &link)?;
        check_metadata_consistency(&link, name, None, &metadata)?;
        let candidate = Candidate::Link(Rc::new(LinkCandidate::from_direct(link, metadata)));
        self.candidates.borrow_mut().insert(key, candidate.clone());
        Ok(candidate)
    }

    /// Wrap the base candidate with the given (sorted) extras.
    pub(crate) fn extras_candidate(
        &self,
        name: &PackageName,
        base: &Candidate,
        extras: &[ExtraName],
    ) -> Candidate {
        let create = || {
            Candidate::Extras(Rc::new(ExtrasCandidate::new(
                name.clone(),
                base.clone(),
                extras.to_vec(),
            )))
        };
        let Some(key) = CandidateKey::of(base) else {
            return create();
        };
        let key = (key, extras.to_vec());
        if let Some(candidate) = self.extras_candidates.borrow().get(&key) {
            return candidate.clone();
        }
        let candidate = create();
        self.extras_candidates
            .borrow_mut()
            .insert(key, candidate.clone());
        candidate
    }

    fn with_extras(&self, name: &PackageName, base: Candidate, extras: &[ExtraName]) -> Candidate {
        if extras.is_empty() {
            base
        } else {
            self.extras_candidate(name, &base, extras)
        }
    }

    /// Convert a PEP 508 requirement into resolver requirements.
    ///
    /// A direct URL yields an explicit requirement on its candidate (plus one on the candidate
    /// with extras, if any). A named requirement with extras and specifiers also constrains the
    /// bare package, so conflicts on the base surface early.
    pub(crate) fn make_requirements(
        &self,
        requirement: &pep508_rs::Requirement,
        hashes: &[HashDigest],
        editable: bool,
    ) -> Result<Vec<Requirement>, ResolveError> {
        let mut extras = requirement.extras.clone();
        extras.sort_unstable();
        extras.dedup();

        if let Some(VersionOrUrl::Url(url)) = &requirement.version_or_url {
            let link = Link::new(url.to_url())
                .with_hashes(hashes.iter().cloned())
                .with_editable(editable);
            let base = self.direct_candidate(link, &requirement.name)?;
            let mut requirements = Vec::with_capacity(2);
            if !extras.is_empty() {
                requirements.push(Requirement::Explicit(
                    self.extras_candidate(&requirement.name, &base, &extras),
                ));
            }
            requirements.insert(0, Requirement::Explicit(base));
            return Ok(requirements);
        }

        let specifiers = match &requirement.version_or_url {
            Some(VersionOrUrl::VersionSpecifier(specifiers)) => specifiers.clone(),
            _ => VersionSpecifiers::from_iter(std::iter::empty()),
        };

        let mut requirements = Vec::with_capacity(2);
        if !extras.is_empty() && !specifiers.is_empty() {
            requirements.push(Requirement::Specifier(Rc::new(SpecifierRequirement {
                name: requirement.name.clone(),
                extras: Vec::new(),
                specifiers: specifiers.clone(),
                hashes: hashes.to_vec(),
            })));
        }
        requirements.push(Requirement::Specifier(Rc::new(SpecifierRequirement {
            name: requirement.name.clone(),
            extras,
            specifiers,
            hashes: hashes.to_vec(),
        })));
        Ok(requirements)
    }

    /// The requirement on the interpreter implied by a `Requires-Python` field, if any.
    pub(crate) fn make_requires_python_requirement(
        &self,
        specifiers: Option<&VersionSpecifiers>,
    ) -> Option<Requirement> {
        if self.settings.ignore_requires_python {
            return None;
        }
        let specifiers = specifiers.filter(|specifiers| !specifiers.is_empty())?;
        Some(Requirement::RequiresPython(Rc::new(specifiers.clone())))
    }

    /// Convert the `Requires-Dist` entries whose markers hold into requirements.
    fn requirements_from_dist(
        &self,
        requires_dist: &[pep508_rs::Requirement],
        extras: &[ExtraName],
        skip_base: bool,
    ) -> Result<Vec<Requirement>, ResolveError> {
        let markers = self.interpreter.markers();
        let mut requirements = Vec::new();
        for requirement in requires_dist {
            if !requirement.evaluate_markers(markers, extras) {
                trace!("Skipping `{requirement}`: markers do not apply");
                continue;
            }
            // With extras enabled, only add what the extras contribute on top of the base.
            if skip_base && requirement.evaluate_markers(markers, &[]) {
                continue;
            }
            requirements.extend(self.make_requirements(requirement, &[], false)?);
        }
        Ok(requirements)
    }

    /// Return the dependencies of the candidate, computing them on first use.
    ///
    /// Without `with_requires`, only the structural requirement of a candidate with extras on its
    /// base is returned.
    pub(crate) fn dependencies(
        &self,
        candidate: &Candidate,
        with_requires: bool,
    ) -> Result<Rc<[Requirement]>, ResolveError> {
        match candidate {
            Candidate::Python(_) => Ok(Rc::from(Vec::new())),
            Candidate::Installed(_) | Candidate::Link(_) if !with_requires => {
                Ok(Rc::from(Vec::new()))
            }
            Candidate::Installed(installed) => {
                if let Some(dependencies) = installed.dependencies.get() {
                    return Ok(Rc::clone(dependencies));
                }
                let dependencies: Rc<[Requirement]> = self
                    .requirements_from_dist(&installed.dist.requires_dist, &[], false)?
                    .into();
                Ok(Rc::clone(
                    installed.dependencies.get_or_init(|| dependencies),
                ))
            }
            Candidate::Link(link) => {
                if let Some(dependencies) = link.dependencies.get() {
                    return Ok(Rc::clone(dependencies));
                }
                let metadata = link.metadata(self.preparer)?;
                let mut dependencies =
                    self.requirements_from_dist(&metadata.requires_dist, &[], false)?;
                dependencies.extend(
                    self.make_requires_python_requirement(metadata.requires_python.as_ref()),
                );
                let dependencies: Rc<[Requirement]> = dependencies.into();
                Ok(Rc::clone(link.dependencies.get_or_init(|| dependencies)))
            }
            Candidate::Extras(extras) => {
                let base = Requirement::ExtrasBase(extras.base.clone());
                if !with_requires {
                    return Ok(Rc::from(vec![base]));
                }
                if let Some(dependencies) = extras.dependencies.get() {
                    return Ok(Rc::clone(dependencies));
                }

                let (requires_dist, provides_extras) = match &extras.base {
                    Candidate::Link(link) => {
                        let metadata = link.metadata(self.preparer)?;
                        (
                            metadata.requires_dist.as_slice(),
                            metadata.provides_extras.as_slice(),
                        )
                    }
                    Candidate::Installed(installed) => (
                        installed.dist.requires_dist.as_slice(),
                        installed.dist.provides_extras.as_slice(),
                    ),
                    Candidate::Extras(_) | Candidate::Python(_) => (&[][..], &[][..]),
                };

                let mut valid = Vec::with_capacity(extras.extras.len());
                for extra in &extras.extras {
                    if provides_extras.contains(extra) {
                        valid.push(extra.clone());
                    } else {
                        warn!(
                            "{} {} does not provide the extra '{extra}'",
                            extras.name,
                            extras.base.version()
                        );
                    }
                }

                let mut dependencies = vec![base];
                if !valid.is_empty() {
                    dependencies.extend(self.requirements_from_dist(requires_dist, &valid, true)?);
                }
                let dependencies: Rc<[Requirement]> = dependencies.into();
                Ok(Rc::clone(extras.dependencies.get_or_init(|| dependencies)))
            }
        }
    }

    /// Find the candidates for the identifier, most preferred first.
    ///
    /// If any requirement names an explicit candidate, only explicit candidates are considered.
    /// Otherwise, the installed distribution (if it fits) and the index are consulted lazily.
    pub(crate) fn find_candidates<'p>(
        &'p self,
        identifier: &Identifier,
        requirements: &[&Requirement],
        base_requirements: &[&Requirement],
        incompatibilities: &[&Candidate],
        constraint: Option<&Constraint>,
        prefers_installed: bool,
    ) -> Result<FoundCandidates<'p, Candidate, ResolveError>, ResolveError> {
        let mut explicit = Vec::new();
        let mut specifier_requirements = Vec::new();
        for requirement in requirements {
            match requirement {
                Requirement::Explicit(candidate) | Requirement::ExtrasBase(candidate) => {
                    push_unique(&mut explicit, candidate.clone());
                }
                Requirement::Specifier(requirement) => {
                    specifier_requirements.push(&**requirement);
                }
                Requirement::RequiresPython(specifiers) => {
                    if specifiers.contains(self.python.version()) {
                        push_unique(&mut explicit, self.python.clone());
                    }
                }
            }
        }

        // An explicit candidate for `foo` pins `foo[bar]` as well.
        let extras = identifier.extras();
        if let Some(name) = identifier.name().filter(|_| !extras.is_empty()) {
            for requirement in base_requirements {
                if let Some(base) = requirement.explicit_candidate() {
                    push_unique(&mut explicit, self.extras_candidate(name, base, extras));
                }
            }
        }

        if explicit.is_empty() {
            let Some(name) = identifier.name() else {
                return Ok(FoundCandidates::empty());
            };
            if specifier_requirements.is_empty() {
                return Ok(FoundCandidates::empty());
            }
            return Ok(self.iter_found_candidates(
                name,
                extras,
                &specifier_requirements,
                constraint,
                prefers_installed,
                incompatibilities,
            ));
        }

        let candidates = explicit
            .into_iter()
            .filter(|candidate| !incompatibilities.contains(&candidate))
            .filter(|candidate| constraint.is_none_or(|constraint| constraint.is_satisfied_by(candidate)))
            .filter(|candidate| {
                requirements
                    .iter()
                    .all(|requirement| requirement.is_satisfied_by(candidate))
            })
            .collect();
        Ok(FoundCandidates::from_vec(candidates))
    }

    fn iter_found_candidates<'p>(
        &'p self,
        name: &PackageName,
        extras: &[ExtraName],
        requirements: &[&SpecifierRequirement],
        constraint: Option<&Constraint>,
        prefers_installed: bool,
        incompatibilities: &[&Candidate],
    ) -> FoundCandidates<'p, Candidate, ResolveError> {
        let specifiers = requirements
            .iter()
            .flat_map(|requirement| requirement.specifiers.iter().cloned())
            .chain(constraint.into_iter().flat_map(|constraint| constraint.specifiers.iter().cloned()))
            .collect::<VersionSpecifiers>();
        let hashes = requirements
            .iter()
            .fold(Vec::new(), |acc, requirement| intersect_hashes(acc, &requirement.hashes));

        let installed = self
            .installed_dist(name)
            .filter(|_| !self.settings.force_reinstall(name))
            .filter(|dist| specifiers.contains(&dist.version))
            .map(|dist| self.with_extras(name, self.installed_candidate(dist), extras))
            .filter(|candidate| !incompatibilities.contains(&candidate));

        FoundCandidates::new(CandidateStream {
            factory: self,
            name: name.clone(),
            extras: extras.to_vec(),
            query: Some((specifiers, hashes)),
            index: Vec::new().into_iter().peekable(),
            installed,
            prefers_installed,
            seen: FxHashSet::default(),
            incompatibilities: incompatibilities.iter().map(|&candidate| candidate.clone()).collect(),
        })
    }

    /// Query the index, dropping yanked files where appropriate.
    fn index_candidates(
        &self,
        name: &PackageName,
        specifiers: &VersionSpecifiers,
        hashes: &[HashDigest],
    ) -> Result<Vec<IndexCandidate>, ResolveError> {
        let candidates = self.index.find_best_candidates(name, specifiers, hashes)?;
        Ok(filter_yanked(&candidates, specifiers))
    }
}

fn push_unique(candidates: &mut Vec<Candidate>, candidate: Candidate) {
    if !candidates.contains(&candidate) {
        candidates.push(candidate);
    }
}

/// Combine two sets of allowed hashes. An empty set allows anything.
fn intersect_hashes(acc: Vec<HashDigest>, other: &[HashDigest]) -> Vec<HashDigest> {
    if other.is_empty() {
        return acc;
    }
    if acc.is_empty() {
        return other.to_vec();
    }
    acc.into_iter().filter(|hash| other.contains(hash)).collect()
}

/// The candidates for a named requirement: the installed distribution, if any, merged into the
/// index's candidates, with at most one candidate per version.
///
/// The index is not queried until a candidate beyond the installed one is needed.
struct CandidateStream<'p, 'a> {
    factory: &'p Factory<'a>,
    name: PackageName,
    extras: Vec<ExtraName>,
    /// The pending index query, taken on first use.
    query: Option<(VersionSpecifiers, Vec<HashDigest>)>,
    index: Peekable<std::vec::IntoIter<IndexCandidate>>,
    installed: Option<Candidate>,
    prefers_installed: bool,
    seen: FxHashSet<Version>,
    incompatibilities: Vec<Candidate>,
}

impl Iterator for CandidateStream<'_, '_> {
    type Item = Result<Candidate, ResolveError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.prefers_installed {
                if let Some(installed) = self.installed.take() {
                    self.seen.insert(installed.version().clone());
                    return Some(Ok(installed));
                }
            }

            if let Some((specifiers, hashes)) = self.query.take() {
                match self
                    .factory
                    .index_candidates(&self.name, &specifiers, &hashes)
                {
                    Ok(candidates) => self.index = candidates.into_iter().peekable(),
                    Err(err) => return Some(Err(err)),
                }
            }

            let Some(next) = self.index.peek() else {
                // The installed version is older than anything on the index.
                let installed = self.installed.take()?;
                return self
                    .seen
                    .insert(installed.version().clone())
                    .then_some(Ok(installed));
            };

            // Otherwise, the installed version takes its place in version order.
            let installed_first = self
                .installed
                .as_ref()
                .is_some_and(|installed| installed.version() >= &next.version);
            if installed_first {
                if let Some(installed) = self.installed.take() {
                    self.seen.insert(installed.version().clone());
                    return Some(Ok(installed));
                }
            }

            let Some(IndexCandidate { version, link }) = self.index.next() else {
                continue;
            };
            if !self.seen.insert(version.clone()) {
                continue;
            }
            let candidate = self.factory.with_extras(
                &self.name,
                self.factory.index_candidate(&self.name, version, link),
                &self.extras,
            );
            if self.incompatibilities.contains(&candidate) {
                continue;
            }
            return Some(Ok(candidate));
        }
    }
}
