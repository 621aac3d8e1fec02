use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use itertools::Itertools;
use pep440_rs::Version;
use pep508_rs::PackageName;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use spool_configuration::ResolverSettings;
use spool_types::{HashDigest, Link};

use crate::candidate::{Candidate, Origin};
use crate::engine::{GraphNode, Resolution};
use crate::error::ResolveError;
use crate::factory::Factory;
use crate::identifier::Identifier;
use crate::provider::SpoolProvider;
use crate::resolution::install_order::topological_weights;
use crate::resolution::reinstall::InstallAction;

mod install_order;
mod reinstall;

/// A distribution that needs to be installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub name: PackageName,
    pub version: Version,
    pub link: Link,
    pub editable: bool,
    /// Whether an installed distribution of the package must be removed first.
    pub should_reinstall: bool,
    pub hashes: Vec<HashDigest>,
}

impl Display for InstallRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}=={}", self.name, self.version)
    }
}

/// Where a pinned package comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinSource {
    /// The installed distribution satisfies the requirements.
    Installed,
    /// A file found on the index.
    Index(Link),
    /// A direct URL given in a requirement.
    Direct(Link),
}

/// A package pinned by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub name: PackageName,
    pub version: Version,
    pub source: PinSource,
}

/// A non-fatal problem found while assembling the resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A yanked release was selected.
    YankedVersion {
        name: PackageName,
        version: Version,
        link: Link,
        reason: Option<String>,
    },
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::YankedVersion {
                name,
                version,
                link,
                reason,
            } => {
                write!(
                    f,
                    "The candidate selected for download or install is a yanked version: '{name}' candidate (version {version} at {link})"
                )?;
                write!(
                    f,
                    "\nReason for being yanked: {}",
                    reason.as_deref().unwrap_or("<none given>")
                )
            }
        }
    }
}

/// The outcome of a successful resolution.
#[derive(Debug)]
pub struct RequirementSet {
    /// Every pinned package, keyed by name.
    packages: BTreeMap<PackageName, ResolvedPackage>,
    /// The packages that need to be installed, keyed by name.
    requirements: BTreeMap<PackageName, InstallRequest>,
    /// The dependency graph over the resolved identifiers.
    graph: DiGraph<GraphNode<Identifier>, ()>,
    root: NodeIndex,
    diagnostics: Vec<Diagnostic>,
}

impl RequirementSet {
    /// Assemble the requirement set from the pins of a successful resolution.
    pub(crate) fn from_resolution(
        resolution: Resolution<'_, SpoolProvider<'_>>,
        factory: &Factory<'_>,
        settings: &ResolverSettings,
        check_supported_wheels: bool,
    ) -> Result<Self, ResolveError> {
        let mut packages = BTreeMap::new();
        let mut requirements = BTreeMap::new();
        let mut diagnostics = Vec::new();

        let pins = resolution
            .mapping
            .iter()
            .sorted_by(|(a, _), (b, _)| a.cmp(b));
        for (identifier, candidate) in pins {
            let link = match candidate {
                // The base package is pinned under its own identifier.
                Candidate::Extras(_) | Candidate::Python(_) => continue,
                Candidate::Installed(installed) => {
                    debug!("Requirement already satisfied: {}", installed.dist());
                    packages.insert(
                        installed.dist().name.clone(),
                        ResolvedPackage {
                            name: installed.dist().name.clone(),
                            version: installed.dist().version.clone(),
                            source: PinSource::Installed,
                        },
                    );
                    continue;
                }
                Candidate::Link(link) => link,
            };

            let source = match link.origin() {
                Origin::Index => PinSource::Index(link.link().clone()),
                Origin::Direct => PinSource::Direct(link.link().clone()),
            };
            packages.insert(
                link.name.clone(),
                ResolvedPackage {
                    name: link.name.clone(),
                    version: link.version.clone(),
                    source,
                },
            );

            if check_supported_wheels
                && link.origin() == Origin::Direct
                && link.link().is_wheel()
                && !factory.index().inner().is_supported_wheel(link.link())
            {
                let filename = link
                    .link()
                    .filename()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| link.link().to_string());
                return Err(ResolveError::UnsupportedWheel(filename));
            }

            let should_reinstall = match reinstall::decide(
                link,
                factory.installed_dist(&link.name),
                settings,
            ) {
                InstallAction::Skip => continue,
                InstallAction::Install => false,
                InstallAction::Reinstall => true,
            };

            if let Some(yanked) = link.link().yanked().filter(|yanked| yanked.is_yanked()) {
                let diagnostic = Diagnostic::YankedVersion {
                    name: link.name.clone(),
                    version: link.version.clone(),
                    link: link.link().clone(),
                    reason: yanked.reason().map(ToString::to_string),
                };
                warn!("{diagnostic}");
                diagnostics.push(diagnostic);
            }

            debug!("Adding {identifier} to the installation: {}", link.link());
            requirements.insert(
                link.name.clone(),
                InstallRequest {
                    name: link.name.clone(),
                    version: link.version.clone(),
                    link: link.link().clone(),
                    editable: link.link().is_editable(),
                    should_reinstall,
                    hashes: link.link().hashes().to_vec(),
                },
            );
        }

        Ok(Self {
            packages,
            requirements,
            graph: resolution.graph,
            root: resolution.root,
            diagnostics,
        })
    }

    /// Return the pinned package with the given name, if any.
    pub fn get(&self, name: &PackageName) -> Option<&ResolvedPackage> {
        self.packages.get(name)
    }

    /// Iterate over every pinned package, in name order.
    pub fn packages(&self) -> impl Iterator<Item = &ResolvedPackage> {
        self.packages.values()
    }

    /// Iterate over the packages that need to be installed, in name order.
    pub fn requirements(&self) -> impl Iterator<Item = &InstallRequest> {
        self.requirements.values()
    }

    /// Return `true` if nothing needs to be installed.
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The dependency graph, with edges from each parent to the identifiers it requires.
    pub fn graph(&self) -> &DiGraph<GraphNode<Identifier>, ()> {
        &self.graph
    }

    /// Order the packages to install such that dependencies come before their dependents.
    ///
    /// Packages in a dependency cycle are ordered by their distance from the root requirements.
    /// Ties are broken by name.
    pub fn installation_order(&self) -> Vec<&InstallRequest> {
        let keys = self
            .graph
            .node_indices()
            .filter(|&node| match &self.graph[node] {
                GraphNode::Identifier(Identifier::Package { name, extras }) => {
                    extras.is_empty() && self.requirements.contains_key(name)
                }
                _ => false,
            })
            .collect::<FxHashSet<_>>();
        let weights = topological_weights(&self.graph, self.root, &keys)
            .into_iter()
            .filter_map(|(node, weight)| match &self.graph[node] {
                GraphNode::Identifier(identifier) => Some((identifier.name()?.clone(), weight)),
                GraphNode::Root => None,
            })
            .collect::<BTreeMap<_, _>>();

        self.requirements
            .values()
            .sorted_by(|a, b| {
                let a_weight = weights.get(&a.name).copied().unwrap_or_default();
                let b_weight = weights.get(&b.name).copied().unwrap_or_default();
                b_weight.cmp(&a_weight).then_with(|| a.name.cmp(&b.name))
            })
            .collect()
    }
}

impl Display for RequirementSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for package in self.packages.values() {
            match &package.source {
                PinSource::Direct(link) => writeln!(f, "{} @ {link}", package.name)?,
                PinSource::Index(_) | PinSource::Installed => {
                    writeln!(f, "{}=={}", package.name, package.version)?;
                }
            }
        }
        Ok(())
    }
}
