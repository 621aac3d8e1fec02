//! Integration tests for the resolver, run against in-memory index snapshots.

use std::cell::RefCell;
use std::str::FromStr;

use anyhow::Result;
use pep440_rs::{Version, VersionSpecifiers};
use pep508_rs::PackageName;
use serde_json::json;

use spool_configuration::{DependencyMode, Reinstall, ResolverSettings, UpgradeStrategy};
use spool_resolver::{
    Diagnostic, Manifest, PinSource, RequirementSet, ResolveError, Resolver, RootRequirement,
};
use spool_types::{
    HashDigest, IndexCandidate, IndexSnapshot, Interpreter, Link, PackageIndex,
};

/// An index that records every query before delegating to a snapshot.
struct CountingIndex<'a> {
    inner: &'a IndexSnapshot,
    queries: RefCell<Vec<String>>,
}

impl<'a> CountingIndex<'a> {
    fn new(inner: &'a IndexSnapshot) -> Self {
        Self {
            inner,
            queries: RefCell::default(),
        }
    }
}

impl PackageIndex for CountingIndex<'_> {
    fn find_best_candidates(
        &self,
        name: &PackageName,
        specifiers: &VersionSpecifiers,
        hashes: &[HashDigest],
    ) -> Result<Vec<IndexCandidate>> {
        self.queries.borrow_mut().push(name.to_string());
        self.inner.find_best_candidates(name, specifiers, hashes)
    }

    fn is_supported_wheel(&self, link: &Link) -> bool {
        self.inner.is_supported_wheel(link)
    }
}

fn python() -> Interpreter {
    Interpreter::artificial("3.12.1").unwrap()
}

fn resolve_with(
    snapshot: &IndexSnapshot,
    index: &dyn PackageIndex,
    settings: &ResolverSettings,
    interpreter: &Interpreter,
    manifest: &Manifest,
) -> Result<RequirementSet, ResolveError> {
    let resolver = Resolver::new(settings, interpreter, index, snapshot, snapshot);
    resolver.resolve(manifest, true)
}

fn resolve(
    snapshot: &IndexSnapshot,
    settings: &ResolverSettings,
    requirements: &[&str],
) -> Result<RequirementSet, ResolveError> {
    let manifest = Manifest::from_strings(requirements, &[])?;
    resolve_with(snapshot, snapshot, settings, &python(), &manifest)
}

/// The installation order, as `name==version`.
fn order(requirement_set: &RequirementSet) -> Vec<String> {
    requirement_set
        .installation_order()
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

fn name(name: &str) -> PackageName {
    PackageName::from_str(name).unwrap()
}

fn version(version: &str) -> Version {
    Version::from_str(version).unwrap()
}

fn foo_bar() -> IndexSnapshot {
    IndexSnapshot::from_json(json!({
        "packages": {
            "foo": [
                {"version": "1.0", "requires-dist": ["bar<2.0"]},
                {"version": "2.0", "requires-dist": ["bar>=2.0"]}
            ],
            "bar": [
                {"version": "1.5"},
                {"version": "2.5"}
            ]
        }
    }))
    .unwrap()
}

#[test]
fn eager_picks_newest() -> Result<()> {
    let snapshot = foo_bar();
    let settings = ResolverSettings {
        upgrade_strategy: UpgradeStrategy::Eager,
        ..ResolverSettings::default()
    };
    let requirement_set = resolve(&snapshot, &settings, &["foo"])?;

    assert_eq!(order(&requirement_set), ["bar==2.5", "foo==2.0"]);
    assert!(requirement_set
        .requirements()
        .all(|request| !request.should_reinstall));
    insta::assert_snapshot!(requirement_set.to_string().trim_end(), @r"
    bar==2.5
    foo==2.0
    ");
    Ok(())
}

#[test]
fn deterministic() -> Result<()> {
    let snapshot = foo_bar();
    let settings = ResolverSettings::default();
    let first = resolve(&snapshot, &settings, &["foo", "bar"])?;
    let second = resolve(&snapshot, &settings, &["foo", "bar"])?;
    assert_eq!(order(&first), order(&second));
    assert_eq!(
        first.packages().collect::<Vec<_>>(),
        second.packages().collect::<Vec<_>>()
    );
    Ok(())
}

#[test]
fn constraint_narrows() -> Result<()> {
    let snapshot = foo_bar();
    let manifest = Manifest::from_strings(&["foo"], &["foo<2.0"])?;
    let requirement_set = resolve_with(
        &snapshot,
        &snapshot,
        &ResolverSettings::default(),
        &python(),
        &manifest,
    )?;
    assert_eq!(order(&requirement_set), ["bar==1.5", "foo==1.0"]);
    Ok(())
}

#[test]
fn constraint_does_not_install() -> Result<()> {
    let snapshot = foo_bar();
    let manifest = Manifest::from_strings(&["bar"], &["foo<2.0"])?;
    let requirement_set = resolve_with(
        &snapshot,
        &snapshot,
        &ResolverSettings::default(),
        &python(),
        &manifest,
    )?;
    assert_eq!(order(&requirement_set), ["bar==2.5"]);
    Ok(())
}

#[test]
fn no_deps() -> Result<()> {
    let snapshot = foo_bar();
    let settings = ResolverSettings {
        dependency_mode: DependencyMode::Direct,
        ..ResolverSettings::default()
    };
    let requirement_set = resolve(&snapshot, &settings, &["foo"])?;
    assert_eq!(order(&requirement_set), ["foo==2.0"]);
    Ok(())
}

#[test]
fn backtracks_to_older_version() -> Result<()> {
    let snapshot = IndexSnapshot::from_json(json!({
        "packages": {
            "a": [
                {"version": "1.0", "requires-dist": ["c==1.0"]},
                {"version": "2.0", "requires-dist": ["c==2.0"]}
            ],
            "b": [
                {"version": "1.0", "requires-dist": ["c==1.0"]}
            ],
            "c": [
                {"version": "1.0"},
                {"version": "2.0"}
            ]
        }
    }))?;
    let requirement_set = resolve(&snapshot, &ResolverSettings::default(), &["a", "b"])?;

    let versions = requirement_set
        .packages()
        .map(|package| format!("{}=={}", package.name, package.version))
        .collect::<Vec<_>>();
    assert_eq!(versions, ["a==1.0", "b==1.0", "c==1.0"]);

    // `c` is needed by both `a` and `b`.
    let order = order(&requirement_set);
    assert_eq!(order[0], "c==1.0");
    Ok(())
}

#[test]
fn rejects_candidate_with_unsatisfiable_dependency() -> Result<()> {
    let snapshot = IndexSnapshot::from_json(json!({
        "packages": {
            "foo": [
                {"version": "1.0", "requires-dist": ["bar<2.0"]},
                {"version": "2.0", "requires-dist": ["bar>=2.0"]}
            ],
            "bar": [
                {"version": "1.0"}
            ]
        }
    }))?;
    let requirement_set = resolve(&snapshot, &ResolverSettings::default(), &["foo"])?;
    assert_eq!(order(&requirement_set), ["bar==1.0", "foo==1.0"]);
    Ok(())
}

#[test]
fn conflict() {
    let snapshot = IndexSnapshot::from_json(json!({
        "packages": {
            "a": [
                {"version": "1.0"},
                {"version": "2.0"}
            ],
            "b": [
                {"version": "1.0", "requires-dist": ["a==2.0"]}
            ]
        }
    }))
    .unwrap();
    let err = resolve(&snapshot, &ResolverSettings::default(), &["a==1.0", "b==1.0"]).unwrap_err();

    let ResolveError::NoSolution(no_solution) = &err else {
        panic!("Expected a conflict, found: {err}");
    };
    assert_eq!(no_solution.packages().into_iter().collect::<Vec<_>>(), [&name("a")]);
    insta::assert_snapshot!(err, @r"
    Cannot install a==1.0 and b==1.0 because these package versions have conflicting dependencies.

    The conflict is caused by:
        The user requested a==1.0
        b 1.0 depends on a==2.0

    To fix this you could try to:
    1. loosen the range of package versions you've specified
    2. remove package versions to allow spool to attempt to solve the dependency conflict
    ");
}

#[test]
fn extras_share_the_base_version() -> Result<()> {
    let snapshot = IndexSnapshot::from_json(json!({
        "packages": {
            "pkg": [
                {
                    "version": "1.0",
                    "requires-dist": ["dep>=1.0 ; extra == 'extra1'"],
                    "provides-extras": ["extra1"]
                }
            ],
            "dep": [
                {"version": "1.0"}
            ]
        }
    }))?;
    let requirement_set = resolve(&snapshot, &ResolverSettings::default(), &["pkg[extra1]"])?;
    assert_eq!(order(&requirement_set), ["dep==1.0", "pkg==1.0"]);

    // Without the extra, `dep` is not needed.
    let requirement_set = resolve(&snapshot, &ResolverSettings::default(), &["pkg"])?;
    assert_eq!(order(&requirement_set), ["pkg==1.0"]);

    // An extra the package doesn't provide is ignored.
    let requirement_set = resolve(&snapshot, &ResolverSettings::default(), &["pkg[missing]"])?;
    assert_eq!(order(&requirement_set), ["pkg==1.0"]);
    Ok(())
}

#[test]
fn extras_follow_the_base_version() -> Result<()> {
    let snapshot = IndexSnapshot::from_json(json!({
        "packages": {
            "pkg": [
                {
                    "version": "1.0",
                    "requires-dist": ["dep>=1.0 ; extra == 'extra1'"],
                    "provides-extras": ["extra1"]
                },
                {
                    "version": "2.0",
                    "requires-dist": ["dep>=2.0 ; extra == 'extra1'"],
                    "provides-extras": ["extra1"]
                }
            ],
            "dep": [
                {"version": "1.0"},
                {"version": "2.0"}
            ],
            "other": [
                {"version": "1.0", "requires-dist": ["pkg<2"]}
            ]
        }
    }))?;

    // The base requirement narrows the extra.
    let requirement_set = resolve(
        &snapshot,
        &ResolverSettings::default(),
        &["pkg[extra1]", "pkg<2"],
    )?;
    assert_eq!(order(&requirement_set), ["dep==2.0", "pkg==1.0"]);

    // A dependency narrows the base after the extra was pinned to the newest version.
    let requirement_set = resolve(
        &snapshot,
        &ResolverSettings::default(),
        &["pkg[extra1]", "other"],
    )?;
    assert_eq!(
        requirement_set.get(&name("pkg")).map(|package| &package.version),
        Some(&version("1.0"))
    );
    assert!(requirement_set.get(&name("dep")).is_some());
    assert!(requirement_set.get(&name("other")).is_some());
    assert_eq!(requirement_set.requirements().count(), 3);
    Ok(())
}

#[test]
fn extras_conflict() {
    let snapshot = IndexSnapshot::from_json(json!({
        "packages": {
            "pkg": [
                {
                    "version": "1.0",
                    "requires-dist": ["dep>=1.0 ; extra == 'extra1'"],
                    "provides-extras": ["extra1"]
                }
            ],
            "dep": [
                {"version": "0.9"}
            ]
        }
    }))
    .unwrap();
    let err = resolve(&snapshot, &ResolverSettings::default(), &["pkg[extra1]==1.0"]).unwrap_err();

    let ResolveError::NoMatchingDistribution(no_match) = &err else {
        panic!("Expected a missing distribution, found: {err}");
    };
    assert_eq!(no_match.package(), Some(&name("dep")));
    assert_eq!(no_match.versions(), [version("0.9")]);
    insta::assert_snapshot!(err, @r"
    Could not find a version that satisfies the requirement dep>=1.0 (from pkg[extra1]) (from versions: 0.9)
    No matching distribution found for dep>=1.0
    ");
}

#[test]
fn missing_package() {
    let snapshot = IndexSnapshot::default();
    let err = resolve(&snapshot, &ResolverSettings::default(), &["foo"]).unwrap_err();
    insta::assert_snapshot!(err, @r"
    Could not find a version that satisfies the requirement foo (from versions: none)
    No matching distribution found for foo
    ");
}

/// An index that can answer narrowed queries but fails to list every version.
struct PartialIndex<'a>(&'a IndexSnapshot);

impl PackageIndex for PartialIndex<'_> {
    fn find_best_candidates(
        &self,
        name: &PackageName,
        specifiers: &VersionSpecifiers,
        hashes: &[HashDigest],
    ) -> Result<Vec<IndexCandidate>> {
        if specifiers.is_empty() {
            anyhow::bail!("Listing every version of {name} is not supported");
        }
        self.0.find_best_candidates(name, specifiers, hashes)
    }
}

#[test]
fn missing_version_listing_failure() -> Result<()> {
    let snapshot = foo_bar();
    let index = PartialIndex(&snapshot);
    let manifest = Manifest::from_strings(&["foo>=3"], &[])?;
    let err = resolve_with(
        &snapshot,
        &index,
        &ResolverSettings::default(),
        &python(),
        &manifest,
    )
    .unwrap_err();
    insta::assert_snapshot!(err, @r"
    Could not find a version that satisfies the requirement foo>=3 (from versions: none)
    No matching distribution found for foo>=3
    ");
    Ok(())
}

#[test]
fn only_if_needed_keeps_installed() -> Result<()> {
    let snapshot = foo_bar().with_installed([spool_types::InstalledDist {
        name: name("foo"),
        version: version("1.0"),
        requires_dist: Vec::new(),
        provides_extras: Vec::new(),
        direct_url: None,
        editable: false,
    }]);
    let index = CountingIndex::new(&snapshot);
    let settings = ResolverSettings {
        upgrade_strategy: UpgradeStrategy::OnlyIfNeeded,
        ..ResolverSettings::default()
    };
    let manifest = Manifest::from_strings(&["foo"], &[])?;
    let requirement_set = resolve_with(&snapshot, &index, &settings, &python(), &manifest)?;

    assert!(requirement_set.is_empty());
    assert_eq!(
        requirement_set.get(&name("foo")).map(|package| &package.source),
        Some(&PinSource::Installed)
    );
    assert!(index.queries.borrow().is_empty());
    Ok(())
}

#[test]
fn eager_upgrades_installed() -> Result<()> {
    let snapshot = foo_bar().with_installed([spool_types::InstalledDist {
        name: name("bar"),
        version: version("1.5"),
        requires_dist: Vec::new(),
        provides_extras: Vec::new(),
        direct_url: None,
        editable: false,
    }]);
    let settings = ResolverSettings {
        upgrade_strategy: UpgradeStrategy::Eager,
        ..ResolverSettings::default()
    };
    let requirement_set = resolve(&snapshot, &settings, &["bar"])?;

    let requests = requirement_set.installation_order();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].version, version("2.5"));
    assert!(requests[0].should_reinstall);
    Ok(())
}

#[test]
fn satisfied_environment_is_idempotent() -> Result<()> {
    let installed = [
        spool_types::InstalledDist {
            name: name("foo"),
            version: version("1.0"),
            requires_dist: vec![pep508_rs::Requirement::from_str("bar<2.0").unwrap()],
            provides_extras: Vec::new(),
            direct_url: None,
            editable: false,
        },
        spool_types::InstalledDist {
            name: name("bar"),
            version: version("1.5"),
            requires_dist: Vec::new(),
            provides_extras: Vec::new(),
            direct_url: None,
            editable: false,
        },
    ];
    let snapshot = foo_bar().with_installed(installed);
    let requirement_set = resolve(&snapshot, &ResolverSettings::default(), &["foo"])?;
    assert!(requirement_set.installation_order().is_empty());
    assert_eq!(requirement_set.packages().count(), 2);
    Ok(())
}

#[test]
fn reinstall_requested() -> Result<()> {
    let snapshot = foo_bar().with_installed([spool_types::InstalledDist {
        name: name("bar"),
        version: version("2.5"),
        requires_dist: Vec::new(),
        provides_extras: Vec::new(),
        direct_url: None,
        editable: false,
    }]);

    // Already satisfied.
    let requirement_set = resolve(&snapshot, &ResolverSettings::default(), &["bar"])?;
    assert!(requirement_set.is_empty());

    // Forced.
    let settings = ResolverSettings {
        reinstall: Reinstall::Packages(vec![name("bar")]),
        ..ResolverSettings::default()
    };
    let requirement_set = resolve(&snapshot, &settings, &["bar"])?;
    let requests = requirement_set.installation_order();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].version, version("2.5"));
    assert!(requests[0].should_reinstall);

    // Ignoring the environment installs without replacing anything.
    let settings = ResolverSettings {
        ignore_installed: true,
        ..ResolverSettings::default()
    };
    let requirement_set = resolve(&snapshot, &settings, &["bar"])?;
    let requests = requirement_set.installation_order();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].should_reinstall);
    Ok(())
}

#[test]
fn yanked() -> Result<()> {
    let snapshot = IndexSnapshot::from_json(json!({
        "packages": {
            "foo": [
                {"version": "1.0"},
                {"version": "2.0", "yanked": "broken metadata"}
            ],
            "bar": [
                {"version": "1.0", "yanked": true}
            ]
        }
    }))?;

    // Yanked releases are skipped when anything else matches.
    let requirement_set = resolve(&snapshot, &ResolverSettings::default(), &["foo"])?;
    assert_eq!(order(&requirement_set), ["foo==1.0"]);
    assert!(requirement_set.diagnostics().is_empty());

    // A pin on a yanked release is honored, with a diagnostic.
    let requirement_set = resolve(&snapshot, &ResolverSettings::default(), &["bar==1.0"])?;
    assert_eq!(order(&requirement_set), ["bar==1.0"]);
    let [Diagnostic::YankedVersion { name: yanked, reason, .. }] = requirement_set.diagnostics()
    else {
        panic!("Expected a single diagnostic");
    };
    assert_eq!(*yanked, name("bar"));
    assert_eq!(*reason, None);

    // A range never selects a yanked release.
    let err = resolve(&snapshot, &ResolverSettings::default(), &["bar>=1.0"]).unwrap_err();
    insta::assert_snapshot!(err, @r"
    Could not find a version that satisfies the requirement bar>=1.0 (from versions: none)
    Ignored the following yanked versions: 1.0
    No matching distribution found for bar>=1.0
    ");
    Ok(())
}

#[test]
fn requires_python() -> Result<()> {
    let snapshot = IndexSnapshot::from_json(json!({
        "packages": {
            "foo": [
                {"version": "1.0", "requires-python": ">=3.10"}
            ]
        }
    }))?;
    let interpreter = Interpreter::artificial("3.8.0")?;
    let manifest = Manifest::from_strings(&["foo"], &[])?;

    let err = resolve_with(
        &snapshot,
        &snapshot,
        &ResolverSettings::default(),
        &interpreter,
        &manifest,
    )
    .unwrap_err();
    insta::assert_snapshot!(err, @"Package 'foo' requires a different Python: 3.8.0 not in '>=3.10'");

    let settings = ResolverSettings {
        ignore_requires_python: true,
        ..ResolverSettings::default()
    };
    let requirement_set = resolve_with(&snapshot, &snapshot, &settings, &interpreter, &manifest)?;
    assert_eq!(order(&requirement_set), ["foo==1.0"]);
    Ok(())
}

#[test]
fn cycle() -> Result<()> {
    let snapshot = IndexSnapshot::from_json(json!({
        "packages": {
            "a": [
                {"version": "1.0", "requires-dist": ["b"]}
            ],
            "b": [
                {"version": "1.0", "requires-dist": ["a"]}
            ]
        }
    }))?;
    let requirement_set = resolve(&snapshot, &ResolverSettings::default(), &["a"])?;
    assert_eq!(order(&requirement_set), ["b==1.0", "a==1.0"]);
    Ok(())
}

#[test]
fn install_order_is_topological() -> Result<()> {
    let snapshot = IndexSnapshot::from_json(json!({
        "packages": {
            "app": [
                {"version": "1.0", "requires-dist": ["web", "db"]}
            ],
            "web": [
                {"version": "1.0", "requires-dist": ["util"]}
            ],
            "db": [
                {"version": "1.0", "requires-dist": ["util"]}
            ],
            "util": [
                {"version": "1.0"}
            ]
        }
    }))?;
    let requirement_set = resolve(&snapshot, &ResolverSettings::default(), &["app"])?;
    assert_eq!(
        order(&requirement_set),
        ["util==1.0", "db==1.0", "web==1.0", "app==1.0"]
    );
    Ok(())
}

#[test]
fn hashes() -> Result<()> {
    let snapshot = IndexSnapshot::from_json(json!({
        "packages": {
            "foo": [
                {"version": "1.0", "hashes": ["sha256:bbbb"]},
                {"version": "2.0", "hashes": ["sha256:aaaa"]}
            ]
        }
    }))?;
    let root = RootRequirement::from_str("foo")?
        .with_hashes([HashDigest::from_str("sha256:bbbb")?]);
    let manifest = Manifest::simple(vec![root]);
    let requirement_set = resolve_with(
        &snapshot,
        &snapshot,
        &ResolverSettings::default(),
        &python(),
        &manifest,
    )?;
    let requests = requirement_set.installation_order();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].version, version("1.0"));
    assert_eq!(requests[0].hashes, [HashDigest::from_str("sha256:bbbb")?]);
    Ok(())
}

#[test]
fn direct_url() -> Result<()> {
    let snapshot = IndexSnapshot::from_json(json!({
        "packages": {
            "bar": [
                {"version": "1.5"},
                {"version": "2.5"}
            ]
        },
        "direct": [
            {
                "url": "https://example.com/baz-0.1.tar.gz",
                "name": "baz",
                "version": "0.1",
                "requires-dist": ["bar<2.0"]
            }
        ]
    }))?;
    let requirement_set = resolve(
        &snapshot,
        &ResolverSettings::default(),
        &["baz @ https://example.com/baz-0.1.tar.gz"],
    )?;
    assert_eq!(order(&requirement_set), ["bar==1.5", "baz==0.1"]);
    assert!(matches!(
        requirement_set.get(&name("baz")).map(|package| &package.source),
        Some(PinSource::Direct(_))
    ));
    Ok(())
}

#[test]
fn unsupported_wheel() -> Result<()> {
    let url = "https://example.com/qux-1.0-cp27-none-win32.whl";
    let snapshot = IndexSnapshot::from_json(json!({
        "direct": [
            {"url": url, "name": "qux", "version": "1.0"}
        ],
        "unsupported-wheels": [url]
    }))?;
    let requirement = format!("qux @ {url}");
    let err = resolve(&snapshot, &ResolverSettings::default(), &[requirement.as_str()]).unwrap_err();
    insta::assert_snapshot!(err, @"qux-1.0-cp27-none-win32.whl is not a supported wheel on this platform");

    let manifest = Manifest::from_strings(&[requirement.as_str()], &[])?;
    let settings = ResolverSettings::default();
    let interpreter = python();
    let resolver = Resolver::new(&settings, &interpreter, &snapshot, &snapshot, &snapshot);
    let requirement_set = resolver.resolve(&manifest, false)?;
    assert_eq!(order(&requirement_set), ["qux==1.0"]);
    Ok(())
}

#[test]
fn markers_skip_root_requirements() -> Result<()> {
    let snapshot = foo_bar();
    let requirement_set = resolve(
        &snapshot,
        &ResolverSettings::default(),
        &["bar", "foo ; python_version < '3.0'"],
    )?;
    assert_eq!(order(&requirement_set), ["bar==2.5"]);
    Ok(())
}

#[test]
fn too_deep() {
    let snapshot = foo_bar();
    let settings = ResolverSettings {
        max_rounds: 1,
        ..ResolverSettings::default()
    };
    let err = resolve(&snapshot, &settings, &["foo"]).unwrap_err();

    let ResolveError::TooDeep(too_deep) = &err else {
        panic!("Expected to run out of rounds, found: {err}");
    };
    assert_eq!(too_deep.rounds(), 1);
    assert_eq!(too_deep.causes()[0].package, Some(name("bar")));
    insta::assert_snapshot!(err, @r"
    Resolution did not complete within 1 rounds

    The resolver was still working on:
        foo 2.0 depends on bar>=2.0
    ");
}

#[test]
fn too_deep_prefers_requires_python() {
    let snapshot = IndexSnapshot::from_json(json!({
        "packages": {
            "foo": [
                {"version": "2.0", "requires-dist": ["bar"]},
                {"version": "1.0"}
            ],
            "bar": [
                {"version": "1.0", "requires-python": ">=3.13"}
            ]
        }
    }))
    .unwrap();
    let settings = ResolverSettings {
        max_rounds: 2,
        ..ResolverSettings::default()
    };
    let err = resolve(&snapshot, &settings, &["foo"]).unwrap_err();
    insta::assert_snapshot!(err, @"Package 'bar' requires a different Python: 3.12.1 not in '>=3.13'");
}
