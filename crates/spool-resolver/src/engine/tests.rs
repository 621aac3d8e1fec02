use std::fmt::{Display, Formatter};

use super::*;

/// A requirement on an inclusive range of versions.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Req {
    name: &'static str,
    min: u32,
    max: u32,
}

fn req(name: &'static str, min: u32, max: u32) -> Req {
    Req { name, min, max }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cand {
    name: &'static str,
    version: u32,
}

impl Display for Cand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}=={}", self.name, self.version)
    }
}

/// Packages with their versions (newest first) and the dependencies of each version.
#[derive(Default)]
struct Toy {
    packages: Vec<(&'static str, u32, Vec<Req>)>,
}

impl Toy {
    fn with(mut self, name: &'static str, version: u32, dependencies: Vec<Req>) -> Self {
        self.packages.push((name, version, dependencies));
        self.packages
            .sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));
        self
    }
}

impl Provider for Toy {
    type Identifier = String;
    type Requirement = Req;
    type Candidate = Cand;
    type Preference = String;
    type Error = String;

    fn identify_requirement(&self, requirement: &Req) -> String {
        requirement.name.to_string()
    }

    fn identify_candidate(&self, candidate: &Cand) -> String {
        candidate.name.to_string()
    }

    fn get_preference(
        &self,
        identifier: &String,
        _criterion: &Criterion<'_, Self>,
        _backtrack_causes: &[Information<Self>],
    ) -> String {
        identifier.clone()
    }

    fn find_matches<'p>(
        &'p self,
        identifier: &String,
        context: &MatchContext<'_, 'p, Self>,
    ) -> Result<FoundCandidates<'p, Cand, String>, String> {
        let requirements = context.requirements(identifier).collect::<Vec<_>>();
        let incompatibilities = context.incompatibilities(identifier).collect::<Vec<_>>();
        let candidates = self
            .packages
            .iter()
            .filter(|(name, ..)| *name == identifier.as_str())
            .map(|(name, version, _)| Cand {
                name: *name,
                version: *version,
            })
            .filter(|candidate| {
                requirements
                    .iter()
                    .all(|requirement| self.is_satisfied_by(requirement, candidate))
            })
            .filter(|candidate| !incompatibilities.contains(&candidate))
            .collect();
        Ok(FoundCandidates::from_vec(candidates))
    }

    fn is_satisfied_by(&self, requirement: &Req, candidate: &Cand) -> bool {
        requirement.name == candidate.name
            && (requirement.min..=requirement.max).contains(&candidate.version)
    }

    fn get_dependencies(&self, candidate: &Cand) -> Result<Vec<Req>, String> {
        self.packages
            .iter()
            .find(|(name, version, _)| *name == candidate.name && *version == candidate.version)
            .map(|(.., dependencies)| dependencies.clone())
            .ok_or_else(|| format!("unknown candidate: {candidate}"))
    }
}

fn pins(resolution: &Resolution<'_, Toy>) -> Vec<String> {
    let mut pins = resolution
        .mapping
        .values()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    pins.sort();
    pins
}

/// Every pin satisfies every requirement recorded against its identifier.
fn assert_sound(toy: &Toy, resolution: &Resolution<'_, Toy>) {
    for (identifier, candidate) in &resolution.mapping {
        let criterion = &resolution.criteria[identifier];
        for requirement in criterion.iter_requirement() {
            assert!(
                toy.is_satisfied_by(requirement, candidate),
                "{candidate} does not satisfy {requirement:?}"
            );
        }
    }
}

#[test]
fn newest_versions() {
    let toy = Toy::default()
        .with("a", 1, vec![req("b", 1, 9)])
        .with("a", 2, vec![req("b", 2, 9)])
        .with("b", 1, vec![])
        .with("b", 2, vec![])
        .with("b", 3, vec![]);

    let resolution = resolve(&toy, [req("a", 0, 9)], 100).unwrap();
    assert_eq!(pins(&resolution), ["a==2", "b==3"]);
    assert_sound(&toy, &resolution);
}

#[test]
fn backjumps_to_the_conflicting_pin() {
    // `a` is pinned first (by name), and its newest version conflicts with `b` over `c`.
    let toy = Toy::default()
        .with("a", 2, vec![req("c", 2, 2)])
        .with("a", 1, vec![req("c", 1, 1)])
        .with("b", 1, vec![req("c", 1, 1)])
        .with("c", 1, vec![])
        .with("c", 2, vec![]);

    let resolution = resolve(&toy, [req("a", 0, 9), req("b", 0, 9)], 100).unwrap();
    assert_eq!(pins(&resolution), ["a==1", "b==1", "c==1"]);
    assert_sound(&toy, &resolution);
}

#[test]
fn skips_unrelated_pins_while_backjumping() {
    // `aa` is pinned between `a` and the conflict, but has nothing to do with it.
    let toy = Toy::default()
        .with("a", 2, vec![req("c", 2, 2)])
        .with("a", 1, vec![req("c", 1, 1)])
        .with("aa", 1, vec![])
        .with("b", 1, vec![req("c", 1, 1)])
        .with("c", 1, vec![])
        .with("c", 2, vec![]);

    let resolution = resolve(
        &toy,
        [req("a", 0, 9), req("aa", 0, 9), req("b", 0, 9)],
        100,
    )
    .unwrap();
    assert_eq!(pins(&resolution), ["a==1", "aa==1", "b==1", "c==1"]);
    assert_sound(&toy, &resolution);
}

#[test]
fn root_conflict() {
    let toy = Toy::default().with("a", 1, vec![]);

    let Err(EngineError::Impossible(causes)) = resolve(&toy, [req("a", 2, 9)], 100) else {
        panic!("expected a conflict");
    };
    assert_eq!(causes.len(), 1);
    assert_eq!(causes[0].requirement, req("a", 2, 9));
    assert!(causes[0].parent.is_none());
}

#[test]
fn impossible_reports_every_cause() {
    let toy = Toy::default()
        .with("a", 1, vec![])
        .with("a", 2, vec![])
        .with("b", 1, vec![req("a", 2, 2)]);

    let Err(EngineError::Impossible(causes)) =
        resolve(&toy, [req("a", 1, 1), req("b", 1, 1)], 100)
    else {
        panic!("expected a conflict");
    };
    let mut described = causes
        .iter()
        .map(|cause| {
            format!(
                "{:?} from {}",
                cause.requirement,
                cause
                    .parent
                    .as_ref()
                    .map_or_else(|| "root".to_string(), ToString::to_string)
            )
        })
        .collect::<Vec<_>>();
    described.sort();
    assert_eq!(
        described,
        [
            r#"Req { name: "a", min: 1, max: 1 } from root"#,
            r#"Req { name: "a", min: 2, max: 2 } from b==1"#,
        ]
    );
}

#[test]
fn cycles_resolve() {
    let toy = Toy::default()
        .with("a", 1, vec![req("b", 1, 1)])
        .with("b", 1, vec![req("a", 1, 1)]);

    let resolution = resolve(&toy, [req("a", 1, 1)], 100).unwrap();
    assert_eq!(pins(&resolution), ["a==1", "b==1"]);
    assert_sound(&toy, &resolution);
    // root -> a, a -> b, b -> a
    assert_eq!(resolution.graph.node_count(), 3);
    assert_eq!(resolution.graph.edge_count(), 3);
}

#[test]
fn round_limit() {
    let toy = Toy::default()
        .with("a", 1, vec![req("b", 1, 1)])
        .with("b", 1, vec![]);

    // `a` is pinned in the only round; `b` is still waiting.
    let Err(EngineError::TooDeep(1, causes)) = resolve(&toy, [req("a", 1, 1)], 1) else {
        panic!("expected to run out of rounds");
    };
    assert_eq!(causes.len(), 1);
    assert_eq!(causes[0].requirement, req("b", 1, 1));
    assert_eq!(
        causes[0].parent,
        Some(Cand {
            name: "a",
            version: 1
        })
    );
}

#[test]
fn missing_dependency() {
    let toy = Toy::default().with("b", 1, vec![req("a", 1, 1)]);

    let Err(EngineError::Impossible(causes)) = resolve(&toy, [req("b", 1, 1)], 100) else {
        panic!("expected a conflict");
    };
    assert_eq!(causes.len(), 1);
    assert_eq!(causes[0].requirement, req("a", 1, 1));
    assert_eq!(
        causes[0].parent,
        Some(Cand {
            name: "b",
            version: 1
        })
    );
}
