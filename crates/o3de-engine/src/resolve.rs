//! Version-constrained gem resolution.
//!
//! The resolver picks one concrete gem per name so that every root
//! requirement and every transitive `dependencies` entry is satisfied, and
//! every chosen gem accepts the target engine.
//!
//! # Algorithm
//! 1. Pop the next pending requirement (roots first, dependencies depth-first).
//! 2. A name that is already chosen must satisfy the new specifier as-is.
//! 3. Otherwise list matching candidates newest first, closer scope first.
//! 4. For each candidate, check `compatible_engines` and
//!    `engine_api_dependencies`, choose it, queue its dependencies, and
//!    recurse on the rest. A failure below backtracks to the next candidate.
//! 5. Optional roots that cannot be satisfied are dropped.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;

use o3de_manifest::{EngineManifest, GemCandidate, Requirement, Scope, Version};

/// Longest dependency chain followed before giving up.
const MAX_DEPTH: usize = 64;

/// Resolver failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No registered gem satisfies the requirement.
    #[error("no gem satisfies `{requirement}` (required by {required_by})")]
    UnsatisfiableRequirement {
        requirement: String,
        required_by: String,
    },

    /// Every candidate rejects the target engine.
    #[error("gem `{gem}` {version} is not compatible with engine {engine}: requires {constraint}")]
    IncompatibleEngine {
        gem: String,
        version: String,
        engine: String,
        constraint: String,
    },

    /// Two requirements on the same gem cannot share a version.
    #[error("conflicting versions of gem `{name}`: {chosen} was selected but {required_by} requires `{requirement}`")]
    ConflictingVersions {
        name: String,
        chosen: String,
        requirement: String,
        required_by: String,
    },

    /// The chosen gems depend on each other in a loop.
    #[error("dependency cycle detected: {cycle}")]
    CyclicDependency { cycle: String },

    /// The dependency chain grew past the depth bound.
    #[error("dependency chain is deeper than {MAX_DEPTH} levels: {chain}")]
    TooDeep { chain: String },
}

impl ResolveError {
    /// The gem name the failure is about.
    pub fn gem_name(&self) -> &str {
        match self {
            Self::UnsatisfiableRequirement { requirement, .. } => requirement
                .split(['=', '!', '<', '>', '~'])
                .next()
                .unwrap_or(requirement),
            Self::IncompatibleEngine { gem, .. } => gem,
            Self::ConflictingVersions { name, .. } => name,
            Self::CyclicDependency { cycle } => cycle.split(" -> ").next().unwrap_or(cycle),
            Self::TooDeep { chain } => chain.rsplit(" -> ").next().unwrap_or(chain),
        }
    }
}

/// The engine gems are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEngine {
    pub name: String,
    pub version: Version,
    pub api_versions: BTreeMap<String, Version>,
}

impl TargetEngine {
    pub fn new(name: &str, version: Version) -> Self {
        Self {
            name: name.to_owned(),
            version,
            api_versions: BTreeMap::new(),
        }
    }

    pub fn from_manifest(engine: &EngineManifest) -> Self {
        Self {
            name: engine.engine_name.clone(),
            version: engine.parsed_version(),
            api_versions: engine.parsed_api_versions(),
        }
    }

    /// Check a gem's engine and API constraints. `None` lists mean no restriction.
    fn accepts(&self, gem: &GemCandidate) -> Result<(), ResolveError> {
        let incompatible = |constraint: String| ResolveError::IncompatibleEngine {
            gem: gem.name.clone(),
            version: gem.version.to_string(),
            engine: format!("{} {}", self.name, self.version),
            constraint,
        };
        if let Some(engines) = gem.manifest.compatible_engines() {
            let ok = engines.is_empty()
                || engines.iter().any(|r| r.matches(&self.name, &self.version));
            if !ok {
                let listed: Vec<String> = engines.iter().map(ToString::to_string).collect();
                return Err(incompatible(listed.join(" or ")));
            }
        }
        if let Some(apis) = gem.manifest.engine_api_dependencies() {
            for api in apis {
                let ok = self
                    .api_versions
                    .get(&api.name)
                    .is_some_and(|v| api.specifier.matches(v));
                if !ok {
                    return Err(incompatible(format!("API {api}")));
                }
            }
        }
        Ok(())
    }
}

/// One root of a resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RootRequirement {
    pub requirement: Requirement,
    /// Dropped rather than failing when unsatisfiable.
    pub optional: bool,
}

impl RootRequirement {
    pub fn new(requirement: Requirement, optional: bool) -> Self {
        Self {
            requirement,
            optional,
        }
    }
}

/// A chosen gem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGem {
    pub name: String,
    pub version: Version,
    pub path: PathBuf,
    pub scope: Scope,
}

/// Result of a successful resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub gems: BTreeMap<String, ResolvedGem>,
    /// Optional roots that could not be satisfied.
    pub dropped: Vec<Requirement>,
    /// Engine/API mismatches accepted because of `force`.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
struct Pending {
    requirement: Requirement,
    optional_root: bool,
    chain: Vec<String>,
}

impl Pending {
    fn required_by(&self) -> String {
        self.chain
            .last()
            .map_or_else(|| "the project".to_owned(), |name| format!("gem `{name}`"))
    }
}

#[derive(Debug, Clone, Default)]
struct State {
    chosen: BTreeMap<String, usize>,
    dropped: Vec<Requirement>,
    warnings: Vec<String>,
}

struct Resolver<'a> {
    catalogue: &'a [GemCandidate],
    engine: &'a TargetEngine,
    force: bool,
    /// Engine verdicts already computed, keyed by (name, version).
    visited: HashMap<(String, Version), Result<(), ResolveError>>,
}

/// Resolve `roots` against `catalogue` for `engine`.
///
/// With `force`, engine and API mismatches are recorded in
/// [`Resolution::warnings`] instead of rejecting the candidate.
///
/// # Errors
/// Returns the first failure met while exhausting the candidates of a
/// mandatory root.
pub fn resolve(
    roots: &[RootRequirement],
    catalogue: &[GemCandidate],
    engine: &TargetEngine,
    force: bool,
) -> Result<Resolution, ResolveError> {
    let mut resolver = Resolver {
        catalogue,
        engine,
        force,
        visited: HashMap::new(),
    };
    let queue = roots
        .iter()
        .map(|root| Pending {
            requirement: root.requirement.clone(),
            optional_root: root.optional,
            chain: Vec::new(),
        })
        .collect();
    let state = resolver.solve(queue, State::default())?;

    let gems = state
        .chosen
        .iter()
        .filter_map(|(name, &idx)| {
            catalogue.get(idx).map(|c| {
                (
                    name.clone(),
                    ResolvedGem {
                        name: c.name.clone(),
                        version: c.version.clone(),
                        path: c.path.clone(),
                        scope: c.scope,
                    },
                )
            })
        })
        .collect();
    Ok(Resolution {
        gems,
        dropped: state.dropped,
        warnings: state.warnings,
    })
}

impl Resolver<'_> {
    /// Catalogue indices matching `req`, newest first, then closest scope.
    /// Equal version and scope keep enumeration order.
    fn candidates(&self, req: &Requirement) -> Vec<usize> {
        let mut found: Vec<usize> = self
            .catalogue
            .iter()
            .enumerate()
            .filter(|(_, c)| req.matches(&c.name, &c.version))
            .map(|(i, _)| i)
            .collect();
        found.sort_by(|&a, &b| match (self.catalogue.get(a), self.catalogue.get(b)) {
            (Some(a), Some(b)) => b.version.cmp(&a.version).then(a.scope.cmp(&b.scope)),
            _ => std::cmp::Ordering::Equal,
        });
        found
    }

    fn engine_verdict(&mut self, candidate: &GemCandidate) -> Result<(), ResolveError> {
        let engine = self.engine;
        let key = (candidate.name.clone(), candidate.version.clone());
        self.visited
            .entry(key)
            .or_insert_with(|| engine.accepts(candidate))
            .clone()
    }

    fn drop_optional(
        &mut self,
        item: Pending,
        mut state: State,
        queue: VecDeque<Pending>,
        reason: &ResolveError,
    ) -> Result<State, ResolveError> {
        tracing::warn!(requirement = %item.requirement, "dropping optional gem: {reason}");
        state.dropped.push(item.requirement);
        self.solve(queue, state)
    }

    fn solve(&mut self, mut queue: VecDeque<Pending>, state: State) -> Result<State, ResolveError> {
        let catalogue = self.catalogue;
        let Some(item) = queue.pop_front() else {
            return Ok(state);
        };
        let name = item.requirement.name.clone();

        if item.chain.contains(&name) {
            let mut cycle = item.chain.clone();
            let start = cycle.iter().position(|n| *n == name).unwrap_or(0);
            cycle.push(name);
            let cycle = cycle.get(start..).unwrap_or(cycle.as_slice()).join(" -> ");
            return Err(ResolveError::CyclicDependency { cycle });
        }
        if item.chain.len() >= MAX_DEPTH {
            let mut chain = item.chain.clone();
            chain.push(name);
            return Err(ResolveError::TooDeep {
                chain: chain.join(" -> "),
            });
        }

        if let Some(chosen) = state.chosen.get(&name).and_then(|&i| catalogue.get(i)) {
            if item.requirement.specifier.matches(&chosen.version) {
                return self.solve(queue, state);
            }
            let err = ResolveError::ConflictingVersions {
                name: name.clone(),
                chosen: chosen.version.to_string(),
                requirement: item.requirement.to_string(),
                required_by: item.required_by(),
            };
            if item.optional_root {
                return self.drop_optional(item, state, queue, &err);
            }
            return Err(err);
        }

        let candidates = self.candidates(&item.requirement);
        let mut first_err: Option<ResolveError> = None;
        for idx in candidates {
            let Some(candidate) = catalogue.get(idx) else {
                continue;
            };
            let mut next = state.clone();
            if let Err(e) = self.engine_verdict(candidate) {
                if !self.force {
                    first_err.get_or_insert(e);
                    continue;
                }
                tracing::warn!("{e}; continuing because of --force");
                next.warnings.push(e.to_string());
            }
            next.chosen.insert(name.clone(), idx);

            let mut chain = item.chain.clone();
            chain.push(name.clone());
            let mut next_queue: VecDeque<Pending> = candidate
                .manifest
                .dependencies()
                .into_iter()
                .map(|requirement| Pending {
                    requirement,
                    optional_root: false,
                    chain: chain.clone(),
                })
                .collect();
            next_queue.extend(queue.iter().cloned());

            match self.solve(next_queue, next) {
                Ok(done) => return Ok(done),
                Err(e) => {
                    tracing::debug!(gem = %name, version = %candidate.version, "backtracking: {e}");
                    first_err.get_or_insert(e);
                }
            }
        }

        let err = first_err.unwrap_or_else(|| ResolveError::UnsatisfiableRequirement {
            requirement: item.requirement.to_string(),
            required_by: item.required_by(),
        });
        if item.optional_root {
            return self.drop_optional(item, state, queue, &err);
        }
        Err(err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use o3de_manifest::GemManifest;

    fn gem(name: &str, version: &str, deps: &[&str], engines: Option<&[&str]>) -> GemCandidate {
        gem_in(name, version, deps, engines, Scope::Engine)
    }

    fn gem_in(
        name: &str,
        version: &str,
        deps: &[&str],
        engines: Option<&[&str]>,
        scope: Scope,
    ) -> GemCandidate {
        let manifest: GemManifest = serde_json::from_value(serde_json::json!({
            "gem_name": name,
            "version": version,
            "dependencies": deps,
        }))
        .unwrap();
        let manifest = GemManifest {
            compatible_engines: engines.map(|e| e.iter().map(|s| (*s).to_owned()).collect()),
            ..manifest
        };
        GemCandidate {
            name: name.to_owned(),
            version: Version::parse(version).unwrap(),
            path: PathBuf::from(format!("/gems/{}/{name}-{version}", scope.as_str())),
            scope,
            manifest,
        }
    }

    fn engine(version: &str) -> TargetEngine {
        TargetEngine::new("o3de-test", Version::parse(version).unwrap())
    }

    fn root(text: &str) -> RootRequirement {
        RootRequirement::new(text.parse().unwrap(), false)
    }

    #[test]
    fn picks_newest_matching_version() {
        let catalogue = vec![
            gem("GemA", "1.0.0", &[], None),
            gem("GemA", "2.0.0", &[], None),
            gem("GemA", "3.0.0", &[], None),
        ];
        let res = resolve(&[root("GemA<3.0.0")], &catalogue, &engine("1.0.0"), false).unwrap();
        assert_eq!(res.gems.get("GemA").unwrap().version.to_string(), "2.0.0");
    }

    #[test]
    fn closer_scope_wins_version_tie() {
        let catalogue = vec![
            gem_in("GemA", "1.0.0", &[], None, Scope::User),
            gem_in("GemA", "1.0.0", &[], None, Scope::Engine),
            gem_in("GemA", "1.0.0", &[], None, Scope::Project),
        ];
        let res = resolve(&[root("GemA")], &catalogue, &engine("1.0.0"), false).unwrap();
        assert_eq!(res.gems.get("GemA").unwrap().scope, Scope::Project);
    }

    #[test]
    fn satisfied_engine_specifier() {
        let catalogue = vec![gem("GemA", "1.0.0", &[], Some(&["o3de-test>=1.0.0"]))];
        let res = resolve(&[root("GemA==1.0.0")], &catalogue, &engine("1.0.0"), false).unwrap();
        assert!(res.warnings.is_empty());
    }

    #[test]
    fn incompatible_engine_fails_without_force() {
        let catalogue = vec![gem("GemA", "1.0.0", &[], Some(&["o3de-test>=1.0.0"]))];
        let err = resolve(&[root("GemA==1.0.0")], &catalogue, &engine("0.9.0"), false).unwrap_err();
        assert!(matches!(err, ResolveError::IncompatibleEngine { .. }), "got {err:?}");
        assert_eq!(err.gem_name(), "GemA");
    }

    #[test]
    fn force_downgrades_engine_mismatch() {
        let catalogue = vec![gem("GemA", "1.0.0", &[], Some(&["o3de-test>=1.0.0"]))];
        let res = resolve(&[root("GemA==1.0.0")], &catalogue, &engine("0.9.0"), true).unwrap();
        assert_eq!(res.warnings.len(), 1);
        assert!(res.gems.contains_key("GemA"));
    }

    #[test]
    fn empty_compatible_engines_means_any() {
        let catalogue = vec![gem("GemA", "1.0.0", &[], Some(&[]))];
        assert!(resolve(&[root("GemA")], &catalogue, &engine("0.1.0"), false).is_ok());
    }

    #[test]
    fn transitive_conflict_names_gem() {
        let catalogue = vec![
            gem("GemA", "1.0.0", &["GemB==3.0.0", "GemC==2.0.0"], None),
            gem("GemB", "3.0.0", &["GemC==1.0.0"], None),
            gem("GemC", "1.0.0", &[], None),
            gem("GemC", "2.0.0", &[], None),
        ];
        let err = resolve(&[root("GemA")], &catalogue, &engine("1.0.0"), false).unwrap_err();
        assert!(matches!(err, ResolveError::ConflictingVersions { .. }), "got {err:?}");
        assert_eq!(err.gem_name(), "GemC");
        assert!(err.to_string().contains("GemC"));
    }

    #[test]
    fn backtracks_to_older_version() {
        // Newest GemB needs GemC 2, but GemA pins GemC 1; GemB 1.0 works.
        let catalogue = vec![
            gem("GemA", "1.0.0", &["GemB", "GemC==1.0.0"], None),
            gem("GemB", "2.0.0", &["GemC>=2.0.0"], None),
            gem("GemB", "1.0.0", &["GemC>=1.0.0"], None),
            gem("GemC", "1.0.0", &[], None),
            gem("GemC", "2.0.0", &[], None),
        ];
        let res = resolve(&[root("GemA")], &catalogue, &engine("1.0.0"), false).unwrap();
        assert_eq!(res.gems.get("GemB").unwrap().version.to_string(), "1.0.0");
        assert_eq!(res.gems.get("GemC").unwrap().version.to_string(), "1.0.0");
    }

    #[test]
    fn detects_cycles() {
        let catalogue = vec![
            gem("GemA", "1.0.0", &["GemB"], None),
            gem("GemB", "1.0.0", &["GemA"], None),
        ];
        let err = resolve(&[root("GemA")], &catalogue, &engine("1.0.0"), false).unwrap_err();
        match err {
            ResolveError::CyclicDependency { cycle } => assert_eq!(cycle, "GemA -> GemB -> GemA"),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let catalogue = vec![
            gem("GemA", "1.0.0", &["GemB", "GemC"], None),
            gem("GemB", "1.0.0", &["GemC"], None),
            gem("GemC", "1.0.0", &[], None),
        ];
        let res = resolve(&[root("GemA")], &catalogue, &engine("1.0.0"), false).unwrap();
        assert_eq!(res.gems.len(), 3);
    }

    #[test]
    fn missing_gem_is_unsatisfiable() {
        let err = resolve(&[root("GemZ>=1.0")], &[], &engine("1.0.0"), false).unwrap_err();
        assert!(matches!(err, ResolveError::UnsatisfiableRequirement { .. }));
        assert_eq!(err.gem_name(), "GemZ");
    }

    #[test]
    fn optional_root_is_dropped() {
        let catalogue = vec![gem("GemA", "1.0.0", &[], None)];
        let roots = vec![
            root("GemA"),
            RootRequirement::new("GemMissing".parse().unwrap(), true),
        ];
        let res = resolve(&roots, &catalogue, &engine("1.0.0"), false).unwrap();
        assert!(res.gems.contains_key("GemA"));
        assert_eq!(res.dropped.len(), 1);
    }

    #[test]
    fn api_dependencies_checked() {
        let mut candidate = gem("GemA", "1.0.0", &[], None);
        candidate.manifest.engine_api_dependencies = Some(vec!["framework>=2.0.0".to_owned()]);
        let catalogue = vec![candidate];
        let mut target = engine("1.0.0");
        target
            .api_versions
            .insert("framework".to_owned(), Version::parse("1.5.0").unwrap());
        assert!(resolve(&[root("GemA")], &catalogue, &target, false).is_err());
        target
            .api_versions
            .insert("framework".to_owned(), Version::parse("2.1.0").unwrap());
        assert!(resolve(&[root("GemA")], &catalogue, &target, false).is_ok());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn output_satisfies_every_root(
                versions in proptest::collection::vec((0u64..4, 0u64..4), 1..6),
                lo in 0u64..4,
            ) {
                let catalogue: Vec<GemCandidate> = versions
                    .iter()
                    .map(|(maj, min)| gem("GemA", &format!("{maj}.{min}.0"), &[], None))
                    .collect();
                let req = format!("GemA>={lo}.0.0");
                let parsed: Requirement = req.parse().unwrap();
                match resolve(&[root(&req)], &catalogue, &engine("1.0.0"), false) {
                    Ok(res) => {
                        let chosen = res.gems.get("GemA").unwrap();
                        prop_assert!(parsed.matches(&chosen.name, &chosen.version));
                        let best = catalogue.iter().map(|c| &c.version).max().unwrap();
                        prop_assert_eq!(&chosen.version, best);
                    }
                    Err(_) => prop_assert!(catalogue.iter().all(|c| !parsed.matches(&c.name, &c.version))),
                }
            }
        }
    }
}
