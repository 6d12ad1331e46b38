//! The `Resolver` facade: adapts heterogeneous constraint inputs to the
//! external solver and reconciles with the project's pinned-versions
//! manifest.

use failure::Error;
use indexmap::IndexMap;
use slog::Logger;

use external::{ConstraintSolver, Project, SolverBootstrap, SolverOpts, VersionMap};
use record::{ConstraintExpr, Name};

/// One entry of the sequence form of `constraints`:
/// `{packageName, version?, weak?}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceEntry {
    pub package_name: Name,
    pub version: Option<ConstraintExpr>,
    pub weak: bool,
}

impl SequenceEntry {
    pub fn new(package_name: Name) -> Self {
        SequenceEntry {
            package_name,
            version: None,
            weak: false,
        }
    }
}

/// A tagged variant at the API boundary for the two accepted constraint
/// shapes, rather than a duck-typed branch on the shape of the
/// argument.
#[derive(Clone, Debug)]
pub enum ConstraintInput {
    Sequence(Vec<SequenceEntry>),
    Mapping(IndexMap<Name, String>),
}

impl ConstraintInput {
    /// Normalises either shape into a dependency list and a constraint
    /// list.
    fn normalize(&self) -> (Vec<Name>, Vec<(Name, ConstraintExpr)>) {
        let mut deps = vec![];
        let mut constraints = vec![];

        match self {
            ConstraintInput::Sequence(entries) => {
                for entry in entries {
                    if !entry.weak {
                        deps.push(entry.package_name.clone());
                    }
                    if let Some(ref version) = entry.version {
                        constraints.push((entry.package_name.clone(), version.clone()));
                    }
                }
            }
            ConstraintInput::Mapping(map) => {
                for (name, raw) in map {
                    deps.push(name.clone());
                    if !raw.is_empty() {
                        constraints.push((name.clone(), ConstraintExpr::new(raw.clone())));
                    }
                }
            }
        }

        (deps, constraints)
    }
}

/// Options controlling how `resolve_constraints` reconciles with the
/// active project.
#[derive(Clone, Debug, Default)]
pub struct ResolveOptions {
    pub ignore_project_deps: bool,
}

/// The distinguishable "solver unavailable" sentinel: callers interpret
/// this as "fall back to local-only loading", as opposed to a genuine
/// "no solution" answer which the solver itself would report as an
/// `Err`.
#[derive(Clone, Debug)]
pub enum ResolveOutcome {
    Versions(VersionMap),
    SolverUnavailable,
}

/// Adapts constraint input to the external solver. The solver itself is
/// an optional capability, populated by `bootstrap` once it succeeds,
/// rather than inspected for truthiness as a lazily loaded field.
pub struct Resolver {
    solver: Option<Box<ConstraintSolver>>,
    logger: Logger,
}

impl Resolver {
    pub fn new(logger: Logger) -> Self {
        Resolver {
            solver: None,
            logger,
        }
    }

    /// Asks the bootstrap loader for the external constraint-solver
    /// package. Until this succeeds, `resolve_constraints` always
    /// returns `SolverUnavailable`.
    pub fn bootstrap<B: SolverBootstrap>(&mut self, loader: &B) {
        match loader.load() {
            Ok(solver) => self.solver = Some(solver),
            Err(e) => {
                warn!(self.logger, "constraint solver bootstrap failed"; "cause" => %e);
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.solver.is_some()
    }

    /// Resolves a constraint input against the external solver,
    /// optionally reconciled with the active project's pinned versions.
    pub fn resolve_constraints<P: Project>(
        &self,
        input: &ConstraintInput,
        mut solver_opts: SolverOpts,
        opts: &ResolveOptions,
        project: Option<&P>,
    ) -> Result<ResolveOutcome, Error> {
        let solver = match self.solver {
            Some(ref s) => s,
            None => return Ok(ResolveOutcome::SolverUnavailable),
        };

        let (deps, constraints) = input.normalize();

        let use_project = !opts.ignore_project_deps && project.map_or(false, |p| p.root_dir().is_some());

        if use_project {
            let project = project.unwrap();
            let previous = project.get_versions()?;
            solver_opts.previous_solution = Some(previous);
        }

        let result = solver.resolve(&deps, &constraints, &solver_opts)?;
        Ok(ResolveOutcome::Versions(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::Discard;

    fn test_logger() -> Logger {
        Logger::root(Discard, o!())
    }

    struct NoProject;
    impl Project for NoProject {
        fn root_dir(&self) -> Option<::std::path::PathBuf> {
            None
        }
        fn get_versions(&self) -> Result<VersionMap, Error> {
            Ok(IndexMap::new())
        }
    }

    struct EchoSolver;
    impl ConstraintSolver for EchoSolver {
        fn resolve(
            &self,
            deps: &[Name],
            _constraints: &[(Name, ConstraintExpr)],
            _opts: &SolverOpts,
        ) -> Result<VersionMap, Error> {
            let mut out = IndexMap::new();
            for d in deps {
                out.insert(d.clone(), "1.0.0".to_string());
            }
            Ok(out)
        }
    }

    struct Loader;
    impl SolverBootstrap for Loader {
        fn load(&self) -> Result<Box<ConstraintSolver>, Error> {
            Ok(Box::new(EchoSolver))
        }
    }

    struct BrokenLoader;
    impl SolverBootstrap for BrokenLoader {
        fn load(&self) -> Result<Box<ConstraintSolver>, Error> {
            Err(::failure::err_msg("solver package unavailable"))
        }
    }

    #[test]
    fn a_failed_bootstrap_leaves_the_solver_unavailable() {
        let mut resolver = Resolver::new(test_logger());
        resolver.bootstrap(&BrokenLoader);
        assert!(!resolver.is_available());
    }

    #[test]
    fn unavailable_before_bootstrap() {
        let resolver = Resolver::new(test_logger());
        let input = ConstraintInput::Mapping(IndexMap::new());
        let outcome = resolver
            .resolve_constraints(&input, SolverOpts::default(), &ResolveOptions::default(), None::<&NoProject>)
            .unwrap();
        match outcome {
            ResolveOutcome::SolverUnavailable => {}
            _ => panic!("expected solver unavailable"),
        }
    }

    #[test]
    fn mapping_with_empty_value_contributes_no_constraint() {
        // {foo: "1.0.0", bar: ""} should produce deps ["foo", "bar"]
        // and a single constraint for foo.
        let mut map = IndexMap::new();
        map.insert(Name::new("foo"), "1.0.0".to_string());
        map.insert(Name::new("bar"), "".to_string());
        let input = ConstraintInput::Mapping(map);
        let (deps, constraints) = input.normalize();

        assert_eq!(deps, vec![Name::new("foo"), Name::new("bar")]);
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].0, Name::new("foo"));
        assert_eq!(constraints[0].1.as_str(), "1.0.0");
    }

    #[test]
    fn weak_sequence_entries_are_not_dependencies() {
        let entries = vec![
            SequenceEntry::new(Name::new("required")),
            SequenceEntry {
                weak: true,
                ..SequenceEntry::new(Name::new("optional"))
            },
        ];
        let input = ConstraintInput::Sequence(entries);
        let (deps, _) = input.normalize();
        assert_eq!(deps, vec![Name::new("required")]);
    }

    #[test]
    fn resolver_returns_versions_once_bootstrapped() {
        let mut resolver = Resolver::new(test_logger());
        resolver.bootstrap(&Loader);
        assert!(resolver.is_available());

        let mut map = IndexMap::new();
        map.insert(Name::new("foo"), "".to_string());
        let input = ConstraintInput::Mapping(map);
        let outcome = resolver
            .resolve_constraints(&input, SolverOpts::default(), &ResolveOptions::default(), None::<&NoProject>)
            .unwrap();
        match outcome {
            ResolveOutcome::Versions(v) => assert_eq!(v.get(&Name::new("foo")).unwrap(), "1.0.0"),
            _ => panic!("expected versions"),
        }
    }
}
