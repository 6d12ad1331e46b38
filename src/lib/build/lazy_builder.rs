//! `LazyBuilder`: compiles a local source package to a built artifact
//! on first use, honouring build order, detecting cycles, and caching
//! builds on disk.

use std::path::PathBuf;

use indexmap::IndexSet;
use slog::Logger;

use build::freshness::maybe_get_up_to_date_build;
use catalog::base::BaseCatalog;
use catalog::local_override::{strip_to_local, LocalOverride};
use error::{ErrorKind, Res};
use external::{BuiltArtifactStore, Compiler, Filesystem};
use record::package::Build as BuildRecord;
use record::Name;

/// A message surfaced during building, collected rather than printed
/// directly so the core stays free of any particular UI. A host
/// renders these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildMessage {
    Info(String),
    Warning(String),
}

/// Compiles local packages on demand, in build-order, with on-disk
/// build caching.
pub struct LazyBuilder<'a> {
    logger: &'a Logger,
}

impl<'a> LazyBuilder<'a> {
    pub fn new(logger: &'a Logger) -> Self {
        LazyBuilder { logger }
    }

    /// Builds `name`, recursing into its build-order dependencies first.
    /// `on_stack` is an explicit set threaded down the recursion rather
    /// than hidden thread-local state.
    pub fn build<FS, C, AS>(
        &self,
        name: &Name,
        local: &mut LocalOverride,
        base: &mut BaseCatalog,
        fs: &FS,
        compiler: &C,
        artifacts: &AS,
        on_stack: &mut IndexSet<Name>,
        messages: &mut Vec<BuildMessage>,
    ) -> Res<()>
    where
        FS: Filesystem,
        C: Compiler,
        AS: BuiltArtifactStore,
    {
        // Step 1: already built (or never local) -- return. Otherwise
        // remove immediately so re-entry short-circuits.
        if !local.unbuilt.shift_remove(name) {
            return Ok(());
        }

        // `name` itself is now on the call stack, not just its
        // dependencies -- a dependency that loops back to `name` must
        // see it here to be recognised as a cycle.
        on_stack.insert(name.clone());
        let result =
            self.build_one(name, local, base, fs, compiler, artifacts, on_stack, messages);
        on_stack.shift_remove(name);
        result
    }

    fn build_one<FS, C, AS>(
        &self,
        name: &Name,
        local: &mut LocalOverride,
        base: &mut BaseCatalog,
        fs: &FS,
        compiler: &C,
        artifacts: &AS,
        on_stack: &mut IndexSet<Name>,
        messages: &mut Vec<BuildMessage>,
    ) -> Res<()>
    where
        FS: Filesystem,
        C: Compiler,
        AS: BuiltArtifactStore,
    {
        let source = match local.package_sources.get(name) {
            Some(s) => s.clone(),
            None => return Ok(()),
        };
        let source_dir = match local.effective_local_packages.get(name) {
            Some(d) => d.clone(),
            None => return Ok(()),
        };

        // Step 2: build-order dependencies.
        let build_deps = compiler
            .build_order_constraints(&source)
            .map_err(|_| ErrorKind::Compile { name: name.to_string() })?;

        for dep in &build_deps {
            // 2a: non-local deps are assumed already built (the
            // tropohouse owns them).
            if !local.effective_local_packages.contains_key(&dep.name) {
                continue;
            }

            // 2b: a pinned version must match the local source's own
            // version once both are normalised to their `+local` form.
            if let Some(ref pinned) = dep.version {
                if let Some(dep_source) = local.package_sources.get(&dep.name) {
                    let expected = strip_to_local(&pinned.to_string());
                    let actual = strip_to_local(&dep_source.version);
                    if expected != actual {
                        return Err(ErrorKind::InternalInconsistency {
                            name: name.to_string(),
                            dep_name: dep.name.to_string(),
                            expected,
                            actual,
                        }
                        .into());
                    }
                }
            }

            if on_stack.contains(&dep.name) {
                // 2c: cycle. Tolerated only if an up-to-date on-disk
                // build already exists for the dependency.
                let dep_dir = local.effective_local_packages.get(&dep.name).cloned();
                let dep_source = local.package_sources.get(&dep.name).cloned();
                let has_cached = match (dep_dir, dep_source) {
                    (Some(dir), Some(src)) => {
                        maybe_get_up_to_date_build(&dep.name, &dir, &src, fs, artifacts, compiler).is_some()
                    }
                    _ => false,
                };

                if !has_cached {
                    let msg = format!("circular dependency between {} and {}", name, dep.name);
                    warn!(self.logger, "{}", msg);
                    messages.push(BuildMessage::Warning(msg));
                }
                continue;
            }

            // 2d: recurse with the dependency marked on-stack.
            on_stack.insert(dep.name.clone());
            self.build(&dep.name, local, base, fs, compiler, artifacts, on_stack, messages)?;
            on_stack.shift_remove(&dep.name);
        }

        // Step 3: reuse an up-to-date on-disk build if one exists.
        let cached = maybe_get_up_to_date_build(name, &source_dir, &source, fs, artifacts, compiler);

        let architecture = if let Some(artifact) = cached {
            artifact.architectures.get(0).cloned().unwrap_or_else(|| "unknown".into())
        } else {
            // Step 4: compile.
            let label = format!("building package `{}`", name);
            messages.push(BuildMessage::Info(label.clone()));
            debug!(self.logger, "{}", label; "path" => source_dir.to_string_lossy().into_owned());

            let unipackage = compiler
                .compile(&source)
                .map_err(|_| ErrorKind::Compile { name: name.to_string() })?;

            match unipackage {
                None => {
                    // Compilation ran but produced build errors. Nothing
                    // to persist or record; this package stays unbuilt
                    // for the remainder of the process's lifetime.
                    return Ok(());
                }
                Some(unipackage) => {
                    let build_dir = source_dir.join(format!(".build.{}", name));
                    match artifacts.save_to_path(&unipackage, &build_dir, &source_dir) {
                        Ok(()) => {
                            ensure_build_ignore(&source_dir, fs);
                        }
                        Err(e) => {
                            if !is_permission_denied(&e) {
                                return Err(e
                                    .context(ErrorKind::Compile { name: name.to_string() })
                                    .into());
                            }
                            // Permission denied is swallowed: the
                            // in-memory build is still usable.
                        }
                    }
                    unipackage.architecture
                }
            }
        };

        // Step 5: append the Build record.
        let version_id = base
            .get_latest_version(name)
            .cloned()
            .expect("a local package always has exactly one local version by this point");

        base.snapshot.builds.push(BuildRecord {
            package_name: name.clone(),
            version_id,
            architecture,
            build_published: None,
            built_by: None,
        });

        Ok(())
    }
}

fn is_permission_denied(e: &::failure::Error) -> bool {
    e.to_string().to_lowercase().contains("permission denied")
}

/// Appends a `.build*` line to `<dir>/.gitignore` if not already
/// present. Best-effort: failures here fall under the same "permission
/// denied is swallowed" policy as build persistence.
fn ensure_build_ignore<FS: Filesystem>(dir: &PathBuf, _fs: &FS) {
    use std::fs;
    use std::io::{Read, Write};

    let ignore_path = dir.join(".gitignore");
    let mut contents = String::new();
    if let Ok(mut f) = fs::File::open(&ignore_path) {
        let _ = f.read_to_string(&mut contents);
    }

    if contents.lines().any(|line| line.trim() == ".build*") {
        return;
    }

    if let Ok(mut f) = fs::OpenOptions::new().create(true).append(true).open(&ignore_path) {
        let _ = writeln!(f, ".build*");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use external::{BuiltArtifact, BuildOrderDep, ParsedSource, Unipackage};
    use failure::Error;
    use indexmap::IndexMap;
    use slog::Discard;
    use semver::Version as SemverVersion;

    fn test_logger() -> Logger {
        Logger::root(Discard, o!())
    }

    struct FakeFs;
    impl Filesystem for FakeFs {
        fn is_dir(&self, _path: &PathBuf) -> bool {
            false
        }
        fn file_exists(&self, _path: &PathBuf) -> bool {
            false
        }
        fn read_dir(&self, _path: &PathBuf) -> Result<Vec<PathBuf>, Error> {
            Ok(vec![])
        }
    }

    struct FakeArtifacts;
    impl BuiltArtifactStore for FakeArtifacts {
        fn init_from_path(
            &self,
            _name: &Name,
            _dir: &PathBuf,
            _build_of_path: &PathBuf,
        ) -> Result<Option<BuiltArtifact>, Error> {
            Ok(None)
        }
        fn save_to_path(
            &self,
            _unipackage: &Unipackage,
            _dir: &PathBuf,
            _build_of_path: &PathBuf,
        ) -> Result<(), Error> {
            Ok(())
        }
    }

    struct GraphCompiler {
        edges: IndexMap<Name, Vec<Name>>,
    }
    impl Compiler for GraphCompiler {
        fn build_order_constraints(&self, source: &ParsedSource) -> Result<Vec<BuildOrderDep>, Error> {
            let name = Name::new(source.source_root.file_name().unwrap().to_str().unwrap());
            Ok(self
                .edges
                .get(&name)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(|n| BuildOrderDep { name: n, version: None })
                .collect())
        }
        fn compile(&self, _source: &ParsedSource) -> Result<Option<Unipackage>, Error> {
            Ok(Some(Unipackage {
                architecture: "x86_64".into(),
            }))
        }
        fn check_up_to_date(&self, _source: &ParsedSource, _built: &BuiltArtifact) -> Result<bool, Error> {
            Ok(false)
        }
    }

    fn make_source(name: &str) -> ParsedSource {
        ParsedSource {
            version: "1.0.0".into(),
            earliest_compatible_version: None,
            test_name: None,
            is_test: false,
            contains_plugins: false,
            summary: None,
            source_root: PathBuf::from(format!("/src/{}", name)),
            dependencies: IndexMap::new(),
        }
    }

    fn setup(names: &[&str]) -> (LocalOverride, BaseCatalog) {
        let mut local = LocalOverride::new(test_logger());
        let mut base = BaseCatalog::new();
        base.initialized = true;

        for n in names {
            let name = Name::new(*n);
            let dir = PathBuf::from(format!("/src/{}", n));
            local.effective_local_packages.insert(name.clone(), dir);
            local.package_sources.insert(name.clone(), make_source(n));
            local.unbuilt.insert(name.clone());

            base.snapshot.packages.insert(
                name.clone(),
                ::record::package::Package::new(name.clone()),
            );
            let id = ::record::VersionId::new(format!("v-{}", n));
            base.snapshot.versions.insert(
                id.clone(),
                ::record::package::Version {
                    id,
                    package_name: name.clone(),
                    version: "1.0.0+local".into(),
                    earliest_compatible_version: None,
                    dependencies: IndexMap::new(),
                    description: None,
                    is_test: false,
                    contains_plugins: false,
                    test_name: None,
                },
            );
        }

        (local, base)
    }

    #[test]
    fn builds_dependencies_before_dependents() {
        // delta depends on epsilon.
        let (mut local, mut base) = setup(&["delta", "epsilon"]);
        let mut edges = IndexMap::new();
        edges.insert(Name::new("delta"), vec![Name::new("epsilon")]);
        let compiler = GraphCompiler { edges };
        let builder = LazyBuilder::new(&Logger::root(Discard, o!()));
        let mut on_stack = IndexSet::new();
        let mut messages = vec![];

        builder
            .build(
                &Name::new("delta"),
                &mut local,
                &mut base,
                &FakeFs,
                &compiler,
                &FakeArtifacts,
                &mut on_stack,
                &mut messages,
            )
            .unwrap();

        assert!(local.unbuilt.is_empty());
        assert_eq!(base.snapshot.builds.len(), 2);
        let built_names: Vec<&Name> = base.snapshot.builds.iter().map(|b| &b.package_name).collect();
        assert!(built_names.contains(&&Name::new("delta")));
        assert!(built_names.contains(&&Name::new("epsilon")));
    }

    #[test]
    fn cycle_is_tolerated_and_produces_a_message() {
        // p depends on q; q depends on p.
        let (mut local, mut base) = setup(&["p", "q"]);
        let mut edges = IndexMap::new();
        edges.insert(Name::new("p"), vec![Name::new("q")]);
        edges.insert(Name::new("q"), vec![Name::new("p")]);
        let compiler = GraphCompiler { edges };
        let builder = LazyBuilder::new(&Logger::root(Discard, o!()));
        let mut on_stack = IndexSet::new();
        let mut messages = vec![];

        let result = builder.build(
            &Name::new("p"),
            &mut local,
            &mut base,
            &FakeFs,
            &compiler,
            &FakeArtifacts,
            &mut on_stack,
            &mut messages,
        );

        assert!(result.is_ok());
        assert!(messages.iter().any(|m| match m {
            BuildMessage::Warning(s) => s.contains("circular dependency"),
            _ => false,
        }));
        assert!(!base.snapshot.builds.is_empty());
    }

    #[test]
    fn already_built_package_is_a_no_op() {
        let (mut local, mut base) = setup(&["solo"]);
        local.unbuilt.clear();
        let compiler = GraphCompiler { edges: IndexMap::new() };
        let builder = LazyBuilder::new(&Logger::root(Discard, o!()));
        let mut on_stack = IndexSet::new();
        let mut messages = vec![];

        builder
            .build(
                &Name::new("solo"),
                &mut local,
                &mut base,
                &FakeFs,
                &compiler,
                &FakeArtifacts,
                &mut on_stack,
                &mut messages,
            )
            .unwrap();

        assert!(base.snapshot.builds.is_empty());
    }
}
