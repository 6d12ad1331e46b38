//! `CompleteCatalog`: the server projection merged with local source
//! packages, where local entries replace any server entry sharing a
//! name. This is the catalog the rest of the tool actually consumes.

use std::path::PathBuf;

use indexmap::IndexSet;
use slog::Logger;

use build::lazy_builder::{BuildMessage, LazyBuilder};
use catalog::base::BaseCatalog;
use catalog::local_override::LocalOverride;
use config::CatalogConfig;
use error::{ErrorKind, Res};
use external::{
    BuiltArtifactStore, Compiler, Filesystem, PackageSourceParser, Project, ServerSnapshotSource,
    SolverBootstrap, SolverOpts, Tropohouse,
};
use record::package::{Build, Package, Version};
use record::{Name, VersionId};
use resolve::{ConstraintInput, ResolveOptions, ResolveOutcome, Resolver};

#[derive(Debug)]
pub struct CompleteCatalog {
    base: BaseCatalog,
    offline: bool,
    local: LocalOverride,
    resolver: Resolver,
    logger: Logger,
}

impl CompleteCatalog {
    pub fn new(logger: Logger) -> Self {
        let local_logger = logger.new(o!("component" => "local_override"));
        let resolve_logger = logger.new(o!("component" => "resolver"));
        CompleteCatalog {
            base: BaseCatalog::new(),
            offline: false,
            local: LocalOverride::new(local_logger),
            resolver: Resolver::new(resolve_logger),
            logger,
        }
    }

    /// Configures directories and triggers the first refresh, then
    /// bootstraps the resolver.
    pub fn initialize<FS, S, P, B>(
        &mut self,
        config: &CatalogConfig,
        fs: &FS,
        source: &S,
        parser: &P,
        loader: &B,
    ) -> Res<()>
    where
        FS: Filesystem,
        S: ServerSnapshotSource,
        P: PackageSourceParser,
        B: SolverBootstrap,
    {
        self.offline = config.offline;
        self.base.initialized = true;
        self.local.set_local_package_dirs(config.local_package_dirs.clone(), fs);

        self.refresh(fs, source, parser)?;
        self.resolver.bootstrap(loader);

        Ok(())
    }

    /// A full refresh: reset, ingest the server snapshot, then apply
    /// local overrides. Mutations to local packages and explicit
    /// refresh calls both route through this; partial updates are not
    /// supported.
    pub fn refresh<FS, S, P>(&mut self, fs: &FS, source: &S, parser: &P) -> Res<()>
    where
        FS: Filesystem,
        S: ServerSnapshotSource,
        P: PackageSourceParser,
    {
        self.base.require_initialized()?;

        let cached = source.load_cached();
        let snapshot = if self.offline {
            cached
        } else {
            match source.update_from_server(cached.as_ref()) {
                Some(fresh) => Some(fresh),
                None => {
                    warn!(self.logger, "package server unreachable, using cached snapshot");
                    cached
                }
            }
        };

        self.base.reset();
        if let Some(snapshot) = snapshot {
            self.base.insert_server_packages(snapshot);
        }

        match self.local.apply(&mut self.base, fs, parser) {
            Ok(()) => {
                self.base.initialized = true;
                Ok(())
            }
            Err(e) => {
                // A partial refresh failure leaves the catalog
                // uninitialised.
                self.base.initialized = false;
                Err(e)
            }
        }
    }

    // -- query primitives, delegated to BaseCatalog --

    pub fn get_package(&self, name: &Name) -> Option<&Package> {
        self.base.get_package(name)
    }

    pub fn get_version(&self, name: &Name, version: &str) -> Option<&Version> {
        self.base.get_version(name, version)
    }

    pub fn get_latest_version(&self, name: &Name) -> Option<&VersionId> {
        self.base.get_latest_version(name)
    }

    pub fn get_all_builds(&self, version_id: &VersionId) -> Vec<&Build> {
        self.base.get_all_builds(version_id)
    }

    pub fn base(&self) -> &BaseCatalog {
        &self.base
    }

    // -- local-package management --

    pub fn is_local_package(&self, name: &Name) -> bool {
        self.local.is_local_package(name)
    }

    pub fn effective_local_packages(&self) -> Vec<Name> {
        self.local.effective_local_packages.keys().cloned().collect()
    }

    pub fn unbuilt(&self) -> Vec<Name> {
        self.local.unbuilt.iter().cloned().collect()
    }

    /// Registers a local package at `dir`. Triggers a refresh on
    /// success.
    pub fn add_local_package<FS, S, P>(
        &mut self,
        name: Name,
        dir: PathBuf,
        fs: &FS,
        source: &S,
        parser: &P,
    ) -> Res<()>
    where
        FS: Filesystem,
        S: ServerSnapshotSource,
        P: PackageSourceParser,
    {
        let dir = dir.canonicalize().unwrap_or(dir);
        self.local.add_local_package(name, dir)?;
        self.refresh(fs, source, parser)
    }

    /// Removes a registered local package. Triggers a refresh on
    /// success.
    pub fn remove_local_package<FS, S, P>(
        &mut self,
        name: &Name,
        fs: &FS,
        source: &S,
        parser: &P,
    ) -> Res<()>
    where
        FS: Filesystem,
        S: ServerSnapshotSource,
        P: PackageSourceParser,
    {
        self.local.remove_local_package(name)?;
        self.refresh(fs, source, parser)
    }

    /// Ensures a local package is built, invoking the `LazyBuilder` if
    /// needed, and collecting any build messages it produces.
    pub fn ensure_built<FS, C, AS>(
        &mut self,
        name: &Name,
        fs: &FS,
        compiler: &C,
        artifacts: &AS,
    ) -> Res<Vec<BuildMessage>>
    where
        FS: Filesystem,
        C: Compiler,
        AS: BuiltArtifactStore,
    {
        let mut on_stack = IndexSet::new();
        let mut messages = vec![];
        let builder = LazyBuilder::new(&self.logger);
        builder.build(
            name,
            &mut self.local,
            &mut self.base,
            fs,
            compiler,
            artifacts,
            &mut on_stack,
            &mut messages,
        )?;
        Ok(messages)
    }

    /// For a local package, ensures it's built and returns its source
    /// directory. For a non-local package, requires a version and
    /// returns the tropohouse path if it exists on disk.
    pub fn get_load_path_for_package<FS, C, AS, T>(
        &mut self,
        name: &Name,
        version: Option<&str>,
        fs: &FS,
        compiler: &C,
        artifacts: &AS,
        tropohouse: &T,
    ) -> Res<Option<PathBuf>>
    where
        FS: Filesystem,
        C: Compiler,
        AS: BuiltArtifactStore,
        T: Tropohouse,
    {
        if self.local.is_local_package(name) {
            self.ensure_built(name, fs, compiler, artifacts)?;
            return Ok(self.local.local_package_dir(name).cloned());
        }

        let version = version.ok_or_else(|| ErrorKind::MissingVersion {
            name: name.to_string(),
        })?;

        let path = tropohouse.package_path(name, version);
        if fs.is_dir(&path) {
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }

    // -- constraint resolution --

    pub fn resolve_constraints<Pr: Project>(
        &self,
        input: &ConstraintInput,
        solver_opts: SolverOpts,
        opts: &ResolveOptions,
        project: Option<&Pr>,
    ) -> Res<ResolveOutcome> {
        self.resolver
            .resolve_constraints(input, solver_opts, opts, project)
            .map_err(|e| {
                e.context(ErrorKind::Compile {
                    name: "<resolver>".into(),
                })
                .into()
            })
    }
}
