//! Traits for every external collaborator the catalog core depends on.
//! The core depends only on these narrow interfaces; concrete
//! implementations (the wire client, the solver, the compiler, ...) are
//! supplied by the embedding tool.
//!
//! The solver in particular is modeled as an `Option<Box<dyn
//! ConstraintSolver>>` with a documented "not yet available" state,
//! rather than by inspecting the truthiness of a lazily-populated
//! field.

use std::path::PathBuf;

use failure::Error;
use indexmap::IndexMap;
use semver::Version as SemverVersion;

use record::package::{Build, Package, Version};
use record::{ConstraintExpr, Name};

/// A point-in-time serialisation of the remote package server's catalog.
/// Opaque to this core beyond the three collections it feeds into
/// `BaseCatalog::insert_server_packages`.
pub struct ServerSnapshot {
    pub packages: Vec<Package>,
    pub versions: Vec<Version>,
    pub builds: Vec<Build>,
}

/// Reads and refreshes the cached server snapshot.
pub trait ServerSnapshotSource {
    /// Loads whatever snapshot is on disk. Absent on a corrupt or
    /// missing cache -- not an error.
    fn load_cached(&self) -> Option<ServerSnapshot>;

    /// Asks the live server for a fresh snapshot, optionally informed by
    /// the previous one. `None` means the server was unreachable; the
    /// caller falls back to the cached snapshot and logs a warning.
    fn update_from_server(&self, prev: Option<&ServerSnapshot>) -> Option<ServerSnapshot>;
}

/// What `getDependencyMetadata()` on a parsed source returns: a
/// dependency name paired with its constraint.
pub type DependencyMetadata = IndexMap<Name, ConstraintExpr>;

/// A parsed package declaration, as returned by the external
/// `PackageSource` parser for a given `(name, directory)`.
#[derive(Clone, Debug)]
pub struct ParsedSource {
    pub version: String,
    pub earliest_compatible_version: Option<String>,
    pub test_name: Option<Name>,
    pub is_test: bool,
    pub contains_plugins: bool,
    pub summary: Option<String>,
    pub source_root: PathBuf,
    pub dependencies: DependencyMetadata,
}

/// Parses a package declaration file out of a source directory.
pub trait PackageSourceParser {
    fn parse(&self, name: &Name, directory: &PathBuf) -> Result<ParsedSource, Error>;
}

/// One build-order dependency, as returned by the compiler's dependency
/// analyser: a name, and an optional pinned version the dependent
/// expects to see.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildOrderDep {
    pub name: Name,
    pub version: Option<SemverVersion>,
}

/// The architecture-specific product of compiling a source.
#[derive(Clone, Debug)]
pub struct Unipackage {
    pub architecture: String,
}

/// Drives build-order analysis and compilation of a parsed source.
pub trait Compiler {
    fn build_order_constraints(&self, source: &ParsedSource) -> Result<Vec<BuildOrderDep>, Error>;

    /// Compiles the source. `Ok(None)` means compilation ran but
    /// produced build errors (non-fatal to the core, but nothing to
    /// persist); `Ok(Some(_))` is a successful build.
    fn compile(&self, source: &ParsedSource) -> Result<Option<Unipackage>, Error>;

    fn check_up_to_date(&self, source: &ParsedSource, built: &BuiltArtifact) -> Result<bool, Error>;
}

/// The on-disk product of a build, as read back by the built-artifact
/// reader/writer.
#[derive(Clone, Debug)]
pub struct BuiltArtifact {
    pub path: PathBuf,
    pub architectures: Vec<String>,
}

/// Reads and writes built artifacts on disk.
pub trait BuiltArtifactStore {
    fn init_from_path(&self, name: &Name, dir: &PathBuf, build_of_path: &PathBuf) -> Result<Option<BuiltArtifact>, Error>;
    fn save_to_path(&self, unipackage: &Unipackage, dir: &PathBuf, build_of_path: &PathBuf) -> Result<(), Error>;
}

/// A version set proposed for every dependency name.
pub type VersionMap = IndexMap<Name, String>;

/// Resolves a dependency list and constraint set to a concrete version
/// for each name.
pub trait ConstraintSolver {
    fn resolve(
        &self,
        deps: &[Name],
        constraints: &[(Name, ConstraintExpr)],
        opts: &SolverOpts,
    ) -> Result<VersionMap, Error>;
}

/// Opaque options forwarded to the solver, optionally augmented with
/// the project's previous solution.
#[derive(Clone, Debug, Default)]
pub struct SolverOpts {
    pub previous_solution: Option<VersionMap>,
    pub extra: IndexMap<String, String>,
}

/// Bootstraps the constraint solver after initial refresh. The solver
/// is an optional capability populated lazily once this succeeds.
pub trait SolverBootstrap {
    fn load(&self) -> Result<Box<ConstraintSolver>, Error>;
}

/// The active project's root and its currently pinned versions.
pub trait Project {
    fn root_dir(&self) -> Option<PathBuf>;
    fn get_versions(&self) -> Result<VersionMap, Error>;
}

/// Returns the conventional on-disk location for a package/version
/// pair, whether or not anything has actually been installed there yet
/// -- callers check existence themselves via `Filesystem`.
pub trait Tropohouse {
    fn package_path(&self, name: &Name, version: &str) -> PathBuf;
}

/// Directory listing and existence checks. The core only ever needs
/// synchronous directory enumeration and existence checks; actual
/// filesystem watching is delegated entirely to the embedding tool;
/// this trait exists so that tests can substitute an in-memory
/// filesystem.
pub trait Filesystem {
    fn is_dir(&self, path: &PathBuf) -> bool;
    fn file_exists(&self, path: &PathBuf) -> bool;
    fn read_dir(&self, path: &PathBuf) -> Result<Vec<PathBuf>, Error>;
}

/// The default `Filesystem` impl, backed by `std::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn is_dir(&self, path: &PathBuf) -> bool {
        path.is_dir()
    }

    fn file_exists(&self, path: &PathBuf) -> bool {
        path.is_file()
    }

    fn read_dir(&self, path: &PathBuf) -> Result<Vec<PathBuf>, Error> {
        let mut out = vec![];
        for entry in ::std::fs::read_dir(path)? {
            out.push(entry?.path());
        }
        Ok(out)
    }
}
