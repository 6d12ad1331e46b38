//! `BaseCatalog`: the three indexed collections shared by every
//! catalog, plus the query primitives built on top of them.
//!
//! Catalog state lives in a single `Snapshot` value that
//! `reset`/`insert_server_packages` rebuild wholesale and that callers
//! replace atomically, rather than a bag of collections mutated
//! incrementally in place.

use indexmap::IndexMap;
use semver::Version as SemverVersion;

use error::{ErrorKind, Res};
use external::ServerSnapshot;
use record::package::{Build, Package, Version};
use record::{Name, VersionId};

/// The packages/versions/builds collections at one point in time.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub packages: IndexMap<Name, Package>,
    pub versions: IndexMap<VersionId, Version>,
    pub builds: Vec<Build>,
}

impl Snapshot {
    pub fn new() -> Self {
        Snapshot::default()
    }

    /// Ingests a server snapshot's three collections without
    /// deduplication beyond what the snapshot guarantees.
    pub fn insert_server_packages(&mut self, snapshot: ServerSnapshot) {
        for pkg in snapshot.packages {
            self.packages.insert(pkg.name.clone(), pkg);
        }
        for ver in snapshot.versions {
            self.versions.insert(ver.id.clone(), ver);
        }
        self.builds.extend(snapshot.builds);
    }
}

/// The shared base every catalog extends.
#[derive(Clone, Debug, Default)]
pub struct BaseCatalog {
    pub(crate) snapshot: Snapshot,
    pub(crate) initialized: bool,
}

impl BaseCatalog {
    pub fn new() -> Self {
        BaseCatalog::default()
    }

    pub fn get_package(&self, name: &Name) -> Option<&Package> {
        self.snapshot.packages.get(name)
    }

    pub fn get_version(&self, name: &Name, version: &str) -> Option<&Version> {
        self.snapshot
            .versions
            .values()
            .find(|v| &v.package_name == name && v.version == version)
    }

    pub fn get_version_by_id(&self, id: &VersionId) -> Option<&Version> {
        self.snapshot.versions.get(id)
    }

    /// The latest version of a package by semver ordering of the base
    /// version (build suffix ignored).
    pub fn get_latest_version(&self, name: &Name) -> Option<&VersionId> {
        self.snapshot
            .versions
            .values()
            .filter(|v| &v.package_name == name)
            .filter_map(|v| SemverVersion::parse(v.base_version()).ok().map(|sv| (sv, &v.id)))
            .max_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, id)| id)
    }

    pub fn get_all_builds(&self, version_id: &VersionId) -> Vec<&Build> {
        self.snapshot
            .builds
            .iter()
            .filter(|b| &b.version_id == version_id)
            .collect()
    }

    pub fn all_package_names(&self) -> Vec<Name> {
        self.snapshot.packages.keys().cloned().collect()
    }

    pub fn reset(&mut self) {
        self.snapshot = Snapshot::new();
    }

    pub fn insert_server_packages(&mut self, snapshot: ServerSnapshot) {
        self.snapshot.insert_server_packages(snapshot);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn require_initialized(&self) -> Res<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(ErrorKind::NotInitialized.into())
        }
    }
}
