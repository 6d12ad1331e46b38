//! `ServerCatalog`: a read-mostly projection of the remote package
//! server, optionally operating offline from a cached snapshot.

use slog::Logger;

use catalog::base::BaseCatalog;
use config::CatalogConfig;
use error::Res;
use external::ServerSnapshotSource;
use record::package::{Build, Package, Version};
use record::{Name, VersionId};

/// Represents "what exists upstream?".
#[derive(Debug)]
pub struct ServerCatalog {
    base: BaseCatalog,
    offline: bool,
    logger: Logger,
}

impl ServerCatalog {
    pub fn new(logger: Logger) -> Self {
        ServerCatalog {
            base: BaseCatalog::new(),
            offline: false,
            logger,
        }
    }

    /// Records `offline`, resets collections, marks initialised. No I/O.
    pub fn initialize(&mut self, config: &CatalogConfig) {
        self.offline = config.offline;
        self.base.reset();
        self.base.initialized = true;
    }

    pub fn offline(&self) -> bool {
        self.offline
    }

    /// Loads the cached snapshot; if not offline, asks the server
    /// client for an update. An unreachable server is non-fatal: it
    /// logs a warning and falls back to the cached snapshot. Resets
    /// collections, then ingests whichever snapshot was obtained.
    /// Corrupt/missing cache yields an empty catalog, not an error.
    pub fn refresh<S: ServerSnapshotSource>(&mut self, source: &S) -> Res<()> {
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
        self.base.initialized = true;

        Ok(())
    }

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

    pub(crate) fn base_mut(&mut self) -> &mut BaseCatalog {
        &mut self.base
    }
}
