//! `granary`: the core of a package catalog and lazy build orchestrator.
//!
//! This crate maintains a unified, queryable view of packages available
//! both on a remote package server and in local source trees,
//! reconciles the two with a "local wins" precedence rule, brokers
//! constraint resolution between a project's pinned versions and an
//! external solver, and lazily builds local source packages when
//! consumers request them. See DESIGN.md for how each part is grounded.

#[macro_use]
extern crate failure;
extern crate directories;
extern crate indexmap;
extern crate rand;
extern crate semver;
#[macro_use]
extern crate serde_derive;
extern crate serde;
extern crate serde_json;
#[macro_use]
extern crate slog;
extern crate slog_async;
extern crate slog_term;

pub mod build;
pub mod catalog;
pub mod config;
pub mod error;
pub mod external;
pub mod record;
pub mod resolve;

pub use config::{default_logger, CatalogConfig};
pub use error::{Error, ErrorKind, Res};

use slog::Logger;

use catalog::{CompleteCatalog, ServerCatalog};

/// A single process-wide value a host constructs once at startup and
/// passes by reference, rather than two hidden globals the rest of the
/// core reaches for implicitly.
pub struct Catalogs {
    pub official: ServerCatalog,
    pub complete: CompleteCatalog,
}

impl Catalogs {
    pub fn new(logger: Logger) -> Self {
        let official_logger = logger.new(o!("catalog" => "official"));
        let complete_logger = logger.new(o!("catalog" => "complete"));
        Catalogs {
            official: ServerCatalog::new(official_logger),
            complete: CompleteCatalog::new(complete_logger),
        }
    }
}
