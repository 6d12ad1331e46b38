//! The two catalog instances the rest of the tool consumes:
//! `ServerCatalog`, a read-mostly projection of the remote package
//! server, and `CompleteCatalog`, the server projection merged with
//! local source packages. Both extend the collections and query
//! primitives in `base`.

pub mod base;
pub mod complete;
pub mod local_override;
pub mod server;

pub use self::complete::CompleteCatalog;
pub use self::server::ServerCatalog;
