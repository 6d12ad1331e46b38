//! Catalog-wide configuration, the Rust-native replacement for an
//! ad hoc keyword-argument `initialize({...})` call.

use std::path::PathBuf;

use slog::Logger;

/// Configuration shared by `ServerCatalog::initialize` and
/// `CompleteCatalog::initialize`. Deserializable so a host tool can
/// source it from a project's own config file; this core never reads
/// that file itself.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// If true, `ServerCatalog::refresh` never contacts the server.
    #[serde(default)]
    pub offline: bool,
    /// Directories to scan for local source packages.
    #[serde(default)]
    pub local_package_dirs: Vec<PathBuf>,
    /// Where the cached server snapshot lives on disk. `None` falls
    /// back to a platform cache directory via `directories`.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl CatalogConfig {
    pub fn new() -> Self {
        CatalogConfig::default()
    }

    /// The effective on-disk cache directory: `cache_dir` if set,
    /// otherwise the platform project-cache directory.
    pub fn effective_cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.clone().or_else(|| {
            ::directories::ProjectDirs::from("", "", "granary")
                .map(|dirs| dirs.cache_dir().to_path_buf())
        })
    }
}

/// Builds the default logger used when a caller doesn't supply one of
/// its own, combining `slog-term` formatting with `slog-async` dispatch.
pub fn default_logger() -> Logger {
    use slog::Drain;

    let decorator = ::slog_term::TermDecorator::new().build();
    let drain = ::slog_term::FullFormat::new(decorator).build().fuse();
    let drain = ::slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!())
}
