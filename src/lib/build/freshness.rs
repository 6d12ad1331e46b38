//! Looks for a cached on-disk build of a local package and asks the
//! compiler whether it's still current. Never fails on a missing build
//! directory.

use std::path::PathBuf;

use external::{BuiltArtifact, BuiltArtifactStore, Compiler, Filesystem, ParsedSource};
use record::Name;

/// Returns the cached build directory's built artifact if it exists and
/// the external compiler reports it as up to date with `source`.
pub fn maybe_get_up_to_date_build<FS, A, C>(
    name: &Name,
    source_dir: &PathBuf,
    source: &ParsedSource,
    fs: &FS,
    artifacts: &A,
    compiler: &C,
) -> Option<BuiltArtifact>
where
    FS: Filesystem,
    A: BuiltArtifactStore,
    C: Compiler,
{
    let build_dir = source_dir.join(format!(".build.{}", name));
    if !fs.is_dir(&build_dir) {
        return None;
    }

    let artifact = match artifacts.init_from_path(name, &build_dir, source_dir) {
        Ok(Some(artifact)) => artifact,
        _ => return None,
    };

    match compiler.check_up_to_date(source, &artifact) {
        Ok(true) => Some(artifact),
        _ => None,
    }
}
