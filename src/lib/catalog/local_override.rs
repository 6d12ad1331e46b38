//! `LocalOverride`: replaces server-originated entries for locally
//! present packages with synthesised local entries, and surfaces each
//! local package's declared test package as its own catalog entry.

use std::path::PathBuf;

use indexmap::{IndexMap, IndexSet};
use slog::Logger;

use catalog::base::BaseCatalog;
use error::{ErrorKind, Res};
use external::{Filesystem, PackageSourceParser, ParsedSource};
use record::package::{Package, Version};
use record::{Name, VersionId};

/// The conventional package-declaration filename a candidate local
/// source directory must contain to be picked up by a directory scan.
pub const MANIFEST_FILENAME: &str = "package.toml";

/// Owns the local-package bookkeeping on `CompleteCatalog`: the
/// configured scan directories, explicit overrides, their resolved
/// union, the parsed sources, and the set of names awaiting a build.
#[derive(Debug)]
pub struct LocalOverride {
    pub local_package_dirs: Vec<PathBuf>,
    pub local_packages: IndexMap<Name, PathBuf>,
    pub effective_local_packages: IndexMap<Name, PathBuf>,
    pub package_sources: IndexMap<Name, ParsedSource>,
    pub unbuilt: IndexSet<Name>,
    logger: Logger,
}

impl LocalOverride {
    pub fn new(logger: Logger) -> Self {
        LocalOverride {
            local_package_dirs: Vec::new(),
            local_packages: IndexMap::new(),
            effective_local_packages: IndexMap::new(),
            package_sources: IndexMap::new(),
            unbuilt: IndexSet::new(),
            logger,
        }
    }

    /// Assigns `localPackageDirs`. Existence is validated here; missing
    /// entries are silently dropped.
    pub fn set_local_package_dirs<FS: Filesystem>(&mut self, dirs: Vec<PathBuf>, fs: &FS) {
        self.local_package_dirs = dirs.into_iter().filter(|d| fs.is_dir(d)).collect();
    }

    fn recompute_effective<FS: Filesystem>(&mut self, fs: &FS) -> Res<()> {
        let mut effective: IndexMap<Name, PathBuf> = IndexMap::new();

        for dir in &self.local_package_dirs {
            if !fs.is_dir(dir) {
                continue;
            }
            let entries = match fs.read_dir(dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries {
                if !fs.is_dir(&entry) {
                    continue;
                }
                let manifest = entry.join(MANIFEST_FILENAME);
                if !fs.file_exists(&manifest) {
                    continue;
                }
                let name = match entry.file_name().and_then(|n| n.to_str()) {
                    Some(n) => Name::new(n),
                    None => continue,
                };
                // The first occurrence of a name wins.
                effective.entry(name).or_insert(entry);
            }
        }

        // Explicit `localPackages` override directory scans.
        for (name, dir) in &self.local_packages {
            effective.insert(name.clone(), dir.clone());
        }

        self.effective_local_packages = effective;
        Ok(())
    }

    /// Replaces every server-originated package/version/build for an
    /// effective local package, then re-derives local `Package`/`Version`
    /// records (and recursively, test-package records) from each
    /// source.
    pub fn apply<FS: Filesystem, P: PackageSourceParser>(
        &mut self,
        base: &mut BaseCatalog,
        fs: &FS,
        parser: &P,
    ) -> Res<()> {
        self.recompute_effective(fs)?;

        // Strip any server-originated package/version/build for names
        // now covered locally. This must happen before local versions
        // are inserted below, so that no server version ever survives
        // alongside a local one for the same package.
        let removed_versions: IndexSet<VersionId> = base
            .snapshot
            .versions
            .values()
            .filter(|v| self.effective_local_packages.contains_key(&v.package_name))
            .map(|v| v.id.clone())
            .collect();

        base.snapshot
            .versions
            .retain(|_, v| !self.effective_local_packages.contains_key(&v.package_name));
        base.snapshot
            .builds
            .retain(|b| !removed_versions.contains(&b.version_id));
        base.snapshot
            .packages
            .retain(|name, _| !self.effective_local_packages.contains_key(name));

        self.package_sources.clear();
        self.unbuilt.clear();

        let names: Vec<(Name, PathBuf)> = self
            .effective_local_packages
            .iter()
            .map(|(n, d)| (n.clone(), d.clone()))
            .collect();

        for (name, dir) in names {
            self.insert_local_package(base, parser, &name, &dir, false)?;
        }

        // Every effective local package starts out unbuilt.
        self.unbuilt = self
            .effective_local_packages
            .keys()
            .cloned()
            .collect();

        Ok(())
    }

    /// Step 5 (and its step 5f recursion for test packages).
    fn insert_local_package<P: PackageSourceParser>(
        &mut self,
        base: &mut BaseCatalog,
        parser: &P,
        name: &Name,
        dir: &PathBuf,
        is_test: bool,
    ) -> Res<()> {
        let parsed = parser
            .parse(name, dir)
            .map_err(|_| ErrorKind::SourceParse { name: name.to_string() })?;

        base.snapshot
            .packages
            .insert(name.clone(), Package::new(name.clone()));

        let existing_ids: Vec<VersionId> = base.snapshot.versions.keys().cloned().collect();
        let id = VersionId::fresh(existing_ids.iter());

        let local_version = local_version_string(name, &parsed.version)?;

        let version = Version {
            id: id.clone(),
            package_name: name.clone(),
            version: local_version,
            earliest_compatible_version: parsed.earliest_compatible_version.clone(),
            dependencies: parsed.dependencies.clone(),
            description: parsed.summary.clone(),
            is_test,
            contains_plugins: parsed.contains_plugins,
            test_name: parsed.test_name.clone(),
        };
        base.snapshot.versions.insert(id, version);

        // Step 5f: a non-test source that declares a testName gets its
        // test package synthesised as its own local package, at the
        // same directory. Test packages never recurse further.
        if !is_test {
            if let Some(test_name) = parsed.test_name.clone() {
                self.effective_local_packages
                    .entry(test_name.clone())
                    .or_insert_with(|| dir.clone());
                self.insert_local_package(base, parser, &test_name, dir, true)?;
            }
        }

        self.package_sources.insert(name.clone(), parsed);

        Ok(())
    }

    pub fn is_local_package(&self, name: &Name) -> bool {
        self.effective_local_packages.contains_key(name)
    }

    pub fn local_package_dir(&self, name: &Name) -> Option<&PathBuf> {
        self.effective_local_packages.get(name)
    }

    /// Fails on name conflict with a different path; otherwise records
    /// the mapping. The caller is expected to have already resolved
    /// `dir` to an absolute path.
    pub fn add_local_package(&mut self, name: Name, dir: PathBuf) -> Res<()> {
        if let Some(existing) = self.local_packages.get(&name) {
            if existing != &dir {
                return Err(ErrorKind::DuplicateLocalPackage {
                    name: name.to_string(),
                }
                .into());
            }
            return Ok(());
        }
        self.local_packages.insert(name, dir);
        Ok(())
    }

    /// Fails if `name` isn't registered as a local package.
    pub fn remove_local_package(&mut self, name: &Name) -> Res<()> {
        if self.local_packages.shift_remove(name).is_none() {
            return Err(ErrorKind::NoSuchLocalPackage {
                name: name.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Appends `+local` to a source's declared version, failing if it
/// already carries a build suffix of its own.
pub fn local_version_string(name: &Name, declared: &str) -> Res<String> {
    if declared.contains('+') {
        return Err(ErrorKind::MalformedLocalVersion {
            name: name.to_string(),
            version: declared.to_string(),
        }
        .into());
    }
    Ok(format!("{}+local", declared))
}

/// Replaces any `+...` suffix on a version string with `+local`. Unlike
/// `local_version_string`, this never fails -- it's used to normalise a
/// dependent's pinned version before comparing it against a local
/// source's own version.
pub fn strip_to_local(version: &str) -> String {
    let base = match version.find('+') {
        Some(idx) => &version[..idx],
        None => version,
    };
    format!("{}+local", base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_version_string_appends_suffix() {
        let n = Name::new("alpha");
        assert_eq!(local_version_string(&n, "1.0.0").unwrap(), "1.0.0+local");
    }

    #[test]
    fn local_version_string_rejects_existing_suffix() {
        let n = Name::new("alpha");
        assert!(local_version_string(&n, "1.0.0+abc").is_err());
    }

    #[test]
    fn strip_to_local_is_idempotent_with_local_version_string() {
        // strip_to_local(v + "+X") == strip_to_local(v) == v + "+local"
        let direct = local_version_string(&Name::new("a"), "1.0.0").unwrap();
        assert_eq!(strip_to_local("1.0.0+X"), direct);
        assert_eq!(strip_to_local("1.0.0"), direct);
    }
}
