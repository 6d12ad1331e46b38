//! The three catalog record types: `Package`, `Version`, and `Build`.

use indexmap::IndexMap;

use record::{ConstraintExpr, Name, VersionId};

/// One per distinct package name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: Name,
    pub maintainers: Option<Vec<String>>,
    /// Opaque timestamp string, as handed down by the server snapshot or
    /// left absent for locally synthesised packages. This core never
    /// parses or compares it; it only stores and forwards it.
    pub last_updated: Option<String>,
}

impl Package {
    pub fn new(name: Name) -> Self {
        Package {
            name,
            maintainers: None,
            last_updated: None,
        }
    }
}

/// Many per package. The `version` field is the semver-like string,
/// optionally suffixed `+buildId`; `+local` marks a synthesised local
/// version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub package_name: Name,
    pub version: String,
    pub earliest_compatible_version: Option<String>,
    pub dependencies: IndexMap<Name, ConstraintExpr>,
    pub description: Option<String>,
    pub is_test: bool,
    pub contains_plugins: bool,
    pub test_name: Option<Name>,
}

impl Version {
    /// True if the version string carries the `+local` suffix minted by
    /// `LocalOverride`.
    pub fn is_local(&self) -> bool {
        self.version.ends_with("+local")
    }

    /// The version string with any `+...` build suffix stripped, leaving
    /// just the base semver-like string.
    pub fn base_version(&self) -> &str {
        match self.version.find('+') {
            Some(idx) => &self.version[..idx],
            None => &self.version,
        }
    }
}

/// Zero or more per version: a concrete architecture-specific build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub package_name: Name,
    pub version_id: VersionId,
    pub architecture: String,
    pub build_published: Option<String>,
    pub built_by: Option<String>,
}
