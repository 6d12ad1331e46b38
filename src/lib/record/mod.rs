//! Primary record types shared by every catalog: `Name`, `VersionId`, and
//! the opaque `ConstraintExpr` used for dependency requirements.

pub mod package;

use std::{fmt, rc::Rc, str::FromStr};

use rand::{self, Rng};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// The unique name of a package. Cheaply cloneable, as it's threaded
/// through nearly every catalog structure.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Rc<str>);

impl Name {
    pub fn new<S: Into<String>>(s: S) -> Self {
        Name(Rc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'a> From<&'a str> for Name {
    fn from(s: &'a str) -> Self {
        Name::new(s)
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name::new(s)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Name::new(s))
    }
}

/// The opaque, process-unique identifier minted for every `Version`.
/// Server-originated versions get their id from the snapshot; locally
/// synthesised versions get a random token, unique only within the
/// catalog that minted it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionId(String);

impl VersionId {
    pub fn new<S: Into<String>>(s: S) -> Self {
        VersionId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Mints a fresh random id, distinct (with overwhelming probability)
    /// from every id already present in `existing`.
    pub fn fresh<'a, I>(existing: I) -> Self
    where
        I: IntoIterator<Item = &'a VersionId>,
    {
        let taken: Vec<&VersionId> = existing.into_iter().collect();
        loop {
            let candidate = VersionId(random_token());
            if !taken.contains(&&candidate) {
                return candidate;
            }
        }
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn random_token() -> String {
    let mut rng = rand::thread_rng();
    (0..16)
        .map(|_| rng.gen_range(0u8, 16u8))
        .map(|n| std::char::from_digit(u32::from(n), 16).unwrap())
        .collect()
}

/// An opaque dependency-constraint expression. This core only ever
/// stores, compares for equality, and forwards these to the external
/// constraint solver, which is the only party that actually interprets
/// them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintExpr(String);

impl ConstraintExpr {
    pub fn new<S: Into<String>>(s: S) -> Self {
        ConstraintExpr(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The always-satisfied constraint, used when a local-override
    /// dependency has no explicit version requirement.
    pub fn any() -> Self {
        ConstraintExpr(String::new())
    }
}

impl fmt::Display for ConstraintExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConstraintExpr {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ConstraintExpr::new(s))
    }
}
