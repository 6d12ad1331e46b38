//! Error types surfaced by the catalog core.

use std::fmt;

use failure::{Backtrace, Context, Fail};

/// The error type threaded through every fallible catalog operation.
#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

/// The kinds of error the core itself raises. External collaborators (the
/// server client, the solver, the compiler, ...) surface their own
/// `failure::Error`s, which are attached as the `cause` of `SourceParse`
/// and `Compile` rather than flattened into this enum.
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
    /// A public operation was called on a catalog before `initialize`.
    #[fail(display = "catalog has not been initialized")]
    NotInitialized,
    /// `add_local_package` was called with a name already bound to a
    /// different directory.
    #[fail(display = "local package `{}` is already bound to a different path", name)]
    DuplicateLocalPackage { name: String },
    /// `remove_local_package` was called with a name that isn't registered.
    #[fail(display = "no local package named `{}`", name)]
    NoSuchLocalPackage { name: String },
    /// `get_load_path_for_package` was called for a non-local package
    /// without a version.
    #[fail(display = "a version is required to load non-local package `{}`", name)]
    MissingVersion { name: String },
    /// A local source's declared version already contains a `+` build
    /// suffix, so `+local` cannot be appended unambiguously.
    #[fail(
        display = "local package `{}` declares version `{}`, which already has a build suffix",
        name, version
    )]
    MalformedLocalVersion { name: String, version: String },
    /// A local package's build-order dependency pins a version that
    /// doesn't match the local source's own version.
    #[fail(
        display = "internal inconsistency: `{}` expects `{}` at version `{}`, but its local source is at `{}`",
        name, dep_name, expected, actual
    )]
    InternalInconsistency {
        name: String,
        dep_name: String,
        expected: String,
        actual: String,
    },
    /// The `PackageSource` parser failed on a local package's directory.
    #[fail(display = "failed to parse package source for `{}`", name)]
    SourceParse { name: String },
    /// The external compiler failed for a reason other than reporting
    /// ordinary build errors (e.g. it could not be invoked at all).
    #[fail(display = "failed to compile package `{}`", name)]
    Compile { name: String },
}

impl Fail for Error {
    fn cause(&self) -> Option<&Fail> {
        self.inner.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.inner.get_context()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Context::new(kind),
        }
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(inner: Context<ErrorKind>) -> Error {
        Error { inner }
    }
}

/// Shorthand used throughout the crate.
pub type Res<T> = Result<T, Error>;
