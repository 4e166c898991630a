/// Errors raised while validating a [`crate::Path`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum PathError {
    /// The path text was empty.
    #[error("path must not be empty")]
    Empty,
    /// The path began with `/`.
    #[error("path must be relative, not absolute")]
    Absolute,
    /// The path contained a `//` or trailing/leading empty component.
    #[error("path contains an empty component")]
    EmptyComponent,
    /// The path contained a `..` component.
    #[error("path contains a parent ('..') component")]
    ParentComponent,
    /// The path contained a NUL byte.
    #[error("path contains a NUL byte")]
    ContainsNul,
    /// The path falls inside the reserved bookkeeping directory.
    #[error("path lies inside the reserved bookkeeping directory")]
    InReservedDirectory,
}

/// Errors raised while applying or composing change-set algebra.
#[derive(Debug, thiserror::Error)]
pub enum ChangeSetError {
    /// A rename or delete named a path absent from the source manifest.
    #[error("{op} references path {path:?} which is not present in the source manifest")]
    MissingSource {
        /// The operation that failed (`"rename"`, `"delete"`, …).
        op: &'static str,
        /// The offending path, rendered for diagnostics.
        path: String,
    },
    /// An add or rename target path already exists in the manifest being
    /// built.
    #[error("duplicate target path {0:?}")]
    DuplicateTarget(String),
    /// A delta's declared source hash did not match the manifest's current
    /// hash for that path.
    #[error("delta at {path:?} expected source hash {expected} but manifest has {found}")]
    DeltaMismatch {
        /// The path the delta applies to, rendered for diagnostics.
        path: String,
        /// The hash the delta declared as its source.
        expected: revctl_hash::Hash,
        /// The hash actually present in the manifest.
        found: revctl_hash::Hash,
    },
    /// A delta named a path not present in the manifest at all.
    #[error("delta at {0:?} references a path absent from the manifest")]
    DeltaOnAbsentPath(String),
    /// Two change-sets could not be composed because their operations on a
    /// shared path were mutually inconsistent (e.g. one renames a path the
    /// other already deleted).
    #[error("cannot compose change-sets: {0}")]
    InconsistentConcat(String),
    /// A change-set failed an internal consistency check at construction
    /// time (a rename target was also an add, a delta path was also deleted,
    /// etc).
    #[error("inconsistent change-set: {0}")]
    InconsistentChangeSet(String),
    /// The path validation layer rejected a path embedded in change-set
    /// input.
    #[error(transparent)]
    Path(#[from] PathError),
}
