/// Errors raised while assembling, storing or reading back a [`crate::Revision`].
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The underlying object store reported an error.
    #[error(transparent)]
    Store(#[from] revctl_store::StoreError),
    /// A stored manifest failed to parse as canonical text.
    #[error("corrupt manifest {id}: {detail}")]
    CorruptManifest {
        /// The manifest hash that failed to parse.
        id: revctl_hash::Hash,
        /// What went wrong.
        detail: String,
    },
    /// A stored revision failed to parse as canonical text.
    #[error("corrupt revision {id}: {detail}")]
    CorruptRevision {
        /// The revision hash that failed to parse.
        id: revctl_hash::Hash,
        /// What went wrong.
        detail: String,
    },
    /// An edge's change-set, applied to its parent manifest, did not
    /// reproduce the revision's declared new manifest.
    #[error("revision {revision} edge from {parent:?} fails the manifest sanity check")]
    ManifestSanityCheckFailed {
        /// The revision under construction or verification.
        revision: revctl_hash::Hash,
        /// The parent revision of the failing edge (`None` for the root edge).
        parent: Option<revctl_hash::Hash>,
    },
    /// Change-set algebra precondition failure, surfaced from `revctl-changeset`.
    #[error(transparent)]
    ChangeSet(#[from] revctl_changeset::ChangeSetError),
}
