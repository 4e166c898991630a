use revctl_hash::Hash;

/// The aggregated error type for the `revctl` facade.
///
/// Each component crate defines its own error taxonomy; this type
/// wraps them with `#[from]` so callers crossing the facade boundary deal
/// with one enum instead of five, without this crate inventing new error
/// variants for conditions a component crate already reports precisely.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An object-store operation failed.
    #[error(transparent)]
    Store(#[from] revctl_store::StoreError),
    /// A change-set algebra operation failed.
    #[error(transparent)]
    ChangeSet(#[from] revctl_changeset::ChangeSetError),
    /// A merge or ancestry operation failed.
    #[error(transparent)]
    Merge(#[from] revctl_merge::MergeError),
    /// A cert or trust-layer operation failed.
    #[error(transparent)]
    Cert(#[from] revctl_cert::CertError),
    /// A revision's canonical text failed to parse.
    #[error("revision {id} failed to parse: {detail}")]
    MalformedRevision {
        /// The revision whose text could not be parsed.
        id: Hash,
        /// What went wrong.
        detail: String,
    },
    /// A manifest's canonical text failed to parse.
    #[error("manifest {id} failed to parse: {detail}")]
    MalformedManifest {
        /// The manifest whose text could not be parsed.
        id: Hash,
        /// What went wrong.
        detail: String,
    },
    /// An edge of a submitted revision failed the manifest sanity check
    ///: applying its change-set to the parent
    /// manifest did not reproduce the revision's new manifest.
    #[error("revision {revision} edge from parent {parent:?} fails the manifest sanity check")]
    ManifestSanityCheckFailed {
        /// The revision under write.
        revision: Hash,
        /// The parent revision of the failing edge (`None` for the root edge).
        parent: Option<Hash>,
    },
    /// A key stored under `name` did not decode as a valid public key.
    #[error("stored key {name:?} is malformed: {detail}")]
    MalformedKey {
        /// The key name under which the malformed bytes were stored.
        name: String,
        /// What went wrong.
        detail: String,
    },
}
