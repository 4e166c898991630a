use revctl_hash::{DeltaError, Hash, HashError};

/// Errors raised by [`crate::SqliteStore`].
///
/// Maps onto the fatal/recoverable split in `SPEC_FULL.md` §7: [`Self::CorruptStore`],
/// [`Self::MissingObject`] and [`Self::SchemaMismatch`] are fatal conditions a caller
/// should surface and stop on; [`Self::Duplicate`] is the one recoverable outcome,
/// returned so callers can tell "already present" from "just inserted" without
/// treating it as a failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reconstruction produced a hash mismatch, or a delta chain contains a
    /// cycle. Indicates on-disk corruption; not recoverable by retrying.
    #[error("object {id} is corrupt: {detail}")]
    CorruptStore {
        /// The id whose reconstruction failed.
        id: Hash,
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// `id` resolves to neither a full blob nor any delta chain.
    #[error("object {id} is not present in the store")]
    MissingObject {
        /// The id that could not be found.
        id: Hash,
    },
    /// The on-disk schema version does not match the version this build
    /// expects. Fatal; the embedder may offer a migration path.
    #[error("database schema version {found} does not match expected version {expected}")]
    SchemaMismatch {
        /// Schema version actually present in the database.
        found: i64,
        /// Schema version this build expects.
        expected: i64,
    },
    /// A `put_*_full` or `put_*_delta` call found the target id already
    /// present. Non-fatal: the write is treated as a no-op and the caller is
    /// told so, rather than being asked to special-case an error.
    #[error("object {id} is already present")]
    Duplicate {
        /// The id that was already present.
        id: Hash,
    },
    /// A hash supplied to a `put_*_full` call did not match the hash of the
    /// bytes supplied alongside it.
    #[error("supplied id {supplied} does not match hash of supplied bytes ({computed})")]
    HashMismatch {
        /// The id the caller claimed.
        supplied: Hash,
        /// The hash actually computed from the caller's bytes.
        computed: Hash,
    },
    /// `put_*_delta` named a `new_id` that has no full row yet; the
    /// reverse-delta invariant requires the newer version to be full before
    /// an older version can be rewritten as a delta against it.
    #[error("cannot store delta against {new_id}: it has no full row yet")]
    DeltaBaseNotFull {
        /// The id that was expected to already be a full blob.
        new_id: Hash,
    },
    /// A malformed delta was rejected by the codec during reconstruction.
    #[error("corrupt delta while reconstructing {id}: {source}")]
    CorruptDelta {
        /// The id being reconstructed when the delta failed to apply.
        id: Hash,
        /// The underlying delta codec error.
        #[source]
        source: DeltaError,
    },
    /// A stored hash failed to parse back out of its hex text column.
    #[error(transparent)]
    Hash(#[from] HashError),
    /// The underlying SQLite driver reported an error.
    #[error("sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),
}
