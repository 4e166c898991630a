//! The content-addressed, reverse-delta object store.
//!
//! # Overview
//!
//! `revctl-store` persists the three reverse-delta-chained object kinds
//! (files, manifests, revisions) plus two flat relations (certs, keys) in
//! SQLite. It knows nothing about what a manifest or a revision *means* —
//! every object is an opaque byte string identified by its hash — which
//! keeps this crate a leaf dependency of `revctl-changeset`, `revctl-merge`
//! and `revctl-cert` rather than the other way around — the store is
//! parameterised only by primitive hashes.
//!
//! # Design
//!
//! [`SqliteStore`] wraps a single [`rusqlite::Connection`] behind a
//! `RefCell`, matching a single-writer, single-threaded cooperative
//! scheduling model — there is no locking because there is only
//! ever one in-process caller. [`TransactionGuard`] layers reference-counted
//! nesting on top of SQLite's own `BEGIN`/`SAVEPOINT` support: the outermost
//! guard owns the real transaction, inner guards are savepoints, and a
//! guard dropped without `commit` rolls back its scope and nothing more.
//!
//! # Invariants
//!
//! - Every id present in a `*_full` or `*_delta` table satisfies
//!   [`SqliteStore::reconstruct`]'s postcondition:
//!   `hash(reconstruct(id)) == id`.
//! - At most one full row exists for any id at a time across the full/delta
//!   split (the reverse-delta invariant).
//! - A [`TransactionGuard`] dropped without [`TransactionGuard::commit`]
//!   leaves the store exactly as it was before the guard was opened.
//!
//! # Errors
//!
//! All fallible operations return [`StoreError`], distinguishing the fatal
//! conditions (`CorruptStore`, `MissingObject`, `SchemaMismatch`) from the
//! one recoverable one (`Duplicate`, surfaced as [`blob::PutOutcome`] rather
//! than an error so callers are not forced to match on it).
//!
//! # Examples
//!
//! ```
//! use revctl_hash::Hash;
//! use revctl_store::SqliteStore;
//!
//! let store = SqliteStore::open_in_memory().unwrap();
//! let id = Hash::of(b"hello\n");
//! let txn = store.transaction().unwrap();
//! store.put_file_full(id, b"hello\n").unwrap();
//! txn.commit().unwrap();
//! assert_eq!(store.get_file(id).unwrap(), b"hello\n");
//! ```
//!
//! # See also
//!
//! `revctl-changeset` for the manifest/change-set types whose serialised
//! bytes this crate stores; `revctl-merge` and `revctl-cert` for the
//! higher-level operations built on top of this crate's lookup API.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod blob;
mod cache;
mod certs;
mod error;
mod kind;
mod schema;
mod txn;

use std::cell::{Cell, RefCell};
use std::path::Path;

use rusqlite::Connection;

pub use blob::PutOutcome;
pub use certs::CertRow;
pub use error::StoreError;
pub use kind::Kind;
pub use schema::SCHEMA_VERSION;
pub use txn::TransactionGuard;

use revctl_hash::Hash;

/// The object store: one SQLite connection plus an optional bounded
/// read-through cache.
pub struct SqliteStore {
    conn: RefCell<Connection>,
    txn_depth: Cell<u32>,
    cache: RefCell<Option<cache::ReadThroughCache>>,
}

impl SqliteStore {
    /// Opens (creating if absent) the SQLite database at `path`, running
    /// schema setup / version checking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SchemaMismatch`] if an existing database was
    /// created by an incompatible schema version, or [`StoreError::Sql`] if
    /// the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, 0)
    }

    /// Opens a private in-memory database, primarily for tests and
    /// short-lived embedder sessions.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, 0)
    }

    /// Like [`Self::open`], additionally enabling a bounded read-through
    /// cache of up to `cache_capacity` reconstructed blobs.
    pub fn open_with_cache(path: &Path, cache_capacity: usize) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, cache_capacity)
    }

    fn from_connection(conn: Connection, cache_capacity: usize) -> Result<Self, StoreError> {
        schema::ensure_schema(&conn)?;
        Ok(Self {
            conn: RefCell::new(conn),
            txn_depth: Cell::new(0),
            cache: RefCell::new(Some(cache::ReadThroughCache::new(cache_capacity))),
        })
    }

    /// Opens a transaction guard. All mutating calls made before the
    /// returned guard (or any guard nested inside it) commits are rolled
    /// back if the guard is dropped without committing.
    pub fn transaction(&self) -> Result<TransactionGuard<'_>, StoreError> {
        TransactionGuard::begin(self)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T, StoreError>) -> Result<T, StoreError> {
        f(&self.conn.borrow())
    }

    fn reconstruct_cached(&self, kind: Kind, id: Hash) -> Result<Vec<u8>, StoreError> {
        if let Some(hit) = self.cache.borrow_mut().as_mut().and_then(|c| c.get(kind, id)) {
            return Ok(hit);
        }
        let bytes = self.with_conn(|conn| blob::reconstruct(conn, kind, id))?;
        if let Some(cache) = self.cache.borrow_mut().as_mut() {
            cache.insert(kind, id, bytes.clone());
        }
        Ok(bytes)
    }

    // -- files ---------------------------------------------------------

    /// Reconstructs the bytes of file blob `id`.
    pub fn get_file(&self, id: Hash) -> Result<Vec<u8>, StoreError> {
        self.reconstruct_cached(Kind::File, id)
    }

    /// True if `id` is known, as a full blob or via any delta chain.
    pub fn file_exists(&self, id: Hash) -> Result<bool, StoreError> {
        self.with_conn(|conn| blob::exists(conn, Kind::File, id))
    }

    /// Inserts `bytes` as a full file blob under `id`.
    pub fn put_file_full(&self, id: Hash, bytes: &[u8]) -> Result<PutOutcome, StoreError> {
        self.with_conn(|conn| blob::put_full(conn, Kind::File, id, bytes))
    }

    /// Records a reverse delta from `new_id` (already full) back to
    /// `old_id`.
    pub fn put_file_delta(
        &self,
        old_id: Hash,
        new_id: Hash,
        delta: &revctl_hash::Delta,
    ) -> Result<PutOutcome, StoreError> {
        self.with_conn(|conn| blob::put_delta(conn, Kind::File, old_id, new_id, delta))
    }

    /// Writes `new_bytes` as the newest version superseding `old_id`,
    /// diffing and rewriting `old_id` as a delta in the same call.
    pub fn put_file_version(&self, old_id: Hash, new_bytes: &[u8]) -> Result<Hash, StoreError> {
        self.with_conn(|conn| blob::put_version(conn, Kind::File, old_id, new_bytes))
    }

    // -- manifests -------------------------------------------------------

    /// Reconstructs the canonical serialised bytes of manifest `id`.
    pub fn get_manifest(&self, id: Hash) -> Result<Vec<u8>, StoreError> {
        self.reconstruct_cached(Kind::Manifest, id)
    }

    /// True if manifest `id` is known.
    pub fn manifest_exists(&self, id: Hash) -> Result<bool, StoreError> {
        self.with_conn(|conn| blob::exists(conn, Kind::Manifest, id))
    }

    /// Inserts `bytes` as a full manifest blob under `id`.
    pub fn put_manifest_full(&self, id: Hash, bytes: &[u8]) -> Result<PutOutcome, StoreError> {
        self.with_conn(|conn| blob::put_full(conn, Kind::Manifest, id, bytes))
    }

    /// Records a reverse delta from `new_id` (already full) back to
    /// `old_id`.
    pub fn put_manifest_delta(
        &self,
        old_id: Hash,
        new_id: Hash,
        delta: &revctl_hash::Delta,
    ) -> Result<PutOutcome, StoreError> {
        self.with_conn(|conn| blob::put_delta(conn, Kind::Manifest, old_id, new_id, delta))
    }

    /// Writes `new_bytes` as the newest manifest version superseding
    /// `old_id`.
    pub fn put_manifest_version(&self, old_id: Hash, new_bytes: &[u8]) -> Result<Hash, StoreError> {
        self.with_conn(|conn| blob::put_version(conn, Kind::Manifest, old_id, new_bytes))
    }

    // -- revisions ---------------------------------------------------------

    /// Reconstructs the canonical serialised bytes of revision `id`.
    pub fn get_revision(&self, id: Hash) -> Result<Vec<u8>, StoreError> {
        self.reconstruct_cached(Kind::Revision, id)
    }

    /// True if revision `id` is known.
    pub fn revision_exists(&self, id: Hash) -> Result<bool, StoreError> {
        self.with_conn(|conn| blob::exists(conn, Kind::Revision, id))
    }

    /// Inserts `bytes` as a full revision blob under `id`. The per-edge
    /// sanity check (that each edge's change-set applied to the parent
    /// manifest reproduces the new manifest) is performed by the `revctl`
    /// facade crate before this call, using
    /// `revctl-changeset`'s `apply_to_manifest` against manifests already
    /// resolved through this store — this crate stores revisions exactly
    /// like any other blob and does not parse their canonical form.
    pub fn put_revision_full(&self, id: Hash, bytes: &[u8]) -> Result<PutOutcome, StoreError> {
        self.with_conn(|conn| blob::put_full(conn, Kind::Revision, id, bytes))
    }

    // -- certs and keys ----------------------------------------------------

    /// Inserts `cert` if its `cert_hash` is not already present.
    pub fn put_cert(&self, cert: &CertRow) -> Result<PutOutcome, StoreError> {
        self.with_conn(|conn| certs::put_cert(conn, cert))
    }

    /// All certs attached to `target`. Unfiltered: the caller (`revctl-cert`)
    /// is responsible for trust evaluation.
    pub fn certs_for_target(&self, target: Hash) -> Result<Vec<CertRow>, StoreError> {
        self.with_conn(|conn| certs::certs_for_target(conn, target))
    }

    /// Every revision id carrying at least one cert named `name`.
    pub fn targets_with_cert_name(&self, name: &str) -> Result<Vec<Hash>, StoreError> {
        self.with_conn(|conn| certs::targets_with_cert_name(conn, name))
    }

    /// Stores or replaces key material under `name`.
    pub fn put_key(&self, name: &str, public_key: &[u8], private_key: Option<&[u8]>) -> Result<(), StoreError> {
        self.with_conn(|conn| certs::put_key(conn, name, public_key, private_key))
    }

    /// The public key bytes stored under `name`, if any.
    pub fn get_public_key(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.with_conn(|conn| certs::get_public_key(conn, name))
    }

    /// The private key bytes stored under `name`, if any were supplied.
    pub fn get_private_key(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.with_conn(|conn| certs::get_private_key(conn, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_twice_at_same_path_agrees_on_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");
        {
            let store = SqliteStore::open(&path).unwrap();
            let id = Hash::of(b"persisted");
            let txn = store.transaction().unwrap();
            store.put_file_full(id, b"persisted").unwrap();
            txn.commit().unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.get_file(Hash::of(b"persisted")).unwrap(), b"persisted");
    }

    #[test]
    fn cache_serves_repeat_reads_without_reconstructing_again() {
        let store = SqliteStore::open_in_memory().unwrap();
        let old = Hash::of(b"A\nB\nC\n");
        let txn = store.transaction().unwrap();
        store.put_file_full(old, b"A\nB\nC\n").unwrap();
        let new_id = store.put_file_version(old, b"A\nX\nC\n").unwrap();
        txn.commit().unwrap();

        assert_eq!(store.get_file(old).unwrap(), b"A\nB\nC\n");
        assert_eq!(store.get_file(old).unwrap(), b"A\nB\nC\n");
        assert_eq!(store.get_file(new_id).unwrap(), b"A\nX\nC\n");
    }
}
