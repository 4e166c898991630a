//! The public entry point for the revision control core.
//!
//! # Overview
//!
//! `revctl` assembles the four leaf crates — [`revctl_hash`],
//! [`revctl_store`], [`revctl_changeset`], [`revctl_merge`] — plus
//! [`revctl_cert`] into the core's outside-facing surface:
//!
//! 1. A revision-id/file-id lookup API ([`RevisionStore::get_revision`],
//!    [`RevisionStore::get_manifest`], [`RevisionStore::get_file`]).
//! 2. A revision-write API accepting a fully formed revision plus certs
//!    ([`RevisionStore::put_revision`]).
//! 3. A merge-two-heads API ([`RevisionStore::merge_heads`]).
//!
//! Everything out of scope here — the CLI, workspace bookkeeping, network
//! sync, third-party import, the passphrase/merge-editor hook host — stays
//! an external collaborator; this crate supplies narrow callback interfaces
//! ([`RevisionStore::erase_bogus_certs`]'s trust-policy closure, the
//! key-lookup closure threaded through to `revctl-cert`) rather than
//! implementing any of that itself.
//!
//! # Design
//!
//! [`RevisionStore`] owns one [`revctl_store::SqliteStore`] and hands out
//! narrow views onto it ([`revctl_merge::MergeEngine`]) rather than
//! re-implementing ancestor or merge logic at this layer. `Revision` and
//! `Edge` are re-exported from `revctl-merge` unchanged (see that crate's
//! module doc for why they live there); this crate adds only the write-time
//! sanity check `put_revision` requires and the standard-cert attachment a
//! merge requires.
//!
//! # Invariants
//!
//! - [`RevisionStore::put_revision`] never stores a revision whose id does
//!   not match the hash of its own canonical text, nor one with an edge
//!   whose change-set fails to reproduce the declared new manifest from the
//!   parent manifest.
//! - [`RevisionStore::merge_heads`] writes either a complete merge revision
//!   with its four standard certs, or nothing at all.
//!
//! # Errors
//!
//! All fallible operations return [`Error`], which aggregates the five
//! component error types.
//!
//! # Examples
//!
//! ```
//! use revctl::{ChangeSet, Edge, Manifest, Path, Revision, RevisionStore};
//! use revctl_hash::Hash;
//!
//! let store = RevisionStore::open_in_memory().unwrap();
//! let content = b"hello\n";
//! let file = Hash::of(content);
//!
//! let txn = store.begin().unwrap();
//! store.put_file_full(file, content).unwrap();
//! let cs = ChangeSet::builder().add_file(Path::new("a").unwrap(), file).build();
//! let manifest = cs.apply_to_manifest(&Manifest::empty()).unwrap();
//! store.put_manifest_full(manifest.canonical_hash(), &manifest.to_canonical_bytes()).unwrap();
//! let revision = Revision {
//!     new_manifest: manifest.canonical_hash(),
//!     edges: vec![Edge { parent_revision: None, parent_manifest: None, change_set: cs }],
//! };
//! store.put_revision(&revision, &[]).unwrap();
//! txn.commit().unwrap();
//!
//! assert_eq!(store.get_file(file).unwrap(), content);
//! assert_eq!(store.get_revision(revision.id()).unwrap(), revision);
//! ```
//!
//! # See also
//!
//! `revctl-merge` and `revctl-cert` for the algorithms this facade wires
//! together.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod certs;
mod error;

use revctl_cert::{CertCheck, Keypair, PublicKey};
use revctl_hash::Hash;
use revctl_store::{PutOutcome, SqliteStore, TransactionGuard};

pub use error::Error;
pub use revctl_cert::{Cert, AUTHOR, BRANCH, CHANGELOG, COMMENT, DATE, TAG, TESTRESULT};
pub use revctl_changeset::{ChangeSet, ChangeSetBuilder, ChangeSetError, Manifest, MergeConflict, Path, PathError};
pub use revctl_hash::{Delta, HashError};
pub use revctl_merge::{
    merge_manifests, three_way_merge, AnnotateResult, ContentMergeOutcome, Edge, ManifestConflict,
    ManifestMergeResult, MergeOutcome, Revision,
};
pub use revctl_store::StoreError;

/// Configuration the embedder supplies to open a [`RevisionStore`]. The core
/// reads no environment variables directly; database path and key directory
/// are supplied by the embedder.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Path to the SQLite database file, or `None` for an in-memory store.
    pub database_path: Option<std::path::PathBuf>,
    /// Capacity of the optional read-through reconstruction cache. `0`
    /// disables caching.
    pub cache_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            cache_capacity: 256,
        }
    }
}

fn parse_revision(id: Hash, bytes: &[u8]) -> Result<Revision, Error> {
    let text = std::str::from_utf8(bytes).map_err(|e| Error::MalformedRevision { id, detail: e.to_string() })?;
    Revision::from_canonical_text(text).map_err(|detail| Error::MalformedRevision { id, detail })
}

fn parse_manifest(id: Hash, bytes: &[u8]) -> Result<Manifest, Error> {
    Manifest::from_canonical_bytes(bytes).map_err(|detail| Error::MalformedManifest { id, detail })
}

/// The revision control core's public handle: one object store plus the
/// component operations layered on top of it.
pub struct RevisionStore {
    store: SqliteStore,
}

impl RevisionStore {
    /// Opens a store per `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the database cannot be opened or its
    /// schema does not match what this build expects.
    pub fn open(config: &StoreConfig) -> Result<Self, Error> {
        let store = match &config.database_path {
            Some(path) => SqliteStore::open_with_cache(path, config.cache_capacity)?,
            None => SqliteStore::open_in_memory()?,
        };
        Ok(Self { store })
    }

    /// Opens a private in-memory store, primarily for tests and short-lived
    /// embedder sessions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on the (infallible in practice) underlying
    /// schema setup failure.
    pub fn open_in_memory() -> Result<Self, Error> {
        Self::open(&StoreConfig::default())
    }

    /// Opens a transaction guard over the underlying store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the underlying `BEGIN`/`SAVEPOINT` fails.
    pub fn begin(&self) -> Result<TransactionGuard<'_>, Error> {
        Ok(self.store.transaction()?)
    }

    /// Direct access to the underlying store, for embedders that need the
    /// lower-level full/delta API (`put_file_version`, `put_manifest_delta`,
    /// …) this facade does not re-expose one-to-one.
    #[must_use]
    pub fn inner(&self) -> &SqliteStore {
        &self.store
    }

    // -- lookup API ---------------------------------------

    /// Reconstructs file blob `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on a missing or corrupt object.
    pub fn get_file(&self, id: Hash) -> Result<Vec<u8>, Error> {
        Ok(self.store.get_file(id)?)
    }

    /// True if file blob `id` is known.
    pub fn file_exists(&self, id: Hash) -> Result<bool, Error> {
        Ok(self.store.file_exists(id)?)
    }

    /// Reconstructs and parses manifest `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on a missing or corrupt object, or
    /// [`Error::MalformedManifest`] if the reconstructed bytes do not parse.
    pub fn get_manifest(&self, id: Hash) -> Result<Manifest, Error> {
        let bytes = self.store.get_manifest(id)?;
        parse_manifest(id, &bytes)
    }

    /// True if manifest `id` is known.
    pub fn manifest_exists(&self, id: Hash) -> Result<bool, Error> {
        Ok(self.store.manifest_exists(id)?)
    }

    /// Reconstructs and parses revision `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on a missing or corrupt object, or
    /// [`Error::MalformedRevision`] if the reconstructed bytes do not parse.
    pub fn get_revision(&self, id: Hash) -> Result<Revision, Error> {
        let bytes = self.store.get_revision(id)?;
        parse_revision(id, &bytes)
    }

    /// True if revision `id` is known.
    pub fn revision_exists(&self, id: Hash) -> Result<bool, Error> {
        Ok(self.store.revision_exists(id)?)
    }

    // -- blob writes (dependency order: files, then manifests, then the
    // revision) --------------------------------------------------------------

    /// Inserts `bytes` as a full file blob under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if `id` does not match the hash of `bytes`.
    pub fn put_file_full(&self, id: Hash, bytes: &[u8]) -> Result<PutOutcome, Error> {
        Ok(self.store.put_file_full(id, bytes)?)
    }

    /// Writes `new_bytes` as the newest version superseding `old_id`,
    /// rewriting `old_id` as a reverse delta in the same call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on any storage failure.
    pub fn put_file_version(&self, old_id: Hash, new_bytes: &[u8]) -> Result<Hash, Error> {
        Ok(self.store.put_file_version(old_id, new_bytes)?)
    }

    /// Inserts `bytes` as a full manifest blob under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if `id` does not match the hash of `bytes`.
    pub fn put_manifest_full(&self, id: Hash, bytes: &[u8]) -> Result<PutOutcome, Error> {
        Ok(self.store.put_manifest_full(id, bytes)?)
    }

    /// Writes `new_bytes` as the newest manifest version superseding
    /// `old_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on any storage failure.
    pub fn put_manifest_version(&self, old_id: Hash, new_bytes: &[u8]) -> Result<Hash, Error> {
        Ok(self.store.put_manifest_version(old_id, new_bytes)?)
    }

    // -- the revision-write API --------------------------

    /// Writes a fully formed `revision` plus its accompanying `certs` in one
    /// transaction. Files and manifests are assumed already written ahead of
    /// this call.
    ///
    /// Checks that every edge's change-set, applied to the parent manifest,
    /// reproduces the revision's new manifest before storing anything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManifestSanityCheckFailed`] if the check fails, or
    /// [`Error::Store`]/[`Error::ChangeSet`] if a dependency lookup or the
    /// write itself fails. On any error, nothing is written.
    pub fn put_revision(&self, revision: &Revision, certs: &[Cert]) -> Result<Hash, Error> {
        let id = revision.id();
        for edge in &revision.edges {
            let Some(parent_manifest) = edge.parent_manifest else {
                continue;
            };
            let parent = self.get_manifest(parent_manifest)?;
            let derived = edge.change_set.apply_to_manifest(&parent)?;
            if derived.canonical_hash() != revision.new_manifest {
                return Err(Error::ManifestSanityCheckFailed {
                    revision: id,
                    parent: edge.parent_revision,
                });
            }
        }

        let txn = self.begin()?;
        self.store.put_revision_full(id, revision.to_canonical_text().as_bytes())?;
        for cert in certs {
            self.store.put_cert(&revctl_store::CertRow {
                cert_hash: cert.cert_hash(),
                target: cert.target,
                name: cert.name.clone(),
                value: cert.value.clone(),
                signer: cert.signer.clone(),
                signature: cert.signature.clone(),
            })?;
        }
        txn.commit()?;
        Ok(id)
    }

    // -- the merge-two-heads API ------------------------

    /// Merges `left` and `right`, attaching the four standard
    /// certs (branch, author, date, changelog) to a clean result.
    ///
    /// The changelog cert is set to the fixed template `"merge of {left} and
    /// {right}"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Merge`] if either head, or any revision on the
    /// ancestry walk between them, is missing or fails to parse.
    #[allow(clippy::too_many_arguments)]
    pub fn merge_heads(
        &self,
        left: Hash,
        right: Hash,
        signer: &Keypair,
        signer_key_name: &str,
        branch: &str,
        author: &str,
        date: &str,
    ) -> Result<MergeOutcome, Error> {
        let engine = revctl_merge::MergeEngine::new(&self.store);
        let outcome = engine.merge_heads(left, right)?;
        let MergeOutcome::Merged(revision) = outcome else {
            return Ok(outcome);
        };

        let cert_list = certs::merge_certs(signer, signer_key_name, revision.id(), branch, author, date, left, right);
        let txn = self.begin()?;
        for cert in &cert_list {
            self.store.put_cert(&revctl_store::CertRow {
                cert_hash: cert.cert_hash(),
                target: cert.target,
                name: cert.name.clone(),
                value: cert.value.clone(),
                signer: cert.signer.clone(),
                signature: cert.signature.clone(),
            })?;
        }
        txn.commit()?;
        Ok(MergeOutcome::Merged(revision))
    }

    /// See [`revctl_merge::is_ancestor`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Merge`] if a revision on the walked path is missing
    /// or fails to parse.
    pub fn is_ancestor(&self, a: Hash, b: Hash) -> Result<bool, Error> {
        Ok(revctl_merge::is_ancestor(&self.store, a, b)?)
    }

    /// See [`revctl_merge::common_ancestor`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Merge`] if a revision on either ancestry walk is
    /// missing or fails to parse.
    pub fn common_ancestor(&self, a: Hash, b: Hash) -> Result<Option<Hash>, Error> {
        Ok(revctl_merge::common_ancestor(&self.store, a, b)?)
    }

    /// See [`revctl_merge::annotate`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Merge`] if a revision or manifest on the walked
    /// ancestry is missing or fails to parse.
    pub fn annotate(&self, revision: Hash, path: &Path) -> Result<AnnotateResult, Error> {
        Ok(revctl_merge::annotate(&self.store, revision, path)?)
    }

    // -- certs and trust ----------------------------------------

    /// Every cert attached to `target`, unfiltered. Callers apply
    /// [`Self::erase_bogus_certs`] before trusting anything here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the store cannot be read.
    pub fn read_certs(&self, target: Hash) -> Result<Vec<Cert>, Error> {
        Ok(self
            .store
            .certs_for_target(target)?
            .into_iter()
            .map(|row| Cert {
                target: row.target,
                name: row.name,
                value: row.value,
                signer: row.signer,
                signature: row.signature,
            })
            .collect())
    }

    /// Checks a single cert's signature.
    #[must_use]
    pub fn check_cert(&self, cert: &Cert, lookup_key: &dyn Fn(&str) -> Option<PublicKey>) -> CertCheck {
        revctl_cert::check_cert(cert, lookup_key)
    }

    /// Filters `certs` down to those that verify *and* are trusted. A cert
    /// from an unknown or untrusted key never survives this call.
    #[must_use]
    pub fn erase_bogus_certs(
        &self,
        certs: Vec<Cert>,
        lookup_key: &dyn Fn(&str) -> Option<PublicKey>,
        is_trusted: &dyn Fn(&Cert) -> bool,
    ) -> Vec<Cert> {
        revctl_cert::erase_bogus_certs(certs, lookup_key, is_trusted)
    }

    /// The heads of branch `branch_name`: revisions
    /// carrying a trusted `branch = branch_name` cert with no descendant in
    /// the store that also carries one. The ancestry check is this facade's
    /// own [`Self::is_ancestor`], wiring `revctl-cert`'s callback-based
    /// `branch_heads` to the real DAG walk in `revctl-merge`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cert`] or [`Error::Merge`] if the underlying reads
    /// or ancestry walks fail.
    pub fn branch_heads(
        &self,
        branch_name: &str,
        lookup_key: &dyn Fn(&str) -> Option<PublicKey>,
        is_trusted: &dyn Fn(&Cert) -> bool,
    ) -> Result<Vec<Hash>, Error> {
        let is_ancestor = |a: Hash, b: Hash| revctl_merge::is_ancestor(&self.store, a, b).unwrap_or(false);
        Ok(revctl_cert::branch_heads(
            &self.store,
            branch_name,
            lookup_key,
            is_trusted,
            &is_ancestor,
        )?)
    }

    // -- keys ----------------------------------------------------------------

    /// Registers `public_key` (and, if the embedder supplies it,
    /// `private_key`) under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the store cannot be written.
    pub fn put_key(&self, name: &str, public_key: &PublicKey, private_key: Option<&Keypair>) -> Result<(), Error> {
        let private_bytes = private_key.map(Keypair::to_secret_bytes);
        Ok(self
            .store
            .put_key(name, &public_key.to_bytes(), private_bytes.as_ref().map(|b| &b[..]))?)
    }

    /// Looks up the public key registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the store cannot be read, or
    /// [`Error::Cert`]-wrapped parse failure if the stored bytes are
    /// malformed.
    pub fn get_public_key(&self, name: &str) -> Result<Option<PublicKey>, Error> {
        let Some(bytes) = self.store.get_public_key(name)? else {
            return Ok(None);
        };
        Ok(Some(PublicKey::from_bytes(&bytes).map_err(|e| Error::MalformedKey {
            name: name.to_string(),
            detail: e.to_string(),
        })?))
    }
}
