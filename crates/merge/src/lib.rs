//! The three-way merge engine.
//!
//! # Overview
//!
//! Given two head revisions, this crate computes their common ancestor,
//! three-way merges their manifests (falling back to an LCS-based line merge
//! for any path both sides edited), and assembles the resulting merge
//! [`Revision`]. It also supplies the revision-DAG ancestor queries
//! ([`is_ancestor`], [`common_ancestor`]) that `revctl-cert`'s branch-head
//! computation needs, and the blame/[`annotate`] algorithm.
//!
//! # Design
//!
//! [`Revision`] and [`Edge`] live here rather than in the `revctl` facade
//! crate: the ancestor walk and the merge-revision assembly below are the
//! operations that actually parse and construct revisions, and putting the
//! type where its consumers are avoids a facade↔merge circular dependency.
//! The facade re-exports both unchanged.
//!
//! [`MergeEngine::merge_heads`] writes only the merge revision on success,
//! not certs — attaching the standard certs (author, date, branch,
//! changelog) needs `revctl-cert`, which this crate deliberately does not
//! depend on. The
//! facade wraps [`MergeEngine::merge_heads`] and attaches those certs in the
//! same transaction.
//!
//! # Invariants
//!
//! - `hash(Revision::to_canonical_text(r)) == r.id()` for every revision.
//! - For every edge `(p, pm, cs)` of a revision `r` with non-null `p`:
//!   `cs.apply_to_manifest(manifest_of(pm)) == manifest_of(r.new_manifest)`.
//! - The revision graph reachable through [`is_ancestor`] and
//!   [`common_ancestor`] is acyclic.
//!
//! # Errors
//!
//! All fallible operations return [`MergeError`]. A merge that cannot be
//! resolved cleanly is not an error: [`engine::MergeOutcome::Conflict`]
//! carries the structured conflict list instead.
//!
//! # Examples
//!
//! ```
//! use revctl_changeset::{ChangeSet, Manifest, Path};
//! use revctl_hash::Hash;
//! use revctl_merge::{Edge, MergeEngine, MergeOutcome, Revision};
//! use revctl_store::SqliteStore;
//!
//! let store = SqliteStore::open_in_memory().unwrap();
//! let file = Hash::of(b"1\n2\n3\n");
//! let txn = store.transaction().unwrap();
//! store.put_file_full(file, b"1\n2\n3\n").unwrap();
//! let cs = ChangeSet::builder().add_file(Path::new("p").unwrap(), file).build();
//! let manifest = cs.apply_to_manifest(&Manifest::empty()).unwrap();
//! store.put_manifest_full(manifest.canonical_hash(), &manifest.to_canonical_bytes()).unwrap();
//! let root = Revision {
//!     new_manifest: manifest.canonical_hash(),
//!     edges: vec![Edge { parent_revision: None, parent_manifest: None, change_set: cs }],
//! };
//! store.put_revision_full(root.id(), root.to_canonical_text().as_bytes()).unwrap();
//! txn.commit().unwrap();
//!
//! let engine = MergeEngine::new(&store);
//! assert!(engine.is_ancestor(root.id(), root.id()).unwrap());
//! ```
//!
//! # See also
//!
//! `revctl-changeset` for the change-set algebra this crate builds on;
//! `revctl-cert` for the trust layer whose `branch_heads` takes
//! [`is_ancestor`] as a callback to avoid depending on this crate.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod ancestor;
mod annotate;
mod content_merge;
mod engine;
mod error;
mod manifest_merge;
mod revision;

pub use ancestor::{common_ancestor, is_ancestor};
pub use annotate::{annotate, AnnotateResult};
pub use content_merge::{three_way_merge, ContentMergeOutcome};
pub use engine::{MergeEngine, MergeOutcome};
pub use error::MergeError;
pub use manifest_merge::{merge_manifests, ManifestConflict, ManifestMergeResult};
pub use revision::{Edge, Revision};
