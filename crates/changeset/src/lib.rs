//! The manifest and change-set algebra.
//!
//! # Overview
//!
//! A [`Manifest`] is an immutable path→file-hash snapshot; a [`ChangeSet`]
//! describes the transition between two manifests as a path rearrangement
//! (adds, deletes, renames) followed by per-file content deltas. Together
//! they give the revision DAG (built one layer up, in `revctl-merge` and the
//! `revctl` facade) a composable algebra: change-sets concatenate, invert,
//! and merge.
//!
//! # Design
//!
//! [`Path`] is a validated newtype, never a raw `PathBuf` — construction is
//! the one place path-format invariants (relative, no `..`, no reserved
//! bookkeeping prefix) are enforced, so every other module can treat a
//! `Path` as already-valid. [`Manifest`] stores its entries in a `BTreeMap`
//! so canonical serialisation never needs an explicit sort.
//!
//! # Invariants
//!
//! - [`Manifest::to_canonical_bytes`] followed by
//!   [`Manifest::from_canonical_bytes`] reproduces the manifest exactly.
//! - For every change-set `cs` produced by [`ChangeSet::diff_manifests`]:
//!   `cs.apply_to_manifest(old) == Ok(new)`.
//! - For every change-set `cs` and source manifest `m`:
//!   `cs.invert(m).and_then(|inv| inv.apply_to_manifest(cs.apply_to_manifest(m)?)) == Ok(m)`.
//!
//! # Errors
//!
//! Path validation failures surface as [`PathError`]; change-set algebra
//! precondition failures (a rename of a nonexistent path, a duplicate add
//! target, an inconsistent composition) surface as [`ChangeSetError`].
//!
//! # See also
//!
//! `revctl-merge` for three-way manifest merge and conflict surfacing built
//! on top of [`ChangeSet::merge`]; `revctl-store` for how manifests and their
//! hashes are persisted.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod canonical;
mod changeset;
mod error;
mod manifest;
mod path;

pub use canonical::parse_canonical_text;
pub use changeset::{ChangeSet, ChangeSetBuilder, MergeConflict};
pub use error::{ChangeSetError, PathError};
pub use manifest::Manifest;
pub use path::{Path, RESERVED_BOOKKEEPING_DIR};
