//! Canonical content hashing and the reverse-delta binary codec.
//!
//! # Overview
//!
//! This crate provides the two primitives every other `revctl` crate builds
//! on: a 160-bit content [`Hash`] and a binary [`Delta`] format for encoding
//! one file version as an edit against another. Nothing here knows about
//! manifests, revisions, or storage — those live in `revctl-changeset` and
//! `revctl-store`.
//!
//! # Design
//!
//! The delta format is intentionally line-oriented rather than byte-oriented:
//! `diff` splits both inputs into lines (via an internal helper that keeps
//! each line's trailing `\n`) and finds their longest common subsequence,
//! emitting `a`/`d` directives for the gaps between matches. The same
//! [`lcs_indices`] routine is reused one layer up by the three-way merge and
//! annotate algorithms in `revctl-merge`, so this crate is the algorithmic
//! core for both line-level diffing and file-level merge.
//!
//! # Invariants
//!
//! - `apply(&diff(base, target), base) == Ok(target)` for any two byte
//!   strings, including empty ones.
//! - [`Delta::encode`] followed by [`Delta::decode`] reproduces the original
//!   delta's directive sequence exactly.
//! - [`PiecewiseApplicator`] never materialises more than one source image
//!   and one destination image at a time, regardless of chain length.
//!
//! # Errors
//!
//! Parsing a [`Hash`] from text can fail with [`HashError`]; applying or
//! decoding a [`Delta`] can fail with [`DeltaError`]; encoding or decoding the
//! canonical blob wire form can fail with [`BlobCodecError`]. None of these
//! crate's operations panic on attacker-controlled input.
//!
//! # Examples
//!
//! ```
//! use revctl_hash::{diff, apply};
//!
//! let base = b"one\ntwo\nthree\n";
//! let target = b"one\nTWO\nthree\n";
//! let delta = diff(base, target);
//! assert_eq!(apply(&delta, base).unwrap(), target);
//! ```
//!
//! # See also
//!
//! `revctl-store` for how deltas are chained and reconstructed from SQLite;
//! `revctl-merge` for the three-way use of [`lcs_indices`].

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod blob;
mod delta;
mod error;
mod hash;
mod lcs;

pub use blob::{decode as decode_blob, encode as encode_blob};
pub use delta::{apply, diff, Delta, DeltaOp, PiecewiseApplicator};
pub use error::{BlobCodecError, DeltaError, HashError};
pub use hash::{Hash, HASH_BYTES, HASH_HEX_LEN};
pub use lcs::lcs_indices;
