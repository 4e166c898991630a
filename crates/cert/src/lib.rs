//! Cryptographic certs and the trust layer.
//!
//! # Overview
//!
//! A [`Cert`] is a signed `(target, name, value, signer, signature)` tuple
//! attached to a revision. This crate supplies three things built on top of
//! that value type:
//!
//! - [`Keypair`]/[`PublicKey`]: Ed25519 key material and signing/verification.
//! - [`check_cert`]/[`erase_bogus_certs`]: turning a raw, possibly-forged cert
//!   list into the subset a caller's trust policy accepts.
//! - [`branch_heads`]: branch-head resolution built on top of the above plus
//!   a caller-supplied ancestry check.
//!
//! # Design
//!
//! Certs are pure value types — signing and verifying them touches neither
//! the object store nor the revision DAG. Storage (`revctl-store`) only ever
//! sees opaque rows; this crate is the layer that gives those rows meaning.
//!
//! This crate depends on `revctl-hash` and `revctl-store` only, not on
//! `revctl-merge`. Where a cert-layer computation
//! needs to know revision ancestry — [`branch_heads`] — the ancestry check is
//! accepted as a callback rather than implemented here a second time; the
//! `revctl` facade, which depends on both this crate and `revctl-merge`,
//! wires the real implementation through.
//!
//! # Errors
//!
//! Operations that touch the store return [`CertError`]; parsing raw key
//! bytes returns [`KeyError`].
//!
//! # See also
//!
//! [`revctl_store::SqliteStore`] for the cert rows this crate interprets.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod branch;
mod cert;
mod error;
mod key;
mod trust;

pub use branch::branch_heads;
pub use cert::{Cert, AUTHOR, BRANCH, CHANGELOG, COMMENT, DATE, TAG, TESTRESULT};
pub use error::{CertError, KeyError};
pub use key::{Keypair, PublicKey};
pub use trust::{check_cert, erase_bogus_certs, CertCheck};
