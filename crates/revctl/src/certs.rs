//! Standard-cert helpers layered on top of [`crate::RevisionStore::put_revision`].

use revctl_cert::{Cert, Keypair, AUTHOR, BRANCH, CHANGELOG, DATE};
use revctl_hash::Hash;

/// The four standard certs [`crate::RevisionStore::merge_heads`] attaches to
/// a freshly written merge revision: branch, author, date, and a changelog
/// set to a fixed template describing the merged pair.
pub(crate) fn merge_certs(
    keypair: &Keypair,
    signer_key_name: &str,
    revision: Hash,
    branch: &str,
    author: &str,
    date: &str,
    left: Hash,
    right: Hash,
) -> Vec<Cert> {
    let changelog = format!("merge of {left} and {right}");
    vec![
        Cert::sign(keypair, signer_key_name, revision, BRANCH, branch.as_bytes().to_vec()),
        Cert::sign(keypair, signer_key_name, revision, AUTHOR, author.as_bytes().to_vec()),
        Cert::sign(keypair, signer_key_name, revision, DATE, date.as_bytes().to_vec()),
        Cert::sign(keypair, signer_key_name, revision, CHANGELOG, changelog.into_bytes()),
    ]
}
