use revctl_hash::Hash;
use revctl_store::SqliteStore;

use crate::cert::{Cert, BRANCH};
use crate::error::CertError;
use crate::key::PublicKey;
use crate::trust::erase_bogus_certs;

/// Reads every cert named [`BRANCH`] attached to `target` out of `store`
/// and reconstructs them as [`Cert`] values.
fn branch_certs_for(store: &SqliteStore, target: Hash) -> Result<Vec<Cert>, CertError> {
    Ok(store
        .certs_for_target(target)?
        .into_iter()
        .filter(|row| row.name == BRANCH)
        .map(|row| Cert {
            target: row.target,
            name: row.name,
            value: row.value,
            signer: row.signer,
            signature: row.signature,
        })
        .collect())
}

/// Computes the heads of branch `branch_name`: the revisions carrying a
/// trusted `branch = branch_name` cert with no descendant in the store that
/// also carries a trusted cert for the same branch.
///
/// `is_ancestor(a, b)` must answer "is `a` an ancestor of `b`?" — this crate
/// depends only on `revctl-store`, so the revision-DAG walk that answers
/// that question is supplied by the caller (the `revctl` facade, backed by
/// `revctl-merge`) rather than implemented a second time here.
///
/// # Errors
///
/// Returns [`CertError`] if the store cannot be read.
pub fn branch_heads(
    store: &SqliteStore,
    branch_name: &str,
    lookup_key: &dyn Fn(&str) -> Option<PublicKey>,
    is_trusted: &dyn Fn(&Cert) -> bool,
    is_ancestor: &dyn Fn(Hash, Hash) -> bool,
) -> Result<Vec<Hash>, CertError> {
    let candidates = store.targets_with_cert_name(BRANCH)?;
    let mut in_branch = Vec::new();
    for target in candidates {
        let certs = branch_certs_for(store, target)?;
        let matching: Vec<Cert> = certs.into_iter().filter(|c| c.value == branch_name.as_bytes()).collect();
        let trusted = erase_bogus_certs(matching, lookup_key, is_trusted);
        if !trusted.is_empty() {
            in_branch.push(target);
        }
    }

    let heads = in_branch
        .iter()
        .copied()
        .filter(|&candidate| {
            !in_branch
                .iter()
                .any(|&other| other != candidate && is_ancestor(candidate, other))
        })
        .collect();
    Ok(heads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Keypair;
    use revctl_store::CertRow;

    fn store_cert(store: &SqliteStore, cert: &Cert) {
        store
            .put_cert(&CertRow {
                cert_hash: cert.cert_hash(),
                target: cert.target,
                name: cert.name.clone(),
                value: cert.value.clone(),
                signer: cert.signer.clone(),
                signature: cert.signature.clone(),
            })
            .unwrap();
    }

    #[test]
    fn heads_excludes_ancestors_in_the_same_branch() {
        let store = SqliteStore::open_in_memory().unwrap();
        let keypair = Keypair::generate();
        let pub_key = keypair.public_key();

        let root = Hash::of(b"root");
        let child = Hash::of(b"child");
        for target in [root, child] {
            let cert = Cert::sign(&keypair, "alice@example.com", target, BRANCH, b"trunk".to_vec());
            store_cert(&store, &cert);
        }

        let lookup = move |_: &str| Some(pub_key);
        let is_ancestor = |a: Hash, b: Hash| a == root && b == child;
        let heads = branch_heads(&store, "trunk", &lookup, &|_| true, &is_ancestor).unwrap();
        assert_eq!(heads, vec![child]);
    }

    #[test]
    fn untrusted_cert_does_not_count_toward_branch_membership() {
        let store = SqliteStore::open_in_memory().unwrap();
        let keypair = Keypair::generate();
        let pub_key = keypair.public_key();
        let rev = Hash::of(b"rev");
        let cert = Cert::sign(&keypair, "mallory@example.com", rev, BRANCH, b"trunk".to_vec());
        store_cert(&store, &cert);

        let lookup = move |_: &str| Some(pub_key);
        let heads = branch_heads(&store, "trunk", &lookup, &|_| false, &|_, _| false).unwrap();
        assert!(heads.is_empty());
    }
}
