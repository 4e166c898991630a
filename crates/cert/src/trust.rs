use crate::cert::Cert;
use crate::key::PublicKey;

/// The outcome of checking a cert's signature against the store's known
/// keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CertCheck {
    /// The signature verifies under the referenced key.
    Ok,
    /// The signature does not verify.
    Bad,
    /// The referenced key is not known.
    UnknownKey,
}

/// Checks `cert`'s signature, looking up its signer via `lookup_key`.
///
/// This function alone does not decide *trust* — only whether the
/// signature is cryptographically valid. Whether an [`CertCheck::Ok`] cert
/// from a known-but-unvetted key should influence higher-level computations
/// is the caller's policy, applied by [`erase_bogus_certs`].
pub fn check_cert(cert: &Cert, lookup_key: &dyn Fn(&str) -> Option<PublicKey>) -> CertCheck {
    let Some(key) = lookup_key(&cert.signer) else {
        return CertCheck::UnknownKey;
    };
    if key.verify(cert.signable_text().as_bytes(), &cert.signature) {
        CertCheck::Ok
    } else {
        CertCheck::Bad
    }
}

/// Filters `certs` down to those that verify *and* are trusted, per
/// `is_trusted` — a caller policy hook that decides whether an `ok` cert
/// from a given key is *trusted*.
///
/// Called before any higher-level computation (branch-head resolution,
/// display of author/changelog certs, …) consumes a cert list, so a cert
/// from an unknown or untrusted key never influences the result.
#[must_use]
pub fn erase_bogus_certs(
    certs: Vec<Cert>,
    lookup_key: &dyn Fn(&str) -> Option<PublicKey>,
    is_trusted: &dyn Fn(&Cert) -> bool,
) -> Vec<Cert> {
    certs
        .into_iter()
        .filter(|cert| check_cert(cert, lookup_key) == CertCheck::Ok && is_trusted(cert))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::AUTHOR;
    use crate::key::Keypair;
    use revctl_hash::Hash;

    #[test]
    fn unknown_key_is_reported_as_unknown() {
        let keypair = Keypair::generate();
        let cert = Cert::sign(&keypair, "ghost@example.com", Hash::of(b"rev"), AUTHOR, b"x".to_vec());
        let result = check_cert(&cert, &|_| None);
        assert_eq!(result, CertCheck::UnknownKey);
    }

    #[test]
    fn bad_signature_is_reported_as_bad() {
        let keypair = Keypair::generate();
        let mut cert = Cert::sign(&keypair, "alice@example.com", Hash::of(b"rev"), AUTHOR, b"x".to_vec());
        cert.value = b"tampered".to_vec();
        let pk = keypair.public_key();
        let result = check_cert(&cert, &move |_| Some(pk));
        assert_eq!(result, CertCheck::Bad);
    }

    #[test]
    fn erase_bogus_certs_drops_unknown_and_untrusted() {
        let known = Keypair::generate();
        let unknown = Keypair::generate();
        let known_pub = known.public_key();

        let good = Cert::sign(&known, "alice@example.com", Hash::of(b"rev"), AUTHOR, b"alice".to_vec());
        let from_unknown_key =
            Cert::sign(&unknown, "mallory@example.com", Hash::of(b"rev"), AUTHOR, b"mallory".to_vec());

        let lookup = move |signer: &str| -> Option<PublicKey> {
            if signer == "alice@example.com" {
                Some(known_pub)
            } else {
                None
            }
        };
        let filtered = erase_bogus_certs(
            vec![good.clone(), from_unknown_key],
            &lookup,
            &|_| true,
        );
        assert_eq!(filtered, vec![good]);
    }

    #[test]
    fn erase_bogus_certs_honours_untrusted_policy_even_when_signature_is_valid() {
        let known = Keypair::generate();
        let known_pub = known.public_key();
        let cert = Cert::sign(&known, "alice@example.com", Hash::of(b"rev"), AUTHOR, b"alice".to_vec());
        let lookup = move |_: &str| Some(known_pub);
        let filtered = erase_bogus_certs(vec![cert], &lookup, &|_| false);
        assert!(filtered.is_empty());
    }
}
