use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use revctl_hash::Hash;

use crate::key::Keypair;

/// The standard cert names whose wire spelling must be preserved bit-exactly
///.
pub const BRANCH: &str = "branch";
/// See [`BRANCH`].
pub const AUTHOR: &str = "author";
/// See [`BRANCH`].
pub const DATE: &str = "date";
/// See [`BRANCH`].
pub const CHANGELOG: &str = "changelog";
/// See [`BRANCH`].
pub const COMMENT: &str = "comment";
/// See [`BRANCH`].
pub const TAG: &str = "tag";
/// See [`BRANCH`].
pub const TESTRESULT: &str = "testresult";

/// A signed name/value fact attached to a revision.
///
/// Certs are value types: two certs with identical fields are
/// indistinguishable, and a cert carries no reference to where it is
/// stored. `Cert` does not verify its own signature — that is
/// [`crate::check_cert`]'s job, since verification needs a key lookup the
/// cert itself does not carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cert {
    /// The revision this cert is attached to.
    pub target: Hash,
    /// The cert name, e.g. [`BRANCH`] or [`AUTHOR`].
    pub name: String,
    /// The asserted value.
    pub value: Vec<u8>,
    /// `localname@domain` identifying the signing key.
    pub signer: String,
    /// The Ed25519 signature over [`Cert::signable_text`].
    pub signature: Vec<u8>,
}

impl Cert {
    /// The canonical signable text, `"[name@target:base64(value)]"`. This
    /// exact byte sequence is what [`Keypair::sign`] signs and what
    /// [`crate::check_cert`] verifies against.
    #[must_use]
    pub fn signable_text(&self) -> String {
        format!("[{}@{}:{}]", self.name, self.target, BASE64.encode(&self.value))
    }

    /// Signs a new cert over `target`/`name`/`value` with `keypair`, whose
    /// public key is assumed to be registered under `signer_key_name`.
    #[must_use]
    pub fn sign(
        keypair: &Keypair,
        signer_key_name: impl Into<String>,
        target: Hash,
        name: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        let signer = signer_key_name.into();
        let name = name.into();
        let value = value.into();
        let mut cert = Self {
            target,
            name,
            value,
            signer,
            signature: Vec::new(),
        };
        cert.signature = keypair.sign(cert.signable_text().as_bytes()).to_vec();
        cert
    }

    /// The hash identifying this cert, taken over its five canonical fields
    /// joined by newlines (target, name, base64(value), signer,
    /// base64(signature)) — see DESIGN.md for why this form was chosen over
    /// the four-field signable text, which omits the signer and signature.
    #[must_use]
    pub fn cert_hash(&self) -> Hash {
        let mut text = String::new();
        text.push_str(&self.target.to_string());
        text.push('\n');
        text.push_str(&self.name);
        text.push('\n');
        text.push_str(&BASE64.encode(&self.value));
        text.push('\n');
        text.push_str(&self.signer);
        text.push('\n');
        text.push_str(&BASE64.encode(&self.signature));
        text.push('\n');
        Hash::of(text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signable_text_matches_spec_shape() {
        let cert = Cert {
            target: Hash::of(b"rev"),
            name: AUTHOR.to_string(),
            value: b"alice".to_vec(),
            signer: "alice@example.com".to_string(),
            signature: Vec::new(),
        };
        let text = cert.signable_text();
        assert!(text.starts_with("[author@"));
        assert!(text.ends_with(']'));
    }

    #[test]
    fn sign_produces_a_verifiable_signature() {
        let keypair = Keypair::generate();
        let cert = Cert::sign(&keypair, "alice@example.com", Hash::of(b"rev"), AUTHOR, b"alice".to_vec());
        assert!(keypair.public_key().verify(cert.signable_text().as_bytes(), &cert.signature));
    }

    #[test]
    fn cert_hash_is_stable_for_identical_fields() {
        let keypair = Keypair::generate();
        let a = Cert::sign(&keypair, "alice@example.com", Hash::of(b"rev"), AUTHOR, b"alice".to_vec());
        let b = a.clone();
        assert_eq!(a.cert_hash(), b.cert_hash());
    }
}
