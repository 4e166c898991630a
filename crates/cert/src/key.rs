use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;

use crate::error::KeyError;

/// An asymmetric signing identity, named by convention `localname@domain`
/// at the store layer — this type only carries the key
/// material, not the name.
///
/// Wraps [`ed25519_dalek::SigningKey`] rather than the RSA primitive the
/// original system used; per SPEC_FULL §1 Non-goals the signature algorithm
/// is not mandated, and Ed25519 is the only asymmetric signing primitive
/// used anywhere in this crate's retrieval pack.
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    /// Generates a new random keypair.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Reconstructs a keypair from its 32-byte secret scalar, as read back
    /// from the embedder's private key storage. The on-disk format for that
    /// storage is not this crate's concern.
    #[must_use]
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(bytes),
        }
    }

    /// The 32-byte secret scalar, for handing to the embedder's key store.
    #[must_use]
    pub fn to_secret_bytes(&self) -> [u8; 32] {
        self.signing.to_bytes()
    }

    /// The public half of this keypair.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key())
    }

    /// Signs `message`, returning the raw 64-byte signature.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }
}

/// The public half of a [`Keypair`], sufficient to validate certs.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Parses a public key from its 32-byte encoding.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] if `bytes` is not a valid Ed25519 public key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| KeyError::WrongLength { len: bytes.len() })?;
        VerifyingKey::from_bytes(&array)
            .map(PublicKey)
            .map_err(|_| KeyError::Malformed)
    }

    /// The 32-byte encoding of this public key.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// True if `signature` is a valid Ed25519 signature of `message` under
    /// this public key.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let signature = Signature::from_bytes(&sig_bytes);
        self.0.verify(message, &signature).is_ok()
    }
}
