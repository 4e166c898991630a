/// Errors raised while parsing key material.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum KeyError {
    /// The supplied bytes were not 32 bytes long.
    #[error("public key must be 32 bytes, got {len}")]
    WrongLength {
        /// Number of bytes actually supplied.
        len: usize,
    },
    /// The supplied bytes did not encode a valid Ed25519 point.
    #[error("malformed Ed25519 public key")]
    Malformed,
}

/// Errors raised by the cert and trust layer.
#[derive(Debug, thiserror::Error)]
pub enum CertError {
    /// The underlying object store reported an error.
    #[error(transparent)]
    Store(#[from] revctl_store::StoreError),
    /// A stored value failed to parse as a hash where one was expected.
    #[error(transparent)]
    Hash(#[from] revctl_hash::HashError),
}
