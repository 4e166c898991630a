use std::fmt;
use std::str::FromStr;

use sha1::{Digest, Sha1};

use crate::error::HashError;

/// Number of raw bytes in a [`Hash`] (160 bits).
pub const HASH_BYTES: usize = 20;
/// Number of hex characters in a [`Hash`]'s canonical text form.
pub const HASH_HEX_LEN: usize = HASH_BYTES * 2;

/// A 160-bit content hash, rendered canonically as 40 lowercase hex characters.
///
/// `Hash` never represents the "null" id used for a revision's absent parent;
/// callers that need to distinguish "no revision" from "a revision" should use
/// `Option<Hash>`. The null revision is a distinguished sentinel, not a
/// hashable value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; HASH_BYTES]);

impl Hash {
    /// Hashes `bytes`, producing the canonical content hash.
    ///
    /// # Examples
    ///
    /// ```
    /// use revctl_hash::Hash;
    ///
    /// let h = Hash::of(b"hello\n");
    /// assert_eq!(h.to_string(), "f572d396fae9206628714fb2ce00f72e94f2258");
    /// ```
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        let mut out = [0u8; HASH_BYTES];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// The hash of the empty byte string, used as the fixed identity of a
    /// zero-entry manifest.
    #[must_use]
    pub fn of_empty() -> Self {
        Self::of(b"")
    }

    /// Raw 20 hash bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; HASH_BYTES] {
        &self.0
    }

    /// Builds a `Hash` from raw bytes without hashing them, used when a hash
    /// is read back from canonical text or storage and already known to be
    /// correct by construction (verified separately where it matters, e.g.
    /// object store reconstruction).
    #[must_use]
    pub fn from_raw(bytes: [u8; HASH_BYTES]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({self})")
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Hash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HASH_HEX_LEN {
            return Err(HashError::WrongLength { len: s.len() });
        }
        let mut out = [0u8; HASH_BYTES];
        hex::decode_to_slice(s, &mut out).map_err(|_| HashError::NotHex)?;
        Ok(Self(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_of_hello_matches_known_sha1() {
        let h = Hash::of(b"hello\n");
        assert_eq!(h.to_string(), "f572d396fae9206628714fb2ce00f72e94f2258");
    }

    #[test]
    fn empty_manifest_hash_is_fixed() {
        assert_eq!(
            Hash::of_empty().to_string(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[test]
    fn round_trips_through_display_and_from_str() {
        let h = Hash::of(b"round trip me");
        let parsed: Hash = h.to_string().parse().unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            "deadbeef".parse::<Hash>(),
            Err(HashError::WrongLength { len: 8 })
        ));
    }

    #[test]
    fn rejects_non_hex() {
        assert!(matches!(
            "z".repeat(HASH_HEX_LEN).parse::<Hash>(),
            Err(HashError::NotHex)
        ));
    }
}
