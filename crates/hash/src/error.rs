use std::fmt;

/// Errors raised while parsing a [`crate::Hash`] from its canonical text form.
///
/// Implemented by hand rather than via `thiserror`, matching the style of
/// other leaf-level parse errors in this codebase.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HashError {
    /// The input was not exactly 40 characters long.
    WrongLength {
        /// Number of bytes the caller supplied.
        len: usize,
    },
    /// The input contained non-hexadecimal characters.
    NotHex,
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongLength { len } => {
                write!(f, "hash must be 40 hex characters, got {len}")
            }
            Self::NotHex => write!(f, "hash contains non-hexadecimal characters"),
        }
    }
}

impl std::error::Error for HashError {}

/// Errors raised while applying or composing binary deltas.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum DeltaError {
    /// A directive referenced a source line past the end of the base text.
    #[error("delta directive references position {position} past base length {base_len}")]
    PositionOutOfRange {
        /// Position named by the offending directive.
        position: usize,
        /// Number of lines in the base text the delta was applied to.
        base_len: usize,
    },
    /// A directive's header line could not be parsed.
    #[error("malformed delta directive: {0}")]
    MalformedDirective(String),
    /// An `a` directive's line count did not match the number of literal
    /// lines actually present in the delta.
    #[error("add directive declared {declared} lines but {found} were present")]
    TruncatedLiteral {
        /// Lines declared by the directive header.
        declared: usize,
        /// Lines actually found before the next directive or end of input.
        found: usize,
    },
}

/// Errors raised while encoding or decoding the canonical blob wire form
/// (base64 of gzipped bytes).
#[derive(Debug, thiserror::Error)]
pub enum BlobCodecError {
    /// The base64 envelope could not be decoded.
    #[error("invalid base64 in blob payload: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The gzip stream could not be inflated.
    #[error("invalid gzip stream in blob payload: {0}")]
    Gzip(#[source] std::io::Error),
}
