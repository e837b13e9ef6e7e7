//! Decode errors for the boxgraph byte formats.

use thiserror::Error;

/// Errors raised while decoding boxgraph byte streams.
///
/// Encoding never fails; every variant here describes malformed or
/// incompatible input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The input ended before a value could be read.
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes required by the read
        needed: usize,
        /// Bytes left in the input
        remaining: usize,
    },

    /// A length prefix was negative.
    #[error("negative length prefix: {0}")]
    NegativeLength(i32),

    /// A string payload was not valid UTF-8.
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    /// A discriminator tag was not recognised.
    #[error("unknown tag: {0}")]
    UnknownTag(String),

    /// A primitive type tag was not recognised.
    #[error("unknown primitive type: {0}")]
    UnknownPrimitiveType(String),

    /// A field key in the stream does not exist in the target vertex.
    #[error("unknown field key {key}")]
    UnknownField {
        /// The field key found in the stream
        key: u16,
    },

    /// An array field was encoded with a different length than its schema.
    #[error("array length mismatch: expected {expected}, found {found}")]
    ArrayLengthMismatch {
        /// Schema length
        expected: usize,
        /// Encoded length
        found: usize,
    },

    /// An address string was not `uuid[/key...]`.
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    /// A container header did not match.
    #[error("wrong header: expected {expected:?}, found {found:?}")]
    HeaderMismatch {
        /// Header the reader understands
        expected: String,
        /// Header found in the input
        found: String,
    },

    /// A container format version is not supported.
    #[error("wrong version: expected {expected}, found {found}")]
    VersionMismatch {
        /// Version the reader understands
        expected: i32,
        /// Version found in the input
        found: i32,
    },
}

/// Result alias for decode operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;
