//! Error types for BFRES subfile coding.

use thiserror::Error;

/// Errors that can occur when decoding or encoding BFRES subfiles.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error (EOF, malformed strings, bad patch slots).
    #[error("{0}")]
    Common(#[from] veles_common::Error),

    /// A subfile's 4-byte magic did not match its expected constant.
    #[error("invalid signature: expected {expected:?}, got {actual:?}")]
    Signature { expected: [u8; 4], actual: [u8; 4] },

    /// No subfile type is registered for the encountered magic.
    #[error("unknown subfile signature {signature:?}")]
    UnknownSignature { signature: [u8; 4] },

    /// A name already present in a dictionary was inserted again.
    #[error("duplicate dictionary key: {key}")]
    DuplicateKey { key: String },

    /// A user data entry carries an unknown value type tag.
    #[error("unknown user data type {value:#04x}")]
    UnknownUserDataType { value: u8 },
}

/// Result type for BFRES operations.
pub type Result<T> = std::result::Result<T, Error>;
