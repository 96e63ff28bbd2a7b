//! Error types for the archive engine.

use thiserror::Error;

use crate::format::{ACCESS_KEY_LEN, FORMAT_VERSION};

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the archive engine.
///
/// All variants are surfaced to the caller unchanged; nothing is retried
/// inside the engine. [`Error::AuthFailed`] is the signal for a wrong key
/// or a tampered file.
#[derive(Debug, Error)]
pub enum Error {
    /// The access key is not exactly [`ACCESS_KEY_LEN`] bytes.
    #[error("invalid access key: expected {ACCESS_KEY_LEN} bytes, got {0}")]
    BadKeyLength(usize),

    /// A cipher could not be initialized from the supplied key material.
    #[error("cipher initialization failed: wrong key length")]
    CodecInit,

    /// An encrypted blob is too short to carry a nonce.
    #[error("malformed input: short nonce")]
    ShortInput,

    /// AEAD tag verification failed: wrong key or corrupted ciphertext.
    #[error("authentication failed")]
    AuthFailed,

    /// The envelope declares a format version this crate does not read.
    #[error("version mismatch: got {found}, want {FORMAT_VERSION}")]
    VersionMismatch {
        /// Version found in the envelope.
        found: i64,
    },

    /// Envelope or payload JSON does not parse, or a log entry is missing
    /// required fields.
    #[error("malformed archive: {0}")]
    Malformed(String),

    /// An unrecognised operation code was found while replaying the log.
    #[error("unknown log operation {0:?}")]
    UnknownOp(String),

    /// Snappy decoding of the payload failed.
    #[error("decompression failed: {0}")]
    CompressionFailed(String),

    /// The reader or writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
