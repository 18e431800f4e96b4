//! Error types for the record batch codec
//!
//! Every fallible operation in the workspace returns [`Result<T>`], aliased to
//! `Result<T, RecordError>`, so callers can propagate with `?`.
//!
//! None of these errors are retried inside the codec. `TransformFailure` and
//! `MalformedBatch` are fatal for the batch they were raised on: the batch has
//! to be discarded and, on the produce side, re-encoded from scratch.

use std::io;
use thiserror::Error;

/// Result type alias for record batch operations
pub type Result<T> = std::result::Result<T, RecordError>;

/// Errors raised while building or decoding record batches
#[derive(Debug, Error)]
pub enum RecordError {
    /// Append or close on a batch that is no longer writable
    #[error("Memory records is not writable")]
    NotWritable,

    /// Read access requested while the batch is still being written
    #[error("Memory records must be closed before it can be read")]
    StillWritable,

    /// An optional compression codec is not compiled into this build
    #[error("Compression codec unavailable: {codec}")]
    CodecUnavailable {
        /// Name of the codec that failed to resolve
        codec: &'static str,
    },

    /// A size or header field could not be decoded
    #[error("Malformed record batch: {0}")]
    MalformedBatch(String),

    /// I/O failure inside a compression transform
    #[error("Compression transform failed: {0}")]
    TransformFailure(#[source] io::Error),

    /// Stored record checksum does not match its contents
    #[error("Record is corrupt (stored crc = {stored}, computed crc = {computed})")]
    CorruptRecord {
        /// Checksum found in the record header
        stored: u32,
        /// Checksum computed over the record contents
        computed: u32,
    },

    /// Attributes carry a compression id this build does not know
    #[error("Unknown compression type id: {0}")]
    UnknownCompression(u8),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RecordError {
    /// Build a `MalformedBatch` error from any displayable detail.
    pub fn malformed(detail: impl Into<String>) -> Self {
        RecordError::MalformedBatch(detail.into())
    }

    /// Whether the batch that raised this error must be discarded.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RecordError::TransformFailure(_)
                | RecordError::MalformedBatch(_)
                | RecordError::CorruptRecord { .. }
        )
    }
}

impl From<io::Error> for RecordError {
    fn from(e: io::Error) -> Self {
        RecordError::TransformFailure(e)
    }
}
