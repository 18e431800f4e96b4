//! Wire-level types for record batches
//!
//! This crate defines what a single record looks like on the wire and the
//! vocabulary shared by the batch writer and reader:
//! - `Record`: one serialized message (checksum, attributes, timestamp, key, value)
//! - `LogEntry`: an (offset, record) pair produced by decoding
//! - `CompressionType` / `TimestampType`: attribute encodings
//! - `RecordError`: error taxonomy for every batch operation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compression;
pub mod error;
pub mod log_entry;
pub mod record;
pub mod timestamp;

pub use compression::CompressionType;
pub use error::{RecordError, Result};
pub use log_entry::{LogEntry, LOG_OVERHEAD, OFFSET_LENGTH, SIZE_LENGTH};
pub use record::{
    Record, CURRENT_MAGIC_VALUE, MAGIC_VALUE_V0, MAGIC_VALUE_V1, RECORD_OVERHEAD_V0,
    RECORD_OVERHEAD_V1,
};
pub use timestamp::{TimestampType, NO_TIMESTAMP};
