//! Record batches for Wirelog
//!
//! This crate handles everything between a producer's records and the bytes
//! that go on the wire:
//!
//! - Codec resolution: identity, gzip, and lazily resolved snappy / lz4
//! - Damped compression-rate estimates used for batch admission control
//! - `Compressor`: the batch writer, including the compressed wrapper record
//! - `MemoryRecords`: a batch that is writable until closed, then frozen
//! - `RecordsIterator`: shallow and deep decoding of frozen batches

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec; // Compression codec trait, built-in codecs, lazy registry
pub mod compressor; // Batch writer
pub mod config; // RecordsConfig and process-scoped CodecContext
pub mod iterator; // Shallow and deep batch reader
pub mod memory_records; // Writable-then-frozen batch container
pub mod rates; // Damped compression-rate table

pub use codec::{BatchEncoder, CodecRegistry, CompressionCodec};
pub use compressor::Compressor;
pub use config::{CodecContext, ConfigError, RecordsConfig};
pub use iterator::RecordsIterator;
pub use memory_records::MemoryRecords;
pub use rates::{
    CompressionRates, COMPRESSION_DEFAULT_BUFFER_SIZE, COMPRESSION_RATE_DAMPING_FACTOR,
    COMPRESSION_RATE_ESTIMATION_FACTOR,
};

pub use wirelog_protocol::{
    CompressionType, LogEntry, Record, RecordError, Result, TimestampType, LOG_OVERHEAD,
    MAGIC_VALUE_V0, MAGIC_VALUE_V1, NO_TIMESTAMP,
};
