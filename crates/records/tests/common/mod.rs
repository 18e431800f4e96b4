//! Shared helpers for the record batch integration tests.
//!
//! Import via `mod common;` from any test file.

#![allow(dead_code)]

use bytes::{Bytes, BytesMut};
use wirelog_records::{
    CodecContext, CompressionType, LogEntry, MemoryRecords, RecordsConfig, Result,
};

/// One record to append: (offset, timestamp, key, value).
pub type Input = (i64, i64, Option<Vec<u8>>, Option<Vec<u8>>);

/// Writable batch with room for everything the tests append.
pub fn writable(compression: CompressionType, ctx: &CodecContext) -> MemoryRecords {
    MemoryRecords::writable(BytesMut::with_capacity(4096), compression, 1 << 20, ctx).unwrap()
}

/// Writable batch with an explicit configuration.
pub fn writable_with(
    compression: CompressionType,
    config: &RecordsConfig,
    ctx: &CodecContext,
) -> MemoryRecords {
    MemoryRecords::writable_with_config(
        BytesMut::with_capacity(4096),
        compression,
        1 << 20,
        config,
        ctx,
    )
    .unwrap()
}

/// Append every input, then close.
pub fn fill(records: &mut MemoryRecords, inputs: &[Input]) {
    for (offset, timestamp, key, value) in inputs {
        records
            .append(*offset, *timestamp, key.as_deref(), value.as_deref())
            .unwrap();
    }
    records.close().unwrap();
}

/// Closed batch holding `inputs`, returned as its frozen region.
pub fn closed(compression: CompressionType, inputs: &[Input], ctx: &CodecContext) -> Bytes {
    let mut records = writable(compression, ctx);
    fill(&mut records, inputs);
    records.buffer().unwrap()
}

/// Inputs at offsets 0..n with distinct timestamps, keys, and values.
pub fn sequential(n: i64) -> Vec<Input> {
    (0..n)
        .map(|i| {
            (
                i,
                1_000 + i,
                Some(format!("key-{}", i).into_bytes()),
                Some(format!("value-{}-{}", i, "x".repeat(i as usize)).into_bytes()),
            )
        })
        .collect()
}

/// Drain an iterator, failing the test on any decode error.
pub fn collect(iter: impl Iterator<Item = Result<LogEntry>>) -> Vec<LogEntry> {
    iter.collect::<Result<Vec<_>>>().unwrap()
}

/// Offsets of decoded entries.
pub fn offsets(entries: &[LogEntry]) -> Vec<i64> {
    entries.iter().map(LogEntry::offset).collect()
}

/// Every compression type compiled into this build.
pub fn available_compressions() -> Vec<CompressionType> {
    let mut types = vec![CompressionType::None, CompressionType::Gzip];
    if cfg!(feature = "snappy") {
        types.push(CompressionType::Snappy);
    }
    if cfg!(feature = "lz4") {
        types.push(CompressionType::Lz4);
    }
    types
}
