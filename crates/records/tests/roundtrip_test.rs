//! Round-trip tests: append, close, iterate
//!
//! These tests verify that what goes into a batch comes back out:
//! - Keys, values, and offsets for every compression type, from any base
//! - Timestamps for uncompressed batches, the wrapper's for compressed ones
//! - Legacy (magic v0) batches keep arbitrary absolute offsets
//! - Records appended pre-serialized decode like freshly built ones

mod common;

use bytes::Bytes;
use common::*;
use proptest::prelude::*;
use wirelog_records::{
    CodecContext, CompressionType, Record, RecordsConfig, TimestampType, NO_TIMESTAMP,
};

#[test]
fn test_roundtrip_every_compression_type() {
    let ctx = CodecContext::new();
    let inputs = sequential(20);

    for compression in available_compressions() {
        let buffer = closed(compression, &inputs, &ctx);
        let entries = collect(wirelog_records::RecordsIterator::deep(buffer));

        assert_eq!(entries.len(), inputs.len(), "{}", compression);
        for (entry, (offset, _, key, value)) in entries.iter().zip(&inputs) {
            assert_eq!(entry.offset(), *offset, "{}", compression);
            assert_eq!(entry.record().key().map(|b| b.to_vec()), *key);
            assert_eq!(entry.record().value().map(|b| b.to_vec()), *value);
            assert!(entry.record().is_valid());
            assert_eq!(entry.record().compression_type(), CompressionType::None);
        }
    }
}

#[test]
fn test_uncompressed_keeps_record_timestamps_and_offsets() {
    let ctx = CodecContext::new();
    let inputs: Vec<Input> = vec![
        (100, 5, None, Some(b"a".to_vec())),
        (250, 3, Some(b"k".to_vec()), None),
        (251, 9, None, None),
    ];
    let buffer = closed(CompressionType::None, &inputs, &ctx);
    let entries = collect(wirelog_records::RecordsIterator::deep(buffer));

    assert_eq!(offsets(&entries), vec![100, 250, 251]);
    let timestamps: Vec<_> = entries.iter().map(|e| e.record().timestamp()).collect();
    assert_eq!(timestamps, vec![5, 3, 9]);
}

#[test]
fn test_compressed_records_take_wrapper_timestamp() {
    let ctx = CodecContext::new();
    let inputs: Vec<Input> = vec![
        (0, 50, None, Some(b"a".to_vec())),
        (1, 70, None, Some(b"b".to_vec())),
        (2, 60, None, Some(b"c".to_vec())),
    ];
    let buffer = closed(CompressionType::Gzip, &inputs, &ctx);

    for entry in collect(wirelog_records::RecordsIterator::deep(buffer)) {
        // Wrapper carries the largest timestamp in the batch
        assert_eq!(entry.record().timestamp(), 70);
        assert_eq!(entry.record().timestamp_type(), TimestampType::CreateTime);
    }
}

#[test]
fn test_legacy_format_keeps_absolute_offsets() {
    let ctx = CodecContext::new();
    let config = RecordsConfig::new().with_magic(0);
    let inputs: Vec<Input> = vec![
        (10, 1, None, Some(b"first".to_vec())),
        (20, 2, None, Some(b"second".to_vec())),
        (35, 3, None, Some(b"third".to_vec())),
    ];

    for compression in available_compressions() {
        let mut records = writable_with(compression, &config, &ctx);
        fill(&mut records, &inputs);
        let entries = collect(records.iter().unwrap());

        assert_eq!(offsets(&entries), vec![10, 20, 35], "{}", compression);
        for entry in &entries {
            assert_eq!(entry.record().magic(), 0);
            assert_eq!(entry.record().timestamp(), NO_TIMESTAMP);
            assert_eq!(entry.record().timestamp_type(), TimestampType::NoTimestampType);
        }
    }
}

#[test]
fn test_compressed_batch_keeps_offsets_not_starting_at_zero() {
    let ctx = CodecContext::new();
    let inputs: Vec<Input> = vec![
        (100, 1, None, Some(b"a".to_vec())),
        (101, 2, None, Some(b"b".to_vec())),
        (102, 3, None, Some(b"c".to_vec())),
    ];

    for compression in available_compressions() {
        let buffer = closed(compression, &inputs, &ctx);
        let entries = collect(wirelog_records::RecordsIterator::deep(buffer));
        assert_eq!(offsets(&entries), vec![100, 101, 102], "{}", compression);
    }
}

#[test]
fn test_append_serialized_record() {
    let ctx = CodecContext::new();
    let record = Record::new(42, Some(b"key"), Some(b"value"), CompressionType::None).unwrap();

    let mut records = writable(CompressionType::Gzip, &ctx);
    records.append_record(0, &record).unwrap();
    records.close().unwrap();

    let entries = collect(records.iter().unwrap());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].record().value().unwrap(), Bytes::from_static(b"value"));
    assert_eq!(entries[0].record().timestamp(), 42);
    assert_eq!(entries[0].record().checksum(), record.checksum());
}

#[test]
fn test_empty_compressed_batch_yields_nothing() {
    let ctx = CodecContext::new();
    let buffer = closed(CompressionType::Gzip, &[], &ctx);

    // The wrapper is still written
    assert_eq!(collect(wirelog_records::RecordsIterator::shallow(buffer.clone())).len(), 1);
    assert!(collect(wirelog_records::RecordsIterator::deep(buffer)).is_empty());
}

fn compression_strategy() -> impl Strategy<Value = CompressionType> {
    proptest::sample::select(available_compressions())
}

fn payload() -> impl Strategy<Value = Option<Vec<u8>>> {
    proptest::option::of(proptest::collection::vec(any::<u8>(), 0..128))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_roundtrip_preserves_sequence(
        compression in compression_strategy(),
        base in 0i64..1_000_000,
        records in proptest::collection::vec((1i64..1_000, 0i64..1_000_000, payload(), payload()), 1..30),
    ) {
        let ctx = CodecContext::new();
        let mut offset = base;
        let inputs: Vec<Input> = records
            .into_iter()
            .map(|(gap, timestamp, key, value)| {
                offset += gap;
                (offset, timestamp, key, value)
            })
            .collect();
        let max_timestamp = inputs.iter().map(|input| input.1).max().unwrap_or(-1);

        let buffer = closed(compression, &inputs, &ctx);
        let entries = collect(wirelog_records::RecordsIterator::deep(buffer));

        prop_assert_eq!(entries.len(), inputs.len());
        for (entry, (offset, timestamp, key, value)) in entries.iter().zip(&inputs) {
            prop_assert_eq!(entry.offset(), *offset);
            prop_assert_eq!(&entry.record().key().map(|b| b.to_vec()), key);
            prop_assert_eq!(&entry.record().value().map(|b| b.to_vec()), value);
            let expected_timestamp = if compression.is_compressed() { max_timestamp } else { *timestamp };
            prop_assert_eq!(entry.record().timestamp(), expected_timestamp);
        }
    }
}
