//! Batch admission and rate-estimate tests
//!
//! These tests verify the space accounting producers rely on:
//! - A single record larger than the write limit is always admitted
//! - Closed batches have no room
//! - The size estimate never decreases while appending
//! - The damped rate table follows the iterated update exactly

mod common;

use bytes::BytesMut;
use common::*;
use proptest::prelude::*;
use std::sync::Arc;
use wirelog_records::{
    CodecContext, CompressionType, MemoryRecords, Record, RecordError,
    COMPRESSION_RATE_DAMPING_FACTOR, LOG_OVERHEAD, MAGIC_VALUE_V1,
};

#[test]
fn test_single_oversized_record_is_admitted() {
    let ctx = CodecContext::new();

    for compression in available_compressions() {
        let mut records =
            MemoryRecords::writable(BytesMut::with_capacity(1024), compression, 100, &ctx).unwrap();
        let value = vec![7u8; 500];
        let framed =
            LOG_OVERHEAD + Record::record_size(MAGIC_VALUE_V1, None, Some(value.as_slice()));
        assert!(framed > 100 && framed <= records.initial_capacity());

        assert!(!records.is_full(), "{}", compression);
        assert!(records.has_room_for(None, Some(value.as_slice())), "{}", compression);
        records.append(0, 1, None, Some(value.as_slice())).unwrap();

        // Only the first record gets the exception
        assert!(!records.has_room_for(None, Some(value.as_slice())), "{}", compression);
        assert!(records.is_full(), "{}", compression);

        records.close().unwrap();
        assert_eq!(collect(records.iter().unwrap()).len(), 1);
    }
}

#[test]
fn test_record_larger_than_capacity_is_refused() {
    let ctx = CodecContext::new();
    let records =
        MemoryRecords::writable(BytesMut::with_capacity(256), CompressionType::None, 100, &ctx)
            .unwrap();
    let value = vec![0u8; records.initial_capacity()];
    assert!(!records.has_room_for(None, Some(value.as_slice())));
}

#[test]
fn test_closed_batch_has_no_room() {
    let ctx = CodecContext::new();

    for compression in available_compressions() {
        let mut records = writable(compression, &ctx);
        assert!(records.has_room_for(None, Some(b"v")));
        records.append(0, 0, None, Some(b"v")).unwrap();
        records.close().unwrap();

        assert!(!records.has_room_for(None, Some(b"v")));
        assert!(!records.has_room_for(None, None));
        assert!(records.is_full());
        assert!(matches!(
            records.append(1, 0, None, Some(b"v")),
            Err(RecordError::NotWritable)
        ));
    }
}

#[test]
fn test_size_in_bytes_fixed_after_close() {
    let ctx = CodecContext::new();
    let mut records = writable(CompressionType::Gzip, &ctx);
    fill(&mut records, &sequential(5));

    let size = records.size_in_bytes();
    assert_eq!(size, records.buffer().unwrap().len());
    assert!(records.compression_rate() > 0.0);
    assert_eq!(records.record_count(), 5);
}

#[test]
fn test_compression_rate_damping_sequence() {
    let ctx = CodecContext::new();
    let mut expected = CompressionType::Gzip.default_rate();

    for round in 0..5 {
        let mut records = writable(CompressionType::Gzip, &ctx);
        fill(&mut records, &sequential(10 + round * 10));
        let observed = records.compression_rate();

        expected = expected * COMPRESSION_RATE_DAMPING_FACTOR
            + observed * (1.0 - COMPRESSION_RATE_DAMPING_FACTOR);
        assert_eq!(ctx.rates.rate(CompressionType::Gzip), expected);
    }

    // Uncompressed batches never touch the table
    let mut plain = writable(CompressionType::None, &ctx);
    fill(&mut plain, &sequential(3));
    assert_eq!(plain.compression_rate(), 1.0);
    assert_eq!(ctx.rates.rate(CompressionType::None), 1.0);
}

#[test]
fn test_rate_tables_are_per_context() {
    let first = CodecContext::new();
    let second = CodecContext::new();
    let mut records = writable(CompressionType::Gzip, &first);
    fill(&mut records, &sequential(10));

    assert_ne!(first.rates.rate(CompressionType::Gzip), 0.5);
    assert_eq!(second.rates.rate(CompressionType::Gzip), 0.5);

    // Clones share the table
    let shared = CodecContext::with_parts(Arc::clone(&first.registry), Arc::clone(&first.rates));
    assert_eq!(
        shared.rates.rate(CompressionType::Gzip),
        first.rates.rate(CompressionType::Gzip)
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_estimate_is_monotonic(
        compression in proptest::sample::select(available_compressions()),
        values in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..256), 1..40),
    ) {
        let ctx = CodecContext::new();
        let mut records = writable(compression, &ctx);

        let mut previous = 0u64;
        for (offset, value) in values.iter().enumerate() {
            records.append(offset as i64, 0, None, Some(value.as_slice())).unwrap();
            let estimate = records.estimated_bytes_written();
            prop_assert!(estimate >= previous);
            previous = estimate;
        }
    }
}
