//! Batch writer.
//!
//! A [`Compressor`] owns the output region of one batch while it is being
//! written. Framed records go through the codec's encoder; for compressed
//! batches the space for the wrapper record header is reserved up front and
//! backfilled at [`Compressor::close`].
//!
//! # Compressed batch layout
//!
//! ```text
//! init_pos
//! ┌────────────┬──────────┬──────────────────────────────┬─────────────────────┐
//! │ offset (8) │ size (4) │ wrapper record header        │ compressed payload  │
//! │ count - 1  │          │ (crc, magic, attrs, ts, -1,  │ (framed inner       │
//! │            │          │  value size)                 │  records)           │
//! └────────────┴──────────┴──────────────────────────────┴─────────────────────┘
//! ```

use crate::codec::BatchEncoder;
use crate::config::{CodecContext, RecordsConfig};
use crate::rates::{CompressionRates, COMPRESSION_RATE_ESTIMATION_FACTOR};
use byteorder::{BigEndian, WriteBytesExt};
use bytes::{BufMut, BytesMut};
use std::io::Write;
use std::sync::Arc;
use wirelog_protocol::record::{CRC_LENGTH, MAGIC_OFFSET, VALUE_SIZE_LENGTH};
use wirelog_protocol::{
    CompressionType, Record, RecordError, Result, TimestampType, LOG_OVERHEAD, MAGIC_VALUE_V0,
    NO_TIMESTAMP,
};

/// Write-side accumulator for one record batch.
pub struct Compressor {
    compression: CompressionType,
    magic: u8,
    encoder: Box<dyn BatchEncoder>,
    init_pos: usize,
    written_uncompressed: u64,
    num_records: u64,
    max_timestamp: i64,
    compression_rate: f32,
    rates: Arc<CompressionRates>,
}

impl Compressor {
    /// Start a batch at the end of `region`.
    ///
    /// Fails with `CodecUnavailable` if the codec for `compression` cannot
    /// be resolved.
    pub fn new(
        mut region: BytesMut,
        compression: CompressionType,
        config: &RecordsConfig,
        ctx: &CodecContext,
    ) -> Result<Self> {
        config.validate()?;
        let codec = ctx.registry.resolve(compression)?;

        let init_pos = region.len();
        if compression.is_compressed() {
            // Leave room for the wrapper header, written at close
            region.put_bytes(0, LOG_OVERHEAD + Record::record_overhead(config.magic));
        }

        let encoder = codec.encoder(region.writer(), config.compression_buffer_size)?;
        Ok(Compressor {
            compression,
            magic: config.magic,
            encoder,
            init_pos,
            written_uncompressed: 0,
            num_records: 0,
            max_timestamp: NO_TIMESTAMP,
            compression_rate: 1.0,
            rates: Arc::clone(&ctx.rates),
        })
    }

    /// Write a big-endian i64 through the encoder.
    pub fn put_long(&mut self, value: i64) -> Result<()> {
        self.encoder.write_i64::<BigEndian>(value)?;
        Ok(())
    }

    /// Write a big-endian i32 through the encoder.
    pub fn put_int(&mut self, value: i32) -> Result<()> {
        self.encoder.write_i32::<BigEndian>(value)?;
        Ok(())
    }

    /// Write raw bytes through the encoder.
    pub fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.encoder.write_all(bytes)?;
        Ok(())
    }

    /// Serialize an uncompressed record through the encoder, returning its checksum.
    pub fn put_record(
        &mut self,
        timestamp: i64,
        key: Option<&[u8]>,
        value: Option<&[u8]>,
    ) -> Result<u32> {
        let attributes = Record::compute_attributes(CompressionType::None, TimestampType::CreateTime);
        let crc = Record::compute_checksum(self.magic, attributes, timestamp, key, value);
        self.max_timestamp = self.max_timestamp.max(timestamp);
        Record::write_to(
            &mut *self.encoder,
            crc,
            attributes,
            timestamp,
            key,
            value,
            self.magic,
        )?;
        Ok(crc)
    }

    /// Copy an already serialized record through the encoder.
    pub fn put_serialized(&mut self, record: &Record) -> Result<()> {
        self.max_timestamp = self.max_timestamp.max(record.timestamp());
        self.put(record.as_bytes())
    }

    /// Account for one framed record of `size` bytes.
    pub fn record_written(&mut self, size: usize) {
        self.num_records += 1;
        self.written_uncompressed += size as u64;
    }

    /// Records written so far.
    pub fn num_records_written(&self) -> u64 {
        self.num_records
    }

    /// Framed bytes written so far, before compression.
    pub fn written_uncompressed(&self) -> u64 {
        self.written_uncompressed
    }

    /// Largest timestamp written so far.
    pub fn max_timestamp(&self) -> i64 {
        self.max_timestamp
    }

    /// Realized compression ratio; 1.0 until a compressed batch is closed.
    pub fn compression_rate(&self) -> f32 {
        self.compression_rate
    }

    /// Compression type of this batch.
    pub fn compression_type(&self) -> CompressionType {
        self.compression
    }

    /// Wire-format version of this batch.
    pub fn magic(&self) -> u8 {
        self.magic
    }

    /// Bytes that have reached the output region.
    pub fn position(&self) -> usize {
        self.encoder.written()
    }

    /// Predicted size of the output region once the batch is closed.
    ///
    /// Exact for uncompressed batches. For compressed batches the damped
    /// rate for the type is applied to the uncompressed byte count, scaled
    /// up so the real output rarely exceeds it.
    pub fn estimated_bytes_written(&self) -> u64 {
        if !self.compression.is_compressed() {
            return self.position() as u64;
        }
        let rate = self.rates.rate(self.compression);
        (self.written_uncompressed as f32 * rate * COMPRESSION_RATE_ESTIMATION_FACTOR) as u64
    }

    /// Flush the encoder and finalize the batch.
    ///
    /// Returns the output region and the realized compression ratio.
    pub fn close(self) -> Result<(BytesMut, f32)> {
        let mut region = self.encoder.finish()?;
        if !self.compression.is_compressed() {
            return Ok((region, self.compression_rate));
        }

        let pos = region.len();
        let wrapper = WrapperHeader {
            compression: self.compression,
            magic: self.magic,
            init_pos: self.init_pos,
            num_records: self.num_records,
            max_timestamp: self.max_timestamp,
        };
        wrapper.write(&mut region, pos)?;

        let final_bytes = pos - self.init_pos;
        if self.written_uncompressed == 0 {
            tracing::debug!(
                target: "wirelog::records",
                compression = %self.compression,
                size = final_bytes,
                "Closed empty compressed batch"
            );
            return Ok((region, self.compression_rate));
        }

        let compression_rate = final_bytes as f32 / self.written_uncompressed as f32;
        let estimate = self.rates.update(self.compression, compression_rate);
        tracing::debug!(
            target: "wirelog::records",
            compression = %self.compression,
            records = self.num_records,
            size = final_bytes,
            rate = compression_rate,
            estimate,
            "Closed compressed batch"
        );
        Ok((region, compression_rate))
    }
}

/// Fields of the wrapper record written in front of a compressed payload.
struct WrapperHeader {
    compression: CompressionType,
    magic: u8,
    init_pos: usize,
    num_records: u64,
    max_timestamp: i64,
}

impl WrapperHeader {
    /// Backfill the reserved header ending at `pos`, then its checksum.
    fn write(&self, region: &mut BytesMut, pos: usize) -> Result<()> {
        let header_len = LOG_OVERHEAD + Record::record_overhead(self.magic);
        let record_start = self.init_pos + LOG_OVERHEAD;
        let value_size = pos - self.init_pos - header_len;
        let entry_size = i32::try_from(pos - record_start).map_err(|_| {
            RecordError::malformed(format!(
                "Compressed batch of {} bytes does not fit a size field",
                pos - record_start
            ))
        })?;

        let attributes = Record::compute_attributes(self.compression, TimestampType::CreateTime);
        let timestamp = if self.magic == MAGIC_VALUE_V0 {
            NO_TIMESTAMP
        } else {
            self.max_timestamp
        };

        let mut header = Vec::with_capacity(header_len);
        // End offset of the batch
        header.write_i64::<BigEndian>(self.num_records as i64 - 1)?;
        header.write_i32::<BigEndian>(entry_size)?;
        // Checksum and value size are placeholders until the payload is known
        Record::write_to(&mut header, 0, attributes, timestamp, None, None, self.magic)?;
        let value_size_at = header_len - VALUE_SIZE_LENGTH;
        header[value_size_at..].copy_from_slice(&(value_size as i32).to_be_bytes());

        region[self.init_pos..self.init_pos + header_len].copy_from_slice(&header);
        let crc = crc32fast::hash(&region[record_start + MAGIC_OFFSET..pos]);
        region[record_start..record_start + CRC_LENGTH].copy_from_slice(&crc.to_be_bytes());
        Ok(())
    }
}
