//! Single record format.
//!
//! # Record Layout
//!
//! ```text
//! ┌──────────┬───────────┬────────────────┬────────────────────┬──────────────┬───────┬────────────────┬───────┐
//! │ CRC (4)  │ Magic (1) │ Attributes (1) │ Timestamp (8, v1)  │ Key size (4) │ Key   │ Value size (4) │ Value │
//! └──────────┴───────────┴────────────────┴────────────────────┴──────────────┴───────┴────────────────┴───────┘
//! ```
//!
//! All integers are big-endian. The CRC-32 covers every byte from the magic
//! to the end of the value. A size of `-1` encodes an absent key or value.
//! Attribute bits 0-2 hold the compression id, bit 3 the timestamp type.

use crate::compression::CompressionType;
use crate::error::{RecordError, Result};
use crate::timestamp::{TimestampType, NO_TIMESTAMP};
use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, Bytes};
use crc32fast::Hasher;
use std::fmt;
use std::io::{self, Write};
use std::ops::Range;

/// Offset of the CRC field
pub const CRC_OFFSET: usize = 0;
/// Length of the CRC field
pub const CRC_LENGTH: usize = 4;
/// Offset of the magic byte
pub const MAGIC_OFFSET: usize = CRC_OFFSET + CRC_LENGTH;
/// Length of the magic byte
pub const MAGIC_LENGTH: usize = 1;
/// Offset of the attributes byte
pub const ATTRIBUTES_OFFSET: usize = MAGIC_OFFSET + MAGIC_LENGTH;
/// Length of the attributes byte
pub const ATTRIBUTES_LENGTH: usize = 1;
/// Offset of the timestamp (magic v1 only)
pub const TIMESTAMP_OFFSET: usize = ATTRIBUTES_OFFSET + ATTRIBUTES_LENGTH;
/// Length of the timestamp
pub const TIMESTAMP_LENGTH: usize = 8;
/// Offset of the key size in a magic v0 record
pub const KEY_SIZE_OFFSET_V0: usize = ATTRIBUTES_OFFSET + ATTRIBUTES_LENGTH;
/// Offset of the key size in a magic v1 record
pub const KEY_SIZE_OFFSET_V1: usize = TIMESTAMP_OFFSET + TIMESTAMP_LENGTH;
/// Length of the key size field
pub const KEY_SIZE_LENGTH: usize = 4;
/// Offset of the key in a magic v0 record
pub const KEY_OFFSET_V0: usize = KEY_SIZE_OFFSET_V0 + KEY_SIZE_LENGTH;
/// Offset of the key in a magic v1 record
pub const KEY_OFFSET_V1: usize = KEY_SIZE_OFFSET_V1 + KEY_SIZE_LENGTH;
/// Length of the value size field
pub const VALUE_SIZE_LENGTH: usize = 4;

/// Size of the fields shared by every magic version
pub const HEADER_SIZE: usize = CRC_LENGTH + MAGIC_LENGTH + ATTRIBUTES_LENGTH;
/// Fixed overhead of a magic v0 record
pub const RECORD_OVERHEAD_V0: usize = HEADER_SIZE + KEY_SIZE_LENGTH + VALUE_SIZE_LENGTH;
/// Fixed overhead of a magic v1 record
pub const RECORD_OVERHEAD_V1: usize = RECORD_OVERHEAD_V0 + TIMESTAMP_LENGTH;

/// Legacy wire format: no timestamp, absolute inner offsets
pub const MAGIC_VALUE_V0: u8 = 0;
/// Current wire format: timestamp, relative inner offsets
pub const MAGIC_VALUE_V1: u8 = 1;
/// Magic written by default
pub const CURRENT_MAGIC_VALUE: u8 = MAGIC_VALUE_V1;

/// Attribute bits holding the compression id
pub const COMPRESSION_CODEC_MASK: u8 = 0x07;

/// A single record backed by an immutable byte region.
///
/// Parsing happens once in [`Record::from_bytes`]; the accessors afterwards
/// are infallible slices of the shared buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    buffer: Bytes,
    compression: CompressionType,
    key: Option<Range<usize>>,
    value: Option<Range<usize>>,
    /// Timestamp and type inherited from an enclosing wrapper record
    wrapper: Option<(i64, TimestampType)>,
}

impl Record {
    /// Build a record in the current wire format.
    pub fn new(
        timestamp: i64,
        key: Option<&[u8]>,
        value: Option<&[u8]>,
        compression: CompressionType,
    ) -> Result<Self> {
        Self::with_magic(CURRENT_MAGIC_VALUE, timestamp, key, value, compression)
    }

    /// Build a record in the given wire format.
    pub fn with_magic(
        magic: u8,
        timestamp: i64,
        key: Option<&[u8]>,
        value: Option<&[u8]>,
        compression: CompressionType,
    ) -> Result<Self> {
        let attributes = Self::compute_attributes(compression, TimestampType::CreateTime);
        let crc = Self::compute_checksum(magic, attributes, timestamp, key, value);

        let mut buffer = Vec::with_capacity(Self::record_size(magic, key, value));
        Self::write_to(&mut buffer, crc, attributes, timestamp, key, value, magic)?;
        Self::from_bytes(Bytes::from(buffer))
    }

    /// Parse and validate a serialized record.
    pub fn from_bytes(buffer: Bytes) -> Result<Self> {
        if buffer.len() < HEADER_SIZE {
            return Err(RecordError::malformed(format!(
                "Record of {} bytes is shorter than the {} byte header",
                buffer.len(),
                HEADER_SIZE
            )));
        }

        let magic = buffer[MAGIC_OFFSET];
        let key_size_offset = match magic {
            MAGIC_VALUE_V0 => KEY_SIZE_OFFSET_V0,
            MAGIC_VALUE_V1 => KEY_SIZE_OFFSET_V1,
            other => {
                return Err(RecordError::malformed(format!(
                    "Unsupported record magic {}",
                    other
                )))
            }
        };

        if buffer.len() < Self::record_overhead(magic) {
            return Err(RecordError::malformed(format!(
                "Record of {} bytes is shorter than the magic v{} overhead",
                buffer.len(),
                magic
            )));
        }

        let compression =
            CompressionType::from_id(buffer[ATTRIBUTES_OFFSET] & COMPRESSION_CODEC_MASK)?;

        let (key, value_size_offset) = read_sized_field(&buffer, key_size_offset, "key")?;
        let (value, end) = read_sized_field(&buffer, value_size_offset, "value")?;
        if end != buffer.len() {
            return Err(RecordError::malformed(format!(
                "Record has {} trailing bytes after its value",
                buffer.len() - end
            )));
        }

        Ok(Record {
            buffer,
            compression,
            key,
            value,
            wrapper: None,
        })
    }

    /// Fixed overhead of a record in the given wire format.
    pub fn record_overhead(magic: u8) -> usize {
        if magic == MAGIC_VALUE_V0 {
            RECORD_OVERHEAD_V0
        } else {
            RECORD_OVERHEAD_V1
        }
    }

    /// Serialized size of a record with this key and value.
    pub fn record_size(magic: u8, key: Option<&[u8]>, value: Option<&[u8]>) -> usize {
        Self::record_overhead(magic) + key.map_or(0, <[u8]>::len) + value.map_or(0, <[u8]>::len)
    }

    /// Attributes byte for a record.
    pub fn compute_attributes(compression: CompressionType, timestamp_type: TimestampType) -> u8 {
        timestamp_type.apply_to(compression.id() & COMPRESSION_CODEC_MASK)
    }

    /// CRC-32 of a record's contents, computed field by field.
    pub fn compute_checksum(
        magic: u8,
        attributes: u8,
        timestamp: i64,
        key: Option<&[u8]>,
        value: Option<&[u8]>,
    ) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(&[magic, attributes]);
        if magic > MAGIC_VALUE_V0 {
            hasher.update(&timestamp.to_be_bytes());
        }
        for field in [key, value] {
            match field {
                Some(bytes) => {
                    hasher.update(&(bytes.len() as i32).to_be_bytes());
                    hasher.update(bytes);
                }
                None => hasher.update(&(-1i32).to_be_bytes()),
            }
        }
        hasher.finalize()
    }

    /// Serialize one record onto a writer.
    pub fn write_to<W: Write + ?Sized>(
        out: &mut W,
        crc: u32,
        attributes: u8,
        timestamp: i64,
        key: Option<&[u8]>,
        value: Option<&[u8]>,
        magic: u8,
    ) -> io::Result<()> {
        out.write_u32::<BigEndian>(crc)?;
        out.write_u8(magic)?;
        out.write_u8(attributes)?;
        if magic > MAGIC_VALUE_V0 {
            out.write_i64::<BigEndian>(timestamp)?;
        }
        write_sized_field(out, key)?;
        write_sized_field(out, value)
    }

    /// Same record, reporting the wrapper's timestamp and timestamp type.
    pub fn with_wrapper_timestamp(mut self, timestamp: i64, timestamp_type: TimestampType) -> Self {
        self.wrapper = Some((timestamp, timestamp_type));
        self
    }

    /// Checksum stored in the header.
    pub fn checksum(&self) -> u32 {
        (&self.buffer[CRC_OFFSET..]).get_u32()
    }

    /// Checksum computed over the stored contents.
    pub fn compute_checksum_of_contents(&self) -> u32 {
        crc32fast::hash(&self.buffer[MAGIC_OFFSET..])
    }

    /// Whether the stored checksum matches the contents.
    pub fn is_valid(&self) -> bool {
        self.checksum() == self.compute_checksum_of_contents()
    }

    /// Fail with `CorruptRecord` if the checksum does not match.
    pub fn ensure_valid(&self) -> Result<()> {
        let stored = self.checksum();
        let computed = self.compute_checksum_of_contents();
        if stored != computed {
            return Err(RecordError::CorruptRecord { stored, computed });
        }
        Ok(())
    }

    /// Wire-format version.
    pub fn magic(&self) -> u8 {
        self.buffer[MAGIC_OFFSET]
    }

    /// Raw attributes byte.
    pub fn attributes(&self) -> u8 {
        self.buffer[ATTRIBUTES_OFFSET]
    }

    /// Compression applied to this record's value.
    pub fn compression_type(&self) -> CompressionType {
        self.compression
    }

    /// Record timestamp, or the wrapper's when one was inherited.
    pub fn timestamp(&self) -> i64 {
        if let Some((timestamp, _)) = self.wrapper {
            return timestamp;
        }
        if self.magic() == MAGIC_VALUE_V0 {
            NO_TIMESTAMP
        } else {
            (&self.buffer[TIMESTAMP_OFFSET..]).get_i64()
        }
    }

    /// Timestamp type, or the wrapper's when one was inherited.
    pub fn timestamp_type(&self) -> TimestampType {
        if let Some((_, timestamp_type)) = self.wrapper {
            return timestamp_type;
        }
        if self.magic() == MAGIC_VALUE_V0 {
            TimestampType::NoTimestampType
        } else {
            TimestampType::from_attributes(self.attributes())
        }
    }

    /// Key bytes, if present.
    pub fn key(&self) -> Option<Bytes> {
        self.key.clone().map(|range| self.buffer.slice(range))
    }

    /// Value bytes, if present.
    pub fn value(&self) -> Option<Bytes> {
        self.value.clone().map(|range| self.buffer.slice(range))
    }

    /// Whether the record has a key.
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Serialized size.
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Serialized bytes.
    pub fn as_bytes(&self) -> &Bytes {
        &self.buffer
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Record(magic = {}, attributes = {}, compression = {}, crc = {}, {} = {}, key = {} bytes, value = {} bytes)",
            self.magic(),
            self.attributes(),
            self.compression_type(),
            self.checksum(),
            self.timestamp_type(),
            self.timestamp(),
            self.key.as_ref().map_or(0, |r| r.len()),
            self.value.as_ref().map_or(0, |r| r.len()),
        )
    }
}

fn write_sized_field<W: Write + ?Sized>(out: &mut W, field: Option<&[u8]>) -> io::Result<()> {
    match field {
        Some(bytes) => {
            out.write_i32::<BigEndian>(bytes.len() as i32)?;
            out.write_all(bytes)
        }
        None => out.write_i32::<BigEndian>(-1),
    }
}

/// Read a size-prefixed field, returning its byte range and where it ends.
fn read_sized_field(
    buffer: &[u8],
    size_offset: usize,
    name: &str,
) -> Result<(Option<Range<usize>>, usize)> {
    let start = size_offset + 4;
    if buffer.len() < start {
        return Err(RecordError::malformed(format!(
            "Record truncated before {} size",
            name
        )));
    }
    let size = (&buffer[size_offset..]).get_i32();
    if size < 0 {
        return Ok((None, start));
    }
    let end = start + size as usize;
    if end > buffer.len() {
        return Err(RecordError::malformed(format!(
            "Record {} of {} bytes overruns the {} byte record",
            name,
            size,
            buffer.len()
        )));
    }
    Ok((Some(start..end), end))
}
