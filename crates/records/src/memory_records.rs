//! Record batch container.
//!
//! A [`MemoryRecords`] is writable until [`MemoryRecords::close`], then frozen
//! into an immutable [`Bytes`] region that can be handed to a transport or
//! read by any number of independent iterators.
//!
//! # Lifecycle
//!
//! ```text
//! writable ──append*──▶ writable ──close──▶ read-only ──iter*──▶ ...
//!     │
//!     └──append fails in the encoder──▶ failed (discard the batch)
//! ```
//!
//! Appends on one batch must be serialized by the caller; the `&mut self`
//! receivers enforce this.

use crate::codec::CodecRegistry;
use crate::compressor::Compressor;
use crate::config::{CodecContext, RecordsConfig};
use crate::iterator::RecordsIterator;
use bytes::{Bytes, BytesMut};
use std::fmt;
use std::mem;
use std::sync::Arc;
use wirelog_protocol::{CompressionType, Record, RecordError, Result, LOG_OVERHEAD};

enum State {
    Writable(Compressor),
    ReadOnly {
        buffer: Bytes,
        compression_rate: f32,
    },
    /// An encoder write failed; the region contents are unusable
    Failed { size: usize },
}

/// A batch of framed records held in memory.
pub struct MemoryRecords {
    state: State,
    compression: CompressionType,
    write_limit: usize,
    initial_capacity: usize,
    num_records: u64,
    registry: Arc<CodecRegistry>,
    check_crcs: bool,
}

impl MemoryRecords {
    /// Writable batch over `region` with the default configuration.
    ///
    /// `write_limit` is the nominal batch size; see [`Self::has_room_for`].
    pub fn writable(
        region: BytesMut,
        compression: CompressionType,
        write_limit: usize,
        ctx: &CodecContext,
    ) -> Result<Self> {
        Self::writable_with_config(region, compression, write_limit, &RecordsConfig::default(), ctx)
    }

    /// Writable batch with an explicit configuration.
    pub fn writable_with_config(
        region: BytesMut,
        compression: CompressionType,
        write_limit: usize,
        config: &RecordsConfig,
        ctx: &CodecContext,
    ) -> Result<Self> {
        let initial_capacity = region.capacity();
        let compressor = Compressor::new(region, compression, config, ctx)?;
        Ok(MemoryRecords {
            state: State::Writable(compressor),
            compression,
            write_limit,
            initial_capacity,
            num_records: 0,
            registry: Arc::clone(&ctx.registry),
            check_crcs: config.check_crcs,
        })
    }

    /// Writable batch whose write limit is the region's capacity.
    pub fn empty(region: BytesMut, compression: CompressionType, ctx: &CodecContext) -> Result<Self> {
        let write_limit = region.capacity();
        Self::writable(region, compression, write_limit, ctx)
    }

    /// Read-only batch over an already serialized region.
    ///
    /// Decodes with the process-wide [`CodecContext::shared`]. Callers that
    /// own their codecs should use [`MemoryRecords::readable_with_context`].
    pub fn readable(buffer: Bytes) -> Self {
        Self::readable_with_context(buffer, &RecordsConfig::default(), &CodecContext::shared())
    }

    /// Read-only batch with explicit configuration and codecs.
    pub fn readable_with_context(buffer: Bytes, config: &RecordsConfig, ctx: &CodecContext) -> Self {
        let size = buffer.len();
        MemoryRecords {
            state: State::ReadOnly {
                buffer,
                compression_rate: 1.0,
            },
            compression: CompressionType::None,
            write_limit: size,
            initial_capacity: size,
            num_records: 0,
            registry: Arc::clone(&ctx.registry),
            check_crcs: config.check_crcs,
        }
    }

    /// Append a new record at `offset`, returning its checksum.
    pub fn append(
        &mut self,
        offset: i64,
        timestamp: i64,
        key: Option<&[u8]>,
        value: Option<&[u8]>,
    ) -> Result<u32> {
        let compressor = self.compressor_mut()?;
        let size = Record::record_size(compressor.magic(), key, value);
        let result = Self::frame(compressor, offset, size, |c| {
            c.put_record(timestamp, key, value)
        });
        self.settle(result)
    }

    /// Append an already serialized record at `offset`.
    pub fn append_record(&mut self, offset: i64, record: &Record) -> Result<()> {
        let compressor = self.compressor_mut()?;
        let result = Self::frame(compressor, offset, record.size(), |c| c.put_serialized(record));
        self.settle(result)
    }

    fn frame<T>(
        compressor: &mut Compressor,
        offset: i64,
        size: usize,
        put: impl FnOnce(&mut Compressor) -> Result<T>,
    ) -> Result<T> {
        let declared = i32::try_from(size).map_err(|_| {
            RecordError::malformed(format!("Record of {} bytes does not fit a size field", size))
        })?;
        compressor.put_long(offset)?;
        compressor.put_int(declared)?;
        let out = put(&mut *compressor)?;
        compressor.record_written(size + LOG_OVERHEAD);
        Ok(out)
    }

    /// Record the outcome of an append, poisoning the batch on a transform failure.
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(out) => {
                self.num_records += 1;
                Ok(out)
            }
            Err(e @ RecordError::TransformFailure(_)) => {
                let size = self.size_in_bytes();
                self.state = State::Failed { size };
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn compressor_mut(&mut self) -> Result<&mut Compressor> {
        match &mut self.state {
            State::Writable(compressor) => Ok(compressor),
            _ => Err(RecordError::NotWritable),
        }
    }

    fn compressor(&self) -> Option<&Compressor> {
        match &self.state {
            State::Writable(compressor) => Some(compressor),
            _ => None,
        }
    }

    /// Whether a record with this key and value fits.
    ///
    /// The first record of a batch is checked against the initial capacity
    /// rather than the write limit, so a record larger than the nominal batch
    /// size can still be sent on its own. Later records are checked against
    /// the write limit using the estimated output size.
    pub fn has_room_for(&self, key: Option<&[u8]>, value: Option<&[u8]>) -> bool {
        let Some(compressor) = self.compressor() else {
            return false;
        };
        let size = LOG_OVERHEAD + Record::record_size(compressor.magic(), key, value);
        if compressor.num_records_written() == 0 {
            self.initial_capacity >= size
        } else {
            self.write_limit as u64 >= compressor.estimated_bytes_written() + size as u64
        }
    }

    /// Predicted final size while writable; the frozen length afterwards.
    pub fn estimated_bytes_written(&self) -> u64 {
        match self.compressor() {
            Some(compressor) => compressor.estimated_bytes_written(),
            None => self.size_in_bytes() as u64,
        }
    }

    /// Whether the batch accepts no more records.
    pub fn is_full(&self) -> bool {
        match self.compressor() {
            Some(compressor) => self.write_limit as u64 <= compressor.estimated_bytes_written(),
            None => true,
        }
    }

    /// Finalize the batch and freeze its region.
    ///
    /// A no-op on a batch that is already read-only. Fails with
    /// `NotWritable` on a batch poisoned by a failed append.
    pub fn close(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, State::Failed { size: 0 }) {
            State::Writable(compressor) => {
                let size = compressor.position();
                match compressor.close() {
                    Ok((region, compression_rate)) => {
                        self.state = State::ReadOnly {
                            buffer: region.freeze(),
                            compression_rate,
                        };
                        Ok(())
                    }
                    Err(e) => {
                        self.state = State::Failed { size };
                        Err(e)
                    }
                }
            }
            state @ State::ReadOnly { .. } => {
                self.state = state;
                Ok(())
            }
            state @ State::Failed { .. } => {
                self.state = state;
                Err(RecordError::NotWritable)
            }
        }
    }

    /// Current write position while writable; the frozen length afterwards.
    pub fn size_in_bytes(&self) -> usize {
        match &self.state {
            State::Writable(compressor) => compressor.position(),
            State::ReadOnly { buffer, .. } => buffer.len(),
            State::Failed { size } => *size,
        }
    }

    /// Realized compression ratio; 1.0 for uncompressed or unclosed batches.
    pub fn compression_rate(&self) -> f32 {
        match &self.state {
            State::Writable(compressor) => compressor.compression_rate(),
            State::ReadOnly {
                compression_rate, ..
            } => *compression_rate,
            State::Failed { .. } => 1.0,
        }
    }

    /// Capacity of the region the batch was created with.
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Whether appends are still accepted.
    pub fn is_writable(&self) -> bool {
        matches!(self.state, State::Writable(_))
    }

    /// Compression applied by the writer; `None` for readable batches.
    pub fn compression_type(&self) -> CompressionType {
        self.compression
    }

    /// Records appended through this batch.
    ///
    /// Always 0 for a batch built with [`MemoryRecords::readable`]; count the
    /// stored records with [`MemoryRecords::iter`] instead.
    pub fn record_count(&self) -> u64 {
        self.num_records
    }

    /// The frozen region, for transmission or storage.
    pub fn buffer(&self) -> Result<Bytes> {
        match &self.state {
            State::ReadOnly { buffer, .. } => Ok(buffer.clone()),
            State::Writable(_) => Err(RecordError::StillWritable),
            State::Failed { .. } => Err(RecordError::NotWritable),
        }
    }

    /// Deep iterator: compressed wrappers are replaced by the records they hold.
    pub fn iter(&self) -> Result<RecordsIterator> {
        self.iterator(false)
    }

    /// Shallow iterator: compressed wrappers are yielded as stored.
    pub fn shallow_iter(&self) -> Result<RecordsIterator> {
        self.iterator(true)
    }

    fn iterator(&self, shallow: bool) -> Result<RecordsIterator> {
        Ok(RecordsIterator::new(
            self.buffer()?,
            shallow,
            Arc::clone(&self.registry),
            self.check_crcs,
        ))
    }
}

impl fmt::Display for MemoryRecords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let iter = match self.iter() {
            Ok(iter) => iter,
            Err(_) => {
                return write!(
                    f,
                    "MemoryRecords(writable = {}, compression = {}, records = {})",
                    self.is_writable(),
                    self.compression,
                    self.num_records
                )
            }
        };

        f.write_str("[")?;
        for entry in iter {
            match entry {
                Ok(entry) => write!(f, "(offset={},record={})", entry.offset(), entry.record())?,
                Err(e) => {
                    write!(f, "<{}>", e)?;
                    break;
                }
            }
        }
        f.write_str("]")
    }
}

impl fmt::Debug for MemoryRecords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRecords")
            .field("writable", &self.is_writable())
            .field("compression", &self.compression)
            .field("write_limit", &self.write_limit)
            .field("initial_capacity", &self.initial_capacity)
            .field("size_in_bytes", &self.size_in_bytes())
            .finish()
    }
}
