//! Batch reader.
//!
//! [`RecordsIterator`] decodes a frozen byte region into a lazy sequence of
//! [`LogEntry`]. Each iterator owns a cheap clone of the shared [`Bytes`]
//! and its own read position, so any number of iterators can walk the same
//! batch concurrently.
//!
//! Deep iteration replaces every compressed wrapper entry with the entries
//! it wraps. The wrapper payload is decompressed in full before the first
//! inner entry is yielded: for magic v1 the inner offsets are relative and
//! the absolute base is only known once the last inner offset has been read.
//! A base below zero means the writer stored absolute offsets, which are
//! then yielded unchanged.
//!
//! Running out of bytes where a new entry header is expected ends the
//! sequence without an error, as does a trailing entry whose declared size
//! overruns the region. Any other decode failure is yielded once as an
//! error, after which the iterator is exhausted.

use crate::codec::CodecRegistry;
use byteorder::{BigEndian, ReadBytesExt};
use bytes::{Buf, Bytes};
use std::collections::VecDeque;
use std::io::{self, Read};
use std::mem;
use std::sync::Arc;
use wirelog_protocol::{LogEntry, Record, RecordError, Result, LOG_OVERHEAD, MAGIC_VALUE_V0};

/// Upper bound on the buffer preallocated for one decompressed record.
///
/// The declared size comes from the payload itself and is not trusted
/// beyond this until the bytes actually arrive.
const MAX_RECORD_PREALLOCATION: usize = 1024 * 1024;

/// Lazy, single-pass iterator over the entries of a record batch.
pub struct RecordsIterator {
    state: State,
    shallow: bool,
    registry: Arc<CodecRegistry>,
    check_crcs: bool,
}

enum State {
    /// Reading top-level entries
    Flat(FlatCursor),
    /// Draining the decompressed entries of a wrapper
    Nested {
        outer: FlatCursor,
        inner: InnerEntries,
    },
    Done,
}

impl RecordsIterator {
    /// Iterate over `buffer`, descending into compressed wrappers unless `shallow`.
    pub fn new(
        buffer: Bytes,
        shallow: bool,
        registry: Arc<CodecRegistry>,
        check_crcs: bool,
    ) -> Self {
        RecordsIterator {
            state: State::Flat(FlatCursor::new(buffer)),
            shallow,
            registry,
            check_crcs,
        }
    }

    /// Deep iterator over the process-wide [`CodecRegistry::global`].
    ///
    /// Callers that own their codec registry should use [`RecordsIterator::new`].
    pub fn deep(buffer: Bytes) -> Self {
        Self::new(buffer, false, CodecRegistry::global(), false)
    }

    /// Shallow iterator; compressed wrappers are yielded as stored.
    ///
    /// Uses [`CodecRegistry::global`]; see [`RecordsIterator::new`] to pass
    /// an explicit registry.
    pub fn shallow(buffer: Bytes) -> Self {
        Self::new(buffer, true, CodecRegistry::global(), false)
    }

    fn verify(&self, entry: &LogEntry) -> Result<()> {
        if self.check_crcs {
            entry.record().ensure_valid()?;
        }
        Ok(())
    }

    /// Decompress a wrapper entry into its inner entries.
    fn decompress(&self, wrapper: &LogEntry) -> Result<InnerEntries> {
        let record = wrapper.record();
        let codec = self.registry.resolve(record.compression_type())?;
        let payload = record.value().unwrap_or_default();
        let mut stream = codec.decoder(payload, record.magic())?;

        let mut entries = VecDeque::new();
        while let Some(entry) = read_stream_entry(&mut stream)? {
            entries.push_back(entry);
        }

        if entries.is_empty() {
            tracing::warn!(
                target: "wirelog::records",
                offset = wrapper.offset(),
                compression = %record.compression_type(),
                "Compressed wrapper holds no records"
            );
            return Ok(InnerEntries {
                entries,
                absolute_base: None,
            });
        }

        if record.magic() == MAGIC_VALUE_V0 {
            return Ok(InnerEntries {
                entries,
                absolute_base: None,
            });
        }

        // The wrapper is authoritative for timestamps of what it wraps
        let timestamp = record.timestamp();
        let timestamp_type = record.timestamp_type();
        let entries: VecDeque<_> = entries
            .into_iter()
            .map(|entry| {
                let (offset, inner) = entry.into_parts();
                LogEntry::new(offset, inner.with_wrapper_timestamp(timestamp, timestamp_type))
            })
            .collect();
        // A negative base means the inner offsets are already absolute
        let absolute_base = entries
            .back()
            .map(|last| wrapper.offset() - last.offset())
            .filter(|base| *base >= 0);

        Ok(InnerEntries {
            entries,
            absolute_base,
        })
    }
}

impl Iterator for RecordsIterator {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match mem::replace(&mut self.state, State::Done) {
                State::Done => return None,
                State::Nested { outer, mut inner } => match inner.next() {
                    Some(entry) => {
                        if let Err(e) = self.verify(&entry) {
                            return Some(Err(e));
                        }
                        self.state = State::Nested { outer, inner };
                        return Some(Ok(entry));
                    }
                    None => self.state = State::Flat(outer),
                },
                State::Flat(mut outer) => {
                    let entry = match outer.read_entry() {
                        Ok(Some(entry)) => entry,
                        Ok(None) => return None,
                        Err(e) => return Some(Err(e)),
                    };
                    if let Err(e) = self.verify(&entry) {
                        return Some(Err(e));
                    }

                    if self.shallow || !entry.record().compression_type().is_compressed() {
                        self.state = State::Flat(outer);
                        return Some(Ok(entry));
                    }

                    match self.decompress(&entry) {
                        Ok(inner) => self.state = State::Nested { outer, inner },
                        Err(e) => return Some(Err(e)),
                    }
                }
            }
        }
    }
}

impl std::iter::FusedIterator for RecordsIterator {}

/// Read position over a region of framed, uncompressed entries.
struct FlatCursor {
    buffer: Bytes,
    position: usize,
}

impl FlatCursor {
    fn new(buffer: Bytes) -> Self {
        FlatCursor {
            buffer,
            position: 0,
        }
    }

    /// Slice the next entry out of the region without copying.
    fn read_entry(&mut self) -> Result<Option<LogEntry>> {
        if self.buffer.len() - self.position < LOG_OVERHEAD {
            return Ok(None);
        }

        let mut header = &self.buffer[self.position..];
        let offset = header.get_i64();
        let size = header.get_i32();
        if size < 0 {
            return Err(RecordError::malformed(format!("Record with size {}", size)));
        }

        let start = self.position + LOG_OVERHEAD;
        let end = start + size as usize;
        if end > self.buffer.len() {
            tracing::debug!(
                target: "wirelog::records",
                offset,
                size,
                available = self.buffer.len() - start,
                "Truncated trailing entry ends iteration"
            );
            return Ok(None);
        }

        let record = Record::from_bytes(self.buffer.slice(start..end))?;
        self.position = end;
        Ok(Some(LogEntry::new(offset, record)))
    }
}

/// Decompressed entries of one wrapper, waiting to be yielded.
struct InnerEntries {
    entries: VecDeque<LogEntry>,
    /// Added to relative inner offsets (magic v1); `None` when the stored
    /// offsets are absolute
    absolute_base: Option<i64>,
}

impl Iterator for InnerEntries {
    type Item = LogEntry;

    fn next(&mut self) -> Option<LogEntry> {
        let entry = self.entries.pop_front()?;
        match self.absolute_base {
            Some(base) => {
                let (offset, record) = entry.into_parts();
                Some(LogEntry::new(base + offset, record))
            }
            None => Some(entry),
        }
    }
}

/// Read one framed entry from a decompressed stream.
///
/// End of stream anywhere inside the entry ends the sequence.
fn read_stream_entry<R: Read + ?Sized>(stream: &mut R) -> Result<Option<LogEntry>> {
    let offset = match end_on_eof(stream.read_i64::<BigEndian>())? {
        Some(offset) => offset,
        None => return Ok(None),
    };
    let size = match end_on_eof(stream.read_i32::<BigEndian>())? {
        Some(size) => size,
        None => return Ok(None),
    };
    if size < 0 {
        return Err(RecordError::malformed(format!("Record with size {}", size)));
    }

    let size = size as usize;
    let mut bytes = Vec::with_capacity(size.min(MAX_RECORD_PREALLOCATION));
    stream.take(size as u64).read_to_end(&mut bytes)?;
    if bytes.len() < size {
        tracing::debug!(
            target: "wirelog::records",
            offset,
            size,
            available = bytes.len(),
            "Truncated compressed entry ends iteration"
        );
        return Ok(None);
    }

    Ok(Some(LogEntry::new(offset, Record::from_bytes(Bytes::from(bytes))?)))
}

fn end_on_eof<T>(result: io::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}
