//! Compression codec trait definitions.

use bytes::buf::Writer;
use bytes::{Bytes, BytesMut};
use std::io::{self, Read, Write};
use wirelog_protocol::{CompressionType, Result};

/// Output region every encoder writes into.
pub type BatchSink = Writer<BytesMut>;

/// Compression codec trait.
///
/// A codec turns the raw output region of a batch into a compressing writer,
/// and a compressed payload back into a readable stream of framed entries.
///
/// # Thread Safety
///
/// Codecs are resolved once and shared by every batch in the process, so
/// they must be `Send + Sync`.
pub trait CompressionCodec: Send + Sync {
    /// Compression type this codec implements.
    fn compression_type(&self) -> CompressionType;

    /// Wrap the output region in a compressing writer.
    ///
    /// `buffer_size` is the write buffer placed in front of codecs that
    /// benefit from batching small writes.
    fn encoder(&self, sink: BatchSink, buffer_size: usize) -> Result<Box<dyn BatchEncoder>>;

    /// Wrap a compressed payload in a decompressing reader.
    ///
    /// `magic` is the wire-format version of the record that carried the
    /// payload; codecs whose legacy framing differs use it to pick a mode.
    fn decoder(&self, source: Bytes, magic: u8) -> Result<Box<dyn Read + Send>>;
}

/// A writer that compresses into a [`BatchSink`].
pub trait BatchEncoder: Write + Send {
    /// Bytes that have reached the output region so far.
    ///
    /// Data still buffered inside the codec is not counted.
    fn written(&self) -> usize;

    /// Flush all buffered codec output and hand back the output region.
    fn finish(self: Box<Self>) -> io::Result<BytesMut>;
}
