//! LZ4 frame codec (optional, `lz4` feature).
//!
//! Batches written in the legacy wire format (magic v0) carry a frame
//! descriptor whose header checksum was computed over the frame magic as
//! well as the descriptor. Decoding such a batch first rewrites that byte to
//! the value a conforming frame decoder expects.

use super::traits::{BatchEncoder, BatchSink, CompressionCodec};
use bytes::{Buf, Bytes, BytesMut};
use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use std::io::{self, Read, Write};
use wirelog_protocol::{CompressionType, Result, MAGIC_VALUE_V0};
use xxhash_rust::xxh32::xxh32;

/// Frame magic, little-endian.
const FRAME_MAGIC: [u8; 4] = [0x04, 0x22, 0x4D, 0x18];
/// FLG bit: an 8-byte content size follows the BD byte.
const FLG_CONTENT_SIZE: u8 = 0x08;
/// FLG bit: a 4-byte dictionary id follows.
const FLG_DICT_ID: u8 = 0x01;

/// LZ4 frame codec backed by `lz4_flex`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec;

impl CompressionCodec for Lz4Codec {
    fn compression_type(&self) -> CompressionType {
        CompressionType::Lz4
    }

    fn encoder(&self, sink: BatchSink, _buffer_size: usize) -> Result<Box<dyn BatchEncoder>> {
        Ok(Box::new(Lz4Encoder {
            inner: FrameEncoder::new(sink),
        }))
    }

    fn decoder(&self, source: Bytes, magic: u8) -> Result<Box<dyn Read + Send>> {
        let source = if magic == MAGIC_VALUE_V0 {
            normalize_legacy_header(source)
        } else {
            source
        };
        Ok(Box::new(FrameDecoder::new(source.reader())))
    }
}

struct Lz4Encoder {
    inner: FrameEncoder<BatchSink>,
}

impl Write for Lz4Encoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl BatchEncoder for Lz4Encoder {
    fn written(&self) -> usize {
        self.inner.get_ref().get_ref().len()
    }

    fn finish(self: Box<Self>) -> io::Result<BytesMut> {
        let sink = self
            .inner
            .finish()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        Ok(sink.into_inner())
    }
}

/// Position of the header checksum byte, if the frame header is complete.
fn header_checksum_position(frame: &[u8]) -> Option<usize> {
    if frame.len() < 7 || frame[..4] != FRAME_MAGIC {
        return None;
    }
    let flg = frame[4];
    let mut position = 6;
    if flg & FLG_CONTENT_SIZE != 0 {
        position += 8;
    }
    if flg & FLG_DICT_ID != 0 {
        position += 4;
    }
    (position < frame.len()).then_some(position)
}

/// Header checksum over the frame descriptor (FLG through dict id).
fn descriptor_checksum(frame: &[u8], position: usize) -> u8 {
    ((xxh32(&frame[4..position], 0) >> 8) & 0xFF) as u8
}

/// Rewrite the header checksum byte of a legacy frame.
///
/// Payloads that do not start with a complete frame header are passed
/// through untouched; the frame decoder reports them.
fn normalize_legacy_header(source: Bytes) -> Bytes {
    let Some(position) = header_checksum_position(&source) else {
        return source;
    };
    let expected = descriptor_checksum(&source, position);
    if source[position] == expected {
        return source;
    }
    let mut frame = BytesMut::from(&source[..]);
    frame[position] = expected;
    frame.freeze()
}
