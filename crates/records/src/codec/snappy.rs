//! Snappy codec (optional, `snappy` feature).

use super::traits::{BatchEncoder, BatchSink, CompressionCodec};
use bytes::{Buf, Bytes, BytesMut};
use snap::read::FrameDecoder;
use snap::write::FrameEncoder;
use std::io::{self, Read, Write};
use wirelog_protocol::{CompressionType, Result};

/// Snappy framed-stream codec backed by `snap`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnappyCodec;

impl CompressionCodec for SnappyCodec {
    fn compression_type(&self) -> CompressionType {
        CompressionType::Snappy
    }

    fn encoder(&self, sink: BatchSink, _buffer_size: usize) -> Result<Box<dyn BatchEncoder>> {
        Ok(Box::new(SnappyEncoder {
            inner: FrameEncoder::new(sink),
        }))
    }

    fn decoder(&self, source: Bytes, _magic: u8) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(FrameDecoder::new(source.reader())))
    }
}

struct SnappyEncoder {
    inner: FrameEncoder<BatchSink>,
}

impl Write for SnappyEncoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl BatchEncoder for SnappyEncoder {
    fn written(&self) -> usize {
        self.inner.get_ref().get_ref().len()
    }

    fn finish(self: Box<Self>) -> io::Result<BytesMut> {
        let sink = self
            .inner
            .into_inner()
            .map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()))?;
        Ok(sink.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;

    #[test]
    fn test_snappy_roundtrip() {
        let payload = b"snappy snappy snappy snappy snappy".repeat(50);

        let mut encoder = SnappyCodec.encoder(BytesMut::new().writer(), 1024).unwrap();
        encoder.write_all(&payload).unwrap();
        let region = encoder.finish().unwrap();

        let mut decoded = Vec::new();
        SnappyCodec
            .decoder(region.freeze(), 1)
            .unwrap()
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, payload);
    }
}
