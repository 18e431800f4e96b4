//! Gzip codec, always compiled in.

use super::traits::{BatchEncoder, BatchSink, CompressionCodec};
use bytes::{Buf, Bytes, BytesMut};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, BufWriter, Read, Write};
use wirelog_protocol::{CompressionType, Result};

/// Gzip codec backed by `flate2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipCodec;

impl CompressionCodec for GzipCodec {
    fn compression_type(&self) -> CompressionType {
        CompressionType::Gzip
    }

    fn encoder(&self, sink: BatchSink, buffer_size: usize) -> Result<Box<dyn BatchEncoder>> {
        let encoder = GzEncoder::new(sink, Compression::default());
        Ok(Box::new(GzipEncoder {
            inner: BufWriter::with_capacity(buffer_size, encoder),
        }))
    }

    fn decoder(&self, source: Bytes, _magic: u8) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(GzDecoder::new(source.reader())))
    }
}

struct GzipEncoder {
    inner: BufWriter<GzEncoder<BatchSink>>,
}

impl Write for GzipEncoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl BatchEncoder for GzipEncoder {
    fn written(&self) -> usize {
        self.inner.get_ref().get_ref().get_ref().len()
    }

    fn finish(self: Box<Self>) -> io::Result<BytesMut> {
        let encoder = self.inner.into_inner().map_err(|e| e.into_error())?;
        Ok(encoder.finish()?.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;

    #[test]
    fn test_gzip_roundtrip() {
        let payload: Vec<u8> = (0..10_000).map(|i| (i % 7) as u8).collect();

        let mut encoder = GzipCodec.encoder(BytesMut::new().writer(), 1024).unwrap();
        encoder.write_all(&payload).unwrap();
        let region = encoder.finish().unwrap();
        assert!(region.len() < payload.len());

        let mut decoded = Vec::new();
        GzipCodec
            .decoder(region.freeze(), 1)
            .unwrap()
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_gzip_decode_garbage_fails() {
        let mut decoded = Vec::new();
        let result = GzipCodec
            .decoder(Bytes::from_static(b"definitely not gzip"), 1)
            .unwrap()
            .read_to_end(&mut decoded);
        assert!(result.is_err());
    }
}
