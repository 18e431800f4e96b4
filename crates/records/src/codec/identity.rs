//! Identity codec (no transformation).

use super::traits::{BatchEncoder, BatchSink, CompressionCodec};
use bytes::{Buf, Bytes, BytesMut};
use std::io::{self, Read, Write};
use wirelog_protocol::{CompressionType, Result};

/// Identity codec - no transformation.
///
/// Bytes pass straight into the output region, still byte-counted, so the
/// uncompressed path shares the writer and reader plumbing of the codecs.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl CompressionCodec for IdentityCodec {
    fn compression_type(&self) -> CompressionType {
        CompressionType::None
    }

    fn encoder(&self, sink: BatchSink, _buffer_size: usize) -> Result<Box<dyn BatchEncoder>> {
        Ok(Box::new(IdentityEncoder { sink }))
    }

    fn decoder(&self, source: Bytes, _magic: u8) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(source.reader()))
    }
}

struct IdentityEncoder {
    sink: BatchSink,
}

impl Write for IdentityEncoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

impl BatchEncoder for IdentityEncoder {
    fn written(&self) -> usize {
        self.sink.get_ref().len()
    }

    fn finish(self: Box<Self>) -> io::Result<BytesMut> {
        Ok(self.sink.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;

    #[test]
    fn test_identity_encode_is_passthrough() {
        let mut region = BytesMut::new();
        region.put_slice(b"header");
        let mut encoder = IdentityCodec.encoder(region.writer(), 0).unwrap();
        encoder.write_all(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(encoder.written(), 11);

        let region = encoder.finish().unwrap();
        assert_eq!(&region[..], b"header\x01\x02\x03\x04\x05");
    }

    #[test]
    fn test_identity_decode_empty() {
        let mut decoded = Vec::new();
        IdentityCodec
            .decoder(Bytes::new(), 1)
            .unwrap()
            .read_to_end(&mut decoded)
            .unwrap();
        assert!(decoded.is_empty());
    }
}
