//! Wirelog - record batch codec for distributed log clients
//!
//! Wirelog frames messages into record batches, optionally compresses each
//! batch as a unit, and decodes batches back into (offset, record) entries.
//!
//! # Quick Start
//!
//! ```ignore
//! use bytes::BytesMut;
//! use wirelog::{CodecContext, CompressionType, MemoryRecords};
//!
//! let ctx = CodecContext::shared();
//! let mut batch = MemoryRecords::empty(BytesMut::with_capacity(16 * 1024), CompressionType::Gzip, &ctx)?;
//! batch.append(0, now_ms, Some(b"key"), Some(b"value"))?;
//! batch.close()?;
//!
//! for entry in batch.iter()? {
//!     let entry = entry?;
//!     println!("{} {:?}", entry.offset(), entry.record().value());
//! }
//! ```
//!
//! # Architecture
//!
//! - `wirelog-protocol`: single-record layout, compression and timestamp
//!   types, error taxonomy
//! - `wirelog-records`: codec resolution, batch writer, batch container,
//!   batch reader

pub use wirelog_protocol as protocol;
pub use wirelog_records::*;
