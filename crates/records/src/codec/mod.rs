//! Compression codec resolution.
//!
//! Every batch writer and reader goes through a [`CodecRegistry`] to turn a
//! [`CompressionType`] into a stream transform.
//!
//! - `None` and `Gzip` are built in and resolved eagerly.
//! - `Snappy` and `Lz4` are optional (cargo features `snappy` and `lz4`).
//!   Each is resolved on first use through a loader and memoized; a missing
//!   codec surfaces as `RecordError::CodecUnavailable` at that first use,
//!   never when the registry is built.
//!
//! # Usage
//!
//! ```ignore
//! use wirelog_records::codec::CodecRegistry;
//! use wirelog_protocol::CompressionType;
//!
//! let codec = CodecRegistry::global().resolve(CompressionType::Gzip)?;
//! assert_eq!(codec.compression_type(), CompressionType::Gzip);
//! ```

mod gzip;
mod identity;
#[cfg(feature = "lz4")]
mod lz4;
#[cfg(feature = "snappy")]
mod snappy;
mod traits;

pub use gzip::GzipCodec;
pub use identity::IdentityCodec;
#[cfg(feature = "lz4")]
pub use lz4::Lz4Codec;
#[cfg(feature = "snappy")]
pub use snappy::SnappyCodec;
pub use traits::{BatchEncoder, BatchSink, CompressionCodec};

use once_cell::sync::{Lazy, OnceCell};
use std::fmt;
use std::sync::Arc;
use wirelog_protocol::{CompressionType, Result};

/// Factory for an optional codec, called at most until it first succeeds.
pub type CodecLoader = fn() -> Result<Arc<dyn CompressionCodec>>;

static GLOBAL_REGISTRY: Lazy<Arc<CodecRegistry>> = Lazy::new(|| Arc::new(CodecRegistry::new()));

/// An optional codec, resolved once on first use.
struct LazyCodec {
    name: &'static str,
    loader: CodecLoader,
    resolved: OnceCell<Arc<dyn CompressionCodec>>,
}

impl LazyCodec {
    fn new(name: &'static str, loader: CodecLoader) -> Self {
        LazyCodec {
            name,
            loader,
            resolved: OnceCell::new(),
        }
    }

    /// Resolve the codec, running the loader if nothing is cached yet.
    ///
    /// Racing callers block on the same initialization and all observe the
    /// single installed codec. A failed load caches nothing.
    fn get(&self) -> Result<Arc<dyn CompressionCodec>> {
        self.resolved
            .get_or_try_init(|| {
                let codec = (self.loader)().map_err(|e| {
                    tracing::warn!(
                        target: "wirelog::records",
                        codec = self.name,
                        error = %e,
                        "Compression codec unavailable"
                    );
                    e
                })?;
                tracing::trace!(
                    target: "wirelog::records",
                    codec = self.name,
                    "Resolved compression codec"
                );
                Ok(codec)
            })
            .map(Arc::clone)
    }
}

/// Maps compression types to codecs.
pub struct CodecRegistry {
    identity: Arc<dyn CompressionCodec>,
    gzip: Arc<dyn CompressionCodec>,
    snappy: LazyCodec,
    lz4: LazyCodec,
}

impl CodecRegistry {
    /// Registry with the built-in loaders for the optional codecs.
    pub fn new() -> Self {
        Self::with_loaders(load_snappy, load_lz4)
    }

    /// Registry with custom loaders for the optional codecs.
    pub fn with_loaders(snappy: CodecLoader, lz4: CodecLoader) -> Self {
        CodecRegistry {
            identity: Arc::new(IdentityCodec),
            gzip: Arc::new(GzipCodec),
            snappy: LazyCodec::new("snappy", snappy),
            lz4: LazyCodec::new("lz4", lz4),
        }
    }

    /// Process-wide registry.
    pub fn global() -> Arc<CodecRegistry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Codec for a compression type.
    pub fn resolve(&self, compression: CompressionType) -> Result<Arc<dyn CompressionCodec>> {
        match compression {
            CompressionType::None => Ok(Arc::clone(&self.identity)),
            CompressionType::Gzip => Ok(Arc::clone(&self.gzip)),
            CompressionType::Snappy => self.snappy.get(),
            CompressionType::Lz4 => self.lz4.get(),
        }
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("snappy_resolved", &self.snappy.resolved.get().is_some())
            .field("lz4_resolved", &self.lz4.resolved.get().is_some())
            .finish()
    }
}

fn load_snappy() -> Result<Arc<dyn CompressionCodec>> {
    #[cfg(feature = "snappy")]
    {
        Ok(Arc::new(SnappyCodec))
    }
    #[cfg(not(feature = "snappy"))]
    {
        Err(wirelog_protocol::RecordError::CodecUnavailable { codec: "snappy" })
    }
}

fn load_lz4() -> Result<Arc<dyn CompressionCodec>> {
    #[cfg(feature = "lz4")]
    {
        Ok(Arc::new(Lz4Codec))
    }
    #[cfg(not(feature = "lz4"))]
    {
        Err(wirelog_protocol::RecordError::CodecUnavailable { codec: "lz4" })
    }
}
