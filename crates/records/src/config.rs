//! Record batch configuration.
//!
//! [`RecordsConfig`] carries the per-batch knobs; [`CodecContext`] carries
//! the process-scoped state (codec registry and rate table) that writers and
//! readers share.

use crate::codec::CodecRegistry;
use crate::rates::{CompressionRates, COMPRESSION_DEFAULT_BUFFER_SIZE};
use once_cell::sync::Lazy;
use std::sync::Arc;
use wirelog_protocol::{RecordError, CURRENT_MAGIC_VALUE, MAGIC_VALUE_V0, MAGIC_VALUE_V1};

/// Record batch configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordsConfig {
    /// Wire-format version written by batch writers (default: 1).
    pub magic: u8,

    /// Write buffer placed in front of the gzip encoder (default: 1KB).
    pub compression_buffer_size: usize,

    /// Verify every record's checksum while iterating (default: false).
    pub check_crcs: bool,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        RecordsConfig {
            magic: CURRENT_MAGIC_VALUE,
            compression_buffer_size: COMPRESSION_DEFAULT_BUFFER_SIZE,
            check_crcs: false,
        }
    }
}

impl RecordsConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wire-format version (builder pattern).
    pub fn with_magic(mut self, magic: u8) -> Self {
        self.magic = magic;
        self
    }

    /// Set the compression buffer size (builder pattern).
    pub fn with_compression_buffer_size(mut self, size: usize) -> Self {
        self.compression_buffer_size = size;
        self
    }

    /// Enable or disable checksum verification on read (builder pattern).
    pub fn with_check_crcs(mut self, check: bool) -> Self {
        self.check_crcs = check;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.magic != MAGIC_VALUE_V0 && self.magic != MAGIC_VALUE_V1 {
            return Err(ConfigError::UnsupportedMagic(self.magic));
        }
        if self.compression_buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        Ok(())
    }

    /// Configuration for tests: small buffers and checksum verification.
    pub fn for_testing() -> Self {
        RecordsConfig {
            magic: CURRENT_MAGIC_VALUE,
            compression_buffer_size: 64,
            check_crcs: true,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Magic is neither the legacy nor the current wire format.
    #[error("Unsupported magic value {0}")]
    UnsupportedMagic(u8),

    /// Compression buffer size is zero.
    #[error("Compression buffer size must be non-zero")]
    ZeroBufferSize,
}

impl From<ConfigError> for RecordError {
    fn from(e: ConfigError) -> Self {
        RecordError::InvalidConfig(e.to_string())
    }
}

static SHARED_CONTEXT: Lazy<CodecContext> = Lazy::new(CodecContext::new);

/// Process-scoped state handed to batch writers and readers.
///
/// Cloning is cheap; clones share the same registry and rate table.
#[derive(Debug, Clone)]
pub struct CodecContext {
    /// Codec resolver.
    pub registry: Arc<CodecRegistry>,
    /// Damped compression-rate table.
    pub rates: Arc<CompressionRates>,
}

impl CodecContext {
    /// Process-wide registry with a fresh rate table.
    pub fn new() -> Self {
        CodecContext {
            registry: CodecRegistry::global(),
            rates: Arc::new(CompressionRates::new()),
        }
    }

    /// Context built from explicit parts.
    pub fn with_parts(registry: Arc<CodecRegistry>, rates: Arc<CompressionRates>) -> Self {
        CodecContext { registry, rates }
    }

    /// Process-wide context.
    pub fn shared() -> Self {
        SHARED_CONTEXT.clone()
    }
}

impl Default for CodecContext {
    fn default() -> Self {
        Self::new()
    }
}
