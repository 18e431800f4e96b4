//! Compression type identifiers
//!
//! The id is what goes into the low three bits of a record's attributes byte,
//! so the numbering is part of the wire format and must never change.

use crate::error::{RecordError, Result};
use std::fmt;
use std::str::FromStr;

/// Whole-batch compression applied to a record batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CompressionType {
    /// No compression
    None = 0,
    /// Gzip (always available)
    Gzip = 1,
    /// Snappy framed stream (optional codec)
    Snappy = 2,
    /// LZ4 frame (optional codec)
    Lz4 = 3,
}

impl CompressionType {
    /// All compression types, ordered by id.
    pub const ALL: [CompressionType; 4] = [
        CompressionType::None,
        CompressionType::Gzip,
        CompressionType::Snappy,
        CompressionType::Lz4,
    ];

    /// Number of compression types (one past the largest id).
    pub const COUNT: usize = 4;

    /// Stable numeric id stored in record attributes.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Lookup by numeric id.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Gzip),
            2 => Ok(CompressionType::Snappy),
            3 => Ok(CompressionType::Lz4),
            _ => Err(RecordError::UnknownCompression(id)),
        }
    }

    /// Lowercase name, as used in configuration.
    pub fn name(self) -> &'static str {
        match self {
            CompressionType::None => "none",
            CompressionType::Gzip => "gzip",
            CompressionType::Snappy => "snappy",
            CompressionType::Lz4 => "lz4",
        }
    }

    /// Static starting point for the damped compression-rate estimate.
    pub fn default_rate(self) -> f32 {
        match self {
            CompressionType::None => 1.0,
            CompressionType::Gzip | CompressionType::Snappy | CompressionType::Lz4 => 0.5,
        }
    }

    /// Whether this type actually compresses.
    pub fn is_compressed(self) -> bool {
        self != CompressionType::None
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionType {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self> {
        CompressionType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| RecordError::InvalidConfig(format!("unknown compression type: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_stable() {
        assert_eq!(CompressionType::None.id(), 0);
        assert_eq!(CompressionType::Gzip.id(), 1);
        assert_eq!(CompressionType::Snappy.id(), 2);
        assert_eq!(CompressionType::Lz4.id(), 3);
    }

    #[test]
    fn test_from_id() {
        for t in CompressionType::ALL {
            assert_eq!(CompressionType::from_id(t.id()).unwrap(), t);
        }
        assert!(matches!(
            CompressionType::from_id(7),
            Err(RecordError::UnknownCompression(7))
        ));
    }

    #[test]
    fn test_parse_by_name() {
        assert_eq!("gzip".parse::<CompressionType>().unwrap(), CompressionType::Gzip);
        assert_eq!("LZ4".parse::<CompressionType>().unwrap(), CompressionType::Lz4);
        assert!("zstd".parse::<CompressionType>().is_err());
    }

    #[test]
    fn test_default_rates() {
        assert_eq!(CompressionType::None.default_rate(), 1.0);
        assert_eq!(CompressionType::Gzip.default_rate(), 0.5);
        assert!(!CompressionType::None.is_compressed());
        assert!(CompressionType::Snappy.is_compressed());
    }
}
