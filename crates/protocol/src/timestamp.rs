//! Record timestamp semantics.

use std::fmt;

/// Sentinel timestamp for records that carry none (magic v0).
pub const NO_TIMESTAMP: i64 = -1;

/// Which clock a record timestamp came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampType {
    /// Legacy records without a timestamp
    NoTimestampType,
    /// Set by the producer when the record was created
    CreateTime,
    /// Set by the broker when the record was appended to the log
    LogAppendTime,
}

impl TimestampType {
    /// Attribute bit selecting log-append time.
    pub const ATTRIBUTE_MASK: u8 = 0x08;

    /// Decode the timestamp type from an attributes byte.
    pub fn from_attributes(attributes: u8) -> Self {
        if attributes & Self::ATTRIBUTE_MASK == 0 {
            TimestampType::CreateTime
        } else {
            TimestampType::LogAppendTime
        }
    }

    /// Apply this timestamp type to an attributes byte.
    pub fn apply_to(self, attributes: u8) -> u8 {
        match self {
            TimestampType::LogAppendTime => attributes | Self::ATTRIBUTE_MASK,
            _ => attributes & !Self::ATTRIBUTE_MASK,
        }
    }

    /// Wire id (-1, 0, 1).
    pub fn id(self) -> i8 {
        match self {
            TimestampType::NoTimestampType => -1,
            TimestampType::CreateTime => 0,
            TimestampType::LogAppendTime => 1,
        }
    }
}

impl fmt::Display for TimestampType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampType::NoTimestampType => f.write_str("NoTimestampType"),
            TimestampType::CreateTime => f.write_str("CreateTime"),
            TimestampType::LogAppendTime => f.write_str("LogAppendTime"),
        }
    }
}
