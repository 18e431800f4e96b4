//! Decoded (offset, record) pairs and the framing around them.

use crate::record::Record;
use std::fmt;

/// Length of the offset field in the log framing
pub const OFFSET_LENGTH: usize = 8;
/// Length of the size field in the log framing
pub const SIZE_LENGTH: usize = 4;
/// Framing written in front of every record: offset + size
pub const LOG_OVERHEAD: usize = OFFSET_LENGTH + SIZE_LENGTH;

/// A record together with the offset it was framed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    offset: i64,
    record: Record,
}

impl LogEntry {
    /// Pair an offset with a record.
    pub fn new(offset: i64, record: Record) -> Self {
        LogEntry { offset, record }
    }

    /// Offset of this entry.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// The record.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Offset following this entry.
    pub fn next_offset(&self) -> i64 {
        self.offset + 1
    }

    /// Split into offset and record.
    pub fn into_parts(self) -> (i64, Record) {
        (self.offset, self.record)
    }

    /// Framed size on the wire.
    pub fn size(&self) -> usize {
        LOG_OVERHEAD + self.record.size()
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogEntry({}, {})", self.offset, self.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CompressionType;

    #[test]
    fn test_log_entry_accessors() {
        let record = Record::new(1, None, Some(b"abc"), CompressionType::None).unwrap();
        let entry = LogEntry::new(41, record.clone());
        assert_eq!(entry.offset(), 41);
        assert_eq!(entry.next_offset(), 42);
        assert_eq!(entry.size(), LOG_OVERHEAD + record.size());
        assert_eq!(entry.record(), &record);
        assert!(entry.to_string().starts_with("LogEntry(41,"));
    }
}
