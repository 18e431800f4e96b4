//! Damped compression-rate estimates.
//!
//! One estimate per compression type, seeded from the type's static default
//! and folded toward every realized ratio observed at batch close:
//!
//! ```text
//! rate' = rate * DAMPING + observed * (1 - DAMPING)
//! ```
//!
//! Writers read the estimate to predict compressed size before the codec has
//! flushed anything, which is what admission control runs on.

use parking_lot::Mutex;
use std::fmt;
use wirelog_protocol::CompressionType;

/// Weight kept on the historical estimate at each update.
pub const COMPRESSION_RATE_DAMPING_FACTOR: f32 = 0.9;

/// Multiplier applied to estimates so real output rarely overshoots them.
pub const COMPRESSION_RATE_ESTIMATION_FACTOR: f32 = 1.05;

/// Default write buffer in front of the gzip encoder.
pub const COMPRESSION_DEFAULT_BUFFER_SIZE: usize = 1024;

/// Per-compression-type damped rate table.
///
/// Updates to one type lock only that type's slot.
pub struct CompressionRates {
    rates: [Mutex<f32>; CompressionType::COUNT],
}

impl CompressionRates {
    /// Table seeded with each type's default rate.
    pub fn new() -> Self {
        CompressionRates {
            rates: CompressionType::ALL.map(|t| Mutex::new(t.default_rate())),
        }
    }

    /// Current estimate for a compression type.
    pub fn rate(&self, compression: CompressionType) -> f32 {
        *self.rates[compression.id() as usize].lock()
    }

    /// Fold an observed ratio into the estimate and return the new value.
    pub fn update(&self, compression: CompressionType, observed: f32) -> f32 {
        let mut rate = self.rates[compression.id() as usize].lock();
        *rate = *rate * COMPRESSION_RATE_DAMPING_FACTOR
            + observed * (1.0 - COMPRESSION_RATE_DAMPING_FACTOR);
        *rate
    }
}

impl Default for CompressionRates {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompressionRates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for compression in CompressionType::ALL {
            map.entry(&compression.name(), &self.rate(compression));
        }
        map.finish()
    }
}
