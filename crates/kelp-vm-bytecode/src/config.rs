//! Configuration for the container codec.

use serde::{Deserialize, Serialize};

/// Container codec settings.
///
/// Deserializes from any serde format; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Compression level, 0 (store) to 9 (smallest).
    /// Default: 6
    pub compression_level: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self { compression_level: 6 }
    }
}

impl CodecConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Config favouring speed over size.
    pub fn fast() -> Self {
        Self { compression_level: 1 }
    }

    /// Set the compression level (clamped to 9).
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }
}
