//! Download archive configuration.

use serde::{Deserialize, Serialize};

/// ZIP archive construction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Compression level passed to the deflate encoder (0-9).
    #[serde(default = "default_compression_level")]
    pub compression_level: i64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
        }
    }
}

fn default_compression_level() -> i64 {
    6
}
