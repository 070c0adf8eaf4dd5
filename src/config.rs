//! Settings for a lagscope run. They can be written down in a [ron] file
//! such as
//!
//! ```text
//! (
//!     samples_per_chunk: 128,
//!     window: BlackmanHarris,
//!     polarity: InvertChannel2,
//!     marker_anchor: FirstMarkerByte,
//!     baud_rate: 800000,
//!     port: Some("/dev/ttyUSB0"),
//!     sink: Both,
//! )
//! ```
//!
//! Any field can be left out, in which case its default is used. Command
//! line flags take precedence over the file.

use crate::demux::{Polarity, BYTES_PER_SAMPLE};
use crate::frame_sync::MarkerAnchor;
use crate::serial_source::DEFAULT_BAUD_RATE;
use crate::sink::SinkMode;
use crate::window::WindowKind;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt, fs, path::Path};

/// Default number of combined samples per chunk.
pub const DEFAULT_SAMPLES_PER_CHUNK: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// N, the number of samples per channel in one decoded chunk
    pub samples_per_chunk: usize,
    pub window: WindowKind,
    pub polarity: Polarity,
    pub marker_anchor: MarkerAnchor,
    pub baud_rate: u32,
    pub port: Option<String>,
    pub sink: SinkMode,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            samples_per_chunk: DEFAULT_SAMPLES_PER_CHUNK,
            window: WindowKind::default(),
            polarity: Polarity::default(),
            marker_anchor: MarkerAnchor::default(),
            baud_rate: DEFAULT_BAUD_RATE,
            port: None,
            sink: SinkMode::default(),
        }
    }
}

/// Things that can go wrong while loading or checking a [ScopeConfig].
#[derive(Debug)]
pub enum ConfigError {
    /// N must be even and at least 4.
    InvalidChunkSize(usize),
    IoError(std::io::Error),
    RonSpannedError(ron::de::SpannedError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            ConfigError::InvalidChunkSize(n) => Cow::from(format!(
                "samples_per_chunk must be even and at least 4, got {n}"
            )),
            ConfigError::IoError(error) => Cow::from(format!("io error: {}", error)),
            ConfigError::RonSpannedError(error) => Cow::from(format!("ron error: {}", error)),
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for ConfigError {}

impl ScopeConfig {
    /// Reads and validates a config from a RON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::IoError)?;
        Self::from_ron(&text)
    }

    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::de::from_str(text).map_err(ConfigError::RonSpannedError)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = self.samples_per_chunk;
        if n < 4 || n % 2 != 0 {
            return Err(ConfigError::InvalidChunkSize(n));
        }
        Ok(())
    }

    /// Bytes in one decodable chunk.
    pub fn chunk_len(&self) -> usize {
        self.samples_per_chunk * BYTES_PER_SAMPLE
    }
}
