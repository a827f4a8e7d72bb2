//! Parameter definitions with units and documented semantics.
//!
//! All magic numbers live here with:
//! - Units (seconds, Hz, drawable-area units)
//! - Documented ranges and meanings
//! - Defaults matching the tuned instrument
//!
//! Every group deserializes with `#[serde(default)]`, so a JSON config file
//! only needs the fields it overrides.

mod audio;
mod input;
mod particle;
mod render;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// Re-export all types
pub use audio::{audio_constants, AudioConfig};
pub use input::InputParams;
pub use particle::{MixParams, ParticleParams, ParticlePhysics, VoiceParams};
pub use render::{RecordingConfig, RenderConfig};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Maximum concurrent particles (oldest is evicted beyond this)
    pub capacity: usize,
    pub particle: ParticleParams,
    pub mix: MixParams,
    pub audio: AudioConfig,
    pub render: RenderConfig,
    pub input: InputParams,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            capacity: audio_constants::DEFAULT_CAPACITY,
            particle: ParticleParams::default(),
            mix: MixParams::default(),
            audio: AudioConfig::default(),
            render: RenderConfig::default(),
            input: InputParams::default(),
        }
    }
}

impl AppConfig {
    /// Load a JSON config file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config string
    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidConfig("capacity must be > 0".to_string()));
        }
        if self.audio.buffer_frames == 0 {
            return Err(Error::InvalidConfig(
                "audio.buffer_frames must be > 0".to_string(),
            ));
        }
        if self.audio.sample_rate_hz == 0 {
            return Err(Error::InvalidConfig(
                "audio.sample_rate_hz must be > 0".to_string(),
            ));
        }
        if self.input.drag_spawn_interval_frames == 0 || self.input.blob_spawn_interval_frames == 0
        {
            return Err(Error::InvalidConfig(
                "spawn intervals must be >= 1 frame".to_string(),
            ));
        }
        Ok(())
    }
}
