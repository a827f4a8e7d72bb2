//! Rendering and recording configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Height of the oscilloscope strip along the bottom edge (pixels)
    pub scope_height: f32,

    /// Clear color (sRGB, 0-255)
    pub background_rgb: [u8; 3],

    /// Opacity of the waveform zone strips (0-1)
    pub zone_alpha: f32,

    /// Glow disc size relative to the particle radius
    pub glow_scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 800,
            scope_height: 100.0,
            background_rgb: [10, 10, 20],
            zone_alpha: 12.0 / 255.0,
            glow_scale: 2.5,
        }
    }
}

/// Recording mode configuration
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Duration to record (seconds)
    pub duration_secs: f32,

    /// Output directory for the WAV file
    pub output_dir: PathBuf,
}

impl RecordingConfig {
    pub fn new(duration_secs: f32, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            duration_secs,
            output_dir: output_dir.into(),
        }
    }

    /// Audio file path
    pub fn audio_path(&self) -> PathBuf {
        self.output_dir.join("audio.wav")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_paths() {
        let config = RecordingConfig::new(5.0, "out");
        assert_eq!(config.audio_path(), PathBuf::from("out").join("audio.wav"));
    }
}
