//! Audio output configuration and constants.

use serde::{Deserialize, Serialize};

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Preferred output sample rate (Hz)
    /// Used when the device supports it, otherwise the device default wins.
    pub sample_rate_hz: u32,

    /// Preferred output channel count
    pub channels: u16,

    /// Requested callback size (frames per buffer)
    /// 512 frames = 11.6ms @ 44.1kHz
    pub buffer_frames: u32,

    /// Use a try-lock in the audio callback and emit silence on contention
    /// instead of waiting for the visual thread to release the pool.
    pub never_block: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: audio_constants::DEFAULT_SAMPLE_RATE_HZ,
            channels: 2,
            buffer_frames: audio_constants::DEFAULT_BUFFER_FRAMES,
            never_block: false,
        }
    }
}

/// Audio constants
pub mod audio_constants {
    /// Default sample rate (Hz)
    pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 44_100;

    /// Default callback size (frames)
    pub const DEFAULT_BUFFER_FRAMES: u32 = 512;

    /// Default pool capacity (concurrent particles)
    pub const DEFAULT_CAPACITY: usize = 64;
}
