//! Input mapping parameters (mouse, keyboard and blob spawns).

use serde::{Deserialize, Serialize};

/// How pointer and keyboard input turn into spawn requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputParams {
    /// Frequency at the top edge of the window (Hz)
    pub top_frequency_hz: f32,

    /// Frequency at the bottom edge of the window (Hz)
    /// top..bottom spans 3 octaves with the defaults
    pub bottom_frequency_hz: f32,

    /// Spawn every Nth frame while dragging the mouse
    pub drag_spawn_interval_frames: u64,

    /// Spawn every Nth frame for each detected blob
    pub blob_spawn_interval_frames: u64,

    /// Keyboard note spawn anchor (fraction of width, fraction of height)
    pub key_spawn_anchor: (f32, f32),

    /// Keyboard note spawn jitter around the anchor (± units)
    pub key_spawn_jitter: (f32, f32),
}

impl Default for InputParams {
    fn default() -> Self {
        Self {
            top_frequency_hz: 880.0,
            bottom_frequency_hz: 110.0,
            drag_spawn_interval_frames: 3,
            blob_spawn_interval_frames: 6,
            key_spawn_anchor: (0.5, 0.4),
            key_spawn_jitter: (80.0, 40.0),
        }
    }
}
