//! Sound particles: bodies animated per visual frame that are also
//! oscillator voices mixed on the audio thread.

mod particle;
mod pool;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::oscillator::Waveform;
use crate::params::VoiceParams;

pub use particle::Particle;
pub use pool::ParticlePool;

/// Drawable area the particles bounce inside (origin top-left, y down)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Scale a normalized point in [0, 1]² to drawable units
    pub fn denormalize(&self, point: Vec2) -> Vec2 {
        Vec2::new(point.x * self.width, point.y * self.height)
    }
}

/// Visual state of one particle, uploaded as a GPU instance
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleView {
    pub position: [f32; 2],
    pub radius: f32,
    /// Current effective amplitude, drives opacity
    pub alpha: f32,
    pub color: [f32; 4],
}

impl ParticleView {
    /// Fallback for index queries past the live particle count
    pub const EMPTY: ParticleView = ParticleView {
        position: [0.0; 2],
        radius: 0.0,
        alpha: 0.0,
        color: [0.0; 4],
    };
}

/// Everything needed to create a particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRequest {
    pub position: Vec2,
    pub waveform: Waveform,
    /// Oscillator frequency (Hz)
    pub frequency: f32,
    /// Target amplitude before envelope
    pub amplitude: f32,
    /// Seconds until the particle dies
    pub lifetime: f32,
}

impl SpawnRequest {
    /// Request with the default amplitude (0.5) and lifetime (3s)
    pub fn new(position: Vec2, waveform: Waveform, frequency: f32) -> Self {
        Self {
            position,
            waveform,
            frequency,
            amplitude: VoiceParams::DEFAULT_AMPLITUDE,
            lifetime: VoiceParams::DEFAULT_LIFETIME_S,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_lifetime(mut self, lifetime: f32) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Apply configured voice defaults in place of the built-in ones
    pub fn with_voice_defaults(self, voice: &VoiceParams) -> Self {
        self.with_amplitude(voice.default_amplitude)
            .with_lifetime(voice.default_lifetime_s)
    }
}
