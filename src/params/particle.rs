//! Particle body, voice and mixing parameters.

use serde::{Deserialize, Serialize};

/// Physical behavior of particle bodies
///
/// All distances are in drawable-area units (window pixels in the app).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticlePhysics {
    /// Downward acceleration (units per second squared)
    pub gravity: f32,

    /// Velocity multiplier applied once per advance call (dimensionless)
    /// Not normalized to dt: damping strength depends on the frame rate.
    pub damping_per_tick: f32,

    /// Fraction of speed kept when bouncing off an edge
    pub bounce_restitution: f32,

    /// Linear radius shrink rate (units per second)
    pub shrink_per_s: f32,

    /// Radius floor (units)
    pub min_radius: f32,

    /// Horizontal spawn velocity range (units per second)
    pub spawn_velocity_x: (f32, f32),

    /// Vertical spawn velocity range (units per second, negative = upward)
    pub spawn_velocity_y: (f32, f32),

    /// Frequency range mapped onto radius (Hz, low to high)
    pub radius_freq_range_hz: (f32, f32),

    /// Radius at the low and high end of `radius_freq_range_hz` (units)
    /// Lower pitch gives a bigger circle.
    pub radius_range: (f32, f32),
}

impl Default for ParticlePhysics {
    fn default() -> Self {
        Self {
            gravity: 40.0,
            damping_per_tick: 0.999,
            bounce_restitution: 0.8,
            shrink_per_s: 1.5,
            min_radius: 1.0,
            spawn_velocity_x: (-60.0, 60.0),
            spawn_velocity_y: (-120.0, -20.0), // "pop upward"
            radius_freq_range_hz: (110.0, 880.0),
            radius_range: (22.0, 5.0),
        }
    }
}

impl ParticlePhysics {
    /// Map a frequency onto a spawn radius (clamped linear map)
    pub fn radius_for_frequency(&self, frequency_hz: f32) -> f32 {
        let (lo_hz, hi_hz) = self.radius_freq_range_hz;
        let (r_lo, r_hi) = self.radius_range;
        if hi_hz == lo_hz {
            return r_lo;
        }
        let t = ((frequency_hz - lo_hz) / (hi_hz - lo_hz)).clamp(0.0, 1.0);
        r_lo + (r_hi - r_lo) * t
    }
}

/// Voice envelope and spawn defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceParams {
    /// Linear fade-in length (seconds)
    /// 10ms avoids a click at spawn
    pub attack_s: f32,

    /// Target amplitude used when a spawn request does not specify one
    pub default_amplitude: f32,

    /// Lifetime used when a spawn request does not specify one (seconds)
    pub default_lifetime_s: f32,
}

impl VoiceParams {
    pub const DEFAULT_AMPLITUDE: f32 = 0.5;
    pub const DEFAULT_LIFETIME_S: f32 = 3.0;
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            attack_s: 0.01,
            default_amplitude: Self::DEFAULT_AMPLITUDE,
            default_lifetime_s: Self::DEFAULT_LIFETIME_S,
        }
    }
}

/// Combined particle parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleParams {
    pub physics: ParticlePhysics,
    pub voice: VoiceParams,
}

/// Output mixing of all live voices
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixParams {
    /// Gain applied after voice normalization
    pub master_gain: f32,

    /// Expected fraction of voices at full amplitude at once
    /// Formula: scale = 1 / max(1, voice_count * voice_density)
    pub voice_density: f32,
}

impl Default for MixParams {
    fn default() -> Self {
        Self {
            master_gain: 0.4,
            voice_density: 0.5,
        }
    }
}

impl MixParams {
    /// Normalization scale for `voice_count` summed voices, master gain included
    pub fn scale_for(&self, voice_count: usize) -> f32 {
        self.master_gain / (voice_count as f32 * self.voice_density).max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_mapping_is_inverse_and_clamped() {
        let physics = ParticlePhysics::default();

        assert_eq!(physics.radius_for_frequency(110.0), 22.0);
        assert_eq!(physics.radius_for_frequency(880.0), 5.0);
        assert_eq!(physics.radius_for_frequency(20.0), 22.0);
        assert_eq!(physics.radius_for_frequency(5000.0), 5.0);

        let mid = physics.radius_for_frequency(495.0);
        assert!(mid < 22.0 && mid > 5.0);
        assert!((mid - 13.5).abs() < 1e-4);
    }

    #[test]
    fn test_mix_scale() {
        let mix = MixParams::default();

        // One or two voices are not attenuated beyond master gain
        assert!((mix.scale_for(0) - 0.4).abs() < 1e-6);
        assert!((mix.scale_for(1) - 0.4).abs() < 1e-6);
        assert!((mix.scale_for(2) - 0.4).abs() < 1e-6);
        assert!((mix.scale_for(8) - 0.1).abs() < 1e-6);
        assert!((mix.scale_for(64) - 0.4 / 32.0).abs() < 1e-6);
    }
}
