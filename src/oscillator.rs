//! Waveform generators for particle voices.
//!
//! The set of waveforms is closed, so dispatch is a single `match` on the
//! hot per-sample path instead of a trait object per voice.

use std::f32::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Waveform kind of a particle voice (also selects the particle color)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Saw,
    Noise,
}

impl Waveform {
    /// All waveforms, in screen-zone order (left to right)
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Saw,
        Waveform::Noise,
    ];

    /// Sample the waveform at `phase` (expected in [0, 1)), returns [-1, 1]
    ///
    /// `rng` is only consumed by [`Waveform::Noise`].
    #[inline]
    pub fn sample<R: Rng + ?Sized>(self, phase: f32, rng: &mut R) -> f32 {
        match self {
            Waveform::Sine => (phase * TAU).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Saw => 2.0 * phase - 1.0,
            Waveform::Noise => rng.gen_range(-1.0..=1.0),
        }
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "Sine",
            Waveform::Square => "Square",
            Waveform::Saw => "Saw",
            Waveform::Noise => "Noise",
        }
    }

    /// Palette color (sRGB, 0-255)
    pub fn color_rgb(self) -> [u8; 3] {
        match self {
            Waveform::Sine => [100, 200, 255],
            Waveform::Square => [255, 100, 100],
            Waveform::Saw => [255, 200, 50],
            Waveform::Noise => [200, 100, 255],
        }
    }

    /// Palette color as normalized RGBA
    pub fn color(self) -> [f32; 4] {
        let [r, g, b] = self.color_rgb();
        [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0]
    }
}

impl std::fmt::Display for Waveform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn test_sine_shape() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(Waveform::Sine.sample(0.0, &mut rng).abs() < 1e-6);
        assert!((Waveform::Sine.sample(0.25, &mut rng) - 1.0).abs() < 1e-6);
        assert!((Waveform::Sine.sample(0.75, &mut rng) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_square_switches_at_half_phase() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(Waveform::Square.sample(0.0, &mut rng), 1.0);
        assert_eq!(Waveform::Square.sample(0.499, &mut rng), 1.0);
        assert_eq!(Waveform::Square.sample(0.5, &mut rng), -1.0);
        assert_eq!(Waveform::Square.sample(0.99, &mut rng), -1.0);
    }

    #[test]
    fn test_saw_is_linear_ramp() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(Waveform::Saw.sample(0.0, &mut rng), -1.0);
        assert_eq!(Waveform::Saw.sample(0.5, &mut rng), 0.0);
        assert!((Waveform::Saw.sample(0.75, &mut rng) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_noise_stays_in_range_and_varies() {
        let mut rng = SmallRng::seed_from_u64(7);
        let samples: Vec<f32> = (0..1000)
            .map(|_| Waveform::Noise.sample(0.3, &mut rng))
            .collect();

        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        // Independent per call, even for a fixed phase
        assert!(samples.windows(2).any(|w| w[0] != w[1]));
        assert!(samples.iter().any(|&s| s > 0.5));
        assert!(samples.iter().any(|&s| s < -0.5));
    }

    #[test]
    fn test_palette_is_distinct() {
        for (i, a) in Waveform::ALL.iter().enumerate() {
            for b in &Waveform::ALL[i + 1..] {
                assert_ne!(a.color_rgb(), b.color_rgb());
            }
        }
    }
}
